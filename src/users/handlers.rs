use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::handlers::is_valid_email;
use crate::auth::jwt::{AdminUser, AuthUser};
use crate::auth::password::hash_password;
use crate::error::ApiError;
use crate::state::AppState;
use crate::users::dto::{
    CreateUserRequest, ListQuery, ProfileRequest, ProfileResponse, StatusRequest,
    UpdateUserRequest, UserSummary,
};
use crate::users::repo::{AdminUserUpdate, NewUser, ProfileUpdate, Role, User};

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile).put(save_profile))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", put(update_user))
        .route("/users/:id/status", post(set_user_status))
}

/// Prefix match used by the admin user table, one field at a time.
fn matches_filter(user: &User, field: &str, value: &str) -> bool {
    let needle = value.to_lowercase();
    let hay = match field {
        "email" => Some(user.email.clone()),
        "first_name" => user.first_name.clone(),
        "last_name" => user.last_name.clone(),
        "document_id" => user.document_id.clone(),
        "phone" => user.phone.clone(),
        "role" => serde_json::to_value(user.role)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string)),
        _ => None,
    };
    hay.map(|h| h.to_lowercase().starts_with(&needle))
        .unwrap_or(false)
}

fn summarize(user: &User, collector_emails: &HashMap<Uuid, String>) -> UserSummary {
    UserSummary {
        id: user.id,
        email: user.email.clone(),
        full_name: user.full_name(),
        role: user.role,
        active: user.active,
        employed: user.employed,
        phone: user.phone.clone(),
        address: user.address.clone(),
        collector_email: user
            .collector_id
            .and_then(|id| collector_emails.get(&id).cloned()),
    }
}

async fn resolve_collector(db: &sqlx::PgPool, email: &str) -> Result<Uuid, ApiError> {
    let employee = User::find_by_email(db, email)
        .await?
        .ok_or(ApiError::NotFound("collector"))?;
    if employee.role != Role::Employee {
        return Err(ApiError::Validation(
            "assigned collector must be an employee".into(),
        ));
    }
    Ok(employee.id)
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let users = User::list(&state.db).await?;
    let collector_emails: HashMap<Uuid, String> = users
        .iter()
        .filter(|u| u.role == Role::Employee)
        .map(|u| (u.id, u.email.clone()))
        .collect();

    let rows = users
        .iter()
        .filter(|u| match (&q.field, &q.value) {
            (Some(f), Some(v)) if !v.is_empty() => matches_filter(u, f, v),
            _ => true,
        })
        .map(|u| summarize(u, &collector_emails))
        .collect();
    Ok(Json(rows))
}

/// Admin-created accounts start inactive until explicitly enabled.
#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Json(mut payload): Json<CreateUserRequest>,
) -> Result<Json<UserSummary>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    if !is_valid_email(&payload.email) {
        return Err(ApiError::Validation("invalid email".into()));
    }
    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        return Err(ApiError::EmailTaken);
    }

    let mut collector_emails = HashMap::new();
    let collector_id = match (&payload.collector_email, payload.role) {
        (Some(email), Role::Client) => {
            let id = resolve_collector(&state.db, email).await?;
            collector_emails.insert(id, email.clone());
            Some(id)
        }
        _ => None,
    };

    let user = User::create(
        &state.db,
        &NewUser {
            email: payload.email,
            password_hash: hash_password(&payload.password)?,
            role: payload.role,
            first_name: payload.first_name,
            last_name: payload.last_name,
            document_id: payload.document_id,
            phone: payload.phone,
            address: payload.address,
            employed: payload.employed,
            collector_id,
            active: false,
        },
    )
    .await?;

    info!(user_id = %user.id, role = ?user.role, "user created by admin");
    Ok(Json(summarize(&user, &collector_emails)))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<Uuid>,
    Json(mut payload): Json<UpdateUserRequest>,
) -> Result<Json<UserSummary>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    if User::find_by_id(&state.db, id).await?.is_none() {
        return Err(ApiError::NotFound("user"));
    }

    let mut collector_emails = HashMap::new();
    let collector_id = match (&payload.collector_email, payload.role) {
        (Some(email), Role::Client) => {
            let id = resolve_collector(&state.db, email).await?;
            collector_emails.insert(id, email.clone());
            Some(id)
        }
        _ => None,
    };

    let user = User::admin_update(
        &state.db,
        id,
        &AdminUserUpdate {
            email: payload.email,
            role: payload.role,
            first_name: payload.first_name,
            last_name: payload.last_name,
            document_id: payload.document_id,
            phone: payload.phone,
            address: payload.address,
            collector_id,
        },
    )
    .await?;

    if let Some(pw) = payload.password.as_deref() {
        if !pw.trim().is_empty() {
            User::set_password(&state.db, id, &hash_password(pw)?).await?;
        }
    }

    info!(user_id = %id, "user updated by admin");
    Ok(Json(summarize(&user, &collector_emails)))
}

#[instrument(skip(state))]
pub async fn set_user_status(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if User::find_by_id(&state.db, id).await?.is_none() {
        return Err(ApiError::NotFound("user"));
    }
    User::set_active(&state.db, id, payload.active).await?;
    info!(user_id = %id, active = payload.active, "user status changed");
    Ok(Json(serde_json::json!({ "active": payload.active })))
}

fn profile_response(user: &User) -> ProfileResponse {
    ProfileResponse {
        id: user.id,
        email: user.email.clone(),
        full_name: user.full_name(),
        role: user.role,
        document_id: user.document_id.clone(),
        phone: user.phone.clone(),
        address: user.address.clone(),
        latitude: user.latitude,
        longitude: user.longitude,
        employed: user.employed,
        complete: user.profile_complete(),
    }
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = User::find_by_id(&state.db, auth.id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(Json(profile_response(&user)))
}

/// Saving a profile geocodes the address for collection routing; a geocoder
/// miss keeps any previously stored coordinates.
#[instrument(skip(state, payload))]
pub async fn save_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<ProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let current = User::find_by_id(&state.db, auth.id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    let (mut latitude, mut longitude) = (current.latitude, current.longitude);
    if let Some(address) = payload.address.as_deref() {
        match state.geocoder.geocode(address).await {
            Some(point) => {
                latitude = Some(point.lat);
                longitude = Some(point.lon);
            }
            None => warn!(user_id = %auth.id, "address did not geocode"),
        }
    }

    let user = User::save_profile(
        &state.db,
        auth.id,
        &ProfileUpdate {
            first_name: payload.first_name,
            last_name: payload.last_name,
            document_id: payload.document_id,
            phone: payload.phone,
            address: payload.address,
            employed: payload.employed,
            latitude,
            longitude,
        },
    )
    .await?;

    info!(user_id = %auth.id, "profile saved");
    Ok(Json(profile_response(&user)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn user_with(email: &str, first: Option<&str>) -> User {
        User {
            id: Uuid::new_v4(),
            email: email.into(),
            password_hash: "x".into(),
            role: Role::Client,
            first_name: first.map(Into::into),
            last_name: None,
            document_id: None,
            phone: None,
            address: None,
            latitude: None,
            longitude: None,
            employed: false,
            collector_id: None,
            active: true,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn filter_is_case_insensitive_prefix() {
        let u = user_with("Maria@Example.com", Some("Maria"));
        assert!(matches_filter(&u, "email", "mar"));
        assert!(matches_filter(&u, "first_name", "MA"));
        assert!(!matches_filter(&u, "first_name", "aria"));
    }

    #[test]
    fn filter_on_unknown_field_matches_nothing() {
        let u = user_with("a@b.co", None);
        assert!(!matches_filter(&u, "password_hash", "x"));
    }

    #[test]
    fn filter_on_role_uses_lowercase_names() {
        let u = user_with("a@b.co", None);
        assert!(matches_filter(&u, "role", "cli"));
        assert!(!matches_filter(&u, "role", "emp"));
    }
}
