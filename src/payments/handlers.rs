use std::collections::HashMap;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rand::Rng;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::jwt::CollectorUser;
use crate::error::ApiError;
use crate::geocode::GeoPoint;
use crate::loans::repo::Loan;
use crate::payments::dto::{CapturePaymentRequest, RouteResponse, RouteStop};
use crate::payments::ledger::{self, PaymentReceipt};
use crate::payments::repo::PaymentMethod;
use crate::state::AppState;
use crate::users::repo::{Role, User};

/// Fallback home point when the collector has no usable address (Medellín).
const DEFAULT_HOME: GeoPoint = GeoPoint {
    lat: 6.2442,
    lon: -75.5812,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payments", post(capture_payment))
        .route("/collection/route", get(collection_route))
}

#[instrument(skip(state, payload))]
pub async fn capture_payment(
    State(state): State<AppState>,
    CollectorUser(auth): CollectorUser,
    Json(payload): Json<CapturePaymentRequest>,
) -> Result<(StatusCode, Json<PaymentReceipt>), ApiError> {
    let email = payload.client_email.trim().to_lowercase();
    let client = User::find_by_email(&state.db, &email)
        .await?
        .ok_or(ApiError::NotFound("client"))?;

    let loan = Loan::find_active_by_borrower(&state.db, client.id)
        .await?
        .ok_or(ApiError::NoActiveLoan)?;

    let receipt = ledger::apply_payment(
        &state.db,
        &loan,
        Some(auth.id),
        payload.amount,
        payload.method.unwrap_or(PaymentMethod::Cash),
        payload.notes,
    )
    .await?;

    info!(
        collector_id = %auth.id,
        client_id = %client.id,
        amount = payload.amount,
        "payment captured"
    );
    Ok((StatusCode::CREATED, Json(receipt)))
}

fn jitter_around(home: GeoPoint) -> GeoPoint {
    let mut rng = rand::thread_rng();
    GeoPoint {
        lat: home.lat + rng.gen_range(-0.02..0.02),
        lon: home.lon + rng.gen_range(-0.02..0.02),
    }
}

fn stored_point(user: &User) -> Option<GeoPoint> {
    match (user.latitude, user.longitude) {
        (Some(lat), Some(lon)) => Some(GeoPoint { lat, lon }),
        _ => None,
    }
}

/// Coordinates for the collector's own starting point.
async fn home_point(state: &AppState, me: &User) -> GeoPoint {
    if let Some(point) = stored_point(me) {
        return point;
    }
    if let Some(address) = me.address.as_deref() {
        if let Some(point) = state.geocoder.geocode(address).await {
            return point;
        }
    }
    DEFAULT_HOME
}

/// Coordinates for a client stop: stored, else geocoded, else jittered
/// around the collector's home so the stop still renders on the map.
async fn stop_point(state: &AppState, client: &User, home: GeoPoint) -> GeoPoint {
    if let Some(point) = stored_point(client) {
        return point;
    }
    if let Some(address) = client.address.as_deref() {
        if let Some(point) = state.geocoder.geocode(address).await {
            return point;
        }
    }
    jitter_around(home)
}

/// Geolocated client list for the collection workflow. Employees see their
/// assigned clients; administrators see every client.
#[instrument(skip(state))]
pub async fn collection_route(
    State(state): State<AppState>,
    CollectorUser(auth): CollectorUser,
) -> Result<Json<RouteResponse>, ApiError> {
    let me = User::find_by_id(&state.db, auth.id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    let admin_view = auth.role == Role::Administrator;

    let home = home_point(&state, &me).await;

    let clients = if admin_view {
        User::list_by_role(&state.db, Role::Client).await?
    } else {
        User::list_by_collector(&state.db, me.id).await?
    };

    let collector_names: HashMap<Uuid, String> = User::list_by_role(&state.db, Role::Employee)
        .await?
        .iter()
        .map(|u| (u.id, u.full_name()))
        .collect();

    let mut stops = Vec::with_capacity(clients.len());
    for client in &clients {
        let point = stop_point(&state, client, home).await;
        stops.push(RouteStop {
            client_id: client.id,
            name: client.full_name(),
            email: client.email.clone(),
            phone: client.phone.clone(),
            address: client.address.clone(),
            point,
            collector_name: client
                .collector_id
                .and_then(|id| collector_names.get(&id).cloned()),
        });
    }

    Ok(Json(RouteResponse {
        home,
        stops,
        admin_view,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    #[test]
    fn jitter_stays_within_two_hundredths() {
        for _ in 0..64 {
            let p = jitter_around(DEFAULT_HOME);
            assert!((p.lat - DEFAULT_HOME.lat).abs() < 0.02);
            assert!((p.lon - DEFAULT_HOME.lon).abs() < 0.02);
        }
    }

    #[test]
    fn stored_point_requires_both_coordinates() {
        let mut user = User {
            id: Uuid::new_v4(),
            email: "c@example.com".into(),
            password_hash: "x".into(),
            role: Role::Client,
            first_name: None,
            last_name: None,
            document_id: None,
            phone: None,
            address: None,
            latitude: Some(6.25),
            longitude: None,
            employed: false,
            collector_id: None,
            active: true,
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        assert!(stored_point(&user).is_none());
        user.longitude = Some(-75.57);
        assert_eq!(
            stored_point(&user),
            Some(GeoPoint {
                lat: 6.25,
                lon: -75.57
            })
        );
    }
}
