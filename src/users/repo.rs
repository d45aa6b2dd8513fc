use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Employee,
    Administrator,
}

/// Account record. Never hard-deleted; `active` gates login.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub document_id: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub employed: bool,
    pub collector_id: Option<Uuid>,
    pub active: bool,
    pub created_at: OffsetDateTime,
}

const USER_COLUMNS: &str = "id, email, password_hash, role, first_name, last_name, document_id, \
     phone, address, latitude, longitude, employed, collector_id, active, created_at";

#[derive(Debug)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub document_id: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub employed: bool,
    pub collector_id: Option<Uuid>,
    pub active: bool,
}

#[derive(Debug)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub document_id: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub employed: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug)]
pub struct AdminUserUpdate {
    pub email: String,
    pub role: Role,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub document_id: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// `None` clears an existing assignment.
    pub collector_id: Option<Uuid>,
}

impl User {
    pub fn full_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(f), Some(l)) => format!("{f} {l}"),
            (Some(f), None) => f.clone(),
            (None, Some(l)) => l.clone(),
            (None, None) => self.email.clone(),
        }
    }

    /// Profile is complete once the borrower can be visited and phoned.
    pub fn profile_complete(&self) -> bool {
        self.address.as_deref().is_some_and(|a| !a.is_empty())
            && self.phone.as_deref().is_some_and(|p| !p.is_empty())
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn list(db: &PgPool) -> sqlx::Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at");
        sqlx::query_as::<_, User>(&sql).fetch_all(db).await
    }

    pub async fn list_by_role(db: &PgPool, role: Role) -> sqlx::Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE role = $1 ORDER BY created_at");
        sqlx::query_as::<_, User>(&sql)
            .bind(role)
            .fetch_all(db)
            .await
    }

    pub async fn list_by_collector(db: &PgPool, collector_id: Uuid) -> sqlx::Result<Vec<User>> {
        let sql =
            format!("SELECT {USER_COLUMNS} FROM users WHERE collector_id = $1 ORDER BY created_at");
        sqlx::query_as::<_, User>(&sql)
            .bind(collector_id)
            .fetch_all(db)
            .await
    }

    pub async fn create(db: &PgPool, new: &NewUser) -> sqlx::Result<User> {
        let sql = format!(
            "INSERT INTO users (email, password_hash, role, first_name, last_name, document_id, \
             phone, address, employed, collector_id, active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(new.role)
            .bind(&new.first_name)
            .bind(&new.last_name)
            .bind(&new.document_id)
            .bind(&new.phone)
            .bind(&new.address)
            .bind(new.employed)
            .bind(new.collector_id)
            .bind(new.active)
            .fetch_one(db)
            .await
    }

    pub async fn save_profile(db: &PgPool, id: Uuid, p: &ProfileUpdate) -> sqlx::Result<User> {
        let sql = format!(
            "UPDATE users SET first_name = $2, last_name = $3, document_id = $4, phone = $5, \
             address = $6, employed = $7, latitude = $8, longitude = $9 \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(&p.first_name)
            .bind(&p.last_name)
            .bind(&p.document_id)
            .bind(&p.phone)
            .bind(&p.address)
            .bind(p.employed)
            .bind(p.latitude)
            .bind(p.longitude)
            .fetch_one(db)
            .await
    }

    pub async fn admin_update(db: &PgPool, id: Uuid, u: &AdminUserUpdate) -> sqlx::Result<User> {
        let sql = format!(
            "UPDATE users SET email = $2, role = $3, first_name = $4, last_name = $5, \
             document_id = $6, phone = $7, address = $8, collector_id = $9 \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(&u.email)
            .bind(u.role)
            .bind(&u.first_name)
            .bind(&u.last_name)
            .bind(&u.document_id)
            .bind(&u.phone)
            .bind(&u.address)
            .bind(u.collector_id)
            .fetch_one(db)
            .await
    }

    pub async fn set_password(db: &PgPool, id: Uuid, password_hash: &str) -> sqlx::Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn set_active(db: &PgPool, id: Uuid, active: bool) -> sqlx::Result<()> {
        sqlx::query("UPDATE users SET active = $2 WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn assign_collector(
        db: &PgPool,
        client_id: Uuid,
        collector_id: Uuid,
    ) -> sqlx::Result<()> {
        sqlx::query("UPDATE users SET collector_id = $2 WHERE id = $1")
            .bind(client_id)
            .bind(collector_id)
            .execute(db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "ana@example.com".into(),
            password_hash: "x".into(),
            role: Role::Client,
            first_name: Some("Ana".into()),
            last_name: Some("Rojas".into()),
            document_id: Some("1020304050".into()),
            phone: Some("3001234567".into()),
            address: Some("Calle 10 #43-12".into()),
            latitude: None,
            longitude: None,
            employed: false,
            collector_id: None,
            active: true,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn full_name_joins_both_parts() {
        assert_eq!(sample_user().full_name(), "Ana Rojas");
    }

    #[test]
    fn full_name_falls_back_to_email() {
        let mut u = sample_user();
        u.first_name = None;
        u.last_name = None;
        assert_eq!(u.full_name(), "ana@example.com");
    }

    #[test]
    fn profile_complete_needs_address_and_phone() {
        let mut u = sample_user();
        assert!(u.profile_complete());
        u.phone = None;
        assert!(!u.profile_complete());
        u.phone = Some(String::new());
        assert!(!u.profile_complete());
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Role::Administrator).unwrap(),
            "\"administrator\""
        );
    }
}
