use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::repo::Role;

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub document_id: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub employed: bool,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub document_id: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub employed: bool,
    pub complete: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub document_id: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub employed: bool,
    /// Client accounts may be assigned a collector at creation.
    pub collector_email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub email: String,
    pub role: Role,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub document_id: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Omitting the collector clears any existing assignment.
    pub collector_email: Option<String>,
    /// Only set when the administrator is resetting the password.
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub field: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub active: bool,
    pub employed: bool,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub collector_email: Option<String>,
}
