use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geocode::GeoPoint;
use crate::payments::repo::PaymentMethod;

#[derive(Debug, Deserialize)]
pub struct CapturePaymentRequest {
    pub client_email: String,
    pub amount: i64,
    pub method: Option<PaymentMethod>,
    pub notes: Option<String>,
}

/// One client on a collector's route.
#[derive(Debug, Serialize)]
pub struct RouteStop {
    pub client_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub point: GeoPoint,
    pub collector_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RouteResponse {
    pub home: GeoPoint,
    pub stops: Vec<RouteStop>,
    pub admin_view: bool,
}
