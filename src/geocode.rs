use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// A resolved coordinate pair. Used only for display and collection routing,
/// never by the financial core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve a free-form address. `None` on miss, failure or timeout.
    async fn geocode(&self, address: &str) -> Option<GeoPoint>;
}

#[derive(Debug, Deserialize)]
struct NominatimHit {
    lat: String,
    lon: String,
}

/// Nominatim search client with a bounded timeout.
#[derive(Clone)]
pub struct Nominatim {
    client: reqwest::Client,
    search_url: String,
}

impl Nominatim {
    pub fn new(search_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("AgoraFinanceApp/1.0")
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            search_url: search_url.to_string(),
        })
    }
}

#[async_trait]
impl Geocoder for Nominatim {
    async fn geocode(&self, address: &str) -> Option<GeoPoint> {
        if address.trim().is_empty() {
            return None;
        }
        let res = self
            .client
            .get(&self.search_url)
            .query(&[("q", address), ("format", "json")])
            .send()
            .await;
        let response = match res {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                warn!(status = %r.status(), "geocoder returned non-success");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "geocoder request failed");
                return None;
            }
        };
        let hits: Vec<NominatimHit> = match response.json().await {
            Ok(h) => h,
            Err(e) => {
                warn!(error = %e, "geocoder returned unparseable body");
                return None;
            }
        };
        let first = hits.first()?;
        match (first.lat.parse::<f64>(), first.lon.parse::<f64>()) {
            (Ok(lat), Ok(lon)) => Some(GeoPoint { lat, lon }),
            _ => None,
        }
    }
}

/// Geocoder that never resolves anything. Used by `AppState::fake()`.
pub struct NullGeocoder;

#[async_trait]
impl Geocoder for NullGeocoder {
    async fn geocode(&self, _address: &str) -> Option<GeoPoint> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_geocoder_never_resolves() {
        assert_eq!(NullGeocoder.geocode("Calle 10 #43-12 Medellín").await, None);
    }

    #[tokio::test]
    async fn empty_address_short_circuits() {
        // No request is made for a blank address, so an unroutable URL is fine.
        let geo = Nominatim::new("http://127.0.0.1:1/search").expect("client");
        assert_eq!(geo.geocode("   ").await, None);
    }

    #[test]
    fn nominatim_hit_parses_string_coordinates() {
        let hits: Vec<NominatimHit> =
            serde_json::from_str(r#"[{"lat":"6.2442","lon":"-75.5812"}]"#).unwrap();
        assert_eq!(hits[0].lat.parse::<f64>().unwrap(), 6.2442);
    }
}
