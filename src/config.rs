use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Lending policy knobs: two-tier principal ceilings and the flat nominal
/// monthly rate applied by the origination engine.
#[derive(Debug, Clone, Deserialize)]
pub struct CreditPolicy {
    pub employed_ceiling: i64,
    pub independent_ceiling: i64,
    pub monthly_rate: f64,
}

impl Default for CreditPolicy {
    fn default() -> Self {
        Self {
            employed_ceiling: 5_000_000,
            independent_ceiling: 1_500_000,
            monthly_rate: 0.025,
        }
    }
}

impl CreditPolicy {
    pub fn ceiling_for(&self, employed: bool) -> i64 {
        if employed {
            self.employed_ceiling
        } else {
            self.independent_ceiling
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub credit: CreditPolicy,
    pub geocoder_url: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "agora".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "agora-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            refresh_ttl_minutes: std::env::var("JWT_REFRESH_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
        };
        let defaults = CreditPolicy::default();
        let credit = CreditPolicy {
            employed_ceiling: std::env::var("CREDIT_EMPLOYED_CEILING")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(defaults.employed_ceiling),
            independent_ceiling: std::env::var("CREDIT_INDEPENDENT_CEILING")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(defaults.independent_ceiling),
            monthly_rate: std::env::var("CREDIT_MONTHLY_RATE")
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(defaults.monthly_rate),
        };
        let geocoder_url = std::env::var("GEOCODER_URL")
            .unwrap_or_else(|_| "https://nominatim.openstreetmap.org/search".into());
        Ok(Self {
            database_url,
            jwt,
            credit,
            geocoder_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceiling_is_tiered_by_employment() {
        let policy = CreditPolicy::default();
        assert_eq!(policy.ceiling_for(true), 5_000_000);
        assert_eq!(policy.ceiling_for(false), 1_500_000);
        assert!(policy.ceiling_for(true) > policy.ceiling_for(false));
    }
}
