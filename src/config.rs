//! Configuration types, read from the environment at startup.

use std::path::PathBuf;
use std::time::Duration;

use chrono::FixedOffset;
use secrecy::SecretString;

use crate::error::ConfigError;

/// WhatsApp Cloud API settings.
#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    /// Token Meta echoes back during the webhook subscription handshake.
    pub verify_token: String,
    /// Bearer token for the Graph API.
    pub access_token: SecretString,
    /// Business phone number id used in the send URL.
    pub phone_number_id: String,
    /// Graph API version segment, e.g. `v22.0`.
    pub api_version: String,
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub whatsapp: WhatsAppConfig,
    /// Google Maps key for place search and reverse geocoding.
    pub google_maps_key: SecretString,
    pub db_path: PathBuf,
    pub port: u16,
    /// How long the POST handler waits for processing before acking anyway.
    pub ack_budget: Duration,
    /// Retention for processed message ids.
    pub dedup_ttl: Duration,
    /// Offset used to turn "now" into the customer's local date and time.
    pub local_offset: FixedOffset,
}

impl AppConfig {
    /// Build the configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };

        let whatsapp = WhatsAppConfig {
            verify_token: required("WHATSAPP_VERIFY_TOKEN")?,
            access_token: SecretString::from(required("WHATSAPP_ACCESS_TOKEN")?),
            phone_number_id: required("WHATSAPP_PHONE_NUMBER_ID")?,
            api_version: lookup("WHATSAPP_API_VERSION").unwrap_or_else(|| "v22.0".to_string()),
        };

        let google_maps_key = SecretString::from(required("GOOGLE_MAPS_API_KEY")?);

        let db_path = lookup("RIDEBOT_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/ridebot.db"));

        let port: u16 = parse_or(&lookup, "RIDEBOT_PORT", 3000)?;
        let ack_ms: u64 = parse_or(&lookup, "RIDEBOT_ACK_BUDGET_MS", 2000)?;
        let ttl_secs: u64 = parse_or(&lookup, "RIDEBOT_DEDUP_TTL_SECS", 86_400)?;
        let offset_minutes: i32 = parse_or(&lookup, "RIDEBOT_UTC_OFFSET_MINUTES", 0)?;

        let local_offset = FixedOffset::east_opt(offset_minutes * 60).ok_or_else(|| {
            ConfigError::InvalidValue {
                key: "RIDEBOT_UTC_OFFSET_MINUTES".into(),
                message: format!("{offset_minutes} minutes is not a valid UTC offset"),
            }
        })?;

        Ok(Self {
            whatsapp,
            google_maps_key,
            db_path,
            port,
            ack_budget: Duration::from_millis(ack_ms),
            dedup_ttl: Duration::from_secs(ttl_secs),
            local_offset,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn base() -> HashMap<String, String> {
        env(&[
            ("WHATSAPP_VERIFY_TOKEN", "verify-me"),
            ("WHATSAPP_ACCESS_TOKEN", "EAAG-token"),
            ("WHATSAPP_PHONE_NUMBER_ID", "1234567890"),
            ("GOOGLE_MAPS_API_KEY", "maps-key"),
        ])
    }

    #[test]
    fn defaults_applied() {
        let vars = base();
        let config = AppConfig::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.whatsapp.api_version, "v22.0");
        assert_eq!(config.ack_budget, Duration::from_millis(2000));
        assert_eq!(config.dedup_ttl, Duration::from_secs(86_400));
        assert_eq!(config.local_offset.local_minus_utc(), 0);
        assert_eq!(config.whatsapp.access_token.expose_secret(), "EAAG-token");
        assert_eq!(config.db_path, PathBuf::from("./data/ridebot.db"));
    }

    #[test]
    fn missing_required_var() {
        let mut vars = base();
        vars.remove("WHATSAPP_VERIFY_TOKEN");
        let err = AppConfig::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "WHATSAPP_VERIFY_TOKEN"));
    }

    #[test]
    fn blank_required_var_counts_as_missing() {
        let mut vars = base();
        vars.insert("GOOGLE_MAPS_API_KEY".into(), "   ".into());
        let err = AppConfig::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn invalid_port_rejected() {
        let mut vars = base();
        vars.insert("RIDEBOT_PORT".into(), "eighty".into());
        let err = AppConfig::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "RIDEBOT_PORT"));
    }

    #[test]
    fn utc_offset_parsed() {
        let mut vars = base();
        vars.insert("RIDEBOT_UTC_OFFSET_MINUTES".into(), "60".into());
        let config = AppConfig::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.local_offset.local_minus_utc(), 3600);
    }

    #[test]
    fn absurd_utc_offset_rejected() {
        let mut vars = base();
        vars.insert("RIDEBOT_UTC_OFFSET_MINUTES".into(), "100000".into());
        assert!(AppConfig::from_lookup(|k| vars.get(k).cloned()).is_err());
    }
}
