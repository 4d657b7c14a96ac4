//! Server settings from the environment
use crate::error::ApiError;
use tradegen_stages::prices::BINANCE_SPOT_URL;
use tradegen_validation::ValidationProfile;

pub const DEFAULT_ADDR: &str = "0.0.0.0:8787";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    /// `TRADEGEN_ADDR`
    pub addr: String,
    /// `TRADEGEN_PRICE_URL`
    pub price_url: String,
    /// `TRADEGEN_VALIDATION_PROFILE`: a preset name or a path to a YAML profile
    pub validation_profile: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            price_url: BINANCE_SPOT_URL.to_string(),
            validation_profile: "balanced".to_string(),
        }
    }
}

impl ApiSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str, default: String| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };
        Self {
            addr: get("TRADEGEN_ADDR", defaults.addr),
            price_url: get("TRADEGEN_PRICE_URL", defaults.price_url),
            validation_profile: get("TRADEGEN_VALIDATION_PROFILE", defaults.validation_profile),
        }
    }

    /// Resolve the validation profile, reading the file when one is named
    pub fn load_profile(&self) -> Result<ValidationProfile, ApiError> {
        let profile = self.validation_profile.as_str();
        if profile.ends_with(".yaml") || profile.ends_with(".yml") {
            let yaml = std::fs::read_to_string(profile).map_err(|e| ApiError::Io {
                context: format!("reading {profile}"),
                message: e.to_string(),
            })?;
            Ok(ValidationProfile::from_yaml(&yaml)?)
        } else {
            Ok(ValidationProfile::for_mode(profile))
        }
    }
}
