use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("CONFIG/invalid validation profile: {0}")]
    Yaml(String),

    #[error("CONFIG/{field} must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: f64,
    },
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(e: serde_yaml::Error) -> Self {
        ConfigError::Yaml(e.to_string())
    }
}

/// A trade failed at least one error-severity rule.
///
/// Not fatal to a pipeline run: such trades are routed to the invalid list.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("VALIDATION/{asset} ({trade_id}) failed {}", rules.join(", "))]
pub struct ValidationError {
    pub trade_id: String,
    pub asset: String,
    pub rules: Vec<String>,
}
