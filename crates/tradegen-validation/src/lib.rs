//! Trade validation
//!
//! Independent rules each return a [`ValidationVerdict`]; the
//! [`TradeValidator`] collects them into a [`ValidationReport`]. A trade is
//! usable when no error-severity verdict failed. Warnings are reported but
//! never block.
//!
//! ```
//! use tradegen_validation::{TradeValidator, ValidationContext, ValidationProfile};
//!
//! let validator = TradeValidator::standard();
//! let ctx = ValidationContext::new(ValidationProfile::for_mode("conservative"));
//! assert_eq!(validator.rule_names().len(), 6);
//! assert_eq!(ctx.profile.max_leverage, 5.0);
//! ```

pub mod error;
pub mod market;
pub mod profile;
pub mod rules;
pub mod validator;
pub mod verdict;

pub use error::{ConfigError, ValidationError};
pub use market::{normalize_symbol, MarketQuote, ValidationContext};
pub use profile::ValidationProfile;
pub use rules::{
    ConfidenceRule, EntryDeviationRule, LeverageRule, PriceBoundsRule, RiskRewardRule, Validator,
    VolumeRule,
};
pub use validator::{TradeValidator, ValidationReport};
pub use verdict::{Severity, ValidationVerdict};
