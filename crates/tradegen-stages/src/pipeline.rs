//! Standard trade-generation pipeline assembly
use crate::call::CallProvider;
use crate::enrich::EnrichGlassBox;
use crate::keys::{AI_RESPONSE, FINAL, MARKET_CONTEXT, PARSED, PRICES, PROMPT, VALIDATED};
use crate::market::{BuildMarketContext, FetchPrices};
use crate::parse::ParseResponse;
use crate::prices::PriceSource;
use crate::prompt::GeneratePrompt;
use crate::validate::ValidateTrades;
use std::sync::Arc;
use std::time::Duration;
use tradegen_core::{AssemblyError, PipelineConfig, PipelineRunner, StepDefinition};
use tradegen_glassbox::RiskBands;
use tradegen_providers::ProviderRegistry;
use tradegen_validation::{TradeValidator, ValidationProfile};

/// Collaborators injected into the standard steps
#[derive(Clone)]
pub struct PipelineDeps {
    pub registry: Arc<ProviderRegistry>,
    pub prices: Arc<dyn PriceSource>,
    pub validator: Arc<TradeValidator>,
    pub profile: ValidationProfile,
    pub bands: RiskBands,
    pub config: PipelineConfig,
}

impl PipelineDeps {
    /// Standard validators, balanced profile, default risk bands
    pub fn new(registry: Arc<ProviderRegistry>, prices: Arc<dyn PriceSource>) -> Self {
        Self {
            registry,
            prices,
            validator: Arc::new(TradeValidator::standard()),
            profile: ValidationProfile::balanced(),
            bands: RiskBands::default(),
            config: PipelineConfig::default(),
        }
    }

    pub fn with_profile(mut self, profile: ValidationProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }
}

const PURE_STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// The seven step declarations, in execution order.
///
/// Price fetching is optional: without it the run continues on the model's
/// own knowledge and the price-aware validators pass vacuously.
pub fn standard_steps(deps: &PipelineDeps) -> Vec<StepDefinition> {
    vec![
        StepDefinition::new(PRICES.name(), FetchPrices::new(deps.prices.clone()))
            .with_description("Fetch 24h tickers for the requested symbols")
            .optional()
            .with_timeout(Duration::from_secs(10))
            .with_retries(2),
        StepDefinition::new(MARKET_CONTEXT.name(), BuildMarketContext)
            .with_description("Summarize live market data")
            .with_timeout(PURE_STEP_TIMEOUT),
        StepDefinition::new(PROMPT.name(), GeneratePrompt)
            .with_description("Render system and user prompts")
            .with_timeout(PURE_STEP_TIMEOUT),
        StepDefinition::new(AI_RESPONSE.name(), CallProvider::new(deps.registry.clone()))
            .with_description("Ask the configured AI provider for trades")
            .with_timeout(Duration::from_secs(90))
            .with_retries(1),
        StepDefinition::new(PARSED.name(), ParseResponse)
            .with_description("Extract trades from the provider answer")
            .with_timeout(PURE_STEP_TIMEOUT),
        StepDefinition::new(
            VALIDATED.name(),
            ValidateTrades::new(deps.validator.clone(), deps.profile.clone()),
        )
        .with_description("Run trade validators")
        .with_timeout(PURE_STEP_TIMEOUT),
        StepDefinition::new(FINAL.name(), EnrichGlassBox::new(deps.bands))
            .with_description("Attach glass box explanations and summarize")
            .with_timeout(PURE_STEP_TIMEOUT),
    ]
}

pub fn standard_pipeline(deps: &PipelineDeps) -> Result<PipelineRunner, AssemblyError> {
    let mut runner = PipelineRunner::with_config(deps.config.clone());
    for step in standard_steps(deps) {
        runner.add_step(step)?;
    }
    Ok(runner)
}
