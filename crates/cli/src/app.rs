//! Composition root: config, grounding document, backend and orchestrator.

use std::path::Path;
use std::sync::Arc;

use mysa_config::AppConfig;
use mysa_context::ContextProvider;
use mysa_orchestrator::Orchestrator;

pub struct App {
    pub config: AppConfig,
    pub context: ContextProvider,
    pub orchestrator: Orchestrator,
}

impl App {
    pub fn load(config_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let config = AppConfig::load_with_overrides(config_path)
            .map_err(|e| format!("Failed to load config: {e}"))?;
        Self::from_config(config)
    }

    pub fn from_config(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let source = mysa_context::source_for(&config.context.source)?;
        let context = ContextProvider::new(source).with_persona_name(&config.persona.name);

        let credential = Arc::new(config.credential_source());
        let provider = mysa_providers::build_from_config(&config, credential)?;
        let orchestrator = Orchestrator::from_config(provider, &config);

        Ok(Self {
            config,
            context,
            orchestrator,
        })
    }
}
