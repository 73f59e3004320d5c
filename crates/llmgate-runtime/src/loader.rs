//! Model-type registry used by the model handle to construct its engine.

use std::collections::HashMap;
use std::sync::Arc;

use llmgate_engine::{Engine, EngineError, EngineLoader, ModelConfig, Result};

use crate::mock::MockEngine;

/// GGML model families the gateway recognizes. Each needs a backend registered
/// with [`RuntimeLoader::register`] before it can be served.
pub const GGML_MODEL_TYPES: &[&str] = &[
    "gpt2",
    "gptj",
    "gpt_neox",
    "dolly-v2",
    "starcoder",
    "falcon",
    "llama",
    "mpt",
    "replit",
];

type Factory = Box<dyn Fn(&ModelConfig) -> Result<Arc<dyn Engine>> + Send + Sync>;

/// Maps `ModelConfig.kind` to an engine factory.
pub struct RuntimeLoader {
    factories: HashMap<String, Factory>,
}

impl RuntimeLoader {
    /// A loader with no model types registered.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A loader with the built-in `mock` type registered.
    pub fn new() -> Self {
        Self::empty().register("mock", |_| Ok(Arc::new(MockEngine::new()) as Arc<dyn Engine>))
    }

    pub fn register<F>(mut self, kind: &str, factory: F) -> Self
    where
        F: Fn(&ModelConfig) -> Result<Arc<dyn Engine>> + Send + Sync + 'static,
    {
        self.factories.insert(kind.to_string(), Box::new(factory));
        self
    }

    pub fn supports(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }
}

impl Default for RuntimeLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineLoader for RuntimeLoader {
    fn load(&self, config: &ModelConfig) -> Result<Arc<dyn Engine>> {
        if let Some(factory) = self.factories.get(&config.kind) {
            return factory(config);
        }
        if GGML_MODEL_TYPES.contains(&config.kind.as_str()) {
            return Err(EngineError::ModelLoad(format!(
                "no backend registered for model type `{}` ({}/{})",
                config.kind, config.name, config.file
            )));
        }
        Err(EngineError::ModelLoad(format!(
            "unsupported model type `{}`",
            config.kind
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(kind: &str) -> ModelConfig {
        ModelConfig {
            kind: kind.to_string(),
            ..ModelConfig::default()
        }
    }

    #[test]
    fn mock_is_built_in() {
        let loader = RuntimeLoader::new();
        assert!(loader.supports("mock"));
        let engine = loader.load(&config("mock")).unwrap();
        assert_eq!(engine.complete("ping").unwrap(), "ping");
    }

    #[test]
    fn known_family_without_backend_fails_with_context() {
        let err = RuntimeLoader::new().load(&config("starcoder")).err().unwrap();
        let msg = err.to_string();
        assert!(msg.contains("no backend registered"), "{msg}");
        assert!(msg.contains("WizardCoder-15B-1.0.ggmlv3.q4_0.bin"), "{msg}");
    }

    #[test]
    fn unknown_family_is_unsupported() {
        let err = RuntimeLoader::new().load(&config("bert")).err().unwrap();
        assert!(err.to_string().contains("unsupported model type `bert`"));
    }

    #[test]
    fn registered_factory_sees_config() {
        let loader = RuntimeLoader::empty().register("llama", |config| {
            if config.file.ends_with(".bin") {
                Ok(Arc::new(MockEngine::new()) as Arc<dyn Engine>)
            } else {
                Err(EngineError::ModelLoad(format!("bad file {}", config.file)))
            }
        });
        assert!(loader.load(&config("llama")).is_ok());
        assert!(!loader.supports("mock"));
    }
}
