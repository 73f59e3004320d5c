//! Integration tests for llmgate-runtime.
//!
//! Validates:
//! - The `mock` model type is served end-to-end through the lazy handle
//! - Streaming detokenization matches the direct-call output
//! - Concurrent use of one shared engine instance

use llmgate_engine::{Engine, HandleState, ModelConfig, ModelHandle};
use llmgate_runtime::{MockEngine, RuntimeLoader};
use std::sync::Arc;

fn mock_config() -> ModelConfig {
    ModelConfig {
        name: "local/mock".to_string(),
        file: "mock.bin".to_string(),
        kind: "mock".to_string(),
    }
}

#[test]
fn handle_serves_mock_engine() {
    let handle = ModelHandle::new(mock_config(), Arc::new(RuntimeLoader::new()));
    let engine = handle.acquire().unwrap();
    assert_eq!(handle.state(), HandleState::Ready);
    assert_eq!(engine.complete("Hello world").unwrap(), "Hello world");
}

#[test]
fn default_config_is_not_servable_without_backend() {
    let handle = ModelHandle::new(ModelConfig::default(), Arc::new(RuntimeLoader::new()));
    assert!(handle.acquire().is_err());
    assert_eq!(handle.state(), HandleState::Uninitialized);
}

#[test]
fn streamed_chunks_concatenate_to_completion() {
    let engine = MockEngine::new();
    let prompt = "def fib(n):\n    return n";
    let tokens = engine.tokenize(prompt).unwrap();
    let mut streamed = String::new();
    for token in engine.generate(&tokens).unwrap() {
        let token = token.unwrap();
        streamed.push_str(&engine.detokenize(&[token]).unwrap());
    }
    assert_eq!(streamed, engine.complete(prompt).unwrap());
}

#[test]
fn shared_engine_serves_concurrent_generations() {
    let engine: Arc<dyn Engine> = Arc::new(MockEngine::new());
    let threads: Vec<_> = (0..8)
        .map(|i| {
            let engine = engine.clone();
            std::thread::spawn(move || {
                let prompt = format!("request {} says hi", i);
                (prompt.clone(), engine.complete(&prompt).unwrap())
            })
        })
        .collect();
    for t in threads {
        let (prompt, output) = t.join().unwrap();
        assert_eq!(prompt, output);
    }
}
