//! Deterministic echo engine.
//!
//! Generation replays the prompt's pieces one token at a time and then emits
//! [`EOS_TOKEN`]. Used by the `mock` model type and throughout the tests.

use std::sync::Arc;

use llmgate_engine::{Engine, EngineError, Result, TokenId, TokenStream};

use crate::vocab::{PieceVocab, VocabError};

/// End-of-sequence token. Decodes to the empty string.
pub const EOS_TOKEN: TokenId = 0;

const DEFAULT_MAX_CONTEXT: usize = 2048;

/// Learned pieces kept before unseen text is spelled out per character.
pub const DEFAULT_VOCAB_CAPACITY: usize = 32_768;

pub struct MockEngine {
    vocab: Arc<PieceVocab>,
    max_context: usize,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            vocab: Arc::new(PieceVocab::new(EOS_TOKEN + 1, DEFAULT_VOCAB_CAPACITY)),
            max_context: DEFAULT_MAX_CONTEXT,
        }
    }

    /// Reject prompts longer than `max_context` tokens.
    pub fn with_max_context(mut self, max_context: usize) -> Self {
        self.max_context = max_context;
        self
    }

    /// Cap the number of learned pieces.
    pub fn with_vocab_capacity(mut self, max_pieces: usize) -> Self {
        self.vocab = Arc::new(PieceVocab::new(EOS_TOKEN + 1, max_pieces));
        self
    }

    /// Pieces learned so far.
    pub fn learned_pieces(&self) -> usize {
        self.vocab.len()
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for MockEngine {
    fn tokenize(&self, text: &str) -> Result<Vec<TokenId>> {
        if text.is_empty() {
            return Err(EngineError::Tokenization("empty prompt".to_string()));
        }
        let tokens = self.vocab.encode(text).map_err(|e| match e {
            VocabError::Poisoned => EngineError::Tokenization("vocabulary lock poisoned".to_string()),
            VocabError::UnknownToken(id) => EngineError::Tokenization(format!("invalid token {}", id)),
        })?;
        if tokens.len() > self.max_context {
            return Err(EngineError::Tokenization(format!(
                "prompt is {} tokens, context window is {}",
                tokens.len(),
                self.max_context
            )));
        }
        Ok(tokens)
    }

    fn generate(&self, tokens: &[TokenId]) -> Result<TokenStream> {
        if tokens.is_empty() {
            return Err(EngineError::Generation("empty prompt".to_string()));
        }
        let echo = tokens.to_vec();
        Ok(Box::new(
            echo.into_iter()
                .chain(std::iter::once(EOS_TOKEN))
                .map(Ok),
        ))
    }

    fn detokenize(&self, tokens: &[TokenId]) -> Result<String> {
        let content: Vec<TokenId> = tokens.iter().copied().filter(|&t| t != EOS_TOKEN).collect();
        self.vocab.decode(&content).map_err(|e| match e {
            VocabError::UnknownToken(id) => EngineError::Generation(format!("invalid token {}", id)),
            VocabError::Poisoned => EngineError::Generation("vocabulary lock poisoned".to_string()),
        })
    }

    fn is_end_of_sequence(&self, token: TokenId) -> bool {
        token == EOS_TOKEN
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::CHAR_TOKENS;

    #[test]
    fn echoes_prompt_then_eos() {
        let engine = MockEngine::new();
        let tokens = engine.tokenize("Hello world").unwrap();
        let generated: Vec<TokenId> = engine
            .generate(&tokens)
            .unwrap()
            .map(|t| t.unwrap())
            .collect();
        assert_eq!(generated.len(), 3);
        assert!(engine.is_end_of_sequence(*generated.last().unwrap()));
        assert_eq!(engine.detokenize(&generated).unwrap(), "Hello world");
    }

    #[test]
    fn eos_detokenizes_to_empty() {
        let engine = MockEngine::new();
        assert_eq!(engine.detokenize(&[EOS_TOKEN]).unwrap(), "");
    }

    #[test]
    fn complete_returns_prompt() {
        let engine = MockEngine::new();
        assert_eq!(engine.complete("Hello world").unwrap(), "Hello world");
    }

    #[test]
    fn empty_prompt_is_rejected() {
        let engine = MockEngine::new();
        assert!(matches!(engine.tokenize(""), Err(EngineError::Tokenization(_))));
    }

    #[test]
    fn oversized_prompt_is_rejected() {
        let engine = MockEngine::new().with_max_context(2);
        assert!(engine.tokenize("one two").is_ok());
        let err = engine.tokenize("one two three").unwrap_err();
        assert!(err.to_string().contains("context window is 2"));
    }

    #[test]
    fn unknown_token_fails_generation_side() {
        let engine = MockEngine::new();
        let unused = EOS_TOKEN + 1 + CHAR_TOKENS + 99;
        assert!(matches!(engine.detokenize(&[unused]), Err(EngineError::Generation(_))));
    }

    #[test]
    fn vocabulary_stops_growing_at_capacity() {
        let engine = MockEngine::new().with_vocab_capacity(4);
        for i in 0..50 {
            let prompt = format!("distinct prompt {}", i);
            assert_eq!(engine.complete(&prompt).unwrap(), prompt);
        }
        assert_eq!(engine.learned_pieces(), 4);
    }
}
