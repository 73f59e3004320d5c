//! Bounded piece vocabulary backing [`MockEngine`](crate::MockEngine).
//!
//! Text is split into pieces that keep their trailing whitespace
//! (`"Hello world"` → `["Hello ", "world"]`), so concatenating decoded pieces
//! reproduces the input exactly.
//!
//! ID layout, starting at `first_id` (everything below is reserved for special
//! tokens):
//! - `first_id + c` for every Unicode scalar `c`: single-character tokens,
//!   always available and never stored;
//! - `first_id + CHAR_TOKENS ..`: learned pieces, assigned on first sight until
//!   `max_pieces` are stored.
//!
//! Once the vocabulary is full, unseen pieces are encoded character by
//! character, so memory stays bounded and the encoding still round-trips.

use std::collections::HashMap;
use std::sync::RwLock;

use llmgate_engine::TokenId;

/// Size of the single-character ID range (all Unicode code points).
pub(crate) const CHAR_TOKENS: TokenId = 0x11_0000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum VocabError {
    UnknownToken(TokenId),
    Poisoned,
}

#[derive(Debug, Default)]
struct VocabState {
    pieces: HashMap<TokenId, String>,
    ids: HashMap<String, TokenId>,
}

pub(crate) struct PieceVocab {
    first_id: TokenId,
    max_pieces: usize,
    state: RwLock<VocabState>,
}

impl PieceVocab {
    pub(crate) fn new(first_id: TokenId, max_pieces: usize) -> Self {
        Self {
            first_id,
            max_pieces,
            state: RwLock::new(VocabState::default()),
        }
    }

    fn char_id(&self, c: char) -> TokenId {
        self.first_id + c as TokenId
    }

    pub(crate) fn encode(&self, text: &str) -> Result<Vec<TokenId>, VocabError> {
        let mut ids = Vec::new();
        let mut unseen = Vec::new();
        {
            let state = self.state.read().map_err(|_| VocabError::Poisoned)?;
            for piece in text.split_inclusive(char::is_whitespace) {
                match state.ids.get(piece) {
                    Some(&id) => ids.push(Some(id)),
                    None => {
                        ids.push(None);
                        unseen.push(piece);
                    }
                }
            }
        }
        if unseen.is_empty() {
            return Ok(ids.into_iter().flatten().collect());
        }

        // Slow path: learn what fits, spell out the rest.
        let mut state = self.state.write().map_err(|_| VocabError::Poisoned)?;
        let mut tokens = Vec::with_capacity(ids.len());
        let mut unseen = unseen.into_iter();
        for id in ids {
            if let Some(id) = id {
                tokens.push(id);
                continue;
            }
            let Some(piece) = unseen.next() else { break };
            if let Some(&id) = state.ids.get(piece) {
                tokens.push(id);
            } else if state.pieces.len() < self.max_pieces {
                let id = self.first_id + CHAR_TOKENS + state.pieces.len() as TokenId;
                state.ids.insert(piece.to_string(), id);
                state.pieces.insert(id, piece.to_string());
                tokens.push(id);
            } else {
                tokens.extend(piece.chars().map(|c| self.char_id(c)));
            }
        }
        Ok(tokens)
    }

    pub(crate) fn decode(&self, tokens: &[TokenId]) -> Result<String, VocabError> {
        let state = self.state.read().map_err(|_| VocabError::Poisoned)?;
        let mut text = String::new();
        for &id in tokens {
            let offset = id - self.first_id;
            if (0..CHAR_TOKENS).contains(&offset) {
                let c = char::from_u32(offset as u32).ok_or(VocabError::UnknownToken(id))?;
                text.push(c);
            } else {
                let piece = state.pieces.get(&id).ok_or(VocabError::UnknownToken(id))?;
                text.push_str(piece);
            }
        }
        Ok(text)
    }

    /// Number of learned pieces.
    pub(crate) fn len(&self) -> usize {
        self.state.read().map(|s| s.pieces.len()).unwrap_or(0)
    }
}
