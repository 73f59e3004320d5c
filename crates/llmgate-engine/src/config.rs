//! Model selection, read once at process start.

pub const DEFAULT_MODEL_NAME: &str = "TheBloke/WizardCoder-15B-1.0-GGML";
pub const DEFAULT_MODEL_FILE: &str = "WizardCoder-15B-1.0.ggmlv3.q4_0.bin";
pub const DEFAULT_MODEL_TYPE: &str = "starcoder";

/// Which model the engine loader should construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    /// Repository or directory the model comes from.
    pub name: String,
    /// Weight file inside `name`.
    pub file: String,
    /// Model family (e.g. `starcoder`, `llama`), used to pick a backend.
    pub kind: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_MODEL_NAME.to_string(),
            file: DEFAULT_MODEL_FILE.to_string(),
            kind: DEFAULT_MODEL_TYPE.to_string(),
        }
    }
}

impl ModelConfig {
    /// Read `MODEL_NAME`, `MODEL_FILE` and `MODEL_TYPE`, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        Self {
            name: read("MODEL_NAME", DEFAULT_MODEL_NAME),
            file: read("MODEL_FILE", DEFAULT_MODEL_FILE),
            kind: read("MODEL_TYPE", DEFAULT_MODEL_TYPE),
        }
    }
}
