//! Server configuration, read from the environment at startup.

use std::net::SocketAddr;
use std::str::FromStr;

/// Address the gateway listens on.
pub const DEFAULT_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_MAX_CONCURRENT_SESSIONS: usize = 4;
pub const DEFAULT_MAX_BACKGROUND_BACKLOG: usize = 16;

/// How `/v2/chat/completions` delivers its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum V2Mode {
    /// Server-sent events fed by a blocking-pool worker.
    #[default]
    Sse,
    /// Acknowledge immediately and generate in a detached task.
    Background,
}

impl FromStr for V2Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sse" | "stream" => Ok(V2Mode::Sse),
            "background" | "detached" => Ok(V2Mode::Background),
            other => Err(format!("unknown v2 mode `{}`", other)),
        }
    }
}

/// Server configuration parameters.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Maximum generations in flight. 1 serializes access to the engine.
    pub max_concurrent_sessions: usize,
    /// Background generations accepted (waiting or running) before new ones
    /// are rejected with 503.
    pub max_background_backlog: usize,
    pub v2_mode: V2Mode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            max_concurrent_sessions: DEFAULT_MAX_CONCURRENT_SESSIONS,
            max_background_backlog: DEFAULT_MAX_BACKGROUND_BACKLOG,
            v2_mode: V2Mode::default(),
        }
    }
}

impl ServerConfig {
    /// Read `MAX_CONCURRENT_SESSIONS`, `MAX_BACKGROUND_BACKLOG` and
    /// `LLMGATE_V2_MODE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unparsable values keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup("MAX_CONCURRENT_SESSIONS") {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.max_concurrent_sessions = n,
                _ => tracing::warn!(value = %raw, "ignoring invalid MAX_CONCURRENT_SESSIONS"),
            }
        }

        if let Some(raw) = lookup("MAX_BACKGROUND_BACKLOG") {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.max_background_backlog = n,
                _ => tracing::warn!(value = %raw, "ignoring invalid MAX_BACKGROUND_BACKLOG"),
            }
        }

        if let Some(raw) = lookup("LLMGATE_V2_MODE") {
            match raw.parse::<V2Mode>() {
                Ok(mode) => config.v2_mode = mode,
                Err(err) => tracing::warn!(%err, "ignoring invalid LLMGATE_V2_MODE"),
            }
        }

        config
    }
}
