//! Session configuration and lifecycle state.

use std::fmt;
use std::time::Duration;

use linden_constants::namespace::DEFAULT_BASE_PATH;
use linden_constants::session::DEFAULT_CONNECT_RETRIES;
use linden_constants::session::DEFAULT_RETRY_DELAY_MS;
use linden_constants::session::DEFAULT_SESSION_TIMEOUT_MS;
use linden_constants::session::HEARTBEAT_DIVISOR;
use linden_node_types::SessionId;

/// How a [`StoreClient`](crate::StoreClient) establishes and keeps its session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Root under which every Linden namespace lives.
    pub base_path: String,
    /// Requested session timeout. The store may negotiate a different value.
    pub session_timeout: Duration,
    /// Retries after the first failed session-open attempt.
    pub connect_retries: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_BASE_PATH.to_string(),
            session_timeout: Duration::from_millis(DEFAULT_SESSION_TIMEOUT_MS),
            connect_retries: DEFAULT_CONNECT_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

impl SessionConfig {
    /// Use a different base path.
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Use a different retry policy.
    pub fn with_retries(mut self, connect_retries: u32, retry_delay: Duration) -> Self {
        self.connect_retries = connect_retries;
        self.retry_delay = retry_delay;
        self
    }
}

/// Connection state of a store session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No session has been opened yet.
    #[default]
    Disconnected,
    /// A session open is in progress.
    Connecting,
    /// A live session.
    Connected {
        /// Session identifier.
        session: SessionId,
        /// Negotiated timeout.
        timeout: Duration,
    },
    /// The store expired the session. Every ephemeral node it owned is gone.
    Expired,
    /// The session was closed by this client.
    Closed,
}

impl SessionState {
    /// The live session, if connected.
    pub fn session(&self) -> Option<SessionId> {
        match self {
            SessionState::Connected { session, .. } => Some(*session),
            _ => None,
        }
    }

    /// Returns true while a session is live.
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Connected { .. })
    }

    /// Short name for logs and errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Connected { .. } => "connected",
            SessionState::Expired => "expired",
            SessionState::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Heartbeat period for a negotiated session timeout.
pub fn heartbeat_interval(timeout: Duration) -> Duration {
    timeout / HEARTBEAT_DIVISOR
}
