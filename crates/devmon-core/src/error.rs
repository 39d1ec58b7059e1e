//! Error types for the plugin boundary and the command layer

use thiserror::Error;

/// Result type for plugin client calls
pub type PluginResult<T> = Result<T, PluginError>;

/// Result type for gateway commands
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors surfaced by a plugin client.
///
/// `Transport`, `Timeout` and `Unavailable` form the transport category:
/// the plugin could not be reached or did not answer in time. `Rejected`
/// means the plugin answered with an error of its own and is still healthy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PluginError {
    /// Connection or I/O failure talking to the plugin
    #[error("Transport error: {0}")]
    Transport(String),

    /// The call did not complete within the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The plugin is reachable but reports itself unavailable
    #[error("Plugin unavailable: {0}")]
    Unavailable(String),

    /// The plugin processed the request and refused it
    #[error("Plugin rejected request ({code}): {message}")]
    Rejected { code: u16, message: String },

    /// The plugin returned a payload that does not match the expected shape
    #[error("Invalid plugin response: {0}")]
    Decode(String),

    /// Plugin metadata is missing a required field
    #[error("Invalid plugin metadata: {0}")]
    InvalidMetadata(String),

    /// The connector cannot speak to this kind of address
    #[error("Not supported: {0}")]
    Unsupported(String),
}

impl PluginError {
    /// Whether this error belongs to the transport category
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            PluginError::Transport(_) | PluginError::Timeout(_) | PluginError::Unavailable(_)
        )
    }

    /// Errors that leave the plugin's health untouched
    pub fn is_benign(&self) -> bool {
        matches!(self, PluginError::Rejected { .. })
    }
}

/// Errors returned by gateway commands.
///
/// Every variant carries a human description and optional free-form
/// context (usually the message of the error that triggered it).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Device, plugin or transaction does not resolve
    #[error("{description}")]
    NotFound {
        description: String,
        context: Option<String>,
    },

    /// Malformed caller input
    #[error("{description}")]
    InvalidUsage {
        description: String,
        context: Option<String>,
    },

    /// Plugin communication failure or broken internal state
    #[error("{description}")]
    Server {
        description: String,
        context: Option<String>,
    },
}

impl GatewayError {
    pub fn not_found(description: impl Into<String>) -> Self {
        GatewayError::NotFound {
            description: description.into(),
            context: None,
        }
    }

    pub fn invalid_usage(description: impl Into<String>) -> Self {
        GatewayError::InvalidUsage {
            description: description.into(),
            context: None,
        }
    }

    pub fn server(description: impl Into<String>) -> Self {
        GatewayError::Server {
            description: description.into(),
            context: None,
        }
    }

    /// Attach context to the error, replacing any existing context
    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        match &mut self {
            GatewayError::NotFound { context, .. }
            | GatewayError::InvalidUsage { context, .. }
            | GatewayError::Server { context, .. } => *context = Some(ctx.into()),
        }
        self
    }

    /// Machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::NotFound { .. } => "not_found",
            GatewayError::InvalidUsage { .. } => "invalid_usage",
            GatewayError::Server { .. } => "server_error",
        }
    }

    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::NotFound { .. } => 404,
            GatewayError::InvalidUsage { .. } => 400,
            GatewayError::Server { .. } => 500,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            GatewayError::NotFound { description, .. }
            | GatewayError::InvalidUsage { description, .. }
            | GatewayError::Server { description, .. } => description,
        }
    }

    pub fn context(&self) -> Option<&str> {
        match self {
            GatewayError::NotFound { context, .. }
            | GatewayError::InvalidUsage { context, .. }
            | GatewayError::Server { context, .. } => context.as_deref(),
        }
    }
}

impl From<PluginError> for GatewayError {
    fn from(err: PluginError) -> Self {
        GatewayError::server("error communicating with plugin").with_context(err.to_string())
    }
}
