use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    /// Stable machine-readable identifier surfaced to callers.
    ///
    /// These strings are part of the external contract and must not change.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Session(e) => e.code(),
            AppError::Validation(_) => "validation-error",
            AppError::Storage(_) => "storage-error",
            AppError::Generation(_) => "generation-error",
            AppError::Config { .. } => "config-error",
            AppError::Mcp(_) => "mcp-error",
            AppError::Internal { .. } => "internal-error",
        }
    }
}

/// Session state machine errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {session_id}")]
    NotFound { session_id: String },

    #[error("An active discovery session already exists for project: {project_name}")]
    AlreadyExists { project_name: String },

    #[error("Session {session_id} expired after {timeout_hours}h; start a new session")]
    Expired {
        session_id: String,
        timeout_hours: u64,
    },

    #[error("Invalid stage: {stage}")]
    InvalidStage { stage: String },

    #[error("requirements synthesis must be completed before PRD generation")]
    RequirementsIncomplete,
}

impl SessionError {
    /// Stable machine-readable identifier surfaced to callers.
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::NotFound { .. } => "session-not-found",
            SessionError::AlreadyExists { .. } => "session-exists",
            SessionError::Expired { .. } => "session-expired",
            SessionError::InvalidStage { .. } => "invalid-stage",
            SessionError::RequirementsIncomplete => "requirements-incomplete",
        }
    }
}

/// Payload validation failure naming the offending field
#[derive(Debug, Error)]
#[error("Validation failed: {field} - {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    /// Create a new validation error for a field
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("State file I/O failed: {message}")]
    Io { message: String },

    #[error("State serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Version conflict: expected {expected}, found {actual}")]
    VersionConflict { expected: u64, actual: u64 },
}

/// Text-generation service errors
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generation API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Generation request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Invalid generation response: {message}")]
    InvalidResponse { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Research provider errors
#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("Research provider unavailable: {provider}")]
    ProviderUnavailable { provider: String },

    #[error("Research query failed: {message}")]
    QueryFailed { message: String },
}

/// MCP protocol errors
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Unknown tool: {tool_name}")]
    UnknownTool { tool_name: String },

    #[error("Invalid parameters for {tool_name}: {message}")]
    InvalidParameters { tool_name: String, message: String },

    #[error("Tool execution failed: {message}")]
    ExecutionFailed { message: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<AppError> for McpError {
    fn from(err: AppError) -> Self {
        McpError::ExecutionFailed {
            message: err.to_string(),
        }
    }
}

impl From<ResearchError> for AppError {
    fn from(err: ResearchError) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for generation operations
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Result type alias for research operations
pub type ResearchResult<T> = Result<T, ResearchError>;

/// Result type alias for MCP operations
pub type McpResult<T> = Result<T, McpError>;
