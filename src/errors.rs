use serde::Deserialize;
use std::fmt;

/// Library-specific error types.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// Bad request error (invalid caller input).
    BadRequest(String),
    /// Structured error envelope returned by the Graph API.
    GraphApi {
        /// Human-readable message from the platform.
        message: String,
        /// Error class, e.g. "OAuthException".
        error_type: Option<String>,
        /// Platform error code.
        code: Option<i64>,
        /// Platform error subcode.
        subcode: Option<i64>,
        /// Trace id for support tickets.
        fbtrace_id: Option<String>,
    },
    /// Transport or decoding failure talking to the platform.
    ExternalApiError(String),
    /// Internal library error.
    InternalError(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<ApiError>,
        /// Additional context message.
        context: String,
    },
}

impl fmt::Display for ApiError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::GraphApi {
                message,
                error_type,
                code,
                subcode,
                fbtrace_id,
            } => {
                write!(f, "Graph API error: {}", message)?;
                if let Some(t) = error_type {
                    write!(f, " (type: {})", t)?;
                }
                if let Some(c) = code {
                    write!(f, " (code: {}", c)?;
                    if let Some(s) = subcode {
                        write!(f, ", subcode: {}", s)?;
                    }
                    write!(f, ")")?;
                }
                if let Some(trace) = fbtrace_id {
                    write!(f, " [fbtrace_id: {}]", trace)?;
                }
                Ok(())
            }
            ApiError::ExternalApiError(msg) => write!(f, "External API error: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    /// Converts a `reqwest::Error` into an `ApiError`.
    ///
    /// The URL is stripped first so the access token query parameter never
    /// leaks into error messages.
    fn from(err: reqwest::Error) -> Self {
        ApiError::ExternalApiError(err.without_url().to_string())
    }
}

/// Error envelope the Graph API wraps every failure in:
/// `{"error": {"message": ..., "type": ..., "code": ..., ...}}`.
#[derive(Debug, Deserialize)]
struct GraphErrorEnvelope {
    error: GraphErrorBody,
}

#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
    code: Option<i64>,
    error_subcode: Option<i64>,
    fbtrace_id: Option<String>,
}

impl ApiError {
    /// Builds an error from a non-success response body.
    ///
    /// Decodes the Graph error envelope when present, otherwise falls back
    /// to the raw status and body.
    pub fn from_error_body(status: u16, body: &str) -> Self {
        match serde_json::from_str::<GraphErrorEnvelope>(body) {
            Ok(envelope) => ApiError::GraphApi {
                message: envelope.error.message,
                error_type: envelope.error.error_type,
                code: envelope.error.code,
                subcode: envelope.error.error_subcode,
                fbtrace_id: envelope.error.fbtrace_id,
            },
            Err(_) => ApiError::ExternalApiError(format!(
                "Graph API returned {}: {}",
                status, body
            )),
        }
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `ApiError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    ///
    /// # Arguments
    ///
    /// * `context` - The context message to add.
    fn context(self, context: impl Into<String>) -> Result<T, ApiError>;

    /// Add context lazily (only evaluated on error).
    ///
    /// # Arguments
    ///
    /// * `f` - A closure that produces the context message.
    fn with_context<F>(self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, ApiError> {
    fn context(self, context: impl Into<String>) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| ApiError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}
