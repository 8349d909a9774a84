//! Error types for the Trello client.
//!
//! # Design
//! Two classes of failure exist. Argument errors are detected synchronously,
//! before anything touches the network, and are returned straight from the
//! dispatching call. Everything else happens after dispatch and is delivered
//! through the same channel as a successful payload (the future or the
//! completion handler). [`TrelloError::kind`] exposes that split.

use std::error::Error;
use std::fmt;

/// Boxed error carried by [`TransportError`].
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Errors produced by the Trello client.
#[derive(Debug, thiserror::Error)]
pub enum TrelloError {
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] InvalidArgument),

    /// The request never produced an HTTP response (connection refused,
    /// timeout, TLS failure, ...).
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    /// The service answered 404.
    #[error("resource not found")]
    NotFound,

    /// The service answered with a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// A 2xx response whose JSON payload is an error object.
    #[error("service error: {0}")]
    Service(String),

    #[error("response decoding failed: {0}")]
    Decode(String),

    /// Missing or unusable client configuration.
    #[error("configuration: {0}")]
    Config(String),

    /// No tokio runtime was available to drive the request.
    #[error("no async runtime: {0}")]
    Runtime(String),

    /// The task driving the request was cancelled or panicked.
    #[error("request task failed: {0}")]
    Task(String),
}

/// Coarse classification of a [`TrelloError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Reported synchronously, before any I/O: bad arguments, and the setup
    /// failures (`Config`, `Runtime`) a caller fixes the same way.
    InvalidArgument,
    /// Anything that went wrong during or after the network exchange.
    Transport,
}

impl TrelloError {
    /// `Config` and `Runtime` are setup failures: nothing was sent.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrelloError::InvalidArgument(_)
            | TrelloError::Config(_)
            | TrelloError::Runtime(_) => ErrorKind::InvalidArgument,
            _ => ErrorKind::Transport,
        }
    }

    /// HTTP status carried by the error, if the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            TrelloError::NotFound => Some(404),
            TrelloError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Rejected input to the dispatcher or to dynamic options conversion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidArgument {
    #[error("unsupported HTTP method {0:?}, expected one of GET, POST, PUT, DELETE")]
    UnsupportedVerb(String),

    #[error("options must be an object, got {found}")]
    OptionsNotObject { found: &'static str },

    #[error("options.{field} must be an object, got {found}")]
    FieldNotObject {
        field: &'static str,
        found: &'static str,
    },

    #[error("options.{field}.{key} must be a string, number, boolean or date")]
    NonScalarValue { field: &'static str, key: String },

    #[error("options.{field}.{key} must be a finite number")]
    NonFiniteNumber { field: &'static str, key: String },
}

/// Failure reported by a [`Transport`](crate::transport::Transport).
#[derive(Debug)]
pub struct TransportError(BoxError);

impl TransportError {
    pub fn new(e: impl Into<BoxError>) -> Self {
        Self(e.into())
    }

    /// Transport error from a plain message.
    pub fn message(msg: impl Into<String>) -> Self {
        Self(msg.into().into())
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Display is the wrapped error; the chain resumes at its source.
impl Error for TransportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.0.source()
    }
}

impl From<ureq::Error> for TransportError {
    fn from(e: ureq::Error) -> Self {
        Self::new(e)
    }
}
