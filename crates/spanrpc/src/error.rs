//! Error Types - Engine Error Taxonomy and Wire Code Mapping
//!
//! Two layers of error reporting live here:
//!
//! - [`RpcError`] is the internal taxonomy that drives control flow through
//!   the dispatch pipeline. Every fallible stage returns one of its kinds.
//! - The JSON-RPC 2.0 error codes that appear on the wire live in
//!   [`wire`]. Internal kinds are mapped to wire codes exactly once, at the
//!   error-framing boundary, via [`RpcError::wire_code`].
//!
//! The `Display` implementation (through `thiserror`) is the diagnostic
//! string for logs and operators; [`RpcError::wire_message`] is the short
//! string that is actually serialized into error envelopes.

// Layer 1: Standard library imports
// (None required for current thiserror implementation)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
// (None - this module is the bottom of the dependency graph)

/// Reserved JSON-RPC 2.0 error codes as defined in the specification.
pub mod wire {
    /// Parse error - Invalid JSON was received by the server
    pub const PARSE_ERROR: i32 = -32700;

    /// Invalid Request - The JSON sent is not a valid Request object
    pub const INVALID_REQUEST: i32 = -32600;

    /// Method not found - The method does not exist / is not available
    pub const METHOD_NOT_FOUND: i32 = -32601;

    /// Invalid params - Invalid method parameter(s)
    pub const INVALID_PARAMS: i32 = -32602;

    /// Internal error - Internal JSON-RPC error
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Internal error kinds raised by the dispatch pipeline.
///
/// Each pipeline stage reports failure through one of these kinds; the
/// dispatcher maps the kind to a reserved JSON-RPC code when it frames the
/// error envelope. The `Display` text is intentionally more verbose than
/// what goes on the wire - it names the violated rule for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RpcError {
    /// Tokenizer ran out of token slots before the document was consumed
    #[error("not enough tokens available for the document")]
    ParseNoMem,

    /// Tokenizer hit a byte that cannot appear at that position
    #[error("invalid character inside the JSON document")]
    ParseInval,

    /// Document ended before all values and containers were closed
    #[error("JSON document is truncated, more bytes expected")]
    ParsePart,

    /// Outer shell of the request is not a JSON object
    #[error("outer layer of the request must be an object")]
    InvalidOuter,

    /// `jsonrpc` member missing or not the string "2.0"
    #[error("version member must be present and equal to \"2.0\"")]
    InvalidVersion,

    /// `id` member present but not a string, number, or null
    #[error("id member, if present, must be a string, number, or null")]
    InvalidId,

    /// `method` member missing or not a string
    #[error("method member must be present and must be a string")]
    InvalidMethod,

    /// `params` member missing or not an array/object
    #[error("params member must be present and must be an array or object")]
    InvalidParams,

    /// No record registered under the requested method name
    #[error("no such method registered")]
    MethodNotFound,

    /// Supplied params do not match the method's declared signature
    #[error("params do not match the declared signature of the method")]
    ParamsMismatch,

    /// Method registration failed, check name, signature, and handler
    #[error("method installation failed, check name and signature limits")]
    InstallMethods,

    /// Ran out of response buffer while printing the reply
    #[error("ran out of response buffer printing the reply")]
    OutOfResBuf,

    /// Invariant violation inside a handler or the engine itself
    #[error("internal invariant violated")]
    Assertion,
}

/// Convenient result type for engine operations
pub type RpcResult<T> = Result<T, RpcError>;

impl RpcError {
    /// Map this internal kind to the reserved JSON-RPC 2.0 error code that
    /// appears in the wire envelope.
    pub fn wire_code(&self) -> i32 {
        match self {
            RpcError::ParseNoMem | RpcError::ParseInval | RpcError::ParsePart => wire::PARSE_ERROR,
            RpcError::InvalidOuter
            | RpcError::InvalidVersion
            | RpcError::InvalidId
            | RpcError::InvalidMethod
            | RpcError::InvalidParams => wire::INVALID_REQUEST,
            RpcError::MethodNotFound => wire::METHOD_NOT_FOUND,
            RpcError::ParamsMismatch => wire::INVALID_PARAMS,
            RpcError::InstallMethods | RpcError::OutOfResBuf | RpcError::Assertion => {
                wire::INTERNAL_ERROR
            }
        }
    }

    /// Short human-readable message serialized into the error envelope.
    ///
    /// These are purposefully terse, as they are sent over the wire.
    pub fn wire_message(&self) -> &'static str {
        match self.wire_code() {
            wire::PARSE_ERROR => "json parsing error",
            wire::INVALID_REQUEST => "json rpc structure error",
            wire::METHOD_NOT_FOUND => "remote method not found",
            wire::INVALID_PARAMS => "wrong params for remote method",
            _ => "internal error",
        }
    }
}
