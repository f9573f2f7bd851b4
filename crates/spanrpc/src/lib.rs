//! spanrpc - Embeddable Zero-Copy JSON-RPC 2.0 Dispatch Engine
//!
//! This crate dispatches single JSON-RPC 2.0 requests entirely over
//! caller-owned buffers: the request is tokenized once into a flat token
//! tree, every later inspection slices byte ranges of the original input,
//! and the response is formatted straight into a caller-provided output
//! region. The dispatch path performs no allocation.
//!
//! # Architecture
//!
//! The engine is organized as a pipeline of small, separately testable
//! pieces:
//!
//! - **Token view** (`token`): typed byte ranges with child/sibling links
//!   into a flat array - the only representation of the request JSON
//! - **Tokenizer** (`tokenizer`): the bundled producer of that array;
//!   replaceable by anything honoring the same contract
//! - **Validator** (`validator`): JSON-RPC 2.0 structural rules, member
//!   caching, notification classification
//! - **Registry** (`registry`): radix-tree method index with `dyn Handler`
//!   records
//! - **Engine** (`engine`): validate → resolve → check params → invoke,
//!   envelope framing, and the error framer
//! - **Response buffer** (`response`): bounded append-only output with
//!   all-or-nothing writes
//! - **Numeric decoder** (`number`): JSON decimal to `f64` straight from
//!   token spans
//!
//! # Quick Start
//!
//! ```rust
//! use spanrpc::{Engine, MethodRecord, Request, ResponseBuffer, RpcError, Token, TokenKind};
//!
//! // One-time setup: register methods while the engine is exclusively
//! // owned.
//! let mut engine = Engine::new();
//! engine.register(
//!     MethodRecord::new("subtract", |req: &Request<'_>, res: &mut ResponseBuffer<'_>| {
//!         let params = req.params_value().ok_or(RpcError::Assertion)?;
//!         let a = req.array_item(params, 0).and_then(|i| req.number(i));
//!         let b = req.array_item(params, 1).and_then(|i| req.number(i));
//!         match (a, b) {
//!             (Some(a), Some(b)) => res.append(format_args!("{:.6}", a - b)),
//!             _ => Err(RpcError::ParamsMismatch),
//!         }
//!     })
//!     .with_params(&[TokenKind::Primitive, TokenKind::Primitive]),
//! )?;
//!
//! // Per request: caller-owned input, token array, and output region.
//! let input = br#"{"jsonrpc":"2.0","method":"subtract","params":[42,23],"id":1}"#;
//! let mut tokens = [Token::EMPTY; 64];
//! let mut region = [0u8; 512];
//! let mut response = ResponseBuffer::new(&mut region);
//!
//! engine.dispatch(input, &mut tokens, &mut response)?;
//! assert_eq!(
//!     response.as_bytes(),
//!     br#"{"jsonrpc":"2.0","id":1,"result":19.000000}"#
//! );
//! # Ok::<(), RpcError>(())
//! ```
//!
//! # Notifications
//!
//! A request without an id (or with a null id) is a notification: its
//! handler runs, but the output region is always left empty - on success
//! *and* on every failure kind. Transports are expected to send nothing.
//!
//! # Errors on the Wire
//!
//! Pipeline failures for calls are rewritten into JSON-RPC error objects
//! with the reserved codes (−32700 parse, −32600 invalid request, −32601
//! method not found, −32602 invalid params, −32603 internal). The
//! [`Engine::process`] return value carries the fine-grained internal kind
//! for the embedder; the buffer carries the wire form.
//!
//! # Concurrency
//!
//! Registration requires `&mut Engine`; dispatch takes `&Engine`. Once
//! registration is done, the registry is read-only and an engine behind an
//! `Arc` serves concurrent dispatches without locks, provided every
//! dispatch brings its own input/token/output buffers.

// Engine pipeline modules
mod engine;
mod request;
mod validator;

// Data-plane modules
mod number;
mod response;
mod token;
mod tokenizer;

// Method table modules
mod registry;

// Error taxonomy
mod error;

// Re-export the public API surface at the crate root
pub use engine::Engine;
pub use error::{wire, RpcError, RpcResult};
pub use number::parse_number;
pub use registry::{Handler, MethodRecord, MAX_METHOD_NAME_LEN, MAX_PARAMS};
pub use request::{DispatchStats, Request};
pub use response::ResponseBuffer;
pub use token::{trace_tree, Token, TokenKind, NO_LINK};
pub use tokenizer::{tokenize, TokenizeError};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the crate version as a string
pub fn version() -> &'static str {
    VERSION
}
