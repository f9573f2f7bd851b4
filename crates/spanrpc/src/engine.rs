//! Engine - Registration, Dispatch Pipeline, and Envelope Framing
//!
//! The engine owns the method registry and nothing else. Its lifecycle is
//! strict: create, register methods (exclusive access), then dispatch any
//! number of requests through shared references. Dispatch never blocks,
//! never suspends, and never allocates; every request brings its own input
//! buffer, token array, and output region.
//!
//! The pipeline for one request is validate → resolve → check params →
//! invoke, with per-stage timings recorded on the request view. Failures
//! short-circuit into the error framer, which rewrites the output region
//! as a JSON-RPC error object - except for notifications, which never
//! produce output, successful or not.

// Layer 1: Standard library imports
use std::sync::Arc;
use std::time::Instant;

// Layer 2: Third-party crate imports
use tracing::{debug, trace};

// Layer 3: Internal module imports
use crate::error::{RpcError, RpcResult};
use crate::registry::{MethodRecord, MethodRegistry, MAX_METHOD_NAME_LEN};
use crate::request::Request;
use crate::response::ResponseBuffer;
use crate::token::{self, Token, TokenKind};
use crate::tokenizer::tokenize;

/// The dispatch engine: a registry of methods plus the pipeline that
/// serves requests against it.
///
/// Registration takes `&mut self`; dispatch takes `&self`. Completing all
/// registration before the first dispatch (which the borrow rules enforce
/// for a shared engine) is the whole concurrency story: after that the
/// registry is read-only and any number of threads may dispatch through
/// the same engine, each with its own buffers.
///
/// # Examples
///
/// ```rust
/// use spanrpc::{Engine, MethodRecord, Request, ResponseBuffer, RpcError, Token, TokenKind};
///
/// let mut engine = Engine::new();
/// engine.register(
///     MethodRecord::new("echo", |req: &Request<'_>, res: &mut ResponseBuffer<'_>| {
///         let params = req.params_value().ok_or(RpcError::Assertion)?;
///         let first = req.array_item(params, 0).ok_or(RpcError::ParamsMismatch)?;
///         res.append(format_args!("\""))?;
///         res.append_bytes(req.slice(first))?;
///         res.append(format_args!("\""))
///     })
///     .with_params(&[TokenKind::String]),
/// )?;
///
/// let input = br#"{"jsonrpc":"2.0","method":"echo","params":["hello"],"id":1}"#;
/// let mut tokens = [Token::EMPTY; 32];
/// let mut region = [0u8; 256];
/// let mut response = ResponseBuffer::new(&mut region);
///
/// engine.dispatch(input, &mut tokens, &mut response)?;
/// assert_eq!(response.as_bytes(), br#"{"jsonrpc":"2.0","id":1,"result":"hello"}"#);
/// # Ok::<(), RpcError>(())
/// ```
pub struct Engine {
    registry: MethodRegistry,
}

impl Engine {
    /// Create an engine with an empty method table.
    pub fn new() -> Self {
        Engine {
            registry: MethodRegistry::new(),
        }
    }

    /// Number of registered methods.
    pub fn method_count(&self) -> usize {
        self.registry.len()
    }

    /// Install one method. Fails with [`RpcError::InstallMethods`] when the
    /// record violates the name/params limits or the name is taken.
    pub fn register(&mut self, record: MethodRecord) -> RpcResult<()> {
        record.check_limits()?;
        let record = Arc::new(record);
        debug!(method = record.name(), "registering method");
        self.registry.insert(record)
    }

    /// Install a batch of methods, aborting on the first failure.
    ///
    /// A failed batch leaves the methods installed so far in place; callers
    /// should treat the error as fatal and discard the engine rather than
    /// dispatch against a half-populated table.
    pub fn register_methods(
        &mut self,
        records: impl IntoIterator<Item = MethodRecord>,
    ) -> RpcResult<()> {
        for record in records {
            self.register(record)?;
        }
        Ok(())
    }

    /// Tokenize `input` into `tokens` and serve the request into
    /// `response`.
    ///
    /// This is the all-in-one entry point; callers with their own
    /// tokenizer build a [`Request`] themselves and call
    /// [`Engine::process`]. Tokenizer failures are framed like any other
    /// error (wire code −32700), with a null id since no id token exists
    /// yet at that point.
    pub fn dispatch(
        &self,
        input: &[u8],
        tokens: &mut [Token],
        response: &mut ResponseBuffer<'_>,
    ) -> RpcResult<()> {
        match tokenize(input, tokens) {
            Ok(count) => {
                if tracing::enabled!(tracing::Level::TRACE) && count > 0 {
                    token::trace_tree(input, &tokens[..count], 0, 0);
                }
                let mut request = Request::new(input, &tokens[..count]);
                self.process(&mut request, response)
            }
            Err(parse_error) => {
                let request = Request::new(input, &[]);
                Self::finish(&request, response, Err(parse_error.into()))
            }
        }
    }

    /// Serve one parsed request: run the pipeline, then frame whatever the
    /// outcome is into `response`.
    ///
    /// Returns the internal error kind of the failing stage, or `Ok` for a
    /// fully successful call. Note that the return value reports pipeline
    /// truth while the buffer holds wire truth: a failed call still leaves
    /// a complete JSON-RPC *error object* in the buffer (unless the
    /// request was a notification, which leaves it empty).
    pub fn process(
        &self,
        request: &mut Request<'_>,
        response: &mut ResponseBuffer<'_>,
    ) -> RpcResult<()> {
        let whole = Instant::now();
        let result = self.run_pipeline(request, response);
        let outcome = Self::finish(request, response, result);
        request.stats.process_request_micros = elapsed_micros(whole);
        trace!(
            validate_us = request.stats.validate_request_micros,
            resolve_us = request.stats.resolve_method_micros,
            invoke_us = request.stats.invoke_method_micros,
            total_us = request.stats.process_request_micros,
            outcome = ?outcome,
            "request processed"
        );
        outcome
    }

    fn run_pipeline(
        &self,
        request: &mut Request<'_>,
        response: &mut ResponseBuffer<'_>,
    ) -> RpcResult<()> {
        let clock = Instant::now();
        let validated = crate::validator::validate(request);
        request.stats.validate_request_micros = elapsed_micros(clock);
        validated?;

        let clock = Instant::now();
        let mut resolved = self.resolve_method(request);
        if resolved.is_ok() {
            resolved = Self::check_params(request);
        }
        request.stats.resolve_method_micros = elapsed_micros(clock);
        resolved?;

        let clock = Instant::now();
        let invoked = Self::invoke(request, response);
        request.stats.invoke_method_micros = elapsed_micros(clock);
        invoked
    }

    /// Look the requested method up in the registry and cache the record
    /// on the request view.
    fn resolve_method(&self, request: &mut Request<'_>) -> RpcResult<()> {
        let name = request.method_name().ok_or(RpcError::Assertion)?;
        if name.len() > MAX_METHOD_NAME_LEN {
            return Err(RpcError::MethodNotFound);
        }
        let record = self
            .registry
            .lookup(name)
            .ok_or(RpcError::MethodNotFound)?;
        request.resolved = Some(Arc::clone(record));
        Ok(())
    }

    /// Check the supplied params against the record's declared signature.
    ///
    /// Positional params must match arity and per-position token kind;
    /// named params match arity only, since object members are unordered.
    fn check_params(request: &Request<'_>) -> RpcResult<()> {
        let record = request.method().ok_or(RpcError::Assertion)?;
        let declared = record.params();
        let params = request.params_value().ok_or(RpcError::Assertion)?;
        let tokens = request.tokens();
        let token = tokens.get(params).ok_or(RpcError::Assertion)?;

        if token.size as usize != declared.len() {
            return Err(RpcError::ParamsMismatch);
        }
        match token.kind {
            TokenKind::Array => {
                let mut item = token.child();
                let mut position = 0usize;
                while let Some(index) = item {
                    let supplied = tokens.get(index).ok_or(RpcError::Assertion)?;
                    if declared.get(position) != Some(&supplied.kind) {
                        return Err(RpcError::ParamsMismatch);
                    }
                    position += 1;
                    item = supplied.sibling();
                }
                Ok(())
            }
            TokenKind::Object => Ok(()),
            _ => Err(RpcError::Assertion),
        }
    }

    /// Frame the success envelope and run the handler inside it.
    ///
    /// Notifications and zero-capacity outputs skip framing entirely: the
    /// handler runs and its output (if any) is discarded by the caller of
    /// the pipeline.
    fn invoke(request: &Request<'_>, response: &mut ResponseBuffer<'_>) -> RpcResult<()> {
        let record = request.method().ok_or(RpcError::Assertion)?;

        if request.is_notification() || response.capacity() == 0 {
            return record.handler().call(request, response);
        }

        // A non-notification request always has an id token here.
        let id = request.id_value().ok_or(RpcError::Assertion)?;
        let quoted = request
            .tokens()
            .get(id)
            .is_some_and(|token| token.kind == TokenKind::String);

        if quoted {
            response.append(format_args!("{{\"jsonrpc\":\"2.0\",\"id\":\""))?;
            response.append_bytes(request.slice(id))?;
            response.append(format_args!("\",\"result\":"))?;
        } else {
            response.append(format_args!("{{\"jsonrpc\":\"2.0\",\"id\":"))?;
            response.append_bytes(request.slice(id))?;
            response.append(format_args!(",\"result\":"))?;
        }

        record.handler().call(request, response)?;
        response.append(format_args!("}}"))
    }

    /// Turn the pipeline outcome into wire truth.
    ///
    /// Notifications always end with an empty, NUL-led output region. For
    /// calls, a failure rewrites the region as an error object; if even
    /// that overflows, the region is cleared and `OutOfResBuf` wins.
    fn finish(
        request: &Request<'_>,
        response: &mut ResponseBuffer<'_>,
        result: RpcResult<()>,
    ) -> RpcResult<()> {
        if request.is_notification() {
            response.clear();
            return result;
        }
        let Err(error) = result else {
            return Ok(());
        };
        debug!(
            kind = %error,
            wire_code = error.wire_code(),
            "framing error response"
        );
        match Self::frame_error(request, response, error) {
            Ok(()) => Err(error),
            Err(_) => {
                response.clear();
                Err(RpcError::OutOfResBuf)
            }
        }
    }

    /// Rewrite the output region as a JSON-RPC error object for `error`.
    fn frame_error(
        request: &Request<'_>,
        response: &mut ResponseBuffer<'_>,
        error: RpcError,
    ) -> RpcResult<()> {
        response.rewind();
        response.append(format_args!(
            "{{\"jsonrpc\":\"2.0\",\"error\":{{\"code\":{},\"message\":\"{}\"}},\"id\":",
            error.wire_code(),
            error.wire_message(),
        ))?;

        // Echo the id only when validation cached a usable id token; a
        // request that never got that far answers with a null id.
        match request.id_value() {
            Some(id) => {
                let quoted = request
                    .tokens()
                    .get(id)
                    .is_some_and(|token| token.kind == TokenKind::String);
                if quoted {
                    response.append(format_args!("\""))?;
                    response.append_bytes(request.slice(id))?;
                    response.append(format_args!("\"}}"))
                } else {
                    response.append_bytes(request.slice(id))?;
                    response.append(format_args!("}}"))
                }
            }
            None => response.append(format_args!("null}}")),
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

fn elapsed_micros(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_micros()).unwrap_or(u64::MAX)
}
