//! Request View - Cached Navigation over One Parsed Request
//!
//! A [`Request`] borrows the caller's input buffer and token array for the
//! lifetime of one dispatch. Validation caches the key tokens of the four
//! JSON-RPC members so later stages (and handlers) reach them without
//! rescanning, and resolution caches the method record. The view hands out
//! byte slices of the original buffer only - nothing is copied or owned.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (None)

// Layer 3: Internal module imports
use crate::error::RpcResult;
use crate::number::parse_number;
use crate::registry::MethodRecord;
use crate::token::Token;
use crate::tokenizer::tokenize;

/// Elapsed time per dispatch stage, in microseconds.
///
/// Populated by [`crate::Engine::process`]; all zero until then.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Time spent validating the request structure
    pub validate_request_micros: u64,
    /// Time spent resolving the method and checking params
    pub resolve_method_micros: u64,
    /// Time spent inside the handler (including envelope framing)
    pub invoke_method_micros: u64,
    /// Whole-pipeline time for the request
    pub process_request_micros: u64,
}

/// One in-flight request: input bytes, token view, and cached state.
pub struct Request<'a> {
    buffer: &'a [u8],
    tokens: &'a [Token],
    // Key-token indices cached by validation; the member's value token is
    // the key's first child.
    pub(crate) version: Option<usize>,
    pub(crate) method: Option<usize>,
    pub(crate) params: Option<usize>,
    pub(crate) id: Option<usize>,
    pub(crate) is_notification: bool,
    pub(crate) resolved: Option<Arc<MethodRecord>>,
    pub(crate) stats: DispatchStats,
}

impl<'a> Request<'a> {
    /// Build a view over an already-tokenized buffer.
    ///
    /// The token array may come from the bundled tokenizer or any producer
    /// honoring the same layout contract.
    pub fn new(buffer: &'a [u8], tokens: &'a [Token]) -> Self {
        Request {
            buffer,
            tokens,
            version: None,
            method: None,
            params: None,
            id: None,
            is_notification: false,
            resolved: None,
            stats: DispatchStats::default(),
        }
    }

    /// Tokenize `buffer` into `tokens` and build the view in one step.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use spanrpc::{Request, Token};
    ///
    /// let input = br#"{"jsonrpc":"2.0","method":"m","params":[],"id":1}"#;
    /// let mut tokens = [Token::EMPTY; 32];
    /// let request = Request::parse(input, &mut tokens).unwrap();
    /// assert!(request.token_count() > 0);
    /// ```
    pub fn parse(buffer: &'a [u8], tokens: &'a mut [Token]) -> RpcResult<Self> {
        let count = tokenize(buffer, tokens)?;
        let tokens: &'a [Token] = tokens;
        Ok(Self::new(buffer, &tokens[..count]))
    }

    /// The raw input buffer.
    pub fn buffer(&self) -> &'a [u8] {
        self.buffer
    }

    /// The parsed tokens of this request.
    pub fn tokens(&self) -> &'a [Token] {
        self.tokens
    }

    /// Number of tokens in the view.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// True when the request carries no id (or a null id) and therefore
    /// must not produce a reply. Meaningful after validation.
    pub fn is_notification(&self) -> bool {
        self.is_notification
    }

    /// The record the dispatcher resolved, if resolution has run.
    pub fn method(&self) -> Option<&MethodRecord> {
        self.resolved.as_deref()
    }

    /// Timing of the pipeline stages for this request.
    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// The bytes of token `index`, or an empty slice for a bad index.
    pub fn slice(&self, index: usize) -> &'a [u8] {
        self.tokens
            .get(index)
            .map(|token| token.slice(self.buffer))
            .unwrap_or(&[])
    }

    /// Index of the first child of token `index`.
    pub fn child(&self, index: usize) -> Option<usize> {
        self.tokens.get(index).and_then(Token::child)
    }

    /// Index of the next sibling of token `index`.
    pub fn sibling(&self, index: usize) -> Option<usize> {
        self.tokens.get(index).and_then(Token::sibling)
    }

    /// Value token of a member key: the key's single child.
    pub(crate) fn value_of(&self, key: usize) -> Option<usize> {
        let token = self.tokens.get(key)?;
        if token.size != 1 {
            return None;
        }
        token.child()
    }

    /// Bytes of the requested method name. Available after validation.
    pub fn method_name(&self) -> Option<&'a [u8]> {
        let value = self.value_of(self.method?)?;
        Some(self.slice(value))
    }

    /// Token index of the `params` value. Available after validation.
    pub fn params_value(&self) -> Option<usize> {
        self.value_of(self.params?)
    }

    /// Token index of the `id` value, if an id member is present.
    pub fn id_value(&self) -> Option<usize> {
        self.value_of(self.id?)
    }

    /// Token index of the `n`-th element of the array at `array`.
    pub fn array_item(&self, array: usize, n: usize) -> Option<usize> {
        let mut item = self.child(array);
        for _ in 0..n {
            item = self.sibling(item?);
        }
        item
    }

    /// Value token of the member named `key` in the object at `object`.
    /// Byte-exact comparison against the unescaped source range.
    pub fn member(&self, object: usize, key: &[u8]) -> Option<usize> {
        let mut entry = self.child(object);
        while let Some(index) = entry {
            if self.slice(index) == key {
                return self.value_of(index);
            }
            entry = self.sibling(index);
        }
        None
    }

    /// Decode the token at `index` as a JSON number, requiring the whole
    /// span to be consumed.
    pub fn number(&self, index: usize) -> Option<f64> {
        match parse_number(self.slice(index)) {
            Some((value, rest)) if rest.is_empty() => Some(value),
            _ => None,
        }
    }
}
