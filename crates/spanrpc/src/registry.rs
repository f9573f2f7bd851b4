//! Method Registry - Prefix-Tree Indexed Dispatch Table
//!
//! Method names are indexed in a path-compressed radix tree keyed by raw
//! name bytes. Lookups walk the key once - O(key length) with a small
//! constant - and allocate nothing, which keeps the resolve stage on the
//! zero-allocation dispatch path. The tree is built during the registration
//! phase and read-only afterwards.
//!
//! Registry values are [`MethodRecord`]s behind `Arc`: the record owns its
//! handler as a `dyn Handler` trait object, the engine shares the record
//! with in-flight requests that resolved it.

// Layer 1: Standard library imports
use std::fmt;
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (None)

// Layer 3: Internal module imports
use crate::error::{RpcError, RpcResult};
use crate::request::Request;
use crate::response::ResponseBuffer;
use crate::token::TokenKind;

/// Longest accepted method name, in bytes.
pub const MAX_METHOD_NAME_LEN: usize = 127;

/// Largest accepted declared parameter count.
pub const MAX_PARAMS: usize = 16;

/// A registered method implementation.
///
/// Handlers receive the validated request view and the response buffer.
/// They write *only* their result value - the engine frames the envelope
/// around it - and must not write anything at all for notifications they
/// care about output for (the engine discards notification output).
///
/// Any `Fn(&Request, &mut ResponseBuffer) -> RpcResult<()> + Send + Sync`
/// is a handler:
///
/// ```rust
/// use spanrpc::{MethodRecord, Request, ResponseBuffer};
///
/// let record = MethodRecord::new("ping", |_req: &Request<'_>, res: &mut ResponseBuffer<'_>| {
///     res.append(format_args!("\"pong\""))
/// });
/// assert_eq!(record.name(), "ping");
/// ```
pub trait Handler: Send + Sync {
    /// Compute the result for `request` and write it into `response`.
    fn call(&self, request: &Request<'_>, response: &mut ResponseBuffer<'_>) -> RpcResult<()>;
}

impl<F> Handler for F
where
    F: Fn(&Request<'_>, &mut ResponseBuffer<'_>) -> RpcResult<()> + Send + Sync,
{
    fn call(&self, request: &Request<'_>, response: &mut ResponseBuffer<'_>) -> RpcResult<()> {
        self(request, response)
    }
}

/// Immutable description of one dispatchable method.
///
/// Built before registration, validated when installed into an engine:
/// the name must be non-empty and at most [`MAX_METHOD_NAME_LEN`] bytes,
/// and at most [`MAX_PARAMS`] parameter kinds may be declared.
pub struct MethodRecord {
    name: String,
    handler: Box<dyn Handler>,
    is_notification: bool,
    params: Vec<TokenKind>,
}

impl MethodRecord {
    /// Describe a call method with the given name and handler.
    pub fn new(name: impl Into<String>, handler: impl Handler + 'static) -> Self {
        Self {
            name: name.into(),
            handler: Box::new(handler),
            is_notification: false,
            params: Vec::new(),
        }
    }

    /// Describe a notification-only method: callers are expected to invoke
    /// it without an id, and its output is always discarded.
    pub fn notification(name: impl Into<String>, handler: impl Handler + 'static) -> Self {
        Self {
            is_notification: true,
            ..Self::new(name, handler)
        }
    }

    /// Declare the expected parameter arity and per-position token kinds.
    ///
    /// Positional parameters (array `params`) are checked against this
    /// vector kind-by-kind; named parameters (object `params`) are checked
    /// for arity only, since their order carries no meaning.
    #[must_use]
    pub fn with_params(mut self, kinds: &[TokenKind]) -> Self {
        self.params = kinds.to_vec();
        self
    }

    /// The method name as registered.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this method was declared notification-only.
    pub fn is_notification(&self) -> bool {
        self.is_notification
    }

    /// Declared parameter kinds, positional order.
    pub fn params(&self) -> &[TokenKind] {
        &self.params
    }

    pub(crate) fn handler(&self) -> &dyn Handler {
        self.handler.as_ref()
    }

    /// `Err(InstallMethods)` unless the record is within registration limits.
    pub(crate) fn check_limits(&self) -> RpcResult<()> {
        if self.name.is_empty()
            || self.name.len() > MAX_METHOD_NAME_LEN
            || self.params.len() > MAX_PARAMS
        {
            return Err(RpcError::InstallMethods);
        }
        Ok(())
    }
}

impl fmt::Debug for MethodRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodRecord")
            .field("name", &self.name)
            .field("is_notification", &self.is_notification)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// One node of the radix tree. `label` is the compressed edge leading into
/// the node; children are kept sorted by their first label byte.
struct Node {
    label: Vec<u8>,
    value: Option<Arc<MethodRecord>>,
    children: Vec<Node>,
}

impl Node {
    fn leaf(label: &[u8], value: Arc<MethodRecord>) -> Self {
        Node {
            label: label.to_vec(),
            value: Some(value),
            children: Vec::new(),
        }
    }

    fn child_position(&self, byte: u8) -> Result<usize, usize> {
        self.children.binary_search_by(|c| c.label[0].cmp(&byte))
    }
}

/// The engine's method index.
pub(crate) struct MethodRegistry {
    root: Node,
    count: usize,
}

impl MethodRegistry {
    pub(crate) fn new() -> Self {
        MethodRegistry {
            root: Node {
                label: Vec::new(),
                value: None,
                children: Vec::new(),
            },
            count: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.count
    }

    /// Insert `record` under its own name. `Err(InstallMethods)` if a
    /// record with that name already exists.
    pub(crate) fn insert(&mut self, record: Arc<MethodRecord>) -> RpcResult<()> {
        let key = record.name().as_bytes().to_vec();
        Self::insert_at(&mut self.root, &key, record)?;
        self.count += 1;
        Ok(())
    }

    fn insert_at(node: &mut Node, suffix: &[u8], record: Arc<MethodRecord>) -> RpcResult<()> {
        if suffix.is_empty() {
            if node.value.is_some() {
                return Err(RpcError::InstallMethods);
            }
            node.value = Some(record);
            return Ok(());
        }
        match node.child_position(suffix[0]) {
            Err(position) => {
                node.children.insert(position, Node::leaf(suffix, record));
                Ok(())
            }
            Ok(position) => {
                let child = &mut node.children[position];
                let shared = common_prefix(&child.label, suffix);
                if shared == child.label.len() {
                    return Self::insert_at(child, &suffix[shared..], record);
                }
                // The edge splits: an intermediate node takes the shared
                // prefix, the old child keeps the remainder of its label.
                let mut old_child = std::mem::replace(
                    child,
                    Node {
                        label: suffix[..shared].to_vec(),
                        value: None,
                        children: Vec::new(),
                    },
                );
                old_child.label.drain(..shared);
                if shared == suffix.len() {
                    child.value = Some(record);
                    child.children.push(old_child);
                } else {
                    // First label bytes differ here, or `shared` would be
                    // longer; order the two children by that byte.
                    let new_leaf = Node::leaf(&suffix[shared..], record);
                    if old_child.label[0] < new_leaf.label[0] {
                        child.children.push(old_child);
                        child.children.push(new_leaf);
                    } else {
                        child.children.push(new_leaf);
                        child.children.push(old_child);
                    }
                }
                Ok(())
            }
        }
    }

    /// Look up a record by raw method-name bytes. Allocation-free.
    pub(crate) fn lookup(&self, name: &[u8]) -> Option<&Arc<MethodRecord>> {
        let mut node = &self.root;
        let mut rest = name;
        loop {
            if rest.is_empty() {
                return node.value.as_ref();
            }
            let position = node.child_position(rest[0]).ok()?;
            let child = &node.children[position];
            if rest.len() < child.label.len() || rest[..child.label.len()] != child.label[..] {
                return None;
            }
            rest = &rest[child.label.len()..];
            node = child;
        }
    }
}

fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> Arc<MethodRecord> {
        Arc::new(MethodRecord::new(
            name,
            |_req: &Request<'_>, _res: &mut ResponseBuffer<'_>| Ok(()),
        ))
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut registry = MethodRegistry::new();
        registry.insert(record("echo")).unwrap();
        registry.insert(record("pow")).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.lookup(b"echo").unwrap().name(), "echo");
        assert_eq!(registry.lookup(b"pow").unwrap().name(), "pow");
        assert!(registry.lookup(b"nope").is_none());
    }

    #[test]
    fn test_shared_prefixes_split_edges() {
        let mut registry = MethodRegistry::new();
        registry.insert(record("subtract.positional")).unwrap();
        registry.insert(record("subtract.named")).unwrap();
        registry.insert(record("subtract")).unwrap();
        registry.insert(record("sub")).unwrap();

        for name in ["subtract.positional", "subtract.named", "subtract", "sub"] {
            assert_eq!(
                registry.lookup(name.as_bytes()).unwrap().name(),
                name,
                "lookup failed for {name}"
            );
        }
        // Interior points of an edge are not keys.
        assert!(registry.lookup(b"subtract.").is_none());
        assert!(registry.lookup(b"subtr").is_none());
        assert!(registry.lookup(b"subtract.positionalX").is_none());
    }

    #[test]
    fn test_duplicate_insert_is_rejected() {
        let mut registry = MethodRegistry::new();
        registry.insert(record("echo")).unwrap();
        assert_eq!(
            registry.insert(record("echo")),
            Err(RpcError::InstallMethods)
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_record_limits() {
        assert!(record("echo").check_limits().is_ok());
        assert_eq!(record("").check_limits(), Err(RpcError::InstallMethods));

        let long = "m".repeat(MAX_METHOD_NAME_LEN + 1);
        assert_eq!(record(&long).check_limits(), Err(RpcError::InstallMethods));
        let longest = "m".repeat(MAX_METHOD_NAME_LEN);
        assert!(record(&longest).check_limits().is_ok());

        let wide = MethodRecord::new("wide", |_req: &Request<'_>, _res: &mut ResponseBuffer<'_>| {
            Ok(())
        })
        .with_params(&[TokenKind::Primitive; MAX_PARAMS + 1]);
        assert_eq!(wide.check_limits(), Err(RpcError::InstallMethods));
    }

    #[test]
    fn test_notification_records() {
        let handler = |_req: &Request<'_>, _res: &mut ResponseBuffer<'_>| Ok(());
        let note = MethodRecord::notification("log", handler);
        assert!(note.is_notification());
        assert!(!record("echo").is_notification());
    }
}
