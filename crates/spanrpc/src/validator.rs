//! Request Validator - JSON-RPC 2.0 Structural Rules
//!
//! Checks that a token view is a well-formed single request object and
//! caches the member key tokens on the request view. The rules, in order:
//!
//! 1. Token 0 must be an object.
//! 2. Its member keys are scanned once; `jsonrpc`, `method`, `params`, and
//!    `id` are cached by comparing key bytes (lengths 7/6/6/2). Unknown
//!    members are ignored; a repeated member keeps its last occurrence.
//! 3. `jsonrpc` must be the three-byte string `2.0`.
//! 4. `method` must be a string.
//! 5. `params` must be present and an array or object.
//! 6. `id`, when present, must be a string or a primitive drawn from a
//!    restricted byte alphabet; the primitive `null` (lowercase only)
//!    marks the request as a notification.
//! 7. A request with no id, or a null id, is a notification.
//!
//! All comparisons are byte-exact on the raw source range; no string
//! unescaping happens here or anywhere else in the engine.

// Layer 1: Standard library imports
// (None)

// Layer 2: Third-party crate imports
// (None)

// Layer 3: Internal module imports
use crate::error::{RpcError, RpcResult};
use crate::request::Request;
use crate::token::TokenKind;

/// Bytes a primitive id may consist of: minus, digits, dot, plus, and the
/// lowercase letters of `null`. This is a cheap shape filter - it admits
/// numbers and the null literal and nothing else JSON could put in an
/// unquoted id.
const VALID_ID_PRIMITIVE: [bool; 256] = {
    let mut table = [false; 256];
    table[b'-' as usize] = true;
    table[b'+' as usize] = true;
    table[b'.' as usize] = true;
    let mut digit = b'0';
    while digit <= b'9' {
        table[digit as usize] = true;
        digit += 1;
    }
    table[b'n' as usize] = true;
    table[b'u' as usize] = true;
    table[b'l' as usize] = true;
    table
};

/// Validate `req` against the request-object rules, caching the member key
/// tokens and the notification flag on success.
pub(crate) fn validate(req: &mut Request<'_>) -> RpcResult<()> {
    req.version = None;
    req.method = None;
    req.params = None;
    req.id = None;
    req.is_notification = false;

    let tokens = req.tokens();
    let outer = match tokens.first() {
        Some(token) if token.kind == TokenKind::Object => token,
        _ => return Err(RpcError::InvalidOuter),
    };

    if outer.size > 0 {
        let mut member = outer.child();
        while let Some(key) = member {
            let token = tokens.get(key).ok_or(RpcError::Assertion)?;
            match token.len() {
                6 => {
                    if req.slice(key) == b"method" {
                        req.method = Some(key);
                    } else if req.slice(key) == b"params" {
                        req.params = Some(key);
                    }
                }
                7 => {
                    if req.slice(key) == b"jsonrpc" {
                        req.version = Some(key);
                    }
                }
                2 => {
                    if req.slice(key) == b"id" {
                        req.id = Some(key);
                    }
                }
                _ => {}
            }
            member = token.sibling();
        }
    }

    let version_ok = req
        .version
        .and_then(|key| req.value_of(key))
        .and_then(|value| tokens.get(value))
        .is_some_and(|token| {
            token.kind == TokenKind::String && token.slice(req.buffer()) == b"2.0"
        });
    if !version_ok {
        return Err(RpcError::InvalidVersion);
    }

    let method_ok = req
        .method
        .and_then(|key| req.value_of(key))
        .and_then(|value| tokens.get(value))
        .is_some_and(|token| token.kind == TokenKind::String);
    if !method_ok {
        return Err(RpcError::InvalidMethod);
    }

    let params_ok = req
        .params
        .and_then(|key| req.value_of(key))
        .and_then(|value| tokens.get(value))
        .is_some_and(|token| matches!(token.kind, TokenKind::Array | TokenKind::Object));
    if !params_ok {
        return Err(RpcError::InvalidParams);
    }

    if req.id.is_some() {
        let Some(token) = req.id_value().and_then(|value| tokens.get(value)) else {
            return Err(RpcError::InvalidId);
        };
        match token.kind {
            TokenKind::String => {}
            TokenKind::Primitive => {
                let bytes = token.slice(req.buffer());
                if !bytes.iter().all(|&b| VALID_ID_PRIMITIVE[b as usize]) {
                    return Err(RpcError::InvalidId);
                }
                if bytes == b"null" {
                    req.is_notification = true;
                }
            }
            _ => return Err(RpcError::InvalidId),
        }
    } else {
        req.is_notification = true;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Token;

    fn validated(input: &[u8]) -> RpcResult<(bool, bool)> {
        let mut tokens = vec![Token::EMPTY; 64];
        let mut req = Request::parse(input, &mut tokens)?;
        validate(&mut req)?;
        Ok((req.is_notification(), req.id_value().is_some()))
    }

    #[test]
    fn test_well_formed_call() {
        let input = br#"{"jsonrpc":"2.0","method":"echo","params":["x"],"id":1}"#;
        assert_eq!(validated(input), Ok((false, true)));
    }

    #[test]
    fn test_outer_shell_must_be_an_object() {
        assert_eq!(validated(b"[1,2,3]"), Err(RpcError::InvalidOuter));
        assert_eq!(validated(b"42"), Err(RpcError::InvalidOuter));
        assert_eq!(validated(b"\"x\""), Err(RpcError::InvalidOuter));
        // Whitespace-only input yields zero tokens.
        assert_eq!(validated(b"  "), Err(RpcError::InvalidOuter));
    }

    #[test]
    fn test_version_member() {
        for input in [
            &br#"{"method":"m","params":[],"id":1}"#[..],
            br#"{"jsonrpc":"1.0","method":"m","params":[],"id":1}"#,
            br#"{"jsonrpc":2.0,"method":"m","params":[],"id":1}"#,
            br#"{"jsonrpc":"2.00","method":"m","params":[],"id":1}"#,
        ] {
            assert_eq!(validated(input), Err(RpcError::InvalidVersion));
        }
    }

    #[test]
    fn test_method_member() {
        for input in [
            &br#"{"jsonrpc":"2.0","params":[],"id":1}"#[..],
            br#"{"jsonrpc":"2.0","method":42,"params":[],"id":1}"#,
            br#"{"jsonrpc":"2.0","method":["m"],"params":[],"id":1}"#,
        ] {
            assert_eq!(validated(input), Err(RpcError::InvalidMethod));
        }
    }

    #[test]
    fn test_params_member_is_required_and_structured() {
        for input in [
            &br#"{"jsonrpc":"2.0","method":"m","id":1}"#[..],
            br#"{"jsonrpc":"2.0","method":"m","params":"x","id":1}"#,
            br#"{"jsonrpc":"2.0","method":"m","params":7,"id":1}"#,
        ] {
            assert_eq!(validated(input), Err(RpcError::InvalidParams));
        }
        let object_params = br#"{"jsonrpc":"2.0","method":"m","params":{"a":1},"id":1}"#;
        assert!(validated(object_params).is_ok());
    }

    #[test]
    fn test_id_shapes() {
        let string_id = br#"{"jsonrpc":"2.0","method":"m","params":[],"id":"a-1"}"#;
        assert_eq!(validated(string_id), Ok((false, true)));

        let number_id = br#"{"jsonrpc":"2.0","method":"m","params":[],"id":12.5}"#;
        assert_eq!(validated(number_id), Ok((false, true)));

        for input in [
            &br#"{"jsonrpc":"2.0","method":"m","params":[],"id":[1]}"#[..],
            br#"{"jsonrpc":"2.0","method":"m","params":[],"id":{"v":1}}"#,
            br#"{"jsonrpc":"2.0","method":"m","params":[],"id":true}"#,
            br#"{"jsonrpc":"2.0","method":"m","params":[],"id":nullx}"#,
        ] {
            assert_eq!(
                validated(input),
                Err(RpcError::InvalidId),
                "input: {}",
                String::from_utf8_lossy(input)
            );
        }
    }

    #[test]
    fn test_notification_classification() {
        let no_id = br#"{"jsonrpc":"2.0","method":"m","params":[]}"#;
        assert_eq!(validated(no_id), Ok((true, false)));

        let null_id = br#"{"jsonrpc":"2.0","method":"m","params":[],"id":null}"#;
        assert_eq!(validated(null_id), Ok((true, true)));
    }

    #[test]
    fn test_unknown_members_are_ignored() {
        let input =
            br#"{"jsonrpc":"2.0","extra":{"deep":[1,2]},"method":"m","params":[],"id":1,"z":0}"#;
        assert_eq!(validated(input), Ok((false, true)));
    }

    #[test]
    fn test_duplicate_member_keeps_last_occurrence() {
        let input = br#"{"jsonrpc":"2.0","method":"first","method":"second","params":[],"id":1}"#;
        let mut tokens = vec![Token::EMPTY; 64];
        let mut req = Request::parse(input, &mut tokens).unwrap();
        validate(&mut req).unwrap();
        assert_eq!(req.method_name(), Some(b"second".as_slice()));
    }
}
