//! Bundled JSON Tokenizer
//!
//! Fills a caller-sized token array from a raw byte buffer in a single
//! pass, producing the flat token tree described in [`crate::token`]. The
//! engine itself only depends on the *shape* of that array - any producer
//! honoring the same contract can replace this one, and pre-parsed token
//! arrays can be handed straight to [`crate::Engine::process`].
//!
//! The tokenizer does no allocation: parent indices are parked in each
//! token's `next_sibling` field while scanning, then resolved into real
//! `first_child`/`next_sibling` links by a single reverse pass.
//!
//! Strings are scanned escape-aware but never unescaped; their byte ranges
//! exclude the surrounding quotes. Primitives must start with `-`, a digit,
//! `t`, `f`, or `n`, and run until the next structural delimiter.

// Layer 1: Standard library imports
// (None)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::error::RpcError;
use crate::token::{Token, TokenKind, NO_LINK};

/// Marks a container token whose closing bracket has not been seen yet.
const OPEN_END: u32 = u32::MAX;

/// Failure kinds a tokenizer may report.
///
/// These map one-to-one onto the engine's parse-error taxonomy; see
/// [`RpcError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenizeError {
    /// The token array is too small for the document
    #[error("not enough tokens were provided")]
    NoMemory,
    /// A byte that cannot appear at this position
    #[error("invalid character inside JSON document")]
    Invalid,
    /// The document ended with values or containers still open
    #[error("the JSON document is not complete, more bytes expected")]
    Partial,
}

impl From<TokenizeError> for RpcError {
    fn from(err: TokenizeError) -> Self {
        match err {
            TokenizeError::NoMemory => RpcError::ParseNoMem,
            TokenizeError::Invalid => RpcError::ParseInval,
            TokenizeError::Partial => RpcError::ParsePart,
        }
    }
}

/// Tokenize `input` into `tokens`, returning the number of tokens produced.
///
/// On success every produced token carries its final byte range, child
/// count, and `first_child`/`next_sibling` links. On failure the token
/// array contents are unspecified.
///
/// # Examples
///
/// ```rust
/// use spanrpc::{tokenize, Token, TokenKind};
///
/// let mut tokens = [Token::EMPTY; 16];
/// let count = tokenize(br#"{"a":[1,2]}"#, &mut tokens).unwrap();
///
/// assert_eq!(count, 5);
/// assert_eq!(tokens[0].kind, TokenKind::Object);
/// assert_eq!(tokens[0].size, 1); // one key/value pair
/// ```
pub fn tokenize(input: &[u8], tokens: &mut [Token]) -> Result<usize, TokenizeError> {
    if input.len() > u32::MAX as usize {
        return Err(TokenizeError::NoMemory);
    }

    let mut count: usize = 0;
    // Innermost unfinished container, or a key awaiting its value.
    let mut sup: i32 = NO_LINK;
    let mut pos: usize = 0;

    while pos < input.len() {
        match input[pos] {
            byte @ (b'{' | b'[') => {
                let kind = if byte == b'{' {
                    TokenKind::Object
                } else {
                    TokenKind::Array
                };
                // Containers cannot sit in key position.
                if container_of(tokens, sup) == Some(TokenKind::Object) {
                    return Err(TokenizeError::Invalid);
                }
                let index = push(tokens, &mut count, kind, pos as u32, OPEN_END, sup)?;
                bump_size(tokens, sup);
                sup = index as i32;
                pos += 1;
            }
            byte @ (b'}' | b']') => {
                let want = if byte == b'}' {
                    TokenKind::Object
                } else {
                    TokenKind::Array
                };
                if sup < 0 {
                    return Err(TokenizeError::Invalid);
                }
                let current = sup as usize;
                if tokens[current].kind != want || tokens[current].end != OPEN_END {
                    return Err(TokenizeError::Invalid);
                }
                tokens[current].end = (pos + 1) as u32;
                sup = tokens[current].next_sibling;
                sup = pop_key(tokens, sup);
                pos += 1;
            }
            b'"' => {
                let start = pos + 1;
                let close = scan_string(input, start)?;
                let index = push(
                    tokens,
                    &mut count,
                    TokenKind::String,
                    start as u32,
                    close as u32,
                    sup,
                )?;
                bump_size(tokens, sup);
                if container_of(tokens, sup) == Some(TokenKind::Object) {
                    // Key position: the key token collects the value.
                    sup = index as i32;
                } else {
                    sup = pop_key(tokens, sup);
                }
                pos = close + 1;
            }
            b':' => {
                // Only meaningful directly after a key.
                if sup < 0 || tokens[sup as usize].kind != TokenKind::String {
                    return Err(TokenizeError::Invalid);
                }
                pos += 1;
            }
            b',' => {
                if sup < 0 {
                    return Err(TokenizeError::Invalid);
                }
                let container = &tokens[sup as usize];
                if container.kind == TokenKind::String || container.size == 0 {
                    return Err(TokenizeError::Invalid);
                }
                pos += 1;
            }
            b' ' | b'\t' | b'\r' | b'\n' => pos += 1,
            b'-' | b'0'..=b'9' | b't' | b'f' | b'n' => {
                if container_of(tokens, sup) == Some(TokenKind::Object) {
                    // Primitives cannot be object keys.
                    return Err(TokenizeError::Invalid);
                }
                let end = scan_primitive(input, pos)?;
                push(
                    tokens,
                    &mut count,
                    TokenKind::Primitive,
                    pos as u32,
                    end as u32,
                    sup,
                )?;
                bump_size(tokens, sup);
                sup = pop_key(tokens, sup);
                pos = end;
            }
            _ => return Err(TokenizeError::Invalid),
        }
    }

    if sup >= 0 {
        return Err(TokenizeError::Partial);
    }

    resolve_links(tokens, count);
    Ok(count)
}

/// Append a token whose `next_sibling` temporarily parks the parent index.
fn push(
    tokens: &mut [Token],
    count: &mut usize,
    kind: TokenKind,
    start: u32,
    end: u32,
    parked_parent: i32,
) -> Result<usize, TokenizeError> {
    if *count == tokens.len() {
        return Err(TokenizeError::NoMemory);
    }
    tokens[*count] = Token {
        kind,
        start,
        end,
        size: 0,
        first_child: NO_LINK,
        next_sibling: parked_parent,
    };
    *count += 1;
    Ok(*count - 1)
}

fn bump_size(tokens: &mut [Token], sup: i32) {
    if sup >= 0 {
        tokens[sup as usize].size += 1;
    }
}

/// Kind of the token `sup` points at, if it points anywhere.
fn container_of(tokens: &[Token], sup: i32) -> Option<TokenKind> {
    (sup >= 0).then(|| tokens[sup as usize].kind)
}

/// After a value completes in key position, hand control back to the
/// enclosing object.
fn pop_key(tokens: &[Token], sup: i32) -> i32 {
    if sup >= 0 && tokens[sup as usize].kind == TokenKind::String {
        tokens[sup as usize].next_sibling
    } else {
        sup
    }
}

/// Scan a string body starting just past the opening quote. Returns the
/// index of the closing quote. Escapes are validated but not decoded.
fn scan_string(input: &[u8], start: usize) -> Result<usize, TokenizeError> {
    let mut i = start;
    loop {
        if i >= input.len() {
            return Err(TokenizeError::Partial);
        }
        match input[i] {
            b'"' => return Ok(i),
            b'\\' => {
                let Some(&escape) = input.get(i + 1) else {
                    return Err(TokenizeError::Partial);
                };
                match escape {
                    b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't' => i += 2,
                    b'u' => {
                        if i + 6 > input.len() {
                            return Err(TokenizeError::Partial);
                        }
                        if !input[i + 2..i + 6].iter().all(u8::is_ascii_hexdigit) {
                            return Err(TokenizeError::Invalid);
                        }
                        i += 6;
                    }
                    _ => return Err(TokenizeError::Invalid),
                }
            }
            0x00..=0x1f => return Err(TokenizeError::Invalid),
            _ => i += 1,
        }
    }
}

/// Scan a primitive starting at `pos`. Returns one past its last byte.
fn scan_primitive(input: &[u8], pos: usize) -> Result<usize, TokenizeError> {
    let mut i = pos;
    while i < input.len() {
        match input[i] {
            b',' | b'}' | b']' | b':' | b' ' | b'\t' | b'\r' | b'\n' => break,
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'+' | b'-' | b'.' => i += 1,
            _ => return Err(TokenizeError::Invalid),
        }
    }
    Ok(i)
}

/// Convert the parked parent indices into real tree links.
///
/// Walking the array backwards and head-inserting each token into its
/// parent's child list yields sibling chains in ascending index order
/// without any scratch space.
fn resolve_links(tokens: &mut [Token], count: usize) {
    for index in (0..count).rev() {
        let parked = tokens[index].next_sibling;
        if parked >= 0 {
            tokens[index].next_sibling = tokens[parked as usize].first_child;
            tokens[parked as usize].first_child = index as i32;
        } else {
            tokens[index].next_sibling = NO_LINK;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &[u8]) -> (Vec<Token>, usize) {
        let mut tokens = vec![Token::EMPTY; 64];
        let count = tokenize(input, &mut tokens).unwrap();
        (tokens, count)
    }

    #[test]
    fn test_object_children_are_keys_with_value_children() {
        let (tokens, count) = parse(br#"{"a":1,"b":[2,3]}"#);
        assert_eq!(count, 7);

        let object = tokens[0];
        assert_eq!(object.kind, TokenKind::Object);
        assert_eq!(object.size, 2);

        let key_a = object.child().unwrap();
        assert_eq!(tokens[key_a].kind, TokenKind::String);
        assert_eq!(tokens[key_a].size, 1);

        let value_a = tokens[key_a].child().unwrap();
        assert_eq!(tokens[value_a].kind, TokenKind::Primitive);

        let key_b = tokens[key_a].sibling().unwrap();
        let array = tokens[key_b].child().unwrap();
        assert_eq!(tokens[array].kind, TokenKind::Array);
        assert_eq!(tokens[array].size, 2);

        let first = tokens[array].child().unwrap();
        let second = tokens[first].sibling().unwrap();
        assert_eq!(tokens[second].sibling(), None);
    }

    #[test]
    fn test_string_ranges_exclude_quotes() {
        let input = br#"{"greeting":"hi"}"#;
        let (tokens, _) = parse(input);
        let key = tokens[0].child().unwrap();
        assert_eq!(tokens[key].slice(input), b"greeting".as_slice());
        let value = tokens[key].child().unwrap();
        assert_eq!(tokens[value].slice(input), b"hi".as_slice());
    }

    #[test]
    fn test_escapes_are_validated_not_decoded() {
        // "a\"b" followed by the UTF-8 bytes of e-acute; the span keeps the
        // backslash and the multibyte sequence untouched.
        let input = b"{\"s\":\"a\\\"b\xc3\xa9\"}";
        let (tokens, _) = parse(input);
        let key = tokens[0].child().unwrap();
        let value = tokens[key].child().unwrap();
        assert_eq!(tokens[value].slice(input), b"a\\\"b\xc3\xa9".as_slice());

        let mut scratch = [Token::EMPTY; 8];
        assert_eq!(
            tokenize(br#"{"s":"\x"}"#, &mut scratch),
            Err(TokenizeError::Invalid)
        );
        assert_eq!(
            tokenize(br#"{"s":"\u12g4"}"#, &mut scratch),
            Err(TokenizeError::Invalid)
        );
    }

    #[test]
    fn test_containers_span_their_brackets() {
        let input = br#" {"a": [1, 2] } "#;
        let (tokens, _) = parse(input);
        assert_eq!(tokens[0].start, 1);
        assert_eq!(tokens[0].end as usize, input.len() - 1);
    }

    #[test]
    fn test_truncated_documents_report_partial() {
        let mut tokens = [Token::EMPTY; 16];
        for input in [
            &br#"{"jsonrpc":"2.0","method":"echo"#[..],
            br#"{"a":"#,
            br#"["#,
            br#"{"a":"unterminated"#,
        ] {
            assert_eq!(tokenize(input, &mut tokens), Err(TokenizeError::Partial));
        }
    }

    #[test]
    fn test_invalid_bytes_report_invalid() {
        let mut tokens = [Token::EMPTY; 16];
        for input in [
            &br#"{"a":#}"#[..],
            br#"{]"#,
            br#"[}"#,
            br#"{1:2}"#,
            br#"{"a":}"#,
            br#"[,1]"#,
        ] {
            assert_eq!(
                tokenize(input, &mut tokens),
                Err(TokenizeError::Invalid),
                "input: {}",
                String::from_utf8_lossy(input)
            );
        }
    }

    #[test]
    fn test_token_array_exhaustion_reports_no_memory() {
        let mut tokens = [Token::EMPTY; 3];
        assert_eq!(
            tokenize(br#"{"a":[1,2,3]}"#, &mut tokens),
            Err(TokenizeError::NoMemory)
        );
    }

    #[test]
    fn test_top_level_primitive_and_empty_input() {
        let mut tokens = [Token::EMPTY; 4];
        let count = tokenize(b"42", &mut tokens).unwrap();
        assert_eq!(count, 1);
        assert_eq!(tokens[0].kind, TokenKind::Primitive);
        assert_eq!(tokens[0].slice(b"42"), b"42".as_slice());

        assert_eq!(tokenize(b"", &mut tokens), Ok(0));
        assert_eq!(tokenize(b"   ", &mut tokens), Ok(0));
    }

    #[test]
    fn test_empty_containers() {
        let (tokens, count) = parse(br#"{"a":{},"b":[]}"#);
        assert_eq!(count, 5);
        let key_a = tokens[0].child().unwrap();
        let empty_object = tokens[key_a].child().unwrap();
        assert_eq!(tokens[empty_object].kind, TokenKind::Object);
        assert_eq!(tokens[empty_object].size, 0);
        assert_eq!(tokens[empty_object].child(), None);
    }
}
