//! Numeric Decoder - JSON Decimal to f64 without Copies
//!
//! Handlers extract numeric parameters straight from token spans of the
//! input buffer; the span is neither NUL-terminated nor owned, so the
//! decoder works on a plain byte slice and reports how much of it was
//! consumed. No allocation, fully reentrant.
//!
//! The accepted grammar is the RFC 7159 number grammar minus two liberties:
//! no leading `+`, and bare integer significands are capped at nine digits
//! (longer integers must carry a fraction or exponent to be accepted).
//! Decimal exponents are combined and applied through a table of binary
//! powers of ten, with a combined magnitude above 511 rejected as overflow.

// Layer 1: Standard library imports
// (None)

// Layer 2: Third-party crate imports
// (None - the decoder is pure computation)

// Layer 3: Internal module imports
// (None)

/// Largest combined base-10 exponent magnitude; anything larger already
/// overflows or underflows an f64.
const MAX_EXPONENT: i32 = 511;

/// Binary powers of ten: entry `i` is `10^(2^i)`. Used to assemble the
/// decimal exponent one bit at a time.
const POWERS_OF_TEN: [f64; 9] = [
    10.0, 100.0, 1.0e4, 1.0e8, 1.0e16, 1.0e32, 1.0e64, 1.0e128, 1.0e256,
];

/// Decode a JSON decimal number from the start of `input`.
///
/// Returns the value and the unconsumed remainder of the slice, or `None`
/// if the prefix is not a number in the accepted grammar.
///
/// # Examples
///
/// ```rust
/// use spanrpc::parse_number;
///
/// let (value, rest) = parse_number(b"-12.5e2,next").unwrap();
/// assert_eq!(value, -1250.0);
/// assert_eq!(rest, b",next");
///
/// assert!(parse_number(b"01").is_none());   // no zero-prefixed integers
/// assert!(parse_number(b"1.").is_none());   // fraction needs digits
/// assert!(parse_number(b"1e+").is_none());  // exponent needs digits
/// ```
pub fn parse_number(input: &[u8]) -> Option<(f64, &[u8])> {
    let len = input.len();
    let mut p = 0usize;

    if len == 0 {
        return None;
    }

    // A JSON number can start with '-', not '+'.
    let negative = input[0] == b'-';
    if negative {
        p += 1;
        if p == len {
            return None;
        }
    }

    let mut significand: f64 = 0.0;
    let mut integer_digits = 0i32;
    let mut frac_exponent = 0i32;

    // A prefix zero is only allowed as the sole digit before a decimal
    // point or exponent.
    if input[p] == b'0' {
        p += 1;
        if p == len {
            return Some((if negative { -0.0 } else { 0.0 }, &input[len..]));
        }
        if input[p].is_ascii_digit() {
            return None;
        }
    } else {
        if !input[p].is_ascii_digit() {
            return None;
        }
        while p < len && input[p].is_ascii_digit() {
            significand = 10.0 * significand + f64::from(input[p] - b'0');
            integer_digits += 1;
            p += 1;
        }
        let continues = p < len && matches!(input[p], b'.' | b'e' | b'E');
        if !continues {
            if integer_digits >= 10 {
                // Bare-integer overflow clamp.
                return None;
            }
            let value = if negative { -significand } else { significand };
            return Some((value, &input[p..]));
        }
    }

    if p < len && input[p] == b'.' {
        p += 1;
        if p == len || !input[p].is_ascii_digit() {
            return None;
        }
        while p < len && input[p].is_ascii_digit() {
            significand = 10.0 * significand + f64::from(input[p] - b'0');
            frac_exponent -= 1;
            p += 1;
        }
    }

    let mut exponent = 0i32;
    let mut exponent_negative = false;
    if p < len && matches!(input[p], b'e' | b'E') {
        p += 1;
        if p == len {
            return None;
        }
        if input[p] == b'-' || input[p] == b'+' {
            exponent_negative = input[p] == b'-';
            p += 1;
            if p == len {
                return None;
            }
        }
        if !input[p].is_ascii_digit() {
            return None;
        }
        while p < len && input[p].is_ascii_digit() {
            // Saturate far above MAX_EXPONENT; the cap below rejects it.
            exponent = (exponent * 10 + i32::from(input[p] - b'0')).min(10_000);
            p += 1;
        }
    }

    let combined = if exponent_negative {
        frac_exponent - exponent
    } else {
        frac_exponent + exponent
    };
    let shrink = combined < 0;
    let mut magnitude = combined.abs();
    if magnitude > MAX_EXPONENT {
        return None;
    }

    // Assemble 10^magnitude one exponent bit at a time.
    let mut scale = 1.0f64;
    let mut bit = 0usize;
    while magnitude != 0 {
        if magnitude & 1 == 1 {
            scale *= POWERS_OF_TEN[bit];
        }
        magnitude >>= 1;
        bit += 1;
    }

    let mut value = if shrink {
        significand / scale
    } else {
        significand * scale
    };
    if negative {
        value = -value;
    }
    Some((value, &input[p..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn accept(input: &[u8]) -> f64 {
        let (value, rest) = parse_number(input).unwrap();
        assert_eq!(rest, b"", "decoder left a tail on {input:?}");
        value
    }

    #[test]
    fn test_integers_and_sign() {
        assert_eq!(accept(b"0"), 0.0);
        assert_eq!(accept(b"7"), 7.0);
        assert_eq!(accept(b"42"), 42.0);
        assert_eq!(accept(b"-42"), -42.0);
        assert_eq!(accept(b"999999999"), 999_999_999.0);
    }

    #[test]
    fn test_negative_zero_keeps_its_sign() {
        let value = accept(b"-0");
        assert_eq!(value, 0.0);
        assert!(value.is_sign_negative());
    }

    #[test]
    fn test_fractions_and_exponents() {
        assert_eq!(accept(b"0.5"), 0.5);
        assert_eq!(accept(b"12.25"), 12.25);
        assert_eq!(accept(b"-12.5e2"), -1250.0);
        assert_eq!(accept(b"1e2"), 100.0);
        assert_eq!(accept(b"1E2"), 100.0);
        assert_eq!(accept(b"1e-2"), 0.01);
        assert_eq!(accept(b"2e+3"), 2000.0);
        assert_eq!(accept(b"0e5"), 0.0);
    }

    #[test]
    fn test_exponents_containing_the_digit_nine() {
        assert_eq!(accept(b"1e9"), 1.0e9);
        assert_eq!(accept(b"1e19"), 1.0e19);
        assert_eq!(accept(b"2e99"), 2.0e99);
    }

    #[test]
    fn test_unconsumed_tail_is_returned() {
        let (value, rest) = parse_number(b"19,23]").unwrap();
        assert_eq!(value, 19.0);
        assert_eq!(rest, b",23]");

        let (value, rest) = parse_number(b"3.5}").unwrap();
        assert_eq!(value, 3.5);
        assert_eq!(rest, b"}");
    }

    #[test]
    fn test_rejections() {
        for input in [
            &b""[..],
            b"-",
            b"+1",
            b"01",
            b"1.",
            b"1.x",
            b"1e",
            b"1e+",
            b"1e-",
            b"1ex",
            b".5",
            b"abc",
        ] {
            assert!(
                parse_number(input).is_none(),
                "accepted {:?}",
                String::from_utf8_lossy(input)
            );
        }
    }

    #[test]
    fn test_bare_integer_overflow_clamp() {
        // Ten integer digits with no fraction or exponent are refused...
        assert!(parse_number(b"1234567890").is_none());
        assert!(parse_number(b"12345678901").is_none());
        // ...but the same digits parse once a fraction or exponent follows.
        assert_eq!(accept(b"1234567890.0"), 1_234_567_890.0);
        assert_eq!(accept(b"1234567890e0"), 1_234_567_890.0);
    }

    #[test]
    fn test_exponent_overflow() {
        assert!(parse_number(b"1e512").is_none());
        assert!(parse_number(b"1e-512").is_none());
        assert!(parse_number(b"1e99999999999999").is_none());
        assert_eq!(accept(b"1e308"), 1.0e308);
        assert_eq!(accept(b"1e-308"), 1.0e-308);
    }

    proptest! {
        #[test]
        fn prop_left_inverse_on_small_integers(n in -999_999_999i64..=999_999_999i64) {
            let text = n.to_string();
            let (value, rest) = parse_number(text.as_bytes()).unwrap();
            prop_assert_eq!(rest, b"");
            prop_assert_eq!(value, n as f64);
        }

        // With these digit counts every intermediate value is exactly
        // representable, so the single rounding step must agree bit-for-bit
        // with the standard library parser.
        #[test]
        fn prop_agrees_with_std_parser(text in "-?(0|[1-9][0-9]{0,5})(\\.[0-9]{1,6})?([eE][+-]?[0-9])?") {
            prop_assume!(parse_number(text.as_bytes()).is_some());
            let (value, rest) = parse_number(text.as_bytes()).unwrap();
            prop_assert_eq!(rest, b"");
            let expected: f64 = text.parse().unwrap();
            prop_assert_eq!(value.to_bits(), expected.to_bits());
        }

        #[test]
        fn prop_rejections_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..24)) {
            let _ = parse_number(&bytes);
        }
    }
}
