//! Calculator demo: reads one JSON-RPC request from stdin, dispatches it
//! against a small method table, and prints the wire response.
//!
//! ```text
//! echo '{"jsonrpc":"2.0","method":"subtract.positional","params":[42,23],"id":1}' \
//!     | cargo run --example calculator
//! ```
//!
//! Set `RUST_LOG=spanrpc=trace` to watch the token tree and the per-stage
//! timings go by.

use std::io::Read;

use tracing_subscriber::EnvFilter;

use spanrpc::{
    Engine, MethodRecord, Request, ResponseBuffer, RpcError, RpcResult, Token, TokenKind,
};

fn echo(req: &Request<'_>, res: &mut ResponseBuffer<'_>) -> RpcResult<()> {
    let params = req.params_value().ok_or(RpcError::Assertion)?;
    let first = req.array_item(params, 0).ok_or(RpcError::ParamsMismatch)?;
    res.append(format_args!("\""))?;
    res.append_bytes(req.slice(first))?;
    res.append(format_args!("\""))
}

fn rpc_pow(req: &Request<'_>, res: &mut ResponseBuffer<'_>) -> RpcResult<()> {
    let params = req.params_value().ok_or(RpcError::Assertion)?;
    let base_token = req.array_item(params, 0).ok_or(RpcError::ParamsMismatch)?;
    let exp_token = req.array_item(params, 1).ok_or(RpcError::ParamsMismatch)?;
    let base = req.number(base_token).ok_or(RpcError::ParamsMismatch)?;
    let exponent = req.number(exp_token).ok_or(RpcError::ParamsMismatch)?;
    res.append(format_args!(
        "\"pow({}, {}) = {:.6}\"",
        String::from_utf8_lossy(req.slice(base_token)),
        String::from_utf8_lossy(req.slice(exp_token)),
        base.powf(exponent),
    ))
}

fn subtract_positional(req: &Request<'_>, res: &mut ResponseBuffer<'_>) -> RpcResult<()> {
    let params = req.params_value().ok_or(RpcError::Assertion)?;
    let minuend = req
        .array_item(params, 0)
        .and_then(|i| req.number(i))
        .ok_or(RpcError::ParamsMismatch)?;
    let subtrahend = req
        .array_item(params, 1)
        .and_then(|i| req.number(i))
        .ok_or(RpcError::ParamsMismatch)?;
    res.append(format_args!("{:.6}", minuend - subtrahend))
}

fn subtract_named(req: &Request<'_>, res: &mut ResponseBuffer<'_>) -> RpcResult<()> {
    let params = req.params_value().ok_or(RpcError::Assertion)?;
    let minuend = req
        .member(params, b"minuend")
        .and_then(|i| req.number(i))
        .ok_or(RpcError::ParamsMismatch)?;
    let subtrahend = req
        .member(params, b"subtrahend")
        .and_then(|i| req.number(i))
        .ok_or(RpcError::ParamsMismatch)?;
    res.append(format_args!("{:.6}", minuend - subtrahend))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut engine = Engine::new();
    engine.register_methods([
        MethodRecord::new("echo", echo).with_params(&[TokenKind::String]),
        MethodRecord::new("pow", rpc_pow)
            .with_params(&[TokenKind::Primitive, TokenKind::Primitive]),
        MethodRecord::new("subtract.positional", subtract_positional)
            .with_params(&[TokenKind::Primitive, TokenKind::Primitive]),
        MethodRecord::new("subtract.named", subtract_named)
            .with_params(&[TokenKind::Primitive, TokenKind::Primitive]),
    ])?;

    let mut input = Vec::new();
    std::io::stdin().read_to_end(&mut input)?;

    let mut tokens = vec![Token::EMPTY; 1024];
    let mut region = vec![0u8; 2048];
    let mut response = ResponseBuffer::new(&mut region);

    let outcome = engine.dispatch(&input, &mut tokens, &mut response);

    if response.is_empty() {
        println!(">> no reply");
    } else {
        println!(">> {}", String::from_utf8_lossy(response.as_bytes()));
    }
    match outcome {
        Ok(()) => println!("ok"),
        Err(kind) => println!("{kind} (wire code {})", kind.wire_code()),
    }

    Ok(())
}
