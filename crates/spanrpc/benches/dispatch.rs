// Resource-conscious benchmark suite for the dispatch pipeline.
//
// Benchmarks are lightweight and focus on the essential characteristics:
// tokenization cost, full dispatch cost, and the miss path.

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use spanrpc::{
    tokenize, Engine, MethodRecord, Request, ResponseBuffer, RpcError, RpcResult, Token, TokenKind,
};

const SUBTRACT: &[u8] =
    br#"{"jsonrpc":"2.0","method":"subtract.positional","params":[42,23],"id":1}"#;

fn subtract_positional(req: &Request<'_>, res: &mut ResponseBuffer<'_>) -> RpcResult<()> {
    let params = req.params_value().ok_or(RpcError::Assertion)?;
    let a = req
        .array_item(params, 0)
        .and_then(|i| req.number(i))
        .ok_or(RpcError::ParamsMismatch)?;
    let b = req
        .array_item(params, 1)
        .and_then(|i| req.number(i))
        .ok_or(RpcError::ParamsMismatch)?;
    res.append(format_args!("{:.6}", a - b))
}

fn engine() -> Engine {
    let mut engine = Engine::new();
    engine
        .register(
            MethodRecord::new("subtract.positional", subtract_positional)
                .with_params(&[TokenKind::Primitive, TokenKind::Primitive]),
        )
        .unwrap();
    engine
}

fn bench_tokenize(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenize");
    group.warm_up_time(Duration::from_millis(100));
    group.measurement_time(Duration::from_millis(500));
    group.sample_size(50);

    group.bench_function("subtract_request", |b| {
        let mut tokens = [Token::EMPTY; 32];
        b.iter(|| {
            let count = tokenize(black_box(SUBTRACT), &mut tokens).unwrap_or(0);
            black_box(count)
        })
    });

    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    group.warm_up_time(Duration::from_millis(100));
    group.measurement_time(Duration::from_millis(500));
    group.sample_size(50);

    let engine = engine();

    group.bench_function("subtract_full_pipeline", |b| {
        let mut tokens = [Token::EMPTY; 32];
        let mut region = [0u8; 256];
        b.iter(|| {
            let mut response = ResponseBuffer::new(&mut region);
            let _ = engine.dispatch(black_box(SUBTRACT), &mut tokens, &mut response);
            black_box(response.len())
        })
    });

    group.bench_function("method_not_found", |b| {
        let miss: &[u8] = br#"{"jsonrpc":"2.0","method":"missing","params":[],"id":1}"#;
        let mut tokens = [Token::EMPTY; 32];
        let mut region = [0u8; 256];
        b.iter(|| {
            let mut response = ResponseBuffer::new(&mut region);
            let _ = engine.dispatch(black_box(miss), &mut tokens, &mut response);
            black_box(response.len())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_tokenize, bench_dispatch);
criterion_main!(benches);
