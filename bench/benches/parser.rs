use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use triangle::{diagnostics::Reporter, lexer::SUGGESTED_TOKENS_CAPACITY, parser, token::Token};

static INPUT: &str = include_str!("../../demos/big.tri");

fn parser(input: &str, tokens: &mut Vec<Token>) {
    let mut reporter = Reporter::new();
    let program = parser::parse_str(input, tokens, &mut reporter);
    assert!(!reporter.has_errors());
    _ = black_box(program);
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut tokens = Vec::with_capacity(SUGGESTED_TOKENS_CAPACITY * 2);

    c.bench_function("parser", |b| {
        b.iter(|| {
            tokens.clear();
            parser(black_box(INPUT), &mut tokens);
        });
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
