use std::hint::black_box;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use oni_core::analysis::ScanEngine;
use oni_core::ast::SourceTree;
use oni_core::matcher::CompiledPattern;
use oni_core::rules::RuleRegistry;

const VULNERABLE_PATTERNS: &[&str] = &[
    "(a+)+$",
    "([a-zA-Z]+)*",
    "(x+x+)+y",
    r"(\d+;)+x",
    r"^(,*a)+$",
];

const CLEAN_PATTERNS: &[&str] = &[
    "^[a-z0-9_-]{3,16}$",
    r"\d{4}-\d{2}-\d{2}",
    r"^https?://[^\s]+$",
    "[A-Z][a-z]+ [A-Z][a-z]+",
    r"^\w+@\w+\.\w+$",
];

fn generate_dump(sites: usize) -> String {
    let mut body = String::from(r#"{"kind": "import", "line": 1, "module": "re"}"#);
    for i in 0..sites {
        body.push_str(&format!(
            r#", {{"kind": "call", "line": {line}, "func": {{"kind": "attr", "object": {{"kind": "name", "id": "re"}}, "name": "search"}}, "args": [{{"kind": "str", "value": "^item-{i}-[a-z]+$"}}]}}"#,
            line = i + 2,
            i = i
        ));
    }
    format!(r#"{{"kind": "module", "body": [{}]}}"#, body)
}

fn parse_dump(name: &str, sites: usize) -> SourceTree {
    SourceTree::from_json(name, &generate_dump(sites))
        .unwrap_or_else(|e| panic!("Failed to parse generated dump: {}", e))
}

fn bench_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("extraction");

    let engine = ScanEngine::new();
    let tree_100 = parse_dump("large.py", 100);

    group.throughput(Throughput::Elements(100));
    group.bench_function("extract_100_sites", |b| {
        b.iter(|| engine.extract_and_classify(black_box(&tree_100)))
    });

    group.finish();
}

fn bench_classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("classification");

    let registry = RuleRegistry::new();

    group.bench_function("vulnerable_patterns", |b| {
        b.iter(|| {
            for pattern in VULNERABLE_PATTERNS {
                let _ = registry.classify(black_box(pattern));
            }
        })
    });

    group.bench_function("clean_patterns", |b| {
        b.iter(|| {
            for pattern in CLEAN_PATTERNS {
                let _ = registry.classify(black_box(pattern));
            }
        })
    });

    group.finish();
}

fn bench_matcher(c: &mut Criterion) {
    let mut group = c.benchmark_group("matcher");

    group.bench_function("compile_email_pattern", |b| {
        b.iter(|| CompiledPattern::compile(black_box(r"^[\w.+-]+@[\w-]+\.[\w.]+$")))
    });

    let email = CompiledPattern::compile(r"^[\w.+-]+@[\w-]+\.[\w.]+$").unwrap();
    group.bench_function("match_accepting_input", |b| {
        b.iter(|| email.matches(black_box("user.name+tag@example.co.uk")))
    });

    // Small enough to finish, large enough that the exponential search
    // dominates.
    let nested = CompiledPattern::compile("(a+)+$").unwrap();
    let rejecting = format!("{}!", "a".repeat(14));
    group.bench_function("backtracking_blowup_len_14", |b| {
        b.iter(|| nested.matches(black_box(&rejecting)))
    });

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");

    let engine = ScanEngine::new();
    let trees: Vec<SourceTree> = (0..20)
        .map(|i| parse_dump(&format!("file_{}.py", i), 10))
        .collect();

    group.throughput(Throughput::Elements(20));
    group.bench_function("static_scan_20_files", |b| {
        b.iter(|| engine.scan_static(black_box(&trees), Vec::new()))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_extraction,
    bench_classification,
    bench_matcher,
    bench_pipeline
);
criterion_main!(benches);
