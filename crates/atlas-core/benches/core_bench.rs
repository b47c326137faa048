//! Criterion benchmarks for atlas-core.
//!
//! ## Benchmark groups
//!
//! 1. **schema** — DDL init + migration overhead.
//! 2. **diff** — Fingerprint diffing at several repository sizes.
//! 3. **parsing** — Python and Go symbol extraction.
//! 4. **store** — Per-file replace and name lookups on an in-memory store.
//!
//! ## Running
//!
//! ```sh
//! cargo bench -p atlas-core
//! # Run only the diff group:
//! cargo bench -p atlas-core -- diff
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rusqlite::Connection;

use atlas_core::indexer::changes::diff;
use atlas_core::indexer::golang::GoParser;
use atlas_core::indexer::parser::LanguageParser;
use atlas_core::indexer::python::PythonParser;
use atlas_core::models::{Fingerprints, Symbol, SymbolKind};
use atlas_core::store::database::SymbolStore;
use atlas_core::store::schema::{init_schema, migrate_schema};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `n` paths with every tenth modified, every twentieth deleted, and `n / 10`
/// new files on the current side.
fn fingerprint_maps(n: usize) -> (Fingerprints, Fingerprints) {
    let mut stored = Fingerprints::new();
    let mut current = Fingerprints::new();
    for i in 0..n {
        let path = format!("pkg{}/mod_{i}.py", i % 17);
        stored.insert(path.clone(), format!("{i:064x}"));
        if i % 20 == 0 {
            continue;
        }
        let hash = if i % 10 == 0 { i + 1 } else { i };
        current.insert(path, format!("{hash:064x}"));
    }
    for i in 0..n / 10 {
        current.insert(format!("new/file_{i}.py"), format!("{i:064x}"));
    }
    (stored, current)
}

fn python_source(classes: usize) -> String {
    let mut src = String::from("import os\n\n");
    for c in 0..classes {
        src.push_str(&format!(
            "class Worker{c}:\n    \"\"\"Worker number {c}.\"\"\"\n\n\
             \x20   def run(self, job: str, retries: int = 3) -> bool:\n\
             \x20       \"\"\"Run one job.\"\"\"\n        return True\n\n\
             \x20   def stop(self):\n        pass\n\n\
             def helper_{c}(a, b):\n    return a + b\n\n"
        ));
    }
    src
}

fn go_source(types: usize) -> String {
    let mut src = String::from("package bench\n\n");
    for t in 0..types {
        src.push_str(&format!(
            "// Worker{t} does work.\ntype Worker{t} struct {{\n\tid int\n}}\n\n\
             // Run runs a job.\nfunc (w *Worker{t}) Run(job string) (bool, error) {{\n\treturn true, nil\n}}\n\n\
             func helper{t}(a, b int) int {{\n\treturn a + b\n}}\n\n"
        ));
    }
    src
}

// ---------------------------------------------------------------------------
// Benchmark: Schema initialization & migration
// ---------------------------------------------------------------------------

fn bench_schema(c: &mut Criterion) {
    c.bench_function("schema_init_and_migrate", |b| {
        b.iter(|| {
            let conn = Connection::open_in_memory().unwrap();
            init_schema(&conn).unwrap();
            black_box(&conn);
        });
    });

    c.bench_function("schema_migration_noop_on_current", |b| {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        b.iter(|| {
            migrate_schema(black_box(&conn)).unwrap();
        });
    });
}

// ---------------------------------------------------------------------------
// Benchmark: Diffing
// ---------------------------------------------------------------------------

fn bench_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff");
    for n in [100usize, 1_000, 10_000] {
        let (stored, current) = fingerprint_maps(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| diff(black_box(current.clone()), black_box(&stored)));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: Parsing
// ---------------------------------------------------------------------------

fn bench_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing");
    for size in [10usize, 100] {
        let py = python_source(size);
        group.bench_with_input(BenchmarkId::new("python", size), &py, |b, src| {
            b.iter(|| PythonParser.parse(black_box(src.as_bytes()), "bench.py"));
        });
        let go = go_source(size);
        group.bench_with_input(BenchmarkId::new("go", size), &go, |b, src| {
            b.iter(|| GoParser.parse(black_box(src.as_bytes()), "bench.go"));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: Store
// ---------------------------------------------------------------------------

fn bench_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("store");

    let symbols: Vec<Symbol> = (0..50u32)
        .map(|i| Symbol::new(format!("func_{i}"), SymbolKind::Function, "bench.py", i * 10 + 1))
        .collect();
    group.bench_function("replace_file_50_symbols", |b| {
        let mut store = SymbolStore::open_in_memory().unwrap();
        b.iter(|| store.replace_file("bench.py", "abc", black_box(&symbols)).unwrap());
    });

    let mut store = SymbolStore::open_in_memory().unwrap();
    for f in 0..100 {
        let path = format!("pkg/mod_{f}.py");
        let file_symbols: Vec<Symbol> = (0..20u32)
            .map(|i| Symbol::new(format!("parse_{f}_{i}"), SymbolKind::Function, path.as_str(), i + 1))
            .collect();
        store.replace_file(&path, "h", &file_symbols).unwrap();
    }
    group.bench_function("find_exact", |b| {
        b.iter(|| store.find_exact(black_box("parse_50_10")).unwrap());
    });
    group.bench_function("find_partial", |b| {
        b.iter(|| store.find_partial(black_box("PARSE_5")).unwrap());
    });
    group.finish();
}

criterion_group!(benches, bench_schema, bench_diff, bench_parsing, bench_store);
criterion_main!(benches);
