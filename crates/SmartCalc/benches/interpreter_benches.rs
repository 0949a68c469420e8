use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use smart_calc::lexer::tokenize_line;
use smart_calc::{Culture, Interpreter, InterpreterConfig};
use tokio_util::sync::CancellationToken;

const BUDGET: &str = "# Monthly budget
rent = 1,250
groceries = 85.40 * 4
commute = 22 km * 2 * 21
fuel = commute / 100 km * 6.5
utilities = 120 + 15%
total = rent + groceries + utilities
total > 1,500 // over budget?
holiday = 2024-07-01 + 3 weeks
2 h + 45 min in min
sqrt(2)";

fn interpreter(culture: &str) -> Interpreter {
    Interpreter::new(&InterpreterConfig::new(Culture::new(culture))).unwrap()
}

fn document(lines: usize) -> String {
    BUDGET.lines().cycle().take(lines).collect::<Vec<_>>().join("\n")
}

fn bench_tokenize(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer");
    let interpreter = interpreter("en-us");
    let grammar = &interpreter.resources().grammar;

    group.bench_function("single_line", |b| {
        b.iter(|| tokenize_line(grammar, 0, black_box("commute = 22 km * 2 * 21 // daily")))
    });

    group.finish();
}

fn bench_evaluate_document(c: &mut Criterion) {
    let mut group = c.benchmark_group("interpreter/document");
    let interpreter = interpreter("en-us");
    let cancellation = CancellationToken::new();

    for lines in [11, 110, 1100] {
        let text = document(lines);
        group.bench_with_input(BenchmarkId::from_parameter(lines), &text, |b, text| {
            b.iter(|| interpreter.evaluate_document(black_box(text), &cancellation))
        });
    }

    group.finish();
}

fn bench_cultures(c: &mut Criterion) {
    let mut group = c.benchmark_group("interpreter/culture");
    let cancellation = CancellationToken::new();

    let english = interpreter("en-us");
    group.bench_function("en-us", |b| {
        b.iter(|| english.evaluate_document(black_box("1,234.5 km in m * 2"), &cancellation))
    });

    let french = interpreter("fr-fr");
    group.bench_function("fr-fr", |b| {
        b.iter(|| french.evaluate_document(black_box("1\u{a0}234,5 km en m fois 2"), &cancellation))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_tokenize,
    bench_evaluate_document,
    bench_cultures
);
criterion_main!(benches);
