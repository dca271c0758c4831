use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use metasql::{
    ColumnInfo, ConditionDescriptor, FilterRequest, Operator, OrderDescriptor, SafeIdent,
    TableLayout, compile_select, extract_parameter_names,
};

/// A layout of `n` integer columns named `col0..`.
fn layout(n: usize) -> TableLayout {
    (0..n)
        .map(|i| ColumnInfo::new(format!("col{i}"), "integer"))
        .collect()
}

/// `n` GreaterOrEqual conditions with string operands that need coercion.
fn request(n: usize) -> FilterRequest {
    let mut request = FilterRequest::new().order_by(OrderDescriptor::desc("col0")).page(3, 50);
    for i in 0..n {
        request = request.condition(
            ConditionDescriptor::new(format!("COL{i}"), Operator::GreaterOrEqual).value(i.to_string()),
        );
    }
    request
}

fn bench_compile_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter/compile_select");
    let table = SafeIdent::qualified("mes.lot").unwrap();

    for n in [1, 5, 20, 100] {
        let layout = layout(n);
        let request = request(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| black_box(compile_select(&table, &request, Some(&layout)).unwrap()));
        });
    }

    group.finish();
}

fn bench_in_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter/in_list");
    let table = SafeIdent::qualified("mes.lot").unwrap();
    let layout = layout(1);

    for n in [5, 50, 500] {
        let request = FilterRequest::new().condition(
            ConditionDescriptor::new("col0", Operator::In).values((0..n).map(|i| i.to_string())),
        );
        group.bench_with_input(BenchmarkId::from_parameter(n), &request, |b, request| {
            b.iter(|| black_box(compile_select(&table, request, Some(&layout)).unwrap()));
        });
    }

    group.finish();
}

fn bench_guard_markers(c: &mut Criterion) {
    let predicate = "SELECT CASE WHEN EXISTS (SELECT 1 FROM mes.lot l /* @skip */ \
                     WHERE l.eqp_no = @EQP_NO AND l.status <> '@closed' AND l.line = @LINE) \
                     THEN 0 ELSE 1 END AS CanDelete";
    c.bench_function("guard/extract_parameter_names", |b| {
        b.iter(|| black_box(extract_parameter_names(black_box(predicate))));
    });
}

criterion_group!(benches, bench_compile_select, bench_in_list, bench_guard_markers);
criterion_main!(benches);
