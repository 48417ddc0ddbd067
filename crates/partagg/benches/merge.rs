use criterion::{BatchSize, Bencher, BenchmarkId, Criterion, criterion_group, criterion_main};
use partagg::*;

const KINDS: [(HandlerKind, Category); 3] = [
    (HandlerKind::ApproxDistinct, Category::Integral),
    (HandlerKind::MinHash, Category::Integral),
    (HandlerKind::ModHash, Category::Integral),
];

pub fn consume_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("consume");
    for (kind, category) in KINDS {
        group.bench_with_input(BenchmarkId::from_parameter(kind), &kind, |b, &kind| {
            consume(kind, &[Shape::Primitive(category)], b);
        });
    }
    group.bench_function(BenchmarkId::from_parameter(HandlerKind::Segment), |b| {
        let inputs = [
            Shape::Primitive(Category::Integral),
            Shape::Primitive(Category::Integral),
        ];
        consume(HandlerKind::Segment, &inputs, b);
    });
    group.finish();
}

fn consume(kind: HandlerKind, inputs: &[Shape], bencher: &mut Bencher) {
    let mut handler = Handler::new(kind, HandlerConf::default());
    handler.configure(Phase::Partial, inputs).unwrap();
    let mut acc = handler.new_accumulator();
    let arity = inputs.len();
    bencher.iter(|| {
        let row: Vec<_> = (0..arity)
            .map(|_| Some(Value::Int(fastrand::i64(0..100_000))))
            .collect();
        handler.consume_input(&mut acc, &row).unwrap();
    });
}

pub fn merge_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");
    for partials in [2, 8, 32, 128].iter() {
        for (kind, category) in KINDS {
            group.bench_with_input(
                BenchmarkId::new(kind.name(), partials),
                partials,
                |b, &partials| {
                    merge(kind, category, partials, b);
                },
            );
        }
    }
    group.finish();
}

fn merge(kind: HandlerKind, category: Category, partials: usize, bencher: &mut Bencher) {
    let mut partial = Handler::new(kind, HandlerConf::default());
    partial
        .configure(Phase::Partial, &[Shape::Primitive(category)])
        .unwrap();
    let frames: Vec<Vec<u8>> = (0..partials)
        .map(|_| {
            let mut acc = partial.new_accumulator();
            for _ in 0..10_000 {
                let row = [Some(Value::Int(fastrand::i64(..)))];
                partial.consume_input(&mut acc, &row).unwrap();
            }
            partial.emit_frame(&acc)
        })
        .collect();

    let mut last = Handler::new(kind, HandlerConf::default());
    last.configure(Phase::Final, &[Shape::BINARY]).unwrap();
    bencher.iter_batched(
        || last.new_accumulator(),
        |mut acc| {
            for frame in &frames {
                last.merge_frame(&mut acc, Some(frame.as_slice())).unwrap();
            }
            last.finalize(&acc)
        },
        BatchSize::SmallInput,
    );
}

criterion_group!(benches, consume_benchmark, merge_benchmark);
criterion_main!(benches);
