use partagg::{
    Accumulator, AggregateError, AggregationEvaluator, Category, ConfigurationError,
    FrameDecodeError, Handler, HandlerConf, HandlerKind, Phase, Shape, Value,
    handler::{AnyAccumulator, Output},
    sketch::{MinHashConfig, MinHashSignature, Sketch},
};

fn handler(kind: HandlerKind, phase: Phase, inputs: &[Shape]) -> Handler {
    let mut handler = Handler::new(kind, HandlerConf::default());
    handler.configure(phase, inputs).unwrap();
    handler
}

/// Runs `rows` through one PARTIAL evaluator per worker, an optional PARTIAL_MERGE
/// combiner and one FINAL evaluator.
fn partitioned(
    kind: HandlerKind,
    inputs: &[Shape],
    rows: &[Vec<Option<Value>>],
    workers: usize,
) -> Option<Output> {
    let partial = handler(kind, Phase::Partial, inputs);
    let mut accs: Vec<AnyAccumulator> =
        (0..workers).map(|_| partial.new_accumulator()).collect();
    for row in rows {
        let worker = fastrand::usize(..workers);
        partial.consume_input(&mut accs[worker], row).unwrap();
    }
    let frames: Vec<Vec<u8>> = accs.iter().map(|acc| partial.emit_frame(acc)).collect();

    // combine the first half of the frames before the final merge
    let combiner = handler(kind, Phase::PartialMerge, &[Shape::BINARY]);
    let mut combined = combiner.new_accumulator();
    let (head, tail) = frames.split_at(workers / 2);
    let mut scratch = Vec::new();
    for frame in head {
        combiner.merge_frame(&mut combined, Some(frame.as_slice())).unwrap();
    }
    combiner.emit_frame_into(&combined, &mut scratch);

    let last = handler(kind, Phase::Final, &[Shape::BINARY]);
    let mut acc = last.new_accumulator();
    for frame in tail.iter().rev() {
        last.consume_input(&mut acc, &[Some(Value::Binary(frame.clone()))]).unwrap();
    }
    last.merge_frame(&mut acc, Some(scratch.as_slice())).unwrap();
    last.merge_frame(&mut acc, None).unwrap();
    last.finalize(&acc)
}

fn complete(kind: HandlerKind, inputs: &[Shape], rows: &[Vec<Option<Value>>]) -> Option<Output> {
    let handler = handler(kind, Phase::Complete, inputs);
    let mut acc = handler.new_accumulator();
    for row in rows {
        handler.consume_input(&mut acc, row).unwrap();
    }
    handler.finalize(&acc)
}

fn cardinality(output: Option<Output>) -> f64 {
    match output {
        Some(Output::Distinct(summary)) => summary.cardinality,
        other => panic!("unexpected output {other:?}"),
    }
}

#[test]
fn approx_distinct_small_input() {
    let text = [Shape::Primitive(Category::Text)];
    let rows: Vec<_> = ["A", "B", "C", "A", "B", "A"]
        .into_iter()
        .map(|s| vec![Some(Value::from(s))])
        .collect();

    let estimate = cardinality(partitioned(HandlerKind::ApproxDistinct, &text, &rows, 1));
    assert!((estimate - 3.0).abs() < 0.5, "partitioned estimate {estimate}");
    let estimate = cardinality(complete(HandlerKind::ApproxDistinct, &text, &rows));
    assert!((estimate - 3.0).abs() < 0.5, "complete estimate {estimate}");
}

#[test]
fn approx_distinct_many_workers() {
    let ints = [Shape::Primitive(Category::Integral)];
    let rows: Vec<_> = (0..50_000i64)
        .map(|i| vec![Some(Value::Int(i % 20_000))])
        .collect();
    let partitioned = cardinality(partitioned(HandlerKind::ApproxDistinct, &ints, &rows, 8));
    let complete = cardinality(complete(HandlerKind::ApproxDistinct, &ints, &rows));
    // KMV unions are exact, so partitioning does not change the estimate
    assert_eq!(partitioned, complete);
    let rel = (complete - 20_000.0).abs() / 20_000.0;
    assert!(rel < 0.1, "estimate {complete}");
}

#[test]
fn segment_counts_add_up_across_workers() {
    let inputs = [
        Shape::Primitive(Category::Text),
        Shape::Primitive(Category::Integral),
    ];
    let row = vec![Some(Value::from("foo")), Some(Value::Int(1))];
    let rows = vec![row; 20];
    for workers in [1, 2, 5] {
        let Some(Output::Segment(table)) =
            partitioned(HandlerKind::Segment, &inputs, &rows, workers)
        else {
            panic!("segment returned no table");
        };
        assert_eq!(table.count(&Value::from("foo"), &Value::Int(1)), 20);
    }
}

#[test]
fn segment_of_nothing_is_an_empty_table() {
    let inputs = [Shape::Primitive(Category::Integral), Shape::DOUBLE];
    let Some(Output::Segment(table)) = complete(HandlerKind::Segment, &inputs, &[]) else {
        panic!("segment returned no table");
    };
    assert!(table.is_empty());
}

#[test]
fn minhash_partitions_match_single_pass() {
    let inputs = [
        Shape::Primitive(Category::Text),
        Shape::Primitive(Category::Integral),
    ];
    let rows: Vec<_> = (0..1_000)
        .map(|i| {
            let user = format!("user-{}", i % 300);
            vec![Some(Value::from(user)), Some(Value::Int(64))]
        })
        .collect();
    let partitioned = partitioned(HandlerKind::MinHash, &inputs, &rows, 4);
    assert_eq!(partitioned, complete(HandlerKind::MinHash, &inputs, &rows));
    let Some(Output::Binary(bytes)) = partitioned else {
        panic!("minhash returned no signature");
    };
    let signature = MinHashSignature::from_bytes(&bytes).unwrap();
    assert_eq!(signature.config(), MinHashConfig::new(64, 0));
}

#[test]
fn similarity_of_overlapping_sets() {
    let config = MinHashConfig::new(256, 0);
    let encode = |range: std::ops::Range<i64>| {
        let mut signature = MinHashSignature::with_config(config);
        for i in range {
            signature.update(partagg::sketch::Item::Int(i));
        }
        Value::Binary(signature.to_bytes())
    };
    // x covers 0..600, y covers 300..1000, |x ∩ y| / |x ∪ y| = 0.3
    let rows: Vec<_> = (0..10i64)
        .map(|chunk| {
            let x = chunk * 60..(chunk + 1) * 60;
            let y = 300 + chunk * 70..300 + (chunk + 1) * 70;
            vec![Some(encode(x)), Some(encode(y))]
        })
        .collect();
    let inputs = [Shape::BINARY, Shape::BINARY];

    let Some(Output::Double(jaccard)) = partitioned(HandlerKind::Similarity, &inputs, &rows, 3)
    else {
        panic!("similarity returned no estimate");
    };
    assert!((jaccard - 0.3).abs() < 0.1, "jaccard {jaccard}");
    assert_eq!(
        complete(HandlerKind::Similarity, &inputs, &rows),
        Some(Output::Double(jaccard))
    );
}

#[test]
fn empty_accumulators_per_handler() {
    for kind in HandlerKind::ALL {
        let last = handler(kind, Phase::Final, &[Shape::BINARY]);
        let acc = last.new_accumulator();
        assert!(acc.is_empty(), "{kind}");
        let expected = match kind {
            HandlerKind::Segment => Some(Output::Segment(Default::default())),
            _ => None,
        };
        assert_eq!(last.finalize(&acc), expected, "{kind}");

        // an empty partial merges as a no-op
        let mut merged = last.new_accumulator();
        let frame = last.emit_frame(&acc);
        last.merge_frame(&mut merged, Some(frame.as_slice())).unwrap();
        assert!(merged.is_empty(), "{kind}");
    }
}

#[test]
fn corrupt_frames_are_rejected_without_side_effects() {
    let inputs = [Shape::Primitive(Category::Integral)];
    let partial = handler(HandlerKind::ApproxDistinct, Phase::Partial, &inputs);
    let mut acc = partial.new_accumulator();
    for i in 0..10i64 {
        partial.consume_input(&mut acc, &[Some(Value::Int(i))]).unwrap();
    }
    let frame = partial.emit_frame(&acc);

    let last = handler(HandlerKind::ApproxDistinct, Phase::Final, &[Shape::BINARY]);
    let mut merged = last.new_accumulator();
    last.merge_frame(&mut merged, Some(frame.as_slice())).unwrap();
    let before = merged.clone();
    for bad in [&frame[..frame.len() - 1], &[0xff; 4][..]] {
        assert!(matches!(
            last.merge_frame(&mut merged, Some(bad)),
            Err(AggregateError::Frame(_))
        ));
    }
    assert_eq!(merged, before);

    let similarity = handler(HandlerKind::Similarity, Phase::Final, &[Shape::BINARY]);
    let mut pair = similarity.new_accumulator();
    for bad in [&[0u8; 7][..], &[0, 0, 0, 9, 0, 0, 0, 0, 1][..]] {
        assert!(matches!(
            similarity.merge_frame(&mut pair, Some(bad)),
            Err(AggregateError::Frame(
                FrameDecodeError::Truncated { .. } | FrameDecodeError::LengthMismatch { .. }
            ))
        ));
    }
    assert!(pair.is_empty());
}

#[test]
fn configuration_errors() {
    let mut minhash = Handler::new(HandlerKind::MinHash, HandlerConf::default());
    let four = vec![Shape::Primitive(Category::Integral); 4];
    assert!(matches!(
        minhash.configure(Phase::Partial, &four),
        Err(ConfigurationError::Arity { handler: "minhash", actual: 4, .. })
    ));

    let mut similarity = Handler::new(HandlerKind::Similarity, HandlerConf::default());
    assert!(matches!(
        similarity.configure(Phase::Complete, &[Shape::BINARY, Shape::DOUBLE]),
        Err(ConfigurationError::Category { position: 2, .. })
    ));
    assert_eq!(similarity.phase(), None);
    similarity
        .configure(Phase::Complete, &[Shape::BINARY, Shape::BINARY])
        .unwrap();
    assert_eq!(similarity.phase(), Some(Phase::Complete));
}
