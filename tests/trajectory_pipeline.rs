//! End-to-end: collect a synthetic trajectory, then build and sink frames.

use std::fs;
use tempfile::tempdir;
use weight_trajectory::prelude::*;

const STEPS: [u64; 5] = [0, 1, 2, 512, 1000];

fn family() -> ModelFamily {
    ModelFamily {
        org: "local".to_string(),
        name: "toy".to_string(),
        variants: vec![Variant::new("tiny", true)],
        schedule: StepSchedule::new(STEPS.iter().copied().map(Step)),
    }
}

// Weights drift linearly towards their final values; step 0 is all zeros.
fn checkpoint(step: u64) -> ParameterSet {
    let t = step as f32 / 1000.0;
    let qkv: Vec<f32> = (0..12).map(|i| t * (i as f32 - 5.5)).collect();
    let embed: Vec<f32> = (0..8).map(|i| t * ((i * 3 % 8) as f32)).collect();
    let mut params = ParameterSet::new();
    params.insert(
        "gpt_neox.layers.0.attention.query_key_value.weight",
        Tensor::new(vec![3, 4], qkv).expect("shape"),
    );
    params.insert(
        "gpt_neox.embed_in.weight",
        Tensor::new(vec![4, 2], embed).expect("shape"),
    );
    params.insert("gpt_neox.layers.0.attention.masked_bias", Tensor::new(vec![0], vec![]).expect("shape"));
    params
}

fn source() -> InMemorySource {
    STEPS
        .iter()
        .fold(InMemorySource::new(), |src, &s| src.with("tiny", Step(s), checkpoint(s)))
}

#[test]
fn collect_then_frames() {
    let dir = tempdir().expect("tempdir");
    let store = TrajectoryStore::new(dir.path().join("traj"));
    let family = family();
    let variant = family.variants[0].clone();
    let source = source();

    let mut summary = CollectSummary::default();
    let mut collector = TrajectoryCollector::new(&source, &store, &family, &variant);
    let repo = collector.repo_name().to_string();
    assert_eq!(repo, "local/toy-tiny-deduped");
    for outcome in collector.by_ref() {
        summary.record(&outcome);
    }
    assert_eq!(summary.saved, STEPS.len());
    assert!(summary.is_clean());

    let listed: Vec<Step> = store
        .list(&repo)
        .expect("list")
        .into_iter()
        .map(|(s, _)| s)
        .collect();
    assert_eq!(listed, STEPS.iter().copied().map(Step).collect::<Vec<_>>());

    let record = store.load(&repo, Step(1000)).expect("final");
    assert_eq!(record.table.len(), 3);
    assert_eq!(record.table.entries()[1].count, 0);
    assert_eq!(record.weights.len(), 20);

    let builder = FrameBuilder::open(
        RecordSource::Directory {
            store: store.clone(),
            repo_name: repo.clone(),
        },
        FrameOptions::default(),
    )
    .expect("open");
    assert_eq!(builder.baseline_step(), Step(1000));

    let mut sink = JsonLinesSink::create(&dir.path().join("frames"), &repo).expect("sink");
    let mut frames = Vec::new();
    for frame in builder {
        let frame = frame.expect("frame");
        sink.push(&frame).expect("push");
        frames.push(frame);
    }
    let path = sink.finish().expect("finish");

    assert!(frames[0].correlation.is_degenerate());
    for frame in &frames[1..] {
        let r = frame.correlation.value();
        assert!((r - 1.0).abs() < 1e-6, "step {} r = {r}", frame.step);
        assert_eq!(frame.n_points(), 20);
    }
    let colors: Vec<&str> = frames[1].layers.iter().map(|l| l.color.as_str()).collect();
    assert_eq!(colors, vec!["slateblue", "black", "brown"]);

    let written = fs::read_to_string(path).expect("frames file");
    assert_eq!(written.lines().count(), STEPS.len());
    assert!(written.lines().next().expect("first").contains("\"value\":null"));
}

#[test]
fn interrupted_collection_resumes() {
    let dir = tempdir().expect("tempdir");
    let store = TrajectoryStore::new(dir.path());
    let family = family();
    let variant = family.variants[0].clone();
    let source = source();

    let first: Vec<StepOutcome> = TrajectoryCollector::new(&source, &store, &family, &variant)
        .take(2)
        .collect();
    assert_eq!(first.len(), 2);

    let second: Vec<StepOutcome> =
        TrajectoryCollector::new(&source, &store, &family, &variant).collect();
    let skipped = second
        .iter()
        .filter(|o| matches!(o.status, StepStatus::Skipped { .. }))
        .count();
    let saved = second
        .iter()
        .filter(|o| matches!(o.status, StepStatus::Saved { .. }))
        .count();
    assert_eq!((skipped, saved), (2, 3));
}

#[test]
fn aggregate_matches_per_step_files() {
    let dir = tempdir().expect("tempdir");
    let store = TrajectoryStore::new(dir.path());
    let family = family();
    let variant = family.variants[0].clone();
    let source = source();
    let repo = family.repo_name(&variant);
    TrajectoryCollector::new(&source, &store, &family, &variant).for_each(drop);

    let aggregate = AggregateTrajectory::open(store.write_aggregate(&repo).expect("write"))
        .expect("open");
    assert_eq!(aggregate.steps().len(), STEPS.len());
    for &s in &STEPS {
        assert_eq!(
            aggregate.get(Step(s)).expect("aggregate step"),
            store.load(&repo, Step(s)).expect("step file")
        );
    }
}
