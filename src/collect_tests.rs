use super::*;
use crate::source::InMemorySource;
use crate::tensor::{ParameterSet, Tensor};
use tempfile::tempdir;

fn toy_family(steps: &[u64]) -> ModelFamily {
    ModelFamily {
        org: "local".to_string(),
        name: "toy".to_string(),
        variants: vec![Variant::new("tiny", false)],
        schedule: StepSchedule::new(steps.iter().copied().map(Step)),
    }
}

fn params(scale: f32) -> ParameterSet {
    let mut p = ParameterSet::new();
    p.insert("b.weight", Tensor::full(&[1, 3], scale));
    p.insert("a.weight", Tensor::full(&[2, 2], -scale));
    p
}

#[test]
fn test_collects_every_step() {
    let dir = tempdir().expect("tempdir");
    let store = TrajectoryStore::new(dir.path());
    let family = toy_family(&[0, 1, 2]);
    let variant = family.variants[0].clone();
    let source = InMemorySource::new()
        .with("tiny", Step(0), params(0.0))
        .with("tiny", Step(1), params(1.0))
        .with("tiny", Step(2), params(2.0));

    let collector = TrajectoryCollector::new(&source, &store, &family, &variant);
    assert_eq!(collector.remaining(), 3);
    let outcomes: Vec<StepOutcome> = collector.collect();
    assert_eq!(outcomes.len(), 3);
    for outcome in &outcomes {
        assert!(matches!(
            outcome.status,
            StepStatus::Saved {
                n_weights: 7,
                n_layers: 2,
                ..
            }
        ));
    }

    let loaded = store.load("local/toy-tiny", Step(2)).expect("load");
    assert_eq!(loaded.weights, vec![-2.0, -2.0, -2.0, -2.0, 2.0, 2.0, 2.0]);
}

#[test]
fn test_existing_steps_are_skipped() {
    let dir = tempdir().expect("tempdir");
    let store = TrajectoryStore::new(dir.path());
    let family = toy_family(&[0, 1]);
    let variant = family.variants[0].clone();
    let source = InMemorySource::new()
        .with("tiny", Step(0), params(0.0))
        .with("tiny", Step(1), params(1.0));

    let first: Vec<StepOutcome> =
        TrajectoryCollector::new(&source, &store, &family, &variant).collect();
    assert!(first.iter().all(|o| matches!(o.status, StepStatus::Saved { .. })));

    // Second run loads nothing: an empty source would fail every step.
    let empty = InMemorySource::new();
    let second: Vec<StepOutcome> =
        TrajectoryCollector::new(&empty, &store, &family, &variant).collect();
    assert!(second
        .iter()
        .all(|o| matches!(o.status, StepStatus::Skipped { .. })));
}

#[test]
fn test_failure_does_not_block_later_steps() {
    let dir = tempdir().expect("tempdir");
    let store = TrajectoryStore::new(dir.path());
    let family = toy_family(&[0, 1, 2, 4]);
    let variant = family.variants[0].clone();
    // Step 1 is missing, step 2 is empty (invalid input).
    let source = InMemorySource::new()
        .with("tiny", Step(0), params(0.0))
        .with("tiny", Step(2), ParameterSet::new())
        .with("tiny", Step(4), params(4.0));

    let mut summary = CollectSummary::default();
    let outcomes: Vec<StepOutcome> =
        TrajectoryCollector::new(&source, &store, &family, &variant).collect();
    for outcome in &outcomes {
        summary.record(outcome);
    }

    assert_eq!(summary.saved, 2);
    assert_eq!(summary.failed, vec![Step(1), Step(2)]);
    assert!(!summary.is_clean());
    match &outcomes[1].status {
        StepStatus::Failed(e) => assert!(e.is_missing_artifact()),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(outcomes[2].is_failure());
    assert!(store.contains("local/toy-tiny", Step(4)));
    assert!(!store.contains("local/toy-tiny", Step(2)));
}

#[test]
fn test_lazy_iteration() {
    let dir = tempdir().expect("tempdir");
    let store = TrajectoryStore::new(dir.path());
    let family = toy_family(&[0, 1, 2]);
    let variant = family.variants[0].clone();
    let source = InMemorySource::new()
        .with("tiny", Step(0), params(0.0))
        .with("tiny", Step(1), params(1.0))
        .with("tiny", Step(2), params(2.0));

    let mut collector = TrajectoryCollector::new(&source, &store, &family, &variant);
    let first = collector.next().expect("first step");
    assert_eq!(first.step, Step(0));
    assert!(store.contains("local/toy-tiny", Step(0)));
    assert!(!store.contains("local/toy-tiny", Step(1)));
    assert_eq!(collector.len(), 2);
}
