use super::*;
use crate::layout::LayerEntry;
use tempfile::tempdir;

const REPO: &str = "EleutherAI/pythia-14m";

fn record(step: u64, scale: f32) -> CheckpointRecord {
    let table = LayerSizeTable::new(vec![
        LayerEntry::new("a.weight", 4),
        LayerEntry::new("b.weight", 3),
    ]);
    let weights = (0..7).map(|i| i as f32 * scale).collect();
    CheckpointRecord::new(Step(step), weights, table).expect("consistent record")
}

#[test]
fn test_record_rejects_inconsistent_table() {
    let table = LayerSizeTable::new(vec![LayerEntry::new("a", 2)]);
    let err = CheckpointRecord::new(Step(0), vec![1.0; 3], table).expect_err("3 vs 2");
    assert!(matches!(err, TrajectoryError::InvalidInput { .. }));
}

#[test]
fn test_save_and_load_round_trip() {
    let dir = tempdir().expect("tempdir");
    let store = TrajectoryStore::new(dir.path());
    let rec = record(512, 0.5);

    let path = store.save(REPO, &rec).expect("save");
    assert_eq!(path, dir.path().join(REPO).join("512.safetensors"));
    assert!(store.contains(REPO, Step(512)));

    let loaded = store.load(REPO, Step(512)).expect("load");
    assert_eq!(loaded, rec);
}

#[test]
fn test_no_temp_file_left_behind() {
    let dir = tempdir().expect("tempdir");
    let store = TrajectoryStore::new(dir.path());
    store.save(REPO, &record(1, 1.0)).expect("save");
    let names: Vec<String> = fs::read_dir(store.variant_dir(REPO))
        .expect("read dir")
        .map(|e| e.expect("entry").file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["1.safetensors".to_string()]);
}

#[test]
fn test_load_missing_step() {
    let dir = tempdir().expect("tempdir");
    let store = TrajectoryStore::new(dir.path());
    let err = store.load(REPO, Step(1000)).expect_err("never saved");
    assert!(matches!(
        err,
        TrajectoryError::MissingArtifact {
            step: Some(1000),
            ..
        }
    ));
}

#[test]
fn test_list_is_numeric() {
    let dir = tempdir().expect("tempdir");
    let store = TrajectoryStore::new(dir.path());
    for step in [1000, 2, 512, 0, 64] {
        store.save(REPO, &record(step, 1.0)).expect("save");
    }
    fs::write(store.variant_dir(REPO).join("notes.txt"), "x").expect("write");

    let steps: Vec<Step> = store
        .list(REPO)
        .expect("list")
        .into_iter()
        .map(|(s, _)| s)
        .collect();
    assert_eq!(steps, vec![Step(0), Step(2), Step(64), Step(512), Step(1000)]);
    assert_eq!(store.latest(REPO).expect("latest"), Some(Step(1000)));
}

#[test]
fn test_list_missing_variant_dir() {
    let dir = tempdir().expect("tempdir");
    let store = TrajectoryStore::new(dir.path());
    assert!(store.list(REPO).expect_err("no dir").is_missing_artifact());
}

#[test]
fn test_read_rejects_negative_layer_count() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("0.safetensors");
    let weights = [1.0_f32, 2.0];
    let mut tensors = BTreeMap::new();
    tensors.insert(
        WEIGHTS_TENSOR.to_string(),
        TensorView {
            shape: &[2],
            data: &weights,
        },
    );
    let mut meta = UserMetadata::new();
    meta.insert(
        KEY_LAYER_SIZES.to_string(),
        r#"[["a",4],["b",-2]]"#.to_string(),
    );
    save_safetensors(&path, &tensors, &meta).expect("save");

    let err = read_record(&path).expect_err("negative count");
    assert!(matches!(err, TrajectoryError::InvalidInput { .. }));
}

#[test]
fn test_read_rejects_overflowing_layer_counts() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("0.safetensors");
    let weights = [1.0_f32];
    let mut tensors = BTreeMap::new();
    tensors.insert(
        WEIGHTS_TENSOR.to_string(),
        TensorView {
            shape: &[1],
            data: &weights,
        },
    );
    let mut meta = UserMetadata::new();
    meta.insert(
        KEY_LAYER_SIZES.to_string(),
        format!(r#"[["a",{max}],["b",{max}],["c",3]]"#, max = i64::MAX),
    );
    save_safetensors(&path, &tensors, &meta).expect("save");

    let err = read_record(&path).expect_err("overflowing counts");
    assert!(matches!(err, TrajectoryError::InvalidInput { .. }));
}

#[test]
fn test_read_requires_layer_table() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("3.safetensors");
    let weights = [1.0_f32];
    let mut tensors = BTreeMap::new();
    tensors.insert(
        WEIGHTS_TENSOR.to_string(),
        TensorView {
            shape: &[1],
            data: &weights,
        },
    );
    save_safetensors(&path, &tensors, &UserMetadata::new()).expect("save");
    let err = read_record(&path).expect_err("no layer table");
    assert!(matches!(err, TrajectoryError::FormatError { .. }));
}

#[test]
fn test_aggregate_round_trip() {
    let dir = tempdir().expect("tempdir");
    let store = TrajectoryStore::new(dir.path());
    let records: Vec<CheckpointRecord> = [0, 512, 1000]
        .into_iter()
        .map(|s| record(s, s as f32 + 1.0))
        .collect();
    for rec in &records {
        store.save(REPO, rec).expect("save");
    }

    let path = store.write_aggregate(REPO).expect("aggregate");
    assert_eq!(path, dir.path().join("EleutherAI/pythia-14m.trajectory.safetensors"));

    let agg = AggregateTrajectory::open(&path).expect("open");
    assert_eq!(agg.steps(), &[Step(0), Step(512), Step(1000)]);
    for rec in &records {
        assert_eq!(&agg.get(rec.step).expect("step"), rec);
    }
    assert!(agg.get(Step(2)).expect_err("absent").is_missing_artifact());
}

#[test]
fn test_aggregate_without_steps() {
    let dir = tempdir().expect("tempdir");
    let store = TrajectoryStore::new(dir.path());
    fs::create_dir_all(store.variant_dir(REPO)).expect("mkdir");
    assert!(store.write_aggregate(REPO).is_err());
}
