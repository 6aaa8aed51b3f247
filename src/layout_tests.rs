use super::*;

fn table(pairs: &[(&str, usize)]) -> LayerSizeTable {
    LayerSizeTable::new(
        pairs
            .iter()
            .map(|&(name, count)| LayerEntry::new(name, count))
            .collect(),
    )
}

#[test]
fn test_index_map_blocks_follow_table_order() {
    let t = table(&[("a.weight", 4), ("b.weight", 3)]);
    let map = build_index_map(&t).expect("valid table");
    assert_eq!(map, vec![0, 0, 0, 0, 1, 1, 1]);
}

#[test]
fn test_index_map_skips_zero_sized_layers() {
    let t = table(&[("a", 2), ("empty", 0), ("c", 1)]);
    let map = build_index_map(&t).expect("valid table");
    assert_eq!(map, vec![0, 0, 2]);
}

#[test]
fn test_index_map_empty_table() {
    let map = build_index_map(&LayerSizeTable::default()).expect("empty table");
    assert!(map.is_empty());
}

#[test]
fn test_from_raw_rejects_negative_count() {
    let err = LayerSizeTable::from_raw(vec![("a", 3), ("b", -1)]).expect_err("negative count");
    assert!(matches!(err, TrajectoryError::InvalidInput { .. }));
    assert!(err.to_string().contains("'b'"));
}

#[test]
fn test_from_raw_rejects_overflowing_counts() {
    let err = LayerSizeTable::from_raw(vec![("a", i64::MAX), ("b", i64::MAX), ("c", 3)])
        .expect_err("overflowing counts");
    assert!(matches!(err, TrajectoryError::InvalidInput { .. }));
}

#[test]
fn test_oversized_table_never_matches_a_vector() {
    let t = table(&[("a", usize::MAX), ("b", 2)]);
    assert_eq!(t.total_len(), usize::MAX);
    assert!(build_index_map(&t).is_err());
    assert_eq!(t.layer_of(5), Some(0));
}

#[test]
fn test_from_raw_accepts_zero() {
    let t = LayerSizeTable::from_raw(vec![("a", 0), ("b", 2)]).expect("zero is fine");
    assert_eq!(t.total_len(), 2);
}

#[test]
fn test_offsets_and_ranges() {
    let t = table(&[("a", 4), ("b", 0), ("c", 3)]);
    assert_eq!(t.offsets(), vec![0, 4, 4]);
    assert_eq!(t.range(0), Some(0..4));
    assert_eq!(t.range(1), Some(4..4));
    assert_eq!(t.range(2), Some(4..7));
    assert_eq!(t.range(3), None);
}

#[test]
fn test_layer_of_matches_index_map() {
    let t = table(&[("a", 2), ("b", 0), ("c", 3), ("d", 1)]);
    let map = build_index_map(&t).expect("valid table");
    for (i, &ordinal) in map.iter().enumerate() {
        assert_eq!(t.layer_of(i), Some(ordinal as usize), "position {i}");
    }
    assert_eq!(t.layer_of(map.len()), None);
}

#[test]
fn test_position_by_name() {
    let t = table(&[("a", 1), ("b", 1)]);
    assert_eq!(t.position("b"), Some(1));
    assert_eq!(t.position("z"), None);
}

#[test]
fn test_serde_pairs_format() {
    let t = table(&[("a.weight", 4), ("b.weight", 3)]);
    let json = serde_json::to_string(&t).expect("serialize");
    assert_eq!(json, r#"[["a.weight",4],["b.weight",3]]"#);
    let back: LayerSizeTable = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, t);
}

#[test]
fn test_serde_rejects_negative_count() {
    let result = serde_json::from_str::<LayerSizeTable>(r#"[["a",-4]]"#);
    assert!(result.is_err());
}

#[test]
fn test_same_layout() {
    let a = table(&[("a", 1), ("b", 2)]);
    let b = table(&[("a", 1), ("b", 2)]);
    let c = table(&[("a", 2), ("b", 1)]);
    assert!(a.same_layout(&b));
    assert!(!a.same_layout(&c));
}
