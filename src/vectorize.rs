//! Flatten a checkpoint's parameter set into one ordered weight vector.
//!
//! Layer order is the lexicographic order of parameter names, so two
//! checkpoints of the same architecture always produce vectors whose
//! positions line up, whatever order their tensors were loaded in.
//!
//! Zero-element tensors are accepted. They are recorded in the table with a
//! count of 0, contribute no values, and group to an empty layer.

use crate::error::{Result, TrajectoryError};
use crate::layout::LayerSizeTable;
use crate::tensor::ParameterSet;

/// Flatten and concatenate every tensor in `params`, ordered by sorted name.
///
/// The returned table lists `(name, element_count)` in the same order the
/// tensors were concatenated; its counts sum to the vector length.
///
/// # Errors
///
/// Returns `InvalidInput` if `params` is empty.
///
/// # Examples
///
/// ```
/// use weight_trajectory::tensor::{ParameterSet, Tensor};
/// use weight_trajectory::vectorize::vectorize;
///
/// let mut params = ParameterSet::new();
/// params.insert("b.weight", Tensor::full(&[1, 3], 0.0));
/// params.insert("a.weight", Tensor::full(&[2, 2], 1.0));
///
/// let (weights, table) = vectorize(&params).expect("non-empty parameter set");
/// assert_eq!(weights, vec![1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
/// assert_eq!(table.entries()[0].name, "a.weight");
/// assert_eq!(table.total_len(), 7);
/// ```
pub fn vectorize(params: &ParameterSet) -> Result<(Vec<f32>, LayerSizeTable)> {
    if params.is_empty() {
        return Err(TrajectoryError::invalid_input(
            "cannot vectorize an empty parameter set",
        ));
    }

    let mut weights = Vec::with_capacity(params.numel());
    let mut table = LayerSizeTable::default();

    for name in params.sorted_names() {
        let Some(tensor) = params.get(name) else {
            continue;
        };
        weights.extend_from_slice(tensor.as_slice());
        table.push(name, tensor.numel());
    }

    debug_assert_eq!(weights.len(), table.total_len());
    Ok((weights, table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::Tensor;

    fn scenario_params() -> ParameterSet {
        let mut params = ParameterSet::new();
        params.insert("a.weight", Tensor::full(&[2, 2], 1.0));
        params.insert("b.weight", Tensor::full(&[1, 3], 0.0));
        params
    }

    #[test]
    fn test_two_layer_scenario() {
        let (weights, table) = vectorize(&scenario_params()).expect("vectorize");
        assert_eq!(weights, vec![1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
        let pairs: Vec<(&str, usize)> = table.iter().map(|e| (e.name.as_str(), e.count)).collect();
        assert_eq!(pairs, vec![("a.weight", 4), ("b.weight", 3)]);
    }

    #[test]
    fn test_empty_parameter_set_rejected() {
        let err = vectorize(&ParameterSet::new()).expect_err("empty");
        assert!(matches!(err, TrajectoryError::InvalidInput { .. }));
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let names = ["gpt_neox.layers.0.mlp", "embed_out", "gpt_neox.embed_in", "a"];
        let forward: ParameterSet = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.to_string(), Tensor::full(&[i + 1], i as f32)))
            .collect();
        let mut backward = ParameterSet::new();
        for (i, n) in names.iter().enumerate().rev() {
            backward.insert(*n, Tensor::full(&[i + 1], i as f32));
        }

        let (wa, ta) = vectorize(&forward).expect("forward");
        let (wb, tb) = vectorize(&backward).expect("backward");
        assert_eq!(ta, tb);
        let bits_a: Vec<u32> = wa.iter().map(|v| v.to_bits()).collect();
        let bits_b: Vec<u32> = wb.iter().map(|v| v.to_bits()).collect();
        assert_eq!(bits_a, bits_b);
    }

    #[test]
    fn test_zero_element_tensor_recorded_with_zero_count() {
        let mut params = scenario_params();
        params.insert("ab.empty", Tensor::new(vec![0, 4], vec![]).expect("zero-size"));
        let (weights, table) = vectorize(&params).expect("vectorize");
        assert_eq!(weights.len(), 7);
        assert_eq!(table.len(), 3);
        assert_eq!(table.entries()[1], crate::layout::LayerEntry::new("ab.empty", 0));
    }

    #[test]
    fn test_source_parameters_untouched() {
        let params = scenario_params();
        let before = params.get("a.weight").cloned();
        let _ = vectorize(&params).expect("vectorize");
        assert_eq!(params.get("a.weight").cloned(), before);
    }

    #[test]
    fn test_row_major_flattening() {
        let mut params = ParameterSet::new();
        params.insert(
            "m",
            Tensor::new(vec![2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).expect("2x3"),
        );
        let (weights, _) = vectorize(&params).expect("vectorize");
        assert_eq!(weights, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }
}
