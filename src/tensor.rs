//! Host-resident tensors and the named parameter set of one checkpoint.

use crate::error::{Result, TrajectoryError};
use std::collections::HashMap;

/// A dense, row-major `f32` tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    /// Create a tensor, checking that `data` holds exactly `product(shape)` values.
    ///
    /// An empty shape describes a scalar (one element).
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the data length disagrees with the shape.
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        let expected = element_count(&shape);
        if expected != data.len() {
            return Err(TrajectoryError::invalid_input(format!(
                "tensor shape {shape:?} needs {expected} values, got {}",
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// 1-D tensor over `data`.
    #[must_use]
    pub fn from_vec(data: Vec<f32>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    /// Tensor of the given shape filled with `value`.
    #[must_use]
    pub fn full(shape: &[usize], value: f32) -> Self {
        Self {
            shape: shape.to_vec(),
            data: vec![value; element_count(shape)],
        }
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Row-major view of the values, i.e. the flattened tensor.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Number of elements.
    #[must_use]
    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Whether any dimension is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Consume the tensor, returning its values in row-major order.
    #[must_use]
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }
}

fn element_count(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Named tensors of one model checkpoint.
///
/// Iteration order of the backing map is unspecified; everything
/// that needs an order (the vectorizer) sorts names itself.
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    tensors: HashMap<String, Tensor>,
}

impl ParameterSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tensor, returning the previous one stored under `name`.
    pub fn insert(&mut self, name: impl Into<String>, tensor: Tensor) -> Option<Tensor> {
        self.tensors.insert(name.into(), tensor)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.tensors.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tensors.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Total number of scalar parameters across all tensors.
    #[must_use]
    pub fn numel(&self) -> usize {
        self.tensors.values().map(Tensor::numel).sum()
    }

    /// Layer names in lexicographic order.
    #[must_use]
    pub fn sorted_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tensors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor)> {
        self.tensors.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, Tensor)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (String, Tensor)>>(iter: I) -> Self {
        Self {
            tensors: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_shape_mismatch_rejected() {
        let err = Tensor::new(vec![2, 2], vec![1.0; 3]).expect_err("3 values for 2x2");
        assert!(matches!(err, TrajectoryError::InvalidInput { .. }));
    }

    #[test]
    fn test_scalar_tensor_has_one_element() {
        let t = Tensor::new(vec![], vec![0.5]).expect("scalar");
        assert_eq!(t.numel(), 1);
        assert!(!t.is_empty());
    }

    #[test]
    fn test_zero_dimension_tensor_is_empty() {
        let t = Tensor::new(vec![3, 0], vec![]).expect("zero-size");
        assert!(t.is_empty());
        assert_eq!(t.shape(), &[3, 0]);
    }

    #[test]
    fn test_full_fills_value() {
        let t = Tensor::full(&[2, 3], 7.0);
        assert_eq!(t.numel(), 6);
        assert!(t.as_slice().iter().all(|&v| v == 7.0));
    }

    #[test]
    fn test_parameter_set_sorted_names() {
        let mut params = ParameterSet::new();
        params.insert("b.weight", Tensor::from_vec(vec![0.0]));
        params.insert("a.weight", Tensor::from_vec(vec![0.0]));
        params.insert("a.bias", Tensor::from_vec(vec![0.0]));
        assert_eq!(params.sorted_names(), vec!["a.bias", "a.weight", "b.weight"]);
        assert_eq!(params.numel(), 3);
    }
}
