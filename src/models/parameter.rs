//! Trainable parameter storage

use ndarray::{Array1, Array2, ArrayView2, ArrayViewMut2};

/// A named trainable tensor with its gradient accumulator.
///
/// Storage is a flat fp32 buffer plus a logical shape; 2-D parameters are
/// viewed as row-major matrices.
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    shape: Vec<usize>,
    data: Array1<f32>,
    grad: Array1<f32>,
}

impl Parameter {
    /// Create a parameter from a matrix
    pub fn from_matrix(name: impl Into<String>, matrix: Array2<f32>) -> Self {
        let shape = matrix.shape().to_vec();
        let data: Array1<f32> = matrix.iter().copied().collect();
        let grad = Array1::zeros(data.len());
        Self { name: name.into(), shape, data, grad }
    }

    /// Create a 1-D parameter
    pub fn from_vector(name: impl Into<String>, vector: Array1<f32>) -> Self {
        let shape = vec![vector.len()];
        let grad = Array1::zeros(vector.len());
        Self { name: name.into(), shape, data: vector, grad }
    }

    /// Parameter name (e.g. `classifier.weight`)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Logical shape
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the parameter has no elements
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat values
    pub fn data(&self) -> &Array1<f32> {
        &self.data
    }

    /// Mutable flat values
    pub fn data_mut(&mut self) -> &mut Array1<f32> {
        &mut self.data
    }

    /// Flat gradient
    pub fn grad(&self) -> &Array1<f32> {
        &self.grad
    }

    /// Mutable flat gradient
    pub fn grad_mut(&mut self) -> &mut Array1<f32> {
        &mut self.grad
    }

    /// Reset the gradient to zero
    pub fn zero_grad(&mut self) {
        self.grad.fill(0.0);
    }

    /// Whether AdamW should apply weight decay (biases and norms are exempt)
    pub fn applies_weight_decay(&self) -> bool {
        !(self.name.ends_with("bias") || self.name.contains("norm"))
    }

    /// Values viewed as a `[rows, cols]` matrix
    pub fn matrix(&self) -> ArrayView2<'_, f32> {
        let (rows, cols) = self.dims2();
        ArrayView2::from_shape((rows, cols), self.data.as_slice().expect("parameter storage is contiguous"))
            .expect("parameter shape matches storage")
    }

    /// Gradient viewed as a mutable `[rows, cols]` matrix
    pub fn grad_matrix_mut(&mut self) -> ArrayViewMut2<'_, f32> {
        let (rows, cols) = self.dims2();
        ArrayViewMut2::from_shape(
            (rows, cols),
            self.grad.as_slice_mut().expect("gradient storage is contiguous"),
        )
        .expect("parameter shape matches storage")
    }

    fn dims2(&self) -> (usize, usize) {
        match self.shape.as_slice() {
            [rows, cols] => (*rows, *cols),
            [n] => (1, *n),
            _ => (1, self.data.len()),
        }
    }
}
