//! Weight vector helpers.

/// Creates a weight vector by applying a function to each index.
///
/// # Examples
///
/// ```
/// use exion_policy::weights;
///
/// let weights = weights::from_fn(|i| 1.0 / (i as f32 + 1.0), 3);
/// assert_eq!(weights, vec![1.0, 0.5, 1.0 / 3.0]);
/// ```
pub fn from_fn<F>(mut f: F, len: usize) -> Vec<f32>
where
    F: FnMut(usize) -> f32,
{
    let mut values = Vec::with_capacity(len);
    for i in 0..len {
        values.push(f(i));
    }
    values
}

/// A zero-initialised weight vector.
#[must_use]
pub fn zeros(len: usize) -> Vec<f32> {
    from_fn(|_| 0.0, len)
}

/// Grows a weight vector to `len`, zero-initialising the new entries.
/// Existing weights keep their values and indices.
///
/// # Panics
///
/// Panics if `len` is smaller than the current length; feature vocabularies
/// only ever grow.
pub fn extend_zeros(weights: &mut Vec<f32>, len: usize) {
    assert!(len >= weights.len(), "weight vectors never shrink");
    weights.resize(len, 0.0);
}
