use ndarray::{Array1, ArrayView1};

use crate::core::errors::AssistantError;

/// Dot product; the cosine similarity when both sides are unit vectors.
pub fn dot(query: &[f32], candidate: &[f32]) -> Result<f32, AssistantError> {
    check_dimensions(query, candidate)?;
    Ok(ArrayView1::from(query).dot(&ArrayView1::from(candidate)))
}

/// Scales `vector` to unit length. Zero vectors are returned unchanged.
pub fn normalize(vector: &[f32]) -> Vec<f32> {
    let view = ArrayView1::from(vector);
    let norm = l2_norm(view);
    if norm <= f32::EPSILON {
        return vector.to_vec();
    }
    let scaled: Array1<f32> = view.mapv(|v| v / norm);
    scaled.to_vec()
}

fn l2_norm(view: ArrayView1<'_, f32>) -> f32 {
    view.dot(&view).sqrt()
}

fn check_dimensions(query: &[f32], candidate: &[f32]) -> Result<(), AssistantError> {
    if query.is_empty() || candidate.is_empty() {
        return Err(AssistantError::Config("Vectors must not be empty".to_string()));
    }
    if query.len() != candidate.len() {
        return Err(AssistantError::Config(format!(
            "Vector length mismatch: {} != {}",
            query.len(),
            candidate.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(left: f32, right: f32) -> bool {
        (left - right).abs() < 1e-5
    }

    #[test]
    fn normalized_identical_vectors_score_one() {
        let v = normalize(&[1.0, 2.0, 3.0, 4.0]);
        assert!(approx_eq(dot(&v, &v).unwrap(), 1.0));
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        let score = dot(&normalize(&[1.0, 0.0]), &normalize(&[0.0, 1.0])).unwrap();
        assert!(approx_eq(score, 0.0));
    }

    #[test]
    fn normalized_dot_is_scale_invariant() {
        let a = [3.0, 4.0, 0.5];
        let b = [1.0, -2.0, 7.0];
        let scaled = [30.0, 40.0, 5.0];
        let original = dot(&normalize(&a), &normalize(&b)).unwrap();
        let rescaled = dot(&normalize(&scaled), &normalize(&b)).unwrap();
        assert!(approx_eq(original, rescaled));
    }

    #[test]
    fn zero_vector_stays_zero() {
        assert_eq!(normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
        assert!(approx_eq(dot(&normalize(&[0.0, 0.0]), &[1.0, 1.0]).unwrap(), 0.0));
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        assert!(dot(&[1.0], &[1.0, 2.0]).is_err());
        assert!(dot(&[], &[]).is_err());
    }
}
