//! Numeric helpers shared by the model and the statistics code.

use nalgebra::{DMatrix, DVector};

/// Ridge added to the diagonal before inverting a covariance matrix
pub const COVARIANCE_RIDGE: f64 = 1e-6;

/// Tolerance for the pseudo-inverse fallback
const PSEUDO_INVERSE_EPS: f64 = 1e-10;

/// Logistic squashing into (0, 1)
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Median of the values; the mean of the two middle values for even counts.
/// Returns 0.0 for an empty slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Component-wise mean of equally sized points
pub fn mean_vector(points: &[Vec<f64>]) -> Vec<f64> {
    let width = points.first().map_or(0, |p| p.len());
    let mut mean = vec![0.0; width];
    if points.is_empty() {
        return mean;
    }

    for point in points {
        for (acc, value) in mean.iter_mut().zip(point) {
            *acc += value;
        }
    }
    for value in &mut mean {
        *value /= points.len() as f64;
    }
    mean
}

/// Unbiased sample covariance (n - 1 denominator).
///
/// A single point has no spread and yields the zero matrix.
pub fn covariance_matrix(points: &[Vec<f64>], mean: &[f64]) -> DMatrix<f64> {
    let width = mean.len();
    let mut covariance = DMatrix::zeros(width, width);
    if points.len() < 2 {
        return covariance;
    }

    for point in points {
        for i in 0..width {
            let di = point[i] - mean[i];
            for j in i..width {
                covariance[(i, j)] += di * (point[j] - mean[j]);
            }
        }
    }

    let denominator = (points.len() - 1) as f64;
    for i in 0..width {
        for j in i..width {
            let value = covariance[(i, j)] / denominator;
            covariance[(i, j)] = value;
            covariance[(j, i)] = value;
        }
    }
    covariance
}

/// Inverse used by the Mahalanobis distance.
///
/// Tries `(cov + ridge * I)^-1`, then the pseudo-inverse, then falls back
/// to the identity, which degrades the distance to Euclidean.
pub fn regularized_inverse(covariance: &DMatrix<f64>) -> DMatrix<f64> {
    let n = covariance.nrows();
    let identity = DMatrix::identity(n, n);

    if covariance.iter().any(|v| !v.is_finite()) {
        return identity;
    }

    let ridged = covariance + &identity * COVARIANCE_RIDGE;
    if let Some(inverse) = ridged.clone().try_inverse() {
        if inverse.iter().all(|v| v.is_finite()) {
            return inverse;
        }
    }

    match ridged.pseudo_inverse(PSEUDO_INVERSE_EPS) {
        Ok(inverse) if inverse.iter().all(|v| v.is_finite()) => inverse,
        _ => {
            log::debug!("covariance of size {} not invertible, using identity", n);
            identity
        }
    }
}

/// Mahalanobis distance given a precomputed inverse covariance.
///
/// Non-finite inputs give `f64::INFINITY` so the point never wins a
/// nearest-centroid comparison.
pub fn mahalanobis_distance(point: &[f64], mean: &[f64], inverse_covariance: &DMatrix<f64>) -> f64 {
    let diff = DVector::from_iterator(
        point.len(),
        point.iter().zip(mean).map(|(p, m)| p - m),
    );
    let squared = diff.dot(&(inverse_covariance * &diff));

    if squared.is_finite() {
        squared.max(0.0).sqrt()
    } else {
        f64::INFINITY
    }
}

pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}
