//! Column arithmetic shared by both stages. Missing values are `None` and
//! propagate through every operation.

/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Computes the population standard deviation given a pre-computed mean.
/// Returns 0.0 for empty input.
pub fn stddev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

    variance.sqrt()
}

/// Rounds to one decimal place, ties to even (`12.25` becomes `12.2`).
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

/// `part / total * 100`, missing when `total` is zero.
pub fn percent_of(part: f64, total: f64) -> Option<f64> {
    if total == 0.0 {
        None
    } else {
        Some(part / total * 100.0)
    }
}

/// Features per unit area. Missing when the area is unknown or not positive.
pub fn density(count: usize, area: Option<f64>) -> Option<f64> {
    match area {
        Some(a) if a > 0.0 => Some(count as f64 / a),
        _ => None,
    }
}

/// Present, finite values of a column.
fn finite(values: &[Option<f64>]) -> impl Iterator<Item = f64> + '_ {
    values.iter().flatten().copied().filter(|v| v.is_finite())
}

pub fn column_max(values: &[Option<f64>]) -> Option<f64> {
    finite(values).reduce(f64::max)
}

pub fn column_min(values: &[Option<f64>]) -> Option<f64> {
    finite(values).reduce(f64::min)
}

/// Flips a "lower is better" column: each value becomes `max - value`,
/// so the former maximum scores 0 and ordering is reversed.
pub fn inverse(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let Some(max) = column_max(values) else {
        return vec![None; values.len()];
    };
    values
        .iter()
        .map(|v| v.filter(|x| x.is_finite()).map(|x| max - x))
        .collect()
}

/// Rescales a column to `[0, 1]`. A constant column maps to 0.
pub fn min_max_normalize(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let (Some(min), Some(max)) = (column_min(values), column_max(values)) else {
        return vec![None; values.len()];
    };
    let range = max - min;
    values
        .iter()
        .map(|v| {
            v.filter(|x| x.is_finite())
                .map(|x| if range == 0.0 { 0.0 } else { (x - min) / range })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_stddev() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(stddev(&[], 0.0), 0.0);
        assert_eq!(stddev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 5.0), 2.0);
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(33.349), 33.3);
        assert_eq!(round1(12.25), 12.2);
        assert_eq!(round1(0.75), 0.8);
        assert_eq!(round1(-0.25), -0.2);
        assert_eq!(round1(40.000000000000006), 40.0);
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(1.0, 4.0), Some(25.0));
        assert_eq!(percent_of(1.0, 0.0), None);
    }

    #[test]
    fn test_density_zero_count_is_zero() {
        assert_eq!(density(0, Some(3.5)), Some(0.0));
        assert_eq!(density(2, Some(1.0)), Some(2.0));
        assert_eq!(density(2, Some(0.0)), None);
        assert_eq!(density(2, None), None);
    }

    #[test]
    fn test_density_is_non_negative() {
        for count in 0..20 {
            for area in [0.01, 0.5, 1.0, 7.25] {
                assert!(density(count, Some(area)).unwrap() >= 0.0);
            }
        }
    }

    #[test]
    fn test_inverse_zero_exactly_at_max() {
        let values = vec![Some(3.0), Some(10.0), None, Some(0.5), Some(10.0)];
        let inv = inverse(&values);

        assert_eq!(inv, vec![Some(7.0), Some(0.0), None, Some(9.5), Some(0.0)]);
    }

    #[test]
    fn test_inverse_is_monotonically_decreasing() {
        let values: Vec<Option<f64>> = [0.2, 5.0, 1.0, 3.3, 9.9, 4.1]
            .into_iter()
            .map(Some)
            .collect();
        let inv = inverse(&values);

        for i in 0..values.len() {
            for j in 0..values.len() {
                if values[i] < values[j] {
                    assert!(inv[i] > inv[j]);
                }
            }
        }
    }

    #[test]
    fn test_inverse_ignores_non_finite() {
        let inv = inverse(&[Some(f64::INFINITY), Some(2.0), Some(1.0)]);
        assert_eq!(inv, vec![None, Some(0.0), Some(1.0)]);
        assert_eq!(inverse(&[None, None]), vec![None, None]);
    }

    #[test]
    fn test_min_max_normalize() {
        let norm = min_max_normalize(&[Some(2.0), Some(4.0), None, Some(3.0)]);
        assert_eq!(norm, vec![Some(0.0), Some(1.0), None, Some(0.5)]);

        let flat = min_max_normalize(&[Some(5.0), Some(5.0)]);
        assert_eq!(flat, vec![Some(0.0), Some(0.0)]);
    }
}
