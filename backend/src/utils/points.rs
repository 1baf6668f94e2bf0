use crate::error::AppError;

/// Splits `total` points across `count` questions.
///
/// Every question but the last gets the even share truncated to two decimals;
/// the last one absorbs the remainder so the sum is exactly `total` (to the
/// cent). Works in integer hundredths to keep float drift out of the sum.
pub fn distribute_points(total: f64, count: usize) -> Result<Vec<f64>, AppError> {
    if count == 0 {
        return Err(AppError::BadRequest(
            "Question count must be greater than zero".to_string(),
        ));
    }
    if !total.is_finite() || total < 0.0 {
        return Err(AppError::BadRequest(format!(
            "Total points must be a non-negative number, got {}",
            total
        )));
    }

    let total_cents = (total * 100.0).round() as i64;
    let n = count as i64;
    let share = total_cents / n;
    let last = total_cents - share * (n - 1);

    let mut points = vec![share as f64 / 100.0; count];
    points[count - 1] = last as f64 / 100.0;
    Ok(points)
}

/// Rounds to two decimals, the precision scores are stored with.
pub fn round_points(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(points: &[f64]) -> f64 {
        points.iter().sum()
    }

    #[test]
    fn even_split_has_no_remainder() {
        let points = distribute_points(100.0, 4).unwrap();
        assert_eq!(points, vec![25.0, 25.0, 25.0, 25.0]);
    }

    #[test]
    fn last_item_absorbs_remainder() {
        let points = distribute_points(100.0, 3).unwrap();
        assert_eq!(points, vec![33.33, 33.33, 33.34]);
        assert!((sum(&points) - 100.0).abs() < 0.01);
    }

    #[test]
    fn single_question_gets_everything() {
        assert_eq!(distribute_points(7.5, 1).unwrap(), vec![7.5]);
    }

    #[test]
    fn sum_matches_total_across_inputs() {
        for total in [0.01, 1.0, 9.99, 10.0, 37.5, 100.0, 123.45, 1000.0] {
            for count in 1..=40 {
                let points = distribute_points(total, count).unwrap();
                assert_eq!(points.len(), count);
                assert!(
                    (sum(&points) - total).abs() < 0.01,
                    "total {} over {} questions summed to {}",
                    total,
                    count,
                    sum(&points)
                );
            }
        }
    }

    #[test]
    fn rejects_zero_count() {
        assert!(matches!(distribute_points(10.0, 0), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn rejects_negative_and_nan_totals() {
        assert!(distribute_points(-1.0, 3).is_err());
        assert!(distribute_points(f64::NAN, 3).is_err());
        assert!(distribute_points(f64::INFINITY, 3).is_err());
    }

    #[test]
    fn round_points_keeps_two_decimals() {
        assert_eq!(round_points(33.3349), 33.33);
        assert_eq!(round_points(66.666), 66.67);
    }
}
