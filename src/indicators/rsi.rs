/// Relative Strength Index with Wilder smoothing
///
/// The first average gain/loss is a simple mean over the initial `period`
/// changes; subsequent changes are folded in with Wilder's recursive average.
/// Returns 100 when there are no losses in the window.
pub fn calculate_rsi(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() <= period {
        return None;
    }

    let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();

    let mut avg_gain = diffs[..period].iter().filter(|d| **d > 0.0).sum::<f64>() / period as f64;
    let mut avg_loss = diffs[..period]
        .iter()
        .filter(|d| **d < 0.0)
        .map(|d| -d)
        .sum::<f64>()
        / period as f64;

    for d in &diffs[period..] {
        let (gain, loss) = if *d > 0.0 { (*d, 0.0) } else { (0.0, -d) };
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
    }

    if avg_loss == 0.0 {
        return Some(100.0);
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_in_range() {
        let values = vec![
            44.0, 44.25, 44.5, 43.75, 44.0, 44.5, 45.0, 45.5, 45.25, 45.5, 46.0, 46.5, 46.25,
            46.0, 46.5,
        ];
        let rsi = calculate_rsi(&values, 14).unwrap();
        assert!(rsi > 0.0 && rsi < 100.0);
    }

    #[test]
    fn test_rsi_all_gains_is_100() {
        let values: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        assert_eq!(calculate_rsi(&values, 5), Some(100.0));
    }

    #[test]
    fn test_rsi_all_losses_is_low() {
        let values: Vec<f64> = (0..10).map(|i| 100.0 - i as f64).collect();
        let rsi = calculate_rsi(&values, 5).unwrap();
        assert!(rsi < 1.0);
    }

    #[test]
    fn test_rsi_insufficient_data() {
        assert!(calculate_rsi(&[100.0, 101.0, 99.0], 14).is_none());
    }

    #[test]
    fn test_rsi_balanced_series_near_50() {
        // Alternating equal up/down moves
        let values: Vec<f64> = (0..30)
            .map(|i| if i % 2 == 0 { 100.0 } else { 101.0 })
            .collect();
        let rsi = calculate_rsi(&values, 14).unwrap();
        assert!((rsi - 50.0).abs() < 10.0);
    }
}
