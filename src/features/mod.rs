//! Feature extraction: OHLC bars in, indicator snapshot out. Stateless.

use chrono::{DateTime, Utc};

use crate::config::SymbolParams;
use crate::error::{AgentError, Result};
use crate::indicators::{calculate_atr_pct, calculate_ema, calculate_rsi};
use crate::models::{Candle, FeatureSnapshot};

/// Compute EMA fast/slow, RSI and ATR% for one symbol
///
/// Returns `NoData` when the series is too short for the slowest indicator.
pub fn compute(
    symbol: &str,
    bars: &[Candle],
    params: &SymbolParams,
    now: DateTime<Utc>,
) -> Result<FeatureSnapshot> {
    let needed = params
        .ema_slow
        .max(params.rsi_period + 1)
        .max(params.atr_period + 1);
    if bars.len() < needed {
        return Err(AgentError::no_data(
            symbol,
            format!("{} bars, need {}", bars.len(), needed),
        ));
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let price = closes
        .last()
        .copied()
        .ok_or_else(|| AgentError::no_data(symbol, "empty series"))?;

    let ema_fast = calculate_ema(&closes, params.ema_fast)
        .ok_or_else(|| AgentError::no_data(symbol, "ema_fast"))?;
    let ema_slow = calculate_ema(&closes, params.ema_slow)
        .ok_or_else(|| AgentError::no_data(symbol, "ema_slow"))?;
    let rsi = calculate_rsi(&closes, params.rsi_period)
        .ok_or_else(|| AgentError::no_data(symbol, "rsi"))?;
    let atr_pct = calculate_atr_pct(bars, params.atr_period)
        .ok_or_else(|| AgentError::no_data(symbol, "atr"))?;

    let snapshot = FeatureSnapshot {
        symbol: symbol.to_string(),
        price,
        ema_fast,
        ema_slow,
        ema_gap: ema_fast - ema_slow,
        rsi,
        atr_pct,
        timestamp: now,
    };

    tracing::debug!(
        symbol,
        price,
        ema_fast,
        ema_slow,
        rsi,
        atr_pct,
        "features computed"
    );
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ramp_bars(n: usize, start_price: f64, step: f64) -> Vec<Candle> {
        let t0 = Utc::now() - Duration::minutes(n as i64 * 15);
        (0..n)
            .map(|i| {
                let close = start_price + step * i as f64;
                Candle {
                    symbol: "EURUSD".to_string(),
                    timestamp: t0 + Duration::minutes(i as i64 * 15),
                    open: close - step,
                    high: close + step.abs(),
                    low: close - 2.0 * step.abs(),
                    close,
                }
            })
            .collect()
    }

    #[test]
    fn test_insufficient_bars_is_no_data() {
        let bars = ramp_bars(10, 1.10, 0.0001);
        let err = compute("EURUSD", &bars, &SymbolParams::default(), Utc::now()).unwrap_err();
        assert!(err.is_no_data());
    }

    #[test]
    fn test_uptrend_snapshot() {
        let bars = ramp_bars(120, 1.1000, 0.0005);
        let snap = compute("EURUSD", &bars, &SymbolParams::default(), Utc::now()).unwrap();
        assert!(snap.ema_fast > snap.ema_slow);
        assert!(snap.ema_gap > 0.0);
        assert!(snap.rsi > 70.0);
        assert!(snap.atr_pct > 0.0);
        assert_eq!(snap.price, bars.last().unwrap().close);
    }

    #[test]
    fn test_downtrend_gap_negative() {
        let bars = ramp_bars(120, 1.3000, -0.0005);
        let snap = compute("EURUSD", &bars, &SymbolParams::default(), Utc::now()).unwrap();
        assert!(snap.ema_gap < 0.0);
        assert!(snap.rsi < 30.0);
    }
}
