//! Decision engine
//!
//! Pure, deterministic mapping from one feature snapshot to a directional
//! call. Regime comes from the EMA relationship, RSI confirms it, volatility
//! outside the configured band damps confidence, and the trust blend decides
//! whether the call clears the minimum-confidence gate.

use crate::config::{AgentConfig, SymbolParams};
use crate::models::{Decision, FeatureSnapshot, Side};
use crate::trust;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Regime {
    Bull,
    Bear,
    Neutral,
}

fn regime_of(snapshot: &FeatureSnapshot) -> Regime {
    if snapshot.ema_gap > 0.0 {
        Regime::Bull
    } else if snapshot.ema_gap < 0.0 {
        Regime::Bear
    } else {
        Regime::Neutral
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Raw signal confidence from RSI distance and ATR-normalized EMA gap
fn raw_confidence(snapshot: &FeatureSnapshot, reasons: &mut Vec<String>) -> f64 {
    let rsi_dist = (snapshot.rsi - 50.0) / 25.0;
    let rsi_conf = sigmoid(2.5 * rsi_dist);

    if snapshot.rsi >= 55.0 {
        reasons.push("rsi_confirms_bull".to_string());
    } else if snapshot.rsi <= 45.0 {
        reasons.push("rsi_confirms_bear".to_string());
    } else {
        reasons.push("rsi_neutral".to_string());
    }

    let sign = if snapshot.ema_gap > 0.0 {
        1.0
    } else if snapshot.ema_gap < 0.0 {
        -1.0
    } else {
        0.0
    };
    let magnitude = (snapshot.ema_gap.abs() / (snapshot.atr_pct * 2.0 + 1e-9)).min(1.0);
    let ema_conf = sigmoid(2.0 * sign * magnitude);

    (0.5 * rsi_conf + 0.5 * ema_conf).clamp(0.0, 1.0)
}

/// Evaluate one symbol for one cycle
///
/// `trust` is the store's current (already decayed) value for the symbol;
/// keeping the lookup outside makes this function pure.
pub fn decide(
    snapshot: &FeatureSnapshot,
    params: &SymbolParams,
    cfg: &AgentConfig,
    trust_level: f64,
) -> Decision {
    let mut reasons = Vec::new();
    let mut raw = raw_confidence(snapshot, &mut reasons);

    // Volatility band damping
    if snapshot.atr_pct < cfg.atr_floor {
        raw *= cfg.vol_damp;
        reasons.push("atr_quiet".to_string());
    } else if snapshot.atr_pct > cfg.atr_ceiling {
        raw *= cfg.vol_damp;
        reasons.push("atr_hot".to_string());
    }

    let side = match regime_of(snapshot) {
        Regime::Bull if snapshot.rsi >= params.rsi_long_th => {
            reasons.push("ema_rsi_bull".to_string());
            Some(Side::Long)
        }
        Regime::Bear if snapshot.rsi <= params.rsi_short_th => {
            reasons.push("ema_rsi_bear".to_string());
            Some(Side::Short)
        }
        _ => {
            reasons.push("mixed_or_neutral".to_string());
            None
        }
    };

    let adjusted = trust::blend(raw, trust_level, cfg.trust_weight);
    let accepted = side.is_some() && adjusted >= cfg.min_confidence;

    // Stop distances: fixed per-symbol config wins, otherwise ATR-derived;
    // both floored at the configured minimum fraction of price.
    let min_distance = snapshot.price * cfg.min_stop_frac;
    let atr_distance = snapshot.atr_pct * snapshot.price;
    let sl_distance = params
        .sl_distance
        .unwrap_or(atr_distance * cfg.atr_sl_mult)
        .max(min_distance);
    let tp_distance = params
        .tp_distance
        .unwrap_or(atr_distance * cfg.atr_tp_mult)
        .max(min_distance);

    Decision {
        symbol: snapshot.symbol.clone(),
        side,
        raw_confidence: trust::round_conf(raw),
        adjusted_confidence: adjusted,
        reasons,
        sl_distance,
        tp_distance,
        accepted,
    }
}
