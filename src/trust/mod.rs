//! Per-symbol trust memory
//!
//! Trust is a reliability estimate in [0,1], neutral at 0.5. Reads apply an
//! exponential half-life decay toward neutral; trade outcomes move it with a
//! learning-rate step. One store instance is threaded through the pipeline
//! rather than living in module globals, so tests get isolated state.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Outcome, Side};

/// Snapshot of one symbol's trust memory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustRecord {
    pub trust: f64,
    pub last_update: DateTime<Utc>,
    pub last_side: Option<Side>,
    /// Consecutive wins on the same side
    pub streak: u32,
}

#[derive(Debug)]
pub struct TrustStore {
    records: HashMap<String, TrustRecord>,
    half_life: Duration,
    learning_rate: f64,
}

fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

/// Round to 2 decimals so threshold comparisons don't flap at the boundary
pub fn round_conf(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Convex combination of raw confidence and trust, clamped and rounded
pub fn blend(raw_confidence: f64, trust: f64, trust_weight: f64) -> f64 {
    let adj = (1.0 - trust_weight) * raw_confidence + trust_weight * trust;
    round_conf(clamp01(adj))
}

impl TrustStore {
    pub fn new(half_life_mins: i64, learning_rate: f64) -> Self {
        Self {
            records: HashMap::new(),
            half_life: Duration::minutes(half_life_mins),
            learning_rate,
        }
    }

    /// Current trust for a symbol after lazy decay toward 0.5
    ///
    /// Unknown symbols read as neutral; that is not an error.
    pub fn get(&mut self, symbol: &str, now: DateTime<Utc>) -> f64 {
        let half_life = self.half_life;
        let rec = self.record_mut(symbol, now);
        let elapsed = (now - rec.last_update).num_seconds().max(0) as f64;
        let hl = half_life.num_seconds() as f64;
        if elapsed > 0.0 && hl > 0.0 {
            let k = 0.5_f64.powf(elapsed / hl);
            rec.trust = clamp01(0.5 + (rec.trust - 0.5) * k);
            rec.last_update = now;
        }
        rec.trust
    }

    /// Apply a trade outcome and return the new trust level
    ///
    /// Win:  t + lr * (1 - t)
    /// Loss: t - lr * t
    pub fn update(&mut self, symbol: &str, outcome: Outcome, side: Side, now: DateTime<Utc>) -> f64 {
        let current = self.get(symbol, now);
        let lr = self.learning_rate;
        let next = match outcome {
            Outcome::Win => current + lr * (1.0 - current),
            Outcome::Loss => current - lr * current,
        };
        let rec = self.record_mut(symbol, now);
        rec.trust = clamp01(next);
        rec.last_update = now;
        match outcome {
            Outcome::Win if rec.last_side == Some(side) => rec.streak += 1,
            Outcome::Win => rec.streak = 1,
            Outcome::Loss => rec.streak = 0,
        }
        rec.last_side = Some(side);
        tracing::debug!(
            symbol,
            outcome = ?outcome,
            trust = rec.trust,
            streak = rec.streak,
            "trust updated"
        );
        rec.trust
    }

    /// Read-only view for diagnostics
    pub fn snapshot(&self) -> &HashMap<String, TrustRecord> {
        &self.records
    }

    fn record_mut(&mut self, symbol: &str, now: DateTime<Utc>) -> &mut TrustRecord {
        self.records
            .entry(symbol.to_string())
            .or_insert_with(|| TrustRecord {
                trust: 0.5,
                last_update: now,
                last_side: None,
                streak: 0,
            })
    }
}
