//! Dynamic position sizing
//!
//! Confidence and trust blend into a scale in [0,1] which interpolates the
//! configured lot bounds. High volatility damps the scale, quiet markets get
//! a mild boost. The venue clamp snaps to the reported volume step last.

use crate::gateway::SymbolInfo;

#[derive(Debug, Clone)]
pub struct LotScaler {
    pub min_lots: f64,
    pub max_lots: f64,
    pub atr_floor: f64,
    pub atr_ceiling: f64,
}

impl LotScaler {
    /// Lots before venue constraints
    ///
    /// trust_weight = 0.5 + (trust - 0.5) * 1.2
    /// scale = clamp(0.7 * confidence + 0.3 * trust_weight)
    pub fn compute(&self, confidence: f64, trust: f64, atr_pct: f64) -> f64 {
        let trust_weight = 0.5 + (trust - 0.5) * 1.2;
        let mut scale = (0.7 * confidence + 0.3 * trust_weight).clamp(0.0, 1.0);

        if atr_pct > self.atr_ceiling {
            scale *= 0.7;
        } else if atr_pct < self.atr_floor {
            scale *= 1.1;
        }
        scale = scale.clamp(0.0, 1.0);

        self.min_lots + (self.max_lots - self.min_lots) * scale
    }

    /// Snap to the venue volume step, then re-clamp to venue bounds
    pub fn clamp_to_venue(&self, lots: f64, info: &SymbolInfo) -> f64 {
        let step = if info.volume_step > 0.0 {
            info.volume_step
        } else {
            0.01
        };
        let snapped = (lots / step).round() * step;
        // Step rounding drags in float dust; trim it before clamping
        let snapped = (snapped * 1e8).round() / 1e8;
        snapped.clamp(info.volume_min, info.volume_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scaler() -> LotScaler {
        LotScaler {
            min_lots: 0.03,
            max_lots: 0.30,
            atr_floor: 0.0010,
            atr_ceiling: 0.0150,
        }
    }

    fn info(step: f64) -> SymbolInfo {
        SymbolInfo {
            volume_min: 0.01,
            volume_max: 1.0,
            volume_step: step,
            ..Default::default()
        }
    }

    #[test]
    fn test_lots_within_bounds_for_all_inputs() {
        let s = scaler();
        for conf in [0.0, 0.25, 0.5, 0.75, 1.0] {
            for trust in [0.0, 0.25, 0.5, 0.75, 1.0] {
                let lots = s.compute(conf, trust, 0.002);
                assert!(lots >= s.min_lots - 1e-9 && lots <= s.max_lots + 1e-9);
            }
        }
    }

    #[test]
    fn test_neutral_inputs_land_midrange() {
        let s = scaler();
        // conf=0.5, trust=0.5 -> scale = 0.7*0.5 + 0.3*0.5 = 0.5
        let lots = s.compute(0.5, 0.5, 0.002);
        let expected = 0.03 + (0.30 - 0.03) * 0.5;
        assert!((lots - expected).abs() < 1e-9);
    }

    #[test]
    fn test_high_volatility_damps_size() {
        let s = scaler();
        let calm = s.compute(0.8, 0.6, 0.002);
        let wild = s.compute(0.8, 0.6, 0.02);
        assert!(wild < calm);
    }

    #[test]
    fn test_quiet_market_boosts_size() {
        let s = scaler();
        let normal = s.compute(0.6, 0.5, 0.002);
        let quiet = s.compute(0.6, 0.5, 0.0005);
        assert!(quiet > normal);
    }

    #[test]
    fn test_venue_snap_is_step_multiple() {
        let s = scaler();
        let snapped = s.clamp_to_venue(0.1234, &info(0.01));
        let steps = snapped / 0.01;
        assert!((steps - steps.round()).abs() < 1e-6);
        assert!((snapped - 0.12).abs() < 1e-9);
    }

    #[test]
    fn test_venue_clamp_after_snap() {
        let s = scaler();
        assert_eq!(s.clamp_to_venue(5.0, &info(0.01)), 1.0);
        assert_eq!(s.clamp_to_venue(0.001, &info(0.01)), 0.01);
    }

    #[test]
    fn test_full_size_path_respects_step() {
        let s = scaler();
        let venue = info(0.05);
        for conf in [0.1, 0.37, 0.62, 0.99] {
            let lots = s.clamp_to_venue(s.compute(conf, 0.7, 0.003), &venue);
            let steps = lots / 0.05;
            assert!((steps - steps.round()).abs() < 1e-6, "lots={}", lots);
        }
    }
}
