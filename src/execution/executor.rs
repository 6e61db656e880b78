//! Order executor
//!
//! Submits an accepted decision through the Order Gateway with at most one
//! retry. Stops too close to price are widened before the first send; a
//! rejection widens them again and switches the fill policy. The executor is
//! the only writer of guardrail memory and the only caller of trust updates.

use chrono::{DateTime, Utc};

use crate::gateway::{FillPolicy, OrderGateway, OrderRequest, SymbolInfo, Tick};
use crate::guardrails::Guardrails;
use crate::models::{Decision, ExecutionResult, FailReason, Outcome, Side};
use crate::trust::TrustStore;

/// One retry policy shared by every symbol; attempts are capped at two.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Stop-widen multiplier applied before the first send when the venue
    /// minimum distance is violated
    pub widen_first: f64,
    /// Stop-widen multiplier for the retry; must be >= `widen_first`
    pub widen_retry: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            widen_first: 1.5,
            widen_retry: 2.0,
        }
    }
}

pub struct OrderExecutor {
    retry: RetryPolicy,
    /// Symbols this agent manages; scopes the open-position count
    managed: Vec<String>,
}

fn round_to_digits(price: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (price * factor).round() / factor
}

/// Absolute SL/TP prices from entry and distances, rounded to venue digits
fn build_stops(side: Side, price: f64, sl_distance: f64, tp_distance: f64, digits: u32) -> (f64, f64) {
    let (sl, tp) = match side {
        Side::Long => (price - sl_distance, price + tp_distance),
        Side::Short => (price + sl_distance, price - tp_distance),
    };
    (round_to_digits(sl, digits), round_to_digits(tp, digits))
}

impl OrderExecutor {
    pub fn new(retry: RetryPolicy, managed: Vec<String>) -> Self {
        Self { retry, managed }
    }

    /// Run the submission protocol for an accepted decision
    ///
    /// Guardrails are re-checked here as the last line of defense; the
    /// preview check in the batch loop is advisory. Never returns an error:
    /// gateway trouble becomes a failed `ExecutionResult`.
    pub fn execute(
        &self,
        decision: &Decision,
        lots: f64,
        gateway: &mut dyn OrderGateway,
        guards: &mut Guardrails,
        trust: &mut TrustStore,
        now: DateTime<Utc>,
    ) -> ExecutionResult {
        let symbol = decision.symbol.as_str();
        let side = match decision.side {
            Some(s) => s,
            None => {
                tracing::warn!(symbol, "executor called without a side");
                return ExecutionResult::failed(0, FailReason::ExecutionFailed);
            }
        };

        // Authoritative guardrail check
        let open = gateway.open_positions(&self.managed);
        if let Err(reason) = guards.can_open(symbol, side, &open, now) {
            tracing::info!(symbol, %side, %reason, "blocked by guardrail");
            return ExecutionResult::blocked(reason);
        }

        // Venue metadata; missing data skips without trust penalty
        let (tick, info): (Tick, SymbolInfo) =
            match (gateway.tick(symbol), gateway.symbol_info(symbol)) {
                (Ok(t), Ok(i)) => (t, i),
                _ => {
                    tracing::warn!(symbol, "no tick or symbol info, skipping");
                    return ExecutionResult::failed(0, FailReason::NoData);
                }
            };

        let price = round_to_digits(
            match side {
                Side::Long => tick.ask,
                Side::Short => tick.bid,
            },
            info.digits,
        );

        // Enforce venue minimum stop distance before the first send
        let mut sl_distance = decision.sl_distance;
        let mut tp_distance = decision.tp_distance;
        let min_distance = info.min_stop_points * info.point;
        if min_distance > 0.0 && (sl_distance < min_distance || tp_distance < min_distance) {
            sl_distance *= self.retry.widen_first;
            tp_distance *= self.retry.widen_first;
            tracing::info!(
                symbol,
                min_distance,
                sl_distance,
                tp_distance,
                "stops widened pre-send"
            );
        }

        let (sl, tp) = build_stops(side, price, sl_distance, tp_distance, info.digits);
        let first = OrderRequest {
            symbol: symbol.to_string(),
            side,
            lots,
            price,
            sl,
            tp,
            fill_policy: FillPolicy::ImmediateOrCancel,
        };

        tracing::info!(symbol, %side, lots, price, sl, tp, "submitting order");
        match gateway.submit_order(&first) {
            Ok(ack) if ack.success => {
                self.on_fill(symbol, side, trust, guards, now);
                return ExecutionResult::filled(1, ack.reference);
            }
            Ok(ack) => {
                tracing::warn!(symbol, code = ack.code, "order rejected, widening for retry");
            }
            Err(e) => {
                tracing::warn!(symbol, error = %e, "gateway error on first attempt, retrying");
            }
        }

        // Retry once: wider stops from the original distances, fallback fill
        let widen = self.retry.widen_retry.max(self.retry.widen_first);
        let (sl2, tp2) = build_stops(
            side,
            price,
            decision.sl_distance * widen,
            decision.tp_distance * widen,
            info.digits,
        );
        let second = OrderRequest {
            sl: sl2,
            tp: tp2,
            fill_policy: FillPolicy::FillOrKill,
            ..first
        };

        tracing::info!(symbol, %side, sl = sl2, tp = tp2, "retry with widened stops");
        match gateway.submit_order(&second) {
            Ok(ack) if ack.success => {
                self.on_fill(symbol, side, trust, guards, now);
                ExecutionResult::filled(2, ack.reference)
            }
            Ok(_) => {
                tracing::warn!(symbol, %side, "both attempts rejected");
                trust.update(symbol, Outcome::Loss, side, now);
                ExecutionResult::failed(2, FailReason::ExecutionFailed)
            }
            Err(e) => {
                tracing::error!(symbol, error = %e, "gateway error on retry");
                trust.update(symbol, Outcome::Loss, side, now);
                ExecutionResult::failed(2, FailReason::GatewayError)
            }
        }
    }

    fn on_fill(
        &self,
        symbol: &str,
        side: Side,
        trust: &mut TrustStore,
        guards: &mut Guardrails,
        now: DateTime<Utc>,
    ) {
        trust.update(symbol, Outcome::Win, side, now);
        guards.record_fill(symbol, side, now);
        tracing::info!(symbol, %side, "order filled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::sim::PaperGateway;
    use crate::guardrails::GuardrailConfig;
    use crate::models::BlockReason;
    use chrono::Duration;

    fn decision(symbol: &str, side: Side) -> Decision {
        Decision {
            symbol: symbol.to_string(),
            side: Some(side),
            raw_confidence: 0.68,
            adjusted_confidence: 0.61,
            reasons: vec!["ema_rsi_bull".to_string()],
            sl_distance: 0.0040,
            tp_distance: 0.0060,
            accepted: true,
        }
    }

    fn harness() -> (PaperGateway, Guardrails, TrustStore, OrderExecutor) {
        let mut gw = PaperGateway::new();
        gw.set_tick("EURUSD", 1.0998, 1.1000);
        let guards = Guardrails::new(GuardrailConfig {
            max_open: 10,
            max_per_symbol: 3,
            cooldown: Duration::seconds(180),
            block_same_direction: true,
        });
        let trust = TrustStore::new(180, 0.1);
        let exec = OrderExecutor::new(RetryPolicy::default(), vec!["EURUSD".to_string()]);
        (gw, guards, trust, exec)
    }

    #[test]
    fn test_first_attempt_fill() {
        let (mut gw, mut guards, mut trust, exec) = harness();
        let now = Utc::now();
        let r = exec.execute(&decision("EURUSD", Side::Long), 0.1, &mut gw, &mut guards, &mut trust, now);

        assert!(r.ok);
        assert_eq!(r.attempts, 1);
        assert!(r.broker_reference.is_some());
        assert_eq!(gw.submitted.len(), 1);
        assert_eq!(gw.submitted[0].fill_policy, FillPolicy::ImmediateOrCancel);
        // Win reported to the trust store
        assert!((trust.get("EURUSD", now) - 0.55).abs() < 1e-9);
    }

    #[test]
    fn test_fill_starts_cooldown() {
        let (mut gw, mut guards, mut trust, exec) = harness();
        let now = Utc::now();
        exec.execute(&decision("EURUSD", Side::Long), 0.1, &mut gw, &mut guards, &mut trust, now);

        let soon = now + Duration::seconds(10);
        assert_eq!(
            guards.can_open("EURUSD", Side::Short, &[], soon),
            Err(BlockReason::Cooldown)
        );
        let later = now + Duration::seconds(181);
        assert!(guards.can_open("EURUSD", Side::Short, &[], later).is_ok());
    }

    #[test]
    fn test_retry_widens_and_switches_fill_policy() {
        let (mut gw, mut guards, mut trust, exec) = harness();
        gw.reject_next(1);
        let d = decision("EURUSD", Side::Long);
        let r = exec.execute(&d, 0.1, &mut gw, &mut guards, &mut trust, Utc::now());

        assert!(r.ok);
        assert_eq!(r.attempts, 2);
        assert_eq!(gw.submitted.len(), 2);

        let (a, b) = (&gw.submitted[0], &gw.submitted[1]);
        assert_eq!(b.fill_policy, FillPolicy::FillOrKill);
        // Retry stops are strictly wider than the first attempt's
        assert!((b.price - b.sl) > (a.price - a.sl));
        assert!((b.tp - b.price) > (a.tp - a.price));
    }

    #[test]
    fn test_double_rejection_fails_with_ceiling_of_two() {
        let (mut gw, mut guards, mut trust, exec) = harness();
        gw.reject_next(5);
        let now = Utc::now();
        let r = exec.execute(&decision("EURUSD", Side::Long), 0.1, &mut gw, &mut guards, &mut trust, now);

        assert!(!r.ok);
        assert!(!r.blocked);
        assert_eq!(r.attempts, 2);
        assert_eq!(r.reason, Some(FailReason::ExecutionFailed));
        // Never more than two submissions per call
        assert_eq!(gw.submitted.len(), 2);
        // Loss penalizes trust
        assert!((trust.get("EURUSD", now) - 0.45).abs() < 1e-9);
    }

    #[test]
    fn test_guardrail_block_skips_gateway() {
        let (mut gw, mut guards, mut trust, exec) = harness();
        for _ in 0..10 {
            gw.push_position("EURUSD", Side::Long, 0.1);
        }
        let now = Utc::now();
        let r = exec.execute(&decision("EURUSD", Side::Long), 0.1, &mut gw, &mut guards, &mut trust, now);

        assert!(r.blocked);
        assert_eq!(r.attempts, 0);
        assert_eq!(r.reason, Some(FailReason::Guardrail(BlockReason::GlobalCap)));
        assert!(gw.submitted.is_empty());
        // No trust movement on a block
        assert_eq!(trust.get("EURUSD", now), 0.5);
    }

    #[test]
    fn test_missing_tick_is_no_data_without_penalty() {
        let (_, mut guards, mut trust, exec) = harness();
        let mut gw = PaperGateway::new(); // no tick registered
        let now = Utc::now();
        let r = exec.execute(&decision("EURUSD", Side::Long), 0.1, &mut gw, &mut guards, &mut trust, now);

        assert!(!r.ok);
        assert_eq!(r.reason, Some(FailReason::NoData));
        assert_eq!(r.attempts, 0);
        assert_eq!(trust.get("EURUSD", now), 0.5);
    }

    #[test]
    fn test_min_stop_distance_widens_before_first_send() {
        let (mut gw, mut guards, mut trust, exec) = harness();
        // Venue demands 100 points * 0.0001 = 0.0100, wider than the 0.0040 SL
        gw.set_symbol_info(
            "EURUSD",
            SymbolInfo {
                digits: 5,
                point: 0.0001,
                min_stop_points: 100.0,
                ..Default::default()
            },
        );
        let d = decision("EURUSD", Side::Long);
        let r = exec.execute(&d, 0.1, &mut gw, &mut guards, &mut trust, Utc::now());

        assert!(r.ok);
        let sent = &gw.submitted[0];
        let sl_dist = sent.price - sent.sl;
        assert!((sl_dist - d.sl_distance * 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_short_side_stop_orientation() {
        let (mut gw, mut guards, mut trust, exec) = harness();
        let d = decision("EURUSD", Side::Short);
        let r = exec.execute(&d, 0.1, &mut gw, &mut guards, &mut trust, Utc::now());

        assert!(r.ok);
        let sent = &gw.submitted[0];
        assert!(sent.sl > sent.price);
        assert!(sent.tp < sent.price);
        // Short enters at the bid
        assert!((sent.price - 1.0998).abs() < 1e-9);
    }

    #[test]
    fn test_prices_rounded_to_venue_digits() {
        let (mut gw, mut guards, mut trust, exec) = harness();
        gw.set_tick("EURUSD", 1.099871, 1.100013);
        gw.set_symbol_info(
            "EURUSD",
            SymbolInfo {
                digits: 4,
                point: 0.0001,
                ..Default::default()
            },
        );
        let r = exec.execute(&decision("EURUSD", Side::Long), 0.1, &mut gw, &mut guards, &mut trust, Utc::now());
        assert!(r.ok);
        let sent = &gw.submitted[0];
        for v in [sent.price, sent.sl, sent.tp] {
            assert!(((v * 10_000.0).round() / 10_000.0 - v).abs() < 1e-12);
        }
    }
}
