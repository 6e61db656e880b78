//! End-to-end pipeline test over the sim gateway: bars in, orders out.

use std::sync::{Arc, Mutex};

use fxbot::agent::Agent;
use fxbot::config::AgentConfig;
use fxbot::error::Result;
use fxbot::gateway::sim::PaperGateway;
use fxbot::gateway::{MarketData, OrderGateway, StatusSink};
use fxbot::models::{Candle, Side, StatusEvent};

use chrono::{Duration, Utc};

/// Deterministic linear ramp; guarantees a bull regime with confirming RSI
struct RampFeed {
    start_price: f64,
    step: f64,
}

impl MarketData for RampFeed {
    fn get_bars(&mut self, symbol: &str, _timeframe: &str, count: usize) -> Result<Vec<Candle>> {
        let t0 = Utc::now() - Duration::minutes(count as i64 * 15);
        Ok((0..count)
            .map(|i| {
                let close = self.start_price + self.step * i as f64;
                Candle {
                    symbol: symbol.to_string(),
                    timestamp: t0 + Duration::minutes(i as i64 * 15),
                    open: close - self.step,
                    high: close + self.step,
                    low: close - 2.0 * self.step,
                    close,
                }
            })
            .collect())
    }
}

#[derive(Clone, Default)]
struct CaptureSink(Arc<Mutex<Vec<StatusEvent>>>);

impl StatusSink for CaptureSink {
    fn post(&self, event: &StatusEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

fn config() -> AgentConfig {
    AgentConfig {
        symbols: vec!["EURUSD".to_string()],
        symbol_delay_ms: 0,
        ..Default::default()
    }
}

fn uptrend_feed() -> RampFeed {
    RampFeed {
        start_price: 1.1000,
        step: 0.0005,
    }
}

fn paper_gateway() -> PaperGateway {
    let mut gw = PaperGateway::new();
    gw.set_tick("EURUSD", 1.2198, 1.2200);
    gw
}

#[tokio::test]
async fn test_uptrend_cycle_fills_long_order() {
    let _ = tracing_subscriber::fmt::try_init();

    let sink = CaptureSink::default();
    let mut agent = Agent::new(config(), uptrend_feed(), paper_gateway(), sink.clone());

    let summary = agent.run_once().await;
    assert_eq!(summary.executed, 1);
    assert_eq!(summary.errors, 0);

    let events = sink.0.lock().unwrap();
    assert_eq!(events.len(), 2);
    match &events[0] {
        StatusEvent::Decision {
            side,
            accepted,
            confidence,
            reasons,
            ..
        } => {
            assert_eq!(*side, Some(Side::Long));
            assert!(*accepted);
            assert!(*confidence >= 0.55);
            assert!(reasons.iter().any(|r| r == "ema_rsi_bull"));
        }
        other => panic!("expected decision event, got {:?}", other),
    }
    match &events[1] {
        StatusEvent::Execution {
            ok,
            attempts,
            lots,
            ..
        } => {
            assert!(*ok);
            assert_eq!(*attempts, 1);
            // Snapped to the default venue step
            let steps = lots / 0.01;
            assert!((steps - steps.round()).abs() < 1e-6);
        }
        other => panic!("expected execution event, got {:?}", other),
    }

    // The fill raised trust from neutral
    let record = &agent.trust_store().snapshot()["EURUSD"];
    assert!((record.trust - 0.55).abs() < 1e-9);
    assert_eq!(record.last_side, Some(Side::Long));
}

#[tokio::test]
async fn test_immediate_repeat_is_cooldown_blocked() {
    let mut agent = Agent::new(config(), uptrend_feed(), paper_gateway(), CaptureSink::default());

    assert_eq!(agent.run_once().await.executed, 1);

    let second = agent.run_once().await;
    assert_eq!(second.executed, 0);
    assert_eq!(second.blocked, 1);
}

#[tokio::test]
async fn test_rejection_recovers_on_widened_retry() {
    let sink = CaptureSink::default();
    let mut gw = paper_gateway();
    gw.reject_next(1);
    let mut agent = Agent::new(config(), uptrend_feed(), gw, sink.clone());

    let summary = agent.run_once().await;
    assert_eq!(summary.executed, 1);

    let events = sink.0.lock().unwrap();
    assert!(matches!(
        events[1],
        StatusEvent::Execution { ok: true, attempts: 2, .. }
    ));
}

#[tokio::test]
async fn test_double_rejection_counts_error_and_penalizes_trust() {
    let mut gw = paper_gateway();
    gw.reject_next(2);
    let mut agent = Agent::new(config(), uptrend_feed(), gw, CaptureSink::default());

    let summary = agent.run_once().await;
    assert_eq!(summary.executed, 0);
    assert_eq!(summary.errors, 1);

    let record = &agent.trust_store().snapshot()["EURUSD"];
    assert!((record.trust - 0.45).abs() < 1e-9);
}

#[tokio::test]
async fn test_flat_market_skips_without_orders() {
    let flat = RampFeed {
        start_price: 1.1000,
        step: 0.0,
    };
    let sink = CaptureSink::default();
    let mut agent = Agent::new(config(), flat, paper_gateway(), sink.clone());

    let summary = agent.run_once().await;
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.executed, 0);

    let events = sink.0.lock().unwrap();
    // Only the decision event fires; nothing reached the gateway
    assert_eq!(events.len(), 1);
    match &events[0] {
        StatusEvent::Decision { accepted, reasons, .. } => {
            assert!(!accepted);
            assert!(reasons.iter().any(|r| r == "mixed_or_neutral"));
        }
        other => panic!("expected decision event, got {:?}", other),
    }
}
