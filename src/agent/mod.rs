//! Per-cycle batch loop
//!
//! One pass walks the configured symbols in order with a fixed delay between
//! them, runs feature extraction, decision, guardrail preview, sizing and
//! execution, and isolates every per-symbol failure so the cycle always
//! completes. State that outlives a cycle (trust, guardrail memory) lives on
//! the agent.

use chrono::Utc;
use tokio::time::{sleep, Duration};

use crate::config::AgentConfig;
use crate::decision;
use crate::error::{AgentError, Result};
use crate::execution::OrderExecutor;
use crate::features;
use crate::gateway::{MarketData, OrderGateway, StatusSink};
use crate::guardrails::{GuardrailConfig, Guardrails};
use crate::models::{FailReason, StatusEvent};
use crate::sizing::LotScaler;
use crate::trust::TrustStore;

/// Aggregate counts reported at the end of every cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub executed: u32,
    pub skipped: u32,
    pub blocked: u32,
    pub errors: u32,
}

enum SymbolOutcome {
    Executed,
    Skipped,
    Blocked,
    Failed,
}

pub struct Agent<M, G, S> {
    cfg: AgentConfig,
    feed: M,
    gateway: G,
    sink: S,
    trust: TrustStore,
    guards: Guardrails,
    executor: OrderExecutor,
    scaler: LotScaler,
}

impl<M: MarketData, G: OrderGateway, S: StatusSink> Agent<M, G, S> {
    pub fn new(cfg: AgentConfig, feed: M, gateway: G, sink: S) -> Self {
        let trust = TrustStore::new(cfg.trust_half_life_mins, cfg.trust_learning_rate);
        let guards = Guardrails::new(GuardrailConfig {
            max_open: cfg.max_open,
            max_per_symbol: cfg.max_per_symbol,
            cooldown: chrono::Duration::seconds(cfg.cooldown_secs),
            block_same_direction: cfg.block_same_direction,
        });
        let executor = OrderExecutor::new(cfg.retry, cfg.symbols.clone());
        let scaler = LotScaler {
            min_lots: cfg.min_lots,
            max_lots: cfg.max_lots,
            atr_floor: cfg.atr_floor,
            atr_ceiling: cfg.atr_ceiling,
        };
        Self {
            cfg,
            feed,
            gateway,
            sink,
            trust,
            guards,
            executor,
            scaler,
        }
    }

    /// One pass over all configured symbols
    pub async fn run_once(&mut self) -> CycleSummary {
        let symbols = self.cfg.symbols.clone();
        tracing::info!(count = symbols.len(), "cycle start");
        let mut summary = CycleSummary::default();

        for (i, symbol) in symbols.iter().enumerate() {
            match self.process_symbol(symbol) {
                Ok(SymbolOutcome::Executed) => summary.executed += 1,
                Ok(SymbolOutcome::Skipped) => summary.skipped += 1,
                Ok(SymbolOutcome::Blocked) => summary.blocked += 1,
                Ok(SymbolOutcome::Failed) => summary.errors += 1,
                Err(e) if e.is_no_data() => {
                    tracing::warn!(symbol = %symbol, "skipped: {}", e);
                    summary.skipped += 1;
                }
                Err(e) => {
                    tracing::error!(symbol = %symbol, "symbol cycle failed: {}", e);
                    summary.errors += 1;
                }
            }

            // Venue rate-limit pacing between symbols
            if self.cfg.symbol_delay_ms > 0 && i + 1 < symbols.len() {
                sleep(Duration::from_millis(self.cfg.symbol_delay_ms)).await;
            }
        }

        tracing::info!(
            executed = summary.executed,
            skipped = summary.skipped,
            blocked = summary.blocked,
            errors = summary.errors,
            "cycle complete"
        );
        summary
    }

    /// Continuous loop; interruption happens between cycles in the caller
    pub async fn run_forever(&mut self) {
        let interval = Duration::from_secs(self.cfg.cycle_interval_secs);
        loop {
            self.run_once().await;
            sleep(interval).await;
        }
    }

    fn process_symbol(&mut self, symbol: &str) -> Result<SymbolOutcome> {
        let now = Utc::now();
        let bars = self
            .feed
            .get_bars(symbol, &self.cfg.timeframe, self.cfg.history_bars)?;
        let params = self.cfg.params_for(symbol);
        let snapshot = features::compute(symbol, &bars, &params, now)?;

        let trust_level = self.trust.get(symbol, now);
        let decision = decision::decide(&snapshot, &params, &self.cfg, trust_level);

        self.sink.post(&StatusEvent::Decision {
            symbol: symbol.to_string(),
            side: decision.side,
            confidence: decision.adjusted_confidence,
            accepted: decision.accepted,
            reasons: decision.reasons.clone(),
        });

        let side = match decision.side {
            Some(s) if decision.accepted => s,
            _ => {
                tracing::info!(
                    symbol,
                    confidence = decision.adjusted_confidence,
                    reasons = ?decision.reasons,
                    "no trade"
                );
                return Ok(SymbolOutcome::Skipped);
            }
        };

        // Advisory preview; the executor re-checks authoritatively
        let open = self.gateway.open_positions(&self.cfg.symbols);
        if let Err(reason) = self.guards.can_open(symbol, side, &open, now) {
            tracing::info!(symbol, %side, %reason, "guardrail preview block");
            return Ok(SymbolOutcome::Blocked);
        }

        let info = self
            .gateway
            .symbol_info(symbol)
            .map_err(|_| AgentError::no_data(symbol, "symbol info"))?;
        let lots = self
            .scaler
            .clamp_to_venue(
                self.scaler
                    .compute(decision.adjusted_confidence, trust_level, snapshot.atr_pct),
                &info,
            );

        let result = self.executor.execute(
            &decision,
            lots,
            &mut self.gateway,
            &mut self.guards,
            &mut self.trust,
            now,
        );

        self.sink.post(&StatusEvent::Execution {
            symbol: symbol.to_string(),
            side,
            ok: result.ok,
            blocked: result.blocked,
            attempts: result.attempts,
            lots,
        });

        if result.ok {
            Ok(SymbolOutcome::Executed)
        } else if result.blocked {
            Ok(SymbolOutcome::Blocked)
        } else if result.reason == Some(FailReason::NoData) {
            Ok(SymbolOutcome::Skipped)
        } else {
            Ok(SymbolOutcome::Failed)
        }
    }

    /// Trust snapshot for diagnostics
    pub fn trust_store(&self) -> &TrustStore {
        &self.trust
    }
}
