//! Pre-execution guardrails
//!
//! Checks run in a fixed order and short-circuit on the first failure:
//! global cap, per-symbol cap, cooldown, same-direction repeat. Evaluation is
//! side-effect free; `record_fill` is called only after a confirmed fill.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::gateway::OpenPosition;
use crate::models::{BlockReason, Side};

#[derive(Debug, Clone)]
pub struct GuardrailConfig {
    pub max_open: usize,
    pub max_per_symbol: usize,
    pub cooldown: Duration,
    pub block_same_direction: bool,
}

#[derive(Debug, Clone)]
struct SymbolMemory {
    last_trade_time: DateTime<Utc>,
    last_direction: Side,
}

#[derive(Debug)]
pub struct Guardrails {
    cfg: GuardrailConfig,
    memory: HashMap<String, SymbolMemory>,
}

impl Guardrails {
    pub fn new(cfg: GuardrailConfig) -> Self {
        Self {
            cfg,
            memory: HashMap::new(),
        }
    }

    /// May this symbol open in this direction right now?
    ///
    /// `open` must already be restricted to the symbols this agent manages;
    /// the gateway query does that filtering.
    pub fn can_open(
        &self,
        symbol: &str,
        side: Side,
        open: &[OpenPosition],
        now: DateTime<Utc>,
    ) -> Result<(), BlockReason> {
        let total = open.len();
        let per_symbol = open.iter().filter(|p| p.symbol == symbol).count();

        if total >= self.cfg.max_open {
            return Err(BlockReason::GlobalCap);
        }
        if per_symbol >= self.cfg.max_per_symbol {
            return Err(BlockReason::SymbolCap);
        }
        if let Some(mem) = self.memory.get(symbol) {
            if now - mem.last_trade_time < self.cfg.cooldown {
                return Err(BlockReason::Cooldown);
            }
            if self.cfg.block_same_direction && mem.last_direction == side {
                return Err(BlockReason::SameDirection);
            }
        }
        Ok(())
    }

    /// Record a confirmed fill; the only mutation path
    pub fn record_fill(&mut self, symbol: &str, side: Side, now: DateTime<Utc>) {
        self.memory.insert(
            symbol.to_string(),
            SymbolMemory {
                last_trade_time: now,
                last_direction: side,
            },
        );
    }
}
