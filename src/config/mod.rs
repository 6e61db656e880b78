//! Typed runtime configuration
//!
//! Everything is read from the environment once at startup and validated
//! against declared ranges. The pipeline only ever sees typed fields;
//! per-symbol overrides (`EMA_FAST_EURUSD=10`) fall back to the global
//! default when absent.

use std::collections::HashMap;

use crate::error::{AgentError, Result};
use crate::execution::RetryPolicy;

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

/// Normalized per-symbol key: `AUDUSD-ECNc` -> `AUDUSD`, `US500.cash` -> `US500_CASH`
fn base_key(symbol: &str) -> String {
    symbol
        .split('-')
        .next()
        .unwrap_or(symbol)
        .replace('.', "_")
        .to_uppercase()
}

fn per_symbol<T: std::str::FromStr + Copy>(key: &str, symbol: &str, default: T) -> T {
    let scoped = format!("{}_{}", key, base_key(symbol));
    env_parse(&scoped, env_parse(key, default))
}

/// Indicator periods and thresholds for one symbol
#[derive(Debug, Clone)]
pub struct SymbolParams {
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub rsi_period: usize,
    pub atr_period: usize,
    pub rsi_long_th: f64,
    pub rsi_short_th: f64,
    /// Fixed stop-loss distance in price units; ATR-derived when absent
    pub sl_distance: Option<f64>,
    pub tp_distance: Option<f64>,
}

impl SymbolParams {
    pub fn from_env(symbol: &str) -> Self {
        let fixed = |key: &str| -> Option<f64> {
            let scoped = format!("{}_{}", key, base_key(symbol));
            std::env::var(scoped).ok().and_then(|v| v.parse().ok())
        };
        Self {
            ema_fast: per_symbol("EMA_FAST", symbol, 20),
            ema_slow: per_symbol("EMA_SLOW", symbol, 50),
            rsi_period: per_symbol("RSI_PERIOD", symbol, 14),
            atr_period: per_symbol("ATR_PERIOD", symbol, 14),
            rsi_long_th: per_symbol("RSI_LONG_TH", symbol, 55.0),
            rsi_short_th: per_symbol("RSI_SHORT_TH", symbol, 45.0),
            sl_distance: fixed("SL"),
            tp_distance: fixed("TP"),
        }
    }

    pub fn validate(&self, symbol: &str) -> Result<()> {
        if self.ema_fast == 0 || self.ema_slow <= self.ema_fast {
            return Err(AgentError::Config(format!(
                "{}: EMA periods invalid: fast={} slow={}",
                symbol, self.ema_fast, self.ema_slow
            )));
        }
        if self.rsi_period == 0 || self.atr_period == 0 {
            return Err(AgentError::Config(format!(
                "{}: indicator periods must be at least 1",
                symbol
            )));
        }
        if !(0.0..=100.0).contains(&self.rsi_long_th)
            || !(0.0..=100.0).contains(&self.rsi_short_th)
            || self.rsi_short_th > self.rsi_long_th
        {
            return Err(AgentError::Config(format!(
                "{}: RSI thresholds invalid: long={} short={}",
                symbol, self.rsi_long_th, self.rsi_short_th
            )));
        }
        for (name, d) in [("SL", self.sl_distance), ("TP", self.tp_distance)] {
            if let Some(v) = d {
                if v <= 0.0 {
                    return Err(AgentError::Config(format!(
                        "{}: fixed {} distance must be positive, got {}",
                        symbol, name, v
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for SymbolParams {
    fn default() -> Self {
        Self {
            ema_fast: 20,
            ema_slow: 50,
            rsi_period: 14,
            atr_period: 14,
            rsi_long_th: 55.0,
            rsi_short_th: 45.0,
            sl_distance: None,
            tp_distance: None,
        }
    }
}

/// Full agent configuration, populated once at startup
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub symbols: Vec<String>,
    /// Per-symbol params resolved from the environment at startup; the
    /// pipeline never reads the environment after construction
    pub symbol_params: HashMap<String, SymbolParams>,
    pub timeframe: String,
    pub history_bars: usize,

    // Decision gate
    pub min_confidence: f64,
    pub trust_weight: f64,
    pub trust_half_life_mins: i64,
    pub trust_learning_rate: f64,

    // Volatility damping
    pub atr_floor: f64,
    pub atr_ceiling: f64,
    pub vol_damp: f64,

    // Stop derivation
    pub atr_sl_mult: f64,
    pub atr_tp_mult: f64,
    /// Minimum stop distance as a fraction of price
    pub min_stop_frac: f64,

    // Guardrails
    pub max_open: usize,
    pub max_per_symbol: usize,
    pub cooldown_secs: i64,
    pub block_same_direction: bool,

    // Sizing
    pub min_lots: f64,
    pub max_lots: f64,

    pub retry: RetryPolicy,

    // Loop pacing
    pub cycle_interval_secs: u64,
    pub symbol_delay_ms: u64,
}

impl AgentConfig {
    pub fn from_env() -> Result<Self> {
        let symbols: Vec<String> = std::env::var("AGENT_SYMBOLS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let symbol_params = symbols
            .iter()
            .map(|s| (s.clone(), SymbolParams::from_env(s)))
            .collect();

        let cfg = Self {
            symbols,
            symbol_params,
            timeframe: std::env::var("TIMEFRAME").unwrap_or_else(|_| "M15".to_string()),
            history_bars: env_parse("HISTORY_BARS", 240),

            min_confidence: env_parse("AGENT_MIN_CONFIDENCE", 0.55),
            trust_weight: env_parse("TRUST_WEIGHT", 0.4),
            trust_half_life_mins: env_parse("TRUST_HALF_LIFE_MIN", 180),
            trust_learning_rate: env_parse("TRUST_LEARNING_RATE", 0.1),

            atr_floor: env_parse("ATR_FLOOR", 0.0010),
            atr_ceiling: env_parse("ATR_CEILING", 0.0150),
            vol_damp: env_parse("VOL_DAMP", 0.75),

            atr_sl_mult: env_parse("ATR_SL_MULT", 2.0),
            atr_tp_mult: env_parse("ATR_TP_MULT", 3.0),
            min_stop_frac: env_parse("MIN_STOP_FRAC", 0.0005),

            max_open: env_parse("AGENT_MAX_OPEN", 10),
            max_per_symbol: env_parse("AGENT_MAX_PER_SYMBOL", 3),
            cooldown_secs: env_parse("COOLDOWN_SEC", 180),
            block_same_direction: env_bool("BLOCK_SAME_DIRECTION", true),

            min_lots: env_parse("MIN_LOTS", 0.03),
            max_lots: env_parse("MAX_LOTS", 0.30),

            retry: RetryPolicy {
                widen_first: env_parse("STOP_WIDEN_MULT", 1.5),
                widen_retry: env_parse("STOP_WIDEN_RETRY_MULT", 2.0),
            },

            cycle_interval_secs: env_parse("CYCLE_INTERVAL_SEC", 60),
            symbol_delay_ms: env_parse("SYMBOL_BATCH_DELAY_MS", 2000),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Pure lookup into the startup-resolved map; unknown symbols get defaults
    pub fn params_for(&self, symbol: &str) -> SymbolParams {
        self.symbol_params
            .get(symbol)
            .cloned()
            .unwrap_or_default()
    }

    /// Replace the symbol list (CLI override) and re-resolve per-symbol params
    pub fn set_symbols(&mut self, symbols: Vec<String>) -> Result<()> {
        self.symbol_params = symbols
            .iter()
            .map(|s| (s.clone(), SymbolParams::from_env(s)))
            .collect();
        self.symbols = symbols;
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        fn in_unit(name: &str, v: f64) -> Result<()> {
            if !(0.0..=1.0).contains(&v) {
                return Err(AgentError::Config(format!(
                    "{} must be in [0,1], got {}",
                    name, v
                )));
            }
            Ok(())
        }
        in_unit("AGENT_MIN_CONFIDENCE", self.min_confidence)?;
        in_unit("TRUST_WEIGHT", self.trust_weight)?;
        in_unit("TRUST_LEARNING_RATE", self.trust_learning_rate)?;
        in_unit("VOL_DAMP", self.vol_damp)?;

        if self.min_lots <= 0.0 || self.max_lots < self.min_lots {
            return Err(AgentError::Config(format!(
                "lot bounds invalid: min={} max={}",
                self.min_lots, self.max_lots
            )));
        }
        if self.atr_ceiling <= self.atr_floor {
            return Err(AgentError::Config(format!(
                "ATR band invalid: floor={} ceiling={}",
                self.atr_floor, self.atr_ceiling
            )));
        }
        if self.retry.widen_retry < self.retry.widen_first {
            return Err(AgentError::Config(format!(
                "retry widen multiplier {} must be >= first widen {}",
                self.retry.widen_retry, self.retry.widen_first
            )));
        }
        if self.trust_half_life_mins <= 0 {
            return Err(AgentError::Config(
                "TRUST_HALF_LIFE_MIN must be positive".to_string(),
            ));
        }
        if self.max_open == 0 || self.max_per_symbol == 0 {
            return Err(AgentError::Config(
                "open-position caps must be at least 1".to_string(),
            ));
        }
        for (symbol, params) in &self.symbol_params {
            params.validate(symbol)?;
        }
        Ok(())
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            symbol_params: HashMap::new(),
            timeframe: "M15".to_string(),
            history_bars: 240,
            min_confidence: 0.55,
            trust_weight: 0.4,
            trust_half_life_mins: 180,
            trust_learning_rate: 0.1,
            atr_floor: 0.0010,
            atr_ceiling: 0.0150,
            vol_damp: 0.75,
            atr_sl_mult: 2.0,
            atr_tp_mult: 3.0,
            min_stop_frac: 0.0005,
            max_open: 10,
            max_per_symbol: 3,
            cooldown_secs: 180,
            block_same_direction: true,
            min_lots: 0.03,
            max_lots: 0.30,
            retry: RetryPolicy::default(),
            cycle_interval_secs: 60,
            symbol_delay_ms: 2000,
        }
    }
}
