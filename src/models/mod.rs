use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLC price bar for a symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Trade direction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

/// Trade outcome fed back into the trust store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Loss,
}

/// Indicator snapshot for one symbol, computed fresh each cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSnapshot {
    pub symbol: String,
    pub price: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub ema_gap: f64,
    pub rsi: f64,
    pub atr_pct: f64,
    pub timestamp: DateTime<Utc>,
}

/// Directional call for one symbol in one cycle
///
/// `accepted` holds iff a side was resolved and the adjusted confidence
/// cleared the configured minimum. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub symbol: String,
    pub side: Option<Side>,
    pub raw_confidence: f64,
    pub adjusted_confidence: f64,
    pub reasons: Vec<String>,
    /// Stop-loss distance from entry, in price units
    pub sl_distance: f64,
    /// Take-profit distance from entry, in price units
    pub tp_distance: f64,
    pub accepted: bool,
}

/// Why the guardrail evaluator refused to open
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    GlobalCap,
    SymbolCap,
    Cooldown,
    SameDirection,
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockReason::GlobalCap => write!(f, "global_cap"),
            BlockReason::SymbolCap => write!(f, "symbol_cap"),
            BlockReason::Cooldown => write!(f, "cooldown"),
            BlockReason::SameDirection => write!(f, "same_direction"),
        }
    }
}

/// Why an execution attempt did not fill
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum FailReason {
    /// Blocked before any gateway call
    Guardrail(BlockReason),
    /// Tick or symbol metadata missing; not a trust penalty
    NoData,
    /// Both submission attempts rejected
    ExecutionFailed,
    /// Gateway errored mid-submission
    GatewayError,
}

/// Terminal result of one Order Executor call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub ok: bool,
    pub blocked: bool,
    /// Submission attempts actually made (0 when blocked or skipped)
    pub attempts: u8,
    pub reason: Option<FailReason>,
    pub broker_reference: Option<String>,
}

impl ExecutionResult {
    pub fn filled(attempts: u8, reference: Option<String>) -> Self {
        Self {
            ok: true,
            blocked: false,
            attempts,
            reason: None,
            broker_reference: reference,
        }
    }

    pub fn blocked(reason: BlockReason) -> Self {
        Self {
            ok: false,
            blocked: true,
            attempts: 0,
            reason: Some(FailReason::Guardrail(reason)),
            broker_reference: None,
        }
    }

    pub fn failed(attempts: u8, reason: FailReason) -> Self {
        Self {
            ok: false,
            blocked: false,
            attempts,
            reason: Some(reason),
            broker_reference: None,
        }
    }
}

/// Fire-and-forget monitoring event emitted after each stage
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StatusEvent {
    Decision {
        symbol: String,
        side: Option<Side>,
        confidence: f64,
        accepted: bool,
        reasons: Vec<String>,
    },
    Execution {
        symbol: String,
        side: Side,
        ok: bool,
        blocked: bool,
        attempts: u8,
        lots: f64,
    },
}
