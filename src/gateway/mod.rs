//! External collaborator contracts
//!
//! The pipeline core talks to a Market Data Provider, an Order Gateway and a
//! Status Sink through these traits. Real broker adapters live outside this
//! crate; the `sim` module provides in-memory stand-ins for paper trading and
//! tests.

pub mod sim;

use crate::error::Result;
use crate::models::{Candle, Side, StatusEvent};

/// Latest bid/ask for a symbol
#[derive(Debug, Clone, Copy)]
pub struct Tick {
    pub bid: f64,
    pub ask: f64,
}

/// Venue metadata needed to shape an order
#[derive(Debug, Clone, Copy)]
pub struct SymbolInfo {
    pub digits: u32,
    pub point: f64,
    pub volume_min: f64,
    pub volume_max: f64,
    pub volume_step: f64,
    /// Minimum stop distance, in points
    pub min_stop_points: f64,
}

impl Default for SymbolInfo {
    fn default() -> Self {
        Self {
            digits: 5,
            point: 0.00001,
            volume_min: 0.01,
            volume_max: 100.0,
            volume_step: 0.01,
            min_stop_points: 0.0,
        }
    }
}

/// An open position as reported by the gateway
#[derive(Debug, Clone)]
pub struct OpenPosition {
    pub symbol: String,
    pub side: Side,
    pub lots: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillPolicy {
    ImmediateOrCancel,
    FillOrKill,
}

#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub lots: f64,
    pub price: f64,
    pub sl: f64,
    pub tp: f64,
    pub fill_policy: FillPolicy,
}

/// Gateway response to a submission
#[derive(Debug, Clone)]
pub struct OrderAck {
    pub success: bool,
    pub code: i32,
    pub reference: Option<String>,
}

/// Returns OHLC history for a symbol; `Err(NoData)` means skip this cycle
pub trait MarketData {
    fn get_bars(&mut self, symbol: &str, timeframe: &str, count: usize) -> Result<Vec<Candle>>;
}

/// Order submission and venue metadata
pub trait OrderGateway {
    fn tick(&self, symbol: &str) -> Result<Tick>;
    fn symbol_info(&self, symbol: &str) -> Result<SymbolInfo>;
    /// Open positions restricted to the given symbols
    fn open_positions(&self, symbols: &[String]) -> Vec<OpenPosition>;
    fn submit_order(&mut self, request: &OrderRequest) -> Result<OrderAck>;
}

/// Fire-and-forget monitoring hook; must never fail the pipeline
pub trait StatusSink {
    fn post(&self, event: &StatusEvent);
}

/// Default sink: structured log line per event
pub struct LogSink;

impl StatusSink for LogSink {
    fn post(&self, event: &StatusEvent) {
        match serde_json::to_string(event) {
            Ok(json) => tracing::info!(target: "fxbot::status", "{}", json),
            Err(e) => tracing::debug!("status event not serializable: {}", e),
        }
    }
}
