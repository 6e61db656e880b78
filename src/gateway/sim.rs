//! In-memory market data and order gateway for paper trading and tests
//!
//! The feed is a seeded random walk, reproducible per (seed, symbol). The
//! paper gateway fills orders unconditionally unless told to reject, which is
//! how the retry protocol is exercised without a broker.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use crate::error::{AgentError, Result};
use crate::gateway::{
    MarketData, OpenPosition, OrderAck, OrderGateway, OrderRequest, SymbolInfo, Tick,
};
use crate::models::Candle;

/// Seeded random-walk bar generator
pub struct SimFeed {
    seed: u64,
    base_price: f64,
    /// Per-bar drift as a fraction of price; positive trends up
    drift: f64,
    /// Per-bar noise amplitude as a fraction of price
    noise: f64,
    /// Symbols that should report no data (for skip-path tests)
    unavailable: Vec<String>,
}

impl SimFeed {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            base_price: 1.1000,
            drift: 0.0002,
            noise: 0.0008,
            unavailable: Vec::new(),
        }
    }

    pub fn with_drift(mut self, drift: f64) -> Self {
        self.drift = drift;
        self
    }

    pub fn with_base_price(mut self, price: f64) -> Self {
        self.base_price = price;
        self
    }

    pub fn mark_unavailable(&mut self, symbol: &str) {
        self.unavailable.push(symbol.to_string());
    }

    fn symbol_seed(&self, symbol: &str) -> u64 {
        // Stable per-symbol stream independent of call order
        symbol
            .bytes()
            .fold(self.seed, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64))
    }
}

impl MarketData for SimFeed {
    fn get_bars(&mut self, symbol: &str, _timeframe: &str, count: usize) -> Result<Vec<Candle>> {
        if self.unavailable.iter().any(|s| s == symbol) {
            return Err(AgentError::no_data(symbol, "feed unavailable"));
        }

        let mut rng = StdRng::seed_from_u64(self.symbol_seed(symbol));
        let start = Utc::now() - Duration::minutes(count as i64 * 15);
        let mut price = self.base_price;
        let mut bars = Vec::with_capacity(count);

        for i in 0..count {
            let open = price;
            let step = price * (self.drift + rng.gen_range(-self.noise..self.noise));
            let close = (open + step).max(open * 0.5);
            let wick = price * self.noise * rng.gen_range(0.2..1.0);
            bars.push(Candle {
                symbol: symbol.to_string(),
                timestamp: start + Duration::minutes(i as i64 * 15),
                open,
                high: open.max(close) + wick,
                low: open.min(close) - wick,
                close,
            });
            price = close;
        }
        Ok(bars)
    }
}

/// Paper order gateway with scriptable rejections
pub struct PaperGateway {
    infos: HashMap<String, SymbolInfo>,
    ticks: HashMap<String, Tick>,
    positions: Vec<OpenPosition>,
    /// Requests seen, in submission order
    pub submitted: Vec<OrderRequest>,
    /// Reject this many submissions before filling again
    reject_next: usize,
}

impl PaperGateway {
    pub fn new() -> Self {
        Self {
            infos: HashMap::new(),
            ticks: HashMap::new(),
            positions: Vec::new(),
            submitted: Vec::new(),
            reject_next: 0,
        }
    }

    pub fn set_tick(&mut self, symbol: &str, bid: f64, ask: f64) {
        self.ticks.insert(symbol.to_string(), Tick { bid, ask });
    }

    pub fn set_symbol_info(&mut self, symbol: &str, info: SymbolInfo) {
        self.infos.insert(symbol.to_string(), info);
    }

    /// Make the next `n` submissions come back rejected
    pub fn reject_next(&mut self, n: usize) {
        self.reject_next = n;
    }

    pub fn push_position(&mut self, symbol: &str, side: crate::models::Side, lots: f64) {
        self.positions.push(OpenPosition {
            symbol: symbol.to_string(),
            side,
            lots,
        });
    }
}

impl Default for PaperGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderGateway for PaperGateway {
    fn tick(&self, symbol: &str) -> Result<Tick> {
        self.ticks
            .get(symbol)
            .copied()
            .ok_or_else(|| AgentError::no_data(symbol, "no tick"))
    }

    fn symbol_info(&self, symbol: &str) -> Result<SymbolInfo> {
        Ok(self.infos.get(symbol).copied().unwrap_or_default())
    }

    fn open_positions(&self, symbols: &[String]) -> Vec<OpenPosition> {
        self.positions
            .iter()
            .filter(|p| symbols.is_empty() || symbols.contains(&p.symbol))
            .cloned()
            .collect()
    }

    fn submit_order(&mut self, request: &OrderRequest) -> Result<OrderAck> {
        self.submitted.push(request.clone());
        if self.reject_next > 0 {
            self.reject_next -= 1;
            return Ok(OrderAck {
                success: false,
                code: 10019, // venue "invalid stops" style rejection
                reference: None,
            });
        }
        self.positions.push(OpenPosition {
            symbol: request.symbol.clone(),
            side: request.side,
            lots: request.lots,
        });
        Ok(OrderAck {
            success: true,
            code: 0,
            reference: Some(Uuid::new_v4().to_string()),
        })
    }
}
