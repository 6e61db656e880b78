// Technical indicators: EMA/SMA, RSI, ATR
// All functions return None on insufficient data rather than erroring.

pub mod atr;
pub mod moving_average;
pub mod rsi;

pub use atr::{calculate_atr, calculate_atr_pct};
pub use moving_average::{calculate_ema, calculate_sma};
pub use rsi::calculate_rsi;
