use thiserror::Error;

/// Library-level error taxonomy
///
/// "No data" and "gateway failed" are distinct outcomes so the batch loop can
/// skip a symbol without penalty in one case and count an error in the other.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("no data for {symbol}: {detail}")]
    NoData { symbol: String, detail: String },

    #[error("gateway error: {0}")]
    Gateway(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl AgentError {
    pub fn no_data(symbol: &str, detail: impl Into<String>) -> Self {
        AgentError::NoData {
            symbol: symbol.to_string(),
            detail: detail.into(),
        }
    }

    /// True when the right response is to skip the symbol this cycle
    pub fn is_no_data(&self) -> bool {
        matches!(self, AgentError::NoData { .. })
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;
