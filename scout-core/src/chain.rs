use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which explorer API a chain is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiStyle {
    /// blockchain.info `balance?active=a|b|c`, keyed by address.
    BalanceByList,
    /// etherscan-style `balancemulti`, needs an API key.
    MultiBalance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    #[serde(alias = "bitcoin")]
    Btc,
    #[serde(alias = "ethereum")]
    Eth,
    #[serde(alias = "binance")]
    Bsc,
}

impl Chain {
    pub const ALL: [Chain; 3] = [Chain::Btc, Chain::Eth, Chain::Bsc];

    pub fn name(&self) -> &'static str {
        match self {
            Chain::Btc => "btc",
            Chain::Eth => "eth",
            Chain::Bsc => "bsc",
        }
    }

    pub fn api_style(&self) -> ApiStyle {
        match self {
            Chain::Btc => ApiStyle::BalanceByList,
            Chain::Eth | Chain::Bsc => ApiStyle::MultiBalance,
        }
    }

    /// Largest batch the explorer accepts in one request.
    pub fn max_batch_size(&self) -> usize {
        match self.api_style() {
            ApiStyle::BalanceByList => 128,
            ApiStyle::MultiBalance => 20,
        }
    }

    pub fn requires_credential(&self) -> bool {
        self.api_style() == ApiStyle::MultiBalance
    }

    /// Per-client requests per minute when the config does not override it.
    pub fn default_rate_per_minute(&self) -> u32 {
        match self {
            Chain::Btc => 50,
            Chain::Eth => 270,
            Chain::Bsc => 290,
        }
    }

    pub fn default_output_file(&self) -> String {
        format!("{}_output.txt", self.name())
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "btc" | "bitcoin" => Ok(Chain::Btc),
            "eth" | "ethereum" => Ok(Chain::Eth),
            "bsc" | "binance" => Ok(Chain::Bsc),
            other => Err(format!("unsupported chain '{other}'")),
        }
    }
}
