//! Explorer response payloads and the "anything found?" rules.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-address entry of a blockchain.info balance lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListBalance {
    pub final_balance: u64,
    pub n_tx: u64,
    pub total_received: u64,
}

impl ListBalance {
    /// Funded now, or used at some point.
    pub fn is_positive(&self) -> bool {
        self.final_balance > 0 || self.n_tx > 0
    }
}

/// One row of an etherscan-style `balancemulti` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub account: String,
    /// Balance in the smallest unit as a decimal string; may exceed u64.
    pub balance: String,
}

impl AccountBalance {
    pub fn is_positive(&self) -> bool {
        is_nonzero_amount(&self.balance)
    }
}

/// Results of one successful check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckResult {
    List(HashMap<String, ListBalance>),
    Multi(Vec<AccountBalance>),
}

impl CheckResult {
    pub fn any_found(&self) -> bool {
        match self {
            CheckResult::List(entries) => entries.values().any(ListBalance::is_positive),
            CheckResult::Multi(accounts) => accounts.iter().any(AccountBalance::is_positive),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            CheckResult::List(entries) => entries.len(),
            CheckResult::Multi(accounts) => accounts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `balancemulti` envelope. `result` is only an account list when
/// `status == "1"`; on failure it is usually a message string.
#[derive(Debug, Deserialize)]
struct MultiEnvelope {
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: serde_json::Value,
}

pub(crate) const MULTI_SUCCESS_STATUS: &str = "1";

/// A decoded response that was not a hard decode failure.
#[derive(Debug)]
pub(crate) enum Decoded {
    Success(CheckResult),
    Rejected { status: String, message: String },
}

pub(crate) fn decode_balance_list(body: &str) -> Result<Decoded, String> {
    let entries: HashMap<String, ListBalance> =
        serde_json::from_str(body).map_err(|e| e.to_string())?;
    Ok(Decoded::Success(CheckResult::List(entries)))
}

pub(crate) fn decode_multi_balance(body: &str) -> Result<Decoded, String> {
    let envelope: MultiEnvelope = serde_json::from_str(body).map_err(|e| e.to_string())?;
    if envelope.status != MULTI_SUCCESS_STATUS {
        let message = match envelope.result {
            serde_json::Value::String(detail) if !detail.is_empty() => {
                format!("{}: {}", envelope.message, detail)
            }
            _ => envelope.message,
        };
        return Ok(Decoded::Rejected {
            status: envelope.status,
            message,
        });
    }

    let accounts: Vec<AccountBalance> =
        serde_json::from_value(envelope.result).map_err(|e| format!("result: {e}"))?;
    Ok(Decoded::Success(CheckResult::Multi(accounts)))
}

/// True unless `amount` is empty or made only of zeros.
pub fn is_nonzero_amount(amount: &str) -> bool {
    amount.trim().chars().any(|c| c != '0')
}
