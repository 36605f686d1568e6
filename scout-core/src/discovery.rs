//! Durable, append-only discovery log.
//!
//! Every discovery is one UTF-8 line. Appends are serialized by a lock so
//! that concurrent workers never interleave partial lines.

use crate::checker::{AccountBalance, ListBalance};
use crate::traits::DiscoverySink;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;
use zeroize::Zeroizing;

/// An address with a positive result, paired with its private material.
pub enum Discovery<'a> {
    List {
        address: &'a str,
        alternate: &'a str,
        balance: ListBalance,
        private_key: &'a str,
    },
    Multi {
        account: &'a AccountBalance,
        private_key: &'a str,
    },
}

impl fmt::Display for Discovery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discovery::List {
                address,
                alternate,
                balance,
                private_key,
            } => write!(
                f,
                "{} balance (total {}) ({} tx) | {} | {} | {}",
                balance.final_balance,
                balance.total_received,
                balance.n_tx,
                address,
                alternate,
                private_key
            ),
            Discovery::Multi {
                account,
                private_key,
            } => write!(
                f,
                "{} balance | {} | {}",
                account.balance, account.account, private_key
            ),
        }
    }
}

/// File-backed [`DiscoverySink`]; flushes and syncs after every line.
pub struct DiscoveryLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl DiscoveryLog {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open discovery log {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .await
                .with_context(|| format!("Failed to restrict {}", path.display()))?;
        }

        info!("Discoveries will be appended to {}", path.display());
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DiscoverySink for DiscoveryLog {
    async fn append(&self, line: &str) -> Result<()> {
        let mut record = Zeroizing::new(String::with_capacity(line.len() + 1));
        record.push_str(line);
        record.push('\n');

        let mut file = self.file.lock().await;
        file.write_all(record.as_bytes())
            .await
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;
        file.sync_data()
            .await
            .with_context(|| format!("Failed to sync {}", self.path.display()))?;
        Ok(())
    }
}
