use super::PoolMember;
use crate::client::HttpTransport;
use crate::utils::rate_limiter::RateLimiter;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a pooled resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    fn allocate() -> Self {
        Self(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An API key for explorers that require one.
pub struct Credential {
    id: ResourceId,
    key: String,
}

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            id: ResourceId::allocate(),
            key: key.into(),
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let visible: String = self.key.chars().take(4).collect();
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("key", &format!("{visible}***"))
            .finish()
    }
}

/// An outbound HTTP client with its own rate limiter.
///
/// `label` is the origin specifier (`local client` for direct egress) and is
/// only used for diagnostics; eviction goes through `id`.
pub struct PooledClient {
    id: ResourceId,
    label: String,
    transport: Arc<dyn HttpTransport>,
    limiter: RateLimiter,
}

impl PooledClient {
    pub fn new(
        label: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            id: ResourceId::allocate(),
            label: label.into(),
            transport,
            limiter,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn transport(&self) -> &dyn HttpTransport {
        self.transport.as_ref()
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}

impl fmt::Debug for PooledClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledClient")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

/// The two kinds of resources the scanner rotates through.
#[derive(Debug)]
pub enum Resource {
    Credential(Credential),
    Client(PooledClient),
}

impl Resource {
    pub fn kind(&self) -> &'static str {
        match self {
            Resource::Credential(_) => "credential",
            Resource::Client(_) => "client",
        }
    }

    pub fn as_credential(&self) -> Option<&Credential> {
        match self {
            Resource::Credential(c) => Some(c),
            Resource::Client(_) => None,
        }
    }

    pub fn as_client(&self) -> Option<&PooledClient> {
        match self {
            Resource::Client(c) => Some(c),
            Resource::Credential(_) => None,
        }
    }
}

impl PoolMember for Resource {
    fn id(&self) -> ResourceId {
        match self {
            Resource::Credential(c) => c.id,
            Resource::Client(c) => c.id,
        }
    }
}

impl From<Credential> for Resource {
    fn from(c: Credential) -> Self {
        Resource::Credential(c)
    }
}

impl From<PooledClient> for Resource {
    fn from(c: PooledClient) -> Self {
        Resource::Client(c)
    }
}
