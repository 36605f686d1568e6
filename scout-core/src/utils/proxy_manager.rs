use crate::error::ConfigError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;
use tracing::{info, warn};

/// `[user[:pass]@]a.b.c.d[:port]`
static AUTH_PROXY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(\w+)(?::(\w+))?@)?(\d{1,3}(?:\.\d{1,3}){3})(?::(\d{1,5}))?$")
        .expect("static proxy pattern")
});

/// Bare `host[:port]` without credentials.
static HOST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9](?:[A-Za-z0-9.-]*[A-Za-z0-9])?)(?::(\d{1,5}))?$")
        .expect("static host pattern")
});

/// A SOCKS5 proxy parsed from one line of the proxy list.
#[derive(Clone, PartialEq, Eq)]
pub struct ProxySpec {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxySpec {
    pub const DEFAULT_PORT: u16 = 1080;

    /// Parses `[user[:pass]@]ipv4[:port]` or a bare `host[:port]`.
    pub fn parse(spec: &str) -> Result<Self, ConfigError> {
        let spec = spec.trim();
        let invalid = |reason: &str| ConfigError::InvalidProxy {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        if let Some(caps) = AUTH_PROXY_RE.captures(spec) {
            let host = parse_dotted_quad(&caps[3]).ok_or_else(|| invalid("octet out of range"))?;
            return Ok(Self {
                host: host.to_string(),
                port: parse_port(caps.get(4).map(|m| m.as_str())).map_err(|r| invalid(&r))?,
                username: caps.get(1).map(|m| m.as_str().to_string()),
                password: caps.get(2).map(|m| m.as_str().to_string()),
            });
        }

        if spec.contains('@') {
            return Err(invalid("expected user[:pass]@ipv4[:port]"));
        }

        let caps = HOST_RE
            .captures(spec)
            .ok_or_else(|| invalid("expected ipv4[:port] or host[:port]"))?;
        let host = &caps[1];
        if host.split('.').all(|part| part.chars().all(|c| c.is_ascii_digit())) {
            // Looks numeric but did not match the dotted-quad form.
            return Err(invalid("malformed ipv4 address"));
        }
        Ok(Self {
            host: host.to_string(),
            port: parse_port(caps.get(2).map(|m| m.as_str())).map_err(|r| invalid(&r))?,
            username: None,
            password: None,
        })
    }

    /// Proxy URL for reqwest. `socks5h` resolves target hostnames on the
    /// proxy side.
    pub fn to_url(&self) -> String {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => {
                format!("socks5h://{}:{}@{}:{}", user, pass, self.host, self.port)
            }
            (Some(user), None) => format!("socks5h://{}@{}:{}", user, self.host, self.port),
            _ => format!("socks5h://{}:{}", self.host, self.port),
        }
    }

    /// Label used in logs and the status line. The password never appears.
    pub fn label(&self) -> String {
        match (&self.username, &self.password) {
            (Some(user), Some(_)) => format!("{}:***@{}:{}", user, self.host, self.port),
            (Some(user), None) => format!("{}@{}:{}", user, self.host, self.port),
            _ => format!("{}:{}", self.host, self.port),
        }
    }
}

impl fmt::Debug for ProxySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ProxySpec").field(&self.label()).finish()
    }
}

impl fmt::Display for ProxySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Numeric octets, so zero-padded forms like `010.0.0.1` are accepted and
/// normalised.
fn parse_dotted_quad(host: &str) -> Option<Ipv4Addr> {
    let mut octets = [0u8; 4];
    let mut parts = host.split('.');
    for octet in octets.iter_mut() {
        *octet = parts.next()?.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(Ipv4Addr::from(octets))
}

fn parse_port(raw: Option<&str>) -> Result<u16, String> {
    match raw {
        None => Ok(ProxySpec::DEFAULT_PORT),
        Some(p) => match p.parse::<u16>() {
            Ok(0) | Err(_) => Err(format!("port {p} out of range")),
            Ok(port) => Ok(port),
        },
    }
}

pub struct ProxyManager;

impl ProxyManager {
    pub const PROXY_FILE: &'static str = "proxy.txt";

    /// Loads proxies, one specifier per line.
    ///
    /// Blank lines and `#` comments are skipped. A missing file means "no
    /// proxies"; a malformed line aborts startup.
    pub fn load_proxies(path: impl AsRef<Path>) -> Result<Vec<ProxySpec>, ConfigError> {
        let path = path.as_ref();
        let path_str = path.display().to_string();
        if !path.exists() {
            warn!("{} not found. Running with the local client only.", path_str);
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path_str.clone(),
            msg: e.to_string(),
        })?;

        let proxies = Self::parse_list(&content).map_err(|(line, e)| {
            ConfigError::InvalidProxyLine {
                path: path_str.clone(),
                line,
                source: Box::new(e),
            }
        })?;

        info!("Loaded {} proxies from {}", proxies.len(), path_str);
        Ok(proxies)
    }

    /// Parses a newline-separated proxy list. On failure returns the 1-based
    /// line number alongside the error.
    pub fn parse_list(content: &str) -> Result<Vec<ProxySpec>, (usize, ConfigError)> {
        let mut proxies = Vec::new();
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            proxies.push(ProxySpec::parse(line).map_err(|e| (index + 1, e))?);
        }
        Ok(proxies)
    }
}
