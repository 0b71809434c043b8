//! Gateway configuration.
//!
//! This only configures the HTTP listen address. Everything about the
//! mirror pipeline itself comes from `mirror::MirrorConfig`.

use std::net::SocketAddr;

use mirror::ConfigError;

/// Environment variable holding the HTTP listen address.
pub const LISTEN_ADDR_VAR: &str = "MIRROR_LISTEN_ADDR";

/// Configuration for the gateway HTTP server.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Address to bind the HTTP server to.
    pub listen_addr: SocketAddr,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        // Safe to unwrap: fixed, valid address literal.
        let addr: SocketAddr = "0.0.0.0:8090"
            .parse()
            .expect("hard-coded gateway listen address should parse");
        Self { listen_addr: addr }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(v) = lookup(LISTEN_ADDR_VAR).filter(|v| !v.trim().is_empty()) {
            cfg.listen_addr = v.trim().parse().map_err(|e| ConfigError {
                var: LISTEN_ADDR_VAR,
                value: v.clone(),
                reason: format!("{e}"),
            })?;
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_listens_on_all_interfaces() {
        let cfg = GatewayConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg.listen_addr.port(), 8090);
        assert!(cfg.listen_addr.ip().is_unspecified());
    }

    #[test]
    fn listen_addr_override() {
        let cfg = GatewayConfig::from_lookup(|_| Some("127.0.0.1:5000".to_string())).unwrap();
        assert_eq!(cfg.listen_addr.to_string(), "127.0.0.1:5000");

        let err = GatewayConfig::from_lookup(|_| Some("localhost".to_string())).unwrap_err();
        assert_eq!(err.var, LISTEN_ADDR_VAR);
    }
}
