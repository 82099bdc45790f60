//! Execution environment and API base-address resolution.
//!
//! A process either runs as a `client` (a user's terminal, only the public
//! address is reachable) or as a `server` (inside the deployment network,
//! where the API may be reachable under an internal service name).

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Public base address used when nothing else is configured.
pub const DEFAULT_PUBLIC_BASE: &str = "http://localhost:8000";

pub const INTERNAL_BASE_ENV: &str = "INTERNAL_API_BASE";
pub const PUBLIC_BASE_ENV: &str = "PUBLIC_API_BASE";
pub const ENVIRONMENT_ENV: &str = "QUILL_ENVIRONMENT";

/// Where the process is executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// End-user machine; only the public address is usable.
    #[default]
    Client,
    /// Inside the private network next to the API.
    Server,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Client => write!(f, "client"),
            Environment::Server => write!(f, "server"),
        }
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Environment::Client),
            "server" => Ok(Environment::Server),
            other => anyhow::bail!("Unknown environment '{other}' (expected client or server)"),
        }
    }
}

/// Capabilities handed to the HTTP client at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientContext {
    pub environment: Environment,
    /// Internal address, only honored in the server environment.
    pub internal_base: Option<String>,
    pub public_base: String,
}

impl Default for ClientContext {
    fn default() -> Self {
        Self {
            environment: Environment::Client,
            internal_base: None,
            public_base: DEFAULT_PUBLIC_BASE.to_string(),
        }
    }
}

impl ClientContext {
    /// Context for a client talking to a single address.
    pub fn client(public_base: impl Into<String>) -> Self {
        Self {
            environment: Environment::Client,
            internal_base: None,
            public_base: public_base.into(),
        }
    }

    /// Builds the context from config, with environment variables taking
    /// precedence over config values.
    ///
    /// # Errors
    /// Returns an error if a configured address is not a valid URL or the
    /// environment name is unknown.
    pub fn from_config(config: &Config) -> Result<Self> {
        let environment = match env_value(ENVIRONMENT_ENV) {
            Some(value) => value
                .parse()
                .with_context(|| format!("Invalid {ENVIRONMENT_ENV}"))?,
            None => config.environment,
        };

        let internal_base = resolve_base(config.api.internal_base.as_deref(), INTERNAL_BASE_ENV)?;
        let public_base = resolve_base(config.api.public_base.as_deref(), PUBLIC_BASE_ENV)?
            .unwrap_or_else(|| DEFAULT_PUBLIC_BASE.to_string());

        Ok(Self {
            environment,
            internal_base,
            public_base,
        })
    }

    /// Returns the base address requests should be sent to.
    ///
    /// Servers prefer the internal address and fall back to the public one;
    /// clients always use the public address.
    pub fn base_url(&self) -> &str {
        match (self.environment, self.internal_base.as_deref()) {
            (Environment::Server, Some(internal)) => internal,
            _ => &self.public_base,
        }
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolves a base URL with precedence: env > config.
fn resolve_base(config_value: Option<&str>, env_var: &str) -> Result<Option<String>> {
    let value = env_value(env_var).or_else(|| {
        config_value
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
    });

    if let Some(url) = &value {
        url::Url::parse(url).with_context(|| format!("Invalid API base URL: {url}"))?;
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_ignores_internal_base() {
        let ctx = ClientContext {
            environment: Environment::Client,
            internal_base: Some("http://api:8000".to_string()),
            public_base: "https://blog.example.com".to_string(),
        };
        assert_eq!(ctx.base_url(), "https://blog.example.com");
    }

    #[test]
    fn test_server_prefers_internal_base() {
        let ctx = ClientContext {
            environment: Environment::Server,
            internal_base: Some("http://api:8000".to_string()),
            public_base: "https://blog.example.com".to_string(),
        };
        assert_eq!(ctx.base_url(), "http://api:8000");
    }

    #[test]
    fn test_server_falls_back_to_public_base() {
        let ctx = ClientContext {
            environment: Environment::Server,
            internal_base: None,
            public_base: "https://blog.example.com".to_string(),
        };
        assert_eq!(ctx.base_url(), "https://blog.example.com");
    }

    #[test]
    fn test_default_public_base() {
        assert_eq!(ClientContext::default().base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!("server".parse::<Environment>().unwrap(), Environment::Server);
        assert_eq!(" Client ".parse::<Environment>().unwrap(), Environment::Client);
        assert!("browser".parse::<Environment>().is_err());
    }

    #[test]
    fn test_resolve_base_rejects_invalid_url() {
        let result = resolve_base(Some("not a url"), "QUILL_TEST_UNSET_BASE_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_base_empty_config_is_none() {
        let result = resolve_base(Some("   "), "QUILL_TEST_UNSET_BASE_VAR").unwrap();
        assert_eq!(result, None);
    }
}
