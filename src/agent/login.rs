//! Login dispatch by domain.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{AgentError, HelperCommand, LoginAgent, bounded};
use crate::rules::resolve;

/// How to log in to one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginStrategy {
    /// Nothing to do; the session is assumed to exist already.
    NoOp,
    /// Run a helper program with `{domain}` substituted.
    Command(HelperCommand),
}

static NO_LOGIN: LoginStrategy = LoginStrategy::NoOp;

/// Domain to [`LoginStrategy`] registry.
///
/// Domains without an entry (after the usual exact/base-domain cascade)
/// resolve to [`LoginStrategy::NoOp`].
#[derive(Debug, Clone)]
pub struct LoginRegistry {
    strategies: BTreeMap<String, LoginStrategy>,
    timeout: Duration,
}

impl LoginRegistry {
    /// Creates an empty registry; every login is bounded by `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            strategies: BTreeMap::new(),
            timeout,
        }
    }

    /// Registers the strategy for `domain`.
    pub fn register(&mut self, domain: impl Into<String>, strategy: LoginStrategy) {
        self.strategies.insert(domain.into(), strategy);
    }

    /// Returns the strategy resolved for `domain`.
    #[must_use]
    pub fn strategy_for(&self, domain: &str) -> &LoginStrategy {
        resolve(domain, &self.strategies, &NO_LOGIN)
    }

    /// Number of registered domains.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Returns true when no domain is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

#[async_trait]
impl LoginAgent for LoginRegistry {
    async fn perform_login(&self, domain: &str) -> Result<(), AgentError> {
        match self.strategy_for(domain) {
            LoginStrategy::NoOp => {
                debug!(domain, "no login strategy registered; continuing");
                Ok(())
            }
            LoginStrategy::Command(command) => {
                info!(domain, program = command.program(), "performing login");
                bounded(
                    "login",
                    self.timeout,
                    command.run("login", &[("{domain}", domain)]),
                )
                .await
                .map(|_| ())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_domain_resolves_to_noop() {
        let registry = LoginRegistry::new(Duration::from_secs(1));
        assert!(registry.is_empty());
        assert_eq!(registry.strategy_for("karger.com"), &LoginStrategy::NoOp);
    }

    #[test]
    fn test_registered_strategy_uses_cascade() {
        let mut registry = LoginRegistry::new(Duration::from_secs(1));
        let command = HelperCommand::from_argv(&["login-helper".to_string()]).unwrap();
        registry.register("wiley.com", LoginStrategy::Command(command.clone()));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.strategy_for("aiche.onlinelibrary.wiley.com"),
            &LoginStrategy::Command(command)
        );
    }

    #[tokio::test]
    async fn test_noop_login_succeeds() {
        let registry = LoginRegistry::new(Duration::from_secs(1));
        registry.perform_login("pubs.acs.org").await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_login_propagates_failure() {
        let mut registry = LoginRegistry::new(Duration::from_secs(5));
        let failing = HelperCommand::from_argv(&["false".to_string()]).unwrap();
        registry.register("pubs.acs.org", LoginStrategy::Command(failing));
        assert!(registry.perform_login("pubs.acs.org").await.is_err());
    }
}
