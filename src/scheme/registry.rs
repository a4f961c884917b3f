use crate::base::runner::NetTaskRunner;
use crate::scheme::handler::SchemeHandlerFactory;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use url::Url;

/// Schemes the host network stack handles itself when no factory
/// matches.
const BUILTIN_SCHEMES: &[&str] = &[
    "http",
    "https",
    "ws",
    "wss",
    "file",
    "ftp",
    "about",
    "data",
    "chrome",
    "javascript",
];

/// Standard (hierarchical, host-bearing) schemes. Only these consult
/// the per-domain registration; other schemes ignore the domain.
const STANDARD_SCHEMES: &[&str] = &["http", "https", "ws", "wss", "ftp"];

pub fn is_builtin_scheme(scheme: &str) -> bool {
    BUILTIN_SCHEMES.contains(&scheme)
}

pub fn is_standard_scheme(scheme: &str) -> bool {
    STANDARD_SCHEMES.contains(&scheme)
}

/// The result of resolving a request URL against the registry.
#[derive(Clone)]
pub enum SchemeLookup {
    /// An embedder factory matched; it takes over the request.
    Factory(Arc<dyn SchemeHandlerFactory>),
    /// No factory matched but the host handles this scheme natively.
    Builtin,
    /// Nobody handles this scheme; the request is not intercepted.
    NotHandled,
}

impl std::fmt::Debug for SchemeLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemeLookup::Factory(_) => f.write_str("Factory(..)"),
            SchemeLookup::Builtin => f.write_str("Builtin"),
            SchemeLookup::NotHandled => f.write_str("NotHandled"),
        }
    }
}

/// Maps (scheme, domain) registration keys to handler factories.
///
/// Keys are lowercased at registration. The empty domain matches any
/// domain. All mutation and lookup must happen on the designated
/// network thread; callers elsewhere must post.
pub struct SchemeRegistry {
    runner: NetTaskRunner,
    factories: Mutex<HashMap<(String, String), Arc<dyn SchemeHandlerFactory>>>,
}

impl SchemeRegistry {
    pub fn new(runner: NetTaskRunner) -> Self {
        Self {
            runner,
            factories: Mutex::new(HashMap::new()),
        }
    }

    /// Register `factory` for (scheme, domain). Passing `None`
    /// unregisters that exact key.
    pub fn register(
        &self,
        scheme: &str,
        domain: &str,
        factory: Option<Arc<dyn SchemeHandlerFactory>>,
    ) {
        self.runner.assert_currently_on();
        let key = (scheme.to_ascii_lowercase(), domain.to_ascii_lowercase());
        let mut factories = self.factories.lock().unwrap();
        match factory {
            Some(factory) => {
                tracing::debug!(scheme = %key.0, domain = %key.1, "registered scheme handler factory");
                factories.insert(key, factory);
            }
            None => {
                tracing::debug!(scheme = %key.0, domain = %key.1, "unregistered scheme handler factory");
                factories.remove(&key);
            }
        }
    }

    /// Remove every registration. Idempotent.
    pub fn clear(&self) {
        self.runner.assert_currently_on();
        let mut factories = self.factories.lock().unwrap();
        if !factories.is_empty() {
            tracing::debug!(count = factories.len(), "cleared scheme handler factories");
        }
        factories.clear();
    }

    /// Resolve a request URL.
    ///
    /// Matching order: exact (scheme, host) for standard schemes, then
    /// (scheme, "") for any scheme, then built-in handling, then not
    /// intercepted.
    pub fn lookup(&self, url: &Url) -> SchemeLookup {
        self.runner.assert_currently_on();
        let scheme = url.scheme().to_ascii_lowercase();
        let factories = self.factories.lock().unwrap();

        if is_standard_scheme(&scheme) {
            if let Some(host) = url.host_str() {
                let key = (scheme.clone(), host.to_ascii_lowercase());
                if let Some(factory) = factories.get(&key) {
                    return SchemeLookup::Factory(Arc::clone(factory));
                }
            }
        }

        if let Some(factory) = factories.get(&(scheme.clone(), String::new())) {
            return SchemeLookup::Factory(Arc::clone(factory));
        }

        if is_builtin_scheme(&scheme) {
            SchemeLookup::Builtin
        } else {
            SchemeLookup::NotHandled
        }
    }

    pub fn len(&self) -> usize {
        self.runner.assert_currently_on();
        self.factories.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_and_standard_sets() {
        assert!(is_builtin_scheme("https"));
        assert!(is_builtin_scheme("about"));
        assert!(!is_builtin_scheme("custom"));

        assert!(is_standard_scheme("http"));
        assert!(!is_standard_scheme("data"));
        assert!(!is_standard_scheme("custom"));
    }
}
