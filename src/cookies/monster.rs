use crate::base::runner::NetTaskRunner;
use crate::cookies::canonicalcookie::CanonicalCookie;
use crate::cookies::store::{
    CookieOptions, CookieStore, DeleteCookiesCallback, GetCookieLineCallback,
    GetCookieListCallback, SetCookieCallback,
};
use dashmap::DashMap;
use time::OffsetDateTime;
use url::Url;

/// Maximum cookies per domain (Chromium default).
const MAX_COOKIES_PER_DOMAIN: usize = 50;

/// The in-memory cookie store.
/// Modeled after Chromium's `net::CookieMonster`.
///
/// All [`CookieStore`] completions are posted to the network task
/// runner, so callers observe every store operation as asynchronous
/// even though the underlying map access is immediate.
pub struct CookieMonster {
    // Store: Map<Domain, List<Cookie>>
    store: DashMap<String, Vec<CanonicalCookie>>,
    runner: NetTaskRunner,
}

impl CookieMonster {
    pub fn new(runner: NetTaskRunner) -> Self {
        Self {
            store: DashMap::new(),
            runner,
        }
    }

    pub fn set_canonical_cookie(&self, cookie: CanonicalCookie) {
        let mut entry = self.store.entry(cookie.domain.clone()).or_default();

        // Remove existing if name/path match
        entry.retain(|c| c.name != cookie.name || c.path != cookie.path);

        // Enforce per-domain limit with LRU eviction
        while entry.len() >= MAX_COOKIES_PER_DOMAIN {
            if let Some(oldest_idx) = entry
                .iter()
                .enumerate()
                .min_by_key(|(_, c)| c.creation_time)
                .map(|(i, _)| i)
            {
                entry.remove(oldest_idx);
            } else {
                break;
            }
        }

        entry.push(cookie);
    }

    /// Get cookies matching the URL with proper domain suffix matching.
    pub fn cookies_for_url(&self, url: &Url, options: CookieOptions) -> Vec<CanonicalCookie> {
        let mut result = Vec::new();
        let host = url.host_str().unwrap_or("");
        let now = OffsetDateTime::now_utc();

        for domain in Self::matching_domains(host) {
            if let Some(entry) = self.store.get(&domain) {
                for cookie in entry.iter() {
                    if !Self::domain_matches(&cookie.domain, host, cookie.host_only) {
                        continue;
                    }
                    if !Self::path_matches(&cookie.path, url.path()) {
                        continue;
                    }
                    if cookie.secure && url.scheme() != "https" {
                        continue;
                    }
                    if cookie.http_only && !options.include_httponly {
                        continue;
                    }
                    if cookie.is_expired(now) {
                        continue;
                    }
                    result.push(cookie.clone());
                }
            }
        }

        // Sort by path length (longest first) then creation time
        result.sort_by(|a, b| {
            b.path
                .len()
                .cmp(&a.path.len())
                .then_with(|| a.creation_time.cmp(&b.creation_time))
        });

        result
    }

    /// Serialize the matching cookies into a `Cookie` header value.
    pub fn cookie_line(&self, url: &Url, options: CookieOptions) -> String {
        self.cookies_for_url(url, options)
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn total_cookie_count(&self) -> usize {
        self.store.iter().map(|e| e.value().len()).sum()
    }

    fn delete_matching(&self, url: &Url, name: Option<&str>) -> usize {
        let host = url.host_str().unwrap_or("");
        let mut removed = 0;

        for domain in Self::matching_domains(host) {
            if let Some(mut entry) = self.store.get_mut(&domain) {
                let before = entry.len();
                entry.retain(|c| {
                    let matches = Self::domain_matches(&c.domain, host, c.host_only)
                        && name.map_or(true, |n| c.name == n);
                    !matches
                });
                removed += before - entry.len();
            }
        }
        removed
    }

    /// Check if cookie domain matches request host.
    /// Implements RFC 6265 domain matching.
    fn domain_matches(cookie_domain: &str, request_host: &str, host_only: bool) -> bool {
        if host_only {
            // Host-only cookie: exact match required
            return cookie_domain.eq_ignore_ascii_case(request_host);
        }

        let cookie_domain = cookie_domain.trim_start_matches('.');

        if request_host.eq_ignore_ascii_case(cookie_domain) {
            return true;
        }

        // Check if request_host ends with .cookie_domain
        if request_host.len() > cookie_domain.len() {
            let suffix = &request_host[request_host.len() - cookie_domain.len()..];
            if suffix.eq_ignore_ascii_case(cookie_domain) {
                let char_before = request_host
                    .chars()
                    .nth(request_host.len() - cookie_domain.len() - 1);
                return char_before == Some('.');
            }
        }

        false
    }

    /// Check if request path matches cookie path.
    /// Implements RFC 6265 path matching.
    fn path_matches(cookie_path: &str, request_path: &str) -> bool {
        if request_path == cookie_path {
            return true;
        }

        if request_path.starts_with(cookie_path) {
            if cookie_path.ends_with('/') {
                return true;
            }
            let next_char = request_path.chars().nth(cookie_path.len());
            return next_char == Some('/');
        }

        false
    }

    /// The host itself and all parent domains worth checking.
    fn matching_domains(host: &str) -> Vec<String> {
        let mut domains = vec![host.to_string()];

        let parts: Vec<&str> = host.split('.').collect();
        for i in 1..parts.len().saturating_sub(1) {
            domains.push(parts[i..].join("."));
        }

        domains
    }
}

impl CookieStore for CookieMonster {
    fn get_all_for_url(&self, url: &Url, callback: GetCookieListCallback) {
        let cookies = self.cookies_for_url(url, CookieOptions::with_httponly());
        self.runner.post(move || callback(cookies));
    }

    fn cookie_line_for_url(
        &self,
        url: &Url,
        options: CookieOptions,
        callback: GetCookieLineCallback,
    ) {
        let line = self.cookie_line(url, options);
        self.runner.post(move || callback(line));
    }

    fn set_from_line(
        &self,
        url: &Url,
        line: &str,
        _options: CookieOptions,
        callback: SetCookieCallback,
    ) {
        let stored = match CanonicalCookie::from_set_cookie_line(url, line) {
            Some(cookie) => {
                self.set_canonical_cookie(cookie);
                true
            }
            None => {
                tracing::debug!(line = %line, "rejected uncanonicalizable cookie line");
                false
            }
        };
        self.runner.post(move || callback(stored));
    }

    fn delete_for_url(&self, url: &Url, name: Option<&str>, callback: DeleteCookiesCallback) {
        let removed = self.delete_matching(url, name);
        self.runner.post(move || callback(removed));
    }
}
