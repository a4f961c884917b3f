//! The asynchronous cookie store capability.
//!
//! The scheme handler layer never assumes a cookie operation completes
//! synchronously: every store call takes a completion callback, and the
//! pipeline suspends until the callback is posted back onto the network
//! thread.

use crate::cookies::canonicalcookie::CanonicalCookie;
use crate::urlrequest::request::NetRequest;
use url::Url;

pub type GetCookieListCallback = Box<dyn FnOnce(Vec<CanonicalCookie>) + Send>;
pub type GetCookieLineCallback = Box<dyn FnOnce(String) + Send>;
pub type SetCookieCallback = Box<dyn FnOnce(bool) + Send>;
pub type DeleteCookiesCallback = Box<dyn FnOnce(usize) + Send>;

/// Per-operation cookie access options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CookieOptions {
    /// Include HttpOnly cookies. Network-stack accesses set this;
    /// script-level accesses would not.
    pub include_httponly: bool,
}

impl CookieOptions {
    pub fn with_httponly() -> Self {
        Self {
            include_httponly: true,
        }
    }
}

/// Asynchronous cookie storage consumed by the request pipeline.
///
/// Implementations must deliver every completion callback on the
/// designated network thread, and never invoke it synchronously from
/// within the store call itself.
pub trait CookieStore: Send + Sync {
    /// Fetch every cookie matching `url`, HttpOnly included. Used by the
    /// policy phase, which inspects cookies it may decline to send.
    fn get_all_for_url(&self, url: &Url, callback: GetCookieListCallback);

    /// Fetch the serialized `Cookie` header value for `url`, filtered
    /// per `options`. Empty string when nothing matches.
    fn cookie_line_for_url(&self, url: &Url, options: CookieOptions, callback: GetCookieLineCallback);

    /// Parse and persist one Set-Cookie line. The callback reports
    /// whether the cookie was stored; failure is not an error for the
    /// caller, just "no cookie".
    fn set_from_line(
        &self,
        url: &Url,
        line: &str,
        options: CookieOptions,
        callback: SetCookieCallback,
    );

    /// Delete cookies matching `url`, optionally restricted to one name.
    /// The callback receives the number of cookies removed.
    fn delete_for_url(&self, url: &Url, name: Option<&str>, callback: DeleteCookiesCallback);
}

/// Bulk cookie access policy consulted per request, before the
/// per-cookie handler hooks run.
pub trait CookieAccessPolicy: Send + Sync {
    /// Whether any of `cookies` may be sent with `request`.
    fn can_get_cookies(&self, _request: &NetRequest, _cookies: &[CanonicalCookie]) -> bool {
        true
    }

    /// Whether the response cookie `cookie_line` may be saved for
    /// `request`. May adjust `options` (e.g. withhold HttpOnly access).
    fn can_set_cookie(
        &self,
        _request: &NetRequest,
        _cookie_line: &str,
        _options: &mut CookieOptions,
    ) -> bool {
        true
    }
}

/// The default policy: every read and write is allowed.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllCookies;

impl CookieAccessPolicy for AllowAllCookies {}
