use crate::base::neterror::NetError;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use url::Url;

/// Load behavior flags for a single request.
///
/// A small bit set mirroring the `net::LOAD_*` flags this layer
/// consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadFlags(u32);

impl LoadFlags {
    pub const NORMAL: LoadFlags = LoadFlags(0);
    /// Do not attach stored cookies to the outgoing request.
    pub const DO_NOT_SEND_COOKIES: LoadFlags = LoadFlags(1 << 0);
    /// Do not persist cookies from the response.
    pub const DO_NOT_SAVE_COOKIES: LoadFlags = LoadFlags(1 << 1);

    pub fn contains(self, other: LoadFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for LoadFlags {
    type Output = LoadFlags;

    fn bitor(self, rhs: LoadFlags) -> LoadFlags {
        LoadFlags(self.0 | rhs.0)
    }
}

/// A request as seen by the scheme handler layer.
///
/// Handlers receive a snapshot of this at `process_request` time; the
/// pipeline may have merged default headers and the `Cookie` header
/// into it by then.
#[derive(Debug, Clone)]
pub struct NetRequest {
    url: Url,
    method: Method,
    headers: HeaderMap,
    load_flags: LoadFlags,
}

impl NetRequest {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            method: Method::GET,
            headers: HeaderMap::new(),
            load_flags: LoadFlags::NORMAL,
        }
    }

    /// Parse `url` and build a GET request for it.
    pub fn get(url: &str) -> Result<Self, NetError> {
        let url = Url::parse(url).map_err(|_| NetError::InvalidUrl)?;
        Ok(Self::new(url))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn set_url(&mut self, url: Url) {
        self.url = url;
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Fetch a header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Set a header unless one with the same name already exists.
    /// Invalid names or values are ignored.
    pub fn set_header_if_missing(&mut self, name: &str, value: &str) {
        let Ok(name) = HeaderName::try_from(name) else {
            return;
        };
        if self.headers.contains_key(&name) {
            return;
        }
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
    }

    pub fn load_flags(&self) -> LoadFlags {
        self.load_flags
    }

    pub fn set_load_flags(&mut self, flags: LoadFlags) {
        self.load_flags = flags;
    }

    pub fn with_load_flags(mut self, flags: LoadFlags) -> Self {
        self.load_flags = flags;
        self
    }
}
