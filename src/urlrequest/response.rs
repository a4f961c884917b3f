use http::header::{HeaderName, HeaderValue, SET_COOKIE};
use http::HeaderMap;

/// A response synthesized by a scheme handler.
///
/// Handlers fill one of these in `response_head()`; the job bridge then
/// exposes it to the host through `response_info()`. Multi-valued
/// headers (Set-Cookie in particular) are kept as separate entries.
#[derive(Debug, Clone)]
pub struct NetResponse {
    status: u16,
    status_text: String,
    mime_type: String,
    headers: HeaderMap,
    expected_content_size: i64,
}

impl Default for NetResponse {
    fn default() -> Self {
        Self {
            status: 200,
            status_text: "OK".to_string(),
            mime_type: String::new(),
            headers: HeaderMap::new(),
            expected_content_size: -1,
        }
    }
}

impl NetResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for the common success case.
    pub fn ok(mime_type: &str) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            ..Self::default()
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn set_status(&mut self, status: u16, status_text: &str) {
        self.status = status;
        self.status_text = status_text.to_string();
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn set_mime_type(&mut self, mime_type: &str) {
        self.mime_type = mime_type.to_string();
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Fetch the first value for a header as a string.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Replace a header. Invalid names or values are ignored.
    pub fn set_header(&mut self, name: &str, value: &str) {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::from_str(value)) {
            self.headers.insert(name, value);
        }
    }

    /// Append a header, preserving existing values with the same name.
    pub fn add_header(&mut self, name: &str, value: &str) {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::from_str(value)) {
            self.headers.append(name, value);
        }
    }

    /// Every non-empty Set-Cookie line, in response order.
    pub fn set_cookie_lines(&self) -> Vec<String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect()
    }

    /// Expected body size in bytes; -1 when unknown.
    pub fn expected_content_size(&self) -> i64 {
        self.expected_content_size
    }

    pub fn set_expected_content_size(&mut self, size: i64) {
        self.expected_content_size = size;
    }
}
