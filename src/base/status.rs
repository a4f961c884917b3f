use crate::base::neterror::NetError;

/// The status of a request job.
/// This roughly matches net::URLRequestStatus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestStatus {
    /// The request completed (or has not hit a problem yet).
    #[default]
    Success,

    /// An asynchronous operation is outstanding; progress resumes via
    /// a continuation.
    IoPending,

    /// The request was canceled by the caller or the handler.
    Canceled,

    /// The request failed with a network error.
    Failed(NetError),
}

impl RequestStatus {
    /// True while the request is progressing normally.
    ///
    /// Matches Chromium semantics: a request that is IO-pending still
    /// counts as successful, since the pending operation will resume it.
    /// The cookie pipeline relies on this when re-checking status between
    /// continuation steps.
    pub fn is_success(&self) -> bool {
        matches!(self, RequestStatus::Success | RequestStatus::IoPending)
    }

    pub fn is_io_pending(&self) -> bool {
        matches!(self, RequestStatus::IoPending)
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, RequestStatus::Canceled)
    }

    /// The error for a failed status, if any.
    pub fn error(&self) -> Option<NetError> {
        match self {
            RequestStatus::Failed(err) => Some(*err),
            _ => None,
        }
    }
}
