//! The request job bridge.
//!
//! Adapts a push-style, callback-driven [`SchemeHandler`](crate::scheme::SchemeHandler)
//! to the pull-style job interface the host network stack expects:
//!
//! - [`SchemeJob`](bridge::SchemeJob): the per-request state machine
//! - [`HeadersAvailable`](token::HeadersAvailable) /
//!   [`BytesAvailable`](token::BytesAvailable): continuation tokens with
//!   cancellation-safe weak back-references
//! - [`IoBuffer`](token::IoBuffer): the refcounted read destination
//! - the cookie policy pipeline gating cookie reads before the handler
//!   starts and serializing cookie writes before headers complete

pub mod bridge;
mod cookie_pipeline;
pub mod token;

pub use bridge::{JobDelegate, JobState, ReadOutcome, SchemeJob};
pub use token::{BytesAvailable, HeadersAvailable, IoBuffer};
