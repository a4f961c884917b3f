//! Request-level types and the network context.

pub mod context;
pub mod interceptor;
pub mod request;
pub mod response;

pub use context::{JobDispatch, NetContext, NetContextConfig};
pub use interceptor::{RedirectAction, RequestInterceptor};
pub use request::{LoadFlags, NetRequest};
pub use response::NetResponse;
