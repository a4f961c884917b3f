//! Custom scheme handling: embedder capabilities and the registry.

pub mod handler;
pub mod registry;

pub use handler::{ResponseHead, ResponseRead, SchemeHandler, SchemeHandlerFactory};
pub use registry::{is_builtin_scheme, is_standard_scheme, SchemeLookup, SchemeRegistry};
