//! Cookie management for the scheme handler layer.
//!
//! This module provides the cookie surface the request pipeline consumes:
//!
//! - **Representation**: [`CanonicalCookie`](canonicalcookie::CanonicalCookie)
//! - **Storage capability**: the asynchronous [`CookieStore`](store::CookieStore)
//!   trait, with completions always delivered on the network thread
//! - **In-memory store**: [`CookieMonster`](monster::CookieMonster) with
//!   RFC 6265 domain/path matching and per-domain LRU eviction
//! - **Access policy**: [`CookieAccessPolicy`](store::CookieAccessPolicy),
//!   the bulk read/write gate consulted before per-cookie handler hooks
//! - **Supercookie protection**: [`psl`] validation of cookie domains
//!
//! Persistence and browser cookie extraction are out of scope; the store
//! is an opaque collaborator behind the trait.

pub mod canonicalcookie;
pub mod monster;
pub mod psl;
pub mod store;

pub use canonicalcookie::{CanonicalCookie, SameSite};
pub use monster::CookieMonster;
pub use store::{AllowAllCookies, CookieAccessPolicy, CookieOptions, CookieStore};
