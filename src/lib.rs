//! # schemenet
//!
//! An embeddable custom-scheme handler layer with Chromium-inspired
//! architecture.
//!
//! `schemenet` lets an embedding application intercept, synthesize, or
//! redirect fetches for arbitrary URL schemes, and gate every
//! individual cookie read/write that flows through those fetches. It
//! bridges the embedder's push-style, callback-driven handler model to
//! the pull-style "give me N bytes when ready" job model of a host
//! network stack.
//!
//! ## Features
//!
//! - **Scheme registration**: (scheme, domain) → handler factory, with
//!   built-in scheme fallback
//! - **Request jobs**: per-request state machine with cancellation-safe
//!   continuation tokens
//! - **Cookie policy**: per-request and per-cookie read/write gates,
//!   with strictly ordered asynchronous cookie saves
//! - **Request interception**: full-replace, pre-redirect rewrite, and
//!   post-redirect hooks for host-handled schemes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use schemenet::scheme::{SchemeHandler, SchemeHandlerFactory};
//! use schemenet::urlrequest::{JobDispatch, NetContext, NetRequest};
//!
//! let context = NetContext::new();
//! context.register_scheme_handler_factory("custom", "", Some(my_factory));
//!
//! let request = NetRequest::get("custom://page/")?;
//! if let JobDispatch::Custom(job) = context.create_job(request, delegate) {
//!     job.start();
//!     context.runner().run_until_idle();
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error codes, request status, and the network thread
//! - [`cookies`] - Cookie store capability and the in-memory monster
//! - [`scheme`] - Handler capabilities and the scheme registry
//! - [`job`] - The request job bridge and continuation tokens
//! - [`urlrequest`] - Requests, responses, interceptors, and the context
//!
//! ## Threading
//!
//! Every registry, job, and cookie operation is affine to the one
//! designated network thread (the thread that constructed the
//! [`NetContext`](urlrequest::NetContext)), enforced by runtime
//! assertions. Continuation tokens may be invoked from any thread; they
//! re-post themselves.

pub mod base;
pub mod cookies;
pub mod job;
pub mod scheme;
pub mod urlrequest;
