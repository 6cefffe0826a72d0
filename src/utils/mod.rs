//! Utility Module
//!
//! - [`time`]: wall-clock helpers that work on native and WASM targets
//! - [`BoxFuture`]: boxed future alias used by object-safe async traits
//!
//! Native builds require the boxed futures to be `Send` so they can run on a
//! multi-threaded runtime. WASM futures (e.g. browser fetches) are not `Send`,
//! so the alias drops the bound there.

pub mod time;

/// Boxed future returned by the crate's object-safe async traits.
#[cfg(not(target_arch = "wasm32"))]
pub type BoxFuture<'a, T> = futures::future::BoxFuture<'a, T>;

/// Boxed future returned by the crate's object-safe async traits.
#[cfg(target_arch = "wasm32")]
pub type BoxFuture<'a, T> = futures::future::LocalBoxFuture<'a, T>;
