//! Core types and trait definitions for the ratecard store.
//!
//! This crate is deliberately free of database dependencies. Backends
//! implement [`store::RateStore`]; callers depend on the trait and on the
//! resolution helpers in [`resolve`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod limit;
pub mod plan;
pub mod pricing;
pub mod resolve;
pub mod store;

pub use error::{Error, Result};
