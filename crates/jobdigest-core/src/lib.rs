//! Core types and the aggregation pipeline for jobdigest.
//!
//! This crate is deliberately free of HTTP and database dependencies. Source
//! connectors, notifiers and durable ledgers plug in through the traits in
//! [`connector`], [`notify`], [`ledger`] and [`profile`].

// Native `async fn` in traits for the ledger and profile store; the returned
// futures carry explicit `Send` bounds where it matters.
#![allow(async_fn_in_trait)]

pub mod connector;
pub mod error;
pub mod filter;
pub mod ledger;
pub mod listing;
pub mod normalize;
pub mod notify;
pub mod pipeline;
pub mod profile;

pub use error::{Error, Result};
