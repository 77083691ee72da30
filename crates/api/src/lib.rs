//! HTTP JSON API for the bank: router, auth middleware and handlers.

pub mod app;
pub mod context;
pub mod middleware;
