//! HTTP API: server, routing, and request/response mapping.
//!
//! Handlers follow one pattern: resolve the actor (middleware), resolve the
//! authorized scope, then filter lists or check-then-mutate single records.

pub mod app;
pub mod middleware;
