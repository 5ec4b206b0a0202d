//! HTTP boundary of the room generation pipeline.
//!
//! Exposes config, state, error mapping and routes so the binary and the
//! integration tests build the exact same router.

pub mod config;
pub mod error;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
