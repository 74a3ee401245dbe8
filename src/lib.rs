//! AWARE — pump.fun token scanner with AI quality assessment
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod feed;
pub mod llm;
pub mod engine;
pub mod server;
pub mod app;
