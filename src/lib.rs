//! weaver: command-line query client for the Weaver bot-hosting API
//!
//! This library provides:
//! - A transport driver for the single-shot JSON and streaming SSE query
//!   endpoints, authenticated with an opaque bearer credential
//! - An incremental SSE frame decoder tolerant of arbitrary chunk boundaries
//! - A pure event fold producing append-only result snapshots
//! - Cooperative cancellation of in-flight query sessions

pub mod client;
pub mod config;

pub use config::Config;
