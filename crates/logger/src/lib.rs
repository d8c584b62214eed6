//! Shared `tracing` setup for the alivemon binaries.
//!
//! The filter honours `RUST_LOG`; `RUST_LOG_FORMAT=json` switches to
//! structured JSON output, anything else keeps the compact format.

mod subscriber;

pub use subscriber::{LogFormat, init, init_with, try_init_with};
