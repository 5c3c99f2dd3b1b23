// src/lib.rs
// faultstore - rolled-up application error capture over SQLite

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod config;
pub mod db;
pub mod error;
pub mod fault;
pub mod fingerprint;
pub mod logger;
pub mod store;

pub use error::{FaultError, Result};
pub use fault::{Fault, FaultParams, RequestContext};
pub use fingerprint::fingerprint;
pub use logger::FaultLogger;
pub use store::{RecordOutcome, SqlFaultStore, DEFAULT_ROLLUP_WINDOW};
