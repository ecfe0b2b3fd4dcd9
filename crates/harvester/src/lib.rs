#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub)]
#![forbid(unsafe_code)]

//! Core library for the metadata-driven ingestion pipeline: typed metadata
//! entities, the Postgres-backed metadata gateway, the identifier/
//! timestamp/secret/JSON-path utilities, the puller engine, and the
//! schema migrator.

pub mod config;
mod error;
pub mod service;
pub mod utils;

pub use error::HarvesterError;
pub use harvester_io as io;

pub use tokio_util::sync::CancellationToken;
