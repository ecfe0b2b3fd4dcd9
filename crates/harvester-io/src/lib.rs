#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub)]
#![forbid(unsafe_code)]

//! Network adapters for the two external systems the harvester talks to:
//! the upstream search cluster (`upstream`) and the analytics warehouse
//! (`warehouse`). Neither module knows about tenant metadata shapes; they
//! only know HTTP, retries, and the two wire protocols.

mod error;
mod retry;
pub mod upstream;
pub mod warehouse;

pub use error::ClientError;
pub use retry::{retry, RetryPolicy};
pub use upstream::{AuthMode, SearchHit, UpstreamClient, UpstreamConfig};
pub use warehouse::{WarehouseClient, WarehouseConfig};
