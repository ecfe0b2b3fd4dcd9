//! Identifier/timestamp/secret/JSON-path utilities (§4.1, §4.5.2, §4.5.3).
//! Grounded in the source's `opensearch_puller/utils.py` and
//! `schema_migrator/migrator.py` helper functions, re-expressed with the
//! crates this workspace already depends on for regex, time, and crypto.

pub mod identifier;
pub mod json_path;
pub mod secret;
pub mod timestamp;

pub use identifier::{quote_identifier, require_identifier};
pub use secret::{resolve_secret, SecretLocation};
pub use timestamp::{format_upstream, format_warehouse, parse_timestamp};
