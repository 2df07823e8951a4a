//! Types shared between the storefront server and anything that talks to it:
//! catalog and order payloads, the product stream messages, and the server
//! configuration.

pub mod config;
pub mod types;
