//! sharebox — a small self-hosted file-sharing server.
//!
//! Files are uploaded over HTTP into a single shared media root, served back
//! by name, and bundled on demand into a zip archive from a caller-supplied
//! favorites list.

pub mod api;
pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
pub mod storage;
