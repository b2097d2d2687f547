//! Async client for the drive backend REST API.
//!
//! The backend owns storage, metadata and access control; this crate only
//! models the calls the client makes and the JSON shapes it exchanges.

pub mod api;
pub mod client;
pub mod error;
pub mod models;

pub use client::{Client, ClientConfig};
pub use error::{ApiError, ApiResult};
