//! Batched upload pipeline for the drive backend.
//!
//! The [`uploader`] module holds the pipeline itself; [`config`], [`logging`]
//! and [`events`] are the services a host wires around it, and [`scan`] turns
//! local folders into upload entries.

pub mod config;
pub mod events;
pub mod logging;
pub mod scan;
pub mod uploader;
