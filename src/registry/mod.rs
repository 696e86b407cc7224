//! Docker Hub registry access.
//!
//! This module provides the HTTP client used to fetch current pull
//! counts for tracked images.

pub mod client;

pub use client::{FetchError, RegistryClient, DEFAULT_URL_BASE};
