//! HTTP layer for the bundle service.
//!
//! This module provides the axum-based HTTP server that validates bundle
//! requests, drives the external build tool, streams finished bundles back,
//! and reports which modules a checked-out version offers.

pub mod download;
pub mod handler;
pub mod versions;
