//! Greyscale Conversion Service
//!
//! This library provides the core functionality for the greyscaler system:
//! an HTTP API publishes conversion jobs onto a Redis-backed queue, a worker
//! fetches each source image, deduplicates visually identical content via a
//! perceptual hash, converts it to greyscale PNG, and publishes exactly one
//! terminal result per job for persistence.

pub mod app_state;
pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;
