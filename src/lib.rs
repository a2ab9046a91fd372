//! Tollgate - Request Control Middleware
//!
//! This crate implements the request-control layer of a web service: quota
//! enforcement over fixed time windows, permission checks against role-based
//! masks, and response fingerprinting for conditional requests. The pieces
//! compose as stages in a pipeline wrapped around a request handler, with
//! counters kept in Redis or in process memory.

pub mod pipeline;
pub mod ratelimit;
pub mod access;
pub mod cache;
pub mod store;
pub mod config;
pub mod error;
