//! Tests for the permission resolver module.
//!
//! Organized by functionality:
//! - Aggregate checks across scope levels
//! - Membership joins and scope isolation
//! - Loading, blocked and failed pools
//! - Owner and filter queries
//! - Pool caching
//! - Scope sessions
//! - Decision properties


#[cfg(test)]
mod session_tests;
