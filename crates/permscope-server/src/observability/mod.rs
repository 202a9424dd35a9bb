//! Observability infrastructure for permscope.
//!
//! This module provides structured logging configuration.

mod logging;

pub use logging::{create_json_layer, init_logging, parse_level, LoggingConfig};
