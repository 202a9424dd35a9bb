//! Request handlers.

pub mod batch;

pub use batch::BatchCheckHandler;
