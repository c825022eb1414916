//! Bounded pool of isolated compute executors for offloading CPU-bound work off
//! the request-serving thread, with inline fallback under saturation.

#![deny(unsafe_code)]

pub mod error;
pub mod pool;
pub mod registry;

pub use error::ComputeError;
pub use pool::ComputePool;
pub use registry::{Handler, HandlerRegistry};
