//! Recursive ray tracer for small sphere scenes, splitting image rows
//! between worker threads and gathering them into one image.

pub mod concurrent;
pub mod config;
pub mod consts;
pub mod error;
pub mod math3d;
pub mod model;
pub mod partition;
pub mod raytracer;
pub mod sink;

pub use error::{Result, TraceError};
