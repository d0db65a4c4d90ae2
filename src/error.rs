//! Error types for scene validation, rendering and output.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TraceError>;

#[derive(Error, Debug)]
pub enum TraceError {
  #[error("invalid scene: {0}")]
  InvalidScene(String),

  #[error("invalid render settings: {0}")]
  InvalidSettings(String),

  /// Normalize was handed a vector with no usable length.
  #[error("cannot normalize a zero-length vector")]
  DegenerateVector,

  #[error("worker {worker_id} stopped before reporting its rows")]
  WorkerLost { worker_id: usize },

  #[error("worker {worker_id} did not report before the gather deadline")]
  GatherTimeout { worker_id: usize },

  #[error("worker {worker_id} stopped after the render was abandoned")]
  Cancelled { worker_id: usize },

  #[error("gathered buffer does not fit the partition: {0}")]
  GatherMismatch(String),

  #[error("scene file parse error: {0}")]
  SceneParse(#[from] toml::de::Error),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("image encoding error: {0}")]
  Image(#[from] image::ImageError),
}
