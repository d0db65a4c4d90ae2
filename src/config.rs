use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;

use crate::consts;
use crate::error::{Result, TraceError};
use crate::model::Scene;

/// How the diffuse and specular dot products are treated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Lighting {
  /// Dot products used as computed, negative values included.
  #[default]
  Reference,
  /// Dot products clamped to zero before use.
  Clamped,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderSettings {
  pub width: u32,
  pub height: u32,
  pub max_depth: u32,
  pub workers: usize,
  pub lighting: Lighting,
  /// Give up on the gather if a worker has not reported by then. `None` waits forever.
  pub gather_timeout: Option<Duration>,
}

impl Default for RenderSettings {
  fn default() -> RenderSettings {
    RenderSettings {
      width: consts::WIDTH,
      height: consts::HEIGHT,
      max_depth: consts::MAX_TRACE_DEPTH,
      workers: default_workers(),
      lighting: Lighting::Reference,
      gather_timeout: None,
    }
  }
}

impl RenderSettings {
  pub fn validate(&self) -> Result<()> {
    if self.width == 0 || self.height == 0 {
      return Err(TraceError::InvalidSettings(format!(
        "image size must be non-zero, got {}x{}",
        self.width, self.height
      )));
    }
    if self.workers == 0 {
      return Err(TraceError::InvalidSettings("worker count must be at least 1".to_string()));
    }
    Ok(())
  }
}

pub fn default_workers() -> usize {
  thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

/// Render a sphere scene across worker threads and save it as a numbered PNG.
#[derive(Parser, Debug)]
#[command(name = "sphereray", version, about)]
pub struct Cli {
  /// TOML scene file; the built-in five sphere scene is used when omitted
  #[arg(long)]
  pub scene: Option<PathBuf>,

  #[arg(long, default_value_t = consts::WIDTH)]
  pub width: u32,

  #[arg(long, default_value_t = consts::HEIGHT)]
  pub height: u32,

  /// Maximum number of reflection bounces per pixel
  #[arg(long, default_value_t = consts::MAX_TRACE_DEPTH)]
  pub max_depth: u32,

  /// Number of render workers (defaults to the available CPUs)
  #[arg(long)]
  pub workers: Option<usize>,

  /// Directory the numbered PNG files are written to
  #[arg(long, default_value = consts::OUTPUT_DIR)]
  pub output_dir: PathBuf,

  /// Clamp negative diffuse/specular dot products to zero
  #[arg(long)]
  pub clamp_lighting: bool,

  /// Abort if any worker has not reported after this many seconds
  #[arg(long)]
  pub gather_timeout_secs: Option<u64>,
}

impl Cli {
  pub fn settings(&self) -> Result<RenderSettings> {
    let settings = RenderSettings {
      width: self.width,
      height: self.height,
      max_depth: self.max_depth,
      workers: self.workers.unwrap_or_else(default_workers),
      lighting: if self.clamp_lighting { Lighting::Clamped } else { Lighting::Reference },
      gather_timeout: self.gather_timeout_secs.map(Duration::from_secs),
    };
    settings.validate()?;
    Ok(settings)
  }

  pub fn scene(&self) -> Result<Scene> {
    match &self.scene {
      Some(path) => Scene::load(path),
      None => Ok(Scene::demo()),
    }
  }
}
