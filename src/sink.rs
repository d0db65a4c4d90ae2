use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use tracing::info;

use crate::error::Result;
use crate::raytracer::Image;

/// Somewhere a finished render can be handed off to.
pub trait ImageSink {
  fn save(&self, image: &Image) -> Result<PathBuf>;
}

/// Writes each render as `<dir>/<n>.png`, `n` counting up from the highest
/// number already present.
pub struct PngDirectory {
  dir: PathBuf,
}

impl PngDirectory {
  pub fn new<P: Into<PathBuf>>(dir: P) -> PngDirectory {
    PngDirectory { dir: dir.into() }
  }
}

impl ImageSink for PngDirectory {
  fn save(&self, image: &Image) -> Result<PathBuf> {
    fs::create_dir_all(&self.dir)?;
    let path = self.dir.join(format!("{}.png", next_render_id(&self.dir)?));
    to_rgb8(image).save(&path)?;
    info!(path = %path.display(), "saved render");
    Ok(path)
  }
}

/// One past the largest `<n>.png` in `dir`, or 0.
pub fn next_render_id(dir: &Path) -> Result<u64> {
  let mut next = 0;
  for entry in fs::read_dir(dir)? {
    let path = entry?.path();
    if path.extension().and_then(|e| e.to_str()) != Some("png") {
      continue;
    }
    if let Some(n) = path.file_stem().and_then(|s| s.to_str()).and_then(|s| s.parse::<u64>().ok()) {
      next = next.max(n + 1);
    }
  }
  Ok(next)
}

#[inline]
fn to_byte(c: f64) -> u8 {
  (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

pub fn to_rgb8(image: &Image) -> RgbImage {
  RgbImage::from_fn(image.width(), image.height(), |x, y| {
    let p = image.pixel(x, y);
    Rgb([to_byte(p.x), to_byte(p.y), to_byte(p.z)])
  })
}
