use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info};

use crate::concurrent::{ConcurrentCalc, Undelivered};
use crate::config::{Lighting, RenderSettings};
use crate::consts;
use crate::error::{Result, TraceError};
use crate::math3d::{Ray, Vec3};
use crate::model::Scene;
use crate::partition::{partition, RowRange};

/// One surface interaction along a traced path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounce {
  pub sphere: usize,
  /// Local ambient + diffuse + specular light at the hit, before attenuation.
  pub illumination: Vec3,
  /// Product of the reflection coefficients of every earlier surface on the path.
  pub attenuation: f64,
}

impl Bounce {
  pub fn contribution(&self) -> Vec3 {
    self.illumination.scale(self.attenuation)
  }
}

#[inline]
fn facing(d: f64, lighting: Lighting) -> f64 {
  match lighting {
    Lighting::Reference => d,
    Lighting::Clamped => d.max(0.0),
  }
}

/// Follows `r` through up to `max_depth` reflections. Stops early when
/// nothing is hit, or when a hit point is in shadow; a shadowed hit adds
/// nothing and is not reflected further.
pub fn trace_path(
  scene: &Scene,
  mut r: Ray,
  max_depth: u32,
  lighting: Lighting,
) -> Result<Vec<Bounce>> {
  let light = &scene.light;
  let mut bounces = Vec::new();
  let mut attenuation = 1.0;

  for _ in 0..max_depth {
    let (sphere_ix, s, t) = match scene.nearest(&r) {
      (Some((ix, s)), t) => (ix, s, t),
      (None, _) => break,
    };

    let pos = r.at(t);
    let n = (pos - s.center).normalized()?;
    let surface_origin = pos + n.scale(consts::SURFACE_EPSILON);
    let to_light = (light.position - surface_origin).normalized()?;

    let shadow_ray = Ray { origin: surface_origin, dir: to_light };
    let (_, blocker_dist) = scene.nearest(&shadow_ray);
    if blocker_dist < (light.position - pos).length() {
      break;
    }

    let to_camera = (scene.camera - pos).normalized()?;
    let half = (to_light + to_camera).normalized()?;
    let diffuse = facing(to_light.dot(&n), lighting);
    let specular = facing(n.dot(&half), lighting).powf(s.shininess / 4.0);

    let illumination = s.ambient * light.ambient
      + (s.diffuse * light.diffuse).scale(diffuse)
      + (s.specular * light.specular).scale(specular);

    bounces.push(Bounce { sphere: sphere_ix, illumination, attenuation });

    attenuation *= s.reflection;
    r = Ray { origin: surface_origin, dir: r.dir.reflect(&n) };
  }
  Ok(bounces)
}

/// Unclamped color seen through screen point `(x, y, 0)`.
pub fn trace_pixel(
  scene: &Scene,
  x: f64,
  y: f64,
  max_depth: u32,
  lighting: Lighting,
) -> Result<Vec3> {
  let r = Ray::towards(scene.camera, Vec3::new(x, y, 0.0))?;
  let mut color = Vec3::ZERO;
  for b in trace_path(scene, r, max_depth, lighting)? {
    color += b.contribution();
  }
  Ok(color)
}

/// Clamp to [0,1]; NaN becomes 0.
#[inline]
pub fn clamp_unit(x: f64) -> f64 {
  if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) }
}

/// `n` evenly spaced values from `start` to `stop` inclusive.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
  match n {
    0 => vec![],
    1 => vec![start],
    _ => {
      let step = (stop - start) / ((n - 1) as f64);
      let mut v: Vec<f64> = (0..n).map(|i| (i as f64) * step + start).collect();
      v[n - 1] = stop;
      v
    }
  }
}

/// Sample coordinates of every column and row on the screen plane. The
/// horizontal extent is [-1, 1]; the vertical one is scaled by the aspect
/// ratio and runs top to bottom.
#[derive(Clone, Debug)]
pub struct Screen {
  xs: Vec<f64>,
  ys: Vec<f64>,
}

impl Screen {
  pub fn new(width: u32, height: u32) -> Screen {
    let ratio = width as f64 / height as f64;
    Screen {
      xs: linspace(-1.0, 1.0, width as usize),
      ys: linspace(1.0 / ratio, -1.0 / ratio, height as usize),
    }
  }

  /// `(row, col, x, y)` for every pixel of `range`, row-major.
  pub fn samples(&self, range: RowRange) -> impl Iterator<Item = (u32, u32, f64, f64)> + '_ {
    range.rows().flat_map(move |row| {
      let y = self.ys[row as usize];
      self.xs.iter().enumerate().map(move |(col, &x)| (row, col as u32, x, y))
    })
  }
}

/// Pixels for one worker's rows, row-major, already clamped.
#[derive(Clone, Debug)]
pub struct RowBuffer {
  pub range: RowRange,
  pub pixels: Vec<Vec3>,
}

/// Assembled render. Only built by `gather`, never modified afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
  width: u32,
  height: u32,
  pixels: Vec<Vec3>,
}

impl Image {
  /// Places every buffer at its row offset. Fails unless the buffers cover
  /// each row exactly once with `width` pixels per row.
  pub fn gather(width: u32, height: u32, parts: Vec<RowBuffer>) -> Result<Image> {
    let w = width as usize;
    let mut pixels = vec![Vec3::ZERO; w * height as usize];
    let mut covered = vec![false; height as usize];

    for part in parts {
      let range = part.range;
      if range.end_row() > height {
        return Err(TraceError::GatherMismatch(format!(
          "worker {} rows {:?} exceed height {}",
          range.worker_id, range.rows(), height
        )));
      }
      if part.pixels.len() != range.row_count as usize * w {
        return Err(TraceError::GatherMismatch(format!(
          "worker {} sent {} pixels for {} rows of width {}",
          range.worker_id, part.pixels.len(), range.row_count, width
        )));
      }
      for row in range.rows() {
        if std::mem::replace(&mut covered[row as usize], true) {
          return Err(TraceError::GatherMismatch(format!("row {} delivered twice", row)));
        }
      }
      let offset = range.start_row as usize * w;
      pixels[offset..offset + part.pixels.len()].copy_from_slice(&part.pixels);
    }

    if let Some(row) = covered.iter().position(|c| !c) {
      return Err(TraceError::GatherMismatch(format!("row {} was never delivered", row)));
    }
    Ok(Image { width, height, pixels })
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn pixel(&self, col: u32, row: u32) -> Vec3 {
    self.pixels[row as usize * self.width as usize + col as usize]
  }

  pub fn pixels(&self) -> &[Vec3] {
    &self.pixels
  }
}

/// The read-only inputs every worker shares, plus a flag the coordinator
/// raises once the render has failed and remaining rows are wasted work.
struct TraceTask {
  scene: Scene,
  screen: Screen,
  max_depth: u32,
  lighting: Lighting,
  cancelled: AtomicBool,
}

impl TraceTask {
  fn new(scene: &Scene, settings: &RenderSettings) -> TraceTask {
    TraceTask {
      scene: scene.clone(),
      screen: Screen::new(settings.width, settings.height),
      max_depth: settings.max_depth,
      lighting: settings.lighting,
      cancelled: AtomicBool::new(false),
    }
  }

  fn cancel(&self) {
    self.cancelled.store(true, Ordering::Relaxed);
  }

  fn render_rows(&self, range: RowRange) -> Result<RowBuffer> {
    let start = Utc::now();
    let mut pixels = Vec::with_capacity(range.row_count as usize * self.screen.xs.len());
    for (_, col, x, y) in self.screen.samples(range) {
      // cancellation is only looked at between rows
      if col == 0 && self.cancelled.load(Ordering::Relaxed) {
        return Err(TraceError::Cancelled { worker_id: range.worker_id });
      }
      let color = trace_pixel(&self.scene, x, y, self.max_depth, self.lighting)?;
      pixels.push(color.map(clamp_unit));
    }
    let elapsed = Utc::now() - start;
    info!(
      worker = range.worker_id,
      rows = ?range.rows(),
      elapsed_ms = elapsed.num_milliseconds(),
      "worker finished"
    );
    Ok(RowBuffer { range, pixels })
  }
}

fn render_single(task: TraceTask, height: u32) -> Result<Vec<RowBuffer>> {
  let part = task.render_rows(RowRange { worker_id: 0, start_row: 0, row_count: height })?;
  Ok(vec![part])
}

fn undelivered(worker_id: usize, e: Undelivered) -> TraceError {
  match e {
    Undelivered::Disconnected => TraceError::WorkerLost { worker_id },
    Undelivered::TimedOut => TraceError::GatherTimeout { worker_id },
  }
}

// Each worker gets one contiguous band of rows; the coordinator then blocks
// until every band has come back. The first failure cancels the rest.
fn render_multi(
  task: TraceTask,
  ranges: &[RowRange],
  settings: &RenderSettings,
) -> Result<Vec<RowBuffer>> {
  let task = Arc::new(task);
  let mut pending = Vec::with_capacity(ranges.len());
  for &range in ranges {
    debug!(worker = range.worker_id, rows = ?range.rows(), "spawning worker");
    let worker = match ConcurrentCalc::new(format!("render-worker-{}", range.worker_id)) {
      Ok(worker) => worker,
      Err(e) => {
        task.cancel();
        return Err(e.into());
      }
    };
    let task = task.clone();
    pending.push((range.worker_id, worker.calculate(range, move |range| task.render_rows(range))));
  }

  let deadline = settings.gather_timeout.map(|t| Instant::now() + t);
  let mut parts = Vec::with_capacity(pending.len());
  for (worker_id, p) in pending {
    let answer = match deadline {
      Some(d) => p.wait_until(d),
      None => p.wait(),
    };
    match answer.map_err(|e| undelivered(worker_id, e)).and_then(|part| part) {
      Ok(part) => parts.push(part),
      Err(e) => {
        task.cancel();
        return Err(e);
      }
    }
  }
  Ok(parts)
}

/// Validates the inputs, renders every row across `settings.workers` threads
/// and gathers the result.
///
/// If a worker fails, is lost or misses the gather deadline, the error is
/// returned straight away and the other workers stop at their next row.
pub fn render(scene: &Scene, settings: &RenderSettings) -> Result<Image> {
  scene.validate()?;
  settings.validate()?;

  // Work is handed out in whole rows, so extra workers would sit idle.
  let workers = settings.workers.min(settings.height as usize);
  info!(
    width = settings.width,
    height = settings.height,
    workers,
    max_depth = settings.max_depth,
    spheres = scene.spheres.len(),
    "rendering"
  );

  let start = Utc::now();
  let task = TraceTask::new(scene, settings);
  let parts = match workers {
    1 => render_single(task, settings.height)?,
    n => render_multi(task, &partition(settings.height, n)?, settings)?,
  };
  let image = Image::gather(settings.width, settings.height, parts)?;

  let elapsed = Utc::now() - start;
  info!(elapsed_ms = elapsed.num_milliseconds(), "render gathered");
  Ok(image)
}
