use std::ops::{Add, AddAssign, Mul, Sub};

use serde::Deserialize;

use crate::error::{Result, TraceError};

/// Point, direction or RGB intensity. Colors are left unclamped until they land in an image.
#[derive(PartialEq, Clone, Copy, Debug, Default, Deserialize)]
#[serde(from = "[f64; 3]")]
pub struct Vec3 {
  pub x: f64,
  pub y: f64,
  pub z: f64,
}

impl Vec3 {
  pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

  pub const fn new(x: f64, y: f64, z: f64) -> Vec3 {
    Vec3 { x, y, z }
  }

  pub fn scale(&self, c: f64) -> Vec3 {
    Vec3 {
      x: self.x * c,
      y: self.y * c,
      z: self.z * c,
    }
  }

  pub fn dot(&self, other: &Vec3) -> f64 {
    (self.x * other.x) + (self.y * other.y) + (self.z * other.z)
  }

  pub fn length_sq(&self) -> f64 {
    self.dot(self)
  }

  pub fn length(&self) -> f64 {
    self.length_sq().sqrt()
  }

  /// Unit vector in the same direction. A zero (or non-finite) length is an
  /// error rather than a vector full of NaN.
  pub fn normalized(&self) -> Result<Vec3> {
    let len = self.length();
    if len == 0.0 || !len.is_finite() {
      return Err(TraceError::DegenerateVector);
    }
    Ok(self.scale(1.0 / len))
  }

  /// Mirror `self` about `axis`, which must already be unit length.
  #[inline]
  pub fn reflect(&self, axis: &Vec3) -> Vec3 {
    *self - axis.scale(2.0 * self.dot(axis))
  }

  pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Vec3 {
    Vec3::new(f(self.x), f(self.y), f(self.z))
  }

  pub fn is_finite(&self) -> bool {
    self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
  }
}

impl From<[f64; 3]> for Vec3 {
  fn from([x, y, z]: [f64; 3]) -> Vec3 {
    Vec3 { x, y, z }
  }
}

impl Add for Vec3 {
  type Output = Vec3;
  fn add(self, rhs: Vec3) -> Vec3 {
    Vec3 {
      x: self.x + rhs.x,
      y: self.y + rhs.y,
      z: self.z + rhs.z,
    }
  }
}

impl AddAssign for Vec3 {
  fn add_assign(&mut self, rhs: Vec3) {
    *self = *self + rhs;
  }
}

impl Sub for Vec3 {
  type Output = Vec3;
  fn sub(self, rhs: Vec3) -> Vec3 {
    Vec3 {
      x: self.x - rhs.x,
      y: self.y - rhs.y,
      z: self.z - rhs.z,
    }
  }
}

// Component-wise, used to modulate material colors by light colors.
impl Mul for Vec3 {
  type Output = Vec3;
  fn mul(self, rhs: Vec3) -> Vec3 {
    Vec3 {
      x: self.x * rhs.x,
      y: self.y * rhs.y,
      z: self.z * rhs.z,
    }
  }
}

#[derive(Clone, Copy, Debug)]
pub struct Ray {
  pub origin: Vec3,
  pub dir: Vec3,
}

impl Ray {
  /// Ray from `origin` through `target`.
  pub fn towards(origin: Vec3, target: Vec3) -> Result<Ray> {
    Ok(Ray { origin, dir: (target - origin).normalized()? })
  }

  pub fn at(&self, t: f64) -> Vec3 {
    self.origin + self.dir.scale(t)
  }

  /// Distance along the ray to the nearer sphere surface. `dir` must be unit length.
  ///
  /// Both roots have to lie in front of the origin, so a ray starting inside
  /// the sphere (one root behind, one ahead) counts as a miss.
  #[inline]
  pub fn intersect_sphere(&self, center: Vec3, radius: f64) -> Option<f64> {
    let oc = self.origin - center;
    let b = 2.0 * self.dir.dot(&oc);
    let c = oc.length_sq() - radius * radius;
    let delta = b * b - 4.0 * c;
    if delta <= 0.0 {
      return None;
    }
    let root = delta.sqrt();
    let (t1, t2) = ((-b + root) / 2.0, (-b - root) / 2.0);
    if t1 > 0.0 && t2 > 0.0 {
      Some(t1.min(t2))
    } else {
      None
    }
  }
}
