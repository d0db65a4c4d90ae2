use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, TraceError};
use crate::math3d::{Ray, Vec3};

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Sphere {
  pub center: Vec3,
  pub radius: f64,
  pub ambient: Vec3,
  pub diffuse: Vec3,
  pub specular: Vec3,
  pub shininess: f64,
  pub reflection: f64,
}

impl Sphere {
  #[inline]
  pub fn intersect(&self, r: &Ray) -> Option<f64> {
    r.intersect_sphere(self.center, self.radius)
  }

  fn validate(&self, ix: usize) -> Result<()> {
    let fields = [self.center, self.ambient, self.diffuse, self.specular];
    if !fields.iter().all(Vec3::is_finite) {
      return Err(invalid(ix, "has a non-finite vector".to_string()));
    }
    if !(self.radius > 0.0 && self.radius.is_finite()) {
      return Err(invalid(ix, format!("radius must be positive, got {}", self.radius)));
    }
    if !(self.shininess > 0.0 && self.shininess.is_finite()) {
      return Err(invalid(ix, format!("shininess must be positive, got {}", self.shininess)));
    }
    if !(0.0..=1.0).contains(&self.reflection) {
      return Err(invalid(ix, format!("reflection must lie in [0,1], got {}", self.reflection)));
    }
    Ok(())
  }
}

fn invalid(ix: usize, what: String) -> TraceError {
  TraceError::InvalidScene(format!("sphere {} {}", ix, what))
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Light {
  pub position: Vec3,
  pub ambient: Vec3,
  pub diffuse: Vec3,
  pub specular: Vec3,
}

impl Light {
  pub fn white(position: Vec3) -> Light {
    let one = Vec3::new(1.0, 1.0, 1.0);
    Light { position, ambient: one, diffuse: one, specular: one }
  }
}

/// Everything the kernel reads. Never mutated once a render starts.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Scene {
  pub camera: Vec3,
  pub light: Light,
  #[serde(default)]
  pub spheres: Vec<Sphere>,
}

impl Scene {
  /// Five spheres resting on a huge floor sphere, lit from the upper right.
  pub fn demo() -> Scene {
    let v = |x, y, z| Vec3::new(x, y, z);
    let sphere = |center, radius, ambient, diffuse, shininess, reflection| Sphere {
      center,
      radius,
      ambient,
      diffuse,
      specular: v(1.0, 1.0, 1.0),
      shininess,
      reflection,
    };
    Scene {
      camera: Vec3::new(0.0, 0.0, 1.0),
      light: Light::white(Vec3::new(5.0, 5.0, 5.0)),
      spheres: vec![
        sphere(v(-0.2, 0.0, -1.0), 0.2, v(0.1, 0.0, 0.0), v(0.7, 1.0, 0.0), 80.0, 0.1),
        sphere(v(0.1, -0.3, 0.0), 0.1, v(0.1, 0.0, 0.1), v(0.7, 0.0, 0.7), 100.0, 0.5),
        sphere(v(0.5, 0.0, -1.0), 0.5, v(0.1, 0.0, 0.1), v(0.7, 0.7, 0.7), 100.0, 0.5),
        sphere(v(-0.3, 0.0, 0.0), 0.15, v(0.0, 0.1, 0.0), v(0.0, 0.6, 0.0), 100.0, 0.5),
        sphere(v(0.0, -9000.0, 0.0), 9000.0 - 0.7, v(0.1, 0.1, 0.1), v(0.6, 0.6, 0.6), 100.0, 0.5),
      ],
    }
  }

  pub fn from_toml_str(text: &str) -> Result<Scene> {
    let scene: Scene = toml::from_str(text)?;
    scene.validate()?;
    Ok(scene)
  }

  pub fn load<P: AsRef<Path>>(path: P) -> Result<Scene> {
    Scene::from_toml_str(&fs::read_to_string(path)?)
  }

  pub fn validate(&self) -> Result<()> {
    let light = &self.light;
    let vectors = [self.camera, light.position, light.ambient, light.diffuse, light.specular];
    if !vectors.iter().all(Vec3::is_finite) {
      return Err(TraceError::InvalidScene("camera and light must be finite".to_string()));
    }
    for (ix, s) in self.spheres.iter().enumerate() {
      s.validate(ix)?;
    }
    Ok(())
  }

  /// Closest sphere hit by `r` and its distance, or `(None, INFINITY)`.
  /// Linear scan; on an exact tie the earlier sphere wins.
  pub fn nearest(&self, r: &Ray) -> (Option<(usize, &Sphere)>, f64) {
    let mut nearest = None;
    let mut min_distance = f64::INFINITY;
    for (ix, s) in self.spheres.iter().enumerate() {
      match s.intersect(r) {
        Some(t) if t < min_distance => {
          min_distance = t;
          nearest = Some((ix, s));
        }
        _ => {}
      }
    }
    (nearest, min_distance)
  }
}

#[cfg(test)]
mod test {
  use super::*;

  fn unit_sphere(center: Vec3) -> Sphere {
    Sphere {
      center,
      radius: 1.0,
      ambient: Vec3::new(0.1, 0.1, 0.1),
      diffuse: Vec3::new(0.5, 0.5, 0.5),
      specular: Vec3::new(1.0, 1.0, 1.0),
      shininess: 100.0,
      reflection: 0.5,
    }
  }

  fn scene_of(spheres: Vec<Sphere>) -> Scene {
    Scene {
      camera: Vec3::new(0.0, 0.0, 1.0),
      light: Light::white(Vec3::new(5.0, 5.0, 5.0)),
      spheres,
    }
  }

  #[test]
  fn nearest_picks_closest() {
    let far = unit_sphere(Vec3::new(0.0, 0.0, -10.0));
    let near = unit_sphere(Vec3::new(0.0, 0.0, -4.0));
    let scene = scene_of(vec![far, near]);
    let r = Ray { origin: Vec3::ZERO, dir: Vec3::new(0.0, 0.0, -1.0) };
    let (hit, t) = scene.nearest(&r);
    assert_eq!(hit.map(|(ix, _)| ix), Some(1));
    assert_eq!(t, 3.0);
  }

  #[test]
  fn nearest_tie_goes_to_first() {
    let s = unit_sphere(Vec3::new(0.0, 0.0, -4.0));
    let scene = scene_of(vec![s.clone(), s]);
    let r = Ray { origin: Vec3::ZERO, dir: Vec3::new(0.0, 0.0, -1.0) };
    assert_eq!(scene.nearest(&r).0.map(|(ix, _)| ix), Some(0));
  }

  #[test]
  fn nearest_miss() {
    let scene = Scene::demo();
    let r = Ray { origin: Vec3::new(0.0, 0.0, 1.0), dir: Vec3::new(0.0, 1.0, 0.0) };
    let (hit, t) = scene.nearest(&r);
    assert!(hit.is_none());
    assert_eq!(t, f64::INFINITY);
  }

  #[test]
  fn demo_scene_is_valid() {
    let scene = Scene::demo();
    assert_eq!(scene.spheres.len(), 5);
    assert!(scene.validate().is_ok());
  }

  #[test]
  fn rejects_bad_spheres() {
    let mut s = unit_sphere(Vec3::ZERO);
    s.radius = 0.0;
    assert!(matches!(scene_of(vec![s]).validate(), Err(TraceError::InvalidScene(_))));

    let mut s = unit_sphere(Vec3::ZERO);
    s.shininess = -1.0;
    assert!(scene_of(vec![s]).validate().is_err());

    let mut s = unit_sphere(Vec3::ZERO);
    s.reflection = 1.5;
    assert!(scene_of(vec![s]).validate().is_err());

    let mut s = unit_sphere(Vec3::ZERO);
    s.center.y = f64::NAN;
    assert!(scene_of(vec![s]).validate().is_err());
  }

  #[test]
  fn parses_toml_scene() {
    let text = r#"
      camera = [0.0, 0.0, 1.0]

      [light]
      position = [5.0, 5.0, 5.0]
      ambient = [1.0, 1.0, 1.0]
      diffuse = [1.0, 1.0, 1.0]
      specular = [1.0, 1.0, 1.0]

      [[spheres]]
      center = [0.0, 0.0, -1.0]
      radius = 0.5
      ambient = [0.1, 0.0, 0.0]
      diffuse = [0.7, 0.0, 0.0]
      specular = [1.0, 1.0, 1.0]
      shininess = 100.0
      reflection = 0.5
    "#;
    let scene = Scene::from_toml_str(text).unwrap();
    assert_eq!(scene.spheres.len(), 1);
    assert_eq!(scene.spheres[0].center, Vec3::new(0.0, 0.0, -1.0));
    assert_eq!(scene.light.position, Vec3::new(5.0, 5.0, 5.0));
  }

  #[test]
  fn bundled_scene_matches_demo() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("scenes/demo.toml");
    let scene = Scene::load(path).unwrap();
    let demo = Scene::demo();
    assert_eq!(scene.camera, demo.camera);
    assert_eq!(scene.light, demo.light);
    assert_eq!(scene.spheres.len(), demo.spheres.len());
    for (a, b) in scene.spheres.iter().zip(&demo.spheres) {
      assert_eq!(a.center, b.center);
      assert!((a.radius - b.radius).abs() < 1e-9);
      assert_eq!((a.shininess, a.reflection), (b.shininess, b.reflection));
    }
  }

  #[test]
  fn toml_scene_is_validated() {
    let text = r#"
      camera = [0.0, 0.0, 1.0]

      [light]
      position = [5.0, 5.0, 5.0]
      ambient = [1.0, 1.0, 1.0]
      diffuse = [1.0, 1.0, 1.0]
      specular = [1.0, 1.0, 1.0]

      [[spheres]]
      center = [0.0, 0.0, -1.0]
      radius = -0.5
      ambient = [0.1, 0.0, 0.0]
      diffuse = [0.7, 0.0, 0.0]
      specular = [1.0, 1.0, 1.0]
      shininess = 100.0
      reflection = 0.5
    "#;
    assert!(matches!(Scene::from_toml_str(text), Err(TraceError::InvalidScene(_))));
    assert!(matches!(Scene::from_toml_str("camera = 3"), Err(TraceError::SceneParse(_))));
  }
}
