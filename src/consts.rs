// Defaults for the built-in render; all of them can be overridden on the command line.
pub const WIDTH: u32 = 600;
pub const HEIGHT: u32 = 400;
pub const MAX_TRACE_DEPTH: u32 = 3;

// Offset along the surface normal for secondary rays, keeps them off their own surface.
pub const SURFACE_EPSILON: f64 = 1e-5;

pub const OUTPUT_DIR: &str = "images";
