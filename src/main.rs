use chrono::Utc;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sphereray::config::Cli;
use sphereray::raytracer;
use sphereray::sink::{ImageSink, PngDirectory};

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let cli = Cli::parse();
  let start = Utc::now();

  let settings = cli.settings()?;
  let scene = cli.scene()?;
  let image = raytracer::render(&scene, &settings)?;

  let path = PngDirectory::new(&cli.output_dir).save(&image)?;

  let elapsed = Utc::now() - start;
  info!(path = %path.display(), total_ms = elapsed.num_milliseconds(), "done");
  Ok(())
}
