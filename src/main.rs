use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::config::{AssetConfig, ViewerConfig};

mod animation;
mod camera;
mod config;
mod engine;
mod info_card;
mod loader;
mod math;
mod model;
mod orbit_controls;
mod parts;
mod picker;
mod rendering;
mod scene_graph;
mod selection;
mod viewer;
mod window;

/// Interactive viewer for the exploded car model.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Directory holding the model, the background image and the shaders.
    #[arg(long, default_value = "assets")]
    assets: PathBuf,

    /// Model file name, relative to the assets directory.
    #[arg(long, default_value = "car.glb")]
    model: String,

    /// Background panorama file name, relative to the assets directory.
    #[arg(long, default_value = "bg.jpg")]
    background: String,

    /// Hide the axes helper.
    #[arg(long)]
    no_axes: bool,
}

impl Args {
    fn into_config(self) -> ViewerConfig {
        ViewerConfig {
            assets: AssetConfig {
                directory: self.assets,
                model: self.model,
                background: self.background,
            },
            show_axes: !self.no_axes,
            ..Default::default()
        }
    }
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let config = Args::parse().into_config();
    log::info!("Assets directory: {}", config.assets.directory.display());

    pollster::block_on(window::run(config))?;

    Ok(())
}
