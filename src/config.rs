use std::path::{Path, PathBuf};

use glam::{Vec3, Vec4};

#[derive(Debug, Clone)]
pub struct AssetConfig {
    pub directory: PathBuf,
    pub model: String,
    pub background: String,
}

impl AssetConfig {
    pub fn model_path(&self) -> PathBuf {
        self.directory.join(&self.model)
    }

    pub fn background_path(&self) -> PathBuf {
        self.directory.join(&self.background)
    }

    pub fn shader_directory(&self) -> PathBuf {
        self.directory.join("shaders")
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            directory: Path::new("assets").to_path_buf(),
            model: "car.glb".to_string(),
            background: "bg.jpg".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CameraConfig {
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub initial_eye: Vec3,
    pub target: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            initial_eye: Vec3::new(4.0, 4.0, 4.0),
            target: Vec3::ZERO,
        }
    }
}

/// Timings for the reveal sequence, in seconds relative to the moment the model finished loading.
#[derive(Debug, Clone)]
pub struct AnimationConfig {
    pub entrance_duration: f32,
    pub car_outside_delay: f32,
    pub car_outside_duration: f32,
    pub engine_spread: f32,
    pub final_camera_eye: Vec3,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            entrance_duration: 3.0,
            car_outside_delay: 4.0,
            car_outside_duration: 1.0,
            engine_spread: 5.0,
            final_camera_eye: Vec3::new(2.0, 2.0, 2.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutlineConfig {
    pub visible_edge_color: Vec4,
    pub hidden_edge_color: Vec4,
    pub edge_strength: f32,
    pub edge_thickness: f32,
}

impl Default for OutlineConfig {
    fn default() -> Self {
        Self {
            visible_edge_color: hex_color(0xff0000),
            hidden_edge_color: hex_color(0x190a05),
            edge_strength: 3.0,
            edge_thickness: 2.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackgroundConfig {
    pub radius: f32,
    pub width_segments: u32,
    pub height_segments: u32,
    pub clear_color: Vec4,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            radius: 500.0,
            width_segments: 60,
            height_segments: 40,
            clear_color: hex_color(0xffffff),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub assets: AssetConfig,
    pub camera: CameraConfig,
    pub animation: AnimationConfig,
    pub outline: OutlineConfig,
    pub background: BackgroundConfig,
    pub show_axes: bool,
    pub axes_length: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            assets: AssetConfig::default(),
            camera: CameraConfig::default(),
            animation: AnimationConfig::default(),
            outline: OutlineConfig::default(),
            background: BackgroundConfig::default(),
            show_axes: true,
            axes_length: 5.0,
        }
    }
}

/// Converts a `0xRRGGBB` literal into linear-space RGBA with full alpha.
pub fn hex_color(hex: u32) -> Vec4 {
    let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
    Vec4::new(channel(16), channel(8), channel(0), 1.0)
}

fn srgb_to_linear(value: f32) -> f32 {
    if value <= 0.04045 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_color_extracts_channels() {
        let red = hex_color(0xff0000);
        assert_eq!(red, Vec4::new(1.0, 0.0, 0.0, 1.0));

        let white = hex_color(0xffffff);
        assert!((white.x - 1.0).abs() < 1e-6);
        assert!((white.y - 1.0).abs() < 1e-6);
        assert!((white.z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn asset_paths_are_joined_onto_directory() {
        let assets = AssetConfig {
            directory: PathBuf::from("/data"),
            ..Default::default()
        };

        assert_eq!(assets.model_path(), PathBuf::from("/data/car.glb"));
        assert_eq!(assets.background_path(), PathBuf::from("/data/bg.jpg"));
        assert_eq!(assets.shader_directory(), PathBuf::from("/data/shaders"));
    }

    #[test]
    fn reveal_timings_match_the_choreography() {
        let animation = AnimationConfig::default();
        assert_eq!(animation.car_outside_delay, 4.0);
        assert_eq!(animation.car_outside_duration, 1.0);
        assert_eq!(animation.engine_spread, 5.0);
    }
}
