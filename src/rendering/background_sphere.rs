use std::f32::consts::PI;
use std::sync::Arc;

use glam::{Vec2, Vec3, Vec4};
use image::RgbaImage;

use crate::{
    config::BackgroundConfig,
    model::{MaterialData, Model, ModelPrimitive, Vertex},
};

/// UV sphere matching three.js' `SphereGeometry` layout, mirrored on X so its faces point
/// inwards and the equirectangular texture reads correctly from the inside.
pub fn inverted_sphere(
    config: &BackgroundConfig,
    texture: Option<Arc<RgbaImage>>,
) -> anyhow::Result<Model> {
    let width_segments = config.width_segments.max(3);
    let height_segments = config.height_segments.max(2);
    let radius = config.radius;

    let mut vertices = Vec::new();
    let mut grid = Vec::with_capacity(height_segments as usize + 1);

    for iy in 0..=height_segments {
        let v = iy as f32 / height_segments as f32;
        let theta = v * PI;
        let mut row = Vec::with_capacity(width_segments as usize + 1);

        for ix in 0..=width_segments {
            let u = ix as f32 / width_segments as f32;
            let phi = u * PI * 2.0;

            let direction = Vec3::new(
                -phi.cos() * theta.sin(),
                theta.cos(),
                phi.sin() * theta.sin(),
            );
            let mirror = Vec3::new(-1.0, 1.0, 1.0);

            row.push(vertices.len() as u32);
            vertices.push(Vertex {
                position: direction * radius * mirror,
                normal: direction * mirror,
                tex_coords: Vec2::new(u, v),
            });
        }

        grid.push(row);
    }

    let mut indices = Vec::new();
    for iy in 0..height_segments as usize {
        for ix in 0..width_segments as usize {
            let a = grid[iy][ix + 1];
            let b = grid[iy][ix];
            let c = grid[iy + 1][ix];
            let d = grid[iy + 1][ix + 1];

            // The pole rows collapse to a point, so each only needs one triangle per quad.
            if iy != 0 {
                indices.extend([a, b, d]);
            }
            if iy != height_segments as usize - 1 {
                indices.extend([b, c, d]);
            }
        }
    }

    let primitive = ModelPrimitive {
        index: 0,
        vertices,
        indices,
        material: MaterialData {
            base_color_factor: Vec4::ONE,
            base_color_texture: texture,
        },
    };

    Model::new("Background sphere", vec![primitive])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_has_expected_topology() {
        let config = BackgroundConfig::default();
        let sphere = inverted_sphere(&config, None).unwrap();
        let primitive = &sphere.primitives[0];

        assert_eq!(primitive.vertices.len(), 61 * 41);
        assert_eq!(primitive.indices.len(), (60 * 40 * 2 - 2 * 60) * 3);
        assert!(primitive
            .vertices
            .iter()
            .all(|vertex| (vertex.position.length() - 500.0).abs() < 1e-2));
    }

    #[test]
    fn sphere_is_mirrored_on_x() {
        let config = BackgroundConfig {
            width_segments: 4,
            height_segments: 2,
            ..Default::default()
        };
        let sphere = inverted_sphere(&config, None).unwrap();

        // Equator, u = 0: three.js puts this vertex at -radius on X before mirroring.
        let equator_start = sphere.primitives[0].vertices[5];
        assert!((equator_start.position - Vec3::new(500.0, 0.0, 0.0)).length() < 1e-3);
        assert_eq!(equator_start.tex_coords, Vec2::new(0.0, 0.5));
    }
}
