use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3, Vec4};
use gltf::buffer;
use image::RgbaImage;
use itertools::izip;

use crate::math::bounds::AABB;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex_coords: Vec2,
}

#[derive(Debug, Clone)]
pub struct MaterialData {
    pub base_color_factor: Vec4,
    pub base_color_texture: Option<Arc<RgbaImage>>,
}

impl Default for MaterialData {
    fn default() -> Self {
        Self {
            base_color_factor: Vec4::ONE,
            base_color_texture: None,
        }
    }
}

pub struct ModelPrimitive {
    pub index: usize,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub material: MaterialData,
}

impl ModelPrimitive {
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).map(|triangle| {
            [
                self.vertices[triangle[0] as usize].position,
                self.vertices[triangle[1] as usize].position,
                self.vertices[triangle[2] as usize].position,
            ]
        })
    }
}

pub struct Model {
    pub name: String,
    pub primitives: Vec<ModelPrimitive>,
    /// Bounds in the model's local space.
    pub bounds: AABB,
}

pub type Buffers<'a> = &'a [buffer::Data];

/// Images from the glTF file, converted to RGBA8. `None` for formats we can't display.
pub type Images<'a> = &'a [Option<Arc<RgbaImage>>];

impl Model {
    pub fn new(name: impl Into<String>, primitives: Vec<ModelPrimitive>) -> anyhow::Result<Model> {
        let name = name.into();

        let bounds = AABB::from_points(
            primitives
                .iter()
                .flat_map(|primitive| primitive.vertices.iter().map(|vertex| vertex.position)),
        )
        .ok_or_else(|| anyhow::anyhow!("Mesh without vertices: {}", name))?;

        Ok(Model {
            name,
            primitives,
            bounds,
        })
    }

    /// `None` if the mesh has no triangle primitives to draw.
    pub fn from_gltf(
        name: impl Into<String>,
        mesh: gltf::Mesh,
        buffers: Buffers,
        images: Images,
    ) -> anyhow::Result<Option<Model>> {
        let name = name.into();
        let mut primitives = Vec::new();

        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!(
                    "Skipping primitive {} of {}: unsupported mode {:?}",
                    primitive.index(),
                    name,
                    primitive.mode()
                );
                continue;
            }

            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

            let positions = reader
                .read_positions()
                .ok_or_else(|| anyhow::anyhow!("Primitive without positions in {}", name))?
                .map(Vec3::from)
                .collect::<Vec<Vec3>>();

            let indices = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect::<Vec<u32>>(),
                None => (0..positions.len() as u32).collect(),
            };

            let normals = match reader.read_normals() {
                Some(normals) => normals.map(Vec3::from).collect::<Vec<Vec3>>(),
                None => compute_normals(&positions, &indices),
            };

            let tex_coords = match reader.read_tex_coords(0) {
                Some(tex_coords) => tex_coords.into_f32().map(Vec2::from).collect::<Vec<Vec2>>(),
                None => vec![Vec2::ZERO; positions.len()],
            };

            let vertices = izip!(positions, normals, tex_coords)
                .map(|(position, normal, tex_coords)| Vertex {
                    position,
                    normal,
                    tex_coords,
                })
                .collect::<Vec<Vertex>>();

            let pbr = primitive.material().pbr_metallic_roughness();
            let material = MaterialData {
                base_color_factor: Vec4::from(pbr.base_color_factor()),
                base_color_texture: pbr
                    .base_color_texture()
                    .and_then(|info| images.get(info.texture().source().index()).cloned())
                    .flatten(),
            };

            primitives.push(ModelPrimitive {
                index: primitive.index(),
                vertices,
                indices,
                material,
            });
        }

        if primitives.is_empty() {
            log::warn!("Skipping mesh {}: no triangle primitives", name);
            return Ok(None);
        }

        Model::new(name, primitives).map(Some)
    }
}

fn compute_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];

    for triangle in indices.chunks_exact(3) {
        let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|index| index as usize);
        let face_normal = (positions[b] - positions[a]).cross(positions[c] - positions[a]);

        normals[a] += face_normal;
        normals[b] += face_normal;
        normals[c] += face_normal;
    }

    normals
        .into_iter()
        .map(|normal| normal.try_normalize().unwrap_or(Vec3::Y))
        .collect()
}

/// Converts a decoded glTF image to RGBA8.
pub fn image_to_rgba(data: &gltf::image::Data) -> Option<RgbaImage> {
    use gltf::image::Format;

    let pixels: Vec<u8> = match data.format {
        Format::R8G8B8A8 => data.pixels.clone(),
        Format::R8G8B8 => data
            .pixels
            .chunks_exact(3)
            .flat_map(|rgb| [rgb[0], rgb[1], rgb[2], 255])
            .collect(),
        Format::R8G8 => data
            .pixels
            .chunks_exact(2)
            .flat_map(|rg| [rg[0], rg[1], 0, 255])
            .collect(),
        Format::R8 => data
            .pixels
            .iter()
            .flat_map(|&r| [r, r, r, 255])
            .collect(),
        other => {
            log::warn!("Unsupported glTF image format {:?}", other);
            return None;
        }
    };

    RgbaImage::from_raw(data.width, data.height, pixels)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// An axis-aligned quad facing +Z, centered on the origin.
    pub(crate) fn quad_model(name: &str, half_size: f32) -> Model {
        let corners = [
            Vec3::new(-half_size, -half_size, 0.0),
            Vec3::new(half_size, -half_size, 0.0),
            Vec3::new(half_size, half_size, 0.0),
            Vec3::new(-half_size, half_size, 0.0),
        ];

        let vertices = corners
            .iter()
            .map(|&position| Vertex {
                position,
                normal: Vec3::Z,
                tex_coords: Vec2::ZERO,
            })
            .collect();

        let primitive = ModelPrimitive {
            index: 0,
            vertices,
            indices: vec![0, 1, 2, 0, 2, 3],
            material: MaterialData::default(),
        };

        Model::new(name, vec![primitive]).unwrap()
    }

    #[test]
    fn bounds_cover_all_vertices() {
        let model = quad_model("quad", 2.0);
        assert_eq!(model.bounds.min, Vec3::new(-2.0, -2.0, 0.0));
        assert_eq!(model.bounds.max, Vec3::new(2.0, 2.0, 0.0));
    }

    #[test]
    fn triangles_follow_indices() {
        let model = quad_model("quad", 1.0);
        let triangles = model.primitives[0].triangles().collect::<Vec<_>>();

        assert_eq!(triangles.len(), 2);
        assert_eq!(triangles[1][2], Vec3::new(-1.0, 1.0, 0.0));
    }

    #[test]
    fn model_without_vertices_is_rejected() {
        assert!(Model::new("empty", Vec::new()).is_err());
    }

    #[test]
    fn computed_normals_face_out_of_counter_clockwise_triangles() {
        let positions = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let normals = compute_normals(&positions, &[0, 1, 2]);

        assert!(normals.iter().all(|normal| (*normal - Vec3::Z).length() < 1e-6));
    }

    #[test]
    fn rgb_images_gain_opaque_alpha() {
        let data = gltf::image::Data {
            pixels: vec![10, 20, 30, 40, 50, 60],
            format: gltf::image::Format::R8G8B8,
            width: 2,
            height: 1,
        };

        let image = image_to_rgba(&data).unwrap();
        assert_eq!(image.get_pixel(1, 0).0, [40, 50, 60, 255]);
    }
}
