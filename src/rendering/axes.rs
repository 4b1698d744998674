use bytemuck::{Pod, Zeroable};
use glam::Vec3;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct AxisVertex {
    pub position: Vec3,
    pub color: Vec3,
}

pub const AXIS_VBL: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<AxisVertex>() as wgpu::BufferAddress,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
};

/// Line list from the origin along +X (red), +Y (green) and +Z (blue).
pub fn axis_lines(length: f32) -> [AxisVertex; 6] {
    let axis = |direction: Vec3| {
        [
            AxisVertex {
                position: Vec3::ZERO,
                color: direction,
            },
            AxisVertex {
                position: direction * length,
                color: direction,
            },
        ]
    };

    let [x0, x1] = axis(Vec3::X);
    let [y0, y1] = axis(Vec3::Y);
    let [z0, z1] = axis(Vec3::Z);
    [x0, x1, y0, y1, z0, z1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_end_at_axis_length() {
        let lines = axis_lines(5.0);

        assert_eq!(lines[1].position, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(lines[3].position, Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(lines[5].position, Vec3::new(0.0, 0.0, 5.0));
        assert!(lines.iter().step_by(2).all(|vertex| vertex.position == Vec3::ZERO));
    }
}
