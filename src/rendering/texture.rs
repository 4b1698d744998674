use image::RgbaImage;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

pub struct Texture {
    _texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
}

impl Texture {
    pub fn from_wgpu_texture(texture: wgpu::Texture) -> Self {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            _texture: texture,
            view,
        }
    }

    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &RgbaImage,
        label: &str,
    ) -> Self {
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: image.width(),
                    height: image.height(),
                    depth_or_array_layers: 1,
                },
                // TODO: Generate mipmaps for the background, it shimmers at grazing angles
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            image.as_raw(),
        );

        Self::from_wgpu_texture(texture)
    }

    pub fn white(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let image = RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255]));
        Self::from_image(device, queue, &image, "White Texture")
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}

/// A screen-sized render target that is recreated whenever the window resizes.
pub struct RenderTarget {
    texture: Texture,
    label: String,
    format: wgpu::TextureFormat,
}

impl RenderTarget {
    pub fn new(
        device: &wgpu::Device,
        size: PhysicalSize<u32>,
        format: wgpu::TextureFormat,
        label: impl Into<String>,
    ) -> Self {
        let label: String = label.into();
        let texture = Self::create_wgpu_texture(device, size, format, &label);

        Self {
            texture: Texture::from_wgpu_texture(texture),
            label,
            format,
        }
    }

    fn create_wgpu_texture(
        device: &wgpu::Device,
        size: PhysicalSize<u32>,
        format: wgpu::TextureFormat,
        label: &str,
    ) -> wgpu::Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        })
    }

    pub fn resize(&mut self, device: &wgpu::Device, size: PhysicalSize<u32>) {
        self.texture = Texture::from_wgpu_texture(Self::create_wgpu_texture(
            device,
            size,
            self.format,
            &self.label,
        ));
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.texture.view
    }
}

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
pub const OUTLINE_MASK_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;
