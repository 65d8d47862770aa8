use std::path::Path;

use crate::error::AssetError;
use crate::scene::TextureKind;

const CUBE_FACES: u32 = 6;

/// Decoded RGBA8 texels, one or six layers stacked top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TexturePixels {
    pub width: u32,
    pub height: u32,
    pub layers: u32,
    pub rgba: Vec<u8>,
}

impl TexturePixels {
    pub fn solid(color: [u8; 4], layers: u32) -> Self {
        Self {
            width: 1,
            height: 1,
            layers,
            rgba: color.repeat(layers as usize),
        }
    }

    /// Stand-in for a texture that failed to load.
    pub fn placeholder(kind: TextureKind) -> Self {
        match kind {
            TextureKind::Color => Self::solid([255, 255, 255, 255], 1),
            TextureKind::NormalMap => Self::solid([128, 128, 255, 255], 1),
            TextureKind::Cube => Self::solid([128, 128, 128, 255], CUBE_FACES),
        }
    }

    pub fn load(path: &Path, kind: TextureKind) -> Result<Self, AssetError> {
        let image = image::open(path).map_err(|source| AssetError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_image(image.to_rgba8(), kind))
    }

    /// Cube textures are expected as a vertical strip of six square faces in
    /// +X, -X, +Y, -Y, +Z, -Z order. A single square image is used for every
    /// face.
    pub fn from_image(image: image::RgbaImage, kind: TextureKind) -> Self {
        let (width, height) = image.dimensions();
        let rgba = image.into_raw();

        if kind != TextureKind::Cube {
            return Self {
                width,
                height,
                layers: 1,
                rgba,
            };
        }

        if height == width * CUBE_FACES {
            return Self {
                width,
                height: width,
                layers: CUBE_FACES,
                rgba,
            };
        }

        if width != height {
            log::warn!(
                "Cube texture is {}x{}, neither a 1x6 strip nor square",
                width,
                height
            );
            return Self::placeholder(kind);
        }

        log::warn!("Cube texture is a single {}x{} face, repeating it", width, height);
        Self {
            width,
            height,
            layers: CUBE_FACES,
            rgba: rgba.repeat(CUBE_FACES as usize),
        }
    }

    fn layer_bytes(&self) -> usize {
        (self.width * self.height * 4) as usize
    }
}

pub fn texture_format(kind: TextureKind) -> wgpu::TextureFormat {
    match kind {
        TextureKind::NormalMap => wgpu::TextureFormat::Rgba8Unorm,
        TextureKind::Color | TextureKind::Cube => wgpu::TextureFormat::Rgba8UnormSrgb,
    }
}

/// A sampled texture living in one descriptor slot.
#[derive(Debug)]
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub kind: TextureKind,
}

impl GpuTexture {
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        pixels: &TexturePixels,
        kind: TextureKind,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: pixels.width,
            height: pixels.height,
            depth_or_array_layers: pixels.layers,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(kind),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        debug_assert_eq!(pixels.rgba.len(), pixels.layer_bytes() * pixels.layers as usize);
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &pixels.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * pixels.width),
                rows_per_image: Some(pixels.height),
            },
            size,
        );

        let dimension = match kind {
            TextureKind::Cube => wgpu::TextureViewDimension::Cube,
            _ => wgpu::TextureViewDimension::D2,
        };
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(dimension),
            ..Default::default()
        });

        Self {
            texture,
            view,
            kind,
        }
    }

    /// Loads the file or falls back to the kind's placeholder.
    pub fn load_or_placeholder(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        name: &str,
        path: &Path,
        kind: TextureKind,
    ) -> Self {
        let pixels = TexturePixels::load(path, kind).unwrap_or_else(|err| {
            log::warn!("Texture '{}' uses a placeholder: {}", name, err);
            TexturePixels::placeholder(kind)
        });
        log::debug!(
            "Texture '{}': {}x{} x{} layers",
            name,
            pixels.width,
            pixels.height,
            pixels.layers
        );
        Self::upload(device, queue, name, &pixels, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_match_their_kind() {
        assert_eq!(
            TexturePixels::placeholder(TextureKind::NormalMap).rgba,
            vec![128, 128, 255, 255]
        );
        let cube = TexturePixels::placeholder(TextureKind::Cube);
        assert_eq!(cube.layers, 6);
        assert_eq!(cube.rgba.len(), 24);
    }

    #[test]
    fn vertical_strip_becomes_six_faces() {
        let strip = image::RgbaImage::from_pixel(4, 24, image::Rgba([1, 2, 3, 4]));
        let pixels = TexturePixels::from_image(strip, TextureKind::Cube);
        assert_eq!((pixels.width, pixels.height, pixels.layers), (4, 4, 6));
        assert_eq!(pixels.rgba.len(), 4 * 4 * 4 * 6);
    }

    #[test]
    fn odd_cube_image_is_repeated_per_face() {
        let square = image::RgbaImage::from_pixel(2, 2, image::Rgba([9, 9, 9, 255]));
        let pixels = TexturePixels::from_image(square, TextureKind::Cube);
        assert_eq!((pixels.width, pixels.height, pixels.layers), (2, 2, 6));
        assert_eq!(pixels.rgba.len(), 2 * 2 * 4 * 6);

        let wide = image::RgbaImage::from_pixel(3, 2, image::Rgba([9, 9, 9, 255]));
        let pixels = TexturePixels::from_image(wide, TextureKind::Cube);
        assert_eq!(pixels, TexturePixels::placeholder(TextureKind::Cube));
    }

    #[test]
    fn missing_file_is_an_image_error() {
        let err = TexturePixels::load(Path::new("no/such/texture.png"), TextureKind::Color)
            .unwrap_err();
        assert!(matches!(err, AssetError::Image { .. }));
    }

    #[test]
    fn normal_maps_stay_linear() {
        assert!(!texture_format(TextureKind::NormalMap).is_srgb());
        assert!(texture_format(TextureKind::Color).is_srgb());
    }
}
