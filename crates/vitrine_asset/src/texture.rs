//! Texture decoding for plain images and equirectangular environment maps

use crate::loader::LoadError;

/// Texel storage format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexelFormat {
    /// 8-bit RGBA, one byte per component
    Rgba8,
    /// 32-bit float RGBA for HDR content
    Rgba32F,
}

impl TexelFormat {
    pub fn bytes_per_texel(&self) -> u32 {
        match self {
            TexelFormat::Rgba8 => 4,
            TexelFormat::Rgba32F => 16,
        }
    }
}

/// How the texture is meant to be sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureMapping {
    /// Standard UV lookup
    Uv,
    /// Equirectangular reflection/environment lookup
    Equirectangular,
}

/// Decoded texture ready for GPU upload
#[derive(Clone, Debug)]
pub struct TextureAsset {
    /// Raw texel data in `format` layout
    pub data: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Bytes per row (width * bytes per texel)
    pub bytes_per_row: u32,
    /// Texel layout of `data`
    pub format: TexelFormat,
    /// Whether the data uses sRGB color space
    pub srgb: bool,
    /// Intended sampling mode
    pub mapping: TextureMapping,
    /// Flip vertically at upload time. Material channel textures load
    /// with this cleared.
    pub flip_y: bool,
}

impl TextureAsset {
    /// Decode an LDR image (PNG, JPEG, BMP) into 8-bit RGBA
    pub fn decode_rgba8(data: &[u8], path: &str) -> Result<Self, LoadError> {
        let img = image::load_from_memory(data).map_err(|e| LoadError::ImageDecode {
            path: path.to_string(),
            source: e,
        })?;

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        Ok(Self {
            data: rgba.into_raw(),
            width,
            height,
            bytes_per_row: width * 4,
            format: TexelFormat::Rgba8,
            srgb: true,
            mapping: TextureMapping::Uv,
            flip_y: true,
        })
    }

    /// Decode an HDR image (EXR, Radiance HDR) into 32-bit float RGBA.
    /// The result always samples equirectangular.
    pub fn decode_rgba32f(data: &[u8], path: &str) -> Result<Self, LoadError> {
        let img = image::load_from_memory(data).map_err(|e| LoadError::ImageDecode {
            path: path.to_string(),
            source: e,
        })?;

        let rgba = img.to_rgba32f();
        let (width, height) = rgba.dimensions();
        let texels: Vec<f32> = rgba.into_raw();

        Ok(Self {
            data: bytemuck::cast_slice(&texels).to_vec(),
            width,
            height,
            bytes_per_row: width * 16,
            format: TexelFormat::Rgba32F,
            srgb: false,
            mapping: TextureMapping::Equirectangular,
            flip_y: true,
        })
    }

    pub fn with_mapping(mut self, mapping: TextureMapping) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn with_flip_y(mut self, flip_y: bool) -> Self {
        self.flip_y = flip_y;
        self
    }

    /// Create a 1x1 solid color texture (useful for defaults)
    pub fn solid_color(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            data: vec![r, g, b, a],
            width: 1,
            height: 1,
            bytes_per_row: 4,
            format: TexelFormat::Rgba8,
            srgb: true,
            mapping: TextureMapping::Uv,
            flip_y: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_decode_rgba8() {
        let bytes = png_bytes(4, 2);
        let texture = TextureAsset::decode_rgba8(&bytes, "test.png").unwrap();

        assert_eq!(texture.width, 4);
        assert_eq!(texture.height, 2);
        assert_eq!(texture.bytes_per_row, 16);
        assert_eq!(texture.format, TexelFormat::Rgba8);
        assert_eq!(texture.data.len(), 4 * 2 * 4);
        assert_eq!(&texture.data[..4], &[10, 20, 30, 255]);
        assert_eq!(texture.mapping, TextureMapping::Uv);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = TextureAsset::decode_rgba8(b"not an image", "bad.png");
        assert!(matches!(result, Err(LoadError::ImageDecode { .. })));
    }

    #[test]
    fn test_builders() {
        let texture = TextureAsset::solid_color(255, 0, 0, 255)
            .with_mapping(TextureMapping::Equirectangular)
            .with_flip_y(false);

        assert_eq!(texture.mapping, TextureMapping::Equirectangular);
        assert!(!texture.flip_y);
        assert_eq!(texture.data, vec![255, 0, 0, 255]);
    }
}
