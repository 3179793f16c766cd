//! Texture objects and pixel uploads

use image::{DynamicImage, GenericImageView};

use crate::backend::consts;
use crate::backend::traits::{Device, TextureHandle};
use crate::backend::types::{TextureFilter, TextureFormat, TextureTarget, TextureWrap};
use crate::context::RenderingContext;
use crate::error::{Error, Result};

use super::element::{scalar_count, BufferElement};

/// Texture descriptor
#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    pub label: Option<String>,
    pub target: TextureTarget,
    pub format: TextureFormat,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            target: TextureTarget::Texture2D,
            format: TextureFormat::Rgba8,
        }
    }
}

/// A device texture with a fixed internal format
#[derive(Debug)]
pub struct Texture {
    label: Option<String>,
    handle: TextureHandle,
    target: TextureTarget,
    format: TextureFormat,
    width: u32,
    height: u32,
}

impl Texture {
    pub fn new<D: Device>(ctx: &mut RenderingContext<D>, desc: &TextureDescriptor) -> Result<Self> {
        let handle = ctx.device.create_texture()?;
        log::debug!(
            "Created texture {:?} ({:?}, {:?})",
            desc.label,
            desc.target,
            desc.format
        );
        Ok(Self {
            label: desc.label.clone(),
            handle,
            target: desc.target,
            format: desc.format,
            width: 0,
            height: 0,
        })
    }

    /// Decode an encoded image (PNG, JPEG, ...) into a new texture
    pub fn from_bytes<D: Device>(
        ctx: &mut RenderingContext<D>,
        desc: &TextureDescriptor,
        bytes: &[u8],
    ) -> Result<Self> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| Error::Resource(format!("failed to decode {:?}: {e}", desc.label)))?;
        let mut texture = Self::new(ctx, desc)?;
        texture.upload_image(ctx, &image)?;
        Ok(texture)
    }

    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn target(&self) -> TextureTarget {
        self.target
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Size of level 0, `(0, 0)` before the first upload
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Bind to the texture's target on the active unit
    pub fn bind<D: Device>(&self, ctx: &mut RenderingContext<D>) {
        ctx.device.bind_texture(self.target.to_raw(), Some(self.handle));
    }

    /// Make `unit` the active unit and bind there
    pub fn bind_to_unit<D: Device>(&self, ctx: &mut RenderingContext<D>, unit: u32) {
        ctx.device.active_texture(consts::TEXTURE0 + unit);
        self.bind(ctx);
    }

    /// Replace level 0 with `width` x `height` pixels
    pub fn upload<D: Device, T: BufferElement>(
        &mut self,
        ctx: &mut RenderingContext<D>,
        width: u32,
        height: u32,
        pixels: &[T],
    ) -> Result<()> {
        if !self.format.pixel_types().contains(&T::DATA_TYPE) {
            return Err(Error::Resource(format!(
                "texture {:?} with format {:?} does not accept {} pixels",
                self.label,
                self.format,
                T::DATA_TYPE.name()
            )));
        }
        let expected = width as usize * height as usize * self.format.channels();
        if scalar_count(pixels) != expected {
            return Err(Error::Resource(format!(
                "texture {:?} expects {} components for {}x{}, got {}",
                self.label,
                expected,
                width,
                height,
                scalar_count(pixels)
            )));
        }
        let row_bytes = width as usize * self.format.channels() * T::DATA_TYPE.size();
        self.write_level(
            ctx,
            width,
            height,
            T::DATA_TYPE.to_raw(),
            Some(bytemuck::cast_slice(pixels)),
            row_bytes,
        )
    }

    /// Allocate level 0 storage without initial contents
    pub fn allocate<D: Device>(
        &mut self,
        ctx: &mut RenderingContext<D>,
        width: u32,
        height: u32,
    ) -> Result<()> {
        self.write_level(ctx, width, height, self.format.default_pixel_type(), None, 0)
    }

    /// Upload a decoded image, converting it to the texture's format
    pub fn upload_image<D: Device>(
        &mut self,
        ctx: &mut RenderingContext<D>,
        image: &DynamicImage,
    ) -> Result<()> {
        let (width, height) = image.dimensions();
        match self.format {
            TextureFormat::Rgba8 | TextureFormat::Srgb8Alpha8 | TextureFormat::Rgba8Uint => {
                self.upload(ctx, width, height, image.to_rgba8().as_raw())
            }
            TextureFormat::Rgb8 => self.upload(ctx, width, height, image.to_rgb8().as_raw()),
            TextureFormat::Rg8 => self.upload(ctx, width, height, image.to_luma_alpha8().as_raw()),
            TextureFormat::R8 => self.upload(ctx, width, height, image.to_luma8().as_raw()),
            TextureFormat::Rgba16Float | TextureFormat::Rgba32Float => {
                self.upload(ctx, width, height, image.to_rgba32f().as_raw())
            }
            other => Err(Error::Resource(format!(
                "cannot convert an image into a {other:?} texture"
            ))),
        }
    }

    fn write_level<D: Device>(
        &mut self,
        ctx: &mut RenderingContext<D>,
        width: u32,
        height: u32,
        pixel_type: u32,
        pixels: Option<&[u8]>,
        row_bytes: usize,
    ) -> Result<()> {
        if self.target != TextureTarget::Texture2D {
            return Err(Error::Resource(format!(
                "texture {:?}: only 2D textures take 2D images, not {:?}",
                self.label, self.target
            )));
        }
        let size_error = || Error::Resource(format!("texture size {width}x{height} out of range"));
        let w = i32::try_from(width).map_err(|_| size_error())?;
        let h = i32::try_from(height).map_err(|_| size_error())?;

        self.bind(ctx);
        let alignment = usize::try_from(ctx.unpack_alignment()?).unwrap_or(0);
        if alignment == 0 || row_bytes % alignment != 0 {
            ctx.set_unpack_alignment(1)?;
        }
        ctx.device.tex_image_2d(
            self.target.to_raw(),
            0,
            self.format.internal_format() as i32,
            w,
            h,
            self.format.pixel_format(),
            pixel_type,
            pixels,
        );
        self.width = width;
        self.height = height;
        Ok(())
    }

    pub fn set_filter<D: Device>(
        &self,
        ctx: &mut RenderingContext<D>,
        min: TextureFilter,
        mag: TextureFilter,
    ) {
        self.bind(ctx);
        let target = self.target.to_raw();
        ctx.device
            .tex_parameter_i32(target, consts::TEXTURE_MIN_FILTER, min.to_raw() as i32);
        ctx.device
            .tex_parameter_i32(target, consts::TEXTURE_MAG_FILTER, mag.to_raw() as i32);
    }

    pub fn set_wrap<D: Device>(&self, ctx: &mut RenderingContext<D>, s: TextureWrap, t: TextureWrap) {
        self.bind(ctx);
        let target = self.target.to_raw();
        ctx.device
            .tex_parameter_i32(target, consts::TEXTURE_WRAP_S, s.to_raw() as i32);
        ctx.device
            .tex_parameter_i32(target, consts::TEXTURE_WRAP_T, t.to_raw() as i32);
    }

    pub fn generate_mipmaps<D: Device>(&self, ctx: &mut RenderingContext<D>) {
        self.bind(ctx);
        ctx.device.generate_mipmap(self.target.to_raw());
    }

    /// Release the device texture
    pub fn delete<D: Device>(self, ctx: &mut RenderingContext<D>) {
        log::debug!("Deleting texture {:?}", self.label);
        ctx.device.delete_texture(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DeviceCall, RecordingDevice};

    fn texture(format: TextureFormat) -> (RenderingContext<RecordingDevice>, Texture) {
        let mut ctx = RenderingContext::new(RecordingDevice::new());
        let desc = TextureDescriptor {
            label: Some("test".into()),
            format,
            ..Default::default()
        };
        let texture = Texture::new(&mut ctx, &desc).unwrap();
        ctx.device_mut().clear_calls();
        (ctx, texture)
    }

    #[test]
    fn test_upload_rgba8() {
        let (mut ctx, mut tex) = texture(TextureFormat::Rgba8);
        tex.upload(&mut ctx, 2, 2, &[[255u8, 0, 0, 255]; 4]).unwrap();

        assert_eq!(tex.size(), (2, 2));
        assert_eq!(ctx.device().texture_size(tex.handle()), Some((2, 2)));
        assert_eq!(
            ctx.device().texture_internal_format(tex.handle()),
            Some(consts::RGBA8 as i32)
        );
        // Four byte rows keep the default alignment
        assert!(!ctx
            .device()
            .writes()
            .any(|c| matches!(c, DeviceCall::PixelStore { .. })));
    }

    #[test]
    fn test_upload_rejects_mismatched_pixels() {
        let (mut ctx, mut tex) = texture(TextureFormat::Rgba8);
        let err = tex.upload(&mut ctx, 2, 2, &[0.0f32; 16]).unwrap_err();
        assert!(matches!(err, Error::Resource(_)));

        let err = tex.upload(&mut ctx, 2, 2, &[0u8; 15]).unwrap_err();
        assert!(matches!(err, Error::Resource(_)));
        assert!(ctx.device().calls().is_empty());
    }

    #[test]
    fn test_odd_rows_lower_unpack_alignment() {
        let (mut ctx, mut tex) = texture(TextureFormat::Rgb8);
        tex.upload(&mut ctx, 3, 1, &[0u8; 9]).unwrap();
        assert_eq!(ctx.unpack_alignment().unwrap(), 1);

        // Already 1, so the second upload leaves pixel store alone
        ctx.device_mut().clear_calls();
        tex.upload(&mut ctx, 3, 1, &[0u8; 9]).unwrap();
        assert!(!ctx
            .device()
            .calls()
            .iter()
            .any(|c| matches!(c, DeviceCall::PixelStore { .. })));
    }

    #[test]
    fn test_rows_checked_against_mirrored_alignment() {
        let (mut ctx, mut tex) = texture(TextureFormat::Rgba8);
        ctx.set_unpack_alignment(8).unwrap();
        ctx.device_mut().clear_calls();

        // Four byte rows are not eight byte aligned
        tex.upload(&mut ctx, 1, 2, &[[0u8; 4]; 2]).unwrap();
        let writes: Vec<_> = ctx.device().writes().cloned().collect();
        let pixel_store = writes
            .iter()
            .position(|c| {
                *c == DeviceCall::PixelStore {
                    pname: consts::UNPACK_ALIGNMENT,
                    value: 1,
                }
            })
            .unwrap();
        let upload = writes
            .iter()
            .position(|c| matches!(c, DeviceCall::TexImage2D { .. }))
            .unwrap();
        assert!(pixel_store < upload);
        assert_eq!(ctx.unpack_alignment().unwrap(), 1);
    }

    #[test]
    fn test_allocate_depth_storage() {
        let (mut ctx, mut tex) = texture(TextureFormat::Depth24Stencil8);
        tex.allocate(&mut ctx, 64, 32).unwrap();
        assert!(ctx.device().calls().contains(&DeviceCall::TexImage2D {
            target: consts::TEXTURE_2D,
            level: 0,
            internal_format: consts::DEPTH24_STENCIL8 as i32,
            width: 64,
            height: 32,
            format: consts::DEPTH_STENCIL,
            ty: consts::UNSIGNED_INT_24_8,
            len: None,
        }));
    }

    #[test]
    fn test_upload_image_converts() {
        let (mut ctx, mut tex) = texture(TextureFormat::R8);
        let image = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            4,
            4,
            image::Rgba([255, 255, 255, 255]),
        ));
        tex.upload_image(&mut ctx, &image).unwrap();
        assert_eq!(tex.size(), (4, 4));

        let (mut ctx, mut tex) = texture(TextureFormat::Depth16);
        assert!(tex.upload_image(&mut ctx, &image).is_err());
    }

    #[test]
    fn test_sampling_parameters() {
        let (mut ctx, tex) = texture(TextureFormat::Rgba8);
        tex.bind_to_unit(&mut ctx, 3);
        tex.set_filter(&mut ctx, TextureFilter::LinearMipmapLinear, TextureFilter::Linear);
        tex.set_wrap(&mut ctx, TextureWrap::ClampToEdge, TextureWrap::Repeat);
        tex.generate_mipmaps(&mut ctx);

        let device = ctx.device();
        assert_eq!(
            device.bound_texture(3, consts::TEXTURE_2D),
            Some(tex.handle())
        );
        assert_eq!(
            device.texture_parameter(tex.handle(), consts::TEXTURE_WRAP_S),
            Some(consts::CLAMP_TO_EDGE as i32)
        );
        assert!(device.texture_mipmapped(tex.handle()));
        assert!(device.errors().is_empty());
    }
}
