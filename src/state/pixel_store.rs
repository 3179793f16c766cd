//! Pixel transfer parameters

use crate::backend::traits::Device;
use crate::backend::types::PixelStoreParameter;
use crate::context::RenderingContext;
use crate::error::Result;

macro_rules! pixel_store_accessors {
    ($($(#[$meta:meta])* $getter:ident, $setter:ident: $param:ident;)+) => {
        $(
            $(#[$meta])*
            pub fn $getter(&mut self) -> Result<i32> {
                self.pixel_store(PixelStoreParameter::$param)
            }

            pub fn $setter(&mut self, value: i32) -> Result<()> {
                self.set_pixel_store(PixelStoreParameter::$param, value)
            }
        )+
    };
}

impl<D: Device> RenderingContext<D> {
    pub fn pixel_store(&mut self, param: PixelStoreParameter) -> Result<i32> {
        if let Some(value) = self.state.pixel_store[param.index()].get() {
            return Ok(value);
        }
        let value = self.device.get_parameter_i32(param.to_raw());
        Ok(self.state.pixel_store[param.index()].store(value))
    }

    pub fn set_pixel_store(&mut self, param: PixelStoreParameter, value: i32) -> Result<()> {
        if self.elides("pixel_store", &self.state.pixel_store[param.index()], value) {
            return Ok(());
        }
        self.device.pixel_store_i32(param.to_raw(), value);
        self.state.pixel_store[param.index()].store(value);
        Ok(())
    }

    pixel_store_accessors! {
        /// Row alignment of data read back from the device
        pack_alignment, set_pack_alignment: PackAlignment;
        pack_row_length, set_pack_row_length: PackRowLength;
        pack_skip_pixels, set_pack_skip_pixels: PackSkipPixels;
        pack_skip_rows, set_pack_skip_rows: PackSkipRows;
        /// Row alignment of data uploaded to the device
        unpack_alignment, set_unpack_alignment: UnpackAlignment;
        unpack_row_length, set_unpack_row_length: UnpackRowLength;
        unpack_image_height, set_unpack_image_height: UnpackImageHeight;
        unpack_skip_pixels, set_unpack_skip_pixels: UnpackSkipPixels;
        unpack_skip_rows, set_unpack_skip_rows: UnpackSkipRows;
        unpack_skip_images, set_unpack_skip_images: UnpackSkipImages;
    }

    pub fn unpack_flip_y(&mut self) -> Result<bool> {
        Ok(self.pixel_store(PixelStoreParameter::UnpackFlipY)? != 0)
    }

    pub fn set_unpack_flip_y(&mut self, flip: bool) -> Result<()> {
        self.set_pixel_store(PixelStoreParameter::UnpackFlipY, flip as i32)
    }

    pub fn unpack_premultiply_alpha(&mut self) -> Result<bool> {
        Ok(self.pixel_store(PixelStoreParameter::UnpackPremultiplyAlpha)? != 0)
    }

    pub fn set_unpack_premultiply_alpha(&mut self, premultiply: bool) -> Result<()> {
        self.set_pixel_store(PixelStoreParameter::UnpackPremultiplyAlpha, premultiply as i32)
    }

    /// `BROWSER_DEFAULT_WEBGL` or `NONE`
    pub fn unpack_colorspace_conversion(&mut self) -> Result<u32> {
        Ok(self.pixel_store(PixelStoreParameter::UnpackColorspaceConversion)? as u32)
    }

    pub fn set_unpack_colorspace_conversion(&mut self, conversion: u32) -> Result<()> {
        self.set_pixel_store(
            PixelStoreParameter::UnpackColorspaceConversion,
            conversion as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::{consts, DeviceCall, RecordingDevice};
    use crate::RenderingContext;

    #[test]
    fn test_alignment_defaults_and_write_through() {
        let mut ctx = RenderingContext::new(RecordingDevice::new());
        assert_eq!(ctx.unpack_alignment().unwrap(), 4);
        assert_eq!(ctx.pack_alignment().unwrap(), 4);

        ctx.set_unpack_alignment(1).unwrap();
        ctx.set_unpack_alignment(1).unwrap();
        assert_eq!(
            ctx.device().writes().cloned().collect::<Vec<_>>(),
            vec![DeviceCall::PixelStore {
                pname: consts::UNPACK_ALIGNMENT,
                value: 1
            }]
        );
        assert_eq!(
            ctx.device().parameter(consts::UNPACK_ALIGNMENT),
            Some(&[1.0][..])
        );
    }

    #[test]
    fn test_flags_and_colorspace() {
        let mut ctx = RenderingContext::new(RecordingDevice::new());
        assert!(!ctx.unpack_flip_y().unwrap());
        assert_eq!(
            ctx.unpack_colorspace_conversion().unwrap(),
            consts::BROWSER_DEFAULT_WEBGL
        );
        ctx.set_unpack_flip_y(true).unwrap();
        ctx.set_unpack_premultiply_alpha(true).unwrap();
        assert!(ctx.unpack_flip_y().unwrap());
        assert!(ctx.unpack_premultiply_alpha().unwrap());
        assert_eq!(ctx.device().writes().count(), 2);
    }
}
