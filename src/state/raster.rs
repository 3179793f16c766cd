//! Rasterizer and output state

use crate::backend::consts;
use crate::backend::traits::Device;
use crate::backend::types::{CullFace, FrontFace, Rect};
use crate::context::RenderingContext;
use crate::error::Result;

impl<D: Device> RenderingContext<D> {
    state_property! {
        viewport, set_viewport: Rect => viewport;
        read |device| {
            let mut rect = [0; 4];
            device.get_parameter_i32_slice(consts::VIEWPORT, &mut rect);
            Rect::from_array(rect)
        };
        write |device, rect| device.viewport(rect.x, rect.y, rect.width, rect.height);
    }

    state_property! {
        scissor_box, set_scissor_box: Rect => scissor_box;
        read |device| {
            let mut rect = [0; 4];
            device.get_parameter_i32_slice(consts::SCISSOR_BOX, &mut rect);
            Rect::from_array(rect)
        };
        write |device, rect| device.scissor(rect.x, rect.y, rect.width, rect.height);
    }

    state_property! {
        clear_color, set_clear_color: [f32; 4] => clear_color;
        read |device| {
            let mut color = [0.0; 4];
            device.get_parameter_f32_slice(consts::COLOR_CLEAR_VALUE, &mut color);
            color
        };
        write |device, color| device.clear_color(color[0], color[1], color[2], color[3]);
    }

    state_property! {
        /// Per-channel color write mask, RGBA
        color_mask, set_color_mask: [bool; 4] => color_mask;
        read |device| {
            let mut mask = [0; 4];
            device.get_parameter_i32_slice(consts::COLOR_WRITEMASK, &mut mask);
            mask.map(|channel| channel != 0)
        };
        write |device, mask| device.color_mask(mask[0], mask[1], mask[2], mask[3]);
    }

    state_property! {
        cull_face_mode, set_cull_face_mode: CullFace => cull_face_mode;
        read |device| CullFace::from_raw(device.get_parameter_i32(consts::CULL_FACE_MODE) as u32)?;
        write |device, mode| device.cull_face(mode.to_raw());
    }

    state_property! {
        front_face, set_front_face: FrontFace => front_face;
        read |device| FrontFace::from_raw(device.get_parameter_i32(consts::FRONT_FACE) as u32)?;
        write |device, mode| device.front_face(mode.to_raw());
    }

    state_property! {
        line_width, set_line_width: f32 => line_width;
        read |device| device.get_parameter_f32(consts::LINE_WIDTH);
        write |device, width| device.line_width(width);
    }

    state_getter! {
        polygon_offset_factor: f32 => polygon_offset_factor;
        read |device| device.get_parameter_f32(consts::POLYGON_OFFSET_FACTOR);
    }

    state_getter! {
        polygon_offset_units: f32 => polygon_offset_units;
        read |device| device.get_parameter_f32(consts::POLYGON_OFFSET_UNITS);
    }

    pub fn set_polygon_offset_factor(&mut self, factor: f32) -> Result<()> {
        if self.elides("polygon_offset_factor", &self.state.polygon_offset_factor, factor) {
            return Ok(());
        }
        let units = self.polygon_offset_units()?;
        self.write_polygon_offset(factor, units);
        Ok(())
    }

    pub fn set_polygon_offset_units(&mut self, units: f32) -> Result<()> {
        if self.elides("polygon_offset_units", &self.state.polygon_offset_units, units) {
            return Ok(());
        }
        let factor = self.polygon_offset_factor()?;
        self.write_polygon_offset(factor, units);
        Ok(())
    }

    fn write_polygon_offset(&mut self, factor: f32, units: f32) {
        self.device.polygon_offset(factor, units);
        self.state.polygon_offset_factor.store(factor);
        self.state.polygon_offset_units.store(units);
    }

    state_getter! {
        sample_coverage_value: f32 => sample_coverage_value;
        read |device| device.get_parameter_f32(consts::SAMPLE_COVERAGE_VALUE);
    }

    state_getter! {
        sample_coverage_invert: bool => sample_coverage_invert;
        read |device| device.get_parameter_i32(consts::SAMPLE_COVERAGE_INVERT) != 0;
    }

    pub fn set_sample_coverage_value(&mut self, value: f32) -> Result<()> {
        if self.elides("sample_coverage_value", &self.state.sample_coverage_value, value) {
            return Ok(());
        }
        let invert = self.sample_coverage_invert()?;
        self.write_sample_coverage(value, invert);
        Ok(())
    }

    pub fn set_sample_coverage_invert(&mut self, invert: bool) -> Result<()> {
        if self.elides("sample_coverage_invert", &self.state.sample_coverage_invert, invert) {
            return Ok(());
        }
        let value = self.sample_coverage_value()?;
        self.write_sample_coverage(value, invert);
        Ok(())
    }

    fn write_sample_coverage(&mut self, value: f32, invert: bool) {
        self.device.sample_coverage(value, invert);
        self.state.sample_coverage_value.store(value);
        self.state.sample_coverage_invert.store(invert);
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::types::{CullFace, Rect};
    use crate::backend::{DeviceCall, RecordingDevice};
    use crate::RenderingContext;

    #[test]
    fn test_viewport_defaults_to_drawing_buffer() {
        let mut ctx = RenderingContext::new(RecordingDevice::with_drawing_buffer_size(640, 480));
        assert_eq!(ctx.viewport().unwrap(), Rect::new(0, 0, 640, 480));
        ctx.set_viewport(Rect::new(0, 0, 640, 480)).unwrap();
        assert_eq!(ctx.device().writes().count(), 0);

        ctx.set_viewport(Rect::new(10, 10, 100, 100)).unwrap();
        assert_eq!(
            ctx.device().writes().last(),
            Some(&DeviceCall::Viewport([10, 10, 100, 100]))
        );
    }

    #[test]
    fn test_polygon_offset_units_keeps_factor() {
        let mut ctx = RenderingContext::new(RecordingDevice::new());
        ctx.set_polygon_offset_factor(2.0).unwrap();
        ctx.set_polygon_offset_units(4.0).unwrap();
        assert_eq!(
            ctx.device().writes().cloned().collect::<Vec<_>>(),
            vec![
                DeviceCall::PolygonOffset {
                    factor: 2.0,
                    units: 0.0
                },
                DeviceCall::PolygonOffset {
                    factor: 2.0,
                    units: 4.0
                },
            ]
        );
    }

    #[test]
    fn test_sample_coverage_invert_keeps_value() {
        let mut ctx = RenderingContext::new(RecordingDevice::new());
        ctx.set_sample_coverage_value(0.5).unwrap();
        ctx.set_sample_coverage_invert(true).unwrap();
        assert_eq!(
            ctx.device().writes().last(),
            Some(&DeviceCall::SampleCoverage {
                value: 0.5,
                invert: true
            })
        );
    }

    #[test]
    fn test_color_mask_and_cull_face() {
        let mut ctx = RenderingContext::new(RecordingDevice::new());
        assert_eq!(ctx.color_mask().unwrap(), [true; 4]);
        assert_eq!(ctx.cull_face_mode().unwrap(), CullFace::Back);
        ctx.set_color_mask([true, true, true, false]).unwrap();
        ctx.set_cull_face_mode(CullFace::FrontAndBack).unwrap();
        assert_eq!(ctx.device().writes().count(), 2);
        assert_eq!(ctx.color_mask().unwrap(), [true, true, true, false]);
    }
}
