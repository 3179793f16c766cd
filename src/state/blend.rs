//! Blend state

use crate::backend::consts;
use crate::backend::traits::Device;
use crate::backend::types::{BlendEquation, BlendFactor};
use crate::context::RenderingContext;
use crate::error::Result;

impl<D: Device> RenderingContext<D> {
    state_property! {
        /// Constant blend color
        blend_color, set_blend_color: [f32; 4] => blend_color;
        read |device| {
            let mut color = [0.0; 4];
            device.get_parameter_f32_slice(consts::BLEND_COLOR, &mut color);
            color
        };
        write |device, color| device.blend_color(color[0], color[1], color[2], color[3]);
    }

    state_getter! {
        blend_equation_rgb: BlendEquation => blend_equation_rgb;
        read |device| BlendEquation::from_raw(device.get_parameter_i32(consts::BLEND_EQUATION_RGB) as u32)?;
    }

    state_getter! {
        blend_equation_alpha: BlendEquation => blend_equation_alpha;
        read |device| BlendEquation::from_raw(device.get_parameter_i32(consts::BLEND_EQUATION_ALPHA) as u32)?;
    }

    state_getter! {
        blend_src_rgb: BlendFactor => blend_src_rgb;
        read |device| BlendFactor::from_raw(device.get_parameter_i32(consts::BLEND_SRC_RGB) as u32)?;
    }

    state_getter! {
        blend_dst_rgb: BlendFactor => blend_dst_rgb;
        read |device| BlendFactor::from_raw(device.get_parameter_i32(consts::BLEND_DST_RGB) as u32)?;
    }

    state_getter! {
        blend_src_alpha: BlendFactor => blend_src_alpha;
        read |device| BlendFactor::from_raw(device.get_parameter_i32(consts::BLEND_SRC_ALPHA) as u32)?;
    }

    state_getter! {
        blend_dst_alpha: BlendFactor => blend_dst_alpha;
        read |device| BlendFactor::from_raw(device.get_parameter_i32(consts::BLEND_DST_ALPHA) as u32)?;
    }

    pub fn set_blend_equation_rgb(&mut self, equation: BlendEquation) -> Result<()> {
        if self.elides("blend_equation_rgb", &self.state.blend_equation_rgb, equation) {
            return Ok(());
        }
        let alpha = self.blend_equation_alpha()?;
        self.write_blend_equation(equation, alpha);
        Ok(())
    }

    pub fn set_blend_equation_alpha(&mut self, equation: BlendEquation) -> Result<()> {
        if self.elides("blend_equation_alpha", &self.state.blend_equation_alpha, equation) {
            return Ok(());
        }
        let rgb = self.blend_equation_rgb()?;
        self.write_blend_equation(rgb, equation);
        Ok(())
    }

    /// Same equation for color and alpha
    pub fn set_blend_equation(&mut self, equation: BlendEquation) -> Result<()> {
        if self.elides("blend_equation_rgb", &self.state.blend_equation_rgb, equation)
            && self.elides("blend_equation_alpha", &self.state.blend_equation_alpha, equation)
        {
            return Ok(());
        }
        self.write_blend_equation(equation, equation);
        Ok(())
    }

    fn write_blend_equation(&mut self, rgb: BlendEquation, alpha: BlendEquation) {
        self.device
            .blend_equation_separate(rgb.to_raw(), alpha.to_raw());
        self.state.blend_equation_rgb.store(rgb);
        self.state.blend_equation_alpha.store(alpha);
    }

    pub fn set_blend_src_rgb(&mut self, factor: BlendFactor) -> Result<()> {
        if self.elides("blend_src_rgb", &self.state.blend_src_rgb, factor) {
            return Ok(());
        }
        let dst_rgb = self.blend_dst_rgb()?;
        let src_alpha = self.blend_src_alpha()?;
        let dst_alpha = self.blend_dst_alpha()?;
        self.write_blend_func(factor, dst_rgb, src_alpha, dst_alpha);
        Ok(())
    }

    pub fn set_blend_dst_rgb(&mut self, factor: BlendFactor) -> Result<()> {
        if self.elides("blend_dst_rgb", &self.state.blend_dst_rgb, factor) {
            return Ok(());
        }
        let src_rgb = self.blend_src_rgb()?;
        let src_alpha = self.blend_src_alpha()?;
        let dst_alpha = self.blend_dst_alpha()?;
        self.write_blend_func(src_rgb, factor, src_alpha, dst_alpha);
        Ok(())
    }

    pub fn set_blend_src_alpha(&mut self, factor: BlendFactor) -> Result<()> {
        if self.elides("blend_src_alpha", &self.state.blend_src_alpha, factor) {
            return Ok(());
        }
        let src_rgb = self.blend_src_rgb()?;
        let dst_rgb = self.blend_dst_rgb()?;
        let dst_alpha = self.blend_dst_alpha()?;
        self.write_blend_func(src_rgb, dst_rgb, factor, dst_alpha);
        Ok(())
    }

    pub fn set_blend_dst_alpha(&mut self, factor: BlendFactor) -> Result<()> {
        if self.elides("blend_dst_alpha", &self.state.blend_dst_alpha, factor) {
            return Ok(());
        }
        let src_rgb = self.blend_src_rgb()?;
        let dst_rgb = self.blend_dst_rgb()?;
        let src_alpha = self.blend_src_alpha()?;
        self.write_blend_func(src_rgb, dst_rgb, src_alpha, factor);
        Ok(())
    }

    /// Same factors for color and alpha
    pub fn set_blend_func(&mut self, src: BlendFactor, dst: BlendFactor) -> Result<()> {
        self.set_blend_func_separate(src, dst, src, dst)
    }

    pub fn set_blend_func_separate(
        &mut self,
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    ) -> Result<()> {
        let cached = [
            self.state.blend_src_rgb.get(),
            self.state.blend_dst_rgb.get(),
            self.state.blend_src_alpha.get(),
            self.state.blend_dst_alpha.get(),
        ];
        if self.config.elide_redundant_state
            && cached == [Some(src_rgb), Some(dst_rgb), Some(src_alpha), Some(dst_alpha)]
        {
            log::trace!("{}: elided blend_func_separate", self.config.label);
            return Ok(());
        }
        self.write_blend_func(src_rgb, dst_rgb, src_alpha, dst_alpha);
        Ok(())
    }

    fn write_blend_func(
        &mut self,
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    ) {
        self.device.blend_func_separate(
            src_rgb.to_raw(),
            dst_rgb.to_raw(),
            src_alpha.to_raw(),
            dst_alpha.to_raw(),
        );
        self.state.blend_src_rgb.store(src_rgb);
        self.state.blend_dst_rgb.store(dst_rgb);
        self.state.blend_src_alpha.store(src_alpha);
        self.state.blend_dst_alpha.store(dst_alpha);
    }
}
