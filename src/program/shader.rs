//! Shader stage compilation

use crate::backend::traits::{Device, ShaderHandle};
use crate::backend::types::ShaderStage;
use crate::context::RenderingContext;
use crate::error::{Error, Result};

/// Compile one stage, deleting the shader object again if the device rejects it
pub(crate) fn compile<D: Device>(
    ctx: &mut RenderingContext<D>,
    stage: ShaderStage,
    source: &str,
) -> Result<ShaderHandle> {
    let shader = ctx.device.create_shader(stage.to_raw())?;
    ctx.device.shader_source(shader, source);
    ctx.device.compile_shader(shader);

    if !ctx.device.shader_compile_status(shader) {
        let log = ctx.device.shader_info_log(shader);
        ctx.device.delete_shader(shader);
        log::error!("{:?} shader failed to compile: {}", stage, log);
        return Err(Error::Compile { stage, log });
    }
    Ok(shader)
}
