//! Sampler uniforms

use crate::backend::consts;
use crate::backend::traits::{Device, UniformLocation};
use crate::backend::types::TextureTarget;
use crate::context::RenderingContext;
use crate::error::Result;
use crate::program::variable::{Variable, VariableInfo};

use super::{activate, check_array, mismatch, UniformValue};

vector_uniform! {
    /// Any sampler type; the value is the texture unit it reads from
    SamplerUniform {
        expects: "texture unit",
        tuple: Int(unit) => uniform_1_i32(unit),
        array: IntArray => uniform_1_i32_slice,
        components: 1,
    }
}

impl SamplerUniform {
    /// Texture target the sampler reads
    pub fn texture_target(&self) -> Option<TextureTarget> {
        match self.info.type_tag {
            consts::SAMPLER_2D
            | consts::SAMPLER_2D_SHADOW
            | consts::INT_SAMPLER_2D
            | consts::UNSIGNED_INT_SAMPLER_2D => Some(TextureTarget::Texture2D),
            consts::SAMPLER_3D | consts::INT_SAMPLER_3D | consts::UNSIGNED_INT_SAMPLER_3D => {
                Some(TextureTarget::Texture3D)
            }
            consts::SAMPLER_CUBE
            | consts::SAMPLER_CUBE_SHADOW
            | consts::INT_SAMPLER_CUBE
            | consts::UNSIGNED_INT_SAMPLER_CUBE => Some(TextureTarget::CubeMap),
            consts::SAMPLER_2D_ARRAY
            | consts::SAMPLER_2D_ARRAY_SHADOW
            | consts::INT_SAMPLER_2D_ARRAY
            | consts::UNSIGNED_INT_SAMPLER_2D_ARRAY => Some(TextureTarget::Texture2DArray),
            _ => None,
        }
    }

    /// Unit last assigned, for single samplers
    pub fn unit(&self) -> Option<i32> {
        match self.value {
            Some(UniformValue::Int(unit)) => Some(unit),
            _ => None,
        }
    }
}
