//! Scalar and vector uniforms
//!
//! Booleans travel through the integer entry points as 0 or 1.

use crate::backend::traits::{Device, UniformLocation};
use crate::context::RenderingContext;
use crate::error::Result;
use crate::program::variable::{Variable, VariableInfo};

use super::{activate, check_array, mismatch, UniformValue};

// ============================================================================
// Float
// ============================================================================

vector_uniform! {
    /// `float`
    FloatUniform {
        expects: "float",
        tuple: Float(x) => uniform_1_f32(x),
        array: FloatArray => uniform_1_f32_slice,
        components: 1,
    }
}

vector_uniform! {
    /// `vec2`
    FloatVec2Uniform {
        expects: "vec2",
        tuple: Vec2(v) => uniform_2_f32(v.x, v.y),
        array: FloatArray => uniform_2_f32_slice,
        components: 2,
    }
}

vector_uniform! {
    /// `vec3`
    FloatVec3Uniform {
        expects: "vec3",
        tuple: Vec3(v) => uniform_3_f32(v.x, v.y, v.z),
        array: FloatArray => uniform_3_f32_slice,
        components: 3,
    }
}

vector_uniform! {
    /// `vec4`
    FloatVec4Uniform {
        expects: "vec4",
        tuple: Vec4(v) => uniform_4_f32(v.x, v.y, v.z, v.w),
        array: FloatArray => uniform_4_f32_slice,
        components: 4,
    }
}

// ============================================================================
// Int
// ============================================================================

vector_uniform! {
    /// `int`
    IntUniform {
        expects: "int",
        tuple: Int(x) => uniform_1_i32(x),
        array: IntArray => uniform_1_i32_slice,
        components: 1,
    }
}

vector_uniform! {
    /// `ivec2`
    IntVec2Uniform {
        expects: "ivec2",
        tuple: IVec2(v) => uniform_2_i32(v.x, v.y),
        array: IntArray => uniform_2_i32_slice,
        components: 2,
    }
}

vector_uniform! {
    /// `ivec3`
    IntVec3Uniform {
        expects: "ivec3",
        tuple: IVec3(v) => uniform_3_i32(v.x, v.y, v.z),
        array: IntArray => uniform_3_i32_slice,
        components: 3,
    }
}

vector_uniform! {
    /// `ivec4`
    IntVec4Uniform {
        expects: "ivec4",
        tuple: IVec4(v) => uniform_4_i32(v.x, v.y, v.z, v.w),
        array: IntArray => uniform_4_i32_slice,
        components: 4,
    }
}

// ============================================================================
// Unsigned int
// ============================================================================

vector_uniform! {
    /// `uint`
    UIntUniform {
        expects: "uint",
        tuple: UInt(x) => uniform_1_u32(x),
        array: UIntArray => uniform_1_u32_slice,
        components: 1,
    }
}

vector_uniform! {
    /// `uvec2`
    UIntVec2Uniform {
        expects: "uvec2",
        tuple: UVec2(v) => uniform_2_u32(v.x, v.y),
        array: UIntArray => uniform_2_u32_slice,
        components: 2,
    }
}

vector_uniform! {
    /// `uvec3`
    UIntVec3Uniform {
        expects: "uvec3",
        tuple: UVec3(v) => uniform_3_u32(v.x, v.y, v.z),
        array: UIntArray => uniform_3_u32_slice,
        components: 3,
    }
}

vector_uniform! {
    /// `uvec4`
    UIntVec4Uniform {
        expects: "uvec4",
        tuple: UVec4(v) => uniform_4_u32(v.x, v.y, v.z, v.w),
        array: UIntArray => uniform_4_u32_slice,
        components: 4,
    }
}

// ============================================================================
// Bool
// ============================================================================

vector_uniform! {
    /// `bool`
    BoolUniform {
        expects: "bool",
        tuple: Bool(x) => uniform_1_i32(x as i32),
        array: IntArray => uniform_1_i32_slice,
        components: 1,
    }
}

vector_uniform! {
    /// `bvec2`
    BoolVec2Uniform {
        expects: "bvec2",
        tuple: BVec2(v) => uniform_2_i32(v.x as i32, v.y as i32),
        array: IntArray => uniform_2_i32_slice,
        components: 2,
    }
}

vector_uniform! {
    /// `bvec3`
    BoolVec3Uniform {
        expects: "bvec3",
        tuple: BVec3(v) => uniform_3_i32(v.x as i32, v.y as i32, v.z as i32),
        array: IntArray => uniform_3_i32_slice,
        components: 3,
    }
}

vector_uniform! {
    /// `bvec4`
    BoolVec4Uniform {
        expects: "bvec4",
        tuple: BVec4(v) => uniform_4_i32(v.x as i32, v.y as i32, v.z as i32, v.w as i32),
        array: IntArray => uniform_4_i32_slice,
        components: 4,
    }
}
