//! Caller-side uniform values

use std::sync::Arc;

use glam::{BVec2, BVec3, BVec4, IVec2, IVec3, IVec4, Mat2, Mat3, Mat4, UVec2, UVec3, UVec4, Vec2, Vec3, Vec4};

/// A shared numeric sequence with an optional `(offset, length)` window
///
/// The sequence is reference counted so the same data can be assigned to several uniforms and
/// kept as their cached value without copying. A `length` of 0 means "to the end".
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayView<T> {
    data: Arc<[T]>,
    offset: u32,
    length: u32,
    transpose: bool,
}

impl<T> ArrayView<T> {
    pub fn new(data: impl Into<Arc<[T]>>) -> Self {
        Self {
            data: data.into(),
            offset: 0,
            length: 0,
            transpose: false,
        }
    }

    /// Restrict the view to `length` elements starting at `offset`
    pub fn window(mut self, offset: u32, length: u32) -> Self {
        self.offset = offset;
        self.length = length;
        self
    }

    /// Mark matrix data as row-major
    pub fn transposed(mut self, transpose: bool) -> Self {
        self.transpose = transpose;
        self
    }

    /// The whole backing sequence, ignoring the window
    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn is_transposed(&self) -> bool {
        self.transpose
    }

    /// Elements covered by the window
    pub fn window_len(&self) -> usize {
        if self.length == 0 {
            self.data.len().saturating_sub(self.offset as usize)
        } else {
            self.length as usize
        }
    }

    /// Whether the window lies inside the backing sequence
    pub fn window_in_bounds(&self) -> bool {
        let offset = self.offset as usize;
        offset <= self.data.len() && offset + self.window_len() <= self.data.len()
    }
}

impl<T> From<Vec<T>> for ArrayView<T> {
    fn from(data: Vec<T>) -> Self {
        Self::new(data)
    }
}

impl<T: Clone> From<&[T]> for ArrayView<T> {
    fn from(data: &[T]) -> Self {
        Self::new(data)
    }
}

/// A value assignable to a uniform
///
/// Matrices are column-major. Non-square matrices are named columns x rows, as in GLSL.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Int(i32),
    IVec2(IVec2),
    IVec3(IVec3),
    IVec4(IVec4),
    UInt(u32),
    UVec2(UVec2),
    UVec3(UVec3),
    UVec4(UVec4),
    Bool(bool),
    BVec2(BVec2),
    BVec3(BVec3),
    BVec4(BVec4),
    Mat2(Mat2),
    Mat3(Mat3),
    Mat4(Mat4),
    Mat2x3([f32; 6]),
    Mat2x4([f32; 8]),
    Mat3x2([f32; 6]),
    Mat3x4([f32; 12]),
    Mat4x2([f32; 8]),
    Mat4x3([f32; 12]),
    FloatArray(ArrayView<f32>),
    IntArray(ArrayView<i32>),
    UIntArray(ArrayView<u32>),
}

impl UniformValue {
    /// GLSL-style name of the value's type, for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            UniformValue::Float(_) => "float",
            UniformValue::Vec2(_) => "vec2",
            UniformValue::Vec3(_) => "vec3",
            UniformValue::Vec4(_) => "vec4",
            UniformValue::Int(_) => "int",
            UniformValue::IVec2(_) => "ivec2",
            UniformValue::IVec3(_) => "ivec3",
            UniformValue::IVec4(_) => "ivec4",
            UniformValue::UInt(_) => "uint",
            UniformValue::UVec2(_) => "uvec2",
            UniformValue::UVec3(_) => "uvec3",
            UniformValue::UVec4(_) => "uvec4",
            UniformValue::Bool(_) => "bool",
            UniformValue::BVec2(_) => "bvec2",
            UniformValue::BVec3(_) => "bvec3",
            UniformValue::BVec4(_) => "bvec4",
            UniformValue::Mat2(_) => "mat2",
            UniformValue::Mat3(_) => "mat3",
            UniformValue::Mat4(_) => "mat4",
            UniformValue::Mat2x3(_) => "mat2x3",
            UniformValue::Mat2x4(_) => "mat2x4",
            UniformValue::Mat3x2(_) => "mat3x2",
            UniformValue::Mat3x4(_) => "mat3x4",
            UniformValue::Mat4x2(_) => "mat4x2",
            UniformValue::Mat4x3(_) => "mat4x3",
            UniformValue::FloatArray(_) => "float[]",
            UniformValue::IntArray(_) => "int[]",
            UniformValue::UIntArray(_) => "uint[]",
        }
    }

    /// True for the buffer-view forms
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            UniformValue::FloatArray(_) | UniformValue::IntArray(_) | UniformValue::UIntArray(_)
        )
    }
}

macro_rules! uniform_value_from {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(impl From<$ty> for UniformValue {
            fn from(value: $ty) -> Self {
                UniformValue::$variant(value)
            }
        })+
    };
}

uniform_value_from! {
    f32 => Float,
    Vec2 => Vec2,
    Vec3 => Vec3,
    Vec4 => Vec4,
    i32 => Int,
    IVec2 => IVec2,
    IVec3 => IVec3,
    IVec4 => IVec4,
    u32 => UInt,
    UVec2 => UVec2,
    UVec3 => UVec3,
    UVec4 => UVec4,
    bool => Bool,
    BVec2 => BVec2,
    BVec3 => BVec3,
    BVec4 => BVec4,
    Mat2 => Mat2,
    Mat3 => Mat3,
    Mat4 => Mat4,
    ArrayView<f32> => FloatArray,
    ArrayView<i32> => IntArray,
    ArrayView<u32> => UIntArray,
}

impl From<Vec<f32>> for UniformValue {
    fn from(data: Vec<f32>) -> Self {
        UniformValue::FloatArray(data.into())
    }
}

impl From<Vec<i32>> for UniformValue {
    fn from(data: Vec<i32>) -> Self {
        UniformValue::IntArray(data.into())
    }
}

impl From<Vec<u32>> for UniformValue {
    fn from(data: Vec<u32>) -> Self {
        UniformValue::UIntArray(data.into())
    }
}
