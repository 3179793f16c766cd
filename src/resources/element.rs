//! Host element types accepted by buffer and texture uploads

use bytemuck::Pod;

use crate::backend::types::DataType;

/// Plain data that can be uploaded as-is
///
/// An element is `COMPONENTS` scalars of one [`DataType`] laid out contiguously.
pub trait BufferElement: Pod {
    const DATA_TYPE: DataType;
    const COMPONENTS: u32;
}

macro_rules! scalar_element {
    ($($ty:ty => $data_type:ident),+ $(,)?) => {
        $(impl BufferElement for $ty {
            const DATA_TYPE: DataType = DataType::$data_type;
            const COMPONENTS: u32 = 1;
        })+
    };
}

scalar_element! {
    u8 => UnsignedByte,
    i8 => Byte,
    u16 => UnsignedShort,
    i16 => Short,
    u32 => UnsignedInt,
    i32 => Int,
    f32 => Float,
}

impl<T: BufferElement, const N: usize> BufferElement for [T; N] {
    const DATA_TYPE: DataType = T::DATA_TYPE;
    const COMPONENTS: u32 = T::COMPONENTS * N as u32;
}

impl BufferElement for glam::Vec2 {
    const DATA_TYPE: DataType = DataType::Float;
    const COMPONENTS: u32 = 2;
}

impl BufferElement for glam::Vec3 {
    const DATA_TYPE: DataType = DataType::Float;
    const COMPONENTS: u32 = 3;
}

impl BufferElement for glam::Vec4 {
    const DATA_TYPE: DataType = DataType::Float;
    const COMPONENTS: u32 = 4;
}

impl BufferElement for glam::Mat4 {
    const DATA_TYPE: DataType = DataType::Float;
    const COMPONENTS: u32 = 16;
}

/// Number of scalars in `data`
pub(crate) fn scalar_count<T: BufferElement>(data: &[T]) -> usize {
    data.len() * T::COMPONENTS as usize
}
