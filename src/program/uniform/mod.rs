//! Uniform family
//!
//! Every uniform type the device can report maps to exactly one struct, and every struct owns
//! exactly one device entry point per value form: a tuple form for fixed-arity values and an
//! array form for [`ArrayView`]s (matrices only have the array form on the device, so their
//! fixed values go through it with an empty window). The [`Uniform`] enum is the closed set of
//! these structs, chosen once per variable from the reported type tag.

use crate::backend::consts;
use crate::backend::traits::{Device, UniformLocation};
use crate::context::RenderingContext;
use crate::error::{Error, Result};

use super::variable::{Variable, VariableInfo};

/// Leaf uniform with a tuple form and an array form
macro_rules! vector_uniform {
    (
        $(#[$meta:meta])*
        $name:ident {
            expects: $expects:literal,
            tuple: $tuple:ident($v:ident) => $entry:ident($($arg:expr),+),
            array: $array:ident => $slice:ident,
            components: $components:literal $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            info: VariableInfo,
            location: UniformLocation,
            value: Option<UniformValue>,
        }

        impl $name {
            pub(crate) fn new(info: VariableInfo, location: UniformLocation) -> Self {
                Self {
                    info,
                    location,
                    value: None,
                }
            }
        }

        impl Variable for $name {
            type Location = UniformLocation;
            type Value = UniformValue;

            fn info(&self) -> &VariableInfo {
                &self.info
            }

            fn location(&self) -> UniformLocation {
                self.location
            }

            fn value(&self) -> Option<&UniformValue> {
                self.value.as_ref()
            }

            fn set_value<D: Device>(
                &mut self,
                ctx: &mut RenderingContext<D>,
                value: UniformValue,
            ) -> Result<()> {
                match &value {
                    UniformValue::$tuple($v) => {
                        let $v = *$v;
                        activate(ctx, &self.info);
                        ctx.device.$entry(self.location, $($arg),+);
                    }
                    UniformValue::$array(view) => {
                        let (offset, length) = check_array(ctx, &self.info, view, $components)?;
                        activate(ctx, &self.info);
                        ctx.device.$slice(self.location, view.data(), offset, length);
                    }
                    other => return Err(mismatch(&self.info, $expects, other)),
                }
                self.value = Some(value);
                Ok(())
            }
        }
    };
}

/// Leaf uniform for a float matrix
macro_rules! matrix_uniform {
    (
        $(#[$meta:meta])*
        $name:ident {
            expects: $expects:literal,
            tuple: $tuple:ident($m:ident) => $columns:expr,
            entry: $entry:ident,
            elements: $elements:literal $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            info: VariableInfo,
            location: UniformLocation,
            value: Option<UniformValue>,
        }

        impl $name {
            pub(crate) fn new(info: VariableInfo, location: UniformLocation) -> Self {
                Self {
                    info,
                    location,
                    value: None,
                }
            }

            /// Whether the last assignment was row-major
            pub fn is_transposed(&self) -> bool {
                matches!(&self.value, Some(UniformValue::FloatArray(view)) if view.is_transposed())
            }
        }

        impl Variable for $name {
            type Location = UniformLocation;
            type Value = UniformValue;

            fn info(&self) -> &VariableInfo {
                &self.info
            }

            fn location(&self) -> UniformLocation {
                self.location
            }

            fn value(&self) -> Option<&UniformValue> {
                self.value.as_ref()
            }

            fn set_value<D: Device>(
                &mut self,
                ctx: &mut RenderingContext<D>,
                value: UniformValue,
            ) -> Result<()> {
                match &value {
                    UniformValue::$tuple($m) => {
                        let columns = $columns;
                        activate(ctx, &self.info);
                        ctx.device.$entry(self.location, false, &columns, 0, 0);
                    }
                    UniformValue::FloatArray(view) => {
                        let (offset, length) = check_array(ctx, &self.info, view, $elements)?;
                        activate(ctx, &self.info);
                        ctx.device.$entry(
                            self.location,
                            view.is_transposed(),
                            view.data(),
                            offset,
                            length,
                        );
                    }
                    other => return Err(mismatch(&self.info, $expects, other)),
                }
                self.value = Some(value);
                Ok(())
            }
        }
    };
}

mod matrix;
mod sampler;
mod value;
mod vector;

pub use matrix::*;
pub use sampler::SamplerUniform;
pub use value::{ArrayView, UniformValue};
pub use vector::*;

/// Make the owning program active so the write lands on it
fn activate<D: Device>(ctx: &mut RenderingContext<D>, info: &VariableInfo) {
    ctx.bind_program(Some(info.program));
}

/// Validate an array value and return the window to pass to the device
fn check_array<D: Device, T>(
    ctx: &RenderingContext<D>,
    info: &VariableInfo,
    view: &ArrayView<T>,
    tuple: usize,
) -> Result<(u32, u32)> {
    if !view.window_in_bounds() {
        if !ctx.config.check_array_windows {
            // Left for the device to reject
            return Ok((view.offset(), view.length()));
        }
        return Err(Error::shape(
            &info.name,
            format!(
                "window ({}, {}) exceeds the {} elements of the source",
                view.offset(),
                view.length(),
                view.data().len()
            ),
        ));
    }
    let count = view.window_len();
    if count == 0 || count % tuple != 0 {
        return Err(Error::shape(
            &info.name,
            format!("{count} elements is not a positive multiple of {tuple}"),
        ));
    }
    if !info.is_array() && count > tuple {
        return Err(Error::shape(
            &info.name,
            format!("{count} elements for a single value of {tuple}"),
        ));
    }
    Ok((view.offset(), view.length()))
}

fn mismatch(info: &VariableInfo, expected: &'static str, found: &UniformValue) -> Error {
    Error::ValueType {
        variable: info.name.clone(),
        expected,
        found: found.type_name(),
    }
}

/// Builds the closed uniform enum and its tag lookup from one table
macro_rules! uniform_table {
    ($($variant:ident($leaf:ident) = $($tag:path)|+;)+) => {
        /// One introspected uniform, of the type its tag reported
        #[derive(Debug, Clone)]
        pub enum Uniform {
            $($variant($leaf),)+
        }

        impl Uniform {
            /// Select the uniform type for a reported type tag
            pub(crate) fn from_info(info: VariableInfo, location: UniformLocation) -> Result<Self> {
                let type_tag = info.type_tag;
                match type_tag {
                    $($($tag)|+ => Ok(Uniform::$variant($leaf::new(info, location))),)+
                    _ => Err(Error::UnsupportedVariable {
                        name: info.name,
                        type_tag,
                    }),
                }
            }

            /// Name of the selected uniform type
            pub fn kind(&self) -> &'static str {
                match self {
                    $(Uniform::$variant(_) => stringify!($leaf),)+
                }
            }
        }

        impl Variable for Uniform {
            type Location = UniformLocation;
            type Value = UniformValue;

            fn info(&self) -> &VariableInfo {
                match self {
                    $(Uniform::$variant(uniform) => uniform.info(),)+
                }
            }

            fn location(&self) -> UniformLocation {
                match self {
                    $(Uniform::$variant(uniform) => uniform.location(),)+
                }
            }

            fn value(&self) -> Option<&UniformValue> {
                match self {
                    $(Uniform::$variant(uniform) => uniform.value(),)+
                }
            }

            fn set_value<D: Device>(
                &mut self,
                ctx: &mut RenderingContext<D>,
                value: UniformValue,
            ) -> Result<()> {
                match self {
                    $(Uniform::$variant(uniform) => uniform.set_value(ctx, value),)+
                }
            }
        }
    };
}

uniform_table! {
    Float(FloatUniform) = consts::FLOAT;
    FloatVec2(FloatVec2Uniform) = consts::FLOAT_VEC2;
    FloatVec3(FloatVec3Uniform) = consts::FLOAT_VEC3;
    FloatVec4(FloatVec4Uniform) = consts::FLOAT_VEC4;
    Int(IntUniform) = consts::INT;
    IntVec2(IntVec2Uniform) = consts::INT_VEC2;
    IntVec3(IntVec3Uniform) = consts::INT_VEC3;
    IntVec4(IntVec4Uniform) = consts::INT_VEC4;
    UInt(UIntUniform) = consts::UNSIGNED_INT;
    UIntVec2(UIntVec2Uniform) = consts::UNSIGNED_INT_VEC2;
    UIntVec3(UIntVec3Uniform) = consts::UNSIGNED_INT_VEC3;
    UIntVec4(UIntVec4Uniform) = consts::UNSIGNED_INT_VEC4;
    Bool(BoolUniform) = consts::BOOL;
    BoolVec2(BoolVec2Uniform) = consts::BOOL_VEC2;
    BoolVec3(BoolVec3Uniform) = consts::BOOL_VEC3;
    BoolVec4(BoolVec4Uniform) = consts::BOOL_VEC4;
    Mat2(Mat2Uniform) = consts::FLOAT_MAT2;
    Mat3(Mat3Uniform) = consts::FLOAT_MAT3;
    Mat4(Mat4Uniform) = consts::FLOAT_MAT4;
    Mat2x3(Mat2x3Uniform) = consts::FLOAT_MAT2X3;
    Mat2x4(Mat2x4Uniform) = consts::FLOAT_MAT2X4;
    Mat3x2(Mat3x2Uniform) = consts::FLOAT_MAT3X2;
    Mat3x4(Mat3x4Uniform) = consts::FLOAT_MAT3X4;
    Mat4x2(Mat4x2Uniform) = consts::FLOAT_MAT4X2;
    Mat4x3(Mat4x3Uniform) = consts::FLOAT_MAT4X3;
    Sampler(SamplerUniform) = consts::SAMPLER_2D
        | consts::SAMPLER_3D
        | consts::SAMPLER_CUBE
        | consts::SAMPLER_2D_SHADOW
        | consts::SAMPLER_2D_ARRAY
        | consts::SAMPLER_2D_ARRAY_SHADOW
        | consts::SAMPLER_CUBE_SHADOW
        | consts::INT_SAMPLER_2D
        | consts::INT_SAMPLER_3D
        | consts::INT_SAMPLER_CUBE
        | consts::INT_SAMPLER_2D_ARRAY
        | consts::UNSIGNED_INT_SAMPLER_2D
        | consts::UNSIGNED_INT_SAMPLER_3D
        | consts::UNSIGNED_INT_SAMPLER_CUBE
        | consts::UNSIGNED_INT_SAMPLER_2D_ARRAY;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::traits::ProgramHandle;
    use crate::backend::{DeviceCall, RecordingDevice, UniformData};

    fn info(name: &str, type_tag: u32, size: u32) -> VariableInfo {
        VariableInfo {
            name: name.to_string(),
            type_tag,
            size,
            program: ProgramHandle(1),
        }
    }

    #[test]
    fn test_unsupported_tag() {
        let err = Uniform::from_info(info("u_atomic", 0x92DB, 1), UniformLocation(0)).unwrap_err();
        assert_eq!(
            err,
            Error::UnsupportedVariable {
                name: "u_atomic".to_string(),
                type_tag: 0x92DB,
            }
        );
    }

    #[test]
    fn test_window_check_can_be_disabled() {
        let config = crate::ContextConfig {
            check_array_windows: false,
            ..Default::default()
        };
        let mut device = RecordingDevice::new();
        let program = device.create_program().unwrap();
        device.link_program(program);
        let mut ctx = RenderingContext::with_config(device, config);
        let mut uniform = Uniform::from_info(
            VariableInfo {
                program,
                ..info("u_weights", consts::FLOAT, 4)
            },
            UniformLocation(0),
        )
        .unwrap();
        let view = ArrayView::new(vec![1.0f32, 2.0]).window(1, 3);
        uniform
            .set_value(&mut ctx, UniformValue::FloatArray(view))
            .unwrap();

        // The device sees the out-of-range window and rejects it itself
        assert!(ctx.device().calls().contains(&DeviceCall::Uniform {
            entry: "uniform_1_f32_slice",
            location: UniformLocation(0),
            transpose: None,
            data: UniformData::F32(vec![1.0, 2.0]),
            window: Some((1, 3)),
        }));
        assert_eq!(ctx.device().errors().len(), 1);
    }

    #[test]
    fn test_unchecked_window_past_end_is_forwarded() {
        let config = crate::ContextConfig {
            check_array_windows: false,
            ..Default::default()
        };
        let mut device = RecordingDevice::new();
        let program = device.create_program().unwrap();
        device.link_program(program);
        let mut ctx = RenderingContext::with_config(device, config);
        let mut uniform = Uniform::from_info(
            VariableInfo {
                program,
                ..info("u_weights", consts::FLOAT_VEC2, 2)
            },
            UniformLocation(0),
        )
        .unwrap();
        let view = ArrayView::new(vec![1.0f32, 2.0]).window(5, 0);
        uniform
            .set_value(&mut ctx, UniformValue::FloatArray(view))
            .unwrap();

        assert!(ctx.device().calls().iter().any(|call| matches!(
            call,
            DeviceCall::Uniform {
                entry: "uniform_2_f32_slice",
                window: Some((5, 0)),
                ..
            }
        )));
    }

    #[test]
    fn test_checked_window_past_end_is_rejected() {
        let mut device = RecordingDevice::new();
        let program = device.create_program().unwrap();
        device.link_program(program);
        let mut ctx = RenderingContext::new(device);
        ctx.device_mut().clear_calls();
        let mut uniform = Uniform::from_info(
            VariableInfo {
                program,
                ..info("u_weights", consts::FLOAT_VEC2, 2)
            },
            UniformLocation(0),
        )
        .unwrap();
        let view = ArrayView::new(vec![1.0f32, 2.0]).window(5, 0);
        let err = uniform
            .set_value(&mut ctx, UniformValue::FloatArray(view))
            .unwrap_err();
        assert!(matches!(err, Error::ValueShape { .. }));
        assert!(ctx.device().calls().is_empty());
    }
}
