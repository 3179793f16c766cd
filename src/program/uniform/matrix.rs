//! Float matrix uniforms

use crate::backend::traits::{Device, UniformLocation};
use crate::context::RenderingContext;
use crate::error::Result;
use crate::program::variable::{Variable, VariableInfo};

use super::{activate, check_array, mismatch, UniformValue};

matrix_uniform! {
    /// `mat2`
    Mat2Uniform {
        expects: "mat2",
        tuple: Mat2(m) => m.to_cols_array(),
        entry: uniform_matrix_2_f32_slice,
        elements: 4,
    }
}

matrix_uniform! {
    /// `mat3`
    Mat3Uniform {
        expects: "mat3",
        tuple: Mat3(m) => m.to_cols_array(),
        entry: uniform_matrix_3_f32_slice,
        elements: 9,
    }
}

matrix_uniform! {
    /// `mat4`
    Mat4Uniform {
        expects: "mat4",
        tuple: Mat4(m) => m.to_cols_array(),
        entry: uniform_matrix_4_f32_slice,
        elements: 16,
    }
}

matrix_uniform! {
    /// `mat2x3`: two columns of three
    Mat2x3Uniform {
        expects: "mat2x3",
        tuple: Mat2x3(m) => *m,
        entry: uniform_matrix_2x3_f32_slice,
        elements: 6,
    }
}

matrix_uniform! {
    /// `mat2x4`
    Mat2x4Uniform {
        expects: "mat2x4",
        tuple: Mat2x4(m) => *m,
        entry: uniform_matrix_2x4_f32_slice,
        elements: 8,
    }
}

matrix_uniform! {
    /// `mat3x2`
    Mat3x2Uniform {
        expects: "mat3x2",
        tuple: Mat3x2(m) => *m,
        entry: uniform_matrix_3x2_f32_slice,
        elements: 6,
    }
}

matrix_uniform! {
    /// `mat3x4`
    Mat3x4Uniform {
        expects: "mat3x4",
        tuple: Mat3x4(m) => *m,
        entry: uniform_matrix_3x4_f32_slice,
        elements: 12,
    }
}

matrix_uniform! {
    /// `mat4x2`
    Mat4x2Uniform {
        expects: "mat4x2",
        tuple: Mat4x2(m) => *m,
        entry: uniform_matrix_4x2_f32_slice,
        elements: 8,
    }
}

matrix_uniform! {
    /// `mat4x3`
    Mat4x3Uniform {
        expects: "mat4x3",
        tuple: Mat4x3(m) => *m,
        entry: uniform_matrix_4x3_f32_slice,
        elements: 12,
    }
}

#[cfg(test)]
mod tests {
    use glam::Mat4;

    use super::*;
    use crate::backend::{consts, DeviceCall, RecordingDevice, UniformData};
    use crate::error::Error;
    use crate::program::uniform::ArrayView;

    fn setup(type_tag: u32, size: u32) -> (RenderingContext<RecordingDevice>, VariableInfo) {
        let mut device = RecordingDevice::new();
        let program = device.create_program().unwrap();
        device.link_program(program);
        let mut ctx = RenderingContext::new(device);
        ctx.bind_program(Some(program));
        ctx.device_mut().clear_calls();
        let info = VariableInfo {
            name: "u_matrix".to_string(),
            type_tag,
            size,
            program,
        };
        (ctx, info)
    }

    #[test]
    fn test_mat4_value_is_column_major() {
        let (mut ctx, info) = setup(consts::FLOAT_MAT4, 1);
        let mut uniform = Mat4Uniform::new(info, UniformLocation(0));
        let matrix = Mat4::from_translation(glam::Vec3::new(1.0, 2.0, 3.0));
        uniform.set_value(&mut ctx, matrix.into()).unwrap();

        assert_eq!(
            ctx.device().calls(),
            &[DeviceCall::Uniform {
                entry: "uniform_matrix_4_f32_slice",
                location: UniformLocation(0),
                transpose: Some(false),
                data: UniformData::F32(matrix.to_cols_array().to_vec()),
                window: Some((0, 0)),
            }]
        );
        assert!(!uniform.is_transposed());
    }

    #[test]
    fn test_transposed_array_with_window() {
        let (mut ctx, info) = setup(consts::FLOAT_MAT3X2, 3);
        let mut uniform = Mat3x2Uniform::new(info, UniformLocation(5));
        let view = ArrayView::new(vec![0.5f32; 24]).window(6, 12).transposed(true);
        uniform
            .set_value(&mut ctx, UniformValue::FloatArray(view.clone()))
            .unwrap();

        assert!(matches!(
            &ctx.device().calls()[0],
            DeviceCall::Uniform {
                entry: "uniform_matrix_3x2_f32_slice",
                transpose: Some(true),
                window: Some((6, 12)),
                ..
            }
        ));
        assert!(uniform.is_transposed());
        assert_eq!(uniform.value(), Some(&UniformValue::FloatArray(view)));
    }

    #[test]
    fn test_length_not_multiple_of_elements() {
        let (mut ctx, info) = setup(consts::FLOAT_MAT4, 2);
        let mut uniform = Mat4Uniform::new(info, UniformLocation(0));
        let err = uniform
            .set_value(&mut ctx, vec![1.0f32; 17].into())
            .unwrap_err();
        assert!(matches!(err, Error::ValueShape { ref variable, .. } if variable == "u_matrix"));
        assert!(ctx.device().calls().is_empty());
    }

    #[test]
    fn test_window_out_of_bounds() {
        let (mut ctx, info) = setup(consts::FLOAT_MAT2, 4);
        let mut uniform = Mat2Uniform::new(info, UniformLocation(0));
        let view = ArrayView::new(vec![0.0f32; 8]).window(4, 8);
        let err = uniform
            .set_value(&mut ctx, UniformValue::FloatArray(view))
            .unwrap_err();
        assert!(matches!(err, Error::ValueShape { .. }));
        assert!(ctx.device().calls().is_empty());
    }

    #[test]
    fn test_integer_array_rejected() {
        let (mut ctx, info) = setup(consts::FLOAT_MAT2, 1);
        let mut uniform = Mat2Uniform::new(info, UniformLocation(0));
        let err = uniform
            .set_value(&mut ctx, vec![1i32, 0, 0, 1].into())
            .unwrap_err();
        assert!(matches!(err, Error::ValueType { expected: "mat2", found: "int[]", .. }));
    }
}
