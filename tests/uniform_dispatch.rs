//! Uniform dispatch tests.
//!
//! Every uniform type the device can report is exercised through the program surface: the
//! reported tag must select the right uniform, and each assignment must reach exactly one
//! device entry point with the location, transpose flag and window it was given.

mod common;

use glam::{BVec2, BVec3, BVec4, IVec2, IVec3, IVec4, Mat2, Mat3, Mat4, UVec2, UVec3, UVec4, Vec2, Vec3, Vec4};
use rstest::rstest;

use common::{active_program, context_with_reflection};
use graphics_binding::backend::{consts, ActiveVariable, DeviceCall, UniformData};
use graphics_binding::{ArrayView, Error, Program, UniformValue, Variable};

fn single(type_tag: u32, size: i32) -> Vec<ActiveVariable> {
    vec![ActiveVariable::new("u_value", type_tag, size)]
}

// ============================================================================
// Tuple forms
// ============================================================================

#[rstest]
#[case::float(consts::FLOAT, "FloatUniform", UniformValue::Float(0.5), "uniform_1_f32")]
#[case::vec2(consts::FLOAT_VEC2, "FloatVec2Uniform", Vec2::new(1.0, 2.0).into(), "uniform_2_f32")]
#[case::vec3(consts::FLOAT_VEC3, "FloatVec3Uniform", Vec3::ONE.into(), "uniform_3_f32")]
#[case::vec4(consts::FLOAT_VEC4, "FloatVec4Uniform", Vec4::W.into(), "uniform_4_f32")]
#[case::int(consts::INT, "IntUniform", UniformValue::Int(-3), "uniform_1_i32")]
#[case::ivec2(consts::INT_VEC2, "IntVec2Uniform", IVec2::new(1, -1).into(), "uniform_2_i32")]
#[case::ivec3(consts::INT_VEC3, "IntVec3Uniform", IVec3::ONE.into(), "uniform_3_i32")]
#[case::ivec4(consts::INT_VEC4, "IntVec4Uniform", IVec4::NEG_ONE.into(), "uniform_4_i32")]
#[case::uint(consts::UNSIGNED_INT, "UIntUniform", UniformValue::UInt(7), "uniform_1_u32")]
#[case::uvec2(consts::UNSIGNED_INT_VEC2, "UIntVec2Uniform", UVec2::new(1, 2).into(), "uniform_2_u32")]
#[case::uvec3(consts::UNSIGNED_INT_VEC3, "UIntVec3Uniform", UVec3::X.into(), "uniform_3_u32")]
#[case::uvec4(consts::UNSIGNED_INT_VEC4, "UIntVec4Uniform", UVec4::MAX.into(), "uniform_4_u32")]
#[case::bool(consts::BOOL, "BoolUniform", UniformValue::Bool(true), "uniform_1_i32")]
#[case::bvec2(consts::BOOL_VEC2, "BoolVec2Uniform", BVec2::new(true, false).into(), "uniform_2_i32")]
#[case::bvec3(consts::BOOL_VEC3, "BoolVec3Uniform", BVec3::TRUE.into(), "uniform_3_i32")]
#[case::bvec4(consts::BOOL_VEC4, "BoolVec4Uniform", BVec4::FALSE.into(), "uniform_4_i32")]
#[case::mat2(consts::FLOAT_MAT2, "Mat2Uniform", Mat2::IDENTITY.into(), "uniform_matrix_2_f32_slice")]
#[case::mat3(consts::FLOAT_MAT3, "Mat3Uniform", Mat3::IDENTITY.into(), "uniform_matrix_3_f32_slice")]
#[case::mat4(consts::FLOAT_MAT4, "Mat4Uniform", Mat4::IDENTITY.into(), "uniform_matrix_4_f32_slice")]
#[case::mat2x3(consts::FLOAT_MAT2X3, "Mat2x3Uniform", UniformValue::Mat2x3([1.0; 6]), "uniform_matrix_2x3_f32_slice")]
#[case::mat2x4(consts::FLOAT_MAT2X4, "Mat2x4Uniform", UniformValue::Mat2x4([1.0; 8]), "uniform_matrix_2x4_f32_slice")]
#[case::mat3x2(consts::FLOAT_MAT3X2, "Mat3x2Uniform", UniformValue::Mat3x2([1.0; 6]), "uniform_matrix_3x2_f32_slice")]
#[case::mat3x4(consts::FLOAT_MAT3X4, "Mat3x4Uniform", UniformValue::Mat3x4([1.0; 12]), "uniform_matrix_3x4_f32_slice")]
#[case::mat4x2(consts::FLOAT_MAT4X2, "Mat4x2Uniform", UniformValue::Mat4x2([1.0; 8]), "uniform_matrix_4x2_f32_slice")]
#[case::mat4x3(consts::FLOAT_MAT4X3, "Mat4x3Uniform", UniformValue::Mat4x3([1.0; 12]), "uniform_matrix_4x3_f32_slice")]
#[case::sampler_2d(consts::SAMPLER_2D, "SamplerUniform", UniformValue::Int(2), "uniform_1_i32")]
#[case::usampler_3d(consts::UNSIGNED_INT_SAMPLER_3D, "SamplerUniform", UniformValue::Int(5), "uniform_1_i32")]
fn test_tuple_value_issues_one_call(
    #[case] type_tag: u32,
    #[case] kind: &str,
    #[case] value: UniformValue,
    #[case] entry: &str,
) {
    let mut ctx = context_with_reflection(Vec::new(), single(type_tag, 1));
    let mut program = active_program(&mut ctx, "tuple");
    let uniform = program.uniform_mut("u_value").expect("uniform should be introspected");
    assert_eq!(uniform.kind(), kind);
    let location = uniform.location();

    uniform.set_value(&mut ctx, value.clone()).unwrap();

    let calls = ctx.device().calls();
    assert_eq!(calls.len(), 1, "{calls:?}");
    match &calls[0] {
        DeviceCall::Uniform {
            entry: called,
            location: at,
            transpose,
            ..
        } => {
            assert_eq!(*called, entry);
            assert_eq!(*at, location);
            // Only the matrix entry points carry a transpose flag
            assert_eq!(transpose.is_some(), entry.starts_with("uniform_matrix"));
            assert_ne!(*transpose, Some(true));
        }
        other => panic!("expected a uniform call, got {other:?}"),
    }
    assert!(ctx.device().errors().is_empty());

    // Reads come from the cache, not the device
    assert_eq!(uniform.value(), Some(&value));
    assert_eq!(ctx.device().calls().len(), 1);
}

// ============================================================================
// Array forms
// ============================================================================

#[rstest]
#[case::float_vec2(consts::FLOAT_VEC2, 3, ArrayView::new(vec![0.5f32; 6]).into(), "uniform_2_f32_slice", None, (0, 0))]
#[case::int_vec4(consts::INT_VEC4, 2, ArrayView::new(vec![1i32; 8]).into(), "uniform_4_i32_slice", None, (0, 0))]
#[case::uint_window(consts::UNSIGNED_INT, 4, ArrayView::new(vec![1u32, 2, 3, 4]).window(1, 2).into(), "uniform_1_u32_slice", None, (1, 2))]
#[case::bool_vec2(consts::BOOL_VEC2, 2, ArrayView::new(vec![1i32, 0, 0, 1]).into(), "uniform_2_i32_slice", None, (0, 0))]
#[case::mat4_transposed(consts::FLOAT_MAT4, 2, ArrayView::new(vec![0.0f32; 32]).transposed(true).into(), "uniform_matrix_4_f32_slice", Some(true), (0, 0))]
#[case::mat2x3_window(consts::FLOAT_MAT2X3, 1, ArrayView::new(vec![0.0f32; 12]).window(6, 6).into(), "uniform_matrix_2x3_f32_slice", Some(false), (6, 6))]
#[case::sampler_array(consts::SAMPLER_2D_ARRAY, 4, ArrayView::new(vec![0i32, 1, 2, 3]).into(), "uniform_1_i32_slice", None, (0, 0))]
fn test_array_value_issues_one_call(
    #[case] type_tag: u32,
    #[case] size: i32,
    #[case] value: UniformValue,
    #[case] entry: &str,
    #[case] transpose: Option<bool>,
    #[case] window: (u32, u32),
) {
    let name = if size > 1 { "u_value[0]" } else { "u_value" };
    let mut ctx = context_with_reflection(Vec::new(), vec![ActiveVariable::new(name, type_tag, size)]);
    let mut program = active_program(&mut ctx, "array");
    let location = program.uniform("u_value").map(|u| u.location());

    program.set_uniform(&mut ctx, "u_value", value.clone()).unwrap();

    let calls = ctx.device().calls();
    assert_eq!(calls.len(), 1, "{calls:?}");
    assert!(matches!(
        &calls[0],
        DeviceCall::Uniform { entry: called, location: at, transpose: t, window: w, .. }
            if *called == entry && Some(*at) == location && *t == transpose && *w == Some(window)
    ));
    assert!(ctx.device().errors().is_empty());
    assert_eq!(program.uniform("u_value").and_then(|u| u.value()), Some(&value));
}

#[rstest]
#[case::mat2(consts::FLOAT_MAT2, 4)]
#[case::mat3(consts::FLOAT_MAT3, 9)]
#[case::mat4(consts::FLOAT_MAT4, 16)]
#[case::mat2x3(consts::FLOAT_MAT2X3, 6)]
#[case::mat2x4(consts::FLOAT_MAT2X4, 8)]
#[case::mat3x2(consts::FLOAT_MAT3X2, 6)]
#[case::mat3x4(consts::FLOAT_MAT3X4, 12)]
#[case::mat4x2(consts::FLOAT_MAT4X2, 8)]
#[case::mat4x3(consts::FLOAT_MAT4X3, 12)]
fn test_matrix_length_must_be_multiple(#[case] type_tag: u32, #[case] elements: usize) {
    let mut ctx = context_with_reflection(Vec::new(), single(type_tag, 4));
    let mut program = active_program(&mut ctx, "matrix");

    let err = program
        .set_uniform(&mut ctx, "u_value", vec![0.0f32; elements * 2 + 1])
        .unwrap_err();
    assert!(matches!(err, Error::ValueShape { .. }), "{err:?}");
    assert!(ctx.device().calls().is_empty());
    assert_eq!(program.uniform("u_value").and_then(|u| u.value()), None);

    program
        .set_uniform(&mut ctx, "u_value", vec![0.0f32; elements * 2])
        .unwrap();
    assert_eq!(ctx.device().calls().len(), 1);
}

// ============================================================================
// Program activation and caching
// ============================================================================

#[test]
fn test_uniform_write_activates_owning_program() {
    let mut ctx = context_with_reflection(Vec::new(), single(consts::FLOAT, 1));
    let mut first = active_program(&mut ctx, "first");
    let second = active_program(&mut ctx, "second");
    assert_eq!(ctx.active_program(), Some(second.handle()));

    first.set_uniform(&mut ctx, "u_value", 2.0f32).unwrap();
    assert_eq!(ctx.active_program(), Some(first.handle()));
    assert_eq!(
        ctx.device().calls()[0],
        DeviceCall::UseProgram(Some(first.handle()))
    );
    let location = first.uniform("u_value").map(|u| u.location());
    assert_eq!(
        location.and_then(|l| ctx.device().uniform_data(first.handle(), l)),
        Some(&UniformData::F32(vec![2.0]))
    );

    // Already active: only the uniform call
    ctx.device_mut().clear_calls();
    first.set_uniform(&mut ctx, "u_value", 3.0f32).unwrap();
    assert_eq!(ctx.device().calls().len(), 1);
}

#[test]
fn test_identical_values_are_never_suppressed() {
    let mut ctx = context_with_reflection(Vec::new(), single(consts::FLOAT_VEC4, 1));
    let mut program = active_program(&mut ctx, "repeat");

    for _ in 0..3 {
        program.set_uniform(&mut ctx, "u_value", Vec4::ONE).unwrap();
    }
    assert_eq!(
        ctx.device().calls().iter().filter(|c| c.is_uniform()).count(),
        3
    );
}

#[test]
fn test_shared_array_view_is_not_copied() {
    let mut ctx = context_with_reflection(
        Vec::new(),
        vec![
            ActiveVariable::new("u_a[0]", consts::FLOAT, 8),
            ActiveVariable::new("u_b[0]", consts::FLOAT, 8),
        ],
    );
    let mut program = active_program(&mut ctx, "shared");
    let weights = ArrayView::new(vec![0.25f32; 8]);

    program
        .set_uniform(&mut ctx, "u_a", weights.clone().window(0, 4))
        .unwrap();
    program
        .set_uniform(&mut ctx, "u_b", weights.clone().window(4, 4))
        .unwrap();

    let value_a = program.uniform("u_a").and_then(|u| u.value());
    let Some(UniformValue::FloatArray(view)) = value_a else {
        panic!("expected a float array, got {value_a:?}");
    };
    assert!(std::ptr::eq(view.data(), weights.data()));
}

#[test]
fn test_kind_mismatch_is_value_type_error() {
    let mut ctx = context_with_reflection(Vec::new(), single(consts::FLOAT_MAT3, 1));
    let mut program: Program = active_program(&mut ctx, "mismatch");
    let err = program
        .set_uniform(&mut ctx, "u_value", Mat4::IDENTITY)
        .unwrap_err();
    assert_eq!(
        err,
        Error::ValueType {
            variable: "u_value".to_string(),
            expected: "mat3",
            found: "mat4",
        }
    );
    assert!(ctx.device().calls().is_empty());
}
