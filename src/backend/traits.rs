//! Core device abstraction trait
//!
//! [`Device`] mirrors the entry points of a stateful GL-style driver one to one. Every method
//! takes raw `u32` enumerants (see [`super::consts`]) so a backend can forward them without
//! translation; the typed layer above converts through [`super::types`].
//!
//! All calls are synchronous and assume exclusive access from a single thread.

use crate::error::Result;

/// Handle to a device buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u64);

/// Handle to a device texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub(crate) u64);

/// Handle to a shader stage object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle(pub(crate) u64);

/// Handle to a program object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub(crate) u64);

/// Device-assigned uniform location, resolved once per link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub(crate) u32);

macro_rules! handle_id {
    ($($handle:ident),+) => {
        $(impl $handle {
            /// Raw id, stable for the lifetime of the object
            pub fn id(&self) -> u64 {
                self.0 as u64
            }
        })+
    };
}

handle_id!(BufferHandle, TextureHandle, ShaderHandle, ProgramHandle, UniformLocation);

/// One active variable as reported by program introspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveVariable {
    /// Reported name; arrays are usually reported as `name[0]`
    pub name: String,
    /// Raw type tag such as `FLOAT_VEC3`
    pub type_tag: u32,
    /// Declared element count, 1 for non-arrays
    pub size: i32,
}

impl ActiveVariable {
    pub fn new(name: impl Into<String>, type_tag: u32, size: i32) -> Self {
        Self {
            name: name.into(),
            type_tag,
            size,
        }
    }
}

/// Stateful graphics device
///
/// Queries take `&mut self` like every other call: a device is a single register set and a
/// query observes it in program order.
pub trait Device {
    // Buffers

    /// Allocate a buffer object
    fn create_buffer(&mut self) -> Result<BufferHandle>;

    /// Release a buffer object
    fn delete_buffer(&mut self, buffer: BufferHandle);

    /// Bind a buffer (or nothing) to a binding point
    fn bind_buffer(&mut self, target: u32, buffer: Option<BufferHandle>);

    /// Replace the storage of the buffer bound to `target`
    fn buffer_data(&mut self, target: u32, data: &[u8], usage: u32);

    /// Overwrite part of the storage of the buffer bound to `target`
    fn buffer_sub_data(&mut self, target: u32, offset: i32, data: &[u8]);

    // Textures

    /// Allocate a texture object
    fn create_texture(&mut self) -> Result<TextureHandle>;

    /// Release a texture object
    fn delete_texture(&mut self, texture: TextureHandle);

    /// Select the texture unit (`TEXTURE0 + n`) later binds apply to
    fn active_texture(&mut self, unit: u32);

    /// Bind a texture (or nothing) to a binding point of the active unit
    fn bind_texture(&mut self, target: u32, texture: Option<TextureHandle>);

    /// Specify a 2D image for the texture bound to `target`
    #[allow(clippy::too_many_arguments)]
    fn tex_image_2d(
        &mut self,
        target: u32,
        level: i32,
        internal_format: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: Option<&[u8]>,
    );

    fn tex_parameter_i32(&mut self, target: u32, pname: u32, value: i32);

    fn generate_mipmap(&mut self, target: u32);

    // Shaders and programs

    fn create_shader(&mut self, stage: u32) -> Result<ShaderHandle>;

    fn shader_source(&mut self, shader: ShaderHandle, source: &str);

    fn compile_shader(&mut self, shader: ShaderHandle);

    fn shader_compile_status(&mut self, shader: ShaderHandle) -> bool;

    fn shader_info_log(&mut self, shader: ShaderHandle) -> String;

    fn delete_shader(&mut self, shader: ShaderHandle);

    fn create_program(&mut self) -> Result<ProgramHandle>;

    fn attach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle);

    fn detach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle);

    fn link_program(&mut self, program: ProgramHandle);

    fn program_link_status(&mut self, program: ProgramHandle) -> bool;

    fn program_info_log(&mut self, program: ProgramHandle) -> String;

    /// Make a program (or nothing) the active one
    fn use_program(&mut self, program: Option<ProgramHandle>);

    fn delete_program(&mut self, program: ProgramHandle);

    // Introspection

    /// Active vertex inputs of a linked program, in device order
    fn active_attributes(&mut self, program: ProgramHandle) -> Vec<ActiveVariable>;

    /// Active uniforms of a linked program, in device order
    fn active_uniforms(&mut self, program: ProgramHandle) -> Vec<ActiveVariable>;

    /// `None` for built-ins and unknown names
    fn attrib_location(&mut self, program: ProgramHandle, name: &str) -> Option<u32>;

    /// `None` for built-ins, block members and unknown names
    fn uniform_location(&mut self, program: ProgramHandle, name: &str)
        -> Option<UniformLocation>;

    // Vertex input

    fn enable_vertex_attrib_array(&mut self, index: u32);

    fn disable_vertex_attrib_array(&mut self, index: u32);

    fn vertex_attrib_array_enabled(&mut self, index: u32) -> bool;

    /// Describe float-converted data for `index` from the bound `ARRAY_BUFFER`
    fn vertex_attrib_pointer(
        &mut self,
        index: u32,
        size: i32,
        ty: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    );

    /// Describe integer data for `index` from the bound `ARRAY_BUFFER`
    fn vertex_attrib_i_pointer(&mut self, index: u32, size: i32, ty: u32, stride: i32, offset: i32);

    fn vertex_attrib_divisor(&mut self, index: u32, divisor: u32);

    // Uniforms, tuple forms. Each writes into the active program.

    fn uniform_1_f32(&mut self, location: UniformLocation, x: f32);
    fn uniform_2_f32(&mut self, location: UniformLocation, x: f32, y: f32);
    fn uniform_3_f32(&mut self, location: UniformLocation, x: f32, y: f32, z: f32);
    fn uniform_4_f32(&mut self, location: UniformLocation, x: f32, y: f32, z: f32, w: f32);
    fn uniform_1_i32(&mut self, location: UniformLocation, x: i32);
    fn uniform_2_i32(&mut self, location: UniformLocation, x: i32, y: i32);
    fn uniform_3_i32(&mut self, location: UniformLocation, x: i32, y: i32, z: i32);
    fn uniform_4_i32(&mut self, location: UniformLocation, x: i32, y: i32, z: i32, w: i32);
    fn uniform_1_u32(&mut self, location: UniformLocation, x: u32);
    fn uniform_2_u32(&mut self, location: UniformLocation, x: u32, y: u32);
    fn uniform_3_u32(&mut self, location: UniformLocation, x: u32, y: u32, z: u32);
    fn uniform_4_u32(&mut self, location: UniformLocation, x: u32, y: u32, z: u32, w: u32);

    // Uniforms, array forms. `src_length == 0` reads to the end of `data`.

    fn uniform_1_f32_slice(&mut self, location: UniformLocation, data: &[f32], src_offset: u32, src_length: u32);
    fn uniform_2_f32_slice(&mut self, location: UniformLocation, data: &[f32], src_offset: u32, src_length: u32);
    fn uniform_3_f32_slice(&mut self, location: UniformLocation, data: &[f32], src_offset: u32, src_length: u32);
    fn uniform_4_f32_slice(&mut self, location: UniformLocation, data: &[f32], src_offset: u32, src_length: u32);
    fn uniform_1_i32_slice(&mut self, location: UniformLocation, data: &[i32], src_offset: u32, src_length: u32);
    fn uniform_2_i32_slice(&mut self, location: UniformLocation, data: &[i32], src_offset: u32, src_length: u32);
    fn uniform_3_i32_slice(&mut self, location: UniformLocation, data: &[i32], src_offset: u32, src_length: u32);
    fn uniform_4_i32_slice(&mut self, location: UniformLocation, data: &[i32], src_offset: u32, src_length: u32);
    fn uniform_1_u32_slice(&mut self, location: UniformLocation, data: &[u32], src_offset: u32, src_length: u32);
    fn uniform_2_u32_slice(&mut self, location: UniformLocation, data: &[u32], src_offset: u32, src_length: u32);
    fn uniform_3_u32_slice(&mut self, location: UniformLocation, data: &[u32], src_offset: u32, src_length: u32);
    fn uniform_4_u32_slice(&mut self, location: UniformLocation, data: &[u32], src_offset: u32, src_length: u32);

    // Uniforms, matrix forms (column-major unless `transpose`)

    fn uniform_matrix_2_f32_slice(&mut self, location: UniformLocation, transpose: bool, data: &[f32], src_offset: u32, src_length: u32);
    fn uniform_matrix_3_f32_slice(&mut self, location: UniformLocation, transpose: bool, data: &[f32], src_offset: u32, src_length: u32);
    fn uniform_matrix_4_f32_slice(&mut self, location: UniformLocation, transpose: bool, data: &[f32], src_offset: u32, src_length: u32);
    fn uniform_matrix_2x3_f32_slice(&mut self, location: UniformLocation, transpose: bool, data: &[f32], src_offset: u32, src_length: u32);
    fn uniform_matrix_2x4_f32_slice(&mut self, location: UniformLocation, transpose: bool, data: &[f32], src_offset: u32, src_length: u32);
    fn uniform_matrix_3x2_f32_slice(&mut self, location: UniformLocation, transpose: bool, data: &[f32], src_offset: u32, src_length: u32);
    fn uniform_matrix_3x4_f32_slice(&mut self, location: UniformLocation, transpose: bool, data: &[f32], src_offset: u32, src_length: u32);
    fn uniform_matrix_4x2_f32_slice(&mut self, location: UniformLocation, transpose: bool, data: &[f32], src_offset: u32, src_length: u32);
    fn uniform_matrix_4x3_f32_slice(&mut self, location: UniformLocation, transpose: bool, data: &[f32], src_offset: u32, src_length: u32);

    // Global state

    fn enable(&mut self, cap: u32);

    fn disable(&mut self, cap: u32);

    fn is_enabled(&mut self, cap: u32) -> bool;

    fn get_parameter_i32(&mut self, pname: u32) -> i32;

    fn get_parameter_f32(&mut self, pname: u32) -> f32;

    fn get_parameter_i32_slice(&mut self, pname: u32, out: &mut [i32]);

    fn get_parameter_f32_slice(&mut self, pname: u32, out: &mut [f32]);

    fn blend_color(&mut self, r: f32, g: f32, b: f32, a: f32);

    fn blend_equation_separate(&mut self, mode_rgb: u32, mode_alpha: u32);

    fn blend_func_separate(&mut self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32);

    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32);

    fn clear_depth(&mut self, depth: f32);

    fn clear_stencil(&mut self, stencil: i32);

    fn color_mask(&mut self, r: bool, g: bool, b: bool, a: bool);

    fn cull_face(&mut self, mode: u32);

    fn front_face(&mut self, mode: u32);

    fn depth_func(&mut self, func: u32);

    fn depth_mask(&mut self, enabled: bool);

    fn depth_range(&mut self, near: f32, far: f32);

    fn line_width(&mut self, width: f32);

    fn polygon_offset(&mut self, factor: f32, units: f32);

    fn sample_coverage(&mut self, value: f32, invert: bool);

    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32);

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32);

    fn stencil_func_separate(&mut self, face: u32, func: u32, reference: i32, mask: u32);

    fn stencil_op_separate(&mut self, face: u32, fail: u32, depth_fail: u32, depth_pass: u32);

    fn stencil_mask_separate(&mut self, face: u32, mask: u32);

    fn pixel_store_i32(&mut self, pname: u32, value: i32);

    // Drawing

    fn clear(&mut self, mask: u32);

    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32);

    /// `offset` is a byte offset into the bound `ELEMENT_ARRAY_BUFFER`
    fn draw_elements(&mut self, mode: u32, count: i32, ty: u32, offset: i32);

    fn draw_arrays_instanced(&mut self, mode: u32, first: i32, count: i32, instances: i32);

    fn draw_elements_instanced(
        &mut self,
        mode: u32,
        count: i32,
        ty: u32,
        offset: i32,
        instances: i32,
    );
}
