//! Device backed by a live GL context through `glow`
//!
//! Handles are crate-side ids mapped onto glow objects, the same way the other backends keep
//! their own handle tables.

use std::collections::HashMap;

use glow::HasContext;

use super::traits::*;
use crate::error::{Error, Result};

type GlBuffer = <glow::Context as HasContext>::Buffer;
type GlTexture = <glow::Context as HasContext>::Texture;
type GlShader = <glow::Context as HasContext>::Shader;
type GlProgram = <glow::Context as HasContext>::Program;
type GlVertexArray = <glow::Context as HasContext>::VertexArray;
type GlUniformLocation = <glow::Context as HasContext>::UniformLocation;

/// Resolve a `(src_offset, src_length)` window, clamped to the data
fn window<T>(data: &[T], src_offset: u32, src_length: u32) -> &[T] {
    let start = (src_offset as usize).min(data.len());
    let end = if src_length == 0 {
        data.len()
    } else {
        (start + src_length as usize).min(data.len())
    };
    &data[start..end]
}

/// [`Device`] over an already-initialised `glow::Context`
pub struct GlowDevice {
    gl: glow::Context,
    vertex_array: Option<GlVertexArray>,
    next_id: u64,
    buffers: HashMap<BufferHandle, GlBuffer>,
    textures: HashMap<TextureHandle, GlTexture>,
    shaders: HashMap<ShaderHandle, GlShader>,
    programs: HashMap<ProgramHandle, GlProgram>,
    uniform_locations: HashMap<UniformLocation, (ProgramHandle, GlUniformLocation)>,
    next_location: u32,
}

impl GlowDevice {
    /// Wrap a context and bind a default vertex array object
    ///
    /// # Safety
    ///
    /// `gl` must be current on the calling thread for the whole lifetime of the device, and
    /// nothing else may issue calls on it concurrently.
    pub unsafe fn new(gl: glow::Context) -> Self {
        let vertex_array = gl.create_vertex_array().ok();
        if vertex_array.is_some() {
            gl.bind_vertex_array(vertex_array);
        }
        log::info!(
            "GlowDevice: {} ({})",
            gl.get_parameter_string(glow::RENDERER),
            gl.get_parameter_string(glow::VERSION)
        );
        Self {
            gl,
            vertex_array,
            next_id: 1,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            shaders: HashMap::new(),
            programs: HashMap::new(),
            uniform_locations: HashMap::new(),
            next_location: 0,
        }
    }

    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn buffer(&self, buffer: BufferHandle) -> Option<GlBuffer> {
        let raw = self.buffers.get(&buffer).copied();
        if raw.is_none() {
            log::warn!("GlowDevice: unknown buffer {:?}", buffer);
        }
        raw
    }

    fn texture(&self, texture: TextureHandle) -> Option<GlTexture> {
        let raw = self.textures.get(&texture).copied();
        if raw.is_none() {
            log::warn!("GlowDevice: unknown texture {:?}", texture);
        }
        raw
    }

    fn shader(&self, shader: ShaderHandle) -> Option<GlShader> {
        self.shaders.get(&shader).copied()
    }

    fn program(&self, program: ProgramHandle) -> Option<GlProgram> {
        self.programs.get(&program).copied()
    }

    fn location(&self, location: UniformLocation) -> Option<&GlUniformLocation> {
        self.uniform_locations.get(&location).map(|(_, raw)| raw)
    }
}

impl Drop for GlowDevice {
    fn drop(&mut self) {
        if let Some(vertex_array) = self.vertex_array.take() {
            unsafe { self.gl.delete_vertex_array(vertex_array) };
        }
    }
}

macro_rules! forward_uniform {
    ($name:ident, $ty:ty, $($arg:ident),+) => {
        fn $name(&mut self, location: UniformLocation, $($arg: $ty),+) {
            unsafe { self.gl.$name(self.location(location), $($arg),+) }
        }
    };
}

macro_rules! forward_uniform_slice {
    ($name:ident, $ty:ty) => {
        fn $name(&mut self, location: UniformLocation, data: &[$ty], src_offset: u32, src_length: u32) {
            let data = window(data, src_offset, src_length);
            unsafe { self.gl.$name(self.location(location), data) }
        }
    };
}

macro_rules! forward_uniform_matrix {
    ($name:ident) => {
        fn $name(
            &mut self,
            location: UniformLocation,
            transpose: bool,
            data: &[f32],
            src_offset: u32,
            src_length: u32,
        ) {
            let data = window(data, src_offset, src_length);
            unsafe { self.gl.$name(self.location(location), transpose, data) }
        }
    };
}

impl Device for GlowDevice {
    fn create_buffer(&mut self) -> Result<BufferHandle> {
        let raw = unsafe { self.gl.create_buffer() }.map_err(Error::Device)?;
        let handle = BufferHandle(self.allocate_id());
        self.buffers.insert(handle, raw);
        Ok(handle)
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        if let Some(raw) = self.buffers.remove(&buffer) {
            unsafe { self.gl.delete_buffer(raw) };
        }
    }

    fn bind_buffer(&mut self, target: u32, buffer: Option<BufferHandle>) {
        let raw = buffer.and_then(|b| self.buffer(b));
        unsafe { self.gl.bind_buffer(target, raw) };
    }

    fn buffer_data(&mut self, target: u32, data: &[u8], usage: u32) {
        unsafe { self.gl.buffer_data_u8_slice(target, data, usage) };
    }

    fn buffer_sub_data(&mut self, target: u32, offset: i32, data: &[u8]) {
        unsafe { self.gl.buffer_sub_data_u8_slice(target, offset, data) };
    }

    fn create_texture(&mut self) -> Result<TextureHandle> {
        let raw = unsafe { self.gl.create_texture() }.map_err(Error::Device)?;
        let handle = TextureHandle(self.allocate_id());
        self.textures.insert(handle, raw);
        Ok(handle)
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        if let Some(raw) = self.textures.remove(&texture) {
            unsafe { self.gl.delete_texture(raw) };
        }
    }

    fn active_texture(&mut self, unit: u32) {
        unsafe { self.gl.active_texture(unit) };
    }

    fn bind_texture(&mut self, target: u32, texture: Option<TextureHandle>) {
        let raw = texture.and_then(|t| self.texture(t));
        unsafe { self.gl.bind_texture(target, raw) };
    }

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
    ) {
        unsafe {
            self.gl.tex_image_2d(
                target,
                level,
                internal_format,
                width,
                height,
                0,
                format,
                ty,
                glow::PixelUnpackData::Slice(pixels),
            )
        };
    }

    fn tex_parameter_i32(&mut self, target: u32, pname: u32, value: i32) {
        unsafe { self.gl.tex_parameter_i32(target, pname, value) };
    }

    fn generate_mipmap(&mut self, target: u32) {
        unsafe { self.gl.generate_mipmap(target) };
    }

    fn create_shader(&mut self, stage: u32) -> Result<ShaderHandle> {
        let raw = unsafe { self.gl.create_shader(stage) }.map_err(Error::Device)?;
        let handle = ShaderHandle(self.allocate_id());
        self.shaders.insert(handle, raw);
        Ok(handle)
    }

    fn shader_source(&mut self, shader: ShaderHandle, source: &str) {
        if let Some(raw) = self.shader(shader) {
            unsafe { self.gl.shader_source(raw, source) };
        }
    }

    fn compile_shader(&mut self, shader: ShaderHandle) {
        if let Some(raw) = self.shader(shader) {
            unsafe { self.gl.compile_shader(raw) };
        }
    }

    fn shader_compile_status(&mut self, shader: ShaderHandle) -> bool {
        self.shader(shader)
            .is_some_and(|raw| unsafe { self.gl.get_shader_compile_status(raw) })
    }

    fn shader_info_log(&mut self, shader: ShaderHandle) -> String {
        self.shader(shader)
            .map(|raw| unsafe { self.gl.get_shader_info_log(raw) })
            .unwrap_or_default()
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        if let Some(raw) = self.shaders.remove(&shader) {
            unsafe { self.gl.delete_shader(raw) };
        }
    }

    fn create_program(&mut self) -> Result<ProgramHandle> {
        let raw = unsafe { self.gl.create_program() }.map_err(Error::Device)?;
        let handle = ProgramHandle(self.allocate_id());
        self.programs.insert(handle, raw);
        Ok(handle)
    }

    fn attach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle) {
        if let (Some(program), Some(shader)) = (self.program(program), self.shader(shader)) {
            unsafe { self.gl.attach_shader(program, shader) };
        }
    }

    fn detach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle) {
        if let (Some(program), Some(shader)) = (self.program(program), self.shader(shader)) {
            unsafe { self.gl.detach_shader(program, shader) };
        }
    }

    fn link_program(&mut self, program: ProgramHandle) {
        // Locations resolved against the previous link are stale now
        self.uniform_locations.retain(|_, (owner, _)| *owner != program);
        if let Some(raw) = self.program(program) {
            unsafe { self.gl.link_program(raw) };
        }
    }

    fn program_link_status(&mut self, program: ProgramHandle) -> bool {
        self.program(program)
            .is_some_and(|raw| unsafe { self.gl.get_program_link_status(raw) })
    }

    fn program_info_log(&mut self, program: ProgramHandle) -> String {
        self.program(program)
            .map(|raw| unsafe { self.gl.get_program_info_log(raw) })
            .unwrap_or_default()
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        let raw = program.and_then(|p| self.program(p));
        unsafe { self.gl.use_program(raw) };
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.uniform_locations.retain(|_, (owner, _)| *owner != program);
        if let Some(raw) = self.programs.remove(&program) {
            unsafe { self.gl.delete_program(raw) };
        }
    }

    fn active_attributes(&mut self, program: ProgramHandle) -> Vec<ActiveVariable> {
        let Some(raw) = self.program(program) else {
            return Vec::new();
        };
        unsafe {
            let count = self.gl.get_active_attributes(raw);
            (0..count)
                .filter_map(|index| self.gl.get_active_attribute(raw, index))
                .map(|a| ActiveVariable::new(a.name, a.atype, a.size))
                .collect()
        }
    }

    fn active_uniforms(&mut self, program: ProgramHandle) -> Vec<ActiveVariable> {
        let Some(raw) = self.program(program) else {
            return Vec::new();
        };
        unsafe {
            let count = self.gl.get_active_uniforms(raw);
            (0..count)
                .filter_map(|index| self.gl.get_active_uniform(raw, index))
                .map(|u| ActiveVariable::new(u.name, u.utype, u.size))
                .collect()
        }
    }

    fn attrib_location(&mut self, program: ProgramHandle, name: &str) -> Option<u32> {
        let raw = self.program(program)?;
        unsafe { self.gl.get_attrib_location(raw, name) }
    }

    fn uniform_location(
        &mut self,
        program: ProgramHandle,
        name: &str,
    ) -> Option<UniformLocation> {
        let raw = self.program(program)?;
        let location = unsafe { self.gl.get_uniform_location(raw, name) }?;
        let handle = UniformLocation(self.next_location);
        self.next_location += 1;
        self.uniform_locations.insert(handle, (program, location));
        Some(handle)
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(index) };
    }

    fn disable_vertex_attrib_array(&mut self, index: u32) {
        unsafe { self.gl.disable_vertex_attrib_array(index) };
    }

    fn vertex_attrib_array_enabled(&mut self, index: u32) -> bool {
        let mut enabled = [0.0f32; 4];
        unsafe {
            self.gl.get_vertex_attrib_parameter_f32_slice(
                index,
                glow::VERTEX_ATTRIB_ARRAY_ENABLED,
                &mut enabled,
            )
        };
        enabled[0] != 0.0
    }

    fn vertex_attrib_pointer(
        &mut self,
        index: u32,
        size: i32,
        ty: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) {
        unsafe {
            self.gl
                .vertex_attrib_pointer_f32(index, size, ty, normalized, stride, offset)
        };
    }

    fn vertex_attrib_i_pointer(&mut self, index: u32, size: i32, ty: u32, stride: i32, offset: i32) {
        unsafe { self.gl.vertex_attrib_pointer_i32(index, size, ty, stride, offset) };
    }

    fn vertex_attrib_divisor(&mut self, index: u32, divisor: u32) {
        unsafe { self.gl.vertex_attrib_divisor(index, divisor) };
    }

    forward_uniform!(uniform_1_f32, f32, x);
    forward_uniform!(uniform_2_f32, f32, x, y);
    forward_uniform!(uniform_3_f32, f32, x, y, z);
    forward_uniform!(uniform_4_f32, f32, x, y, z, w);
    forward_uniform!(uniform_1_i32, i32, x);
    forward_uniform!(uniform_2_i32, i32, x, y);
    forward_uniform!(uniform_3_i32, i32, x, y, z);
    forward_uniform!(uniform_4_i32, i32, x, y, z, w);
    forward_uniform!(uniform_1_u32, u32, x);
    forward_uniform!(uniform_2_u32, u32, x, y);
    forward_uniform!(uniform_3_u32, u32, x, y, z);
    forward_uniform!(uniform_4_u32, u32, x, y, z, w);

    forward_uniform_slice!(uniform_1_f32_slice, f32);
    forward_uniform_slice!(uniform_2_f32_slice, f32);
    forward_uniform_slice!(uniform_3_f32_slice, f32);
    forward_uniform_slice!(uniform_4_f32_slice, f32);
    forward_uniform_slice!(uniform_1_i32_slice, i32);
    forward_uniform_slice!(uniform_2_i32_slice, i32);
    forward_uniform_slice!(uniform_3_i32_slice, i32);
    forward_uniform_slice!(uniform_4_i32_slice, i32);
    forward_uniform_slice!(uniform_1_u32_slice, u32);
    forward_uniform_slice!(uniform_2_u32_slice, u32);
    forward_uniform_slice!(uniform_3_u32_slice, u32);
    forward_uniform_slice!(uniform_4_u32_slice, u32);

    forward_uniform_matrix!(uniform_matrix_2_f32_slice);
    forward_uniform_matrix!(uniform_matrix_3_f32_slice);
    forward_uniform_matrix!(uniform_matrix_4_f32_slice);
    forward_uniform_matrix!(uniform_matrix_2x3_f32_slice);
    forward_uniform_matrix!(uniform_matrix_2x4_f32_slice);
    forward_uniform_matrix!(uniform_matrix_3x2_f32_slice);
    forward_uniform_matrix!(uniform_matrix_3x4_f32_slice);
    forward_uniform_matrix!(uniform_matrix_4x2_f32_slice);
    forward_uniform_matrix!(uniform_matrix_4x3_f32_slice);

    fn enable(&mut self, cap: u32) {
        unsafe { self.gl.enable(cap) };
    }

    fn disable(&mut self, cap: u32) {
        unsafe { self.gl.disable(cap) };
    }

    fn is_enabled(&mut self, cap: u32) -> bool {
        unsafe { self.gl.is_enabled(cap) }
    }

    fn get_parameter_i32(&mut self, pname: u32) -> i32 {
        unsafe { self.gl.get_parameter_i32(pname) }
    }

    fn get_parameter_f32(&mut self, pname: u32) -> f32 {
        unsafe { self.gl.get_parameter_f32(pname) }
    }

    fn get_parameter_i32_slice(&mut self, pname: u32, out: &mut [i32]) {
        unsafe { self.gl.get_parameter_i32_slice(pname, out) };
    }

    fn get_parameter_f32_slice(&mut self, pname: u32, out: &mut [f32]) {
        unsafe { self.gl.get_parameter_f32_slice(pname, out) };
    }

    fn blend_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        unsafe { self.gl.blend_color(r, g, b, a) };
    }

    fn blend_equation_separate(&mut self, mode_rgb: u32, mode_alpha: u32) {
        unsafe { self.gl.blend_equation_separate(mode_rgb, mode_alpha) };
    }

    fn blend_func_separate(&mut self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32) {
        unsafe {
            self.gl
                .blend_func_separate(src_rgb, dst_rgb, src_alpha, dst_alpha)
        };
    }

    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        unsafe { self.gl.clear_color(r, g, b, a) };
    }

    fn clear_depth(&mut self, depth: f32) {
        unsafe { self.gl.clear_depth_f32(depth) };
    }

    fn clear_stencil(&mut self, stencil: i32) {
        unsafe { self.gl.clear_stencil(stencil) };
    }

    fn color_mask(&mut self, r: bool, g: bool, b: bool, a: bool) {
        unsafe { self.gl.color_mask(r, g, b, a) };
    }

    fn cull_face(&mut self, mode: u32) {
        unsafe { self.gl.cull_face(mode) };
    }

    fn front_face(&mut self, mode: u32) {
        unsafe { self.gl.front_face(mode) };
    }

    fn depth_func(&mut self, func: u32) {
        unsafe { self.gl.depth_func(func) };
    }

    fn depth_mask(&mut self, enabled: bool) {
        unsafe { self.gl.depth_mask(enabled) };
    }

    fn depth_range(&mut self, near: f32, far: f32) {
        unsafe { self.gl.depth_range_f32(near, far) };
    }

    fn line_width(&mut self, width: f32) {
        unsafe { self.gl.line_width(width) };
    }

    fn polygon_offset(&mut self, factor: f32, units: f32) {
        unsafe { self.gl.polygon_offset(factor, units) };
    }

    fn sample_coverage(&mut self, value: f32, invert: bool) {
        unsafe { self.gl.sample_coverage(value, invert) };
    }

    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.scissor(x, y, width, height) };
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) };
    }

    fn stencil_func_separate(&mut self, face: u32, func: u32, reference: i32, mask: u32) {
        unsafe { self.gl.stencil_func_separate(face, func, reference, mask) };
    }

    fn stencil_op_separate(&mut self, face: u32, fail: u32, depth_fail: u32, depth_pass: u32) {
        unsafe {
            self.gl
                .stencil_op_separate(face, fail, depth_fail, depth_pass)
        };
    }

    fn stencil_mask_separate(&mut self, face: u32, mask: u32) {
        unsafe { self.gl.stencil_mask_separate(face, mask) };
    }

    fn pixel_store_i32(&mut self, pname: u32, value: i32) {
        unsafe { self.gl.pixel_store_i32(pname, value) };
    }

    fn clear(&mut self, mask: u32) {
        unsafe { self.gl.clear(mask) };
    }

    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32) {
        unsafe { self.gl.draw_arrays(mode, first, count) };
    }

    fn draw_elements(&mut self, mode: u32, count: i32, ty: u32, offset: i32) {
        unsafe { self.gl.draw_elements(mode, count, ty, offset) };
    }

    fn draw_arrays_instanced(&mut self, mode: u32, first: i32, count: i32, instances: i32) {
        unsafe { self.gl.draw_arrays_instanced(mode, first, count, instances) };
    }

    fn draw_elements_instanced(
        &mut self,
        mode: u32,
        count: i32,
        ty: u32,
        offset: i32,
        instances: i32,
    ) {
        unsafe {
            self.gl
                .draw_elements_instanced(mode, count, ty, offset, instances)
        };
    }
}
