//! Recording device for testing and development.
//!
//! [`RecordingDevice`] behaves like a single GL context without touching any hardware: it
//! allocates handles, keeps the global state registers with their default values, answers
//! queries, links programs against a scripted reflection and logs every entry point it
//! receives as a [`DeviceCall`]. Misuse that a real driver would flag (drawing without a
//! program, uploading with nothing bound) is collected in [`RecordingDevice::errors`].

use std::collections::{HashMap, HashSet};

use super::consts;
use super::traits::*;
use crate::error::Result;

/// Data passed to a uniform entry point
#[derive(Debug, Clone, PartialEq)]
pub enum UniformData {
    F32(Vec<f32>),
    I32(Vec<i32>),
    U32(Vec<u32>),
}

impl UniformData {
    fn window(&self, src_offset: u32, src_length: u32) -> Option<UniformData> {
        fn slice<T: Clone>(data: &[T], offset: u32, length: u32) -> Option<Vec<T>> {
            let start = offset as usize;
            let end = if length == 0 {
                data.len()
            } else {
                start + length as usize
            };
            data.get(start..end).map(|s| s.to_vec())
        }

        match self {
            UniformData::F32(data) => slice(data, src_offset, src_length).map(UniformData::F32),
            UniformData::I32(data) => slice(data, src_offset, src_length).map(UniformData::I32),
            UniformData::U32(data) => slice(data, src_offset, src_length).map(UniformData::U32),
        }
    }
}

/// One entry point invocation
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    CreateBuffer(BufferHandle),
    DeleteBuffer(BufferHandle),
    BindBuffer {
        target: u32,
        buffer: Option<BufferHandle>,
    },
    BufferData {
        target: u32,
        len: usize,
        usage: u32,
    },
    BufferSubData {
        target: u32,
        offset: i32,
        len: usize,
    },
    CreateTexture(TextureHandle),
    DeleteTexture(TextureHandle),
    ActiveTexture(u32),
    BindTexture {
        target: u32,
        texture: Option<TextureHandle>,
    },
    TexImage2D {
        target: u32,
        level: i32,
        internal_format: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        len: Option<usize>,
    },
    TexParameter {
        target: u32,
        pname: u32,
        value: i32,
    },
    GenerateMipmap(u32),
    CreateShader {
        stage: u32,
        shader: ShaderHandle,
    },
    ShaderSource(ShaderHandle),
    CompileShader(ShaderHandle),
    DeleteShader(ShaderHandle),
    CreateProgram(ProgramHandle),
    AttachShader {
        program: ProgramHandle,
        shader: ShaderHandle,
    },
    DetachShader {
        program: ProgramHandle,
        shader: ShaderHandle,
    },
    LinkProgram(ProgramHandle),
    UseProgram(Option<ProgramHandle>),
    DeleteProgram(ProgramHandle),
    EnableVertexAttribArray(u32),
    DisableVertexAttribArray(u32),
    VertexAttribPointer {
        index: u32,
        size: i32,
        ty: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    },
    VertexAttribIPointer {
        index: u32,
        size: i32,
        ty: u32,
        stride: i32,
        offset: i32,
    },
    VertexAttribDivisor {
        index: u32,
        divisor: u32,
    },
    /// Any of the uniform entry points, named after the trait method
    Uniform {
        entry: &'static str,
        location: UniformLocation,
        transpose: Option<bool>,
        data: UniformData,
        /// `(src_offset, src_length)` for the array forms
        window: Option<(u32, u32)>,
    },
    Enable(u32),
    Disable(u32),
    BlendColor([f32; 4]),
    BlendEquationSeparate {
        rgb: u32,
        alpha: u32,
    },
    BlendFuncSeparate {
        src_rgb: u32,
        dst_rgb: u32,
        src_alpha: u32,
        dst_alpha: u32,
    },
    ClearColor([f32; 4]),
    ClearDepth(f32),
    ClearStencil(i32),
    ColorMask([bool; 4]),
    CullFace(u32),
    FrontFace(u32),
    DepthFunc(u32),
    DepthMask(bool),
    DepthRange(f32, f32),
    LineWidth(f32),
    PolygonOffset {
        factor: f32,
        units: f32,
    },
    SampleCoverage {
        value: f32,
        invert: bool,
    },
    Scissor([i32; 4]),
    Viewport([i32; 4]),
    StencilFuncSeparate {
        face: u32,
        func: u32,
        reference: i32,
        mask: u32,
    },
    StencilOpSeparate {
        face: u32,
        fail: u32,
        depth_fail: u32,
        depth_pass: u32,
    },
    StencilMaskSeparate {
        face: u32,
        mask: u32,
    },
    PixelStore {
        pname: u32,
        value: i32,
    },
    Clear(u32),
    DrawArrays {
        mode: u32,
        first: i32,
        count: i32,
        instances: Option<i32>,
    },
    DrawElements {
        mode: u32,
        count: i32,
        ty: u32,
        offset: i32,
        instances: Option<i32>,
    },
    /// Any read-only entry point; `arg` is the pname, capability or index when there is one
    Query {
        entry: &'static str,
        arg: Option<u32>,
    },
}

impl DeviceCall {
    pub fn is_query(&self) -> bool {
        matches!(self, DeviceCall::Query { .. })
    }

    pub fn is_uniform(&self) -> bool {
        matches!(self, DeviceCall::Uniform { .. })
    }
}

/// Device-side view of one vertex attribute slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VertexAttribState {
    pub enabled: bool,
    pub buffer: Option<BufferHandle>,
    pub size: i32,
    pub ty: u32,
    pub normalized: bool,
    pub integer: bool,
    pub stride: i32,
    pub offset: i32,
    pub divisor: u32,
}

#[derive(Debug)]
struct ShaderRecord {
    stage: u32,
    source: String,
    compiled: bool,
    log: String,
}

#[derive(Debug, Default)]
struct ProgramRecord {
    shaders: Vec<ShaderHandle>,
    linked: bool,
    log: String,
    attributes: Vec<ActiveVariable>,
    uniforms: Vec<ActiveVariable>,
    attrib_locations: HashMap<String, u32>,
    uniform_locations: HashMap<String, UniformLocation>,
    uniform_values: HashMap<UniformLocation, UniformData>,
}

#[derive(Debug, Default)]
struct TextureRecord {
    width: i32,
    height: i32,
    internal_format: i32,
    params: HashMap<u32, i32>,
    mipmapped: bool,
}

/// Number of consecutive attribute locations one element of this type occupies
fn location_span(type_tag: u32) -> u32 {
    match type_tag {
        consts::FLOAT_MAT2 | consts::FLOAT_MAT2X3 | consts::FLOAT_MAT2X4 => 2,
        consts::FLOAT_MAT3 | consts::FLOAT_MAT3X2 | consts::FLOAT_MAT3X4 => 3,
        consts::FLOAT_MAT4 | consts::FLOAT_MAT4X2 | consts::FLOAT_MAT4X3 => 4,
        _ => 1,
    }
}

/// Strip a trailing `[0]` from reported array names
fn base_name(name: &str) -> &str {
    name.strip_suffix("[0]").unwrap_or(name)
}

fn default_parameters(width: i32, height: i32) -> HashMap<u32, Vec<f64>> {
    let all_bits = u32::MAX as f64;
    let (w, h) = (width as f64, height as f64);
    [
        (consts::LINE_WIDTH, vec![1.0]),
        (consts::CULL_FACE_MODE, vec![consts::BACK as f64]),
        (consts::FRONT_FACE, vec![consts::CCW as f64]),
        (consts::DEPTH_RANGE, vec![0.0, 1.0]),
        (consts::DEPTH_WRITEMASK, vec![1.0]),
        (consts::DEPTH_CLEAR_VALUE, vec![1.0]),
        (consts::DEPTH_FUNC, vec![consts::LESS as f64]),
        (consts::STENCIL_CLEAR_VALUE, vec![0.0]),
        (consts::STENCIL_FUNC, vec![consts::ALWAYS as f64]),
        (consts::STENCIL_REF, vec![0.0]),
        (consts::STENCIL_VALUE_MASK, vec![all_bits]),
        (consts::STENCIL_WRITEMASK, vec![all_bits]),
        (consts::STENCIL_FAIL, vec![consts::KEEP as f64]),
        (consts::STENCIL_PASS_DEPTH_FAIL, vec![consts::KEEP as f64]),
        (consts::STENCIL_PASS_DEPTH_PASS, vec![consts::KEEP as f64]),
        (consts::STENCIL_BACK_FUNC, vec![consts::ALWAYS as f64]),
        (consts::STENCIL_BACK_REF, vec![0.0]),
        (consts::STENCIL_BACK_VALUE_MASK, vec![all_bits]),
        (consts::STENCIL_BACK_WRITEMASK, vec![all_bits]),
        (consts::STENCIL_BACK_FAIL, vec![consts::KEEP as f64]),
        (consts::STENCIL_BACK_PASS_DEPTH_FAIL, vec![consts::KEEP as f64]),
        (consts::STENCIL_BACK_PASS_DEPTH_PASS, vec![consts::KEEP as f64]),
        (consts::VIEWPORT, vec![0.0, 0.0, w, h]),
        (consts::SCISSOR_BOX, vec![0.0, 0.0, w, h]),
        (consts::COLOR_CLEAR_VALUE, vec![0.0; 4]),
        (consts::COLOR_WRITEMASK, vec![1.0; 4]),
        (consts::BLEND_COLOR, vec![0.0; 4]),
        (consts::BLEND_EQUATION_RGB, vec![consts::FUNC_ADD as f64]),
        (consts::BLEND_EQUATION_ALPHA, vec![consts::FUNC_ADD as f64]),
        (consts::BLEND_SRC_RGB, vec![consts::ONE as f64]),
        (consts::BLEND_DST_RGB, vec![consts::ZERO as f64]),
        (consts::BLEND_SRC_ALPHA, vec![consts::ONE as f64]),
        (consts::BLEND_DST_ALPHA, vec![consts::ZERO as f64]),
        (consts::POLYGON_OFFSET_FACTOR, vec![0.0]),
        (consts::POLYGON_OFFSET_UNITS, vec![0.0]),
        (consts::SAMPLE_COVERAGE_VALUE, vec![1.0]),
        (consts::SAMPLE_COVERAGE_INVERT, vec![0.0]),
        (consts::PACK_ALIGNMENT, vec![4.0]),
        (consts::UNPACK_ALIGNMENT, vec![4.0]),
        (consts::PACK_ROW_LENGTH, vec![0.0]),
        (consts::PACK_SKIP_PIXELS, vec![0.0]),
        (consts::PACK_SKIP_ROWS, vec![0.0]),
        (consts::UNPACK_ROW_LENGTH, vec![0.0]),
        (consts::UNPACK_IMAGE_HEIGHT, vec![0.0]),
        (consts::UNPACK_SKIP_PIXELS, vec![0.0]),
        (consts::UNPACK_SKIP_ROWS, vec![0.0]),
        (consts::UNPACK_SKIP_IMAGES, vec![0.0]),
        (consts::UNPACK_FLIP_Y_WEBGL, vec![0.0]),
        (consts::UNPACK_PREMULTIPLY_ALPHA_WEBGL, vec![0.0]),
        (
            consts::UNPACK_COLORSPACE_CONVERSION_WEBGL,
            vec![consts::BROWSER_DEFAULT_WEBGL as f64],
        ),
    ]
    .into_iter()
    .collect()
}

/// Software stand-in for a single GL context
#[derive(Debug)]
pub struct RecordingDevice {
    next_id: u64,
    calls: Vec<DeviceCall>,
    errors: Vec<String>,
    buffers: HashMap<BufferHandle, Vec<u8>>,
    buffer_bindings: HashMap<u32, BufferHandle>,
    textures: HashMap<TextureHandle, TextureRecord>,
    active_unit: u32,
    texture_bindings: HashMap<(u32, u32), TextureHandle>,
    shaders: HashMap<ShaderHandle, ShaderRecord>,
    programs: HashMap<ProgramHandle, ProgramRecord>,
    current_program: Option<ProgramHandle>,
    reflected_attributes: Vec<ActiveVariable>,
    reflected_uniforms: Vec<ActiveVariable>,
    pending_compile_failure: Option<String>,
    pending_link_failure: Option<String>,
    capabilities: HashSet<u32>,
    parameters: HashMap<u32, Vec<f64>>,
    vertex_attribs: HashMap<u32, VertexAttribState>,
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingDevice {
    /// Drawing buffer size of a freshly created canvas
    pub const DEFAULT_SIZE: (i32, i32) = (300, 150);

    pub fn new() -> Self {
        Self::with_drawing_buffer_size(Self::DEFAULT_SIZE.0, Self::DEFAULT_SIZE.1)
    }

    /// Create a device whose default viewport and scissor box cover `width` x `height`
    pub fn with_drawing_buffer_size(width: i32, height: i32) -> Self {
        Self {
            next_id: 1,
            calls: Vec::new(),
            errors: Vec::new(),
            buffers: HashMap::new(),
            buffer_bindings: HashMap::new(),
            textures: HashMap::new(),
            active_unit: 0,
            texture_bindings: HashMap::new(),
            shaders: HashMap::new(),
            programs: HashMap::new(),
            current_program: None,
            reflected_attributes: Vec::new(),
            reflected_uniforms: Vec::new(),
            pending_compile_failure: None,
            pending_link_failure: None,
            capabilities: HashSet::from([consts::DITHER]),
            parameters: default_parameters(width, height),
            vertex_attribs: HashMap::new(),
        }
    }

    // Call log

    /// Every entry point invoked so far, in order
    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    /// Drain the call log
    pub fn take_calls(&mut self) -> Vec<DeviceCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Calls that are not queries
    pub fn writes(&self) -> impl Iterator<Item = &DeviceCall> {
        self.calls.iter().filter(|call| !call.is_query())
    }

    /// Driver errors raised so far
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    // Scripting

    /// Reflection every subsequent successful link reports
    pub fn set_program_reflection(
        &mut self,
        attributes: Vec<ActiveVariable>,
        uniforms: Vec<ActiveVariable>,
    ) {
        self.reflected_attributes = attributes;
        self.reflected_uniforms = uniforms;
    }

    /// Make the next `compile_shader` fail with `log`
    pub fn fail_next_compile(&mut self, log: impl Into<String>) {
        self.pending_compile_failure = Some(log.into());
    }

    /// Make the next `link_program` fail with `log`
    pub fn fail_next_link(&mut self, log: impl Into<String>) {
        self.pending_link_failure = Some(log.into());
    }

    /// Change a state register behind the back of any cache, without logging a call
    pub fn poke_parameter(&mut self, pname: u32, values: &[f64]) {
        self.parameters.insert(pname, values.to_vec());
    }

    /// Toggle a capability without logging a call
    pub fn poke_capability(&mut self, cap: u32, enabled: bool) {
        if enabled {
            self.capabilities.insert(cap);
        } else {
            self.capabilities.remove(&cap);
        }
    }

    /// Toggle a vertex attribute array without logging a call
    pub fn poke_vertex_attrib_array(&mut self, index: u32, enabled: bool) {
        self.vertex_attribs.entry(index).or_default().enabled = enabled;
    }

    // Inspection. None of these are logged.

    pub fn parameter(&self, pname: u32) -> Option<&[f64]> {
        self.parameters.get(&pname).map(|v| v.as_slice())
    }

    pub fn capability_enabled(&self, cap: u32) -> bool {
        self.capabilities.contains(&cap)
    }

    pub fn vertex_attrib(&self, index: u32) -> VertexAttribState {
        self.vertex_attribs.get(&index).copied().unwrap_or_default()
    }

    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|b| b.as_slice())
    }

    pub fn bound_buffer(&self, target: u32) -> Option<BufferHandle> {
        self.buffer_bindings.get(&target).copied()
    }

    /// Texture bound to `target` on unit `unit` (an index, not `TEXTURE0 + n`)
    pub fn bound_texture(&self, unit: u32, target: u32) -> Option<TextureHandle> {
        self.texture_bindings.get(&(unit, target)).copied()
    }

    pub fn texture_size(&self, texture: TextureHandle) -> Option<(i32, i32)> {
        self.textures.get(&texture).map(|t| (t.width, t.height))
    }

    pub fn texture_internal_format(&self, texture: TextureHandle) -> Option<i32> {
        self.textures.get(&texture).map(|t| t.internal_format)
    }

    pub fn texture_parameter(&self, texture: TextureHandle, pname: u32) -> Option<i32> {
        self.textures
            .get(&texture)
            .and_then(|t| t.params.get(&pname).copied())
    }

    pub fn texture_mipmapped(&self, texture: TextureHandle) -> bool {
        self.textures.get(&texture).is_some_and(|t| t.mipmapped)
    }

    pub fn current_program(&self) -> Option<ProgramHandle> {
        self.current_program
    }

    /// Value stored in a program's uniform, after windowing
    pub fn uniform_data(
        &self,
        program: ProgramHandle,
        location: UniformLocation,
    ) -> Option<&UniformData> {
        self.programs
            .get(&program)
            .and_then(|p| p.uniform_values.get(&location))
    }

    pub fn shader_source_of(&self, shader: ShaderHandle) -> Option<(u32, &str)> {
        self.shaders
            .get(&shader)
            .map(|s| (s.stage, s.source.as_str()))
    }

    /// Number of live buffers, textures, shaders and programs
    pub fn live_objects(&self) -> (usize, usize, usize, usize) {
        (
            self.buffers.len(),
            self.textures.len(),
            self.shaders.len(),
            self.programs.len(),
        )
    }

    // Internals

    fn record(&mut self, call: DeviceCall) {
        log::trace!("RecordingDevice: {:?}", call);
        self.calls.push(call);
    }

    fn query(&mut self, entry: &'static str, arg: Option<u32>) {
        self.record(DeviceCall::Query { entry, arg });
    }

    fn raise(&mut self, message: String) {
        log::warn!("RecordingDevice: {}", message);
        self.errors.push(message);
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn store(&mut self, pname: u32, values: &[f64]) {
        self.parameters.insert(pname, values.to_vec());
    }

    fn parameter_values(&mut self, entry: &'static str, pname: u32) -> Vec<f64> {
        self.query(entry, Some(pname));
        match self.parameters.get(&pname) {
            Some(values) => values.clone(),
            None => {
                self.raise(format!("{entry}: unknown parameter {pname:#06x}"));
                Vec::new()
            }
        }
    }

    /// Registers written by a per-face call
    fn face_registers(face: u32, front: u32, back: u32) -> Vec<u32> {
        match face {
            consts::FRONT => vec![front],
            consts::BACK => vec![back],
            _ => vec![front, back],
        }
    }

    fn write_uniform(
        &mut self,
        entry: &'static str,
        location: UniformLocation,
        transpose: Option<bool>,
        data: UniformData,
        window: Option<(u32, u32)>,
    ) {
        self.record(DeviceCall::Uniform {
            entry,
            location,
            transpose,
            data: data.clone(),
            window,
        });

        let stored = match window {
            Some((offset, length)) => match data.window(offset, length) {
                Some(stored) => stored,
                None => {
                    self.raise(format!(
                        "{entry}: window ({offset}, {length}) out of range of source data"
                    ));
                    return;
                }
            },
            None => data,
        };

        let Some(program) = self.current_program else {
            self.raise(format!("{entry}: no active program"));
            return;
        };
        match self.programs.get_mut(&program) {
            Some(record) => {
                record.uniform_values.insert(location, stored);
            }
            None => self.raise(format!("{entry}: active program was deleted")),
        }
    }

    fn check_draw(&mut self, entry: &str) {
        if self.current_program.is_none() {
            self.raise(format!("{entry}: no active program"));
        }
    }
}

macro_rules! record_uniform {
    ($name:ident, $variant:ident, $ty:ty, $($arg:ident),+) => {
        fn $name(&mut self, location: UniformLocation, $($arg: $ty),+) {
            self.write_uniform(
                stringify!($name),
                location,
                None,
                UniformData::$variant(vec![$($arg),+]),
                None,
            );
        }
    };
}

macro_rules! record_uniform_slice {
    ($name:ident, $variant:ident, $ty:ty) => {
        fn $name(&mut self, location: UniformLocation, data: &[$ty], src_offset: u32, src_length: u32) {
            self.write_uniform(
                stringify!($name),
                location,
                None,
                UniformData::$variant(data.to_vec()),
                Some((src_offset, src_length)),
            );
        }
    };
}

macro_rules! record_uniform_matrix {
    ($name:ident) => {
        fn $name(
            &mut self,
            location: UniformLocation,
            transpose: bool,
            data: &[f32],
            src_offset: u32,
            src_length: u32,
        ) {
            self.write_uniform(
                stringify!($name),
                location,
                Some(transpose),
                UniformData::F32(data.to_vec()),
                Some((src_offset, src_length)),
            );
        }
    };
}

impl Device for RecordingDevice {
    fn create_buffer(&mut self) -> Result<BufferHandle> {
        let buffer = BufferHandle(self.allocate_id());
        self.buffers.insert(buffer, Vec::new());
        self.record(DeviceCall::CreateBuffer(buffer));
        Ok(buffer)
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.record(DeviceCall::DeleteBuffer(buffer));
        self.buffers.remove(&buffer);
        self.buffer_bindings.retain(|_, bound| *bound != buffer);
        for attrib in self.vertex_attribs.values_mut() {
            if attrib.buffer == Some(buffer) {
                attrib.buffer = None;
            }
        }
    }

    fn bind_buffer(&mut self, target: u32, buffer: Option<BufferHandle>) {
        self.record(DeviceCall::BindBuffer { target, buffer });
        match buffer {
            Some(buffer) if !self.buffers.contains_key(&buffer) => {
                self.raise(format!("bind_buffer: {buffer:?} does not exist"));
            }
            Some(buffer) => {
                self.buffer_bindings.insert(target, buffer);
            }
            None => {
                self.buffer_bindings.remove(&target);
            }
        }
    }

    fn buffer_data(&mut self, target: u32, data: &[u8], usage: u32) {
        self.record(DeviceCall::BufferData {
            target,
            len: data.len(),
            usage,
        });
        match self.buffer_bindings.get(&target) {
            Some(buffer) => {
                self.buffers.insert(*buffer, data.to_vec());
            }
            None => self.raise(format!("buffer_data: nothing bound to {target:#06x}")),
        }
    }

    fn buffer_sub_data(&mut self, target: u32, offset: i32, data: &[u8]) {
        self.record(DeviceCall::BufferSubData {
            target,
            offset,
            len: data.len(),
        });
        let Some(buffer) = self.buffer_bindings.get(&target).copied() else {
            self.raise(format!("buffer_sub_data: nothing bound to {target:#06x}"));
            return;
        };
        let start = offset.max(0) as usize;
        let contents = self.buffers.entry(buffer).or_default();
        if start + data.len() > contents.len() {
            self.raise(format!("buffer_sub_data: range past end of {buffer:?}"));
            return;
        }
        contents[start..start + data.len()].copy_from_slice(data);
    }

    fn create_texture(&mut self) -> Result<TextureHandle> {
        let texture = TextureHandle(self.allocate_id());
        self.textures.insert(texture, TextureRecord::default());
        self.record(DeviceCall::CreateTexture(texture));
        Ok(texture)
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.record(DeviceCall::DeleteTexture(texture));
        self.textures.remove(&texture);
        self.texture_bindings.retain(|_, bound| *bound != texture);
    }

    fn active_texture(&mut self, unit: u32) {
        self.record(DeviceCall::ActiveTexture(unit));
        match unit.checked_sub(consts::TEXTURE0) {
            Some(index) => self.active_unit = index,
            None => self.raise(format!("active_texture: invalid unit {unit:#06x}")),
        }
    }

    fn bind_texture(&mut self, target: u32, texture: Option<TextureHandle>) {
        self.record(DeviceCall::BindTexture { target, texture });
        let key = (self.active_unit, target);
        match texture {
            Some(texture) => {
                self.texture_bindings.insert(key, texture);
            }
            None => {
                self.texture_bindings.remove(&key);
            }
        }
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
        self.record(DeviceCall::TexImage2D {
            target,
            level,
            internal_format,
            width,
            height,
            format,
            ty,
            len: pixels.map(|p| p.len()),
        });
        let Some(texture) = self.texture_bindings.get(&(self.active_unit, target)).copied() else {
            self.raise(format!("tex_image_2d: nothing bound to {target:#06x}"));
            return;
        };
        if let Some(record) = self.textures.get_mut(&texture) {
            if level == 0 {
                record.width = width;
                record.height = height;
                record.internal_format = internal_format;
            }
        }
    }

    fn tex_parameter_i32(&mut self, target: u32, pname: u32, value: i32) {
        self.record(DeviceCall::TexParameter {
            target,
            pname,
            value,
        });
        let bound = self.texture_bindings.get(&(self.active_unit, target)).copied();
        match bound.and_then(|texture| self.textures.get_mut(&texture)) {
            Some(record) => {
                record.params.insert(pname, value);
            }
            None => self.raise(format!("tex_parameter_i32: nothing bound to {target:#06x}")),
        }
    }

    fn generate_mipmap(&mut self, target: u32) {
        self.record(DeviceCall::GenerateMipmap(target));
        let bound = self.texture_bindings.get(&(self.active_unit, target)).copied();
        match bound.and_then(|texture| self.textures.get_mut(&texture)) {
            Some(record) => record.mipmapped = true,
            None => self.raise(format!("generate_mipmap: nothing bound to {target:#06x}")),
        }
    }

    fn create_shader(&mut self, stage: u32) -> Result<ShaderHandle> {
        let shader = ShaderHandle(self.allocate_id());
        self.shaders.insert(
            shader,
            ShaderRecord {
                stage,
                source: String::new(),
                compiled: false,
                log: String::new(),
            },
        );
        self.record(DeviceCall::CreateShader { stage, shader });
        Ok(shader)
    }

    fn shader_source(&mut self, shader: ShaderHandle, source: &str) {
        self.record(DeviceCall::ShaderSource(shader));
        if let Some(record) = self.shaders.get_mut(&shader) {
            record.source = source.to_string();
        }
    }

    fn compile_shader(&mut self, shader: ShaderHandle) {
        self.record(DeviceCall::CompileShader(shader));
        let failure = self.pending_compile_failure.take();
        if let Some(record) = self.shaders.get_mut(&shader) {
            match failure {
                Some(log) => {
                    record.compiled = false;
                    record.log = log;
                }
                None => {
                    record.compiled = true;
                    record.log.clear();
                }
            }
        }
    }

    fn shader_compile_status(&mut self, shader: ShaderHandle) -> bool {
        self.query("shader_compile_status", None);
        self.shaders.get(&shader).is_some_and(|s| s.compiled)
    }

    fn shader_info_log(&mut self, shader: ShaderHandle) -> String {
        self.query("shader_info_log", None);
        self.shaders
            .get(&shader)
            .map(|s| s.log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        self.record(DeviceCall::DeleteShader(shader));
        self.shaders.remove(&shader);
    }

    fn create_program(&mut self) -> Result<ProgramHandle> {
        let program = ProgramHandle(self.allocate_id());
        self.programs.insert(program, ProgramRecord::default());
        self.record(DeviceCall::CreateProgram(program));
        Ok(program)
    }

    fn attach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle) {
        self.record(DeviceCall::AttachShader { program, shader });
        if let Some(record) = self.programs.get_mut(&program) {
            record.shaders.push(shader);
        }
    }

    fn detach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle) {
        self.record(DeviceCall::DetachShader { program, shader });
        if let Some(record) = self.programs.get_mut(&program) {
            record.shaders.retain(|s| *s != shader);
        }
    }

    fn link_program(&mut self, program: ProgramHandle) {
        self.record(DeviceCall::LinkProgram(program));
        let failure = self.pending_link_failure.take();
        let attributes = self.reflected_attributes.clone();
        let uniforms = self.reflected_uniforms.clone();

        let Some(record) = self.programs.get_mut(&program) else {
            self.raise(format!("link_program: {program:?} does not exist"));
            return;
        };

        let uncompiled = record
            .shaders
            .iter()
            .any(|shader| !self.shaders.get(shader).is_some_and(|s| s.compiled));
        let failure = failure.or_else(|| {
            uncompiled.then(|| "one or more attached shaders are not compiled".to_string())
        });

        record.attrib_locations.clear();
        record.uniform_locations.clear();
        record.uniform_values.clear();

        if let Some(log) = failure {
            record.linked = false;
            record.log = log;
            record.attributes.clear();
            record.uniforms.clear();
            return;
        }

        let mut next_location = 0;
        for attribute in &attributes {
            if attribute.name.starts_with("gl_") {
                continue;
            }
            record
                .attrib_locations
                .insert(attribute.name.clone(), next_location);
            next_location += location_span(attribute.type_tag) * attribute.size.max(1) as u32;
        }

        let mut next_location = 0;
        for uniform in &uniforms {
            if uniform.name.starts_with("gl_") {
                continue;
            }
            let location = UniformLocation(next_location);
            record.uniform_locations.insert(uniform.name.clone(), location);
            record
                .uniform_locations
                .insert(base_name(&uniform.name).to_string(), location);
            next_location += uniform.size.max(1) as u32;
        }

        record.linked = true;
        record.log.clear();
        record.attributes = attributes;
        record.uniforms = uniforms;
    }

    fn program_link_status(&mut self, program: ProgramHandle) -> bool {
        self.query("program_link_status", None);
        self.programs.get(&program).is_some_and(|p| p.linked)
    }

    fn program_info_log(&mut self, program: ProgramHandle) -> String {
        self.query("program_info_log", None);
        self.programs
            .get(&program)
            .map(|p| p.log.clone())
            .unwrap_or_default()
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        self.record(DeviceCall::UseProgram(program));
        if let Some(handle) = program {
            if !self.programs.get(&handle).is_some_and(|p| p.linked) {
                self.raise(format!("use_program: {handle:?} is not linked"));
                return;
            }
        }
        self.current_program = program;
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.record(DeviceCall::DeleteProgram(program));
        self.programs.remove(&program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn active_attributes(&mut self, program: ProgramHandle) -> Vec<ActiveVariable> {
        self.query("active_attributes", None);
        self.programs
            .get(&program)
            .map(|p| p.attributes.clone())
            .unwrap_or_default()
    }

    fn active_uniforms(&mut self, program: ProgramHandle) -> Vec<ActiveVariable> {
        self.query("active_uniforms", None);
        self.programs
            .get(&program)
            .map(|p| p.uniforms.clone())
            .unwrap_or_default()
    }

    fn attrib_location(&mut self, program: ProgramHandle, name: &str) -> Option<u32> {
        self.query("attrib_location", None);
        self.programs
            .get(&program)
            .and_then(|p| p.attrib_locations.get(name).copied())
    }

    fn uniform_location(
        &mut self,
        program: ProgramHandle,
        name: &str,
    ) -> Option<UniformLocation> {
        self.query("uniform_location", None);
        self.programs
            .get(&program)
            .and_then(|p| p.uniform_locations.get(name).copied())
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        self.record(DeviceCall::EnableVertexAttribArray(index));
        self.vertex_attribs.entry(index).or_default().enabled = true;
    }

    fn disable_vertex_attrib_array(&mut self, index: u32) {
        self.record(DeviceCall::DisableVertexAttribArray(index));
        self.vertex_attribs.entry(index).or_default().enabled = false;
    }

    fn vertex_attrib_array_enabled(&mut self, index: u32) -> bool {
        self.query("vertex_attrib_array_enabled", Some(index));
        self.vertex_attrib(index).enabled
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
        self.record(DeviceCall::VertexAttribPointer {
            index,
            size,
            ty,
            normalized,
            stride,
            offset,
        });
        let Some(buffer) = self.bound_buffer(consts::ARRAY_BUFFER) else {
            self.raise("vertex_attrib_pointer: no ARRAY_BUFFER bound".to_string());
            return;
        };
        let attrib = self.vertex_attribs.entry(index).or_default();
        attrib.buffer = Some(buffer);
        attrib.size = size;
        attrib.ty = ty;
        attrib.normalized = normalized;
        attrib.integer = false;
        attrib.stride = stride;
        attrib.offset = offset;
    }

    fn vertex_attrib_i_pointer(&mut self, index: u32, size: i32, ty: u32, stride: i32, offset: i32) {
        self.record(DeviceCall::VertexAttribIPointer {
            index,
            size,
            ty,
            stride,
            offset,
        });
        let Some(buffer) = self.bound_buffer(consts::ARRAY_BUFFER) else {
            self.raise("vertex_attrib_i_pointer: no ARRAY_BUFFER bound".to_string());
            return;
        };
        let attrib = self.vertex_attribs.entry(index).or_default();
        attrib.buffer = Some(buffer);
        attrib.size = size;
        attrib.ty = ty;
        attrib.normalized = false;
        attrib.integer = true;
        attrib.stride = stride;
        attrib.offset = offset;
    }

    fn vertex_attrib_divisor(&mut self, index: u32, divisor: u32) {
        self.record(DeviceCall::VertexAttribDivisor { index, divisor });
        self.vertex_attribs.entry(index).or_default().divisor = divisor;
    }

    record_uniform!(uniform_1_f32, F32, f32, x);
    record_uniform!(uniform_2_f32, F32, f32, x, y);
    record_uniform!(uniform_3_f32, F32, f32, x, y, z);
    record_uniform!(uniform_4_f32, F32, f32, x, y, z, w);
    record_uniform!(uniform_1_i32, I32, i32, x);
    record_uniform!(uniform_2_i32, I32, i32, x, y);
    record_uniform!(uniform_3_i32, I32, i32, x, y, z);
    record_uniform!(uniform_4_i32, I32, i32, x, y, z, w);
    record_uniform!(uniform_1_u32, U32, u32, x);
    record_uniform!(uniform_2_u32, U32, u32, x, y);
    record_uniform!(uniform_3_u32, U32, u32, x, y, z);
    record_uniform!(uniform_4_u32, U32, u32, x, y, z, w);

    record_uniform_slice!(uniform_1_f32_slice, F32, f32);
    record_uniform_slice!(uniform_2_f32_slice, F32, f32);
    record_uniform_slice!(uniform_3_f32_slice, F32, f32);
    record_uniform_slice!(uniform_4_f32_slice, F32, f32);
    record_uniform_slice!(uniform_1_i32_slice, I32, i32);
    record_uniform_slice!(uniform_2_i32_slice, I32, i32);
    record_uniform_slice!(uniform_3_i32_slice, I32, i32);
    record_uniform_slice!(uniform_4_i32_slice, I32, i32);
    record_uniform_slice!(uniform_1_u32_slice, U32, u32);
    record_uniform_slice!(uniform_2_u32_slice, U32, u32);
    record_uniform_slice!(uniform_3_u32_slice, U32, u32);
    record_uniform_slice!(uniform_4_u32_slice, U32, u32);

    record_uniform_matrix!(uniform_matrix_2_f32_slice);
    record_uniform_matrix!(uniform_matrix_3_f32_slice);
    record_uniform_matrix!(uniform_matrix_4_f32_slice);
    record_uniform_matrix!(uniform_matrix_2x3_f32_slice);
    record_uniform_matrix!(uniform_matrix_2x4_f32_slice);
    record_uniform_matrix!(uniform_matrix_3x2_f32_slice);
    record_uniform_matrix!(uniform_matrix_3x4_f32_slice);
    record_uniform_matrix!(uniform_matrix_4x2_f32_slice);
    record_uniform_matrix!(uniform_matrix_4x3_f32_slice);

    fn enable(&mut self, cap: u32) {
        self.record(DeviceCall::Enable(cap));
        self.capabilities.insert(cap);
    }

    fn disable(&mut self, cap: u32) {
        self.record(DeviceCall::Disable(cap));
        self.capabilities.remove(&cap);
    }

    fn is_enabled(&mut self, cap: u32) -> bool {
        self.query("is_enabled", Some(cap));
        self.capabilities.contains(&cap)
    }

    fn get_parameter_i32(&mut self, pname: u32) -> i32 {
        let values = self.parameter_values("get_parameter_i32", pname);
        // Masks are stored unsigned and read back with two's complement wrapping
        values.first().map(|v| *v as i64 as i32).unwrap_or(0)
    }

    fn get_parameter_f32(&mut self, pname: u32) -> f32 {
        let values = self.parameter_values("get_parameter_f32", pname);
        values.first().map(|v| *v as f32).unwrap_or(0.0)
    }

    fn get_parameter_i32_slice(&mut self, pname: u32, out: &mut [i32]) {
        let values = self.parameter_values("get_parameter_i32_slice", pname);
        for (slot, value) in out.iter_mut().zip(values) {
            *slot = value as i64 as i32;
        }
    }

    fn get_parameter_f32_slice(&mut self, pname: u32, out: &mut [f32]) {
        let values = self.parameter_values("get_parameter_f32_slice", pname);
        for (slot, value) in out.iter_mut().zip(values) {
            *slot = value as f32;
        }
    }

    fn blend_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.record(DeviceCall::BlendColor([r, g, b, a]));
        self.store(consts::BLEND_COLOR, &[r as f64, g as f64, b as f64, a as f64]);
    }

    fn blend_equation_separate(&mut self, mode_rgb: u32, mode_alpha: u32) {
        self.record(DeviceCall::BlendEquationSeparate {
            rgb: mode_rgb,
            alpha: mode_alpha,
        });
        self.store(consts::BLEND_EQUATION_RGB, &[mode_rgb as f64]);
        self.store(consts::BLEND_EQUATION_ALPHA, &[mode_alpha as f64]);
    }

    fn blend_func_separate(&mut self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32) {
        self.record(DeviceCall::BlendFuncSeparate {
            src_rgb,
            dst_rgb,
            src_alpha,
            dst_alpha,
        });
        self.store(consts::BLEND_SRC_RGB, &[src_rgb as f64]);
        self.store(consts::BLEND_DST_RGB, &[dst_rgb as f64]);
        self.store(consts::BLEND_SRC_ALPHA, &[src_alpha as f64]);
        self.store(consts::BLEND_DST_ALPHA, &[dst_alpha as f64]);
    }

    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.record(DeviceCall::ClearColor([r, g, b, a]));
        self.store(
            consts::COLOR_CLEAR_VALUE,
            &[r as f64, g as f64, b as f64, a as f64],
        );
    }

    fn clear_depth(&mut self, depth: f32) {
        self.record(DeviceCall::ClearDepth(depth));
        self.store(consts::DEPTH_CLEAR_VALUE, &[depth as f64]);
    }

    fn clear_stencil(&mut self, stencil: i32) {
        self.record(DeviceCall::ClearStencil(stencil));
        self.store(consts::STENCIL_CLEAR_VALUE, &[stencil as f64]);
    }

    fn color_mask(&mut self, r: bool, g: bool, b: bool, a: bool) {
        self.record(DeviceCall::ColorMask([r, g, b, a]));
        let mask = [r, g, b, a].map(|c| if c { 1.0 } else { 0.0 });
        self.store(consts::COLOR_WRITEMASK, &mask);
    }

    fn cull_face(&mut self, mode: u32) {
        self.record(DeviceCall::CullFace(mode));
        self.store(consts::CULL_FACE_MODE, &[mode as f64]);
    }

    fn front_face(&mut self, mode: u32) {
        self.record(DeviceCall::FrontFace(mode));
        self.store(consts::FRONT_FACE, &[mode as f64]);
    }

    fn depth_func(&mut self, func: u32) {
        self.record(DeviceCall::DepthFunc(func));
        self.store(consts::DEPTH_FUNC, &[func as f64]);
    }

    fn depth_mask(&mut self, enabled: bool) {
        self.record(DeviceCall::DepthMask(enabled));
        self.store(consts::DEPTH_WRITEMASK, &[if enabled { 1.0 } else { 0.0 }]);
    }

    fn depth_range(&mut self, near: f32, far: f32) {
        self.record(DeviceCall::DepthRange(near, far));
        self.store(consts::DEPTH_RANGE, &[near as f64, far as f64]);
    }

    fn line_width(&mut self, width: f32) {
        self.record(DeviceCall::LineWidth(width));
        self.store(consts::LINE_WIDTH, &[width as f64]);
    }

    fn polygon_offset(&mut self, factor: f32, units: f32) {
        self.record(DeviceCall::PolygonOffset { factor, units });
        self.store(consts::POLYGON_OFFSET_FACTOR, &[factor as f64]);
        self.store(consts::POLYGON_OFFSET_UNITS, &[units as f64]);
    }

    fn sample_coverage(&mut self, value: f32, invert: bool) {
        self.record(DeviceCall::SampleCoverage { value, invert });
        self.store(consts::SAMPLE_COVERAGE_VALUE, &[value as f64]);
        self.store(
            consts::SAMPLE_COVERAGE_INVERT,
            &[if invert { 1.0 } else { 0.0 }],
        );
    }

    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.record(DeviceCall::Scissor([x, y, width, height]));
        self.store(
            consts::SCISSOR_BOX,
            &[x as f64, y as f64, width as f64, height as f64],
        );
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.record(DeviceCall::Viewport([x, y, width, height]));
        self.store(
            consts::VIEWPORT,
            &[x as f64, y as f64, width as f64, height as f64],
        );
    }

    fn stencil_func_separate(&mut self, face: u32, func: u32, reference: i32, mask: u32) {
        self.record(DeviceCall::StencilFuncSeparate {
            face,
            func,
            reference,
            mask,
        });
        for pname in Self::face_registers(face, consts::STENCIL_FUNC, consts::STENCIL_BACK_FUNC) {
            self.store(pname, &[func as f64]);
        }
        for pname in Self::face_registers(face, consts::STENCIL_REF, consts::STENCIL_BACK_REF) {
            self.store(pname, &[reference as f64]);
        }
        for pname in Self::face_registers(
            face,
            consts::STENCIL_VALUE_MASK,
            consts::STENCIL_BACK_VALUE_MASK,
        ) {
            self.store(pname, &[mask as f64]);
        }
    }

    fn stencil_op_separate(&mut self, face: u32, fail: u32, depth_fail: u32, depth_pass: u32) {
        self.record(DeviceCall::StencilOpSeparate {
            face,
            fail,
            depth_fail,
            depth_pass,
        });
        for pname in Self::face_registers(face, consts::STENCIL_FAIL, consts::STENCIL_BACK_FAIL) {
            self.store(pname, &[fail as f64]);
        }
        for pname in Self::face_registers(
            face,
            consts::STENCIL_PASS_DEPTH_FAIL,
            consts::STENCIL_BACK_PASS_DEPTH_FAIL,
        ) {
            self.store(pname, &[depth_fail as f64]);
        }
        for pname in Self::face_registers(
            face,
            consts::STENCIL_PASS_DEPTH_PASS,
            consts::STENCIL_BACK_PASS_DEPTH_PASS,
        ) {
            self.store(pname, &[depth_pass as f64]);
        }
    }

    fn stencil_mask_separate(&mut self, face: u32, mask: u32) {
        self.record(DeviceCall::StencilMaskSeparate { face, mask });
        for pname in Self::face_registers(
            face,
            consts::STENCIL_WRITEMASK,
            consts::STENCIL_BACK_WRITEMASK,
        ) {
            self.store(pname, &[mask as f64]);
        }
    }

    fn pixel_store_i32(&mut self, pname: u32, value: i32) {
        self.record(DeviceCall::PixelStore { pname, value });
        if !self.parameters.contains_key(&pname) {
            self.raise(format!("pixel_store_i32: unknown parameter {pname:#06x}"));
            return;
        }
        self.store(pname, &[value as f64]);
    }

    fn clear(&mut self, mask: u32) {
        self.record(DeviceCall::Clear(mask));
    }

    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32) {
        self.record(DeviceCall::DrawArrays {
            mode,
            first,
            count,
            instances: None,
        });
        self.check_draw("draw_arrays");
    }

    fn draw_elements(&mut self, mode: u32, count: i32, ty: u32, offset: i32) {
        self.record(DeviceCall::DrawElements {
            mode,
            count,
            ty,
            offset,
            instances: None,
        });
        self.check_draw("draw_elements");
        if self.bound_buffer(consts::ELEMENT_ARRAY_BUFFER).is_none() {
            self.raise("draw_elements: no ELEMENT_ARRAY_BUFFER bound".to_string());
        }
    }

    fn draw_arrays_instanced(&mut self, mode: u32, first: i32, count: i32, instances: i32) {
        self.record(DeviceCall::DrawArrays {
            mode,
            first,
            count,
            instances: Some(instances),
        });
        self.check_draw("draw_arrays_instanced");
    }

    fn draw_elements_instanced(
        &mut self,
        mode: u32,
        count: i32,
        ty: u32,
        offset: i32,
        instances: i32,
    ) {
        self.record(DeviceCall::DrawElements {
            mode,
            count,
            ty,
            offset,
            instances: Some(instances),
        });
        self.check_draw("draw_elements_instanced");
        if self.bound_buffer(consts::ELEMENT_ARRAY_BUFFER).is_none() {
            self.raise("draw_elements_instanced: no ELEMENT_ARRAY_BUFFER bound".to_string());
        }
    }
}
