//! Shader programs and their variables
//!
//! A [`Program`] compiles and links two stages, then enumerates the active attributes and
//! uniforms exactly once per successful link. Each variable is materialized as the concrete
//! type its reported type tag calls for and stays valid until the program is relinked or
//! deleted.

mod attribute;
mod shader;
mod uniform;
mod variable;

pub use attribute::Attribute;
pub use uniform::*;
pub use variable::{Variable, VariableInfo, VariableSet};

use crate::backend::traits::{Device, ProgramHandle};
use crate::backend::types::ShaderStage;
use crate::context::RenderingContext;
use crate::error::{Error, Result};
use crate::resources::VertexSource;

/// Program descriptor
#[derive(Debug, Clone, Default)]
pub struct ProgramDescriptor {
    pub label: Option<String>,
    pub vertex_source: String,
    pub fragment_source: String,
}

impl ProgramDescriptor {
    pub fn new(vertex_source: impl Into<String>, fragment_source: impl Into<String>) -> Self {
        Self {
            label: None,
            vertex_source: vertex_source.into(),
            fragment_source: fragment_source.into(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// A device program object and the variables introspected from it
#[derive(Debug)]
pub struct Program {
    label: Option<String>,
    handle: ProgramHandle,
    vertex_source: String,
    fragment_source: String,
    linked: bool,
    attributes: VariableSet<Attribute>,
    uniforms: VariableSet<Uniform>,
}

impl Program {
    /// Allocate the program object; nothing is compiled until [`Program::link`]
    pub fn new<D: Device>(ctx: &mut RenderingContext<D>, desc: &ProgramDescriptor) -> Result<Self> {
        let handle = ctx.device.create_program()?;
        Ok(Self {
            label: desc.label.clone(),
            handle,
            vertex_source: desc.vertex_source.clone(),
            fragment_source: desc.fragment_source.clone(),
            linked: false,
            attributes: VariableSet::default(),
            uniforms: VariableSet::default(),
        })
    }

    /// Create and link in one step
    pub fn build<D: Device>(ctx: &mut RenderingContext<D>, desc: &ProgramDescriptor) -> Result<Self> {
        let mut program = Self::new(ctx, desc)?;
        program.link(ctx)?;
        Ok(program)
    }

    /// Compile both stages, link, and introspect the active variables
    ///
    /// Any previous variables are discarded first. On failure the program is left unlinked
    /// with no variables.
    pub fn link<D: Device>(&mut self, ctx: &mut RenderingContext<D>) -> Result<()> {
        self.linked = false;
        self.attributes.clear();
        self.uniforms.clear();

        let vertex = shader::compile(ctx, ShaderStage::Vertex, &self.vertex_source)?;
        let fragment = match shader::compile(ctx, ShaderStage::Fragment, &self.fragment_source) {
            Ok(fragment) => fragment,
            Err(err) => {
                ctx.device.delete_shader(vertex);
                return Err(err);
            }
        };

        ctx.device.attach_shader(self.handle, vertex);
        ctx.device.attach_shader(self.handle, fragment);
        ctx.device.link_program(self.handle);
        for shader in [vertex, fragment] {
            ctx.device.detach_shader(self.handle, shader);
            ctx.device.delete_shader(shader);
        }

        if !ctx.device.program_link_status(self.handle) {
            let log = ctx.device.program_info_log(self.handle);
            log::error!("Program {:?} failed to link: {}", self.label, log);
            return Err(Error::Link { log });
        }

        if let Err(err) = self.introspect(ctx) {
            self.attributes.clear();
            self.uniforms.clear();
            return Err(err);
        }
        self.linked = true;
        log::debug!(
            "Linked program {:?}: {} attributes, {} uniforms",
            self.label,
            self.attributes.len(),
            self.uniforms.len()
        );
        Ok(())
    }

    fn introspect<D: Device>(&mut self, ctx: &mut RenderingContext<D>) -> Result<()> {
        for active in ctx.device.active_attributes(self.handle) {
            if active.name.starts_with("gl_") {
                log::debug!("Skipping built-in attribute {}", active.name);
                continue;
            }
            let Some(location) = ctx.device.attrib_location(self.handle, &active.name) else {
                log::debug!("Attribute {} has no location, skipping", active.name);
                continue;
            };
            let info = VariableInfo::from_active(&active, self.handle);
            let attribute = Attribute::new(ctx, info, location)?;
            if !self.attributes.insert(attribute) {
                log::warn!("Duplicate attribute {} ignored", active.name);
            }
        }

        for active in ctx.device.active_uniforms(self.handle) {
            if active.name.starts_with("gl_") {
                log::debug!("Skipping built-in uniform {}", active.name);
                continue;
            }
            let Some(location) = ctx.device.uniform_location(self.handle, &active.name) else {
                log::debug!("Uniform {} has no location, skipping", active.name);
                continue;
            };
            let info = VariableInfo::from_active(&active, self.handle);
            let uniform = Uniform::from_info(info, location)?;
            log::trace!("Uniform {} -> {}", active.name, uniform.kind());
            if !self.uniforms.insert(uniform) {
                log::warn!("Duplicate uniform {} ignored", active.name);
            }
        }
        Ok(())
    }

    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn is_linked(&self) -> bool {
        self.linked
    }

    /// Make this the active program; skipped when it already is
    pub fn use_program<D: Device>(&self, ctx: &mut RenderingContext<D>) -> Result<()> {
        if !self.linked {
            return Err(Error::ProgramNotLinked);
        }
        ctx.bind_program(Some(self.handle));
        Ok(())
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.attributes.get_mut(name)
    }

    pub fn attributes(&self) -> &VariableSet<Attribute> {
        &self.attributes
    }

    pub fn uniform(&self, name: &str) -> Option<&Uniform> {
        self.uniforms.get(name)
    }

    pub fn uniform_mut(&mut self, name: &str) -> Option<&mut Uniform> {
        self.uniforms.get_mut(name)
    }

    pub fn uniforms(&self) -> &VariableSet<Uniform> {
        &self.uniforms
    }

    /// Assign a uniform by name
    pub fn set_uniform<D: Device>(
        &mut self,
        ctx: &mut RenderingContext<D>,
        name: &str,
        value: impl Into<UniformValue>,
    ) -> Result<()> {
        let uniform = self
            .uniforms
            .get_mut(name)
            .ok_or_else(|| Error::UnknownVariable(name.to_string()))?;
        uniform.set_value(ctx, value.into())
    }

    /// Point an attribute at a vertex source by name
    pub fn set_attribute<D: Device>(
        &mut self,
        ctx: &mut RenderingContext<D>,
        name: &str,
        source: VertexSource,
    ) -> Result<()> {
        let attribute = self
            .attributes
            .get_mut(name)
            .ok_or_else(|| Error::UnknownVariable(name.to_string()))?;
        attribute.set_value(ctx, source)
    }

    /// Release the program object and every variable with it
    pub fn delete<D: Device>(self, ctx: &mut RenderingContext<D>) {
        log::debug!("Deleting program {:?}", self.label);
        ctx.forget_program(self.handle);
        ctx.device.delete_program(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::traits::ActiveVariable;
    use crate::backend::{consts, DeviceCall, RecordingDevice};

    fn descriptor() -> ProgramDescriptor {
        ProgramDescriptor::new("void main() {}", "void main() {}").with_label("test")
    }

    #[test]
    fn test_shaders_released_after_link() {
        let mut ctx = RenderingContext::new(RecordingDevice::new());
        let program = Program::build(&mut ctx, &descriptor()).unwrap();
        assert!(program.is_linked());
        assert_eq!(ctx.device().live_objects(), (0, 0, 0, 1));
    }

    #[test]
    fn test_compile_failure_reports_stage() {
        let mut ctx = RenderingContext::new(RecordingDevice::new());
        let mut program = Program::new(&mut ctx, &descriptor()).unwrap();
        ctx.device_mut().fail_next_compile("0:1: syntax error");

        let err = program.link(&mut ctx).unwrap_err();
        assert_eq!(
            err,
            Error::Compile {
                stage: ShaderStage::Vertex,
                log: "0:1: syntax error".to_string(),
            }
        );
        assert!(!program.is_linked());
        assert!(!ctx
            .device()
            .calls()
            .iter()
            .any(|call| matches!(call, DeviceCall::LinkProgram(_))));
        assert_eq!(ctx.device().live_objects().2, 0);
    }

    #[test]
    fn test_use_requires_link() {
        let mut ctx = RenderingContext::new(RecordingDevice::new());
        let program = Program::new(&mut ctx, &descriptor()).unwrap();
        assert_eq!(program.use_program(&mut ctx), Err(Error::ProgramNotLinked));
    }

    #[test]
    fn test_unsupported_uniform_fails_link() {
        let mut device = RecordingDevice::new();
        device.set_program_reflection(
            vec![ActiveVariable::new("a_position", consts::FLOAT_VEC3, 1)],
            vec![ActiveVariable::new("u_counter", 0x92DB, 1)],
        );
        let mut ctx = RenderingContext::new(device);
        let mut program = Program::new(&mut ctx, &descriptor()).unwrap();

        let err = program.link(&mut ctx).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVariable { type_tag: 0x92DB, .. }));
        assert!(!program.is_linked());
        assert!(program.attributes().is_empty());
        assert!(program.uniforms().is_empty());
    }

    #[test]
    fn test_set_uniform_by_name() {
        let mut device = RecordingDevice::new();
        device.set_program_reflection(
            Vec::new(),
            vec![ActiveVariable::new("u_time", consts::FLOAT, 1)],
        );
        let mut ctx = RenderingContext::new(device);
        let mut program = Program::build(&mut ctx, &descriptor()).unwrap();

        program.set_uniform(&mut ctx, "u_time", 0.25f32).unwrap();
        assert_eq!(
            program.uniform("u_time").and_then(|u| u.value()),
            Some(&UniformValue::Float(0.25))
        );
        assert_eq!(
            program.set_uniform(&mut ctx, "u_missing", 1.0f32),
            Err(Error::UnknownVariable("u_missing".to_string()))
        );
    }

    #[test]
    fn test_delete_forgets_active_program() {
        let mut ctx = RenderingContext::new(RecordingDevice::new());
        let program = Program::build(&mut ctx, &descriptor()).unwrap();
        program.use_program(&mut ctx).unwrap();
        program.delete(&mut ctx);
        assert_eq!(ctx.active_program(), None);
        assert_eq!(ctx.device().live_objects().3, 0);
    }

    #[test]
    fn test_uniform_write_on_active_program_is_one_call() {
        let mut device = RecordingDevice::new();
        device.set_program_reflection(
            Vec::new(),
            vec![ActiveVariable::new("u_time", consts::FLOAT, 1)],
        );
        let mut ctx = RenderingContext::new(device);
        let mut program = Program::build(&mut ctx, &descriptor()).unwrap();
        let other = Program::build(&mut ctx, &descriptor()).unwrap();
        other.use_program(&mut ctx).unwrap();

        // Inactive owner: activation plus the write
        ctx.device_mut().clear_calls();
        program.set_uniform(&mut ctx, "u_time", 1.0f32).unwrap();
        assert_eq!(ctx.device().writes().count(), 2);

        // Already active: just the write
        ctx.device_mut().clear_calls();
        program.set_uniform(&mut ctx, "u_time", 2.0f32).unwrap();
        assert_eq!(ctx.device().writes().count(), 1);
    }
}
