//! Graphics Binding - shader variable binding over a stateful GL-style device
//!
//! The device is an opaque, globally-stateful register set driven through an imperative
//! command interface. This crate sits on top of it and provides:
//! - Programs that introspect their active attributes and uniforms after linking
//! - A closed family of typed uniforms, each dispatching to exactly one device entry point
//! - Vertex attributes fed from buffers, with their enabled flag mirrored locally
//! - A cached mirror of global device state that elides redundant writes
//! - Buffers and textures with type-checked uploads
//!
//! Everything goes through a [`RenderingContext`], which owns the [`Device`] and the state
//! cache. Two devices are available: [`RecordingDevice`], a software stand-in used by the
//! tests, and `GlowDevice` behind the `glow-backend` feature.

pub mod backend;
pub mod context;
pub mod error;
pub mod program;
pub mod resources;
pub mod state;

pub use backend::{Device, RecordingDevice};
pub use context::RenderingContext;
pub use error::{Error, Result};
pub use program::{
    ArrayView, Attribute, Program, ProgramDescriptor, Uniform, UniformValue, Variable,
};
pub use resources::{Buffer, BufferDescriptor, BufferElement, Texture, TextureDescriptor, VertexSource};

#[cfg(feature = "glow-backend")]
pub use backend::GlowDevice;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration for a [`RenderingContext`]
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Name used in log output
    pub label: String,
    /// Skip state writes whose value already matches the cache
    pub elide_redundant_state: bool,
    /// Bounds-check `(offset, length)` windows of uniform array values
    pub check_array_windows: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            label: "Rendering Context".to_string(),
            elide_redundant_state: true,
            check_array_windows: true,
        }
    }
}
