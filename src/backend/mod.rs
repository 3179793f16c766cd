//! Device abstraction layer
//!
//! Provides the [`Device`] trait every backend implements, the raw enumerant table and the
//! typed views the rest of the crate works with.

pub mod consts;
pub mod recording;
pub mod traits;
pub mod types;

// The glow backend needs a live GL context and is only built on request
#[cfg(feature = "glow-backend")]
pub mod glow_backend;

pub use recording::{DeviceCall, RecordingDevice, UniformData, VertexAttribState};
pub use traits::*;
pub use types::*;

#[cfg(feature = "glow-backend")]
pub use glow_backend::GlowDevice;
