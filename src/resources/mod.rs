//! Resource management
//!
//! Buffers and textures: device memory objects with bind and upload operations.

mod buffer;
mod element;
mod texture;

pub use buffer::*;
pub use element::BufferElement;
pub use texture::*;
