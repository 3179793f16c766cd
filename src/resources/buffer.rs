//! Device buffers

use crate::backend::traits::{BufferHandle, Device};
use crate::backend::types::{BufferTarget, BufferUsage, DataType};
use crate::context::RenderingContext;
use crate::error::{Error, Result};

use super::element::{scalar_count, BufferElement};

/// Buffer descriptor
#[derive(Debug, Clone)]
pub struct BufferDescriptor {
    pub label: Option<String>,
    /// Binding point the buffer is bound to by default
    pub target: BufferTarget,
    pub usage: BufferUsage,
    /// Scalar type of the contents
    pub element_type: DataType,
    /// Scalars per vertex (or per index, always 1)
    pub components: u32,
}

impl Default for BufferDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            target: BufferTarget::Array,
            usage: BufferUsage::StaticDraw,
            element_type: DataType::Float,
            components: 1,
        }
    }
}

impl BufferDescriptor {
    /// Vertex data of `components` floats per vertex
    pub fn vertices(label: &str, components: u32) -> Self {
        Self {
            label: Some(label.to_string()),
            components,
            ..Default::default()
        }
    }

    /// Index data of `element_type`
    pub fn indices(label: &str, element_type: DataType) -> Self {
        Self {
            label: Some(label.to_string()),
            target: BufferTarget::ElementArray,
            element_type,
            ..Default::default()
        }
    }
}

/// Where and how a vertex attribute reads from a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexSource {
    pub buffer: BufferHandle,
    /// Scalars per vertex, 1 to 4
    pub components: u32,
    pub data_type: DataType,
    /// Map integer data to `[0, 1]` / `[-1, 1]` when converted to float
    pub normalized: bool,
    /// Bytes between consecutive vertices, 0 for tightly packed
    pub stride: u32,
    /// Byte offset of the first vertex
    pub offset: u32,
}

impl VertexSource {
    pub fn components(mut self, components: u32) -> Self {
        self.components = components;
        self
    }

    pub fn normalized(mut self, normalized: bool) -> Self {
        self.normalized = normalized;
        self
    }

    pub fn stride(mut self, stride: u32) -> Self {
        self.stride = stride;
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Bytes one vertex occupies in the buffer
    pub fn vertex_size(&self) -> u32 {
        if self.stride == 0 {
            self.components * self.data_type.size() as u32
        } else {
            self.stride
        }
    }
}

/// A device buffer with a declared element layout
///
/// The device handle is allocated on creation and only released by [`Buffer::delete`].
#[derive(Debug)]
pub struct Buffer {
    label: Option<String>,
    handle: BufferHandle,
    target: BufferTarget,
    usage: BufferUsage,
    element_type: DataType,
    components: u32,
    byte_length: usize,
}

impl Buffer {
    pub fn new<D: Device>(ctx: &mut RenderingContext<D>, desc: &BufferDescriptor) -> Result<Self> {
        if desc.components == 0 {
            return Err(Error::Resource(format!(
                "buffer {:?} declares zero components",
                desc.label
            )));
        }
        let handle = ctx.device.create_buffer()?;
        log::debug!(
            "Created buffer {:?} ({:?}, {} x {})",
            desc.label,
            desc.target,
            desc.components,
            desc.element_type.name()
        );
        Ok(Self {
            label: desc.label.clone(),
            handle,
            target: desc.target,
            usage: desc.usage,
            element_type: desc.element_type,
            components: desc.components,
            byte_length: 0,
        })
    }

    /// Create a buffer and upload `data` with the descriptor's usage
    pub fn with_data<D: Device, T: BufferElement>(
        ctx: &mut RenderingContext<D>,
        desc: &BufferDescriptor,
        data: &[T],
    ) -> Result<Self> {
        let mut buffer = Self::new(ctx, desc)?;
        buffer.upload(ctx, data, desc.usage)?;
        Ok(buffer)
    }

    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Binding point the buffer is currently bound to
    pub fn target(&self) -> BufferTarget {
        self.target
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn element_type(&self) -> DataType {
        self.element_type
    }

    pub fn components(&self) -> u32 {
        self.components
    }

    pub fn byte_length(&self) -> usize {
        self.byte_length
    }

    /// Bytes per vertex when tightly packed
    pub fn stride(&self) -> usize {
        self.element_type.size() * self.components as usize
    }

    /// Number of complete vertices (or indices) stored
    pub fn len(&self) -> usize {
        self.byte_length / self.stride()
    }

    pub fn is_empty(&self) -> bool {
        self.byte_length == 0
    }

    /// Bind to the current binding point
    ///
    /// Always issues the bind; the device is the only record of what is bound.
    pub fn bind<D: Device>(&self, ctx: &mut RenderingContext<D>) {
        ctx.device.bind_buffer(self.target.to_raw(), Some(self.handle));
    }

    /// Move the buffer to another binding point and bind it there
    pub fn bind_to<D: Device>(&mut self, ctx: &mut RenderingContext<D>, target: BufferTarget) {
        self.target = target;
        self.bind(ctx);
    }

    /// Replace the contents with `data`
    pub fn upload<D: Device, T: BufferElement>(
        &mut self,
        ctx: &mut RenderingContext<D>,
        data: &[T],
        usage: BufferUsage,
    ) -> Result<()> {
        self.check_elements(data)?;
        let bytes: &[u8] = bytemuck::cast_slice(data);
        self.bind(ctx);
        ctx.device.buffer_data(self.target.to_raw(), bytes, usage.to_raw());
        self.byte_length = bytes.len();
        self.usage = usage;
        log::trace!("Uploaded {} bytes to buffer {:?}", bytes.len(), self.label);
        Ok(())
    }

    /// Overwrite part of the contents, starting at vertex `first`
    pub fn upload_sub_data<D: Device, T: BufferElement>(
        &mut self,
        ctx: &mut RenderingContext<D>,
        first: usize,
        data: &[T],
    ) -> Result<()> {
        self.check_elements(data)?;
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let offset = first * self.stride();
        if offset + bytes.len() > self.byte_length {
            return Err(Error::Resource(format!(
                "write of {} bytes at {} exceeds the {} bytes of buffer {:?}",
                bytes.len(),
                offset,
                self.byte_length,
                self.label
            )));
        }
        let offset = i32::try_from(offset)
            .map_err(|_| Error::Resource(format!("buffer offset {offset} out of range")))?;
        self.bind(ctx);
        ctx.device.buffer_sub_data(self.target.to_raw(), offset, bytes);
        Ok(())
    }

    fn check_elements<T: BufferElement>(&self, data: &[T]) -> Result<()> {
        if T::DATA_TYPE != self.element_type {
            return Err(Error::Resource(format!(
                "buffer {:?} holds {} elements, got {}",
                self.label,
                self.element_type.name(),
                T::DATA_TYPE.name()
            )));
        }
        let scalars = scalar_count(data);
        if scalars % self.components as usize != 0 {
            return Err(Error::Resource(format!(
                "{} scalars is not a multiple of the {} components of buffer {:?}",
                scalars, self.components, self.label
            )));
        }
        Ok(())
    }

    /// Tightly packed attribute source over the whole buffer
    pub fn vertex_source(&self) -> VertexSource {
        VertexSource {
            buffer: self.handle,
            components: self.components,
            data_type: self.element_type,
            normalized: false,
            stride: 0,
            offset: 0,
        }
    }

    /// Release the device buffer
    pub fn delete<D: Device>(self, ctx: &mut RenderingContext<D>) {
        log::debug!("Deleting buffer {:?}", self.label);
        ctx.device.delete_buffer(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{consts, DeviceCall, RecordingDevice};

    fn context() -> RenderingContext<RecordingDevice> {
        RenderingContext::new(RecordingDevice::new())
    }

    #[test]
    fn test_upload_binds_first() {
        let mut ctx = context();
        let mut buffer = Buffer::new(&mut ctx, &BufferDescriptor::vertices("positions", 3)).unwrap();
        ctx.device_mut().clear_calls();

        buffer
            .upload(&mut ctx, &[[0.0f32, 1.0, 2.0], [3.0, 4.0, 5.0]], BufferUsage::DynamicDraw)
            .unwrap();

        assert_eq!(
            ctx.device().calls(),
            &[
                DeviceCall::BindBuffer {
                    target: consts::ARRAY_BUFFER,
                    buffer: Some(buffer.handle()),
                },
                DeviceCall::BufferData {
                    target: consts::ARRAY_BUFFER,
                    len: 24,
                    usage: consts::DYNAMIC_DRAW,
                },
            ]
        );
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.usage(), BufferUsage::DynamicDraw);
    }

    #[test]
    fn test_upload_rejects_wrong_element_type() {
        let mut ctx = context();
        let mut buffer = Buffer::new(&mut ctx, &BufferDescriptor::vertices("positions", 2)).unwrap();
        ctx.device_mut().clear_calls();

        let err = buffer
            .upload(&mut ctx, &[1u16, 2, 3, 4], BufferUsage::StaticDraw)
            .unwrap_err();
        assert!(matches!(err, Error::Resource(_)));

        let err = buffer
            .upload(&mut ctx, &[1.0f32, 2.0, 3.0], BufferUsage::StaticDraw)
            .unwrap_err();
        assert!(matches!(err, Error::Resource(_)));
        assert!(ctx.device().calls().is_empty());
    }

    #[test]
    fn test_sub_data_range_checked() {
        let mut ctx = context();
        let mut buffer = Buffer::with_data(
            &mut ctx,
            &BufferDescriptor::indices("indices", DataType::UnsignedShort),
            &[0u16, 1, 2, 2, 3, 0],
        )
        .unwrap();

        buffer.upload_sub_data(&mut ctx, 4, &[7u16, 7]).unwrap();
        assert_eq!(
            ctx.device().buffer_contents(buffer.handle()),
            Some(bytemuck::cast_slice::<u16, u8>(&[0, 1, 2, 2, 7, 7]))
        );

        let err = buffer.upload_sub_data(&mut ctx, 5, &[1u16, 1]).unwrap_err();
        assert!(matches!(err, Error::Resource(_)));
    }

    #[test]
    fn test_bind_to_moves_target() {
        let mut ctx = context();
        let mut buffer = Buffer::new(&mut ctx, &BufferDescriptor::vertices("scratch", 4)).unwrap();
        buffer.bind_to(&mut ctx, BufferTarget::CopyRead);
        assert_eq!(buffer.target(), BufferTarget::CopyRead);
        assert_eq!(
            ctx.device().bound_buffer(consts::COPY_READ_BUFFER),
            Some(buffer.handle())
        );

        // Bind is never elided
        buffer.bind(&mut ctx);
        buffer.bind(&mut ctx);
        let binds = ctx
            .device()
            .calls()
            .iter()
            .filter(|c| matches!(c, DeviceCall::BindBuffer { .. }))
            .count();
        assert_eq!(binds, 3);
    }

    #[test]
    fn test_delete_releases_handle() {
        let mut ctx = context();
        let buffer = Buffer::new(&mut ctx, &BufferDescriptor::default()).unwrap();
        assert_eq!(ctx.device().live_objects().0, 1);
        buffer.delete(&mut ctx);
        assert_eq!(ctx.device().live_objects().0, 0);
    }
}
