//! Rendering context
//!
//! Owns the device together with everything cached about it: the global state mirror and the
//! active program. Programs, variables and resources borrow the context for each call, so the
//! device is only ever driven through one place.

use std::fmt::Debug;

use crate::backend::traits::{Device, ProgramHandle};
use crate::backend::types::{BufferTarget, ClearMask, DataType, DrawMode};
use crate::error::{Error, Result};
use crate::resources::Buffer;
use crate::state::{Slot, StateCache};
use crate::ContextConfig;

/// Façade over one device and its cached state
pub struct RenderingContext<D: Device> {
    pub(crate) device: D,
    pub(crate) config: ContextConfig,
    pub(crate) state: StateCache,
    active_program: Slot<Option<ProgramHandle>>,
}

impl<D: Device> RenderingContext<D> {
    pub fn new(device: D) -> Self {
        Self::with_config(device, ContextConfig::default())
    }

    pub fn with_config(device: D, config: ContextConfig) -> Self {
        log::info!(
            "{}: created (elide redundant state: {}, check array windows: {})",
            config.label,
            config.elide_redundant_state,
            config.check_array_windows
        );
        Self {
            device,
            config,
            state: StateCache::default(),
            active_program: Slot::default(),
        }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Direct device access
    ///
    /// Writes made here bypass the state mirror; follow them with
    /// [`invalidate_state_cache`](Self::invalidate_state_cache).
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }

    /// Forget every cached state slot so the next read queries the device again
    pub fn invalidate_state_cache(&mut self) {
        log::debug!("{}: state cache invalidated", self.config.label);
        self.state = StateCache::default();
        self.active_program = Slot::default();
    }

    /// Program made active through this context, if known
    pub fn active_program(&self) -> Option<ProgramHandle> {
        self.active_program.get().flatten()
    }

    /// Make `program` the active one; skipped when it already is
    pub fn bind_program(&mut self, program: Option<ProgramHandle>) {
        if self.elides("active_program", &self.active_program, program) {
            return;
        }
        self.device.use_program(program);
        self.active_program.store(program);
    }

    /// Forget `program` as the active one without touching the device
    pub(crate) fn forget_program(&mut self, program: ProgramHandle) {
        if self.active_program() == Some(program) {
            self.active_program = Slot::default();
        }
    }

    /// True when writing `value` to `slot` can be skipped
    pub(crate) fn elides<T: Copy + PartialEq + Debug>(
        &self,
        what: &str,
        slot: &Slot<T>,
        value: T,
    ) -> bool {
        if self.config.elide_redundant_state && slot.get() == Some(value) {
            log::trace!("{}: elided {} = {:?}", self.config.label, what, value);
            return true;
        }
        false
    }

    // Drawing

    pub fn clear(&mut self, mask: ClearMask) {
        self.device.clear(mask.bits());
    }

    pub fn draw_arrays(&mut self, mode: DrawMode, first: i32, count: i32) {
        self.device.draw_arrays(mode.to_raw(), first, count);
    }

    pub fn draw_arrays_instanced(&mut self, mode: DrawMode, first: i32, count: i32, instances: i32) {
        self.device
            .draw_arrays_instanced(mode.to_raw(), first, count, instances);
    }

    /// Draw `count` indices starting at index `offset` of `indices`
    pub fn draw_elements(
        &mut self,
        mode: DrawMode,
        indices: &Buffer,
        count: i32,
        offset: usize,
    ) -> Result<()> {
        let (ty, byte_offset) = self.prepare_elements(indices, offset)?;
        self.device
            .draw_elements(mode.to_raw(), count, ty, byte_offset);
        Ok(())
    }

    pub fn draw_elements_instanced(
        &mut self,
        mode: DrawMode,
        indices: &Buffer,
        count: i32,
        offset: usize,
        instances: i32,
    ) -> Result<()> {
        let (ty, byte_offset) = self.prepare_elements(indices, offset)?;
        self.device
            .draw_elements_instanced(mode.to_raw(), count, ty, byte_offset, instances);
        Ok(())
    }

    /// Bind an index buffer and resolve its index type and byte offset
    fn prepare_elements(&mut self, indices: &Buffer, offset: usize) -> Result<(u32, i32)> {
        if indices.target() != BufferTarget::ElementArray {
            return Err(Error::Resource(format!(
                "buffer {:?} is bound to {:?}, not the element array target",
                indices.label(),
                indices.target()
            )));
        }
        let ty = indices.element_type();
        if !matches!(
            ty,
            DataType::UnsignedByte | DataType::UnsignedShort | DataType::UnsignedInt
        ) {
            return Err(Error::Resource(format!(
                "index buffer {:?} holds {} elements, expected u8, u16 or u32",
                indices.label(),
                ty.name()
            )));
        }
        indices.bind(self);
        let byte_offset = i32::try_from(offset * ty.size())
            .map_err(|_| Error::Resource(format!("index offset {offset} out of range")))?;
        Ok((ty.to_raw(), byte_offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{consts, DeviceCall, RecordingDevice};

    #[test]
    fn test_bind_program_is_elided_when_unchanged() {
        let mut device = RecordingDevice::new();
        let program = device.create_program().unwrap();
        device.link_program(program);
        let mut ctx = RenderingContext::new(device);

        ctx.bind_program(Some(program));
        ctx.bind_program(Some(program));
        assert_eq!(ctx.device().writes().count(), 3);
        assert_eq!(ctx.active_program(), Some(program));

        ctx.bind_program(None);
        assert_eq!(ctx.active_program(), None);
        assert_eq!(
            ctx.device().calls().last(),
            Some(&DeviceCall::UseProgram(None))
        );
    }

    #[test]
    fn test_without_elision_every_bind_is_issued() {
        let config = ContextConfig {
            elide_redundant_state: false,
            ..Default::default()
        };
        let mut ctx = RenderingContext::with_config(RecordingDevice::new(), config);
        ctx.bind_program(None);
        ctx.bind_program(None);
        let uses = ctx
            .device()
            .calls()
            .iter()
            .filter(|call| matches!(call, DeviceCall::UseProgram(_)))
            .count();
        assert_eq!(uses, 2);
    }

    #[test]
    fn test_invalidate_forgets_active_program() {
        let mut ctx = RenderingContext::new(RecordingDevice::new());
        ctx.bind_program(None);
        ctx.invalidate_state_cache();
        ctx.device_mut().clear_calls();
        ctx.bind_program(None);
        assert_eq!(ctx.device().calls(), &[DeviceCall::UseProgram(None)]);
    }

    #[test]
    fn test_clear_passes_mask_bits() {
        let mut ctx = RenderingContext::new(RecordingDevice::new());
        ctx.clear(ClearMask::COLOR | ClearMask::DEPTH);
        assert_eq!(
            ctx.device().calls(),
            &[DeviceCall::Clear(
                consts::COLOR_BUFFER_BIT | consts::DEPTH_BUFFER_BIT
            )]
        );
    }
}
