//! Enable/disable flags

use crate::backend::traits::Device;
use crate::backend::types::Capability;
use crate::context::RenderingContext;
use crate::error::Result;

impl<D: Device> RenderingContext<D> {
    /// Whether `cap` is enabled
    pub fn capability(&mut self, cap: Capability) -> Result<bool> {
        if let Some(enabled) = self.state.capabilities[cap.index()].get() {
            return Ok(enabled);
        }
        let enabled = self.device.is_enabled(cap.to_raw());
        Ok(self.state.capabilities[cap.index()].store(enabled))
    }

    pub fn set_capability(&mut self, cap: Capability, enabled: bool) -> Result<()> {
        if self.elides("capability", &self.state.capabilities[cap.index()], enabled) {
            return Ok(());
        }
        if enabled {
            self.device.enable(cap.to_raw());
        } else {
            self.device.disable(cap.to_raw());
        }
        self.state.capabilities[cap.index()].store(enabled);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::{consts, DeviceCall, RecordingDevice};
    use crate::backend::types::Capability;
    use crate::RenderingContext;

    #[test]
    fn test_first_read_queries_device_once() {
        let mut ctx = RenderingContext::new(RecordingDevice::new());
        assert!(ctx.capability(Capability::Dither).unwrap());
        assert!(!ctx.capability(Capability::Blend).unwrap());
        assert!(ctx.capability(Capability::Dither).unwrap());
        assert_eq!(ctx.device().calls().len(), 2);
    }

    #[test]
    fn test_toggle_writes_through_once() {
        let mut ctx = RenderingContext::new(RecordingDevice::new());
        ctx.set_capability(Capability::DepthTest, true).unwrap();
        ctx.set_capability(Capability::DepthTest, true).unwrap();
        ctx.set_capability(Capability::DepthTest, false).unwrap();
        assert_eq!(
            ctx.device().calls(),
            &[
                DeviceCall::Enable(consts::DEPTH_TEST),
                DeviceCall::Disable(consts::DEPTH_TEST),
            ]
        );
        assert!(!ctx.capability(Capability::DepthTest).unwrap());
        assert_eq!(ctx.device().calls().len(), 2);
    }

    #[test]
    fn test_unknown_slot_is_always_written() {
        // Nothing cached yet, so even the device default is written
        let mut ctx = RenderingContext::new(RecordingDevice::new());
        ctx.set_capability(Capability::Dither, true).unwrap();
        assert_eq!(ctx.device().calls(), &[DeviceCall::Enable(consts::DITHER)]);
    }
}
