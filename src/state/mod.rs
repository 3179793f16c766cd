//! Cached mirror of global device state
//!
//! Every slot starts unknown. The first read queries the device and caches the answer; every
//! write goes through the device and then updates the cache, and a write whose value already
//! matches the cache is skipped (unless [`crate::ContextConfig::elide_redundant_state`] is
//! off). State changed through any other channel is not observed; call
//! [`crate::RenderingContext::invalidate_state_cache`] after touching the device directly.
//!
//! Slots the device only writes in groups (blend equation, blend function, per-face stencil
//! function and operation, polygon offset, sample coverage) read their siblings before the
//! write, so changing one field keeps the others.

use crate::backend::types::{
    BlendEquation, BlendFactor, Capability, CompareFunction, CullFace, FrontFace,
    PixelStoreParameter, Rect, StencilOp,
};

/// One cached state value, unknown until first read or written
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Slot<T>(Option<T>);

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot(None)
    }
}

impl<T: Copy> Slot<T> {
    pub(crate) fn get(&self) -> Option<T> {
        self.0
    }

    pub(crate) fn store(&mut self, value: T) -> T {
        self.0 = Some(value);
        value
    }
}

/// Cached getter for a slot read with one query
macro_rules! state_getter {
    (
        $(#[$meta:meta])*
        $getter:ident: $ty:ty => $slot:ident;
        read |$device:ident| $read:expr;
    ) => {
        $(#[$meta])*
        pub fn $getter(&mut self) -> $crate::error::Result<$ty> {
            if let Some(value) = self.state.$slot.get() {
                return Ok(value);
            }
            let $device = &mut self.device;
            let value: $ty = $read;
            Ok(self.state.$slot.store(value))
        }
    };
}

/// Cached getter and write-through setter for a slot written by one device call
macro_rules! state_property {
    (
        $(#[$meta:meta])*
        $getter:ident, $setter:ident: $ty:ty => $slot:ident;
        read |$device:ident| $read:expr;
        write |$wdevice:ident, $value:ident| $write:expr;
    ) => {
        state_getter! {
            $(#[$meta])*
            $getter: $ty => $slot;
            read |$device| $read;
        }

        pub fn $setter(&mut self, $value: $ty) -> $crate::error::Result<()> {
            if self.elides(stringify!($slot), &self.state.$slot, $value) {
                return Ok(());
            }
            let $wdevice = &mut self.device;
            $write;
            self.state.$slot.store($value);
            Ok(())
        }
    };
}

mod blend;
mod capabilities;
mod depth_stencil;
mod pixel_store;
mod raster;

/// Per-face stencil state
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StencilFaceState {
    pub(crate) func: Slot<CompareFunction>,
    pub(crate) reference: Slot<i32>,
    pub(crate) value_mask: Slot<u32>,
    pub(crate) write_mask: Slot<u32>,
    pub(crate) fail: Slot<StencilOp>,
    pub(crate) depth_fail: Slot<StencilOp>,
    pub(crate) depth_pass: Slot<StencilOp>,
}

/// Every mirrored global state slot
#[derive(Debug, Clone, Default)]
pub(crate) struct StateCache {
    pub(crate) capabilities: [Slot<bool>; Capability::ALL.len()],

    pub(crate) blend_color: Slot<[f32; 4]>,
    pub(crate) blend_equation_rgb: Slot<BlendEquation>,
    pub(crate) blend_equation_alpha: Slot<BlendEquation>,
    pub(crate) blend_src_rgb: Slot<BlendFactor>,
    pub(crate) blend_dst_rgb: Slot<BlendFactor>,
    pub(crate) blend_src_alpha: Slot<BlendFactor>,
    pub(crate) blend_dst_alpha: Slot<BlendFactor>,

    pub(crate) depth_func: Slot<CompareFunction>,
    pub(crate) depth_mask: Slot<bool>,
    pub(crate) depth_range: Slot<(f32, f32)>,
    pub(crate) clear_depth: Slot<f32>,

    /// Indexed by face, front first
    pub(crate) stencil: [StencilFaceState; 2],
    pub(crate) clear_stencil: Slot<i32>,

    pub(crate) viewport: Slot<Rect>,
    pub(crate) scissor_box: Slot<Rect>,
    pub(crate) clear_color: Slot<[f32; 4]>,
    pub(crate) color_mask: Slot<[bool; 4]>,
    pub(crate) cull_face_mode: Slot<CullFace>,
    pub(crate) front_face: Slot<FrontFace>,
    pub(crate) line_width: Slot<f32>,
    pub(crate) polygon_offset_factor: Slot<f32>,
    pub(crate) polygon_offset_units: Slot<f32>,
    pub(crate) sample_coverage_value: Slot<f32>,
    pub(crate) sample_coverage_invert: Slot<bool>,

    pub(crate) pixel_store: [Slot<i32>; PixelStoreParameter::ALL.len()],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_starts_unknown() {
        let mut slot = Slot::<i32>::default();
        assert_eq!(slot.get(), None);
        assert_eq!(slot.store(4), 4);
        assert_eq!(slot.get(), Some(4));
    }

    #[test]
    fn test_cache_default_is_all_unknown() {
        let cache = StateCache::default();
        assert!(cache.capabilities.iter().all(|slot| slot.get().is_none()));
        assert!(cache.pixel_store.iter().all(|slot| slot.get().is_none()));
        assert!(cache.stencil[1].func.get().is_none());
    }
}
