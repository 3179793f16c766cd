//! Depth and stencil state

use crate::backend::consts;
use crate::backend::traits::Device;
use crate::backend::types::{CompareFunction, Face, StencilOp};
use crate::context::RenderingContext;
use crate::error::Result;
use crate::state::{Slot, StencilFaceState};

/// Query names of one face's stencil registers
struct StencilRegisters {
    func: u32,
    reference: u32,
    value_mask: u32,
    write_mask: u32,
    fail: u32,
    depth_fail: u32,
    depth_pass: u32,
}

const FRONT_REGISTERS: StencilRegisters = StencilRegisters {
    func: consts::STENCIL_FUNC,
    reference: consts::STENCIL_REF,
    value_mask: consts::STENCIL_VALUE_MASK,
    write_mask: consts::STENCIL_WRITEMASK,
    fail: consts::STENCIL_FAIL,
    depth_fail: consts::STENCIL_PASS_DEPTH_FAIL,
    depth_pass: consts::STENCIL_PASS_DEPTH_PASS,
};

const BACK_REGISTERS: StencilRegisters = StencilRegisters {
    func: consts::STENCIL_BACK_FUNC,
    reference: consts::STENCIL_BACK_REF,
    value_mask: consts::STENCIL_BACK_VALUE_MASK,
    write_mask: consts::STENCIL_BACK_WRITEMASK,
    fail: consts::STENCIL_BACK_FAIL,
    depth_fail: consts::STENCIL_BACK_PASS_DEPTH_FAIL,
    depth_pass: consts::STENCIL_BACK_PASS_DEPTH_PASS,
};

fn registers(face: Face) -> &'static StencilRegisters {
    match face {
        Face::Front => &FRONT_REGISTERS,
        Face::Back => &BACK_REGISTERS,
    }
}

fn face_index(face: Face) -> usize {
    match face {
        Face::Front => 0,
        Face::Back => 1,
    }
}

impl<D: Device> RenderingContext<D> {
    state_property! {
        depth_func, set_depth_func: CompareFunction => depth_func;
        read |device| CompareFunction::from_raw(device.get_parameter_i32(consts::DEPTH_FUNC) as u32)?;
        write |device, func| device.depth_func(func.to_raw());
    }

    state_property! {
        /// Whether depth writes are enabled
        depth_mask, set_depth_mask: bool => depth_mask;
        read |device| device.get_parameter_i32(consts::DEPTH_WRITEMASK) != 0;
        write |device, enabled| device.depth_mask(enabled);
    }

    state_property! {
        /// `(near, far)` mapping of normalized depth
        depth_range, set_depth_range: (f32, f32) => depth_range;
        read |device| {
            let mut range = [0.0; 2];
            device.get_parameter_f32_slice(consts::DEPTH_RANGE, &mut range);
            (range[0], range[1])
        };
        write |device, range| device.depth_range(range.0, range.1);
    }

    state_property! {
        clear_depth, set_clear_depth: f32 => clear_depth;
        read |device| device.get_parameter_f32(consts::DEPTH_CLEAR_VALUE);
        write |device, depth| device.clear_depth(depth);
    }

    state_property! {
        clear_stencil, set_clear_stencil: i32 => clear_stencil;
        read |device| device.get_parameter_i32(consts::STENCIL_CLEAR_VALUE);
        write |device, stencil| device.clear_stencil(stencil);
    }

    /// Read one face's stencil slot, querying the device on first access
    fn stencil_slot<T: Copy>(
        &mut self,
        face: Face,
        slot: fn(&mut StencilFaceState) -> &mut Slot<T>,
        read: impl FnOnce(&mut D, &StencilRegisters) -> Result<T>,
    ) -> Result<T> {
        let index = face_index(face);
        if let Some(value) = slot(&mut self.state.stencil[index]).get() {
            return Ok(value);
        }
        let value = read(&mut self.device, registers(face))?;
        Ok(slot(&mut self.state.stencil[index]).store(value))
    }

    pub fn stencil_func(&mut self, face: Face) -> Result<CompareFunction> {
        self.stencil_slot(face, |s| &mut s.func, |device, r| {
            CompareFunction::from_raw(device.get_parameter_i32(r.func) as u32)
        })
    }

    pub fn stencil_ref(&mut self, face: Face) -> Result<i32> {
        self.stencil_slot(face, |s| &mut s.reference, |device, r| {
            Ok(device.get_parameter_i32(r.reference))
        })
    }

    pub fn stencil_value_mask(&mut self, face: Face) -> Result<u32> {
        self.stencil_slot(face, |s| &mut s.value_mask, |device, r| {
            Ok(device.get_parameter_i32(r.value_mask) as u32)
        })
    }

    pub fn stencil_write_mask(&mut self, face: Face) -> Result<u32> {
        self.stencil_slot(face, |s| &mut s.write_mask, |device, r| {
            Ok(device.get_parameter_i32(r.write_mask) as u32)
        })
    }

    pub fn stencil_fail(&mut self, face: Face) -> Result<StencilOp> {
        self.stencil_slot(face, |s| &mut s.fail, |device, r| {
            StencilOp::from_raw(device.get_parameter_i32(r.fail) as u32)
        })
    }

    pub fn stencil_depth_fail(&mut self, face: Face) -> Result<StencilOp> {
        self.stencil_slot(face, |s| &mut s.depth_fail, |device, r| {
            StencilOp::from_raw(device.get_parameter_i32(r.depth_fail) as u32)
        })
    }

    pub fn stencil_depth_pass(&mut self, face: Face) -> Result<StencilOp> {
        self.stencil_slot(face, |s| &mut s.depth_pass, |device, r| {
            StencilOp::from_raw(device.get_parameter_i32(r.depth_pass) as u32)
        })
    }

    pub fn set_stencil_func(&mut self, face: Face, func: CompareFunction) -> Result<()> {
        if self.elides("stencil_func", &self.state.stencil[face_index(face)].func, func) {
            return Ok(());
        }
        let reference = self.stencil_ref(face)?;
        let mask = self.stencil_value_mask(face)?;
        self.write_stencil_func(face, func, reference, mask);
        Ok(())
    }

    pub fn set_stencil_ref(&mut self, face: Face, reference: i32) -> Result<()> {
        if self.elides("stencil_ref", &self.state.stencil[face_index(face)].reference, reference) {
            return Ok(());
        }
        let func = self.stencil_func(face)?;
        let mask = self.stencil_value_mask(face)?;
        self.write_stencil_func(face, func, reference, mask);
        Ok(())
    }

    pub fn set_stencil_value_mask(&mut self, face: Face, mask: u32) -> Result<()> {
        if self.elides("stencil_value_mask", &self.state.stencil[face_index(face)].value_mask, mask) {
            return Ok(());
        }
        let func = self.stencil_func(face)?;
        let reference = self.stencil_ref(face)?;
        self.write_stencil_func(face, func, reference, mask);
        Ok(())
    }

    fn write_stencil_func(&mut self, face: Face, func: CompareFunction, reference: i32, mask: u32) {
        self.device
            .stencil_func_separate(face.to_raw(), func.to_raw(), reference, mask);
        let state = &mut self.state.stencil[face_index(face)];
        state.func.store(func);
        state.reference.store(reference);
        state.value_mask.store(mask);
    }

    pub fn set_stencil_write_mask(&mut self, face: Face, mask: u32) -> Result<()> {
        if self.elides("stencil_write_mask", &self.state.stencil[face_index(face)].write_mask, mask) {
            return Ok(());
        }
        self.device.stencil_mask_separate(face.to_raw(), mask);
        self.state.stencil[face_index(face)].write_mask.store(mask);
        Ok(())
    }

    pub fn set_stencil_fail(&mut self, face: Face, op: StencilOp) -> Result<()> {
        if self.elides("stencil_fail", &self.state.stencil[face_index(face)].fail, op) {
            return Ok(());
        }
        let depth_fail = self.stencil_depth_fail(face)?;
        let depth_pass = self.stencil_depth_pass(face)?;
        self.write_stencil_op(face, op, depth_fail, depth_pass);
        Ok(())
    }

    pub fn set_stencil_depth_fail(&mut self, face: Face, op: StencilOp) -> Result<()> {
        if self.elides("stencil_depth_fail", &self.state.stencil[face_index(face)].depth_fail, op) {
            return Ok(());
        }
        let fail = self.stencil_fail(face)?;
        let depth_pass = self.stencil_depth_pass(face)?;
        self.write_stencil_op(face, fail, op, depth_pass);
        Ok(())
    }

    pub fn set_stencil_depth_pass(&mut self, face: Face, op: StencilOp) -> Result<()> {
        if self.elides("stencil_depth_pass", &self.state.stencil[face_index(face)].depth_pass, op) {
            return Ok(());
        }
        let fail = self.stencil_fail(face)?;
        let depth_fail = self.stencil_depth_fail(face)?;
        self.write_stencil_op(face, fail, depth_fail, op);
        Ok(())
    }

    fn write_stencil_op(&mut self, face: Face, fail: StencilOp, depth_fail: StencilOp, depth_pass: StencilOp) {
        self.device.stencil_op_separate(
            face.to_raw(),
            fail.to_raw(),
            depth_fail.to_raw(),
            depth_pass.to_raw(),
        );
        let state = &mut self.state.stencil[face_index(face)];
        state.fail.store(fail);
        state.depth_fail.store(depth_fail);
        state.depth_pass.store(depth_pass);
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::types::{CompareFunction, Face, StencilOp};
    use crate::backend::{consts, DeviceCall, RecordingDevice};
    use crate::RenderingContext;

    #[test]
    fn test_stencil_func_keeps_ref_and_mask() {
        let mut ctx = RenderingContext::new(RecordingDevice::new());
        ctx.set_stencil_ref(Face::Front, 5).unwrap();
        ctx.set_stencil_value_mask(Face::Front, 0xFF).unwrap();
        ctx.set_stencil_func(Face::Front, CompareFunction::Equal).unwrap();

        assert_eq!(
            ctx.device().writes().last(),
            Some(&DeviceCall::StencilFuncSeparate {
                face: consts::FRONT,
                func: consts::EQUAL,
                reference: 5,
                mask: 0xFF,
            })
        );
        // The back face is untouched
        assert_eq!(ctx.stencil_func(Face::Back).unwrap(), CompareFunction::Always);
        assert_eq!(ctx.stencil_value_mask(Face::Back).unwrap(), u32::MAX);
    }

    #[test]
    fn test_stencil_op_reads_siblings_once() {
        let mut ctx = RenderingContext::new(RecordingDevice::new());
        ctx.set_stencil_depth_pass(Face::Back, StencilOp::Replace).unwrap();
        ctx.set_stencil_fail(Face::Back, StencilOp::Zero).unwrap();

        let queries = ctx.device().calls().iter().filter(|c| c.is_query()).count();
        assert_eq!(queries, 2);
        assert_eq!(
            ctx.device().writes().last(),
            Some(&DeviceCall::StencilOpSeparate {
                face: consts::BACK,
                fail: consts::ZERO,
                depth_fail: consts::KEEP,
                depth_pass: consts::REPLACE,
            })
        );
    }

    #[test]
    fn test_depth_slots() {
        let mut ctx = RenderingContext::new(RecordingDevice::new());
        assert_eq!(ctx.depth_func().unwrap(), CompareFunction::Less);
        assert!(ctx.depth_mask().unwrap());
        assert_eq!(ctx.depth_range().unwrap(), (0.0, 1.0));

        ctx.set_depth_func(CompareFunction::Less).unwrap();
        ctx.set_depth_mask(false).unwrap();
        ctx.set_depth_range((0.1, 0.9)).unwrap();
        assert_eq!(
            ctx.device().writes().cloned().collect::<Vec<_>>(),
            vec![DeviceCall::DepthMask(false), DeviceCall::DepthRange(0.1, 0.9)]
        );
    }

    #[test]
    fn test_drift_is_not_observed_until_invalidated() {
        let mut ctx = RenderingContext::new(RecordingDevice::new());
        assert_eq!(ctx.clear_stencil().unwrap(), 0);
        ctx.device_mut()
            .poke_parameter(consts::STENCIL_CLEAR_VALUE, &[7.0]);
        assert_eq!(ctx.clear_stencil().unwrap(), 0);

        ctx.invalidate_state_cache();
        assert_eq!(ctx.clear_stencil().unwrap(), 7);
    }
}
