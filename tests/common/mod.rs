//! Common test utilities for integration tests.

#![allow(dead_code)]

use graphics_binding::backend::{ActiveVariable, RecordingDevice};
use graphics_binding::{Program, ProgramDescriptor, RenderingContext};

pub const VERTEX_SOURCE: &str = "#version 300 es
in vec3 a_position;
void main() { gl_Position = vec4(a_position, 1.0); }
";

pub const FRAGMENT_SOURCE: &str = "#version 300 es
precision mediump float;
out vec4 color;
void main() { color = vec4(1.0); }
";

/// Initialize logging for tests
pub fn init_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Trace)
        .try_init();
}

pub fn descriptor(label: &str) -> ProgramDescriptor {
    ProgramDescriptor::new(VERTEX_SOURCE, FRAGMENT_SOURCE).with_label(label)
}

/// Context over a device that reports the given variables for every link
pub fn context_with_reflection(
    attributes: Vec<ActiveVariable>,
    uniforms: Vec<ActiveVariable>,
) -> RenderingContext<RecordingDevice> {
    init_logging();
    let mut device = RecordingDevice::new();
    device.set_program_reflection(attributes, uniforms);
    RenderingContext::new(device)
}

/// Build a program, make it active and clear the call log
pub fn active_program(ctx: &mut RenderingContext<RecordingDevice>, label: &str) -> Program {
    let program = Program::build(ctx, &descriptor(label)).expect("program should link");
    program.use_program(ctx).expect("program should be usable");
    ctx.device_mut().clear_calls();
    program
}
