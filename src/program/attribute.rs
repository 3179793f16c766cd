//! Vertex attributes

use crate::backend::consts;
use crate::backend::traits::Device;
use crate::context::RenderingContext;
use crate::error::{Error, Result};
use crate::resources::VertexSource;

use super::variable::{Variable, VariableInfo};

/// Column count and integer-ness of every attribute type
fn layout(type_tag: u32) -> Option<(u32, bool)> {
    let layout = match type_tag {
        consts::FLOAT | consts::FLOAT_VEC2 | consts::FLOAT_VEC3 | consts::FLOAT_VEC4 => (1, false),
        consts::FLOAT_MAT2 | consts::FLOAT_MAT2X3 | consts::FLOAT_MAT2X4 => (2, false),
        consts::FLOAT_MAT3 | consts::FLOAT_MAT3X2 | consts::FLOAT_MAT3X4 => (3, false),
        consts::FLOAT_MAT4 | consts::FLOAT_MAT4X2 | consts::FLOAT_MAT4X3 => (4, false),
        consts::INT
        | consts::INT_VEC2
        | consts::INT_VEC3
        | consts::INT_VEC4
        | consts::UNSIGNED_INT
        | consts::UNSIGNED_INT_VEC2
        | consts::UNSIGNED_INT_VEC3
        | consts::UNSIGNED_INT_VEC4 => (1, true),
        _ => return None,
    };
    Some(layout)
}

/// A per-vertex input fed from a buffer
///
/// Matrix attributes occupy one location per column, starting at [`Variable::location`].
#[derive(Debug, Clone)]
pub struct Attribute {
    info: VariableInfo,
    location: u32,
    columns: u32,
    integer: bool,
    enabled: bool,
    divisor: u32,
    value: Option<VertexSource>,
}

impl Attribute {
    /// Seeds the enabled flag from the device; the only time it is queried
    pub(crate) fn new<D: Device>(
        ctx: &mut RenderingContext<D>,
        info: VariableInfo,
        location: u32,
    ) -> Result<Self> {
        let Some((columns, integer)) = layout(info.type_tag) else {
            return Err(Error::UnsupportedVariable {
                name: info.name,
                type_tag: info.type_tag,
            });
        };
        let enabled = ctx.device.vertex_attrib_array_enabled(location);
        Ok(Self {
            info,
            location,
            columns,
            integer,
            enabled,
            divisor: 0,
            value: None,
        })
    }

    /// Locations this attribute occupies
    pub fn locations(&self) -> std::ops::Range<u32> {
        self.location..self.location + self.columns
    }

    /// Whether the shader reads the attribute as an integer
    pub fn is_integer(&self) -> bool {
        self.integer
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Toggle the vertex array; nothing is issued when the flag already matches
    pub fn set_enabled<D: Device>(&mut self, ctx: &mut RenderingContext<D>, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        for location in self.locations() {
            if enabled {
                ctx.device.enable_vertex_attrib_array(location);
            } else {
                ctx.device.disable_vertex_attrib_array(location);
            }
        }
        self.enabled = enabled;
    }

    /// Instances drawn per attribute advance, 0 to advance per vertex
    pub fn divisor(&self) -> u32 {
        self.divisor
    }

    pub fn set_divisor<D: Device>(&mut self, ctx: &mut RenderingContext<D>, divisor: u32) {
        if self.divisor == divisor {
            return;
        }
        for location in self.locations() {
            ctx.device.vertex_attrib_divisor(location, divisor);
        }
        self.divisor = divisor;
    }
}

impl Variable for Attribute {
    type Location = u32;
    type Value = VertexSource;

    fn info(&self) -> &VariableInfo {
        &self.info
    }

    fn location(&self) -> u32 {
        self.location
    }

    fn value(&self) -> Option<&VertexSource> {
        self.value.as_ref()
    }

    /// Point the attribute at `source`
    ///
    /// Always re-issued: the buffer contents may have changed since the last assignment.
    fn set_value<D: Device>(
        &mut self,
        ctx: &mut RenderingContext<D>,
        source: VertexSource,
    ) -> Result<()> {
        if !(1..=4).contains(&source.components) {
            return Err(Error::shape(
                &self.info.name,
                format!("{} components per vertex, expected 1 to 4", source.components),
            ));
        }
        if self.integer && !source.data_type.is_integer() {
            return Err(Error::ValueType {
                variable: self.info.name.clone(),
                expected: "integer data",
                found: source.data_type.name(),
            });
        }

        let out_of_range = |what: &str| {
            Error::shape(&self.info.name, format!("{what} out of range"))
        };
        let column_size = source.components * source.data_type.size() as u32;
        let stride = if source.stride == 0 && self.columns > 1 {
            column_size
                .checked_mul(self.columns)
                .ok_or_else(|| out_of_range("stride"))?
        } else {
            source.stride
        };
        let stride = i32::try_from(stride).map_err(|_| out_of_range("stride"))?;

        // Every column offset is resolved before the first device call
        let mut offsets = [0i32; 4];
        for (column, slot) in (0..self.columns).zip(offsets.iter_mut()) {
            let offset = column
                .checked_mul(column_size)
                .and_then(|step| source.offset.checked_add(step))
                .and_then(|offset| i32::try_from(offset).ok())
                .ok_or_else(|| {
                    out_of_range(&format!("offset of column {column} from {}", source.offset))
                })?;
            *slot = offset;
        }
        let ty = source.data_type.to_raw();
        let size = source.components as i32;

        self.set_enabled(ctx, true);
        ctx.device
            .bind_buffer(consts::ARRAY_BUFFER, Some(source.buffer));
        for (location, &offset) in self.locations().zip(offsets.iter()) {
            if self.integer {
                ctx.device
                    .vertex_attrib_i_pointer(location, size, ty, stride, offset);
            } else {
                ctx.device.vertex_attrib_pointer(
                    location,
                    size,
                    ty,
                    source.normalized,
                    stride,
                    offset,
                );
            }
        }
        self.value = Some(source);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::traits::ActiveVariable;
    use crate::backend::types::DataType;
    use crate::backend::{DeviceCall, RecordingDevice};
    use crate::resources::{Buffer, BufferDescriptor};

    fn attribute(
        ctx: &mut RenderingContext<RecordingDevice>,
        type_tag: u32,
        location: u32,
    ) -> Attribute {
        let program = ctx.device_mut().create_program().unwrap();
        let info = VariableInfo::from_active(&ActiveVariable::new("a_input", type_tag, 1), program);
        Attribute::new(ctx, info, location).unwrap()
    }

    #[test]
    fn test_enabled_seeded_from_device() {
        let mut device = RecordingDevice::new();
        device.poke_vertex_attrib_array(3, true);
        let mut ctx = RenderingContext::new(device);
        let attr = attribute(&mut ctx, consts::FLOAT_VEC2, 3);
        assert!(attr.enabled());
    }

    #[test]
    fn test_float_data_into_int_attribute() {
        let mut ctx = RenderingContext::new(RecordingDevice::new());
        let buffer = Buffer::new(&mut ctx, &BufferDescriptor::vertices("ids", 1)).unwrap();
        let mut attr = attribute(&mut ctx, consts::INT, 0);
        ctx.device_mut().clear_calls();

        let err = attr.set_value(&mut ctx, buffer.vertex_source()).unwrap_err();
        assert!(matches!(err, Error::ValueType { .. }));
        assert!(ctx.device().calls().is_empty());
    }

    #[test]
    fn test_integer_attribute_uses_i_pointer() {
        let mut ctx = RenderingContext::new(RecordingDevice::new());
        let desc = BufferDescriptor {
            element_type: DataType::UnsignedShort,
            components: 2,
            ..BufferDescriptor::vertices("joints", 2)
        };
        let buffer = Buffer::new(&mut ctx, &desc).unwrap();
        let mut attr = attribute(&mut ctx, consts::UNSIGNED_INT_VEC2, 1);
        attr.set_value(&mut ctx, buffer.vertex_source()).unwrap();

        let state = ctx.device().vertex_attrib(1);
        assert!(state.integer);
        assert_eq!(state.ty, consts::UNSIGNED_SHORT);
        assert_eq!(state.buffer, Some(buffer.handle()));
    }

    #[test]
    fn test_matrix_attribute_points_every_column() {
        let mut ctx = RenderingContext::new(RecordingDevice::new());
        let buffer = Buffer::new(&mut ctx, &BufferDescriptor::vertices("instances", 4)).unwrap();
        let mut attr = attribute(&mut ctx, consts::FLOAT_MAT4, 2);
        attr.set_divisor(&mut ctx, 1);
        ctx.device_mut().clear_calls();

        attr.set_value(&mut ctx, buffer.vertex_source()).unwrap();
        let pointers: Vec<_> = ctx
            .device()
            .calls()
            .iter()
            .filter_map(|call| match call {
                DeviceCall::VertexAttribPointer {
                    index,
                    stride,
                    offset,
                    ..
                } => Some((*index, *stride, *offset)),
                _ => None,
            })
            .collect();
        assert_eq!(pointers, vec![(2, 64, 0), (3, 64, 16), (4, 64, 32), (5, 64, 48)]);
        assert_eq!(ctx.device().vertex_attrib(5).divisor, 1);
        assert_eq!(attr.locations(), 2..6);
    }

    #[test]
    fn test_component_count_checked() {
        let mut ctx = RenderingContext::new(RecordingDevice::new());
        let buffer = Buffer::new(&mut ctx, &BufferDescriptor::vertices("wide", 4)).unwrap();
        let mut attr = attribute(&mut ctx, consts::FLOAT_VEC4, 0);
        let err = attr
            .set_value(&mut ctx, buffer.vertex_source().components(5))
            .unwrap_err();
        assert!(matches!(err, Error::ValueShape { .. }));
    }

    #[test]
    fn test_column_offset_overflow_issues_nothing() {
        let mut ctx = RenderingContext::new(RecordingDevice::new());
        let buffer = Buffer::new(&mut ctx, &BufferDescriptor::vertices("instances", 4)).unwrap();
        let mut attr = attribute(&mut ctx, consts::FLOAT_MAT4, 0);
        ctx.device_mut().clear_calls();

        // Column 0 fits, column 1 lands past i32::MAX
        let source = buffer.vertex_source().offset(i32::MAX as u32 - 8);
        let err = attr.set_value(&mut ctx, source).unwrap_err();
        assert!(matches!(err, Error::ValueShape { .. }));
        assert!(ctx.device().calls().is_empty());
        assert!(!attr.enabled());
        assert_eq!(attr.value(), None);
    }

    #[test]
    fn test_offset_past_u32_issues_nothing() {
        let mut ctx = RenderingContext::new(RecordingDevice::new());
        let buffer = Buffer::new(&mut ctx, &BufferDescriptor::vertices("instances", 4)).unwrap();
        let mut attr = attribute(&mut ctx, consts::FLOAT_MAT2, 0);
        ctx.device_mut().clear_calls();

        let err = attr
            .set_value(&mut ctx, buffer.vertex_source().offset(u32::MAX))
            .unwrap_err();
        assert!(matches!(err, Error::ValueShape { .. }));
        assert!(ctx.device().calls().is_empty());
    }
}
