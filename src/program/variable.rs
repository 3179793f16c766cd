//! Shared identity and collections for program variables

use std::collections::HashMap;

use crate::backend::traits::{ActiveVariable, Device, ProgramHandle};
use crate::context::RenderingContext;
use crate::error::Result;

/// Identity of one introspected variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableInfo {
    /// Name with any trailing `[0]` removed
    pub name: String,
    /// Raw type tag reported by the device
    pub type_tag: u32,
    /// Declared element count, 1 for non-arrays
    pub size: u32,
    /// Owning program; a non-owning back-reference
    pub program: ProgramHandle,
}

impl VariableInfo {
    pub(crate) fn from_active(active: &ActiveVariable, program: ProgramHandle) -> Self {
        Self {
            name: base_name(&active.name).to_string(),
            type_tag: active.type_tag,
            size: active.size.max(1) as u32,
            program,
        }
    }

    pub fn is_array(&self) -> bool {
        self.size > 1
    }
}

/// Strip the `[0]` devices append to array variable names
pub(crate) fn base_name(name: &str) -> &str {
    name.strip_suffix("[0]").unwrap_or(name)
}

/// An introspected input slot of a linked program
///
/// Locations are resolved once when the program links. Reading [`Variable::value`] returns the
/// last assignment; the device is never queried for it.
pub trait Variable {
    type Location: Copy;
    type Value;

    fn info(&self) -> &VariableInfo;

    fn location(&self) -> Self::Location;

    /// Last value assigned through [`Variable::set_value`]
    fn value(&self) -> Option<&Self::Value>;

    /// Assign `value` and cache it
    ///
    /// Uniforms first make their owning program active, so a write to a program that is not
    /// active costs one extra `use_program` call. Call [`crate::Program::use_program`] first to
    /// keep it to the single entry point call.
    fn set_value<D: Device>(
        &mut self,
        ctx: &mut RenderingContext<D>,
        value: Self::Value,
    ) -> Result<()>;

    fn name(&self) -> &str {
        &self.info().name
    }

    fn program(&self) -> ProgramHandle {
        self.info().program
    }
}

/// Variables of one program in device order, keyed by name
#[derive(Debug, Clone)]
pub struct VariableSet<T> {
    items: Vec<T>,
    by_name: HashMap<String, usize>,
}

impl<T> Default for VariableSet<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            by_name: HashMap::new(),
        }
    }
}

impl<T: Variable> VariableSet<T> {
    pub fn get(&self, name: &str) -> Option<&T> {
        self.by_name.get(name).map(|&index| &self.items[index])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.by_name.get(name).map(|&index| &mut self.items[index])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.name())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add a variable; returns false and drops it when the name is taken
    pub(crate) fn insert(&mut self, item: T) -> bool {
        if self.by_name.contains_key(item.name()) {
            return false;
        }
        self.by_name.insert(item.name().to_string(), self.items.len());
        self.items.push(item);
        true
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
        self.by_name.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::consts;

    #[test]
    fn test_array_names_are_stripped() {
        let active = ActiveVariable::new("u_lights[0]", consts::FLOAT_VEC3, 8);
        let info = VariableInfo::from_active(&active, ProgramHandle(1));
        assert_eq!(info.name, "u_lights");
        assert_eq!(info.size, 8);
        assert!(info.is_array());

        assert_eq!(base_name("u_lights[0].color"), "u_lights[0].color");
        assert_eq!(base_name("u_time"), "u_time");
    }
}
