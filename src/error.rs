//! Error types for the binding layer

use crate::backend::types::ShaderStage;
use thiserror::Error;

/// Errors raised by programs, variables, resources and the state mirror
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The device rejected a shader stage
    #[error("Failed to compile {stage:?} shader: {log}")]
    Compile { stage: ShaderStage, log: String },
    /// The device rejected the program at link time
    #[error("Failed to link program: {log}")]
    Link { log: String },
    /// Uploaded data does not fit the resource's declared format
    #[error("Resource error: {0}")]
    Resource(String),
    /// Wrong element count, or not a multiple of the expected tuple size
    #[error("Value for `{variable}` has the wrong shape: {reason}")]
    ValueShape { variable: String, reason: String },
    /// Value of the wrong numeric kind for the variable
    #[error("Value for `{variable}` has the wrong type: expected {expected}, found {found}")]
    ValueType {
        variable: String,
        expected: &'static str,
        found: &'static str,
    },
    /// Introspection reported a type tag with no matching variable type
    #[error("Unsupported variable `{name}` with type tag {type_tag:#06x}")]
    UnsupportedVariable { name: String, type_tag: u32 },
    /// No active variable with this name
    #[error("Unknown variable `{0}`")]
    UnknownVariable(String),
    /// The program has not been linked successfully
    #[error("Program is not linked")]
    ProgramNotLinked,
    /// The device reported a raw enumerant this layer does not know
    #[error("Unknown {what} value {value:#06x}")]
    UnknownEnum { what: &'static str, value: u32 },
    /// The device failed to allocate an object
    #[error("Device error: {0}")]
    Device(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn shape(variable: &str, reason: impl Into<String>) -> Self {
        Error::ValueShape {
            variable: variable.to_string(),
            reason: reason.into(),
        }
    }
}
