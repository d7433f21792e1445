use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeomError {
    #[error("Invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error("Argument `{name}` = {value} is outside [{min}, {max}]")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Infeasible operation: {0}")]
    Infeasible(String),
}

impl GeomError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    pub fn infeasible(reason: impl Into<String>) -> Self {
        Self::Infeasible(reason.into())
    }

    /// True when the inputs were individually valid but the requested
    /// operation cannot be carried out exactly.
    pub fn is_infeasible(&self) -> bool {
        matches!(self, Self::Infeasible(_))
    }
}

pub type Result<T> = std::result::Result<T, GeomError>;
