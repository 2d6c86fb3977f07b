#[derive(Debug, Clone, PartialEq)]
pub enum StyleError {
    NotAnObject,
    InvalidFunction { field: String, reason: String },
}

impl std::fmt::Display for StyleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StyleError::NotAnObject => write!(f, "symbol must be a JSON object"),
            StyleError::InvalidFunction { field, reason } => {
                write!(f, "invalid function definition for {field}: {reason}")
            }
        }
    }
}

impl std::error::Error for StyleError {}
