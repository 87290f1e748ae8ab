use thiserror::Error;

/// Failure of a route module load or of one of its handlers.
/// Cloneable, because one failed load is delivered to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteModuleError {
    #[error("Failed to load route module \"{reference}\": {message}")]
    Load { reference: String, message: String },
    #[error("Route handler failed: {0}")]
    Handler(String),
}

impl RouteModuleError {
    pub fn load(reference: impl Into<String>, message: impl ToString) -> Self {
        RouteModuleError::Load {
            reference: reference.into(),
            message: message.to_string(),
        }
    }
}
