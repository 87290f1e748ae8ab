use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteTreeError {
    /// Two configuration entries resolve to the same route id
    #[error("Unable to define routes with duplicate route id: \"{id}\"")]
    DuplicateRouteId { id: String },
}
