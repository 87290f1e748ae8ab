use routemill_core::RouteAtom;
use swc_core::common::{Span, Spanned};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RemoveExportsError {
    /// `export const [loader, other] = makeHandlers()` cannot be split without changing semantics
    #[error("Cannot remove destructured export \"{name}\"")]
    UnremovableDestructuredExport { name: RouteAtom, span: Span },
}

impl RemoveExportsError {
    pub fn export_name(&self) -> &str {
        match self {
            RemoveExportsError::UnremovableDestructuredExport { name, .. } => name,
        }
    }
}

impl Spanned for RemoveExportsError {
    fn span(&self) -> Span {
        match self {
            RemoveExportsError::UnremovableDestructuredExport { span, .. } => *span,
        }
    }
}
