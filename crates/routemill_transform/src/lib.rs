//! Route module transformations.
//!
//! A route module is first stripped of the exports its target environment must not see
//! ([`remove_exports`]), then its components are wrapped to receive routing props
//! ([`transform_route`]).

#[macro_use]
extern crate lazy_static;

pub mod atoms;
mod dead_code;
mod error;
mod exports;
mod route;

#[cfg(test)]
mod test_utils;

pub use dead_code::{find_live_bindings, sweep_dead_code, LiveBindings};
pub use error::RemoveExportsError;
pub use exports::{collect_exports, remove_exports, RemovedExports};
pub use route::{normalize_default_export, transform_route};

use routemill_core::{Environment, ExportSet, WithPropsHelpers};
use swc_core::ecma::ast::Module;
use tracing::debug;

/// Everything a route transformation did to a module
#[derive(Debug, Clone, Default)]
pub struct RouteTransformResult {
    pub removed: RemovedExports,
    pub helpers: WithPropsHelpers,
    /// Exports which survived the removal
    pub exports: ExportSet,
}

/// Applies the transformations of a route module for the given environment
pub fn transform_route_module(
    module: &mut Module,
    env: Environment,
) -> Result<RouteTransformResult, RemoveExportsError> {
    let removed = remove_exports(module, env.exports_to_remove())?;
    let exports = collect_exports(module);
    let helpers = transform_route(module);

    debug!(
        env = env.as_ref(),
        removed = removed.exports.len(),
        exports = exports.len(),
        "transformed route module"
    );

    Ok(RouteTransformResult {
        removed,
        helpers,
        exports,
    })
}
