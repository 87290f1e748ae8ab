//! The main public crate of `routemill`.
//!
//! A route module is compiled once per environment: the exports the environment must not see
//! are removed together with the code only they used, and the components are wrapped to receive
//! routing props.
//!
//! ```
//! use routemill::{compile_route, CompileOptions, Environment};
//!
//! let source = r#"
//!   export const loader = () => fetch("/api");
//!   export default function Page() { return null; }
//! "#;
//!
//! let compiled = compile_route(source, "routes/home.tsx", Environment::Client, CompileOptions::default()).unwrap();
//! assert!(!compiled.code.contains("loader"));
//! assert!(compiled.code.contains("withComponentProps"));
//! ```

pub mod build;
pub mod config;
mod error;

pub use build::RouteBuild;
pub use config::BuildOptions;
pub use error::{BuildError, CompileError, ConfigError};
pub use routemill_core::*;
pub use routemill_manifest as manifest;
pub use routemill_parser::{Mapping, RouteSourceLang};
pub use routemill_runtime as runtime;

use routemill_parser::{parse_route_module, stringify_module, EmitOptions};
use routemill_transform::transform_route_module;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    pub minify: bool,
    /// Produce the position map
    pub source_map: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CompiledRoute {
    pub code: String,
    pub mappings: Vec<Mapping>,
    /// Exports which survived the removal
    pub exports: ExportSet,
    pub removed_exports: Vec<String>,
    pub helpers: WithPropsHelpers,
}

/// Compiles a route module for the environment: parse, remove exports, inject props, print
pub fn compile_route(
    source: &str,
    filename: &str,
    env: Environment,
    options: CompileOptions,
) -> Result<CompiledRoute, CompileError> {
    let lang = RouteSourceLang::from_filename(filename);
    let mut tree = parse_route_module(source, lang).map_err(|source| CompileError::Parse {
        filename: filename.to_string(),
        source,
    })?;

    let result = transform_route_module(&mut tree.module, env)?;

    let generated = stringify_module(
        &tree.module,
        Some(&tree.comments),
        EmitOptions {
            minify: options.minify,
            positions: options.source_map,
        },
    )?;

    debug!(
        filename,
        env = env.as_ref(),
        bytes = generated.code.len(),
        "compiled route module"
    );

    Ok(CompiledRoute {
        code: generated.code,
        mappings: generated.mappings,
        exports: result.exports,
        removed_exports: result.removed.exports.iter().map(|name| name.to_string()).collect(),
        helpers: result.helpers,
    })
}
