use std::path::PathBuf;

use routemill_manifest::RouteTreeError;
use routemill_parser::{EmitError, ParseError};
use routemill_transform::RemoveExportsError;
use thiserror::Error;

/// Compilation of a single route module failed
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{filename}: {source}")]
    Parse {
        filename: String,
        #[source]
        source: ParseError,
    },
    #[error(transparent)]
    RemoveExports(#[from] RemoveExportsError),
    #[error(transparent)]
    Emit(#[from] EmitError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No project configuration found at {}", .path.display())]
    MissingProjectConfiguration { path: PathBuf },
    #[error("No route configuration found at {}", .path.display())]
    MissingRouteConfiguration { path: PathBuf },
    #[error("Unable to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid project configuration {}: {source}", .path.display())]
    InvalidProjectConfiguration {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid route configuration {}: {source}", .path.display())]
    InvalidRouteConfiguration {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Anything which stops a whole build
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    RouteTree(#[from] RouteTreeError),
    #[error("route \"{route_id}\": {source}")]
    Route {
        route_id: String,
        #[source]
        source: CompileError,
    },
    #[error("unknown route \"{0}\"")]
    UnknownRoute(String),
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
    #[error("Unable to resolve the project root: {0}")]
    ProjectRoot(#[source] std::io::Error),
}
