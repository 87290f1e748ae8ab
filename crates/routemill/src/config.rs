//! Project and route configuration.
//!
//! The project file (`routemill.toml`) is merged over [`BuildOptions::default`]. Routes are read
//! from a JSON array of [`RouteConfigEntry`] in the app directory (`routes.json`).
//!
//! The `load_*` functions never fail: a missing or invalid file is logged and defaults are used.
//! The `try_load_*` variants report the problem instead.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use routemill_core::RouteConfigEntry;
use routemill_manifest::{
    paths::{combine_urls, resolve_path},
    ModuleMode,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::ConfigError;

pub const PROJECT_CONFIG_FILE: &str = "routemill.toml";
pub const ROUTE_CONFIG_FILE: &str = "routes.json";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildOptions {
    /// Server rendering; `false` builds a single page app
    pub ssr: bool,
    pub build_directory: String,
    pub app_directory: String,
    pub basename: String,
    pub public_path: String,
    pub assets_prefix: String,
    pub route_modules: ModuleMode,
    /// Relative to the app directory
    pub root_route_file: String,
    pub entry_client_file: String,
    pub entry_server_file: String,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            ssr: true,
            build_directory: "build".to_string(),
            app_directory: "app".to_string(),
            basename: "/".to_string(),
            public_path: "/".to_string(),
            assets_prefix: "/static/".to_string(),
            route_modules: ModuleMode::Eager,
            root_route_file: "root.tsx".to_string(),
            entry_client_file: "entry.client.tsx".to_string(),
            entry_server_file: "entry.server.tsx".to_string(),
        }
    }
}

impl BuildOptions {
    #[inline]
    pub fn is_spa_mode(&self) -> bool {
        !self.ssr
    }

    /// Where the client assets are written, `<buildDirectory>/client`
    pub fn assets_build_directory(&self) -> String {
        combine_urls(&self.build_directory, "client")
    }

    pub fn entry_client_path(&self) -> String {
        combine_urls(&self.app_directory, &self.entry_client_file)
    }

    pub fn entry_server_path(&self) -> String {
        combine_urls(&self.app_directory, &self.entry_server_file)
    }

    /// Resolves a relative app directory against `project_root`
    pub fn with_project_root(mut self, project_root: &Path) -> BuildOptions {
        self.app_directory = resolve_path(&project_root.to_string_lossy(), &self.app_directory);
        self
    }

    pub fn route_config_path(&self) -> PathBuf {
        Path::new(&self.app_directory).join(ROUTE_CONFIG_FILE)
    }

    pub fn from_toml(source: &str) -> Result<BuildOptions, toml::de::Error> {
        toml::from_str(source)
    }
}

fn read_config(path: &Path, missing: fn(PathBuf) -> ConfigError) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => missing(path.to_path_buf()),
        _ => ConfigError::Io {
            path: path.to_path_buf(),
            source,
        },
    })
}

/// Reads the project configuration, failing on a missing or invalid file
pub fn try_load_build_options(path: &Path) -> Result<BuildOptions, ConfigError> {
    let source = read_config(path, |path| ConfigError::MissingProjectConfiguration { path })?;

    BuildOptions::from_toml(&source).map_err(|source| ConfigError::InvalidProjectConfiguration {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads the project configuration, falling back to the defaults
pub fn load_build_options(path: &Path) -> BuildOptions {
    match try_load_build_options(path) {
        Ok(options) => {
            info!(path = %path.display(), "loaded project configuration");
            options
        }
        Err(e) => {
            error!("{e}, using default configuration");
            BuildOptions::default()
        }
    }
}

pub fn parse_route_config(source: &str) -> Result<Vec<RouteConfigEntry>, serde_json::Error> {
    serde_json::from_str(source)
}

/// Reads the route configuration, failing on a missing or invalid file
pub fn try_load_route_config(path: &Path) -> Result<Vec<RouteConfigEntry>, ConfigError> {
    let source = read_config(path, |path| ConfigError::MissingRouteConfiguration { path })?;

    parse_route_config(&source).map_err(|source| ConfigError::InvalidRouteConfiguration {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads the route configuration, an unreadable file means no routes besides the root
pub fn load_route_config(path: &Path) -> Vec<RouteConfigEntry> {
    match try_load_route_config(path) {
        Ok(entries) => entries,
        Err(e) => {
            error!("{e}, continuing without routes");
            vec![]
        }
    }
}
