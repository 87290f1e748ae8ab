//! One build pass over a project: route table, per-route export analysis, manifest and
//! generated modules.

use std::path::Path;

use routemill_core::{Environment, ExportSet, Manifest, RouteConfigEntry, RouteTable};
use routemill_manifest::{
    build_route_table,
    virtual_modules::{self, ServerBuildOptions},
    AssetStats, ManifestBuilder, RouteExports,
};
use tracing::{debug, info};

use crate::{
    compile_route,
    config::{load_build_options, load_route_config, BuildOptions, PROJECT_CONFIG_FILE},
    error::BuildError,
    CompileOptions, CompiledRoute,
};

#[derive(Debug, Clone)]
pub struct RouteBuild {
    options: BuildOptions,
    routes: RouteTable,
    exports: RouteExports,
}

impl RouteBuild {
    /// A relative app directory is taken from the current directory
    pub fn new(options: BuildOptions, entries: &[RouteConfigEntry]) -> Result<RouteBuild, BuildError> {
        let project_root = std::env::current_dir().map_err(BuildError::ProjectRoot)?;
        RouteBuild::with_project_root(&project_root, options, entries)
    }

    /// Module paths of the build are absolute, a relative app directory is resolved against
    /// `project_root`.
    pub fn with_project_root(
        project_root: &Path,
        options: BuildOptions,
        entries: &[RouteConfigEntry],
    ) -> Result<RouteBuild, BuildError> {
        let options = options.with_project_root(project_root);
        debug!(app_directory = %options.app_directory, "resolved app directory");

        let routes = build_route_table(&options.root_route_file, &options.app_directory, entries)?;

        Ok(RouteBuild {
            options,
            routes,
            exports: RouteExports::default(),
        })
    }

    /// Reads `routemill.toml` from `project_root` and the route configuration it points to.
    /// Missing configuration is logged and replaced by defaults.
    pub fn load(project_root: &Path) -> Result<RouteBuild, BuildError> {
        let options = load_build_options(&project_root.join(PROJECT_CONFIG_FILE)).with_project_root(project_root);
        let entries = load_route_config(&options.route_config_path());

        RouteBuild::with_project_root(project_root, options, &entries)
    }

    #[inline]
    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    #[inline]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Exports recorded for the route by [`RouteBuild::analyze_route`]
    pub fn exports(&self, route_id: &str) -> Option<&ExportSet> {
        self.exports.get(route_id)
    }

    /// Compiles the route for the server and records which exports it keeps.
    /// The manifest flags are answered from these exports.
    pub fn analyze_route(&mut self, route_id: &str, source: &str) -> Result<&ExportSet, BuildError> {
        let compiled = self.compile(route_id, source, Environment::Server, CompileOptions::default())?;

        debug!(route_id, exports = compiled.exports.len(), "analyzed route exports");

        let exports = self.exports.entry(route_id.to_string()).or_default();
        *exports = compiled.exports;
        Ok(exports)
    }

    /// Compiles the module of a known route
    pub fn compile(
        &self,
        route_id: &str,
        source: &str,
        env: Environment,
        options: CompileOptions,
    ) -> Result<CompiledRoute, BuildError> {
        let route = self
            .routes
            .get(route_id)
            .ok_or_else(|| BuildError::UnknownRoute(route_id.to_string()))?;

        compile_route(source, &route.file, env, options).map_err(|source| BuildError::Route {
            route_id: route_id.to_string(),
            source,
        })
    }

    pub fn manifest_builder(&self) -> ManifestBuilder {
        ManifestBuilder::new(&self.options.assets_prefix, self.options.route_modules)
    }

    /// Builds a fresh manifest, with empty asset lists when `stats` is unavailable
    pub fn manifest(&self, stats: Option<&AssetStats>) -> Manifest {
        self.manifest_builder().build(&self.routes, stats, &self.exports)
    }

    pub fn server_build_options(&self) -> ServerBuildOptions {
        ServerBuildOptions {
            entry_server_path: self.options.entry_server_path(),
            app_directory: self.options.app_directory.to_owned(),
            assets_build_directory: self.options.assets_build_directory(),
            basename: self.options.basename.to_owned(),
            public_path: self.options.public_path.to_owned(),
            is_spa_mode: self.options.is_spa_mode(),
            module_mode: self.options.route_modules,
        }
    }

    /// Every virtual module known before compilation, by module id
    pub fn virtual_modules(&self) -> Vec<(&'static str, String)> {
        let modules = virtual_modules::static_virtual_modules(&self.routes, &self.server_build_options());
        info!(modules = modules.len(), "generated virtual modules");
        modules
    }

    /// Manifest module source for the environment
    pub fn manifest_module(&self, stats: Option<&AssetStats>, env: Environment) -> Result<String, BuildError> {
        let manifest = self.manifest(stats);
        Ok(virtual_modules::generate_manifest_module(&manifest, env)?)
    }

    /// Entries of the client compilation, chunk name to module request
    pub fn client_entries(&self) -> Vec<(String, String)> {
        virtual_modules::client_entries(
            &self.routes,
            &self.options.app_directory,
            &self.options.entry_client_path(),
        )
    }
}
