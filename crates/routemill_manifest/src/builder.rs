use std::collections::BTreeMap;

use fxhash::FxHashMap;
use routemill_core::{
    EntryManifest, ExportSet, Manifest, ModuleRef, RouteManifestItem, RouteRecord, RouteTable,
};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use tracing::{info, warn};

use crate::{paths::combine_urls, stats::AssetStats};

/// Chunk name of the client entry
pub const ENTRY_CLIENT_CHUNK: &str = "entry.client";
/// Module id of the browser manifest
pub const BROWSER_MANIFEST_MODULE: &str = "virtual/react-router/browser-manifest";
/// Module id of the server manifest
pub const SERVER_MANIFEST_MODULE: &str = "virtual/react-router/server-manifest";

/// How route modules are referenced by the generated code
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, AsRefStr, Display, EnumString, Deserialize, Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ModuleMode {
    /// Every route module is imported up front
    #[default]
    Eager,
    /// Route modules are loaded on first use
    Lazy,
}

/// Exports of each route module after classification, keyed by route id
pub type RouteExports = FxHashMap<String, ExportSet>;

#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    assets_prefix: String,
    module_mode: ModuleMode,
}

impl Default for ManifestBuilder {
    fn default() -> Self {
        ManifestBuilder {
            assets_prefix: "/static/".to_string(),
            module_mode: ModuleMode::Eager,
        }
    }
}

impl ManifestBuilder {
    pub fn new(assets_prefix: impl Into<String>, module_mode: ModuleMode) -> Self {
        ManifestBuilder {
            assets_prefix: assets_prefix.into(),
            module_mode,
        }
    }

    /// `<assetsPrefix>js/virtual/react-router/browser-manifest.js`
    pub fn manifest_url(&self) -> String {
        combine_urls(&self.assets_prefix, &format!("js/{BROWSER_MANIFEST_MODULE}.js"))
    }

    /// Builds a fresh manifest.
    ///
    /// Without `stats` the asset lists stay empty and module URLs follow the output naming.
    pub fn build(
        &self,
        routes: &RouteTable,
        stats: Option<&AssetStats>,
        exports: &RouteExports,
    ) -> Manifest {
        if stats.is_none() {
            warn!("client statistics are not available, manifest asset lists are empty");
        }

        let entry = self.build_entry(stats);
        let routes: BTreeMap<String, RouteManifestItem> = routes
            .iter()
            .map(|route| {
                let item = self.build_route(route, stats, exports.get(&route.id));
                (route.id.to_owned(), item)
            })
            .collect();

        let version = manifest_version(&entry, &routes);

        info!(routes = routes.len(), version = %version, "built route manifest");

        Manifest {
            version,
            url: self.manifest_url(),
            entry,
            routes,
        }
    }

    fn build_entry(&self, stats: Option<&AssetStats>) -> EntryManifest {
        let default_module = combine_urls(&self.assets_prefix, &format!("js/{ENTRY_CLIENT_CHUNK}.js"));

        match stats.and_then(|stats| stats.chunk(ENTRY_CLIENT_CHUNK)) {
            Some(chunk) => EntryManifest {
                module: chunk.module().map(str::to_string).unwrap_or(default_module),
                imports: chunk.imports().to_vec(),
                css: chunk.styles.to_owned(),
            },
            None => EntryManifest {
                module: default_module,
                imports: vec![],
                css: vec![],
            },
        }
    }

    fn build_route(
        &self,
        route: &RouteRecord,
        stats: Option<&AssetStats>,
        exports: Option<&ExportSet>,
    ) -> RouteManifestItem {
        let chunk_name = route.chunk_name();
        let chunk = stats.and_then(|stats| stats.chunk(chunk_name));

        let module = match self.module_mode {
            ModuleMode::Lazy => ModuleRef::Lazy(chunk_name.to_string()),
            ModuleMode::Eager => ModuleRef::Asset(
                chunk
                    .and_then(|chunk| chunk.module())
                    .map(str::to_string)
                    .unwrap_or_else(|| combine_urls(&self.assets_prefix, &format!("js/{chunk_name}.js"))),
            ),
        };

        let has = |check: fn(&ExportSet) -> bool| exports.map(check).unwrap_or(false);

        RouteManifestItem {
            id: route.id.to_owned(),
            parent_id: route.parent_id.to_owned(),
            path: route.path.to_owned(),
            index: route.index,
            case_sensitive: route.case_sensitive,
            module,
            has_action: has(ExportSet::has_action),
            has_loader: has(ExportSet::has_loader),
            has_client_action: has(ExportSet::has_client_action),
            has_client_loader: has(ExportSet::has_client_loader),
            has_error_boundary: has(ExportSet::has_error_boundary),
            imports: chunk.map(|chunk| chunk.imports().to_vec()).unwrap_or_default(),
            css: chunk.map(|chunk| chunk.styles.to_owned()).unwrap_or_default(),
        }
    }
}

/// Hash of the manifest contents, so equal inputs give equal versions
fn manifest_version(entry: &EntryManifest, routes: &BTreeMap<String, RouteManifestItem>) -> String {
    let contents = serde_json::to_vec(&(entry, routes)).unwrap_or_default();
    format!("{:016x}", fxhash::hash64(&contents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_route_table, stats::ChunkAssets};
    use routemill_core::RouteConfigEntry;

    fn table() -> RouteTable {
        build_route_table(
            "root.tsx",
            "/project/app",
            &[RouteConfigEntry::new("routes/home.tsx").as_index()],
        )
        .unwrap()
    }

    fn exports() -> RouteExports {
        let mut exports = RouteExports::default();
        exports.insert(
            "root".to_string(),
            ["default", "ErrorBoundary", "Layout"].into_iter().collect(),
        );
        exports.insert(
            "routes/home".to_string(),
            ["default", "loader", "meta"].into_iter().collect(),
        );
        exports
    }

    #[test]
    fn it_builds_without_stats() {
        let manifest = ManifestBuilder::default().build(&table(), None, &exports());

        assert_eq!(manifest.url, "/static/js/virtual/react-router/browser-manifest.js");
        assert_eq!(manifest.entry.module, "/static/js/entry.client.js");
        assert!(manifest.entry.imports.is_empty());

        let home = manifest.route("routes/home").unwrap();
        assert_eq!(home.module, ModuleRef::Asset("/static/js/routes/home.js".to_string()));
        assert_eq!(home.parent_id.as_deref(), Some("root"));
        assert_eq!(home.index, Some(true));
        assert!(home.has_loader);
        assert!(!home.has_action);
        assert!(home.imports.is_empty() && home.css.is_empty());

        let root = manifest.route("root").unwrap();
        assert!(root.has_error_boundary);
        assert!(!root.has_loader);
    }

    #[test]
    fn it_uses_stats_assets() {
        let mut stats = AssetStats::default();
        stats.insert(
            "routes/home",
            ChunkAssets {
                scripts: vec!["/static/js/shared.js".into(), "/static/js/routes/home.abc.js".into()],
                styles: vec!["/static/css/home.css".into()],
            },
        );
        stats.insert(
            ENTRY_CLIENT_CHUNK,
            ChunkAssets {
                scripts: vec!["/static/js/runtime.js".into(), "/static/js/entry.client.js".into()],
                styles: vec![],
            },
        );

        let manifest = ManifestBuilder::default().build(&table(), Some(&stats), &exports());
        let home = manifest.route("routes/home").unwrap();

        assert_eq!(home.module.as_str(), "/static/js/routes/home.abc.js");
        assert_eq!(home.imports, vec!["/static/js/shared.js".to_string()]);
        assert_eq!(home.css, vec!["/static/css/home.css".to_string()]);
        assert_eq!(manifest.entry.imports, vec!["/static/js/runtime.js".to_string()]);
    }

    #[test]
    fn it_references_chunks_in_lazy_mode() {
        let manifest = ManifestBuilder::new("/static/", ModuleMode::Lazy).build(&table(), None, &exports());
        let home = manifest.route("routes/home").unwrap();

        assert_eq!(home.module, ModuleRef::Lazy("routes/home".to_string()));
        assert_eq!(
            serde_json::to_value(home).unwrap()["module"],
            serde_json::json!("routes/home")
        );
    }

    #[test]
    fn it_has_deterministic_versions() {
        let builder = ManifestBuilder::default();
        let first = builder.build(&table(), None, &exports());
        let second = builder.build(&table(), None, &exports());
        let other = builder.build(&table(), None, &RouteExports::default());

        assert_eq!(first.version, second.version);
        assert_ne!(first.version, other.version);
        assert_eq!(first.version.len(), 16);
    }

    #[test]
    fn it_serializes_wire_format() {
        let manifest = ManifestBuilder::default().build(&table(), None, &exports());
        let json = serde_json::to_value(&manifest).unwrap();

        assert!(json["version"].is_string());
        assert_eq!(json["entry"]["css"], serde_json::json!([]));
        assert_eq!(json["routes"]["routes/home"]["hasLoader"], serde_json::json!(true));
        assert_eq!(json["routes"]["routes/home"]["parentId"], serde_json::json!("root"));
        assert!(json["routes"]["root"].get("parentId").is_none());
    }
}
