use std::collections::BTreeMap;

use serde::Serialize;

/// How a route's compiled code is referenced from the manifest.
///
/// Both kinds are written as the bare string the router runtime expects, so the kind does not
/// survive serialization and manifests are output only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum ModuleRef {
    /// Script URL, imported eagerly
    Asset(String),
    /// Chunk name, resolved by a module loader on first use
    Lazy(String),
}

impl ModuleRef {
    #[inline]
    pub fn as_str(&self) -> &str {
        match self {
            ModuleRef::Asset(s) | ModuleRef::Lazy(s) => s,
        }
    }

    #[inline]
    pub fn is_lazy(&self) -> bool {
        matches!(self, ModuleRef::Lazy(_))
    }
}

impl std::fmt::Display for ModuleRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Route as seen by the router runtime in the browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteManifestItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_sensitive: Option<bool>,
    pub module: ModuleRef,
    pub has_action: bool,
    pub has_loader: bool,
    pub has_client_action: bool,
    pub has_client_loader: bool,
    pub has_error_boundary: bool,
    pub imports: Vec<String>,
    pub css: Vec<String>,
}

/// Assets of the client entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntryManifest {
    pub module: String,
    pub imports: Vec<String>,
    pub css: Vec<String>,
}

/// The whole manifest, as handed to the router runtime
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Manifest {
    pub version: String,
    pub url: String,
    pub entry: EntryManifest,
    pub routes: BTreeMap<String, RouteManifestItem>,
}

impl Manifest {
    #[inline]
    pub fn route(&self, id: &str) -> Option<&RouteManifestItem> {
        self.routes.get(id)
    }
}
