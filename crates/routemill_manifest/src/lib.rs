//! Route tree, manifest and virtual modules.
//!
//! The authored route configuration is flattened into a [`RouteTable`](routemill_core::RouteTable)
//! by [`build_route_table`], which then feeds both the [`ManifestBuilder`] and the generated
//! server and client modules.

mod builder;
mod error;
pub mod paths;
mod route_tree;
mod stats;
pub mod virtual_modules;

pub use builder::{
    ManifestBuilder, ModuleMode, RouteExports, BROWSER_MANIFEST_MODULE, ENTRY_CLIENT_CHUNK,
    SERVER_MANIFEST_MODULE,
};
pub use error::RouteTreeError;
pub use paths::combine_urls;
pub use route_tree::{build_route_table, flatten_routes};
pub use stats::{AssetStats, ChunkAssets};
