//! Source text of the virtual modules the bundles import.

use itertools::Itertools;
use routemill_core::{Environment, Manifest, RouteTable, WITH_PROPS_MODULE};

use crate::{
    builder::{ModuleMode, BROWSER_MANIFEST_MODULE, ENTRY_CLIENT_CHUNK, SERVER_MANIFEST_MODULE},
    paths::resolve_path,
};

/// Module id of the server build
pub const SERVER_BUILD_MODULE: &str = "virtual/react-router/server-build";
/// Module id of the client route table
pub const CLIENT_ROUTES_MODULE: &str = "virtual/react-router/client-routes";
/// Module id of the lazy route module helper
pub const LAZY_ROUTE_MODULE: &str = "virtual/react-router/lazy-route-module";
/// Resource query which marks a route module for the route transformation
pub const ROUTE_MODULE_QUERY: &str = "?react-router-route";

const WITH_PROPS_SOURCE: &str = r#"import { createElement as h } from "react";
import { useActionData, useLoaderData, useMatches, useParams, useRouteError } from "react-router";

export function withComponentProps(Component) {
  return function Wrapped() {
    const props = {
      params: useParams(),
      loaderData: useLoaderData(),
      actionData: useActionData(),
      matches: useMatches(),
    };
    return h(Component, props);
  };
}

export function withHydrateFallbackProps(HydrateFallback) {
  return function Wrapped() {
    const props = {
      params: useParams(),
    };
    return h(HydrateFallback, props);
  };
}

export function withErrorBoundaryProps(ErrorBoundary) {
  return function Wrapped() {
    const props = {
      params: useParams(),
      loaderData: useLoaderData(),
      actionData: useActionData(),
      error: useRouteError(),
    };
    return h(ErrorBoundary, props);
  };
}
"#;

const LAZY_ROUTE_MODULE_SOURCE: &str = r#"const DATA_MEMBERS = ["loader", "clientLoader", "action", "clientAction"];
const PASSTHROUGH_MEMBERS = [
  "default",
  "ErrorBoundary",
  "HydrateFallback",
  "Layout",
  "handle",
  "headers",
  "links",
  "shouldRevalidate",
];

export function createLazyRouteModule(load) {
  let loaded;
  let pending;

  function ensure() {
    if (loaded) return Promise.resolve(loaded);
    if (!pending) {
      pending = load().then(
        (mod) => {
          loaded = mod;
          return mod;
        },
        (error) => {
          pending = undefined;
          throw error;
        },
      );
    }
    return pending;
  }

  const proxy = {};
  for (const name of DATA_MEMBERS) {
    proxy[name] = async (...args) => {
      const mod = await ensure();
      return typeof mod[name] === "function" ? mod[name](...args) : null;
    };
  }
  proxy.meta = (...args) => {
    if (!loaded) {
      ensure().catch(() => {});
      return [];
    }
    return typeof loaded.meta === "function" ? loaded.meta(...args) : [];
  };
  for (const name of PASSTHROUGH_MEMBERS) {
    Object.defineProperty(proxy, name, {
      enumerable: true,
      get() {
        if (!loaded) ensure().catch(() => {});
        return loaded ? loaded[name] : undefined;
      },
    });
  }
  return proxy;
}
"#;

/// Options of the generated server build
#[derive(Debug, Clone)]
pub struct ServerBuildOptions {
    pub entry_server_path: String,
    pub app_directory: String,
    pub assets_build_directory: String,
    pub basename: String,
    pub public_path: String,
    pub is_spa_mode: bool,
    pub module_mode: ModuleMode,
}

/// Source of `virtual/react-router/with-props`
pub fn with_props_module() -> &'static str {
    WITH_PROPS_SOURCE
}

/// Source of the lazy route module helper used by the server build in lazy mode
pub fn lazy_route_module() -> &'static str {
    LAZY_ROUTE_MODULE_SOURCE
}

/// Source of the server build module
pub fn generate_server_build(routes: &RouteTable, options: &ServerBuildOptions) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(routes.len() * 2 + 16);

    lines.push(format!(
        "import * as entryServer from {};",
        json_str(&options.entry_server_path)
    ));

    match options.module_mode {
        ModuleMode::Eager => {
            for (index, route) in routes.iter().enumerate() {
                lines.push(format!(
                    "import * as route{index} from {};",
                    json_str(&route_module_request(&options.app_directory, &route.file))
                ));
            }
        }
        ModuleMode::Lazy => {
            lines.push(format!(
                "import {{ createLazyRouteModule }} from {};",
                json_str(LAZY_ROUTE_MODULE)
            ));
            for (index, route) in routes.iter().enumerate() {
                lines.push(format!(
                    "const route{index} = createLazyRouteModule(() => import({}));",
                    json_str(&route_module_request(&options.app_directory, &route.file))
                ));
            }
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "export {{ default as assets }} from {};",
        json_str(SERVER_MANIFEST_MODULE)
    ));
    lines.push(format!(
        "export const assetsBuildDirectory = {};",
        json_str(&options.assets_build_directory)
    ));
    lines.push(format!("export const basename = {};", json_str(&options.basename)));
    lines.push("export const future = {};".to_string());
    lines.push(format!("export const isSpaMode = {};", options.is_spa_mode));
    lines.push(format!("export const publicPath = {};", json_str(&options.public_path)));
    lines.push("export const entry = { module: entryServer };".to_string());

    let route_entries = routes
        .iter()
        .enumerate()
        .map(|(index, route)| {
            format!(
                "  {}: {{\n    {},\n    module: route{index}\n  }}",
                json_str(&route.id),
                route_fields(route).join(",\n    ")
            )
        })
        .join(",\n");
    lines.push(format!("export const routes = {{\n{route_entries}\n}};"));

    lines.join("\n") + "\n"
}

/// Source of the client route table: `routes` and the `routeModules` loaders
pub fn generate_client_routes(routes: &RouteTable, app_directory: &str) -> String {
    let route_entries = routes
        .iter()
        .map(|route| {
            format!(
                "  {}: {{\n    {}\n  }}",
                json_str(&route.id),
                route_fields(route).join(",\n    ")
            )
        })
        .join(",\n");

    let module_entries = routes
        .iter()
        .map(|route| {
            format!(
                "  {}: () => import({})",
                json_str(&route.id),
                json_str(&route_module_request(app_directory, &route.file))
            )
        })
        .join(",\n");

    format!(
        "export const routes = {{\n{route_entries}\n}};\n\nexport const routeModules = {{\n{module_entries}\n}};\n"
    )
}

/// Source of the manifest module for the environment.
/// The browser gets a global assignment, the server a default export.
pub fn generate_manifest_module(
    manifest: &Manifest,
    env: Environment,
) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(manifest)?;

    Ok(match env {
        Environment::Client => format!("window.__reactRouterManifest={json};"),
        Environment::Server => format!("export default {json};"),
    })
}

/// Entries of the client compilation: the client entry, the browser manifest and one chunk per route
pub fn client_entries(
    routes: &RouteTable,
    app_directory: &str,
    entry_client_path: &str,
) -> Vec<(String, String)> {
    let mut entries = Vec::with_capacity(routes.len() + 2);
    entries.push((ENTRY_CLIENT_CHUNK.to_string(), entry_client_path.to_string()));
    entries.push((
        BROWSER_MANIFEST_MODULE.to_string(),
        BROWSER_MANIFEST_MODULE.to_string(),
    ));

    for route in routes.iter() {
        entries.push((
            route.chunk_name().to_string(),
            route_module_request(app_directory, &route.file),
        ));
    }

    entries
}

/// Ids and sources of every virtual module which does not depend on the compilation
pub fn static_virtual_modules(
    routes: &RouteTable,
    options: &ServerBuildOptions,
) -> Vec<(&'static str, String)> {
    vec![
        (WITH_PROPS_MODULE, with_props_module().to_string()),
        (LAZY_ROUTE_MODULE, lazy_route_module().to_string()),
        (SERVER_BUILD_MODULE, generate_server_build(routes, options)),
        (
            CLIENT_ROUTES_MODULE,
            generate_client_routes(routes, &options.app_directory),
        ),
    ]
}

/// `/app/routes/home.tsx?react-router-route`
pub fn route_module_request(app_directory: &str, file: &str) -> String {
    format!("{}{ROUTE_MODULE_QUERY}", resolve_path(app_directory, file))
}

fn route_fields(route: &routemill_core::RouteRecord) -> [String; 5] {
    [
        format!("id: {}", json_str(&route.id)),
        format!("parentId: {}", json_opt_str(route.parent_id.as_deref())),
        format!("path: {}", json_opt_str(route.path.as_deref())),
        format!("index: {}", json_opt_bool(route.index)),
        format!("caseSensitive: {}", json_opt_bool(route.case_sensitive)),
    ]
}

#[inline]
fn json_str(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

fn json_opt_str(value: Option<&str>) -> String {
    value.map(json_str).unwrap_or_else(|| "undefined".to_string())
}

fn json_opt_bool(value: Option<bool>) -> String {
    value
        .map(|value| value.to_string())
        .unwrap_or_else(|| "undefined".to_string())
}
