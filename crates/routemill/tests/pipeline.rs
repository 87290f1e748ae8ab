use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use routemill::{
    compile_route,
    manifest::{AssetStats, ChunkAssets, RouteTreeError},
    runtime::{
        active_matches, match_routes, route_preloads, DataFunctionArgs, LazyRouteModules, ModuleLoader,
        RenderContext, RouteModule, RouteModuleError,
    },
    BuildError, BuildOptions, CompileOptions, Environment, ModuleRef, RouteBuild, RouteConfigEntry,
};
use async_trait::async_trait;
use serde_json::Value;

const HOME: &str = include_str!("../benches/fixtures/home.tsx");
const DASHBOARD: &str = include_str!("../benches/fixtures/dashboard.tsx");
const ROOT: &str = include_str!("../benches/fixtures/root.tsx");

fn entries() -> Vec<RouteConfigEntry> {
    vec![
        RouteConfigEntry::new("routes/home.tsx").as_index(),
        RouteConfigEntry::new("routes/dashboard.tsx")
            .with_path("dashboard")
            .with_children(vec![
                RouteConfigEntry::new("routes/dashboard.settings.tsx").with_path("settings")
            ]),
    ]
}

#[test]
fn client_build_strips_server_code() {
    let compiled = compile_route(HOME, "routes/home.tsx", Environment::Client, CompileOptions::default()).unwrap();

    assert!(!compiled.code.contains("export async function loader"));
    assert!(!compiled.code.contains("export function headers"));
    // Only the loader used these
    assert!(!compiled.code.contains("fetchPosts"));
    assert!(!compiled.code.contains("PAGE_SIZE"));
    assert!(!compiled.code.contains("db.server"));
    // Still used by the component
    assert!(compiled.code.contains("formatDate"));

    assert!(compiled.code.contains("withHydrateFallbackProps"));
    assert!(compiled.code.contains("withComponentProps"));
    assert_eq!(compiled.code.matches("virtual/react-router/with-props").count(), 1);

    assert_eq!(compiled.removed_exports, vec!["loader".to_string(), "headers".to_string()]);
    assert!(compiled.exports.contains("meta"));
    assert!(!compiled.exports.has_loader());
}

#[test]
fn server_build_keeps_every_export() {
    let compiled = compile_route(DASHBOARD, "routes/dashboard.tsx", Environment::Server, CompileOptions::default()).unwrap();

    assert!(compiled.removed_exports.is_empty());
    for name in ["loader", "action", "clientLoader", "handle", "shouldRevalidate", "ErrorBoundary", "default"] {
        assert!(compiled.exports.contains(name), "missing {name}");
    }
    assert!(compiled.code.contains("requireUser"));
    assert!(compiled.code.contains("withErrorBoundaryProps"));
}

#[test]
fn client_build_keeps_client_imports() {
    let compiled = compile_route(DASHBOARD, "routes/dashboard.tsx", Environment::Client, CompileOptions::default()).unwrap();

    assert!(!compiled.code.contains("auth.server"));
    assert!(!compiled.code.contains("updateSettings"));
    assert!(compiled.code.contains("analytics.client"));
    assert!(!compiled.code.contains("redirect"));
    assert!(compiled.code.contains("Form"));
    assert!(compiled.exports.has_client_loader());
}

#[test]
fn root_layout_is_left_alone() {
    let compiled = compile_route(ROOT, "root.tsx", Environment::Client, CompileOptions::default()).unwrap();

    assert!(compiled.code.contains("export function Layout"));
    assert!(compiled.code.contains("export const links"));
    assert!(compiled.code.contains("withErrorBoundaryProps"));
}

#[test]
fn it_builds_manifest_from_analyzed_routes() {
    let mut build = RouteBuild::new(BuildOptions::default(), &entries()).unwrap();
    assert_eq!(build.routes().len(), 4);

    build.analyze_route("root", ROOT).unwrap();
    build.analyze_route("routes/home", HOME).unwrap();
    build.analyze_route("routes/dashboard", DASHBOARD).unwrap();

    let mut stats = AssetStats::default();
    stats.insert(
        "routes/dashboard",
        ChunkAssets {
            scripts: vec!["/static/js/shared.js".to_string(), "/static/js/routes/dashboard.abc.js".to_string()],
            styles: vec!["/static/css/dashboard.css".to_string()],
        },
    );

    let manifest = build.manifest(Some(&stats));
    let dashboard = manifest.route("routes/dashboard").unwrap();
    assert_eq!(dashboard.module, ModuleRef::Asset("/static/js/routes/dashboard.abc.js".to_string()));
    assert_eq!(dashboard.imports, vec!["/static/js/shared.js".to_string()]);
    assert!(dashboard.has_loader && dashboard.has_action && dashboard.has_client_loader);
    assert!(dashboard.has_error_boundary);

    let root = manifest.route("root").unwrap();
    assert!(root.has_error_boundary);
    assert_eq!(root.parent_id, None);

    let settings = manifest.route("routes/dashboard.settings").unwrap();
    assert_eq!(settings.parent_id.as_deref(), Some("routes/dashboard"));
    assert!(!settings.has_loader);

    // Same inputs, same version
    assert_eq!(build.manifest(Some(&stats)).version, manifest.version);
}

#[test]
fn duplicate_ids_stop_the_build() {
    let entries = vec![
        RouteConfigEntry::new("routes/home.tsx"),
        RouteConfigEntry::new("routes/home.jsx").with_path("home"),
    ];

    let error = RouteBuild::new(BuildOptions::default(), &entries).unwrap_err();
    assert!(matches!(
        error,
        BuildError::RouteTree(RouteTreeError::DuplicateRouteId { ref id }) if id == "routes/home"
    ));
    assert_eq!(
        error.to_string(),
        "Unable to define routes with duplicate route id: \"routes/home\""
    );
}

#[test]
fn preloads_follow_matches() {
    let build = RouteBuild::new(BuildOptions::default(), &entries()).unwrap();
    let manifest = build.manifest(None);

    let matches = match_routes(build.routes(), "/dashboard/settings", "/").unwrap();
    let ctx = RenderContext::new(false);
    let active = active_matches(&matches, None, &ctx);
    assert_eq!(active.len(), 3);

    assert_eq!(
        route_preloads(&manifest, active, &ctx),
        vec![
            "/static/js/root.js",
            "/static/js/routes/dashboard.js",
            "/static/js/routes/dashboard.settings.js",
        ]
    );
}

struct CountingLoader {
    loads: AtomicUsize,
}

#[async_trait]
impl ModuleLoader for CountingLoader {
    async fn load(&self, reference: &ModuleRef) -> Result<RouteModule, RouteModuleError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        match reference.as_str() {
            "routes/home" => Ok(RouteModule::new()
                .with_loader(|_| async { Ok(serde_json::json!({ "posts": [] })) })),
            "root" => Ok(RouteModule::new()),
            other => Err(RouteModuleError::load(other, "chunk failed to load")),
        }
    }
}

#[tokio::test]
async fn lazy_manifest_drives_route_proxies() {
    let options = BuildOptions {
        route_modules: routemill::manifest::ModuleMode::Lazy,
        ..Default::default()
    };
    let build = RouteBuild::new(options, &entries()).unwrap();
    let manifest = build.manifest(None);

    let loader = Arc::new(CountingLoader {
        loads: AtomicUsize::new(0),
    });
    let proxies = LazyRouteModules::from_manifest(&manifest, loader.clone());
    assert_eq!(proxies.len(), 4);

    let home = proxies.get("routes/home").unwrap();
    let (first, second) = tokio::join!(
        home.loader().call(DataFunctionArgs::default()),
        home.loader().call(DataFunctionArgs::default())
    );
    assert_eq!(first, Ok(serde_json::json!({ "posts": [] })));
    assert_eq!(first, second);
    assert_eq!(loader.loads.load(Ordering::SeqCst), 1);

    // The root module has no loader
    let root = proxies.get("root").unwrap();
    assert_eq!(root.loader().call(DataFunctionArgs::default()).await, Ok(Value::Null));

    let dashboard = proxies.get("routes/dashboard").unwrap();
    let failed = dashboard.action().call(DataFunctionArgs::default()).await;
    assert_eq!(
        failed,
        Err(RouteModuleError::load("routes/dashboard", "chunk failed to load"))
    );
}
