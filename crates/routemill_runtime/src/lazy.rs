//! Lazy route module proxy.
//!
//! A [`LazyRouteModule`] stands in for a route's compiled module. The first access to any member
//! starts the load, concurrent accesses share that single in-flight load, and once the module
//! is loaded every member resolves against the cached module.
//!
//! A failed load is delivered to every waiter of that load. The state then goes back to
//! [`LoadStatus::Pending`] and the next access starts a new load.

use std::sync::{Arc, Weak};

use futures::{
    future::{BoxFuture, Shared},
    FutureExt,
};
use fxhash::FxHashMap;
use parking_lot::Mutex;
use routemill_core::{Manifest, ModuleRef};
use serde_json::Value;
use strum_macros::{AsRefStr, IntoStaticStr};
use tracing::{debug, warn};

use crate::{
    error::RouteModuleError,
    module::{DataFunctionArgs, DataMemberKind, MetaArgs, ModuleLoader, PassthroughMember, RouteModule},
};

type LoadResult = Result<Arc<RouteModule>, RouteModuleError>;
type SharedLoad = Shared<BoxFuture<'static, LoadResult>>;

/// Where the module of a proxy is in its lifecycle
pub enum ModuleLoadState {
    /// Nothing started yet, or the last load failed
    Pending,
    /// The single in-flight load, shared by every waiter
    Loading(SharedLoad),
    Loaded(Arc<RouteModule>),
}

/// [`ModuleLoadState`] without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum LoadStatus {
    Pending,
    Loading,
    Loaded,
}

impl ModuleLoadState {
    pub fn status(&self) -> LoadStatus {
        match self {
            ModuleLoadState::Pending => LoadStatus::Pending,
            ModuleLoadState::Loading(_) => LoadStatus::Loading,
            ModuleLoadState::Loaded(_) => LoadStatus::Loaded,
        }
    }
}

struct LazyInner {
    route_id: String,
    reference: ModuleRef,
    loader: Arc<dyn ModuleLoader>,
    state: Mutex<ModuleLoadState>,
}

enum Access {
    Ready(Arc<RouteModule>),
    Wait(SharedLoad),
}

impl LazyInner {
    /// Returns the loaded module or the in-flight load, starting it when needed.
    /// The lock is released before anything is awaited.
    fn access(self: &Arc<Self>) -> Access {
        let mut state = self.state.lock();

        match *state {
            ModuleLoadState::Loaded(ref module) => return Access::Ready(module.clone()),
            ModuleLoadState::Loading(ref load) => return Access::Wait(load.clone()),
            ModuleLoadState::Pending => {}
        }

        debug!(route_id = %self.route_id, reference = %self.reference, "loading route module");

        let load = start_load(
            Arc::downgrade(self),
            self.loader.clone(),
            self.reference.clone(),
        );
        *state = ModuleLoadState::Loading(load.clone());

        Access::Wait(load)
    }

    async fn module(self: &Arc<Self>) -> LoadResult {
        match self.access() {
            Access::Ready(module) => Ok(module),
            Access::Wait(load) => load.await,
        }
    }

    fn loaded(&self) -> Option<Arc<RouteModule>> {
        match *self.state.lock() {
            ModuleLoadState::Loaded(ref module) => Some(module.clone()),
            _ => None,
        }
    }

    /// Starts loading without waiting, when a tokio runtime is available
    fn load_in_background(self: &Arc<Self>) {
        let Access::Wait(load) = self.access() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let _ = load.await;
                });
            }
            Err(_) => {
                debug!(route_id = %self.route_id, "no runtime to drive the route module load");
            }
        }
    }

    fn settle(&self, result: &LoadResult) {
        let mut state = self.state.lock();
        match result {
            Ok(module) => *state = ModuleLoadState::Loaded(module.clone()),
            Err(error) => {
                warn!(route_id = %self.route_id, %error, "route module load failed");
                *state = ModuleLoadState::Pending;
            }
        }
    }
}

/// The load future only holds a weak link back to its proxy, so the stored future does not keep it alive
fn start_load(
    inner: Weak<LazyInner>,
    loader: Arc<dyn ModuleLoader>,
    reference: ModuleRef,
) -> SharedLoad {
    async move {
        let result = loader.load(&reference).await.map(Arc::new);
        if let Some(inner) = inner.upgrade() {
            inner.settle(&result);
        }
        result
    }
    .boxed()
    .shared()
}

/// One of `loader`, `clientLoader`, `action` or `clientAction` of a [`LazyRouteModule`]
#[derive(Clone)]
pub struct DataMember {
    kind: DataMemberKind,
    inner: Arc<LazyInner>,
}

impl DataMember {
    #[inline]
    pub fn kind(&self) -> DataMemberKind {
        self.kind
    }

    /// Waits for the module if needed, then calls the function.
    /// A module without the function yields `Value::Null`.
    pub async fn call(&self, args: DataFunctionArgs) -> Result<Value, RouteModuleError> {
        let module = self.inner.module().await?;

        match module.data_function(self.kind) {
            Some(function) => function(args).await,
            None => Ok(Value::Null),
        }
    }
}

/// Proxy of a route module which is loaded on first use
#[derive(Clone)]
pub struct LazyRouteModule {
    inner: Arc<LazyInner>,
    loader_member: DataMember,
    client_loader_member: DataMember,
    action_member: DataMember,
    client_action_member: DataMember,
}

impl LazyRouteModule {
    pub fn new(
        route_id: impl Into<String>,
        reference: ModuleRef,
        loader: Arc<dyn ModuleLoader>,
    ) -> Self {
        let inner = Arc::new(LazyInner {
            route_id: route_id.into(),
            reference,
            loader,
            state: Mutex::new(ModuleLoadState::Pending),
        });

        let member = |kind| DataMember {
            kind,
            inner: inner.clone(),
        };

        LazyRouteModule {
            loader_member: member(DataMemberKind::Loader),
            client_loader_member: member(DataMemberKind::ClientLoader),
            action_member: member(DataMemberKind::Action),
            client_action_member: member(DataMemberKind::ClientAction),
            inner,
        }
    }

    #[inline]
    pub fn route_id(&self) -> &str {
        &self.inner.route_id
    }

    #[inline]
    pub fn reference(&self) -> &ModuleRef {
        &self.inner.reference
    }

    pub fn status(&self) -> LoadStatus {
        self.inner.state.lock().status()
    }

    /// Waits for the module, starting the load when nothing is in flight
    pub async fn load(&self) -> Result<Arc<RouteModule>, RouteModuleError> {
        self.inner.module().await
    }

    /// The module, if it is loaded already
    pub fn loaded(&self) -> Option<Arc<RouteModule>> {
        self.inner.loaded()
    }

    pub fn loader(&self) -> &DataMember {
        &self.loader_member
    }

    pub fn client_loader(&self) -> &DataMember {
        &self.client_loader_member
    }

    pub fn action(&self) -> &DataMember {
        &self.action_member
    }

    pub fn client_action(&self) -> &DataMember {
        &self.client_action_member
    }

    pub fn data_member(&self, kind: DataMemberKind) -> &DataMember {
        match kind {
            DataMemberKind::Loader => &self.loader_member,
            DataMemberKind::ClientLoader => &self.client_loader_member,
            DataMemberKind::Action => &self.action_member,
            DataMemberKind::ClientAction => &self.client_action_member,
        }
    }

    /// Never waits. Before the module is loaded this is empty and the load is started.
    pub fn meta(&self, args: &MetaArgs) -> Vec<Value> {
        match self.inner.loaded() {
            Some(module) => module.meta().map(|meta| meta(args)).unwrap_or_default(),
            None => {
                self.inner.load_in_background();
                vec![]
            }
        }
    }

    /// Never waits. Before the module is loaded this is `None` and the load is started.
    pub fn value(&self, member: PassthroughMember) -> Option<Value> {
        match self.inner.loaded() {
            Some(module) => module.value(member).cloned(),
            None => {
                self.inner.load_in_background();
                None
            }
        }
    }

    pub fn default_export(&self) -> Option<Value> {
        self.value(PassthroughMember::Default)
    }

    pub fn error_boundary(&self) -> Option<Value> {
        self.value(PassthroughMember::ErrorBoundary)
    }

    pub fn hydrate_fallback(&self) -> Option<Value> {
        self.value(PassthroughMember::HydrateFallback)
    }

    pub fn layout(&self) -> Option<Value> {
        self.value(PassthroughMember::Layout)
    }

    pub fn handle(&self) -> Option<Value> {
        self.value(PassthroughMember::Handle)
    }

    pub fn links(&self) -> Option<Value> {
        self.value(PassthroughMember::Links)
    }

    pub fn should_revalidate(&self) -> Option<Value> {
        self.value(PassthroughMember::ShouldRevalidate)
    }
}

impl std::fmt::Debug for LazyRouteModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyRouteModule")
            .field("route_id", &self.inner.route_id)
            .field("reference", &self.inner.reference)
            .field("status", &self.status())
            .finish()
    }
}

/// One proxy per route of a manifest
#[derive(Debug, Clone, Default)]
pub struct LazyRouteModules {
    modules: FxHashMap<String, LazyRouteModule>,
}

impl LazyRouteModules {
    pub fn from_manifest(manifest: &Manifest, loader: Arc<dyn ModuleLoader>) -> Self {
        let modules = manifest
            .routes
            .values()
            .map(|route| {
                let proxy = LazyRouteModule::new(&route.id, route.module.clone(), loader.clone());
                (route.id.to_owned(), proxy)
            })
            .collect();

        LazyRouteModules { modules }
    }

    #[inline]
    pub fn get(&self, route_id: &str) -> Option<&LazyRouteModule> {
        self.modules.get(route_id)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::StaticModules;
    use async_trait::async_trait;
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    /// Counts loads, waits a bit, and fails the first `failures` loads
    struct CountingLoader {
        loads: AtomicUsize,
        failures: usize,
        module: RouteModule,
    }

    impl CountingLoader {
        fn new(module: RouteModule, failures: usize) -> Arc<Self> {
            Arc::new(CountingLoader {
                loads: AtomicUsize::new(0),
                failures,
                module,
            })
        }

        fn loads(&self) -> usize {
            self.loads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ModuleLoader for CountingLoader {
        async fn load(&self, reference: &ModuleRef) -> Result<RouteModule, RouteModuleError> {
            let attempt = self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;

            if attempt < self.failures {
                return Err(RouteModuleError::load(reference.as_str(), "network error"));
            }
            Ok(self.module.clone())
        }
    }

    fn proxy(loader: Arc<CountingLoader>) -> LazyRouteModule {
        LazyRouteModule::new("routes/home", ModuleRef::Lazy("routes/home".to_string()), loader)
    }

    fn home_module() -> RouteModule {
        RouteModule::new()
            .with_loader(|args| async move { Ok(Value::from(format!("home {}", args.url))) })
            .with_meta(|_| vec![serde_json::json!({ "title": "Home" })])
            .with_value(PassthroughMember::Default, Value::from("Home"))
    }

    #[tokio::test]
    async fn it_loads_once_for_concurrent_calls() {
        let loader = CountingLoader::new(home_module(), 0);
        let proxy = proxy(loader.clone());

        let args = DataFunctionArgs {
            url: "/".to_string(),
            ..Default::default()
        };
        let (first, second) = tokio::join!(
            proxy.loader().call(args.clone()),
            proxy.loader().call(args.clone())
        );

        assert_eq!(first, Ok(Value::from("home /")));
        assert_eq!(second, Ok(Value::from("home /")));
        assert_eq!(loader.loads(), 1);
        assert_eq!(proxy.status(), LoadStatus::Loaded);

        // Later calls use the cached module
        let _ = proxy.loader().call(args).await;
        assert_eq!(loader.loads(), 1);
    }

    #[tokio::test]
    async fn it_loads_once_across_tasks() {
        let loader = CountingLoader::new(home_module(), 0);
        let proxy = proxy(loader.clone());

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let proxy = proxy.clone();
                tokio::spawn(async move { proxy.load().await.is_ok() })
            })
            .collect();

        for task in tasks {
            assert!(task.await.unwrap());
        }
        assert_eq!(loader.loads(), 1);
    }

    #[tokio::test]
    async fn missing_data_function_yields_null() {
        let loader = CountingLoader::new(RouteModule::new(), 0);
        let proxy = proxy(loader);

        let result = proxy.action().call(DataFunctionArgs::default()).await;
        assert_eq!(result, Ok(Value::Null));
        assert_eq!(proxy.client_loader().call(DataFunctionArgs::default()).await, Ok(Value::Null));
    }

    #[tokio::test]
    async fn meta_is_empty_until_loaded() {
        let loader = CountingLoader::new(home_module(), 0);
        let proxy = proxy(loader.clone());

        assert!(proxy.meta(&MetaArgs::default()).is_empty());
        assert_eq!(proxy.default_export(), None);
        // The access above started the load in the background
        assert_eq!(proxy.status(), LoadStatus::Loading);

        let _ = proxy.load().await;
        assert_eq!(
            proxy.meta(&MetaArgs::default()),
            vec![serde_json::json!({ "title": "Home" })]
        );
        assert_eq!(proxy.default_export(), Some(Value::from("Home")));
        assert_eq!(proxy.handle(), None);
        assert_eq!(loader.loads(), 1);
    }

    #[tokio::test]
    async fn failed_load_reaches_every_waiter_then_retries() {
        let loader = CountingLoader::new(home_module(), 1);
        let proxy = proxy(loader.clone());

        let (first, second) = tokio::join!(
            proxy.loader().call(DataFunctionArgs::default()),
            proxy.action().call(DataFunctionArgs::default())
        );

        let expected = Err(RouteModuleError::load("routes/home", "network error"));
        assert_eq!(first, expected);
        assert_eq!(second, expected);
        assert_eq!(loader.loads(), 1);
        assert_eq!(proxy.status(), LoadStatus::Pending);

        // Meta swallows the failure state and stays empty
        assert!(proxy.meta(&MetaArgs::default()).is_empty());

        let retried = proxy.loader().call(DataFunctionArgs::default()).await;
        assert_eq!(retried, Ok(Value::from("home ")));
        assert_eq!(loader.loads(), 2);
        assert_eq!(proxy.status(), LoadStatus::Loaded);
    }

    #[tokio::test]
    async fn it_builds_proxies_from_manifest() {
        use routemill_core::{Manifest, RouteManifestItem};

        let mut manifest = Manifest::default();
        manifest.routes.insert(
            "root".to_string(),
            RouteManifestItem {
                id: "root".to_string(),
                parent_id: None,
                path: Some(String::new()),
                index: None,
                case_sensitive: None,
                module: ModuleRef::Lazy("root".to_string()),
                has_action: false,
                has_loader: false,
                has_client_action: false,
                has_client_loader: false,
                has_error_boundary: false,
                imports: vec![],
                css: vec![],
            },
        );

        let mut modules = StaticModules::new();
        modules.insert("root", RouteModule::new().with_value(PassthroughMember::Layout, Value::from("Layout")));

        let proxies = LazyRouteModules::from_manifest(&manifest, Arc::new(modules));
        assert_eq!(proxies.len(), 1);

        let root = proxies.get("root").unwrap();
        assert_eq!(root.status(), LoadStatus::Pending);
        assert!(root.load().await.is_ok());
        assert_eq!(root.layout(), Some(Value::from("Layout")));
    }
}
