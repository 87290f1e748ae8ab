use std::{collections::BTreeMap, fmt, future::Future, sync::Arc};

use async_trait::async_trait;
use fxhash::FxHashMap;
use futures::{future::BoxFuture, FutureExt};
use routemill_core::{ExportSet, ModuleRef};
use serde_json::Value;
use strum_macros::{AsRefStr, EnumIter, IntoStaticStr};

use crate::error::RouteModuleError;

/// Route parameters, e.g. `{ "id": "42" }` for `/users/:id`
pub type Params = BTreeMap<String, String>;

/// Arguments of `loader`, `clientLoader`, `action` and `clientAction`
#[derive(Debug, Clone, Default)]
pub struct DataFunctionArgs {
    pub url: String,
    pub params: Params,
    pub context: Value,
}

/// Arguments of `meta`
#[derive(Debug, Clone, Default)]
pub struct MetaArgs {
    pub pathname: String,
    pub params: Params,
    pub data: Value,
}

pub type DataFunction =
    Arc<dyn Fn(DataFunctionArgs) -> BoxFuture<'static, Result<Value, RouteModuleError>> + Send + Sync>;

pub type MetaFunction = Arc<dyn Fn(&MetaArgs) -> Vec<Value> + Send + Sync>;

/// The data producing members of a route module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "camelCase")]
pub enum DataMemberKind {
    Loader,
    ClientLoader,
    Action,
    ClientAction,
}

/// Exports which are passed through as plain values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, EnumIter, IntoStaticStr)]
pub enum PassthroughMember {
    #[strum(serialize = "default")]
    Default,
    ErrorBoundary,
    HydrateFallback,
    Layout,
    #[strum(serialize = "handle")]
    Handle,
    #[strum(serialize = "headers")]
    Headers,
    #[strum(serialize = "links")]
    Links,
    #[strum(serialize = "shouldRevalidate")]
    ShouldRevalidate,
}

/// Evaluated route module
#[derive(Clone, Default)]
pub struct RouteModule {
    loader: Option<DataFunction>,
    client_loader: Option<DataFunction>,
    action: Option<DataFunction>,
    client_action: Option<DataFunction>,
    meta: Option<MetaFunction>,
    values: FxHashMap<PassthroughMember, Value>,
}

impl RouteModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data_function<F, Fut>(mut self, kind: DataMemberKind, f: F) -> Self
    where
        F: Fn(DataFunctionArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, RouteModuleError>> + Send + 'static,
    {
        let function: DataFunction = Arc::new(move |args| f(args).boxed());
        *self.data_slot(kind) = Some(function);
        self
    }

    pub fn with_loader<F, Fut>(self, f: F) -> Self
    where
        F: Fn(DataFunctionArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, RouteModuleError>> + Send + 'static,
    {
        self.with_data_function(DataMemberKind::Loader, f)
    }

    pub fn with_action<F, Fut>(self, f: F) -> Self
    where
        F: Fn(DataFunctionArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, RouteModuleError>> + Send + 'static,
    {
        self.with_data_function(DataMemberKind::Action, f)
    }

    pub fn with_meta<F>(mut self, f: F) -> Self
    where
        F: Fn(&MetaArgs) -> Vec<Value> + Send + Sync + 'static,
    {
        self.meta = Some(Arc::new(f));
        self
    }

    pub fn with_value(mut self, member: PassthroughMember, value: Value) -> Self {
        self.values.insert(member, value);
        self
    }

    #[inline]
    pub fn data_function(&self, kind: DataMemberKind) -> Option<&DataFunction> {
        match kind {
            DataMemberKind::Loader => self.loader.as_ref(),
            DataMemberKind::ClientLoader => self.client_loader.as_ref(),
            DataMemberKind::Action => self.action.as_ref(),
            DataMemberKind::ClientAction => self.client_action.as_ref(),
        }
    }

    #[inline]
    pub fn meta(&self) -> Option<&MetaFunction> {
        self.meta.as_ref()
    }

    #[inline]
    pub fn value(&self, member: PassthroughMember) -> Option<&Value> {
        self.values.get(&member)
    }

    /// Names this module exports
    pub fn export_names(&self) -> ExportSet {
        use strum::IntoEnumIterator;

        let data = DataMemberKind::iter()
            .filter(|kind| self.data_function(*kind).is_some())
            .map(|kind| kind.as_ref().to_string());
        let meta = self.meta.as_ref().map(|_| "meta".to_string());
        let values = self.values.keys().map(|member| member.as_ref().to_string());

        data.chain(meta).chain(values).collect()
    }

    fn data_slot(&mut self, kind: DataMemberKind) -> &mut Option<DataFunction> {
        match kind {
            DataMemberKind::Loader => &mut self.loader,
            DataMemberKind::ClientLoader => &mut self.client_loader,
            DataMemberKind::Action => &mut self.action,
            DataMemberKind::ClientAction => &mut self.client_action,
        }
    }
}

impl fmt::Debug for RouteModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteModule")
            .field("exports", &self.export_names())
            .finish()
    }
}

/// Fetches and evaluates the compiled module of a route
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn load(&self, reference: &ModuleRef) -> Result<RouteModule, RouteModuleError>;
}

/// Loader over modules which are already in memory, keyed by their reference
#[derive(Debug, Clone, Default)]
pub struct StaticModules {
    modules: FxHashMap<String, RouteModule>,
}

impl StaticModules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, reference: impl Into<String>, module: RouteModule) {
        self.modules.insert(reference.into(), module);
    }
}

#[async_trait]
impl ModuleLoader for StaticModules {
    async fn load(&self, reference: &ModuleRef) -> Result<RouteModule, RouteModuleError> {
        self.modules
            .get(reference.as_str())
            .cloned()
            .ok_or_else(|| RouteModuleError::load(reference.as_str(), "module not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_lists_export_names() {
        let module = RouteModule::new()
            .with_loader(|_| async { Ok(Value::Null) })
            .with_meta(|_| vec![])
            .with_value(PassthroughMember::Default, Value::from("Page"))
            .with_value(PassthroughMember::ErrorBoundary, Value::from("ErrorBoundary"));

        let names = module.export_names();
        assert_eq!(
            names.iter().collect::<Vec<_>>(),
            vec!["ErrorBoundary", "default", "loader", "meta"]
        );
        assert!(names.has_loader());
        assert!(names.has_error_boundary());
        assert!(!names.has_client_loader());
    }

    #[test]
    fn member_names_match_exports() {
        assert_eq!(DataMemberKind::ClientLoader.as_ref(), "clientLoader");
        assert_eq!(DataMemberKind::Action.as_ref(), "action");
        assert_eq!(PassthroughMember::Default.as_ref(), "default");
        assert_eq!(PassthroughMember::HydrateFallback.as_ref(), "HydrateFallback");
        assert_eq!(PassthroughMember::ShouldRevalidate.as_ref(), "shouldRevalidate");
    }

    #[tokio::test]
    async fn static_modules_load_by_reference() {
        let mut modules = StaticModules::new();
        modules.insert("routes/home", RouteModule::new());

        assert!(modules
            .load(&ModuleRef::Lazy("routes/home".to_string()))
            .await
            .is_ok());

        let missing = modules.load(&ModuleRef::Lazy("routes/none".to_string())).await;
        assert_eq!(
            missing.map(|_| ()),
            Err(RouteModuleError::load("routes/none", "module not found"))
        );
    }
}
