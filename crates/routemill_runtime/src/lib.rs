mod error;
pub mod lazy;
pub mod matching;
mod module;
pub mod render;

pub use error::RouteModuleError;
pub use lazy::{DataMember, LazyRouteModule, LazyRouteModules, LoadStatus, ModuleLoadState};
pub use matching::{match_routes, RouteMatch};
pub use module::{
    DataFunction, DataFunctionArgs, DataMemberKind, MetaArgs, MetaFunction, ModuleLoader, Params,
    PassthroughMember, RouteModule, StaticModules,
};
pub use render::{
    active_matches, is_fog_of_war_enabled, modulepreload_hrefs, partial_manifest, route_modules_script,
    route_preloads, HydrationState, RenderContext, RouteErrors, RouterState,
};
