//! Render-time helpers for the document scripts.
//!
//! Whether the page has hydrated is explicit state in [`RenderContext`], passed to every helper.

use std::collections::BTreeMap;

use fxhash::FxHashSet;
use itertools::Itertools;
use routemill_core::{Manifest, RouteTable};
use serde_json::Value;
use strum_macros::{AsRefStr, IntoStaticStr};

use crate::matching::{match_routes, RouteMatch};

/// Errors of the current router state, by route id
pub type RouteErrors = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum HydrationState {
    /// Rendering on the server, or the first client render
    #[default]
    Initial,
    Hydrated,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderContext {
    pub is_spa_mode: bool,
    pub hydration: HydrationState,
}

impl RenderContext {
    pub fn new(is_spa_mode: bool) -> Self {
        RenderContext {
            is_spa_mode,
            hydration: HydrationState::Initial,
        }
    }

    #[inline]
    pub fn is_hydrated(&self) -> bool {
        self.hydration == HydrationState::Hydrated
    }

    /// Called once the client finished its first render
    pub fn mark_hydrated(&mut self) {
        self.hydration = HydrationState::Hydrated;
    }
}

/// What the router knows about the current location
#[derive(Debug, Clone, Default)]
pub struct RouterState {
    pub pathname: String,
    pub basename: String,
    pub matches: Vec<RouteMatch>,
    pub errors: Option<RouteErrors>,
}

impl RouterState {
    /// Matches `pathname` against `table`, an unmatched location has no matches
    pub fn at(table: &RouteTable, pathname: impl Into<String>, basename: impl Into<String>) -> Self {
        let pathname = pathname.into();
        let basename = basename.into();
        let matches = match_routes(table, &pathname, &basename).unwrap_or_default();

        RouterState {
            pathname,
            basename,
            matches,
            errors: None,
        }
    }
}

/// Route discovery is lazy everywhere except in SPA mode
#[inline]
pub fn is_fog_of_war_enabled(is_spa_mode: bool) -> bool {
    !is_spa_mode
}

/// Matches which take part in the current render.
///
/// In SPA mode before hydration only the root match renders. With errors the matches stop at
/// the first errored route, and when no match has an error nothing renders.
pub fn active_matches<'m>(
    matches: &'m [RouteMatch],
    errors: Option<&RouteErrors>,
    ctx: &RenderContext,
) -> &'m [RouteMatch] {
    if ctx.is_spa_mode && !ctx.is_hydrated() {
        return &matches[..matches.len().min(1)];
    }

    if let Some(errors) = errors {
        let end = matches
            .iter()
            .position(|m| errors.contains_key(&m.route_id))
            .map_or(0, |idx| idx + 1);
        return &matches[..end];
    }

    matches
}

/// Scripts to preload: the entry imports, then each match's imports followed by its module.
/// Deduplicated in first-seen order, and empty once hydrated.
pub fn route_preloads(manifest: &Manifest, matches: &[RouteMatch], ctx: &RenderContext) -> Vec<String> {
    if ctx.is_hydrated() {
        return vec![];
    }

    let routes = matches.iter().flat_map(|m| {
        manifest
            .route(&m.route_id)
            .map(|route| {
                route
                    .imports
                    .iter()
                    .map(String::as_str)
                    .chain(std::iter::once(route.module.as_str()))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default()
    });

    manifest
        .entry
        .imports
        .iter()
        .map(String::as_str)
        .chain(routes)
        .unique()
        .map(ToString::to_string)
        .collect()
}

/// Every `modulepreload` href of the document, in order
pub fn modulepreload_hrefs(manifest: &Manifest, matches: &[RouteMatch], ctx: &RenderContext) -> Vec<String> {
    if ctx.is_hydrated() {
        return vec![];
    }

    let mut hrefs = Vec::new();
    if !is_fog_of_war_enabled(ctx.is_spa_mode) {
        hrefs.push(manifest.url.to_owned());
    }
    hrefs.push(manifest.entry.module.to_owned());
    hrefs.extend(route_preloads(manifest, matches, ctx));
    hrefs
}

/// The manifest restricted to what the initial render needs: the current matches,
/// plus whatever matches each parent path of `pathname` (pathless and index children).
pub fn partial_manifest(manifest: &Manifest, table: &RouteTable, state: &RouterState) -> Manifest {
    let mut route_ids: FxHashSet<&str> = state.matches.iter().map(|m| m.route_id.as_str()).collect();

    let mut segments: Vec<&str> = state.pathname.split('/').filter(|s| !s.is_empty()).collect();
    // The full pathname is covered by the current matches
    segments.pop();

    let mut paths = vec![String::from("/")];
    while !segments.is_empty() {
        paths.push(format!("/{}", segments.join("/")));
        segments.pop();
    }

    for path in paths.iter() {
        if let Some(matches) = match_routes(table, path, &state.basename) {
            route_ids.extend(matches.into_iter().filter_map(|m| table.get(&m.route_id)).map(|r| r.id.as_str()));
        }
    }

    let routes = manifest
        .routes
        .iter()
        .filter(|(id, _)| route_ids.contains(id.as_str()))
        .map(|(id, route)| (id.to_owned(), route.to_owned()))
        .collect();

    Manifest {
        routes,
        ..manifest.clone()
    }
}

/// Body of the inline module script that imports the matched route modules before the client entry.
/// Empty (a single space) unless rendering statically.
pub fn route_modules_script(
    manifest: &Manifest,
    table: &RouteTable,
    state: &RouterState,
    ctx: &RenderContext,
    is_static: bool,
) -> Result<String, serde_json::Error> {
    if !is_static {
        return Ok(String::from(" "));
    }

    let fog_of_war = is_fog_of_war_enabled(ctx.is_spa_mode);
    let matches = active_matches(&state.matches, None, ctx);

    let manifest_import = if fog_of_war {
        String::new()
    } else {
        format!("import {}", serde_json::to_string(&manifest.url)?)
    };

    let mut route_imports = Vec::with_capacity(matches.len());
    for (index, m) in matches.iter().enumerate() {
        let Some(route) = manifest.route(&m.route_id) else {
            continue;
        };
        route_imports.push(format!(
            "import * as route{index} from {};",
            serde_json::to_string(route.module.as_str())?
        ));
    }

    let inline_manifest = if fog_of_war {
        format!(
            "window.__reactRouterManifest = {};",
            serde_json::to_string_pretty(&partial_manifest(manifest, table, state))?
        )
    } else {
        String::new()
    };

    let mut route_modules = Vec::with_capacity(matches.len());
    for (index, m) in matches.iter().enumerate() {
        route_modules.push(format!("{}:route{index}", serde_json::to_string(&m.route_id)?));
    }

    Ok(format!(
        "{manifest_import};\n{}\n  {inline_manifest}\n  window.__reactRouterRouteModules = {{{}}};\n\nimport({});",
        route_imports.join("\n"),
        route_modules.join(","),
        serde_json::to_string(&manifest.entry.module)?
    ))
}
