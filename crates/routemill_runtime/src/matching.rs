//! Ranked path matching over a [`RouteTable`].
//!
//! Every route with a path (or an index route) becomes a branch: the chain of routes from the
//! root down to it. Optional segments are exploded into one branch per combination. Branches
//! are ranked by score and the first one matching the whole pathname wins.

use std::cmp::Ordering;

use itertools::Itertools;
use routemill_core::{RouteRecord, RouteTable};
use serde::Serialize;
use smallvec::SmallVec;

use crate::module::Params;

const PARAM_SEGMENT_VALUE: isize = 3;
const INDEX_ROUTE_VALUE: isize = 2;
const EMPTY_SEGMENT_VALUE: isize = 1;
const STATIC_SEGMENT_VALUE: isize = 10;
const SPLAT_PENALTY: isize = -2;
const SPLAT: &str = "*";

/// One matched route, outermost first in a match list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMatch {
    pub route_id: String,
    /// Params accumulated from the outermost route down to this one
    pub params: Params,
    /// Portion of the pathname matched by this route and its ancestors
    pub pathname: String,
    /// Same as `pathname`, without the part matched by a trailing `*`
    pub pathname_base: String,
}

struct BranchMeta<'t> {
    relative_path: String,
    case_sensitive: bool,
    children_index: usize,
    route: &'t RouteRecord,
}

struct Branch<'t> {
    score: isize,
    metas: Vec<BranchMeta<'t>>,
}

impl Branch<'_> {
    fn children_indexes(&self) -> SmallVec<[usize; 4]> {
        self.metas.iter().map(|meta| meta.children_index).collect()
    }
}

/// Matches `pathname` against the routes of `table`.
/// Returns `None` when no branch matches or `pathname` is outside of `basename`.
pub fn match_routes(table: &RouteTable, pathname: &str, basename: &str) -> Option<Vec<RouteMatch>> {
    // Remaining parts are sliced by the length of the matched prefix
    let pathname = join_paths(&[pathname]);
    let pathname = strip_basename(&pathname, basename)?;

    let mut branches = Vec::new();
    let roots: Vec<&RouteRecord> = table.iter().filter(|record| record.is_root()).collect();
    flatten_branches(table, &roots, &mut branches, &[], "");
    rank_branches(&mut branches);

    branches
        .iter()
        .find_map(|branch| match_branch(branch, pathname))
}

fn flatten_branches<'t>(
    table: &'t RouteTable,
    routes: &[&'t RouteRecord],
    branches: &mut Vec<Branch<'t>>,
    parent_metas: &[(String, bool, usize, &'t RouteRecord)],
    parent_path: &str,
) {
    for (index, route) in routes.iter().copied().enumerate() {
        match route.path.as_deref() {
            Some(path) if !path.is_empty() && path.contains('?') => {
                for exploded in explode_optional_segments(path) {
                    flatten_route(table, route, index, Some(exploded), branches, parent_metas, parent_path);
                }
            }
            _ => flatten_route(table, route, index, None, branches, parent_metas, parent_path),
        }
    }
}

fn flatten_route<'t>(
    table: &'t RouteTable,
    route: &'t RouteRecord,
    index: usize,
    relative_path: Option<String>,
    branches: &mut Vec<Branch<'t>>,
    parent_metas: &[(String, bool, usize, &'t RouteRecord)],
    parent_path: &str,
) {
    let mut relative_path =
        relative_path.unwrap_or_else(|| route.path.clone().unwrap_or_default());

    // Absolute child paths repeat the parent path
    if relative_path.starts_with('/') && relative_path.starts_with(parent_path) {
        relative_path = relative_path[parent_path.len()..].to_string();
    }

    let path = join_paths(&[parent_path, &relative_path]);

    let mut metas = parent_metas.to_vec();
    metas.push((
        relative_path,
        route.case_sensitive.unwrap_or(false),
        index,
        route,
    ));

    let children: Vec<&RouteRecord> = table.children_of(&route.id).collect();
    if !children.is_empty() {
        flatten_branches(table, &children, branches, &metas, &path);
    }

    // Pathless layouts only match through their children
    if route.path.is_none() && !route.is_index() {
        return;
    }

    branches.push(Branch {
        score: compute_score(&path, route.is_index()),
        metas: metas
            .into_iter()
            .map(|(relative_path, case_sensitive, children_index, route)| BranchMeta {
                relative_path,
                case_sensitive,
                children_index,
                route,
            })
            .collect(),
    });
}

/// `a/:b?/:c?` becomes `a/b/c`, `a/b`, `a/c` and `a` (with the param syntax kept)
pub fn explode_optional_segments(path: &str) -> Vec<String> {
    let segments: Vec<&str> = path.split('/').collect();
    let Some((first, rest)) = segments.split_first() else {
        return vec![];
    };

    let is_optional = first.ends_with('?');
    let required = first.strip_suffix('?').unwrap_or(*first);

    if rest.is_empty() {
        return if is_optional {
            vec![required.to_string(), String::new()]
        } else {
            vec![required.to_string()]
        };
    }

    let rest_exploded = explode_optional_segments(&rest.join("/"));

    let mut result: Vec<String> = rest_exploded
        .iter()
        .map(|subpath| {
            if subpath.is_empty() {
                required.to_string()
            } else {
                format!("{required}/{subpath}")
            }
        })
        .collect();

    if is_optional {
        result.extend(rest_exploded);
    }

    result
        .into_iter()
        .map(|exploded| {
            if path.starts_with('/') && exploded.is_empty() {
                "/".to_string()
            } else {
                exploded
            }
        })
        .collect()
}

fn is_param_segment(segment: &str) -> bool {
    segment
        .strip_prefix(':')
        .is_some_and(|name| !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-'))
}

pub(crate) fn compute_score(path: &str, index: bool) -> isize {
    let segments: Vec<&str> = path.split('/').collect();
    let mut score = segments.len() as isize;

    if segments.iter().any(|segment| *segment == SPLAT) {
        score += SPLAT_PENALTY;
    }

    if index {
        score += INDEX_ROUTE_VALUE;
    }

    segments
        .iter()
        .filter(|segment| **segment != SPLAT)
        .fold(score, |score, segment| {
            score
                + if is_param_segment(segment) {
                    PARAM_SEGMENT_VALUE
                } else if segment.is_empty() {
                    EMPTY_SEGMENT_VALUE
                } else {
                    STATIC_SEGMENT_VALUE
                }
        })
}

/// Higher score first; siblings with equal score keep their authored order
fn rank_branches(branches: &mut [Branch<'_>]) {
    branches.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| compare_indexes(&a.children_indexes(), &b.children_indexes()))
    });
}

fn compare_indexes(a: &[usize], b: &[usize]) -> Ordering {
    let siblings = a.len() == b.len() && a[..a.len().saturating_sub(1)] == b[..b.len().saturating_sub(1)];

    match (siblings, a.last(), b.last()) {
        (true, Some(a), Some(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

fn match_branch(branch: &Branch<'_>, pathname: &str) -> Option<Vec<RouteMatch>> {
    let mut params = Params::new();
    let mut matched_pathname = String::from("/");
    let mut matches = Vec::with_capacity(branch.metas.len());

    for (idx, meta) in branch.metas.iter().enumerate() {
        let end = idx == branch.metas.len() - 1;
        let remaining = if matched_pathname == "/" {
            pathname
        } else {
            match pathname.get(matched_pathname.len()..).unwrap_or_default() {
                "" => "/",
                rest => rest,
            }
        };

        let matched = match_path(&meta.relative_path, meta.case_sensitive, end, remaining)?;
        params.extend(matched.params);

        matches.push(RouteMatch {
            route_id: meta.route.id.to_owned(),
            params: params.clone(),
            pathname: join_paths(&[&matched_pathname, &matched.pathname]),
            pathname_base: normalize_pathname(&join_paths(&[
                &matched_pathname,
                &matched.pathname_base,
            ])),
        });

        if matched.pathname_base != "/" {
            matched_pathname = join_paths(&[&matched_pathname, &matched.pathname_base]);
        }
    }

    Some(matches)
}

struct PathMatch {
    params: Params,
    pathname: String,
    pathname_base: String,
}

/// Matches one route pattern against the start of `pathname`.
/// With `end`, the whole pathname must be consumed.
fn match_path(pattern: &str, case_sensitive: bool, end: bool, pathname: &str) -> Option<PathMatch> {
    let mut pattern_segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let splat = pattern_segments.last() == Some(&SPLAT);
    if splat {
        pattern_segments.pop();
    }

    let path_segments: Vec<&str> = pathname.split('/').filter(|s| !s.is_empty()).collect();
    if path_segments.len() < pattern_segments.len() {
        return None;
    }

    let mut params = Params::new();
    for (pattern_segment, path_segment) in pattern_segments.iter().zip(path_segments.iter()) {
        if let Some(name) = pattern_segment.strip_prefix(':') {
            params.insert(name.to_string(), path_segment.to_string());
            continue;
        }

        let equal = if case_sensitive {
            pattern_segment == path_segment
        } else {
            pattern_segment.eq_ignore_ascii_case(path_segment)
        };
        if !equal {
            return None;
        }
    }

    let consumed = pattern_segments.len();
    let rest = &path_segments[consumed..];
    let base = format!("/{}", path_segments[..consumed].iter().join("/"));

    if splat {
        params.insert(SPLAT.to_string(), rest.iter().join("/"));
        return Some(PathMatch {
            params,
            pathname: format!("/{}", path_segments.iter().join("/")),
            pathname_base: base,
        });
    }

    if end && !rest.is_empty() {
        return None;
    }

    Some(PathMatch {
        params,
        pathname: base.to_owned(),
        pathname_base: base,
    })
}

/// Removes `basename` from the start of `pathname`, case-insensitively
pub fn strip_basename<'p>(pathname: &'p str, basename: &str) -> Option<&'p str> {
    if basename.is_empty() || basename == "/" {
        return Some(pathname);
    }

    let prefixed = pathname
        .get(..basename.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(basename));
    if !prefixed {
        return None;
    }

    let start = if basename.ends_with('/') {
        basename.len() - 1
    } else {
        basename.len()
    };

    match pathname[start..].chars().next() {
        Some(next) if next != '/' => None,
        None => Some("/"),
        Some(_) => Some(&pathname[start..]),
    }
}

/// Joins with `/` and collapses repeated slashes
fn join_paths(paths: &[&str]) -> String {
    let joined = paths.iter().join("/");
    let mut result = String::with_capacity(joined.len());
    for c in joined.chars() {
        if c == '/' && result.ends_with('/') {
            continue;
        }
        result.push(c);
    }
    result
}

fn normalize_pathname(pathname: &str) -> String {
    let trimmed = pathname.trim_end_matches('/');
    let trimmed = trimmed.trim_start_matches('/');
    format!("/{trimmed}")
}
