use routemill_core::{RouteConfigEntry, RouteRecord, RouteTable, ROOT_ROUTE_ID};
use tracing::info;

use crate::{
    error::RouteTreeError,
    paths::{create_route_id, is_absolute, relative_path},
};

/// Flattens the authored route configuration below `root_id`.
///
/// Entries are visited depth-first, parents before children, siblings in authored order.
/// Absolute files are made relative to `app_directory`.
pub fn flatten_routes(
    root_id: &str,
    app_directory: &str,
    entries: &[RouteConfigEntry],
) -> Result<RouteTable, RouteTreeError> {
    let mut table = RouteTable::new();
    for entry in entries.iter() {
        walk(&mut table, entry, root_id, app_directory)?;
    }
    Ok(table)
}

/// Builds the full route table: the synthesized root route followed by the configured routes
pub fn build_route_table(
    root_file: &str,
    app_directory: &str,
    entries: &[RouteConfigEntry],
) -> Result<RouteTable, RouteTreeError> {
    let mut table = RouteTable::new();

    let root_file = if is_absolute(root_file) {
        relative_path(app_directory, root_file)
    } else {
        root_file.to_string()
    };
    if let Err(root) = table.insert(RouteRecord::root(root_file)) {
        return Err(RouteTreeError::DuplicateRouteId { id: root.id });
    }

    for entry in entries.iter() {
        walk(&mut table, entry, ROOT_ROUTE_ID, app_directory)?;
    }

    info!(routes = table.len(), "built route table");

    Ok(table)
}

fn walk(
    table: &mut RouteTable,
    entry: &RouteConfigEntry,
    parent_id: &str,
    app_directory: &str,
) -> Result<(), RouteTreeError> {
    let id = match entry.id {
        Some(ref id) => id.to_owned(),
        None => create_route_id(&entry.file),
    };

    let file = if is_absolute(&entry.file) {
        relative_path(app_directory, &entry.file)
    } else {
        entry.file.to_owned()
    };

    let record = RouteRecord {
        id: id.to_owned(),
        parent_id: Some(parent_id.to_string()),
        file,
        path: entry.path.to_owned(),
        index: entry.index,
        case_sensitive: entry.case_sensitive,
    };

    if let Err(duplicate) = table.insert(record) {
        return Err(RouteTreeError::DuplicateRouteId { id: duplicate.id });
    }

    if let Some(ref children) = entry.children {
        for child in children.iter() {
            walk(table, child, &id, app_directory)?;
        }
    }

    Ok(())
}
