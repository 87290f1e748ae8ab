//! Path and URL helpers. Paths are handled as `/`-separated strings,
//! because they end up in generated code and manifests.

use std::path::Path;

use itertools::Itertools;
pub use routemill_core::strip_file_extension;

/// Joins two URL parts with exactly one slash at the seam.
/// An empty `relative_url` gives back `base_url`.
pub fn combine_urls(base_url: &str, relative_url: &str) -> String {
    if relative_url.is_empty() {
        return base_url.to_string();
    }

    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        relative_url.trim_start_matches('/')
    )
}

/// Id of a route which has no explicit id
pub fn create_route_id(file: &str) -> String {
    normalize_path(strip_file_extension(file))
}

/// Uses `/` as the separator, removes `.` and empty segments and resolves `..` where possible.
/// A leading `/` and leading `..` segments are kept.
pub fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let is_absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if is_absolute => {}
                _ => segments.push(".."),
            },
            _ => segments.push(segment),
        }
    }

    let joined = segments.iter().join("/");
    match (is_absolute, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Path of `to` relative to the `from` directory, both normalized first.
/// When only one of them is absolute there is no common base and `to` is returned normalized.
pub fn relative_path(from: &str, to: &str) -> String {
    let from = normalize_path(from);
    let to = normalize_path(to);

    if is_absolute(&from) != is_absolute(&to) {
        return to;
    }

    let from_segments = from.split('/').filter(|s| !s.is_empty() && *s != ".").collect_vec();
    let to_segments = to.split('/').filter(|s| !s.is_empty() && *s != ".").collect_vec();

    let common = from_segments
        .iter()
        .zip(to_segments.iter())
        .take_while(|(a, b)| a == b)
        .count();

    std::iter::repeat("..")
        .take(from_segments.len() - common)
        .chain(to_segments[common..].iter().copied())
        .join("/")
}

#[inline]
pub fn is_absolute(path: &str) -> bool {
    path.starts_with('/') || Path::new(path).is_absolute()
}

/// `app_directory` joined with `file` unless `file` is already absolute
pub fn resolve_path(app_directory: &str, file: &str) -> String {
    if is_absolute(file) {
        normalize_path(file)
    } else {
        normalize_path(&format!("{app_directory}/{file}"))
    }
}
