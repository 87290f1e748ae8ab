use fxhash::FxHashMap;
use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};

/// Id of the synthesized root route
pub const ROOT_ROUTE_ID: &str = "root";

/// One entry of the authored (nested) route configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteConfigEntry {
    /// Explicit id, otherwise derived from `file`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Route module path, absolute or relative to the app directory
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_sensitive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<RouteConfigEntry>>,
}

impl RouteConfigEntry {
    pub fn new(file: impl Into<String>) -> Self {
        RouteConfigEntry {
            file: file.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn as_index(mut self) -> Self {
        self.index = Some(true);
        self
    }

    pub fn with_children(mut self, children: Vec<RouteConfigEntry>) -> Self {
        self.children = Some(children);
        self
    }
}

/// A route after flattening the configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRecord {
    pub id: String,
    /// `None` only for the root route
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Relative to the app directory
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_sensitive: Option<bool>,
}

impl RouteRecord {
    /// The synthesized root route, always `{ id: "root", path: "" }`
    pub fn root(file: impl Into<String>) -> Self {
        RouteRecord {
            id: ROOT_ROUTE_ID.to_string(),
            parent_id: None,
            file: file.into(),
            path: Some(String::new()),
            index: None,
            case_sensitive: None,
        }
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    #[inline]
    pub fn is_index(&self) -> bool {
        self.index.unwrap_or(false)
    }

    /// Route file without its extension, which is also the name of its client chunk
    #[inline]
    pub fn chunk_name(&self) -> &str {
        strip_file_extension(&self.file)
    }
}

/// `routes/home.tsx` -> `routes/home`. Only an ASCII alphanumeric extension is stripped.
pub fn strip_file_extension(file: &str) -> &str {
    let Some(dot) = file.rfind('.') else {
        return file;
    };

    let ext = &file[dot + 1..];
    if !ext.is_empty() && ext.bytes().all(|b| b.is_ascii_alphanumeric()) {
        &file[..dot]
    } else {
        file
    }
}

/// Flat mapping `id -> RouteRecord` which keeps insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    records: Vec<RouteRecord>,
    by_id: FxHashMap<String, usize>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the record, giving it back if its id is already taken
    pub fn insert(&mut self, record: RouteRecord) -> Result<(), RouteRecord> {
        if self.by_id.contains_key(&record.id) {
            return Err(record);
        }

        self.by_id.insert(record.id.to_owned(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    #[inline]
    pub fn get(&self, id: &str) -> Option<&RouteRecord> {
        self.by_id.get(id).map(|idx| &self.records[*idx])
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Position of the route in insertion order
    #[inline]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RouteRecord> {
        self.records.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|record| record.id.as_str())
    }

    pub fn children_of<'t>(&'t self, parent_id: &'t str) -> impl Iterator<Item = &'t RouteRecord> {
        self.records
            .iter()
            .filter(move |record| record.parent_id.as_deref() == Some(parent_id))
    }

    /// Walks `parent_id` links from `id` up to the root, `id` first.
    /// Stops early on a dangling link or a cycle.
    pub fn ancestry(&self, id: &str) -> Vec<&RouteRecord> {
        let mut result = Vec::new();
        let mut current = self.get(id);

        while let Some(record) = current {
            if result.len() > self.records.len() {
                break;
            }
            result.push(record);
            current = record.parent_id.as_deref().and_then(|parent| self.get(parent));
        }

        result
    }
}

impl<'t> IntoIterator for &'t RouteTable {
    type Item = &'t RouteRecord;
    type IntoIter = std::slice::Iter<'t, RouteRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Serialize for RouteTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.records.len()))?;
        for record in self.records.iter() {
            map.serialize_entry(&record.id, record)?;
        }
        map.end()
    }
}
