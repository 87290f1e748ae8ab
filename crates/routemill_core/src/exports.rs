use std::collections::BTreeSet;

use phf::phf_set;
use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};

/// Route exports which must never reach the browser
pub const SERVER_ONLY_ROUTE_EXPORTS: &[&str] = &["loader", "action", "headers"];

/// Named component exports which get routing context injected,
/// in addition to the default export
pub static NAMED_COMPONENT_EXPORTS: phf::Set<&'static str> = phf_set! {
    "HydrateFallback",
    "ErrorBoundary",
};

#[inline]
pub fn is_named_component_export(name: &str) -> bool {
    NAMED_COMPONENT_EXPORTS.contains(name)
}

/// Execution environment a route module is compiled for
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, AsRefStr, Display, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum Environment {
    /// Browser bundle (`web` in the host build)
    #[default]
    Client,
    /// Server bundle (`node` in the host build)
    Server,
}

impl Environment {
    /// Export names stripped from a route module compiled for this environment.
    /// The server bundle keeps everything.
    pub fn exports_to_remove(self) -> &'static [&'static str] {
        match self {
            Environment::Client => SERVER_ONLY_ROUTE_EXPORTS,
            Environment::Server => &[],
        }
    }
}

/// Names exported by a route module, `default` included
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExportSet(BTreeSet<String>);

impl ExportSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.0.insert(name.into())
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn has_loader(&self) -> bool {
        self.contains("loader")
    }

    pub fn has_action(&self) -> bool {
        self.contains("action")
    }

    pub fn has_client_loader(&self) -> bool {
        self.contains("clientLoader")
    }

    pub fn has_client_action(&self) -> bool {
        self.contains("clientAction")
    }

    pub fn has_error_boundary(&self) -> bool {
        self.contains("ErrorBoundary")
    }
}

impl<S: Into<String>> FromIterator<S> for ExportSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        ExportSet(iter.into_iter().map(Into::into).collect())
    }
}
