//! Asset lists of the client compilation, read from the bundler statistics.

use fxhash::FxHashMap;
use serde::Deserialize;

use crate::paths::combine_urls;

/// Only the parts of the statistics the manifest needs
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsCompilation {
    #[serde(default)]
    public_path: Option<String>,
    #[serde(default)]
    named_chunk_groups: FxHashMap<String, StatsChunkGroup>,
}

#[derive(Debug, Default, Deserialize)]
struct StatsChunkGroup {
    #[serde(default)]
    assets: Vec<StatsAsset>,
}

#[derive(Debug, Deserialize)]
struct StatsAsset {
    name: String,
}

/// Script and stylesheet URLs of a named chunk group, in emission order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkAssets {
    pub scripts: Vec<String>,
    pub styles: Vec<String>,
}

impl ChunkAssets {
    /// The script which evaluates the chunk itself. Bundlers emit it last.
    pub fn module(&self) -> Option<&str> {
        self.scripts.last().map(String::as_str)
    }

    /// Scripts the chunk depends on
    pub fn imports(&self) -> &[String] {
        match self.scripts.split_last() {
            Some((_, imports)) => imports,
            None => &[],
        }
    }
}

/// Asset URLs keyed by chunk name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetStats {
    chunks: FxHashMap<String, ChunkAssets>,
}

impl AssetStats {
    /// Reads the JSON statistics of a compilation.
    /// Asset names are turned into URLs under the compilation's public path, or `fallback_public_path`.
    pub fn from_json(json: &str, fallback_public_path: &str) -> Result<AssetStats, serde_json::Error> {
        let compilation: StatsCompilation = serde_json::from_str(json)?;
        let public_path = match compilation.public_path {
            Some(ref public_path) if public_path != "auto" => public_path.as_str(),
            _ => fallback_public_path,
        };

        let chunks = compilation
            .named_chunk_groups
            .into_iter()
            .map(|(name, group)| {
                let mut assets = ChunkAssets::default();
                for asset in group.assets {
                    let url = combine_urls(public_path, &asset.name);
                    let path = asset.name.split('?').next().unwrap_or_default();

                    if path.ends_with(".css") {
                        assets.styles.push(url);
                    } else if path.ends_with(".js") || path.ends_with(".mjs") {
                        assets.scripts.push(url);
                    }
                }
                (name, assets)
            })
            .collect();

        Ok(AssetStats { chunks })
    }

    pub fn insert(&mut self, chunk_name: impl Into<String>, assets: ChunkAssets) {
        self.chunks.insert(chunk_name.into(), assets);
    }

    #[inline]
    pub fn chunk(&self, chunk_name: &str) -> Option<&ChunkAssets> {
        self.chunks.get(chunk_name)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
