// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Layered configuration: a base TOML file, a site TOML file and a per-run
//! JSON file are merged in that order. Later layers override scalar leaves and
//! extend tables, so a run file only has to name the knobs it changes
//! (`{"robust": {"augmax": {"nb_iter": 20}}}`).

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Identifies which file contributed a layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigLayer {
    Base,
    Site,
    Run,
}

/// Paths of the layers to merge. Missing files are skipped.
#[derive(Clone, Debug, Default)]
pub struct ConfigLayering {
    pub base: Option<PathBuf>,
    pub site: Option<PathBuf>,
    pub run: Option<PathBuf>,
}

impl ConfigLayering {
    /// Discovers layers from `SPIRAL_CONFIG_*` variables, falling back to
    /// `base.toml`, `site.toml` and `run.json` under the config root.
    pub fn discover() -> Self {
        let root = std::env::var("SPIRAL_CONFIG_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_root());
        let pick = |var: &str, file: &str| {
            std::env::var(var)
                .map(PathBuf::from)
                .ok()
                .or_else(|| Some(root.join(file)))
                .filter(|path| path.exists())
        };
        Self {
            base: pick("SPIRAL_CONFIG_BASE", "base.toml"),
            site: pick("SPIRAL_CONFIG_SITE", "site.toml"),
            run: pick("SPIRAL_CONFIG_RUN", "run.json"),
        }
    }

    /// Uses the conventional file names under `root` without consulting the environment.
    pub fn in_dir<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        let existing = |file: &str| Some(root.join(file)).filter(|path| path.exists());
        Self {
            base: existing("base.toml"),
            site: existing("site.toml"),
            run: existing("run.json"),
        }
    }

    pub fn with_base<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.base = Some(path.into());
        self
    }

    pub fn with_site<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.site = Some(path.into());
        self
    }

    pub fn with_run<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.run = Some(path.into());
        self
    }
}

fn default_root() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => {
            let config_dir = home.join(".spiraltorch").join("config");
            if config_dir.exists() {
                config_dir
            } else {
                home.join(".spiraltorch")
            }
        }
        None => PathBuf::from("."),
    }
}

/// Merged view over every layer that was present on disk.
#[derive(Clone, Debug)]
pub struct LayeredConfig {
    value: Value,
    applied: Vec<(ConfigLayer, PathBuf)>,
}

impl Default for LayeredConfig {
    fn default() -> Self {
        Self::from_value(Value::Object(Default::default()))
    }
}

impl LayeredConfig {
    /// Loads and merges base → site → run.
    pub fn load(layering: ConfigLayering) -> Result<Self, LayeredConfigError> {
        let mut merged = Value::Object(Default::default());
        let mut applied = Vec::new();
        let layers = [
            (ConfigLayer::Base, layering.base),
            (ConfigLayer::Site, layering.site),
            (ConfigLayer::Run, layering.run),
        ];
        for (layer, path) in layers {
            let Some(path) = path else { continue };
            let loaded = match layer {
                ConfigLayer::Run => load_json(&path)?,
                ConfigLayer::Base | ConfigLayer::Site => load_toml(&path)?,
            };
            if let Some(value) = loaded {
                merge(&mut merged, &value);
                applied.push((layer, path));
            }
        }
        Ok(Self {
            value: merged,
            applied,
        })
    }

    /// Wraps an in-memory value, typically for tests or embedding.
    pub fn from_value(value: Value) -> Self {
        Self {
            value,
            applied: Vec::new(),
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Layers that were found and merged, in merge order.
    pub fn applied_layers(&self) -> &[(ConfigLayer, PathBuf)] {
        &self.applied
    }

    /// Deserialises the table found by walking `path`. Returns `Ok(None)` when
    /// any key along the path is absent.
    pub fn section<T>(&self, path: &[&str]) -> Result<Option<T>, LayeredConfigError>
    where
        T: DeserializeOwned,
    {
        let mut node = &self.value;
        for key in path {
            match node.get(*key) {
                Some(child) => node = child,
                None => return Ok(None),
            }
        }
        serde_json::from_value(node.clone())
            .map(Some)
            .map_err(|source| LayeredConfigError::Section {
                section: path.join("."),
                source,
            })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LayeredConfigError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse TOML {path:?}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to parse JSON {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("section `{section}` does not match the expected schema: {source}")]
    Section {
        section: String,
        #[source]
        source: serde_json::Error,
    },
}

fn read(path: &Path) -> Result<Option<String>, LayeredConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    fs::read_to_string(path)
        .map(Some)
        .map_err(|source| LayeredConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn load_toml(path: &Path) -> Result<Option<Value>, LayeredConfigError> {
    let Some(text) = read(path)? else {
        return Ok(None);
    };
    let value: toml::Value = toml::from_str(&text).map_err(|source| LayeredConfigError::Toml {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::to_value(value)
        .map(Some)
        .map_err(|source| LayeredConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
}

fn load_json(path: &Path) -> Result<Option<Value>, LayeredConfigError> {
    let Some(text) = read(path)? else {
        return Ok(None);
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| LayeredConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
}

fn merge(dest: &mut Value, src: &Value) {
    match (dest, src) {
        (Value::Object(dest_map), Value::Object(src_map)) => {
            for (key, value) in src_map {
                match dest_map.get_mut(key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        dest_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (slot, value) => *slot = value.clone(),
    }
}
