// Copyright 2025 Loadchain Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Configuration contract: document shapes, validation, and normalization.
//!
//! A configuration module hands the engine a loosely typed
//! [`ConfigValue`] document. The contract:
//!
//! - the document is a record containing a `loaders` key;
//! - `loaders` is an ordered sequence (configuration order is priority
//!   order);
//! - every element is itself a record, in one of two forms:
//!   - *direct form* — operation names mapping to hook implementations;
//!   - *options form* — `{ options: <data>, loader: <record of hooks taking
//!     options> }`.
//!
//! Both forms normalize immediately into [`LoaderEntry`], binding the
//! options value into the hook callable, so downstream code never
//! re-inspects entry shape and a direct-form hook never sees an options
//! argument.
//!
//! Violations of the contract are fatal at bootstrap; the error identifies
//! the offending index and the expected shape.

use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::ops::{HookFn, HookOp, HookWithOptionsFn, LoadOp, ResolveOp};
use crate::{CONFIG_ENV_VAR, DEFAULT_CONFIG_FILE};

/// Hook types of the original host contract that are inherently synchronous
/// and therefore unsupportable on top of the asynchronous bootstrap.
/// Declaring one is a configuration error, never a silent no-op.
const SYNCHRONOUS_HOOKS: &[&str] = &["global_preload"];

/// A loosely typed configuration document, as produced by a configuration
/// module.
///
/// Hook implementations are live callables, so documents cannot be
/// deserialized from plain data; configuration modules build them in code
/// (see [`LoaderBuilder`]). Shape is checked once, during bootstrap, by
/// [`LoaderConfig::from_document`].
#[derive(Clone)]
pub enum ConfigValue {
    /// A key/value record.
    Record(BTreeMap<String, ConfigValue>),
    /// An ordered sequence.
    Sequence(Vec<ConfigValue>),
    /// Plain data (options payloads and the like).
    Data(Value),
    /// A resolve hook (direct form).
    Resolve(HookFn<ResolveOp>),
    /// A load hook (direct form).
    Load(HookFn<LoadOp>),
    /// A resolve hook taking options (options form).
    ResolveWithOptions(HookWithOptionsFn<ResolveOp>),
    /// A load hook taking options (options form).
    LoadWithOptions(HookWithOptionsFn<LoadOp>),
}

impl ConfigValue {
    /// Build a record from key/value pairs.
    pub fn record<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ConfigValue)>,
    {
        Self::Record(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        )
    }

    /// Build an ordered sequence.
    pub fn sequence<I>(items: I) -> Self
    where
        I: IntoIterator<Item = ConfigValue>,
    {
        Self::Sequence(items.into_iter().collect())
    }

    /// Build a plain data value.
    pub fn data(value: Value) -> Self {
        Self::Data(value)
    }

    /// Build a well-formed configuration document from loader entries.
    pub fn loaders<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = ConfigValue>,
    {
        Self::record([("loaders", Self::sequence(entries))])
    }

    /// The shape of this value, for diagnostics.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Record(_) => ValueKind::Record,
            Self::Sequence(_) => ValueKind::Sequence,
            Self::Data(_) => ValueKind::Data,
            Self::Resolve(_) => ValueKind::ResolveHook,
            Self::Load(_) => ValueKind::LoadHook,
            Self::ResolveWithOptions(_) => ValueKind::ResolveHookWithOptions,
            Self::LoadWithOptions(_) => ValueKind::LoadHookWithOptions,
        }
    }
}

impl fmt::Debug for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Record(fields) => f.debug_map().entries(fields.iter()).finish(),
            Self::Sequence(items) => f.debug_list().entries(items.iter()).finish(),
            Self::Data(value) => value.fmt(f),
            other => write!(f, "<{}>", other.kind()),
        }
    }
}

/// Shape of a [`ConfigValue`], used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Record,
    Sequence,
    Data,
    ResolveHook,
    LoadHook,
    ResolveHookWithOptions,
    LoadHookWithOptions,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Record => "a record",
            Self::Sequence => "a sequence",
            Self::Data => "plain data",
            Self::ResolveHook => "a resolve hook",
            Self::LoadHook => "a load hook",
            Self::ResolveHookWithOptions => "a resolve hook taking options",
            Self::LoadHookWithOptions => "a load hook taking options",
        };
        f.write_str(name)
    }
}

/// Errors that make a fetched configuration document unusable.
///
/// These are the fatal class: a malformed document cannot be safely
/// partially composed, so the bootstrap path prints the diagnostic and
/// terminates the process. Contrast with a failed fetch, which merely falls
/// back to an empty configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("loader configuration must be a record, found {found}")]
    DocumentShape { found: ValueKind },

    #[error("loader configuration does not contain a `loaders` sequence")]
    MissingLoaders,

    #[error("`loaders` must be an ordered sequence, found {found}")]
    LoadersShape { found: ValueKind },

    #[error("invalid loader at index {index}: expected a record, found {found}")]
    EntryShape { index: usize, found: ValueKind },

    #[error("invalid loader at index {index}: `options` must be plain data, found {found}")]
    OptionsShape { index: usize, found: ValueKind },

    #[error(
        "invalid loader at index {index}: `loader` must be a record of hook \
         implementations, found {found}"
    )]
    LoaderBlockShape { index: usize, found: ValueKind },

    #[error("invalid loader at index {index}: `{name}` must be {expected}, found {found}")]
    HookShape {
        index: usize,
        name: String,
        expected: &'static str,
        found: ValueKind,
    },

    #[error(
        "loader at index {index} declares `{name}`, a synchronous hook type \
         that is not supported"
    )]
    UnsupportedHook { index: usize, name: String },
}

/// A single loader's contribution, normalized from either entry form.
///
/// Options-form hooks arrive here with their options value already bound.
#[derive(Clone, Default)]
pub struct LoaderEntry {
    pub resolve: Option<HookFn<ResolveOp>>,
    pub load: Option<HookFn<LoadOp>>,
}

/// A validated configuration: the ordered loader list.
#[derive(Clone, Default)]
pub struct LoaderConfig {
    /// Loaders in declaration order. Earlier entries wrap later ones.
    pub loaders: Vec<LoaderEntry>,
}

impl std::fmt::Debug for LoaderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderConfig")
            .field("loaders", &self.loaders.len())
            .finish()
    }
}

impl LoaderConfig {
    /// The empty configuration: every operation falls through to the host
    /// default.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Validate a fetched document against the configuration contract and
    /// normalize its entries.
    pub fn from_document(document: ConfigValue) -> Result<Self, ConfigError> {
        let ConfigValue::Record(mut root) = document else {
            return Err(ConfigError::DocumentShape {
                found: document.kind(),
            });
        };

        let Some(loaders_value) = root.remove("loaders") else {
            return Err(ConfigError::MissingLoaders);
        };

        let ConfigValue::Sequence(entries) = loaders_value else {
            return Err(ConfigError::LoadersShape {
                found: loaders_value.kind(),
            });
        };

        let mut loaders = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            loaders.push(normalize_entry(index, entry)?);
        }

        Ok(Self { loaders })
    }
}

fn normalize_entry(index: usize, entry: ConfigValue) -> Result<LoaderEntry, ConfigError> {
    let ConfigValue::Record(mut fields) = entry else {
        return Err(ConfigError::EntryShape {
            index,
            found: entry.kind(),
        });
    };

    match fields.remove("loader") {
        Some(loader_block) => normalize_options_form(index, fields, loader_block),
        None => normalize_direct_form(index, fields),
    }
}

fn normalize_direct_form(
    index: usize,
    fields: BTreeMap<String, ConfigValue>,
) -> Result<LoaderEntry, ConfigError> {
    let mut entry = LoaderEntry::default();
    for (name, value) in fields {
        if name == "resolve" {
            match value {
                ConfigValue::Resolve(hook) => entry.resolve = Some(hook),
                other => {
                    return Err(ConfigError::HookShape {
                        index,
                        name,
                        expected: "a resolve hook",
                        found: other.kind(),
                    });
                }
            }
        } else if name == "load" {
            match value {
                ConfigValue::Load(hook) => entry.load = Some(hook),
                other => {
                    return Err(ConfigError::HookShape {
                        index,
                        name,
                        expected: "a load hook",
                        found: other.kind(),
                    });
                }
            }
        } else if SYNCHRONOUS_HOOKS.contains(&name.as_str()) {
            return Err(ConfigError::UnsupportedHook { index, name });
        } else {
            tracing::debug!(index, key = name.as_str(), "ignoring unknown loader entry key");
        }
    }
    Ok(entry)
}

fn normalize_options_form(
    index: usize,
    mut fields: BTreeMap<String, ConfigValue>,
    loader_block: ConfigValue,
) -> Result<LoaderEntry, ConfigError> {
    // An absent options key still binds a value, so options-form hooks
    // receive an options argument on every invocation.
    let options = match fields.remove("options") {
        None => Arc::new(Value::Null),
        Some(ConfigValue::Data(value)) => Arc::new(value),
        Some(other) => {
            return Err(ConfigError::OptionsShape {
                index,
                found: other.kind(),
            });
        }
    };

    for key in fields.keys() {
        tracing::debug!(index, key = key.as_str(), "ignoring unknown loader entry key");
    }

    let ConfigValue::Record(hooks) = loader_block else {
        return Err(ConfigError::LoaderBlockShape {
            index,
            found: loader_block.kind(),
        });
    };

    let mut entry = LoaderEntry::default();
    for (name, value) in hooks {
        if name == "resolve" {
            match value {
                ConfigValue::ResolveWithOptions(hook) => {
                    entry.resolve = Some(bind_options(hook, Arc::clone(&options)));
                }
                other => {
                    return Err(ConfigError::HookShape {
                        index,
                        name,
                        expected: "a resolve hook taking options",
                        found: other.kind(),
                    });
                }
            }
        } else if name == "load" {
            match value {
                ConfigValue::LoadWithOptions(hook) => {
                    entry.load = Some(bind_options(hook, Arc::clone(&options)));
                }
                other => {
                    return Err(ConfigError::HookShape {
                        index,
                        name,
                        expected: "a load hook taking options",
                        found: other.kind(),
                    });
                }
            }
        } else if SYNCHRONOUS_HOOKS.contains(&name.as_str()) {
            return Err(ConfigError::UnsupportedHook { index, name });
        } else {
            tracing::debug!(index, key = name.as_str(), "ignoring unknown loader hook key");
        }
    }
    Ok(entry)
}

/// Wrap a with-options hook so its entry's options value rides along as the
/// trailing argument of every invocation.
fn bind_options<O: HookOp>(hook: HookWithOptionsFn<O>, options: Arc<Value>) -> HookFn<O> {
    Arc::new(move |request, next| hook(request, next, Arc::clone(&options)))
}

/// Builder for one well-formed loader entry document.
///
/// Produces the direct form unless [`options`](Self::options) or a
/// with-options hook is used, in which case the options form is emitted. A
/// plain hook added to an options-form entry is adapted to ignore the
/// options argument.
#[derive(Default)]
pub struct LoaderBuilder {
    resolve: Option<HookFn<ResolveOp>>,
    load: Option<HookFn<LoadOp>>,
    resolve_with_options: Option<HookWithOptionsFn<ResolveOp>>,
    load_with_options: Option<HookWithOptionsFn<LoadOp>>,
    options: Option<Value>,
}

impl LoaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contribute a resolve hook.
    pub fn resolve(mut self, hook: HookFn<ResolveOp>) -> Self {
        self.resolve = Some(hook);
        self
    }

    /// Contribute a load hook.
    pub fn load(mut self, hook: HookFn<LoadOp>) -> Self {
        self.load = Some(hook);
        self
    }

    /// Declare this loader's options value.
    pub fn options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }

    /// Contribute a resolve hook that receives the options value.
    pub fn resolve_with_options(mut self, hook: HookWithOptionsFn<ResolveOp>) -> Self {
        self.resolve_with_options = Some(hook);
        self
    }

    /// Contribute a load hook that receives the options value.
    pub fn load_with_options(mut self, hook: HookWithOptionsFn<LoadOp>) -> Self {
        self.load_with_options = Some(hook);
        self
    }

    /// Build the loader entry document.
    pub fn build(self) -> ConfigValue {
        let options_form = self.options.is_some()
            || self.resolve_with_options.is_some()
            || self.load_with_options.is_some();

        if !options_form {
            let mut fields = BTreeMap::new();
            if let Some(hook) = self.resolve {
                fields.insert("resolve".to_string(), ConfigValue::Resolve(hook));
            }
            if let Some(hook) = self.load {
                fields.insert("load".to_string(), ConfigValue::Load(hook));
            }
            return ConfigValue::Record(fields);
        }

        let mut hooks = BTreeMap::new();
        match (self.resolve_with_options, self.resolve) {
            (Some(hook), _) => {
                hooks.insert("resolve".to_string(), ConfigValue::ResolveWithOptions(hook));
            }
            (None, Some(plain)) => {
                hooks.insert(
                    "resolve".to_string(),
                    ConfigValue::ResolveWithOptions(ignore_options(plain)),
                );
            }
            (None, None) => {}
        }
        match (self.load_with_options, self.load) {
            (Some(hook), _) => {
                hooks.insert("load".to_string(), ConfigValue::LoadWithOptions(hook));
            }
            (None, Some(plain)) => {
                hooks.insert(
                    "load".to_string(),
                    ConfigValue::LoadWithOptions(ignore_options(plain)),
                );
            }
            (None, None) => {}
        }

        ConfigValue::record([
            (
                "options",
                ConfigValue::Data(self.options.unwrap_or(Value::Null)),
            ),
            ("loader", ConfigValue::Record(hooks)),
        ])
    }
}

fn ignore_options<O: HookOp>(hook: HookFn<O>) -> HookWithOptionsFn<O> {
    Arc::new(move |request, next, _options| hook(request, next))
}

/// Location of the configuration module: the [`CONFIG_ENV_VAR`] override or
/// the conventional [`DEFAULT_CONFIG_FILE`], resolved against the working
/// directory.
pub fn config_path() -> PathBuf {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    config_path_from(env::var_os(CONFIG_ENV_VAR), &cwd)
}

/// Pure form of [`config_path`]: absolute overrides are used verbatim,
/// relative ones resolve against `cwd`.
pub fn config_path_from(override_value: Option<OsString>, cwd: &Path) -> PathBuf {
    match override_value {
        Some(value) if !value.is_empty() => cwd.join(PathBuf::from(value)),
        _ => cwd.join(DEFAULT_CONFIG_FILE),
    }
}
