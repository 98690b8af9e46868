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

//! Loadchain — composable module-loader hooks
//!
//! Loadchain lets independently authored loader plugins cooperatively
//! intercept the two lifecycle operations of a host module system — resolving
//! a specifier to a canonical URL, and loading the source behind a URL —
//! without any plugin knowing about the others.
//!
//! # Architecture
//!
//! An ordered `loaders` sequence from a configuration module is validated
//! once and folded into one chain-of-responsibility pipeline per operation.
//! Each plugin receives the operation's request plus a [`Next`](ops::Next)
//! continuation representing "the rest of the pipeline"; the plugin cannot
//! tell whether `next` is another plugin or the host's built-in behavior.
//!
//! - [`config`] — the configuration contract: document shape validation and
//!   normalization of the two loader entry forms (direct, and
//!   options-carrying).
//! - [`chain`] — the chain composer: ordered hooks + a call-time default →
//!   one composed hook.
//! - [`registry`] — one composed hook per supported operation.
//! - [`bootstrap`] — the lazy, memoized, re-entrancy-safe configuration
//!   bootstrap.
//! - [`facade`] — the two entry points the host calls.
//!
//! The bootstrap is self-referential: fetching the configuration module goes
//! through the very hooks being configured. [`Bootstrap::is_loading`] is a
//! synchronously checkable flag that lets invocations landing inside the
//! bootstrap window fall back to the host default instead of deadlocking on
//! the in-flight fetch.
//!
//! Hook types whose host contract is synchronous (the original module
//! systems' preload-code hooks) cannot wait on the asynchronous bootstrap
//! and are not supported; configurations declaring them are rejected at
//! validation rather than silently ignored.
//!
//! # Example
//!
//! ```rust,ignore
//! use loadchain_core::{ConfigValue, LoaderBuilder, LoaderHooks, StaticSource};
//! use loadchain_core::ops::{default_resolve, resolve_hook, Resolution, ResolveRequest};
//!
//! let document = ConfigValue::loaders([LoaderBuilder::new()
//!     .resolve(resolve_hook(|req, next| async move {
//!         if req.specifier == "app" {
//!             return Ok(Resolution::new("file:///srv/app/main.js"));
//!         }
//!         next.call(req).await
//!     }))
//!     .build()]);
//!
//! let hooks = LoaderHooks::new(Box::new(StaticSource::new(document)));
//! let resolution = hooks
//!     .resolve(
//!         ResolveRequest::new("app"),
//!         default_resolve(|req| async move { Ok(Resolution::new(req.specifier)) }),
//!     )
//!     .await?;
//! ```

pub mod bootstrap;
pub mod chain;
pub mod config;
pub mod error;
pub mod facade;
pub mod ops;
pub mod registry;
pub mod source;

// Re-exports
pub use bootstrap::Bootstrap;
pub use chain::ComposedHook;
pub use config::{
    config_path, config_path_from, ConfigError, ConfigValue, LoaderBuilder, LoaderConfig,
    LoaderEntry, ValueKind,
};
pub use error::{HookError, HookResult};
pub use facade::LoaderHooks;
pub use ops::{
    default_load, default_resolve, load_hook, load_hook_with_options, resolve_hook,
    resolve_hook_with_options, DefaultHook, HookFn, HookFuture, HookOp, HookWithOptionsFn,
    LoadContext, LoadOp, LoadRequest, ModuleSource, Next, Resolution, ResolveContext, ResolveOp,
    ResolveRequest,
};
pub use registry::HookRegistry;
pub use source::{ConfigSource, FnSource, StaticSource};

/// Environment variable overriding the configuration module location.
///
/// Absolute paths are used verbatim; relative paths resolve against the
/// working directory.
pub const CONFIG_ENV_VAR: &str = "LOADCHAIN_CONFIG";

/// Conventional configuration module filename.
pub const DEFAULT_CONFIG_FILE: &str = "loadchain.config.json";
