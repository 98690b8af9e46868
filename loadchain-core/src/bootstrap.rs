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

//! Bootstrap coordinator: the one-time, self-referential configuration load.
//!
//! Fetching the configuration module goes through the host module system,
//! which invokes this engine's own composed hooks recursively. If those
//! recursive invocations waited on the in-flight configuration future, the
//! process would deadlock: they would be queued behind the very future they
//! are needed to resolve.
//!
//! The coordinator therefore keeps bootstrap progress as an explicit,
//! synchronously checkable state:
//!
//! ```text
//! NotStarted ── first demand ──▶ Loading ── fetch settles ──▶ Ready
//! ```
//!
//! [`Bootstrap::is_loading`] is read without awaiting anything, and the
//! facade uses it to route every invocation that lands inside the bootstrap
//! window straight to the host default. Only the state mutex guards the
//! transitions; it is never held across an await.
//!
//! The fetch future is created at construction but never polled until the
//! first [`Bootstrap::ensure_loaded`] demand, and it is shared so every
//! waiter observes the single fetch.

use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::Mutex;

use crate::config::{ConfigError, ConfigValue, LoaderConfig};
use crate::registry::HookRegistry;
use crate::source::ConfigSource;

/// The memoized, shareable future producing the derived registry.
type RegistryFuture = Shared<BoxFuture<'static, Arc<HookRegistry>>>;

enum State {
    /// Fetch future created, not yet polled.
    NotStarted(RegistryFuture),
    /// Fetch in flight; every hook invocation bypasses to the host default.
    Loading(RegistryFuture),
    /// Configuration immutable for the rest of the process (unless a test
    /// forces a replacement).
    Ready(Arc<HookRegistry>),
}

/// Owner of the single configuration-loading attempt.
///
/// One coordinator exists per hook facade; the facade holds it in an `Arc`
/// and passes it by reference rather than through process globals.
pub struct Bootstrap {
    state: Mutex<State>,
}

impl Bootstrap {
    /// Create a coordinator around a not-yet-fetched configuration source.
    pub fn new(source: Box<dyn ConfigSource>) -> Self {
        let fetch = async move { registry_from(source.fetch().await) }
            .boxed()
            .shared();
        Self {
            state: Mutex::new(State::NotStarted(fetch)),
        }
    }

    /// True strictly while the configuration fetch is in flight.
    ///
    /// Evaluated synchronously, before any awaiting, so a bypassing call can
    /// never itself begin a second fetch.
    pub fn is_loading(&self) -> bool {
        matches!(&*self.state.lock(), State::Loading(_))
    }

    /// Demand the configuration, starting the fetch on first call.
    ///
    /// Subsequent calls return the same memoized future or value — at most
    /// one external fetch occurs per coordinator. On fetch failure the
    /// coordinator logs a warning and settles on the empty configuration; a
    /// successfully fetched but malformed document terminates the process.
    pub async fn ensure_loaded(&self) -> Arc<HookRegistry> {
        let pending = {
            let mut state = self.state.lock();
            match &mut *state {
                State::Ready(registry) => return Arc::clone(registry),
                State::Loading(pending) => pending.clone(),
                State::NotStarted(fetch) => {
                    let pending = fetch.clone();
                    *state = State::Loading(pending.clone());
                    pending
                }
            }
        };
        self.wait_ready(pending).await
    }

    /// Install a replacement configuration future, rebuilding the registry
    /// once it settles.
    ///
    /// Test-only side channel: lets harnesses substitute configuration
    /// without a real fetch or a process restart. While the replacement is
    /// in flight the ordinary `Loading` bypass applies.
    pub async fn force_config<F>(&self, config: F) -> Arc<HookRegistry>
    where
        F: Future<Output = anyhow::Result<ConfigValue>> + Send + 'static,
    {
        let pending = config.map(registry_from).boxed().shared();
        {
            let mut state = self.state.lock();
            *state = State::Loading(pending.clone());
        }
        self.wait_ready(pending).await
    }

    /// Await the shared fetch and flip `Loading` to `Ready`.
    ///
    /// The flip is guarded by future identity so a waiter resuming after a
    /// forced replacement cannot clobber the newer in-flight state.
    async fn wait_ready(&self, pending: RegistryFuture) -> Arc<HookRegistry> {
        let registry = pending.clone().await;
        let mut state = self.state.lock();
        if let State::Loading(current) = &*state {
            if Shared::ptr_eq(current, &pending) {
                *state = State::Ready(Arc::clone(&registry));
            }
        }
        registry
    }
}

/// Derive the registry from a settled fetch.
fn registry_from(result: anyhow::Result<ConfigValue>) -> Arc<HookRegistry> {
    match result {
        Ok(document) => match LoaderConfig::from_document(document) {
            Ok(config) => {
                let registry = HookRegistry::from_config(&config);
                tracing::debug!(
                    loaders = config.loaders.len(),
                    resolve_hooks = registry.resolve().len(),
                    load_hooks = registry.load().len(),
                    "loader configuration resolved"
                );
                Arc::new(registry)
            }
            Err(err) => die(&err),
        },
        Err(err) => {
            tracing::warn!(
                error = %err,
                "could not fetch loader configuration; continuing with host defaults"
            );
            Arc::new(HookRegistry::empty())
        }
    }
}

/// A malformed configuration cannot be safely partially composed: print the
/// diagnostic and terminate.
fn die(err: &ConfigError) -> ! {
    eprintln!("loadchain: {err}");
    tracing::error!(error = %err, "invalid loader configuration");
    std::process::exit(1);
}
