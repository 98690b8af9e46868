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

//! Hook facade: the two entry points the host module system calls.

use std::sync::Arc;

use crate::bootstrap::Bootstrap;
use crate::error::HookResult;
use crate::ops::{
    DefaultHook, LoadOp, LoadRequest, ModuleSource, Resolution, ResolveOp, ResolveRequest,
};
use crate::source::ConfigSource;

/// The externally exposed hook surface.
///
/// Each entry point matches the host's hook signature: the domain request
/// plus the host's built-in implementation as the trailing argument. If the
/// bootstrap fetch is in flight at the instant of invocation the call
/// bypasses configuration entirely and runs the default — a deliberate lossy
/// fast path; plugin behavior is unavailable inside the bootstrap window,
/// which is the accepted cost of avoiding deadlock (the fetch itself
/// resolves and loads through these very entry points).
#[derive(Clone)]
pub struct LoaderHooks {
    bootstrap: Arc<Bootstrap>,
}

impl LoaderHooks {
    /// Create a facade with its own bootstrap coordinator.
    pub fn new(source: Box<dyn ConfigSource>) -> Self {
        Self {
            bootstrap: Arc::new(Bootstrap::new(source)),
        }
    }

    /// Create a facade over an existing coordinator.
    pub fn with_bootstrap(bootstrap: Arc<Bootstrap>) -> Self {
        Self { bootstrap }
    }

    /// The coordinator backing this facade (test-only side channel for
    /// `ensure_loaded`/`force_config`).
    pub fn bootstrap(&self) -> &Arc<Bootstrap> {
        &self.bootstrap
    }

    /// Resolve a module specifier through the configured loader chain.
    pub async fn resolve(
        &self,
        request: ResolveRequest,
        default: DefaultHook<ResolveOp>,
    ) -> HookResult<Resolution> {
        if self.bootstrap.is_loading() {
            tracing::debug!(
                specifier = %request.specifier,
                "bootstrap in flight; resolving with the host default"
            );
            return default(request).await;
        }
        let registry = self.bootstrap.ensure_loaded().await;
        registry.resolve().invoke(request, default).await
    }

    /// Load module source through the configured loader chain.
    pub async fn load(
        &self,
        request: LoadRequest,
        default: DefaultHook<LoadOp>,
    ) -> HookResult<ModuleSource> {
        if self.bootstrap.is_loading() {
            tracing::debug!(
                url = %request.url,
                "bootstrap in flight; loading with the host default"
            );
            return default(request).await;
        }
        let registry = self.bootstrap.ensure_loaded().await;
        registry.load().invoke(request, default).await
    }
}
