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

//! Configuration source boundary.
//!
//! Fetching the configuration module is an external concern: in production
//! it means dynamically loading code, which routes through the host module
//! system — and therefore through the very hooks being configured (see
//! [`crate::bootstrap`]). The engine only defines the boundary trait plus
//! two small sources used by test harnesses and fixtures.

use std::future::Future;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::config::ConfigValue;

/// Asynchronous producer of a configuration document.
///
/// A fetch error is the recoverable error class: the bootstrap logs it and
/// proceeds with the empty configuration. A fetch that *succeeds* but
/// produces a malformed document is fatal (see
/// [`crate::config::ConfigError`]).
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Fetch the configuration document. Called at most once per bootstrap.
    async fn fetch(&self) -> anyhow::Result<ConfigValue>;
}

/// Source yielding a pre-built document.
pub struct StaticSource {
    document: ConfigValue,
}

impl StaticSource {
    pub fn new(document: ConfigValue) -> Self {
        Self { document }
    }
}

#[async_trait]
impl ConfigSource for StaticSource {
    async fn fetch(&self) -> anyhow::Result<ConfigValue> {
        Ok(self.document.clone())
    }
}

/// Source driven by an async closure, for scripting fetch behavior in
/// tests (delays, failures, re-entrant probes).
pub struct FnSource {
    fetch: Box<dyn Fn() -> BoxFuture<'static, anyhow::Result<ConfigValue>> + Send + Sync>,
}

impl FnSource {
    pub fn new<F, Fut>(fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<ConfigValue>> + Send + 'static,
    {
        Self {
            fetch: Box::new(move || fetch().boxed()),
        }
    }
}

#[async_trait]
impl ConfigSource for FnSource {
    async fn fetch(&self) -> anyhow::Result<ConfigValue> {
        (self.fetch)().await
    }
}
