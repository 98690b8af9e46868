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

//! Supported loader operations and the hook callable shapes.
//!
//! The engine intercepts exactly two host lifecycle operations:
//!
//! - **resolve** — map a module specifier to a canonical URL
//! - **load** — produce executable source for a resolved URL
//!
//! Both are described by the [`HookOp`] trait so the composer and registry
//! stay generic over the operation. Hook implementations are plain `async`
//! closures adapted into `Arc`'d callables by the helpers at the bottom of
//! this module.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::HookResult;

/// One interceptable operation of the host module system.
pub trait HookOp: Send + Sync + 'static {
    /// Operation name as it appears in loader entries.
    const NAME: &'static str;
    /// Domain arguments of the operation.
    type Request: Send + 'static;
    /// Result produced by the operation.
    type Response: Send + 'static;
}

/// The resolve operation: specifier → canonical URL.
pub struct ResolveOp;

/// The load operation: URL → executable source.
pub struct LoadOp;

/// Context accompanying a resolve request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolveContext {
    /// URL of the module that issued the import, if any.
    pub parent_url: Option<String>,
    /// Export conditions of the surrounding environment.
    pub conditions: Vec<String>,
}

/// Domain arguments of a resolve invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveRequest {
    /// The specifier as written in the import.
    pub specifier: String,
    pub context: ResolveContext,
}

impl ResolveRequest {
    /// Create a request with an empty context.
    pub fn new(specifier: impl Into<String>) -> Self {
        Self {
            specifier: specifier.into(),
            context: ResolveContext::default(),
        }
    }

    /// Set the parent URL on the request context.
    pub fn with_parent(mut self, parent_url: impl Into<String>) -> Self {
        self.context.parent_url = Some(parent_url.into());
        self
    }
}

/// Result of a resolve invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Canonical URL of the module.
    pub url: String,
    /// Module format hint, when the resolver already knows it.
    pub format: Option<String>,
}

impl Resolution {
    /// Create a resolution with no format hint.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            format: None,
        }
    }

    /// Set the format hint.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

/// Context accompanying a load request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadContext {
    /// Format hint produced during resolution, if any.
    pub format: Option<String>,
    /// Export conditions of the surrounding environment.
    pub conditions: Vec<String>,
}

/// Domain arguments of a load invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadRequest {
    /// Canonical URL to load.
    pub url: String,
    pub context: LoadContext,
}

impl LoadRequest {
    /// Create a request with an empty context.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            context: LoadContext::default(),
        }
    }
}

/// Result of a load invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSource {
    /// Module format of the produced source.
    pub format: String,
    /// The executable source text.
    pub source: String,
}

impl ModuleSource {
    pub fn new(format: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            source: source.into(),
        }
    }
}

impl HookOp for ResolveOp {
    const NAME: &'static str = "resolve";
    type Request = ResolveRequest;
    type Response = Resolution;
}

impl HookOp for LoadOp {
    const NAME: &'static str = "load";
    type Request = LoadRequest;
    type Response = ModuleSource;
}

/// Boxed future returned by hook callables.
pub type HookFuture<T> = BoxFuture<'static, HookResult<T>>;

/// A partial hook implementation contributed by one loader plugin.
pub type HookFn<O> = Arc<
    dyn Fn(<O as HookOp>::Request, Next<O>) -> HookFuture<<O as HookOp>::Response> + Send + Sync,
>;

/// A partial hook implementation that also receives its entry's options
/// value as a trailing argument.
pub type HookWithOptionsFn<O> = Arc<
    dyn Fn(<O as HookOp>::Request, Next<O>, Arc<Value>) -> HookFuture<<O as HookOp>::Response>
        + Send
        + Sync,
>;

/// The host's built-in implementation of an operation, supplied by the
/// caller on every facade invocation and used as the chain's terminal link.
pub type DefaultHook<O> =
    Arc<dyn Fn(<O as HookOp>::Request) -> HookFuture<<O as HookOp>::Response> + Send + Sync>;

/// Continuation handed to each hook: the rest of the pipeline.
///
/// Internally this is the same callable shape as a [`DefaultHook`], so a
/// plugin cannot tell whether its `next` is another plugin or the host's
/// built-in behavior. That indistinguishability is the core abstraction and
/// is deliberately preserved.
///
/// A hook may call `next` once, several times, or not at all; the composer
/// imposes no exactly-once checks. Not calling it halts the chain.
pub struct Next<O: HookOp> {
    inner: DefaultHook<O>,
}

impl<O: HookOp> Clone for Next<O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<O: HookOp> Next<O> {
    pub(crate) fn new(inner: DefaultHook<O>) -> Self {
        Self { inner }
    }

    /// Delegate to the rest of the pipeline with the given (possibly
    /// modified) request.
    pub async fn call(&self, request: O::Request) -> HookResult<O::Response> {
        (self.inner)(request).await
    }
}

/// Adapt an async closure into a resolve hook.
pub fn resolve_hook<F, Fut>(hook: F) -> HookFn<ResolveOp>
where
    F: Fn(ResolveRequest, Next<ResolveOp>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HookResult<Resolution>> + Send + 'static,
{
    Arc::new(move |request, next| Box::pin(hook(request, next)))
}

/// Adapt an async closure into a resolve hook taking options.
pub fn resolve_hook_with_options<F, Fut>(hook: F) -> HookWithOptionsFn<ResolveOp>
where
    F: Fn(ResolveRequest, Next<ResolveOp>, Arc<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HookResult<Resolution>> + Send + 'static,
{
    Arc::new(move |request, next, options| Box::pin(hook(request, next, options)))
}

/// Adapt an async closure into a load hook.
pub fn load_hook<F, Fut>(hook: F) -> HookFn<LoadOp>
where
    F: Fn(LoadRequest, Next<LoadOp>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HookResult<ModuleSource>> + Send + 'static,
{
    Arc::new(move |request, next| Box::pin(hook(request, next)))
}

/// Adapt an async closure into a load hook taking options.
pub fn load_hook_with_options<F, Fut>(hook: F) -> HookWithOptionsFn<LoadOp>
where
    F: Fn(LoadRequest, Next<LoadOp>, Arc<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HookResult<ModuleSource>> + Send + 'static,
{
    Arc::new(move |request, next, options| Box::pin(hook(request, next, options)))
}

/// Adapt an async closure into a host default for resolve.
pub fn default_resolve<F, Fut>(default: F) -> DefaultHook<ResolveOp>
where
    F: Fn(ResolveRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HookResult<Resolution>> + Send + 'static,
{
    Arc::new(move |request| Box::pin(default(request)))
}

/// Adapt an async closure into a host default for load.
pub fn default_load<F, Fut>(default: F) -> DefaultHook<LoadOp>
where
    F: Fn(LoadRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HookResult<ModuleSource>> + Send + 'static,
{
    Arc::new(move |request| Box::pin(default(request)))
}
