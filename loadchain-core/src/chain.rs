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

//! Chain composer: fold an ordered hook list into one composed hook.
//!
//! Composition is chain-of-responsibility: hook `i` receives a continuation
//! that runs hook `i + 1`, and the continuation of the last hook is the
//! host default supplied at call time. Declaration order is priority order —
//! earlier hooks wrap later ones and observe the result of their own `next`
//! call before any earlier hook resumes.
//!
//! Continuations are built lazily, index by index, as the chain is walked:
//! a hook that never calls `next` therefore halts the chain without any
//! later hook (or the default) ever being constructed or run.

use std::sync::Arc;

use crate::error::HookResult;
use crate::ops::{DefaultHook, HookFn, HookOp, Next};

/// An ordered hook list composed into a single hook for one operation.
///
/// The composed hook closes over the hook list and is rebuilt only when
/// configuration changes; the host default is supplied on every invocation.
pub struct ComposedHook<O: HookOp> {
    links: Arc<[HookFn<O>]>,
}

impl<O: HookOp> Clone for ComposedHook<O> {
    fn clone(&self) -> Self {
        Self {
            links: Arc::clone(&self.links),
        }
    }
}

impl<O: HookOp> ComposedHook<O> {
    /// Compose hooks in declaration order.
    pub fn new(links: Vec<HookFn<O>>) -> Self {
        Self {
            links: links.into(),
        }
    }

    /// Number of hooks in the chain.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// True when no loader contributes to this operation and every
    /// invocation falls through to the default.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Run the chain for one request, terminating at `default`.
    pub async fn invoke(
        &self,
        request: O::Request,
        default: DefaultHook<O>,
    ) -> HookResult<O::Response> {
        continuation(Arc::clone(&self.links), 0, default)
            .call(request)
            .await
    }
}

/// Build the continuation that runs the chain from `index` onward.
///
/// The returned [`Next`] has the same callable shape as the default, so a
/// hook cannot tell whether delegating hands control to another plugin or
/// to the host.
fn continuation<O: HookOp>(
    links: Arc<[HookFn<O>]>,
    index: usize,
    default: DefaultHook<O>,
) -> Next<O> {
    Next::new(Arc::new(move |request| match links.get(index) {
        Some(link) => {
            let next = continuation(Arc::clone(&links), index + 1, Arc::clone(&default));
            link(request, next)
        }
        None => default(request),
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;
    use crate::ops::{default_resolve, resolve_hook, Resolution, ResolveOp, ResolveRequest};

    fn echo_default() -> DefaultHook<ResolveOp> {
        default_resolve(|request| async move { Ok(Resolution::new(request.specifier)) })
    }

    #[tokio::test]
    async fn test_empty_chain_runs_default() {
        let composed: ComposedHook<ResolveOp> = ComposedHook::new(Vec::new());
        assert!(composed.is_empty());

        let resolution = composed
            .invoke(ResolveRequest::new("plain"), echo_default())
            .await
            .unwrap();
        assert_eq!(resolution.url, "plain");
    }

    #[tokio::test]
    async fn test_conditional_suffix_chain() {
        // First hook appends "-A" only for specifiers containing "x", second
        // appends "-B" unconditionally, default echoes the specifier.
        let composed = ComposedHook::new(vec![
            resolve_hook(|mut request, next| async move {
                if request.specifier.contains('x') {
                    request.specifier.push_str("-A");
                }
                next.call(request).await
            }),
            resolve_hook(|mut request, next| async move {
                request.specifier.push_str("-B");
                next.call(request).await
            }),
        ]);
        assert_eq!(composed.len(), 2);

        let hit = composed
            .invoke(ResolveRequest::new("x"), echo_default())
            .await
            .unwrap();
        assert_eq!(hit.url, "x-A-B");

        let miss = composed
            .invoke(ResolveRequest::new("y"), echo_default())
            .await
            .unwrap();
        assert_eq!(miss.url, "y-B");
    }

    #[tokio::test]
    async fn test_execution_is_strictly_nested() {
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut links = Vec::new();
        for name in ["p1", "p2"] {
            let order = Arc::clone(&order);
            links.push(resolve_hook(move |request, next| {
                let order = Arc::clone(&order);
                async move {
                    order.lock().push(format!("{name}:before"));
                    let result = next.call(request).await;
                    order.lock().push(format!("{name}:after"));
                    result
                }
            }));
        }

        let order_in_default = Arc::clone(&order);
        let default = default_resolve(move |request| {
            let order = Arc::clone(&order_in_default);
            async move {
                order.lock().push("default".to_string());
                Ok(Resolution::new(request.specifier))
            }
        });

        ComposedHook::new(links)
            .invoke(ResolveRequest::new("m"), default)
            .await
            .unwrap();

        assert_eq!(
            order.lock().as_slice(),
            &["p1:before", "p2:before", "default", "p2:after", "p1:after"]
        );
    }

    #[tokio::test]
    async fn test_short_circuit_skips_rest_of_chain() {
        let later_ran = Arc::new(AtomicBool::new(false));
        let default_ran = Arc::new(AtomicBool::new(false));

        let later = Arc::clone(&later_ran);
        let composed = ComposedHook::new(vec![
            resolve_hook(|request, _next| async move {
                Ok(Resolution::new(format!("short:{}", request.specifier)))
            }),
            resolve_hook(move |request, next| {
                let later = Arc::clone(&later);
                async move {
                    later.store(true, Ordering::SeqCst);
                    next.call(request).await
                }
            }),
        ]);

        let flag = Arc::clone(&default_ran);
        let default = default_resolve(move |request| {
            let flag = Arc::clone(&flag);
            async move {
                flag.store(true, Ordering::SeqCst);
                Ok(Resolution::new(request.specifier))
            }
        });

        let resolution = composed
            .invoke(ResolveRequest::new("m"), default)
            .await
            .unwrap();

        assert_eq!(resolution.url, "short:m");
        assert!(!later_ran.load(Ordering::SeqCst));
        assert!(!default_ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_next_may_be_called_more_than_once() {
        // The continuation contract imposes no exactly-once discipline.
        let default_calls = Arc::new(AtomicUsize::new(0));

        let composed = ComposedHook::new(vec![resolve_hook(|request, next| async move {
            let first = next.call(request.clone()).await?;
            let second = next.call(request).await?;
            Ok(Resolution::new(format!("{}+{}", first.url, second.url)))
        })]);

        let calls = Arc::clone(&default_calls);
        let default = default_resolve(move |request| {
            let calls = Arc::clone(&calls);
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(Resolution::new(format!("{}#{n}", request.specifier)))
            }
        });

        let resolution = composed
            .invoke(ResolveRequest::new("m"), default)
            .await
            .unwrap();

        assert_eq!(resolution.url, "m#1+m#2");
        assert_eq!(default_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_hook_failure_propagates_unchanged() {
        let composed = ComposedHook::new(vec![resolve_hook(|request, _next| async move {
            Err(crate::error::HookError::resolve(
                request.specifier,
                "refused",
            ))
        })]);

        let err = composed
            .invoke(ResolveRequest::new("m"), echo_default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::HookError::Resolve { .. }
        ));
    }
}
