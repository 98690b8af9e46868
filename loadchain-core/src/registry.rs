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

//! Hook registry: one composed hook per supported operation.

use crate::chain::ComposedHook;
use crate::config::LoaderConfig;
use crate::ops::{LoadOp, ResolveOp};

/// The composed hooks derived from one validated configuration.
///
/// Built once per configuration and immutable afterwards. Only the two
/// asynchronous operations are represented; synchronous hook types cannot
/// wait on the bootstrap and are rejected during validation instead.
pub struct HookRegistry {
    resolve: ComposedHook<ResolveOp>,
    load: ComposedHook<LoadOp>,
}

impl HookRegistry {
    /// Compose every supported operation's chain from a configuration.
    pub fn from_config(config: &LoaderConfig) -> Self {
        Self {
            resolve: ComposedHook::new(
                config
                    .loaders
                    .iter()
                    .filter_map(|entry| entry.resolve.clone())
                    .collect(),
            ),
            load: ComposedHook::new(
                config
                    .loaders
                    .iter()
                    .filter_map(|entry| entry.load.clone())
                    .collect(),
            ),
        }
    }

    /// Registry for the empty configuration: every operation falls through
    /// to the host default.
    pub fn empty() -> Self {
        Self::from_config(&LoaderConfig::empty())
    }

    /// The composed resolve chain.
    pub fn resolve(&self) -> &ComposedHook<ResolveOp> {
        &self.resolve
    }

    /// The composed load chain.
    pub fn load(&self) -> &ComposedHook<LoadOp> {
        &self.load
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigValue, LoaderBuilder};
    use crate::ops::{load_hook, resolve_hook};

    #[test]
    fn test_empty_registry_has_no_hooks() {
        let registry = HookRegistry::empty();
        assert!(registry.resolve().is_empty());
        assert!(registry.load().is_empty());
    }

    #[test]
    fn test_chains_pick_up_only_declared_operations() {
        let document = ConfigValue::loaders([
            LoaderBuilder::new()
                .resolve(resolve_hook(|request, next| async move {
                    next.call(request).await
                }))
                .build(),
            LoaderBuilder::new()
                .resolve(resolve_hook(|request, next| async move {
                    next.call(request).await
                }))
                .load(load_hook(|request, next| async move {
                    next.call(request).await
                }))
                .build(),
        ]);

        let config = LoaderConfig::from_document(document).unwrap();
        let registry = HookRegistry::from_config(&config);
        assert_eq!(registry.resolve().len(), 2);
        assert_eq!(registry.load().len(), 1);
    }
}
