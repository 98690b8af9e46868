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

//! Integration tests for the hook facade: loader chains, options
//! propagation, and the self-referential bootstrap.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use serde_json::Value;

use loadchain_core::{
    default_load, default_resolve, load_hook, load_hook_with_options, resolve_hook, ConfigValue,
    DefaultHook, FnSource, LoadOp, LoadRequest, LoaderBuilder, LoaderHooks, ModuleSource,
    Resolution, ResolveOp, ResolveRequest, StaticSource,
};

fn host_resolve() -> DefaultHook<ResolveOp> {
    default_resolve(|request| async move {
        Ok(Resolution::new(format!("host://{}", request.specifier)))
    })
}

fn host_load() -> DefaultHook<LoadOp> {
    default_load(|request| async move {
        Ok(ModuleSource::new(
            "module",
            format!("export default \"{}\";", request.url),
        ))
    })
}

fn echo_resolve() -> DefaultHook<ResolveOp> {
    default_resolve(|request| async move { Ok(Resolution::new(request.specifier)) })
}

#[tokio::test]
async fn single_resolve_hook_aliases_a_specifier() {
    let document = ConfigValue::loaders([LoaderBuilder::new()
        .resolve(resolve_hook(|request, next| async move {
            if request.specifier == "yoshi" {
                return Ok(Resolution::new("file:///fixtures/yoshi.js"));
            }
            next.call(request).await
        }))
        .build()]);

    let hooks = LoaderHooks::new(Box::new(StaticSource::new(document)));

    let aliased = hooks
        .resolve(ResolveRequest::new("yoshi"), host_resolve())
        .await
        .unwrap();
    assert_eq!(aliased.url, "file:///fixtures/yoshi.js");

    let passed_through = hooks
        .resolve(ResolveRequest::new("mario"), host_resolve())
        .await
        .unwrap();
    assert_eq!(passed_through.url, "host://mario");
}

#[tokio::test]
async fn earlier_resolve_hooks_win_over_later_ones() {
    let first = resolve_hook(|request, next| async move {
        match request.specifier.as_str() {
            "donkeykong" => Ok(Resolution::new("file:///fixtures/donkeykong-1.js")),
            "luigi" => Ok(Resolution::new("file:///fixtures/luigi-1.js")),
            _ => next.call(request).await,
        }
    });
    let second = resolve_hook(|request, next| async move {
        match request.specifier.as_str() {
            "luigi" => Ok(Resolution::new("file:///fixtures/luigi-2.js")),
            "captainfalcon" => Ok(Resolution::new("file:///fixtures/captainfalcon-2.js")),
            _ => next.call(request).await,
        }
    });

    let document = ConfigValue::loaders([
        LoaderBuilder::new().resolve(first).build(),
        LoaderBuilder::new().resolve(second).build(),
    ]);
    let hooks = LoaderHooks::new(Box::new(StaticSource::new(document)));

    let dk = hooks
        .resolve(ResolveRequest::new("donkeykong"), host_resolve())
        .await
        .unwrap();
    assert_eq!(dk.url, "file:///fixtures/donkeykong-1.js");

    // Both hooks know "luigi"; the earlier declaration takes it.
    let luigi = hooks
        .resolve(ResolveRequest::new("luigi"), host_resolve())
        .await
        .unwrap();
    assert_eq!(luigi.url, "file:///fixtures/luigi-1.js");

    let falcon = hooks
        .resolve(ResolveRequest::new("captainfalcon"), host_resolve())
        .await
        .unwrap();
    assert_eq!(falcon.url, "file:///fixtures/captainfalcon-2.js");

    let other = hooks
        .resolve(ResolveRequest::new("peach"), host_resolve())
        .await
        .unwrap();
    assert_eq!(other.url, "host://peach");
}

#[tokio::test]
async fn load_hooks_transform_the_default_source_inside_out() {
    let outer = load_hook(|request, next| async move {
        if request.url.contains("krool") {
            let base = next.call(request).await?;
            return Ok(ModuleSource::new(
                "module",
                format!("{}\nexport const more = \"wrath\";", base.source),
            ));
        }
        next.call(request).await
    });
    let inner = load_hook(|request, next| async move {
        if request.url.contains("krool") {
            let base = next.call(request).await?;
            return Ok(ModuleSource::new(
                "module",
                format!("{}\nexport const even_more = \"reconsider\";", base.source),
            ));
        }
        next.call(request).await
    });

    let document = ConfigValue::loaders([
        LoaderBuilder::new().load(outer).build(),
        LoaderBuilder::new().load(inner).build(),
    ]);
    let hooks = LoaderHooks::new(Box::new(StaticSource::new(document)));

    let source = hooks
        .load(LoadRequest::new("file:///fixtures/krool.js"), host_load())
        .await
        .unwrap();

    // The later hook runs closer to the default, so its export comes first.
    assert_eq!(
        source.source,
        "export default \"file:///fixtures/krool.js\";\n\
         export const even_more = \"reconsider\";\n\
         export const more = \"wrath\";"
    );

    let untouched = hooks
        .load(LoadRequest::new("file:///fixtures/plain.js"), host_load())
        .await
        .unwrap();
    assert_eq!(untouched.source, "export default \"file:///fixtures/plain.js\";");
}

#[tokio::test]
async fn options_reach_their_loader_on_every_invocation() {
    let document = ConfigValue::loaders([LoaderBuilder::new()
        .options(serde_json::json!({ "capitalize": true }))
        .load_with_options(load_hook_with_options(|request, next, options| {
            async move {
                let base = next.call(request).await?;
                let mut addition = "what did he even do?".to_string();
                if options
                    .get("capitalize")
                    .and_then(Value::as_bool)
                    .unwrap_or(false)
                {
                    addition = addition.to_uppercase();
                }
                Ok(ModuleSource::new(
                    "module",
                    format!("{}\nexport const more = \"{addition}\";", base.source),
                ))
            }
        }))
        .build()]);

    let hooks = LoaderHooks::new(Box::new(StaticSource::new(document)));

    for _ in 0..2 {
        let source = hooks
            .load(LoadRequest::new("file:///fixtures/krool3.js"), host_load())
            .await
            .unwrap();
        assert!(source.source.ends_with("export const more = \"WHAT DID HE EVEN DO?\";"));
    }
}

#[tokio::test]
async fn suffix_scenario_through_the_facade() {
    let document = ConfigValue::loaders([
        LoaderBuilder::new()
            .resolve(resolve_hook(|mut request, next| async move {
                if request.specifier.contains('x') {
                    request.specifier.push_str("-A");
                }
                next.call(request).await
            }))
            .build(),
        LoaderBuilder::new()
            .resolve(resolve_hook(|mut request, next| async move {
                request.specifier.push_str("-B");
                next.call(request).await
            }))
            .build(),
    ]);
    let hooks = LoaderHooks::new(Box::new(StaticSource::new(document)));

    let hit = hooks
        .resolve(ResolveRequest::new("x"), echo_resolve())
        .await
        .unwrap();
    assert_eq!(hit.url, "x-A-B");

    let miss = hooks
        .resolve(ResolveRequest::new("y"), echo_resolve())
        .await
        .unwrap();
    assert_eq!(miss.url, "y-B");
}

#[tokio::test]
async fn invocations_inside_the_bootstrap_window_bypass_to_the_default() {
    // The fetch itself resolves through the facade, as a real configuration
    // module load would. It must observe pure host behavior, not deadlock
    // waiting on the configuration it is producing.
    let facade_cell: Arc<OnceLock<LoaderHooks>> = Arc::new(OnceLock::new());
    let probed = Arc::new(AtomicBool::new(false));

    let cell = Arc::clone(&facade_cell);
    let probe = Arc::clone(&probed);
    let source = FnSource::new(move || {
        let cell = Arc::clone(&cell);
        let probe = Arc::clone(&probe);
        async move {
            let hooks = cell.get().cloned().expect("facade installed before use");
            assert!(hooks.bootstrap().is_loading());

            let resolution = hooks
                .resolve(ResolveRequest::new("probe"), host_resolve())
                .await?;
            assert_eq!(resolution.url, "host://probe");
            probe.store(true, Ordering::SeqCst);

            Ok(ConfigValue::loaders([LoaderBuilder::new()
                .resolve(resolve_hook(|request, _next| async move {
                    Ok(Resolution::new(format!("plugin://{}", request.specifier)))
                }))
                .build()]))
        }
    });

    let hooks = LoaderHooks::new(Box::new(source));
    assert!(facade_cell.set(hooks.clone()).is_ok());

    // The triggering call still sees the configured chain once it is ready.
    let resolution = hooks
        .resolve(ResolveRequest::new("app"), host_resolve())
        .await
        .unwrap();
    assert!(probed.load(Ordering::SeqCst));
    assert_eq!(resolution.url, "plugin://app");
    assert!(!hooks.bootstrap().is_loading());

    // Calls after Ready consult the chain as well.
    let later = hooks
        .resolve(ResolveRequest::new("later"), host_resolve())
        .await
        .unwrap();
    assert_eq!(later.url, "plugin://later");
}

#[tokio::test]
async fn fetch_failure_degrades_every_operation_to_the_default() {
    let hooks = LoaderHooks::new(Box::new(FnSource::new(|| async {
        anyhow::bail!("config module missing")
    })));

    let first = hooks
        .resolve(ResolveRequest::new("a"), host_resolve())
        .await
        .unwrap();
    assert_eq!(first.url, "host://a");

    let second = hooks
        .load(LoadRequest::new("file:///b.js"), host_load())
        .await
        .unwrap();
    assert_eq!(second.source, "export default \"file:///b.js\";");
}

#[tokio::test]
async fn forced_configuration_rebuilds_the_chains() {
    let hooks = LoaderHooks::new(Box::new(StaticSource::new(ConfigValue::loaders([]))));

    let before = hooks
        .resolve(ResolveRequest::new("m"), host_resolve())
        .await
        .unwrap();
    assert_eq!(before.url, "host://m");

    hooks
        .bootstrap()
        .force_config(async {
            Ok(ConfigValue::loaders([LoaderBuilder::new()
                .resolve(resolve_hook(|request, _next| async move {
                    Ok(Resolution::new(format!("forced://{}", request.specifier)))
                }))
                .build()]))
        })
        .await;

    let after = hooks
        .resolve(ResolveRequest::new("m"), host_resolve())
        .await
        .unwrap();
    assert_eq!(after.url, "forced://m");
}
