use async_trait::async_trait;
use giftwise_core::config::Phase;
use giftwise_hooks::{CommandOutput, HookPipeline, HostCommand, HostModuleRegistry};
use serde_json::{Map, Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;

fn pipeline(dir: &Path) -> HookPipeline {
    HookPipeline::new(dir, Arc::new(HostModuleRegistry::with_defaults()))
}

fn script(dir: &Path, name: &str, source: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, source).unwrap();
    path
}

fn host_config(hooks: Value) -> Map<String, Value> {
    let mut config = Map::new();
    config.insert("hooks".to_string(), hooks);
    config
}

fn before_hooks<P: AsRef<Path>>(scripts: &[P], timeout_ms: u64, fail_on_error: bool) -> Map<String, Value> {
    let scripts: Vec<String> = scripts.iter().map(|p| p.as_ref().display().to_string()).collect();
    host_config(json!({
        "enabled": true,
        "beforePhase": { "enabled": true, "scripts": scripts, "timeoutMs": timeout_ms },
        "failOnError": fail_on_error
    }))
}

fn without_hooks(mut config: Map<String, Value>) -> Value {
    config.remove("hooks");
    Value::Object(config)
}

#[tokio::test]
async fn before_phase_applies_returned_config() {
    let dir = TempDir::new().unwrap();
    let a = script(
        dir.path(),
        "a.lua",
        r#"module.exports = function(args, config, command)
            log.info("tagging " .. command)
            return { config = { tag = "seen" } }
        end"#,
    );

    let config = before_hooks(&[&a], 100, false);
    let result = pipeline(dir.path())
        .apply_before_command(&[], &config, Some("calc"))
        .await
        .unwrap();

    assert_eq!(without_hooks(result), json!({ "tag": "seen" }));
}

#[tokio::test]
async fn three_hooks_fold_in_order() {
    let dir = TempDir::new().unwrap();
    let a = script(
        dir.path(),
        "a.mlua",
        "return function(args, config, command) return { config = { a = 1 } } end",
    );
    let b = script(
        dir.path(),
        "b.mlua",
        r#"return {
            hook = function(args, config, command)
                return { config = { b = config.a + 1 } }
            end
        }"#,
    );
    let c = script(
        dir.path(),
        "c.clua",
        r#"exports.main = function(args, config, command)
            return { config = { c_saw_b = config.b } }
        end"#,
    );

    let config = before_hooks(&[&a, &b, &c], 1000, true);
    let result = pipeline(dir.path())
        .apply_before_command(&["calc".to_string()], &config, Some("calc"))
        .await
        .unwrap();

    assert_eq!(without_hooks(result), json!({ "a": 1, "b": 2, "c_saw_b": 2 }));
}

fn failing_trio(dir: &Path, marker: &Path) -> Vec<PathBuf> {
    vec![
        script(
            dir,
            "one.mlua",
            "return function(args, config, command) return { config = { one = true } } end",
        ),
        script(
            dir,
            "two.mlua",
            r#"return function(args, config, command) error("two failed") end"#,
        ),
        script(
            dir,
            "three.mlua",
            &format!(
                r#"return function(args, config, command)
                    local f = assert(io.open({:?}, "w"))
                    f:write("ran")
                    f:close()
                    return {{ config = {{ three = true }} }}
                end"#,
                marker.display().to_string()
            ),
        ),
    ]
}

#[tokio::test]
async fn fail_open_keeps_running_after_an_error() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("three.ran");
    let scripts = failing_trio(dir.path(), &marker);

    let config = before_hooks(&scripts, 1000, false);
    let result = pipeline(dir.path())
        .apply_before_command(&[], &config, Some("calc"))
        .await
        .unwrap();

    assert!(marker.exists());
    assert_eq!(without_hooks(result), json!({ "one": true, "three": true }));
}

#[tokio::test]
async fn fail_fast_stops_at_the_first_error() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("three.ran");
    let scripts = failing_trio(dir.path(), &marker);

    let config = before_hooks(&scripts, 1000, true);
    let abort = pipeline(dir.path())
        .apply_before_command(&[], &config, Some("calc"))
        .await
        .unwrap_err();

    assert!(!marker.exists());
    assert_eq!(abort.phase, Phase::Before);
    assert_eq!(abort.errors.len(), 1);
    assert_eq!(abort.errors[0].plugin_name(), Some("two.mlua"));
    assert!(abort.to_string().contains("two failed"));
}

#[tokio::test]
async fn slow_hook_times_out() {
    let dir = TempDir::new().unwrap();
    let stuck = script(
        dir.path(),
        "stuck.mlua",
        "return function(args, config, command) host.sleep(2000) return { config = { late = true } } end",
    );
    let next = script(
        dir.path(),
        "next.mlua",
        "return function(args, config, command) return { config = { next = true } } end",
    );

    let started = Instant::now();
    let config = before_hooks(&[&stuck, &next], 100, false);
    let result = pipeline(dir.path())
        .apply_before_command(&[], &config, None)
        .await
        .unwrap();
    assert!(started.elapsed().as_millis() < 1500);
    assert_eq!(without_hooks(result), json!({ "next": true }));

    let config = before_hooks(&[&stuck], 100, true);
    let abort = pipeline(dir.path())
        .apply_before_command(&[], &config, None)
        .await
        .unwrap_err();
    assert!(abort.errors[0].is_timeout());
}

#[tokio::test]
async fn after_phase_sees_command_output() {
    let dir = TempDir::new().unwrap();
    let observer = script(
        dir.path(),
        "observer.mlua",
        r#"return function(args, config, output, result, command)
            if output ~= "42.00 USD" or result.amount ~= 42 or command ~= "calc" then
                return { error = "unexpected context" }
            end
            return { config = { ignored = true } }
        end"#,
    );

    let config = host_config(json!({
        "enabled": true,
        "afterPhase": { "enabled": true, "scripts": [observer.display().to_string()] },
        "failOnError": true
    }));

    pipeline(dir.path())
        .apply_after_command(&[], &config, "42.00 USD", &json!({ "amount": 42 }), Some("calc"))
        .await
        .unwrap();

    let abort = pipeline(dir.path())
        .apply_after_command(&[], &config, "0.00 USD", &json!({ "amount": 0 }), Some("calc"))
        .await
        .unwrap_err();
    assert_eq!(abort.phase, Phase::After);
    assert!(abort.to_string().contains("unexpected context"));
}

#[tokio::test]
async fn relative_scripts_resolve_against_config_dir() {
    let dir = TempDir::new().unwrap();
    script(
        dir.path(),
        "hooks/relative.mlua",
        "return function(args, config, command) return { config = { relative = true } } end",
    );

    let config = host_config(json!({
        "enabled": true,
        "beforePhase": { "enabled": true, "scripts": ["hooks/relative.mlua"] },
        "failOnError": true
    }));
    let result = pipeline(dir.path())
        .apply_before_command(&[], &config, None)
        .await
        .unwrap();
    assert_eq!(result["relative"], json!(true));
}

#[tokio::test]
async fn missing_scripts_follow_the_failure_policy() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.mlua");

    let config = before_hooks(&[&missing], 100, false);
    let result = pipeline(dir.path())
        .apply_before_command(&[], &config, None)
        .await
        .unwrap();
    assert_eq!(result, config);

    let config = before_hooks(&[&missing], 100, true);
    let abort = pipeline(dir.path())
        .apply_before_command(&[], &config, None)
        .await
        .unwrap_err();
    assert_eq!(abort.errors[0].kind(), "path_validation");
}

#[tokio::test]
async fn signature_gate_applies_to_declared_parameters() {
    let dir = TempDir::new().unwrap();
    let two = script(dir.path(), "two.mlua", "return function(a, b) end");
    let six = script(dir.path(), "six.mlua", "return function(a, b, c, d, e, f) end");
    let four = script(
        dir.path(),
        "four.mlua",
        "return function(a, b, c, d) return { config = { four = true } } end",
    );

    for rejected in [&two, &six] {
        let config = before_hooks(&[rejected], 100, true);
        let abort = pipeline(dir.path())
            .apply_before_command(&[], &config, None)
            .await
            .unwrap_err();
        assert_eq!(abort.errors[0].kind(), "signature");
    }

    let config = before_hooks(&[&four], 100, true);
    let result = pipeline(dir.path())
        .apply_before_command(&[], &config, None)
        .await
        .unwrap();
    assert_eq!(result["four"], json!(true));
}

#[tokio::test]
async fn plugin_manifest_selects_native_format_for_lua_files() {
    let dir = TempDir::new().unwrap();
    let native = script(
        dir.path(),
        "pkg/native.lua",
        "return function(args, config, command) return { config = { native = true } } end",
    );
    fs::write(dir.path().join("pkg/plugin.json"), r#"{ "type": "module" }"#).unwrap();

    let config = before_hooks(&[&native], 100, true);
    let result = pipeline(dir.path())
        .apply_before_command(&[], &config, None)
        .await
        .unwrap();
    assert_eq!(result["native"], json!(true));
}

struct Shout;

#[async_trait]
impl HostCommand for Shout {
    fn name(&self) -> &str {
        "shout"
    }

    async fn run(&self, args: &[String], config: &Map<String, Value>) -> anyhow::Result<CommandOutput> {
        let word = config["word"].as_str().unwrap_or("nothing").to_uppercase();
        Ok(CommandOutput {
            output: format!("{word}!"),
            result: json!({ "word": word, "args": args.len() }),
        })
    }
}

#[tokio::test]
async fn run_with_hooks_wraps_a_command() {
    let dir = TempDir::new().unwrap();
    let before = script(
        dir.path(),
        "before.mlua",
        r#"return function(args, config, command)
            if command ~= "shout" then error("wrong command") end
            return { config = { word = "hello" } }
        end"#,
    );
    let after = script(
        dir.path(),
        "after.mlua",
        r#"return function(args, config, output, result, command)
            if output ~= "HELLO!" then return { error = "got " .. tostring(output) } end
        end"#,
    );

    let config = host_config(json!({
        "enabled": true,
        "beforePhase": { "enabled": true, "scripts": [before.display().to_string()] },
        "afterPhase": { "enabled": true, "scripts": [after.display().to_string()] },
        "failOnError": true
    }));

    let output = pipeline(dir.path())
        .run_with_hooks(&Shout, &["shout".to_string()], &config)
        .await
        .unwrap();
    assert_eq!(output.output, "HELLO!");
    assert_eq!(output.result["args"], json!(1));
}
