//! Integration tests for luaexport

use assert_cmd::{cargo::cargo_bin_cmd, Command};
use predicates::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const CALC_DUMP: &str = r#"{
    "file_path": "calc.h",
    "decls": [
        {
            "name": "Calc",
            "annotations": ["lua_export_class,alias=Calculator"],
            "kind": {
                "decl": "record",
                "members": [
                    {
                        "name": "add",
                        "kind": {
                            "decl": "method",
                            "return_type": {"builtin": "int"},
                            "params": [
                                {"name": "a", "ty": {"builtin": "int"}},
                                {"name": "b", "ty": {"builtin": "int"}}
                            ]
                        }
                    },
                    {
                        "name": "add",
                        "kind": {
                            "decl": "method",
                            "return_type": {"builtin": "double"},
                            "params": [
                                {"name": "a", "ty": {"builtin": "double"}},
                                {"name": "b", "ty": {"builtin": "double"}}
                            ]
                        }
                    }
                ]
            }
        }
    ]
}"#;

const NOISY_DUMP: &str = r#"{
    "file_path": "noisy.h",
    "decls": [
        {
            "name": "spawn",
            "annotations": ["lua_export_widget"],
            "kind": {"decl": "function", "return_type": {"builtin": "void"}}
        }
    ]
}"#;

const BROKEN_DUMP: &str = r#"{
    "file_path": "broken.h",
    "decls": [
        {
            "name": "stray",
            "kind": {"decl": "method", "return_type": {"builtin": "void"}}
        }
    ]
}"#;

/// Workspace with an isolated config file and a `dumps/` directory
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> io::Result<Self> {
        let dir = TempDir::new()?;
        fs::create_dir_all(dir.path().join("dumps"))?;
        Ok(Sandbox { dir })
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn config_path(&self) -> PathBuf {
        self.path().join("config").join("luaexport.toml")
    }

    fn dump(&self, name: &str, content: &str) -> io::Result<PathBuf> {
        let path = self.path().join("dumps").join(name);
        fs::write(&path, content)?;
        Ok(path)
    }

    fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("luaexport");
        cmd.current_dir(self.path());
        cmd.env("LUAEXPORT_CONFIG", self.config_path());
        cmd.env_remove("LUAEXPORT_LOG");
        cmd
    }
}

#[test]
fn test_version() -> io::Result<()> {
    Sandbox::new()?
        .cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("luaexport"));
    Ok(())
}

#[test]
fn test_help() -> io::Result<()> {
    Sandbox::new()?
        .cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("export manifest"));
    Ok(())
}

#[test]
fn test_invalid_command() -> io::Result<()> {
    Sandbox::new()?.cmd().arg("invalid").assert().failure();
    Ok(())
}

#[test]
fn test_analyze_writes_manifest() -> io::Result<()> {
    let sandbox = Sandbox::new()?;
    sandbox.dump("calc.json", CALC_DUMP)?;

    sandbox
        .cmd()
        .args(["analyze", "dumps", "--out", "out/manifest.json"])
        .assert()
        .success();

    let manifest = fs::read_to_string(sandbox.path().join("out").join("manifest.json"))?;
    assert!(manifest.contains("\"qualified_name\": \"Calc\""));
    assert!(manifest.contains("\"script_name\": \"Calculator\""));
    assert!(manifest.contains("\"qualified_name\": \"Calc::add\""));
    Ok(())
}

#[test]
fn test_analyze_writes_toml_by_extension() -> io::Result<()> {
    let sandbox = Sandbox::new()?;
    let dump = sandbox.dump("calc.json", CALC_DUMP)?;

    sandbox
        .cmd()
        .arg("analyze")
        .arg(&dump)
        .args(["--out", "manifest.toml"])
        .assert()
        .success();

    let manifest = fs::read_to_string(sandbox.path().join("manifest.toml"))?;
    assert!(manifest.contains("[[units]]"));
    assert!(manifest.contains("file_path = \"calc.h\""));
    Ok(())
}

#[test]
fn test_analyze_reports_diagnostics_without_failing() -> io::Result<()> {
    let sandbox = Sandbox::new()?;
    sandbox.dump("noisy.json", NOISY_DUMP)?;

    sandbox
        .cmd()
        .args(["analyze", "dumps"])
        .assert()
        .success()
        .stderr(predicate::str::contains("unknown-annotation"));

    assert!(sandbox.path().join("luaexport-manifest.json").exists());
    Ok(())
}

#[test]
fn test_analyze_strict_fails_on_diagnostics() -> io::Result<()> {
    let sandbox = Sandbox::new()?;
    sandbox.dump("calc.json", CALC_DUMP)?;
    sandbox.dump("noisy.json", NOISY_DUMP)?;

    sandbox
        .cmd()
        .args(["analyze", "dumps", "--strict"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("strict mode"));

    assert!(!sandbox.path().join("luaexport-manifest.json").exists());
    Ok(())
}

#[test]
fn test_analyze_fails_on_structural_error() -> io::Result<()> {
    let sandbox = Sandbox::new()?;
    sandbox.dump("broken.json", BROKEN_DUMP)?;

    sandbox
        .cmd()
        .args(["analyze", "dumps"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("outside of a record"));
    Ok(())
}

#[test]
fn test_analyze_without_dumps_fails() -> io::Result<()> {
    let sandbox = Sandbox::new()?;

    sandbox
        .cmd()
        .args(["analyze", "dumps"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No tree dumps"));
    Ok(())
}

#[test]
fn test_analyze_with_diagnostics_writes_logs() -> io::Result<()> {
    let sandbox = Sandbox::new()?;
    sandbox.dump("calc.json", CALC_DUMP)?;

    sandbox
        .cmd()
        .args(["config", "set", "event-log", "logs/events.log"])
        .assert()
        .success();
    sandbox
        .cmd()
        .args(["analyze", "dumps", "--diagnostics"])
        .assert()
        .success();

    let events = fs::read_to_string(sandbox.path().join("logs").join("events.log"))?;
    assert!(events.contains("UNIT_START file=calc.h"));
    let stats = fs::read_to_string(sandbox.path().join("luaexport-types.log"))?;
    assert!(stats.contains("\tint"));
    Ok(())
}

#[test]
fn test_check_prints_summary() -> io::Result<()> {
    let sandbox = Sandbox::new()?;
    sandbox.dump("calc.json", CALC_DUMP)?;

    sandbox
        .cmd()
        .args(["check", "dumps"])
        .assert()
        .success()
        .stdout(predicate::str::contains("calc.h"))
        .stdout(predicate::str::contains("1 overloaded names"));

    assert!(!sandbox.path().join("luaexport-manifest.json").exists());
    Ok(())
}

#[test]
fn test_check_prefix_from_config() -> io::Result<()> {
    let sandbox = Sandbox::new()?;
    sandbox.dump("calc.json", &CALC_DUMP.replace("lua_export_", "script_"))?;

    sandbox
        .cmd()
        .args(["config", "set", "annotation-prefix", "script_"])
        .assert()
        .success();
    sandbox
        .cmd()
        .args(["check", "dumps", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"script_name\": \"Calculator\""));
    Ok(())
}

#[test]
fn test_config_show() -> io::Result<()> {
    Sandbox::new()?
        .cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration:"))
        .stdout(predicate::str::contains("annotation-prefix"));
    Ok(())
}

#[test]
fn test_config_set_then_get() -> io::Result<()> {
    let sandbox = Sandbox::new()?;

    sandbox
        .cmd()
        .args(["config", "set", "allow-specializations", "true"])
        .assert()
        .success();
    sandbox
        .cmd()
        .args(["config", "get", "allow-specializations"])
        .assert()
        .success()
        .stdout(predicate::str::diff("true\n"));
    assert!(sandbox.config_path().exists());
    Ok(())
}

#[test]
fn test_config_set_unknown_key_fails() -> io::Result<()> {
    Sandbox::new()?
        .cmd()
        .args(["config", "set", "python-version", "3.12"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
    Ok(())
}

#[test]
fn test_config_path_honors_env() -> io::Result<()> {
    let sandbox = Sandbox::new()?;
    let expected = sandbox.config_path().display().to_string();
    sandbox
        .cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(expected));
    Ok(())
}

#[test]
fn test_verbose_run_reports_log_path() -> io::Result<()> {
    let sandbox = Sandbox::new()?;
    sandbox.dump("calc.json", CALC_DUMP)?;

    sandbox
        .cmd()
        .args(["-v", "check", "dumps"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Run log:").and(predicate::str::contains("luaexport.log")));

    Sandbox::new()?
        .cmd()
        .args(["check", "dumps"])
        .assert()
        .stderr(predicate::str::contains("Run log:").not());
    Ok(())
}
