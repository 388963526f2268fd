//! Integration tests for hyphae
//!
//! These drive the binary end to end against a shell-script agent that
//! answers each phase with a canned report.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use hyphae::phase::{Outcome, Phase, PhasePointer};
use hyphae::store::ArtifactStore;

/// Helper to create a hyphae Command isolated from the caller's environment
fn hyphae(dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("hyphae");
    cmd.current_dir(dir)
        .env_remove("HYPHAE_MODEL")
        .env_remove("HYPHAE_AUTO_APPROVE")
        .env_remove("HYPHAE_AGENT_CMD")
        .env_remove("HYPHAE_MISSION_ID")
        .env("HYPHAE_LOG", "hyphae=warn");
    cmd
}

fn create_temp_project() -> TempDir {
    TempDir::new().unwrap()
}

fn init_project(dir: &TempDir) {
    hyphae(dir.path()).arg("init").assert().success();
}

fn store(dir: &TempDir) -> ArtifactStore {
    ArtifactStore::open(dir.path().join(".hyphae/missions")).unwrap()
}

const PLAN: &str = r#"summary: plan the loader
acceptance_criteria:
  - loader reads layered files
steps:
  - description: add loader
    expected_outcome: unit tests cover precedence"#;

const IMPLEMENT: &str = r#"summary: added loader
commands:
  - command: cargo test config
    result: 12 passed
    exit_code: 0"#;

const VERIFY_PASS: &str = r#"verdict: PASS
acceptance_criteria:
  - description: loader reads layered files
    status: PASS
required_fixes: []"#;

const VERIFY_FAIL: &str = r#"verdict: FAIL
required_fixes:
  - handle a missing file"#;

const FINALIZE: &str = r#"summary: tidied names
behavior_unchanged: true
commit_message: "feat: layered config loader""#;

/// Write an agent script and point hyphae.toml at it.
///
/// `body` is a shell fragment run after stdin has been drained; it sees
/// `$HYPHAE_PHASE` and runs in the project directory.
#[cfg(unix)]
fn install_agent(dir: &TempDir, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.path().join("agent.sh");
    fs::write(&script, format!("#!/bin/sh\ncat > /dev/null\n{}\n", body)).unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    fs::write(
        dir.path().join(".hyphae/hyphae.toml"),
        format!(
            "[agent]\ncmd = \"{}\"\nargs = []\nmodel = \"test-model\"\ntimeout_secs = 30\n\n[retry]\ninitial_backoff_ms = 1\n",
            script.display()
        ),
    )
    .unwrap();
}

fn report(yaml: &str) -> String {
    format!("printf '%s\\n' '<report>' '{}' '</report>'", yaml.replace('\'', "'\\''"))
}

/// Agent that answers every phase successfully.
fn happy_agent() -> String {
    format!(
        "case \"$HYPHAE_PHASE\" in\n  plan) {} ;;\n  implement) {} ;;\n  verify) {} ;;\n  finalize) {} ;;\nesac",
        report(PLAN),
        report(IMPLEMENT),
        report(VERIFY_PASS),
        report(FINALIZE)
    )
}

fn create_mission(dir: &TempDir, id: &str) {
    hyphae(dir.path())
        .args(["create", id, "--objective", "Layered config loader", "--scope", "src/config.rs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created mission"));
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_hyphae_help() {
        hyphae(Path::new(".")).arg("--help").assert().success();
    }

    #[test]
    fn test_hyphae_version() {
        hyphae(Path::new(".")).arg("--version").assert().success();
    }

    #[test]
    fn test_init_creates_structure() {
        let dir = create_temp_project();

        hyphae(dir.path())
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("Initialized hyphae project"));

        assert!(dir.path().join(".hyphae/missions").is_dir());
        assert!(dir.path().join(".hyphae/agents").is_dir());
        assert!(dir.path().join(".hyphae/hyphae.toml").is_file());
    }

    #[test]
    fn test_init_idempotent() {
        let dir = create_temp_project();
        init_project(&dir);

        hyphae(dir.path())
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("already initialized"));
    }

    #[test]
    fn test_list_requires_project() {
        let dir = create_temp_project();
        hyphae(dir.path())
            .arg("list")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("hyphae init"));
    }

    #[test]
    fn test_config_validate_reports_warnings() {
        let dir = create_temp_project();
        init_project(&dir);
        fs::write(
            dir.path().join(".hyphae/hyphae.toml"),
            "[retry]\nmax_attempts = 0\n",
        )
        .unwrap();

        hyphae(dir.path())
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("warnings"));
    }

    #[test]
    fn test_config_show_applies_model_flag() {
        let dir = create_temp_project();
        init_project(&dir);

        hyphae(dir.path())
            .args(["--model", "gemini-2.0-flash", "config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("model = \"gemini-2.0-flash\""));
    }
}

// =============================================================================
// Mission bookkeeping
// =============================================================================

mod missions {
    use super::*;

    #[test]
    fn test_create_initializes_and_lists() {
        let dir = create_temp_project();
        create_mission(&dir, "loader");

        assert!(dir.path().join(".hyphae/missions/loader/progress.yaml").is_file());

        hyphae(dir.path())
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("loader").and(predicate::str::contains("plan")));
    }

    #[test]
    fn test_create_duplicate_fails() {
        let dir = create_temp_project();
        create_mission(&dir, "loader");

        hyphae(dir.path())
            .args(["create", "loader"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("already exists"));
    }

    #[test]
    fn test_create_rejects_unsafe_id() {
        let dir = create_temp_project();
        hyphae(dir.path())
            .args(["create", "../escape"])
            .assert()
            .failure();
        assert!(!dir.path().join(".hyphae/escape").exists());
    }

    #[test]
    fn test_status_shows_objective_and_phase() {
        let dir = create_temp_project();
        create_mission(&dir, "loader");

        hyphae(dir.path())
            .args(["status", "loader", "-v"])
            .assert()
            .success()
            .stdout(
                predicate::str::contains("Layered config loader")
                    .and(predicate::str::contains("src/config.rs"))
                    .and(predicate::str::contains("not run")),
            );
    }

    #[test]
    fn test_status_unknown_mission() {
        let dir = create_temp_project();
        init_project(&dir);

        hyphae(dir.path())
            .args(["status", "ghost"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("hyphae create ghost"));
    }

    #[test]
    fn test_corrupt_artifact_exits_4() {
        let dir = create_temp_project();
        create_mission(&dir, "loader");
        fs::write(
            dir.path().join(".hyphae/missions/loader/progress.yaml"),
            "mission_context: [not, a, map\n",
        )
        .unwrap();

        hyphae(dir.path())
            .args(["status", "loader"])
            .assert()
            .code(4)
            .stderr(predicate::str::contains("progress.yaml").and(predicate::str::contains("store")));

        hyphae(dir.path())
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("corrupt"));
    }

    #[test]
    fn test_check_fresh_mission_is_ready_for_plan() {
        let dir = create_temp_project();
        create_mission(&dir, "loader");

        hyphae(dir.path())
            .args(["check", "loader"])
            .assert()
            .success()
            .stdout(
                predicate::str::contains("ready for plan")
                    .and(predicate::str::contains("plan.acceptance_criteria")),
            );
    }

    #[test]
    fn test_check_blocked_phase_exits_2() {
        let dir = create_temp_project();
        create_mission(&dir, "loader");
        let store = store(&dir);
        let mut mission = store.load("loader").unwrap();
        mission.current_phase = PhasePointer::Active(Phase::Verify);
        store.save(&mission).unwrap();

        hyphae(dir.path())
            .args(["check", "loader"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("implement.commands"));
    }

    #[test]
    fn test_context_file_is_merged() {
        let dir = create_temp_project();
        let ctx = dir.path().join("ctx.yaml");
        fs::write(&ctx, "objective: From file\nconstraints: [no new deps]\nticket: CFG-12\n").unwrap();

        hyphae(dir.path())
            .args(["create", "ctx", "--context-file"])
            .arg(&ctx)
            .args(["--test-rigor", "full"])
            .assert()
            .success();

        let mission = store(&dir).load("ctx").unwrap();
        assert_eq!(mission.mission_context.objective, "From file");
        assert_eq!(mission.mission_context.constraints, vec!["no new deps"]);
        assert!(mission.mission_context.extra.contains_key("ticket"));
        assert_eq!(mission.test_rigor.to_string(), "FULL");
    }
}

// =============================================================================
// Running phases
// =============================================================================

#[cfg(unix)]
mod running {
    use super::*;

    #[test]
    fn test_full_run_reaches_complete() {
        let dir = create_temp_project();
        create_mission(&dir, "loader");
        install_agent(&dir, &happy_agent());

        hyphae(dir.path())
            .args(["run", "loader", "--approve"])
            .assert()
            .success()
            .stdout(predicate::str::contains("feat: layered config loader"));

        let mission = store(&dir).load("loader").unwrap();
        assert!(mission.is_complete());
        assert_eq!(mission.usage_totals().runs, 4);
        for phase in Phase::ALL {
            assert_eq!(mission.record(phase).iterations.len(), 1, "{}", phase);
        }

        hyphae(dir.path())
            .arg("usage")
            .assert()
            .success()
            .stdout(predicate::str::contains("4 run(s)"));

        // running a complete mission is a no-op
        hyphae(dir.path())
            .args(["step", "loader"])
            .assert()
            .success();
        assert_eq!(store(&dir).load("loader").unwrap().usage_totals().runs, 4);
    }

    #[test]
    fn test_yes_flag_approves() {
        let dir = create_temp_project();
        create_mission(&dir, "loader");
        install_agent(&dir, &happy_agent());

        hyphae(dir.path())
            .args(["--yes", "run", "loader"])
            .assert()
            .success();
        assert!(store(&dir).load("loader").unwrap().is_complete());
    }

    #[test]
    fn test_empty_plan_is_blocked_with_exit_2() {
        let dir = create_temp_project();
        create_mission(&dir, "loader");
        install_agent(&dir, "echo '<report>summary: nothing to plan</report>'");

        hyphae(dir.path())
            .args(["step", "loader"])
            .assert()
            .code(2)
            .stderr(
                predicate::str::contains("plan.acceptance_criteria")
                    .and(predicate::str::contains("plan.steps"))
                    .and(predicate::str::contains("validator")),
            );

        let mission = store(&dir).load("loader").unwrap();
        assert_eq!(mission.current_phase, PhasePointer::Active(Phase::Plan));
        let log = mission.phases.plan.latest().unwrap();
        assert_eq!(log.blocked_by.len(), 2);
    }

    #[test]
    fn test_unattended_implement_is_denied_with_exit_5() {
        let dir = create_temp_project();
        create_mission(&dir, "loader");
        install_agent(&dir, &happy_agent());

        hyphae(dir.path())
            .args(["step", "loader"])
            .assert()
            .success();
        let path = dir.path().join(".hyphae/missions/loader/progress.yaml");
        let before = fs::read(&path).unwrap();

        hyphae(dir.path())
            .args(["step", "loader"])
            .assert()
            .code(5)
            .stderr(predicate::str::contains("approval-gate").and(predicate::str::contains("--approve")));

        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_verify_fail_loops_back_to_implement() {
        let dir = create_temp_project();
        create_mission(&dir, "loader");
        let body = format!(
            "case \"$HYPHAE_PHASE\" in\n  plan) {} ;;\n  implement) {} ;;\n  verify)\n    if [ -f verified_once ]; then {}; else touch verified_once; {}; fi ;;\n  finalize) {} ;;\nesac",
            report(PLAN),
            report(IMPLEMENT),
            report(VERIFY_PASS),
            report(VERIFY_FAIL),
            report(FINALIZE)
        );
        install_agent(&dir, &body);

        hyphae(dir.path())
            .args(["run", "loader", "--approve"])
            .assert()
            .success();

        let mission = store(&dir).load("loader").unwrap();
        assert!(mission.is_complete());
        let implement: Vec<u32> = mission
            .phases
            .implement
            .iterations
            .iter()
            .map(|l| l.iteration)
            .collect();
        assert_eq!(implement, vec![1, 2]);
        let verify: Vec<Outcome> = mission
            .phases
            .verify
            .iterations
            .iter()
            .map(|l| l.outcome)
            .collect();
        assert_eq!(verify, vec![Outcome::Fail, Outcome::Pass]);
    }

    #[test]
    fn test_max_iterations_stops_early() {
        let dir = create_temp_project();
        create_mission(&dir, "loader");
        install_agent(&dir, &happy_agent());

        hyphae(dir.path())
            .args(["run", "loader", "--approve", "--max-iterations", "2"])
            .assert()
            .success();

        let mission = store(&dir).load("loader").unwrap();
        assert_eq!(mission.current_phase, PhasePointer::Active(Phase::Verify));
    }

    #[test]
    fn test_auth_failure_exits_3_without_retry() {
        let dir = create_temp_project();
        create_mission(&dir, "loader");
        install_agent(&dir, "echo call >> calls.log\necho '401 Unauthorized: invalid api key' >&2\nexit 1");

        hyphae(dir.path())
            .args(["step", "loader"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("agent"));

        let calls = fs::read_to_string(dir.path().join("calls.log")).unwrap();
        assert_eq!(calls.lines().count(), 1);
        let mission = store(&dir).load("loader").unwrap();
        assert_eq!(mission.last_outcome(Phase::Plan), Some(Outcome::Error));
    }

    #[test]
    fn test_rate_limit_is_retried_then_exhausted() {
        let dir = create_temp_project();
        create_mission(&dir, "loader");
        install_agent(&dir, "echo call >> calls.log\necho '429 rate limit exceeded' >&2\nexit 1");

        hyphae(dir.path())
            .args(["step", "loader"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("3 attempts"));

        let calls = fs::read_to_string(dir.path().join("calls.log")).unwrap();
        assert_eq!(calls.lines().count(), 3);
    }

    #[test]
    fn test_missing_agent_binary_exits_3() {
        let dir = create_temp_project();
        create_mission(&dir, "loader");

        hyphae(dir.path())
            .env("HYPHAE_AGENT_CMD", "/nonexistent/hyphae-agent")
            .args(["step", "loader"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("HYPHAE_AGENT_CMD"));
    }

    #[test]
    fn test_stream_json_usage_is_recorded() {
        let dir = create_temp_project();
        create_mission(&dir, "loader");
        let event = serde_json::json!({
            "type": "result",
            "subtype": "success",
            "is_error": false,
            "result": format!("<report>\n{}\n</report>", PLAN),
            "usage": {"input_tokens": 1200, "output_tokens": 300},
            "total_cost_usd": 0.25
        });
        install_agent(&dir, &format!("printf '%s\\n' '{}'", event.to_string().replace('\'', "'\\''")));

        hyphae(dir.path())
            .args(["step", "loader"])
            .assert()
            .success();

        let mission = store(&dir).load("loader").unwrap();
        let totals = mission.usage_totals();
        assert_eq!(totals.prompt_tokens, 1200);
        assert_eq!(totals.completion_tokens, 300);
        assert!((totals.cost_usd - 0.25).abs() < 1e-9);
        assert_eq!(mission.current_phase, PhasePointer::Active(Phase::Implement));
    }

    #[test]
    fn test_dry_run_prints_prompt_without_running() {
        let dir = create_temp_project();
        create_mission(&dir, "loader");
        install_agent(&dir, "echo call >> calls.log");
        fs::write(dir.path().join(".hyphae/CONTRACT.md"), "Never touch vendored code.").unwrap();
        let path = dir.path().join(".hyphae/missions/loader/progress.yaml");
        let before = fs::read(&path).unwrap();

        hyphae(dir.path())
            .args(["step", "loader", "--dry-run"])
            .assert()
            .success()
            .stdout(
                predicate::str::contains("You are the planner")
                    .and(predicate::str::contains("Never touch vendored code."))
                    .and(predicate::str::contains("Layered config loader")),
            );

        assert!(!dir.path().join("calls.log").exists());
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_agent_receives_prompt_on_stdin() {
        let dir = create_temp_project();
        create_mission(&dir, "loader");
        fs::create_dir_all(dir.path().join(".hyphae/agents")).unwrap();
        fs::write(dir.path().join(".hyphae/agents/plan.md"), "Custom planner role").unwrap();

        use std::os::unix::fs::PermissionsExt;
        let script = dir.path().join("agent.sh");
        fs::write(
            &script,
            format!("#!/bin/sh\ncat > prompt.txt\necho \"$HYPHAE_MISSION_ID $HYPHAE_ITERATION\" > env.txt\n{}\n", report(PLAN)),
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        fs::write(
            dir.path().join(".hyphae/hyphae.toml"),
            "[agent]\nargs = []\n",
        )
        .unwrap();

        hyphae(dir.path())
            .env("HYPHAE_AGENT_CMD", &script)
            .args(["step", "loader"])
            .assert()
            .success();

        let prompt = fs::read_to_string(dir.path().join("prompt.txt")).unwrap();
        assert!(prompt.starts_with("Custom planner role"));
        assert!(prompt.contains("Phase: plan (iteration 1)"));
        let env = fs::read_to_string(dir.path().join("env.txt")).unwrap();
        assert_eq!(env.trim(), "loader 1");
    }

    #[test]
    fn test_two_processes_drive_separate_missions() {
        let dir = create_temp_project();
        create_mission(&dir, "m1");
        create_mission(&dir, "m2");

        // The plan summary carries the mission id the agent was launched for.
        let plan = "printf '<report>\\nsummary: plan for %s\\nacceptance_criteria:\\n  - loader works\\nsteps:\\n  - description: add loader\\n    expected_outcome: tests pass\\n</report>\\n' \"$HYPHAE_MISSION_ID\"";
        install_agent(
            &dir,
            &format!(
                "echo \"$HYPHAE_MISSION_ID $HYPHAE_PHASE\" >> calls.log\nsleep 0.2\ncase \"$HYPHAE_PHASE\" in\n  plan) {} ;;\n  implement) {} ;;\n  verify) {} ;;\n  finalize) {} ;;\nesac",
                plan,
                report(IMPLEMENT),
                report(VERIFY_PASS),
                report(FINALIZE)
            ),
        );

        let runs: Vec<_> = ["m1", "m2"]
            .into_iter()
            .map(|id| {
                let root = dir.path().to_path_buf();
                std::thread::spawn(move || {
                    hyphae(&root).args(["run", id, "--approve"]).assert().success();
                })
            })
            .collect();
        for run in runs {
            run.join().unwrap();
        }

        for id in ["m1", "m2"] {
            let mission = store(&dir).load(id).unwrap();
            assert!(mission.is_complete(), "{}", id);
            assert_eq!(mission.usage_totals().runs, 4, "{}", id);
            for phase in Phase::ALL {
                assert_eq!(mission.record(phase).iterations.len(), 1, "{} {}", id, phase);
            }
            assert_eq!(
                mission.record(Phase::Plan).latest().unwrap().summary,
                format!("plan for {}", id)
            );
            assert!(!dir.path().join(format!(".hyphae/missions/{}/progress.yaml.tmp", id)).exists());
        }

        let calls = fs::read_to_string(dir.path().join("calls.log")).unwrap();
        assert_eq!(calls.lines().filter(|l| l.starts_with("m1 ")).count(), 4);
        assert_eq!(calls.lines().filter(|l| l.starts_with("m2 ")).count(), 4);
    }
}

// =============================================================================
// Workspace tools
// =============================================================================

#[cfg(unix)]
mod tools {
    use super::*;

    fn move_to(dir: &TempDir, id: &str, phase: Phase) {
        let store = store(dir);
        let mut mission = store.load(id).unwrap();
        mission.current_phase = PhasePointer::Active(phase);
        store.save(&mission).unwrap();
    }

    #[test]
    fn test_read_tools_print_json() {
        let dir = create_temp_project();
        create_mission(&dir, "loader");
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/config.rs"), "fn load_layers() {}\n").unwrap();

        hyphae(dir.path())
            .args(["tool", "list-files"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"name\": \"src\""))
            .stdout(predicate::str::contains("\"type\": \"directory\""));

        hyphae(dir.path())
            .args(["tool", "read-file", "src/config.rs"])
            .assert()
            .success()
            .stdout("fn load_layers() {}\n");

        hyphae(dir.path())
            .args(["tool", "search", "LOAD_LAYERS", "--glob", "*.rs"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"line_number\": 1"))
            .stdout(predicate::str::contains("src/config.rs"));

        hyphae(dir.path())
            .env("HYPHAE_MISSION_ID", "loader")
            .args(["tool", "read-progress"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"current_phase\": \"plan\""));
    }

    #[test]
    fn test_paths_outside_the_project_are_refused() {
        let dir = create_temp_project();
        init_project(&dir);

        hyphae(dir.path())
            .args(["tool", "read-file", "../outside.txt"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("outside the project root"));

        hyphae(dir.path())
            .args(["tool", "write-file", ".hyphae/missions/m1/progress.yaml", "--content", "x"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("mission store"));
    }

    #[test]
    fn test_write_during_implement_needs_approval() {
        let dir = create_temp_project();
        create_mission(&dir, "loader");
        move_to(&dir, "loader", Phase::Implement);

        hyphae(dir.path())
            .args(["tool", "write-file", "src/lib.rs", "--content", "// new", "--mission", "loader"])
            .assert()
            .code(5)
            .stderr(predicate::str::contains("Approval denied for implement (write src/lib.rs)"));
        assert!(!dir.path().join("src/lib.rs").exists());

        hyphae(dir.path())
            .env("HYPHAE_MISSION_ID", "loader")
            .args(["tool", "run-command", "touch made.txt"])
            .assert()
            .code(5);
        assert!(!dir.path().join("made.txt").exists());

        hyphae(dir.path())
            .args(["--yes", "tool", "write-file", "src/lib.rs", "--mission", "loader"])
            .write_stdin("// new\n")
            .assert()
            .success()
            .stdout(predicate::str::contains("\"bytes_written\": 7"));
        assert_eq!(fs::read_to_string(dir.path().join("src/lib.rs")).unwrap(), "// new\n");
    }

    #[test]
    fn test_read_only_phase_allows_commands() {
        let dir = create_temp_project();
        create_mission(&dir, "loader");

        hyphae(dir.path())
            .args(["tool", "run-command", "echo hi; exit 2", "--mission", "loader"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"exit_code\": 2"))
            .stdout(predicate::str::contains("\"stdout\": \"hi\\n\""));
    }

    #[test]
    fn test_agent_tool_calls_inherit_run_approval() {
        let dir = create_temp_project();
        create_mission(&dir, "loader");
        install_agent(
            &dir,
            &format!(
                "case \"$HYPHAE_PHASE\" in\n  plan) {} ;;\n  implement)\n    \"$HYPHAE_BIN\" tool write-file notes/impl.txt --content \"by $HYPHAE_MISSION_ID\" > /dev/null || exit 9\n    {} ;;\nesac",
                report(PLAN),
                report(IMPLEMENT)
            ),
        );

        hyphae(dir.path())
            .env("HYPHAE_BIN", env!("CARGO_BIN_EXE_hyphae"))
            .args(["run", "loader", "--approve", "--max-iterations", "2"])
            .assert()
            .success();

        assert_eq!(
            fs::read_to_string(dir.path().join("notes/impl.txt")).unwrap(),
            "by loader"
        );
        let mission = store(&dir).load("loader").unwrap();
        assert_eq!(mission.current_phase, PhasePointer::Active(Phase::Verify));
    }
}
