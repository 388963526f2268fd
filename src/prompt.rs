//! Prompt assembly for phase agents.
//!
//! A prompt is built from, in order:
//! 1. role instructions for the phase (or `.hyphae/agents/<phase>.md`)
//! 2. `.hyphae/CONTRACT.md` when present
//! 3. the mission artifact as YAML
//! 4. the `hyphae tool` commands available to the agent
//! 5. the report format the phase must answer with

use std::path::{Path, PathBuf};

use crate::mission::Mission;
use crate::phase::Phase;

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    agents_dir: PathBuf,
    contract_file: PathBuf,
}

impl PromptBuilder {
    pub fn new(agents_dir: impl Into<PathBuf>, contract_file: impl Into<PathBuf>) -> Self {
        Self {
            agents_dir: agents_dir.into(),
            contract_file: contract_file.into(),
        }
    }

    pub fn build(&self, mission: &Mission, phase: Phase, iteration: u32) -> String {
        let role = read_optional(&self.agents_dir.join(format!("{}.md", phase)))
            .unwrap_or_else(|| default_role(phase).to_string());

        let contract = read_optional(&self.contract_file)
            .map(|c| format!("\n## CONTRACT\n{}\n", c.trim()))
            .unwrap_or_default();

        let artifact = serde_yaml::to_string(mission)
            .unwrap_or_else(|e| format!("[ERROR: Could not render mission artifact: {}]", e));

        format!(
            r#"{role}
{contract}
## MISSION
Mission id: {id}
Phase: {phase} (iteration {iteration})
Test rigor: {rigor}

```yaml
{artifact}```

## TOOLS
{tools}

## REPORT FORMAT
End your answer with a YAML report wrapped in <report></report> tags.
{format}
"#,
            role = role.trim(),
            contract = contract,
            id = mission.id,
            phase = phase,
            iteration = iteration,
            rigor = mission.test_rigor,
            artifact = artifact,
            tools = TOOLS_HELP,
            format = report_format(phase),
        )
    }
}

const TOOLS_HELP: &str = "\
`hyphae tool` works on the project and prints JSON:
- `hyphae tool read-progress` shows this mission's artifact
- `hyphae tool list-files [dir]`, `hyphae tool read-file <path>`
- `hyphae tool search <pattern> [--glob '*.rs'] [--regex]`
- `hyphae tool write-file <path>` (content on stdin) and `hyphae tool run-command '<cmd>'`
  need operator approval during the implement phase unless the run is auto-approved.
The mission artifact is written by hyphae from your report; do not edit it.";

fn read_optional(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(content) if !content.trim().is_empty() => Some(content),
        Ok(_) => None,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read prompt file");
            None
        }
    }
}

fn default_role(phase: Phase) -> &'static str {
    match phase {
        Phase::Plan => {
            "You are the planner. Study the mission objective, scope and constraints, \
then produce acceptance criteria and an ordered list of steps. Every step needs \
an expected outcome that can be checked. Do not modify code."
        }
        Phase::Implement => {
            "You are the implementer. Carry out the planned steps, fixing anything the \
verifier listed under required_fixes. Run the commands needed to build and test \
your change and record each command with its result."
        }
        Phase::Verify => {
            "You are the verifier. Check the implementation against every acceptance \
criterion without modifying code. Run the tests the mission's test rigor calls \
for. Give an explicit PASS or FAIL verdict and list required fixes on FAIL."
        }
        Phase::Finalize => {
            "You are the maintainer. Review the verified change for cleanup only: \
naming, comments, dead code. Confirm explicitly whether behaviour is unchanged \
and propose a commit message."
        }
    }
}

fn report_format(phase: Phase) -> &'static str {
    match phase {
        Phase::Plan => {
            r#"```yaml
summary: <one paragraph>
acceptance_criteria:
  - <criterion>
steps:
  - description: <step>
    expected_outcome: <how to tell it worked>
open_issues: []
```"#
        }
        Phase::Implement => {
            r#"```yaml
summary: <what changed>
commands:
  - command: <command you ran>
    result: <what it printed or returned>
    exit_code: 0
outputs: [<files or artifacts produced>]
open_issues: []
```"#
        }
        Phase::Verify => {
            r#"```yaml
summary: <findings>
verdict: PASS | FAIL
acceptance_criteria:
  - description: <criterion>
    status: PASS | FAIL | UNKNOWN
commands:
  - command: <test command>
    result: <outcome>
required_fixes: []
```"#
        }
        Phase::Finalize => {
            r#"```yaml
summary: <cleanup performed>
behavior_unchanged: true | false
commit_message: <conventional commit message>
open_issues: []
```"#
        }
    }
}
