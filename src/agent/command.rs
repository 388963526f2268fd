use std::path::PathBuf;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::stream::parse_transcript;
use super::{AgentResponse, PhaseAgent, PhaseReport, PhaseRequest};
use crate::errors::AgentError;

/// Placeholder in agent args replaced by the configured model.
pub const MODEL_PLACEHOLDER: &str = "{model}";

/// Runs an agent CLI once per phase iteration.
///
/// The prompt is written to stdin. The child also sees `HYPHAE_MISSION_ID`,
/// `HYPHAE_PHASE`, `HYPHAE_ITERATION` and `HYPHAE_MODEL` in its environment,
/// plus `HYPHAE_AUTO_APPROVE=1` when the run is auto-approved so that
/// `hyphae tool` calls made by the agent inherit it.
#[derive(Debug, Clone)]
pub struct CommandAgent {
    cmd: String,
    args: Vec<String>,
    working_dir: PathBuf,
    timeout: Duration,
    auto_approve: bool,
}

impl CommandAgent {
    pub fn new(cmd: &str, args: Vec<String>, working_dir: PathBuf, timeout: Duration) -> Self {
        Self {
            cmd: cmd.to_string(),
            args,
            working_dir,
            timeout,
            auto_approve: false,
        }
    }

    pub fn with_auto_approve(mut self, auto_approve: bool) -> Self {
        self.auto_approve = auto_approve;
        self
    }

    fn args_for(&self, model: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(MODEL_PLACEHOLDER, model))
            .collect()
    }

    async fn run(&self, request: &PhaseRequest) -> Result<(bool, String, String), AgentError> {
        let launch_error = |e: std::io::Error| AgentError::Launch {
            cmd: self.cmd.clone(),
            message: e.to_string(),
        };

        let mut command = Command::new(&self.cmd);
        if self.auto_approve {
            command.env("HYPHAE_AUTO_APPROVE", "1");
        } else {
            command.env_remove("HYPHAE_AUTO_APPROVE");
        }
        let mut child = command
            .args(self.args_for(&request.model))
            .env("HYPHAE_MISSION_ID", &request.mission_id)
            .env("HYPHAE_PHASE", request.phase.as_str())
            .env("HYPHAE_ITERATION", request.iteration.to_string())
            .env("HYPHAE_MODEL", &request.model)
            .current_dir(&self.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(launch_error)?;

        tracing::debug!(
            cmd = %self.cmd,
            pid = child.id().unwrap_or(0),
            prompt_chars = request.prompt.len(),
            "Spawned agent"
        );

        // The prompt is fed while the output is drained, and both count against
        // the timeout. Dropping the child on expiry kills it.
        let stdin = child.stdin.take();
        let prompt = request.prompt.as_bytes();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                // An agent that exits without reading its prompt closes the pipe early.
                if let Err(e) = stdin.write_all(prompt).await {
                    tracing::debug!(error = %e, "Agent closed stdin early");
                }
            }
        };
        let exchange = async move {
            let ((), output) = tokio::join!(feed, child.wait_with_output());
            output
        };

        let output = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| AgentError::Timeout {
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| AgentError::Transient(format!("failed to collect agent output: {}", e)))?;

        Ok((
            output.status.success(),
            String::from_utf8_lossy(&output.stdout).into_owned(),
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ))
    }
}

#[async_trait]
impl PhaseAgent for CommandAgent {
    async fn execute(&self, request: &PhaseRequest) -> Result<AgentResponse, AgentError> {
        let (success, stdout, stderr) = self.run(request).await?;
        let transcript = parse_transcript(&stdout);

        if !success || transcript.is_error {
            let detail = [stderr.trim(), transcript.report_source().trim()]
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            return Err(classify_failure(&detail));
        }

        let report = PhaseReport::extract(transcript.report_source())?;
        let cost_usd = transcript
            .reported_cost_usd
            .unwrap_or_else(|| transcript.usage.estimated_cost_usd());

        Ok(AgentResponse {
            report,
            usage: transcript.usage,
            cost_usd,
        })
    }
}

static RATE_LIMIT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)rate[ _-]?limit|too many requests|overloaded|\b429\b").expect("rate limit regex")
});

static NETWORK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)connection (reset|refused|closed|aborted)|timed out|timeout|network|broken pipe|temporarily|unavailable|\b50[0-4]\b",
    )
    .expect("network regex")
});

static AUTH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)unauthorized|forbidden|authentication|api key|invalid x-api-key|\b40[13]\b")
        .expect("auth regex")
});

static BAD_REQUEST_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)bad request|invalid[ _]request|\b400\b").expect("bad request regex")
});

/// Map the text of a failed agent run to an error class.
///
/// Status codes only count as whole words, and transient network wording wins
/// over client-error wording.
pub fn classify_failure(detail: &str) -> AgentError {
    let message = truncate(detail, 500);

    if RATE_LIMIT_REGEX.is_match(detail) {
        AgentError::RateLimited(message)
    } else if NETWORK_REGEX.is_match(detail) {
        AgentError::Transient(message)
    } else if AUTH_REGEX.is_match(detail) {
        AgentError::Authentication(message)
    } else if BAD_REQUEST_REGEX.is_match(detail) {
        AgentError::BadRequest(message)
    } else if message.is_empty() {
        AgentError::Transient("agent exited with an error and no output".to_string())
    } else {
        AgentError::Transient(message)
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}
