use serde::Deserialize;
use serde_json::Value;

use super::Usage;

/// Events from the agent CLI's stream-json output format
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    #[serde(rename = "assistant")]
    Assistant { message: AssistantMessage },

    #[serde(rename = "result")]
    Result {
        #[serde(default)]
        subtype: String,
        #[serde(default)]
        result: Option<String>,
        #[serde(default)]
        is_error: bool,
        #[serde(default)]
        usage: Option<TokenUsage>,
        #[serde(default)]
        total_cost_usd: Option<f64>,
    },

    #[serde(rename = "system")]
    System {
        #[serde(default)]
        subtype: String,
    },

    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_use")]
    ToolUse {
        name: String,
        #[serde(default)]
        input: Value,
    },

    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_creation_input_tokens: u64,
    #[serde(default)]
    pub cache_read_input_tokens: u64,
}

/// Everything the orchestrator needs from one agent transcript.
#[derive(Debug, Default)]
pub struct Transcript {
    /// Assistant text plus any lines that were not stream events
    pub text: String,
    /// Final `result` payload, when the agent emitted one
    pub result: Option<String>,
    pub is_error: bool,
    pub usage: Usage,
    /// Cost reported by the agent itself
    pub reported_cost_usd: Option<f64>,
}

impl Transcript {
    /// Text to search for the phase report: the final result if present.
    pub fn report_source(&self) -> &str {
        self.result.as_deref().unwrap_or(&self.text)
    }
}

/// Parse agent stdout.
///
/// Lines that are not stream-json events are kept as plain text, so agents
/// that print their report directly work too.
pub fn parse_transcript(output: &str) -> Transcript {
    let mut transcript = Transcript::default();

    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<StreamEvent>(line) {
            Ok(StreamEvent::Assistant { message }) => {
                for block in message.content {
                    match block {
                        ContentBlock::Text { text } => {
                            transcript.text.push_str(&text);
                            transcript.text.push('\n');
                        }
                        ContentBlock::ToolUse { name, input } => {
                            tracing::debug!(tool = %name, input = %input, "Agent tool use");
                        }
                        ContentBlock::Other => {}
                    }
                }
            }
            Ok(StreamEvent::Result {
                subtype,
                result,
                is_error,
                usage,
                total_cost_usd,
            }) => {
                tracing::debug!(subtype = %subtype, is_error, "Agent result event");
                transcript.result = result;
                transcript.is_error = is_error;
                if let Some(usage) = usage {
                    transcript.usage = Usage {
                        prompt_tokens: usage.input_tokens
                            + usage.cache_creation_input_tokens
                            + usage.cache_read_input_tokens,
                        completion_tokens: usage.output_tokens,
                    };
                }
                transcript.reported_cost_usd = total_cost_usd;
            }
            Ok(StreamEvent::System { .. }) | Ok(StreamEvent::Other) => {}
            Err(_) => {
                transcript.text.push_str(line);
                transcript.text.push('\n');
            }
        }
    }

    transcript
}
