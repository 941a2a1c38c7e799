//! Actions the act model can choose between steps.

use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// The next concrete action, chosen by the act-role model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AgentAction {
    /// Invoke a web search tool with a query.
    CallTool {
        /// Tool name the model asked for (e.g., "web_search").
        name: String,
        /// Search query.
        query: String,
    },
    /// Invoke the vision-role model.
    CallVision {
        /// What to look for or describe.
        instruction: String,
        /// Reference to the image being inspected, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_ref: Option<String>,
    },
    /// Emit the final answer and finish the task.
    EmitAnswer {
        /// Final answer text.
        answer: String,
    },
    /// Request a fresh plan.
    Replan {
        /// Why the current plan is blocked.
        reason: String,
    },
}

impl AgentAction {
    /// Parses an action from the act model's raw reply.
    ///
    /// Tolerates markdown code fences and surrounding prose by extracting
    /// the outermost JSON object.
    pub fn parse(raw: &str) -> Result<Self, AgentError> {
        let json = extract_json_object(raw)
            .ok_or_else(|| AgentError::MalformedAction(format!("no JSON object in: {raw}")))?;
        serde_json::from_str(json)
            .map_err(|e| AgentError::MalformedAction(format!("{e} in: {json}")))
    }
}

/// Returns the substring spanning the first '{' to the last '}'.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_call_tool() {
        let action = AgentAction::parse(r#"{"action":"call_tool","name":"web_search","query":"rust release date"}"#)
            .expect("parse");
        assert_eq!(
            action,
            AgentAction::CallTool {
                name: "web_search".to_string(),
                query: "rust release date".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_emit_answer_with_code_fence() {
        let raw = "Here is my decision:\n```json\n{\"action\":\"emit_answer\",\"answer\":\"42\"}\n```";
        let action = AgentAction::parse(raw).expect("parse");
        assert_eq!(
            action,
            AgentAction::EmitAnswer {
                answer: "42".to_string()
            }
        );
    }

    #[test]
    fn test_parse_call_vision_without_image_ref() {
        let action =
            AgentAction::parse(r#"{"action":"call_vision","instruction":"describe the chart"}"#)
                .expect("parse");
        assert_eq!(
            action,
            AgentAction::CallVision {
                instruction: "describe the chart".to_string(),
                image_ref: None,
            }
        );
    }

    #[test]
    fn test_parse_replan() {
        let action = AgentAction::parse(r#"{"action":"replan","reason":"search found nothing"}"#)
            .expect("parse");
        assert!(matches!(action, AgentAction::Replan { .. }));
    }

    #[test]
    fn test_parse_rejects_prose() {
        let err = AgentAction::parse("I think we should search the web").unwrap_err();
        assert!(matches!(err, AgentError::MalformedAction(_)));
    }

    #[test]
    fn test_parse_rejects_unknown_action() {
        let err = AgentAction::parse(r#"{"action":"dance"}"#).unwrap_err();
        assert!(matches!(err, AgentError::MalformedAction(_)));
    }
}
