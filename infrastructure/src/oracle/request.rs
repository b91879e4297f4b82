//! Wire types for the on-demand chat endpoint.
//!
//! Cohere models take a single `message`; every other family takes a
//! role-tagged `messages` list. Replies carry the text either directly
//! (`chatResponse.text`) or inside the first choice.

use serde::{Deserialize, Serialize};
use stepwise_application::ports::oracle_gateway::InferenceRequest;
use stepwise_domain::ModelFamily;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChatDetails<'a> {
    pub compartment_id: &'a str,
    pub serving_mode: ServingMode<'a>,
    pub chat_request: ChatRequest<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ServingMode<'a> {
    pub serving_type: &'static str,
    pub model_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(tag = "apiFormat", rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum ChatRequest<'a> {
    #[serde(rename_all = "camelCase")]
    Cohere {
        message: &'a str,
        max_tokens: u32,
        temperature: f32,
    },
    #[serde(rename_all = "camelCase")]
    Generic {
        messages: Vec<Message<'a>>,
        max_tokens: u32,
        temperature: f32,
    },
}

#[derive(Debug, Serialize)]
pub(crate) struct Message<'a> {
    pub role: &'static str,
    pub content: Vec<TextContent<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TextContent<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
}

impl<'a> ChatDetails<'a> {
    pub fn for_request(compartment_id: &'a str, request: &'a InferenceRequest) -> Self {
        let chat_request = match request.model.family() {
            ModelFamily::Cohere => ChatRequest::Cohere {
                message: &request.prompt,
                max_tokens: request.max_output_tokens,
                temperature: request.temperature,
            },
            ModelFamily::Generic => ChatRequest::Generic {
                messages: vec![Message {
                    role: "USER",
                    content: vec![TextContent {
                        kind: "TEXT",
                        text: &request.prompt,
                    }],
                }],
                max_tokens: request.max_output_tokens,
                temperature: request.temperature,
            },
        };
        Self {
            compartment_id,
            serving_mode: ServingMode {
                serving_type: "ON_DEMAND",
                model_id: request.model.as_str(),
            },
            chat_request,
        }
    }
}

// ==================== Response ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChatResult {
    pub chat_response: ChatResponse,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ChatResponse {
    pub text: Option<String>,
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    #[serde(default)]
    pub message: ChoiceMessage,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChoiceMessage {
    #[serde(default)]
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentPart {
    #[serde(default)]
    pub text: Option<String>,
}

impl ChatResponse {
    /// Completion text, from whichever shape the family replied with
    pub fn into_text(self) -> Option<String> {
        if let Some(text) = self.text {
            return Some(text);
        }
        let choice = self.choices.into_iter().next()?;
        let parts: Vec<String> = choice
            .message
            .content
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(""))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stepwise_domain::ModelId;

    #[test]
    fn test_cohere_body_uses_single_message() {
        let request = InferenceRequest::new(ModelId::reasoning_default(), "plan this")
            .with_max_output_tokens(300);
        let body = serde_json::to_value(ChatDetails::for_request("ocid1.tenancy", &request)).unwrap();

        assert_eq!(
            body,
            json!({
                "compartmentId": "ocid1.tenancy",
                "servingMode": {
                    "servingType": "ON_DEMAND",
                    "modelId": "cohere.command-r-plus-08-2024"
                },
                "chatRequest": {
                    "apiFormat": "COHERE",
                    "message": "plan this",
                    "maxTokens": 300,
                    "temperature": 0.0
                }
            })
        );
    }

    #[test]
    fn test_generic_body_uses_role_tagged_messages() {
        let request = InferenceRequest::new(ModelId::new("xai.grok-4"), "refine this");
        let body = serde_json::to_value(ChatDetails::for_request("c", &request)).unwrap();

        let chat = &body["chatRequest"];
        assert_eq!(chat["apiFormat"], "GENERIC");
        assert_eq!(chat["messages"][0]["role"], "USER");
        assert_eq!(chat["messages"][0]["content"][0]["type"], "TEXT");
        assert_eq!(chat["messages"][0]["content"][0]["text"], "refine this");
        assert_eq!(chat["maxTokens"], 400);
        assert!(chat.get("message").is_none());
    }

    #[test]
    fn test_reply_text_from_either_shape() {
        let cohere: ChatResult =
            serde_json::from_value(json!({"chatResponse": {"text": "{\"a\": 1}", "finishReason": "COMPLETE"}}))
                .unwrap();
        assert_eq!(cohere.chat_response.into_text().as_deref(), Some("{\"a\": 1}"));

        let generic: ChatResult = serde_json::from_value(json!({
            "chatResponse": {
                "choices": [{"message": {"role": "ASSISTANT", "content": [{"type": "TEXT", "text": "ok"}]}}]
            }
        }))
        .unwrap();
        assert_eq!(generic.chat_response.into_text().as_deref(), Some("ok"));

        let empty: ChatResult = serde_json::from_value(json!({"chatResponse": {"choices": []}})).unwrap();
        assert!(empty.chat_response.into_text().is_none());
    }
}
