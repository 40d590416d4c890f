//! Converts a [`ProviderRequest`] into a Gemini request body.
//!
//! - user messages become `user` contents; the image rides on the last one
//! - model messages become `model` contents with text and `functionCall` parts
//! - consecutive tool results merge into one `user` content of
//!   `functionResponse` parts, matching the call batch they answer
//! - system notices are not sent

use serde_json::json;

use arbor_core::messages::{ChatMessage, Role};
use arbor_core::tools::ToolDeclaration;

use crate::provider::ProviderRequest;

use super::types::{
    FunctionCallData, FunctionDeclaration, FunctionResponseData, GeminiContent, GeminiPart,
    GeminiRequest, GeminiTool, GenerationConfig, InlineDataContent, SystemInstruction, SystemPart,
    ThinkingConfig, supports_thinking,
};

/// Build the full request body.
pub fn build_request(request: &ProviderRequest) -> GeminiRequest {
    let system_instruction = (!request.system_instruction.trim().is_empty()).then(|| {
        SystemInstruction {
            parts: vec![SystemPart {
                text: request.system_instruction.clone(),
            }],
        }
    });

    let thinking_config = supports_thinking(&request.model).then_some(ThinkingConfig {
        include_thoughts: true,
    });

    GeminiRequest {
        contents: convert_messages(request),
        system_instruction,
        tools: convert_tools(&request.tools),
        generation_config: GenerationConfig {
            temperature: request.temperature,
            thinking_config,
        },
    }
}

/// Convert history to Gemini contents.
pub fn convert_messages(request: &ProviderRequest) -> Vec<GeminiContent> {
    let last_user = request.messages.iter().rposition(|m| m.role == Role::User);
    let mut contents: Vec<GeminiContent> = Vec::new();

    for (i, message) in request.messages.iter().enumerate() {
        match message.role {
            Role::User => {
                let mut parts = Vec::new();
                if !message.content.is_empty() {
                    parts.push(text_part(&message.content));
                }
                if Some(i) == last_user {
                    if let Some(image) = &request.image {
                        parts.push(GeminiPart::InlineData {
                            inline_data: InlineDataContent {
                                mime_type: image.mime_type.clone(),
                                data: image.data.clone(),
                            },
                        });
                    }
                }
                if !parts.is_empty() {
                    contents.push(GeminiContent {
                        role: "user".into(),
                        parts,
                    });
                }
            }
            Role::Model => {
                let parts = model_parts(message);
                if !parts.is_empty() {
                    contents.push(GeminiContent {
                        role: "model".into(),
                        parts,
                    });
                }
            }
            Role::Tool => {
                let Some(response) = &message.tool_response else {
                    continue;
                };
                let part = GeminiPart::FunctionResponse {
                    function_response: FunctionResponseData {
                        name: response.name.clone(),
                        response: json!({ "result": response.result }),
                    },
                };
                match contents.last_mut() {
                    Some(last) if last.role == "user" && is_function_response(last) => {
                        last.parts.push(part);
                    }
                    _ => contents.push(GeminiContent {
                        role: "user".into(),
                        parts: vec![part],
                    }),
                }
            }
            Role::System => {}
        }
    }

    contents
}

fn model_parts(message: &ChatMessage) -> Vec<GeminiPart> {
    let mut parts = Vec::new();
    if !message.content.is_empty() {
        parts.push(text_part(&message.content));
    }
    for call in message.calls() {
        parts.push(GeminiPart::FunctionCall {
            function_call: FunctionCallData {
                name: call.name.clone(),
                args: serde_json::Value::Object(call.args.clone()),
            },
        });
    }
    parts
}

fn text_part(text: &str) -> GeminiPart {
    GeminiPart::Text {
        text: text.to_owned(),
        thought: None,
    }
}

fn is_function_response(content: &GeminiContent) -> bool {
    content
        .parts
        .iter()
        .all(|p| matches!(p, GeminiPart::FunctionResponse { .. }))
}

/// Convert the catalog: functions grouped into one entry, search as its own.
pub fn convert_tools(tools: &[ToolDeclaration]) -> Vec<GeminiTool> {
    let mut declarations = Vec::new();
    let mut search = false;
    for tool in tools {
        match tool {
            ToolDeclaration::Function {
                name,
                description,
                parameters,
            } => declarations.push(FunctionDeclaration {
                name: name.clone(),
                description: description.clone(),
                parameters: parameters.clone(),
            }),
            ToolDeclaration::Search => search = true,
        }
    }

    let mut out = Vec::new();
    if !declarations.is_empty() {
        out.push(GeminiTool::Functions {
            function_declarations: declarations,
        });
    }
    if search {
        out.push(GeminiTool::Search {
            google_search: json!({}),
        });
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
