//! Converts a [`ProviderRequest`] into a chat-completions request.
//!
//! Conversation messages do not persist provider call ids, so prior
//! call/result pairs are rebuilt with synthetic ids: call `i` of model message
//! `m` gets `call_{m}_{i}`, and the tool results that follow `m` take those ids
//! in order. The ids are never checked against what a backend returned; a
//! backend that reorders or drops calls can desynchronize results.

use tracing::warn;

use arbor_core::messages::{ChatMessage, Role};
use arbor_core::tools::ToolDeclaration;

use crate::provider::ProviderRequest;

use super::types::{
    ChatMessageParam, ChatRequest, ContentPart, FunctionCallParam, FunctionDef, ImageUrl,
    ToolCallParam, ToolParam, UserContent,
};

/// Synthetic call id for call `index` of `message`.
#[must_use]
pub fn synthetic_call_id(message: &ChatMessage, index: usize) -> String {
    format!("call_{}_{index}", message.id)
}

/// Build the full request body.
pub fn build_request(request: &ProviderRequest) -> ChatRequest {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if !request.system_instruction.trim().is_empty() {
        messages.push(ChatMessageParam::System {
            content: request.system_instruction.clone(),
        });
    }
    messages.extend(convert_messages(request));

    ChatRequest {
        model: request.model.clone(),
        messages,
        stream: true,
        temperature: request.temperature,
        tools: convert_tools(&request.tools),
    }
}

/// Convert history, reconstructing call/result pairing.
pub fn convert_messages(request: &ProviderRequest) -> Vec<ChatMessageParam> {
    let last_user = request.messages.iter().rposition(|m| m.role == Role::User);
    let mut out = Vec::with_capacity(request.messages.len());

    // Ids of the most recent call batch, consumed by following tool results.
    let mut pending: Vec<(String, String)> = Vec::new();
    let mut next_result = 0usize;

    for (i, message) in request.messages.iter().enumerate() {
        match message.role {
            Role::User => {
                let image = (Some(i) == last_user).then_some(request.image.as_ref()).flatten();
                let content = match image {
                    Some(image) => UserContent::Parts(vec![
                        ContentPart::Text {
                            text: message.content.clone(),
                        },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl {
                                url: format!("data:{};base64,{}", image.mime_type, image.data),
                            },
                        },
                    ]),
                    None => UserContent::Text(message.content.clone()),
                };
                out.push(ChatMessageParam::User { content });
            }
            Role::Model => {
                let tool_calls: Vec<ToolCallParam> = message
                    .calls()
                    .iter()
                    .enumerate()
                    .map(|(idx, call)| ToolCallParam {
                        id: synthetic_call_id(message, idx),
                        kind: "function",
                        function: FunctionCallParam {
                            name: call.name.clone(),
                            arguments: serde_json::Value::Object(call.args.clone()).to_string(),
                        },
                    })
                    .collect();
                if message.content.is_empty() && tool_calls.is_empty() {
                    continue;
                }
                pending = tool_calls
                    .iter()
                    .map(|tc| (tc.id.clone(), tc.function.name.clone()))
                    .collect();
                next_result = 0;
                out.push(ChatMessageParam::Assistant {
                    content: (!message.content.is_empty()).then(|| message.content.clone()),
                    tool_calls,
                });
            }
            Role::Tool => {
                let Some(response) = &message.tool_response else {
                    continue;
                };
                let tool_call_id = match pending.get(next_result) {
                    Some((id, name)) => {
                        if name != &response.name {
                            warn!(
                                expected = %name,
                                actual = %response.name,
                                tool_call_id = %id,
                                "tool result name does not match the call it is paired with"
                            );
                        }
                        id.clone()
                    }
                    None => {
                        warn!(tool_name = %response.name, "tool result without a preceding call");
                        format!("call_{}_{next_result}", message.id)
                    }
                };
                next_result += 1;
                out.push(ChatMessageParam::Tool {
                    tool_call_id,
                    content: response.result.clone(),
                });
            }
            Role::System => {}
        }
    }

    out
}

/// Reshape the catalog; the search capability has no equivalent and is dropped.
pub fn convert_tools(tools: &[ToolDeclaration]) -> Vec<ToolParam> {
    tools
        .iter()
        .filter_map(|tool| match tool {
            ToolDeclaration::Function {
                name,
                description,
                parameters,
            } => Some(ToolParam {
                kind: "function",
                function: FunctionDef {
                    name: name.clone(),
                    description: description.clone(),
                    parameters: parameters.clone(),
                },
            }),
            ToolDeclaration::Search => None,
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
