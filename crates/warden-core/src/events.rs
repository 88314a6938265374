//! Host lifecycle payloads.
//!
//! The host calls Warden at four extension points and passes one of the
//! event types below. Field names are camelCase on the wire.

use serde::{Deserialize, Serialize};

/// Cache key used when an event names neither a session nor a conversation.
pub const DEFAULT_SESSION_KEY: &str = "default";

/// Events scoped to a conversation.
pub trait SessionScoped {
    /// Host session key.
    fn session_key(&self) -> Option<&str>;

    /// Host conversation id.
    fn conversation_id(&self) -> Option<&str>;

    /// Key under which this conversation's verdict is cached.
    fn cache_key(&self) -> String {
        self.session_key()
            .filter(|key| !key.is_empty())
            .or(self.conversation_id().filter(|id| !id.is_empty()))
            .unwrap_or(DEFAULT_SESSION_KEY)
            .to_string()
    }
}

macro_rules! session_scoped {
    ($($event:ty),+ $(,)?) => {
        $(
            impl SessionScoped for $event {
                fn session_key(&self) -> Option<&str> {
                    self.session_key.as_deref()
                }

                fn conversation_id(&self) -> Option<&str> {
                    self.conversation_id.as_deref()
                }
            }
        )+
    };
}

/// A message arrived from the user or a channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InboundEvent {
    /// Message text.
    pub content: String,
    /// Sender identifier, when the channel provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    /// Host session key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
    /// Host conversation id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// The agent is about to process a prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentStartEvent {
    /// Prompt text the agent will see.
    pub prompt: String,
    /// Host session key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
    /// Host conversation id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// The agent wants to invoke a tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolCallEvent {
    /// Tool name.
    pub tool_name: String,
    /// Tool arguments.
    pub params: serde_json::Value,
    /// Host session key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
    /// Host conversation id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// The agent is about to send a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutboundEvent {
    /// Message text.
    pub content: String,
    /// Recipient, when the channel provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Host session key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
    /// Host conversation id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

session_scoped!(InboundEvent, AgentStartEvent, ToolCallEvent, OutboundEvent);

/// Text to prepend to the agent's context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextInjection {
    /// Warning text.
    pub prepend_context: String,
}

/// Tool gating result returned to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallDecision {
    /// Stop the call.
    pub block: bool,
    /// Why.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

/// Replacement for an outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundModification {
    /// Text to send instead.
    pub content: String,
    /// Drop the message entirely.
    pub cancel: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_precedence() {
        let mut event = InboundEvent {
            content: "hi".to_string(),
            session_key: Some("sess".to_string()),
            conversation_id: Some("conv".to_string()),
            ..InboundEvent::default()
        };
        assert_eq!(event.cache_key(), "sess");

        event.session_key = None;
        assert_eq!(event.cache_key(), "conv");

        event.conversation_id = Some(String::new());
        assert_eq!(event.cache_key(), DEFAULT_SESSION_KEY);
    }

    #[test]
    fn test_wire_names_are_camel_case() {
        let decision = ToolCallDecision {
            block: true,
            block_reason: Some("no".to_string()),
        };
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["blockReason"], "no");

        let json = serde_json::to_value(ContextInjection {
            prepend_context: "warn".to_string(),
        })
        .unwrap();
        assert_eq!(json["prependContext"], "warn");
    }

    #[test]
    fn test_event_from_host_json() {
        let event: ToolCallEvent = serde_json::from_str(
            r#"{"toolName":"Bash","params":{"command":"ls"},"sessionKey":"s1"}"#,
        )
        .unwrap();
        assert_eq!(event.tool_name, "Bash");
        assert_eq!(event.cache_key(), "s1");
    }
}
