//! Conversation log types: messages and the tool invocations they carry.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::candidate::{candidates_from_value, TransactionCandidate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// The only tool the assistant may call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolName {
    #[serde(rename = "propose_transaction")]
    ProposeTransaction,
}

/// A tool-call announcement, as carried by a `9:` frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(rename = "toolCallId")]
    pub id: String,
    #[serde(rename = "toolName")]
    pub name: ToolName,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationState {
    Call,
    Result,
}

/// A tool invocation. Moves from `Call` to `Result` only.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    Call(ToolCall),
    Result { call: ToolCall, result: Value },
}

impl ToolInvocation {
    pub fn id(&self) -> &str {
        &self.call().id
    }

    pub fn call(&self) -> &ToolCall {
        match self {
            ToolInvocation::Call(call) | ToolInvocation::Result { call, .. } => call,
        }
    }

    pub fn state(&self) -> InvocationState {
        match self {
            ToolInvocation::Call(_) => InvocationState::Call,
            ToolInvocation::Result { .. } => InvocationState::Result,
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match self {
            ToolInvocation::Result { result, .. } => Some(result),
            ToolInvocation::Call(_) => None,
        }
    }

    /// Proposed candidates; always empty while the call is pending.
    pub fn proposals(&self) -> Vec<TransactionCandidate> {
        self.result().map(candidates_from_value).unwrap_or_default()
    }
}

impl Serialize for ToolInvocation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Wire<'a> {
            tool_call_id: &'a str,
            tool_name: ToolName,
            args: &'a Value,
            state: InvocationState,
            #[serde(skip_serializing_if = "Option::is_none")]
            result: Option<&'a Value>,
        }

        let call = self.call();
        Wire {
            tool_call_id: &call.id,
            tool_name: call.name,
            args: &call.args,
            state: self.state(),
            result: self.result(),
        }
        .serialize(serializer)
    }
}

/// Invocations of one message, in announcement order, keyed by `toolCallId`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct ToolInvocations {
    items: Vec<ToolInvocation>,
}

impl ToolInvocations {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolInvocation> {
        self.items.iter()
    }

    pub fn get(&self, id: &str) -> Option<&ToolInvocation> {
        self.items.iter().find(|inv| inv.id() == id)
    }

    /// Register a pending call. Returns false if the id is already known.
    pub fn announce(&mut self, call: ToolCall) -> bool {
        if self.get(&call.id).is_some() {
            return false;
        }
        self.items.push(ToolInvocation::Call(call));
        true
    }

    /// Complete a pending call. Unknown ids and already-completed calls are ignored.
    pub fn resolve(&mut self, id: &str, result: Value) -> bool {
        let Some(slot) = self.items.iter_mut().find(|inv| inv.id() == id) else {
            return false;
        };
        let ToolInvocation::Call(call) = slot else {
            return false;
        };
        let call = call.clone();
        *slot = ToolInvocation::Result { call, result };
        true
    }

    /// Insert an already-completed invocation (locally produced proposals).
    pub fn push_result(&mut self, call: ToolCall, result: Value) {
        if self.get(&call.id).is_none() {
            self.items.push(ToolInvocation::Result { call, result });
        }
    }

    /// Drop every call still waiting for its result. Returns how many were dropped.
    pub fn discard_pending(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|inv| inv.state() == InvocationState::Result);
        before - self.items.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "ToolInvocations::is_empty")]
    pub tool_invocations: ToolInvocations,
}

impl ConversationMessage {
    pub fn user(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::User,
            content: content.into(),
            tool_invocations: ToolInvocations::default(),
        }
    }

    pub fn assistant(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Assistant,
            content: content.into(),
            tool_invocations: ToolInvocations::default(),
        }
    }

    /// Append a text delta verbatim
    pub fn push_delta(&mut self, delta: &str) {
        self.content.push_str(delta);
    }

    /// Append a fallback line, newline-separated from existing content
    pub fn push_line(&mut self, line: &str) {
        if !self.content.is_empty() {
            self.content.push('\n');
        }
        self.content.push_str(line);
    }

    /// No text and no tool invocations
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty() && self.tool_invocations.is_empty()
    }

    /// Candidates from completed invocations only
    pub fn proposals(&self) -> Vec<TransactionCandidate> {
        self.tool_invocations
            .iter()
            .flat_map(ToolInvocation::proposals)
            .collect()
    }
}
