// src/services/prompt_builder.rs
use serde_json::{Map, Value};

use crate::message::{CompletionMessage, Role};

/// Company fields read from request `meta`, each with a primary key and a
/// fallback alias.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyProfile {
    pub company: String,
    pub values: String,
    pub tone: String,
}

impl CompanyProfile {
    pub fn from_meta(meta: &Map<String, Value>) -> Self {
        Self {
            company: pick(meta, "companyName", "company"),
            values: pick(meta, "companyValues", "values"),
            tone: pick(meta, "botTone", "tone"),
        }
    }

    /// Blank fields render as empty substitutions; the sentence is never shortened.
    pub fn system_prompt(&self) -> String {
        format!(
            "You are an AI assistant for {}. The company's values are: {}. \
             Please answer with a {} tone, and help users as if you represent this business.",
            self.company, self.values, self.tone
        )
    }
}

fn pick(meta: &Map<String, Value>, primary: &str, fallback: &str) -> String {
    [primary, fallback]
        .into_iter()
        .find_map(|key| meta.get(key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

/// Keeps a history entry only when it carries a string `role` and a `content`.
fn history_entry(entry: &Value) -> Option<CompletionMessage> {
    let obj = entry.as_object()?;
    let role = obj.get("role")?.as_str()?;
    let content = match obj.get("content")? {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Some(CompletionMessage::new(Role::from(role), content))
}

/// Assembles `[system, ..history, user]` for the completion service.
pub fn build(meta: &Map<String, Value>, history: &[Value], message: &str) -> Vec<CompletionMessage> {
    let profile = CompanyProfile::from_meta(meta);

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(CompletionMessage::system(profile.system_prompt()));
    messages.extend(history.iter().filter_map(history_entry));
    messages.push(CompletionMessage::user(message));
    messages
}
