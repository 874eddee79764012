use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};

use chrono::Utc;
use serde::Serialize;

use crate::{
    domain::UserId,
    errors::Error,
    executor::{ExecutionResult, Outcome},
    registry::CommandId,
    Result,
};

const AUDIT_MAX_TEXT: usize = 500;

#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event: String,
    pub user_id: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl AuditEvent {
    fn base(event: &str, user_id: UserId) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            event: event.to_string(),
            user_id: user_id.0,
            command: None,
            input: None,
            outcome: None,
            response: None,
            elapsed_ms: None,
            content: None,
        }
    }

    pub fn execution(
        user_id: UserId,
        command: CommandId,
        input: &str,
        result: &ExecutionResult,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            command: Some(command.as_str().to_string()),
            input: Some(input.to_string()),
            outcome: Some(result.outcome),
            response: Some(result.message.clone()),
            elapsed_ms: Some(elapsed_ms),
            ..Self::base("execution", user_id)
        }
    }

    pub fn bootstrap(user_id: UserId, name: &str) -> Self {
        Self {
            command: Some(name.to_string()),
            ..Self::base("bootstrap", user_id)
        }
    }

    pub fn unrecognized(user_id: UserId, content: &str) -> Self {
        Self {
            content: Some(content.to_string()),
            ..Self::base("unrecognized", user_id)
        }
    }
}

/// Append-only audit trail, one record per handled event.
#[derive(Debug)]
pub struct AuditLogger {
    path: PathBuf,
    json: bool,
    write_lock: Mutex<()>,
}

impl AuditLogger {
    pub fn new(path: impl Into<PathBuf>, json: bool) -> Self {
        Self {
            path: path.into(),
            json,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, mut event: AuditEvent) -> Result<()> {
        if let Some(s) = &event.content {
            event.content = Some(truncate_text(s, AUDIT_MAX_TEXT));
        }
        if let Some(s) = &event.response {
            event.response = Some(truncate_text(s, AUDIT_MAX_TEXT));
        }

        let record = if self.json {
            let mut line = serde_json::to_string(&event)?;
            line.push('\n');
            line
        } else {
            render_plain(&event)?
        };

        // Concurrent events must not interleave within a record.
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(record.as_bytes())?;
        Ok(())
    }
}

fn render_plain(event: &AuditEvent) -> Result<String> {
    let mut out = String::new();
    out.push('\n');
    out.push_str(&"=".repeat(60));

    let value = serde_json::to_value(event)?;
    let Some(obj) = value.as_object() else {
        return Err(Error::External(
            "audit event is not a JSON object".to_string(),
        ));
    };
    for (k, v) in obj {
        out.push('\n');
        out.push_str(k);
        out.push_str(": ");
        out.push_str(&json_value_to_display(v));
    }
    out.push('\n');
    Ok(out)
}

pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len).collect::<String>();
    out.push_str("...");
    out
}

fn json_value_to_display(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| "<unprintable>".to_string()),
    }
}
