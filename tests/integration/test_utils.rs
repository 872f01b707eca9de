//! Shared fixtures for integration tests
//!
//! Manifests used across modules, plus an environment guard for tests that touch
//! process-wide variables.

use agentspec::manifest::{parse_str, Manifest};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Serializes tests that read or write environment variables.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

pub const SUPPORT_AGENT: &str = r#"
apiVersion: agentspec/v0.4.0
kind: Agent
metadata:
  name: support-bot
  version: 1.0.0
  description: Answers customer support tickets
spec:
  role: You answer customer support questions.
  llm:
    provider: anthropic
    model: claude-sonnet-4
    temperature: 0.2
  tools:
    - type: http
      name: lookup_order
      endpoint: https://orders.example.com/api
      method: GET
  state:
    strategy: window
    window: 12
  policies:
    budget:
      maxTokensPerDay: 200000
    limits:
      maxTurns: 6
      timeoutSeconds: 45
"#;

pub const LEGACY_AGENT: &str = r#"
apiVersion: agentspec/v0.2.0
kind: Agent
metadata:
  name: legacy-helper
spec:
  role: Helps with legacy things.
  llm:
    provider: openai
    model: gpt-4o
  tools:
    - type: api
      name: fetch_status
      endpoint: https://status.example.com
  memory:
    type: window
    maxMessages: 20
  autonomy:
    level: medium
    approvalRequired: true
  constraints:
    cost:
      maxTokensPerDay: 50000
    performance:
      timeoutSeconds: 30
"#;

pub const NIGHTLY_TASK: &str = r#"
apiVersion: agentspec/v0.4.0
kind: Task
metadata:
  name: nightly-report
spec:
  steps:
    - name: collect
      action: fetch_metrics
    - name: summarize
      action: write_summary
  timeoutSeconds: 600
"#;

pub fn manifest(yaml: &str) -> Manifest {
    parse_str(yaml, None).unwrap()
}

/// Write `content` to `dir/name` and return the path.
pub fn write_manifest(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

/// Environment variables set for the duration of a test, restored on drop.
pub struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvGuard {
    pub fn set(vars: &[(&str, &str)]) -> Self {
        let lock = ENV_MUTEX.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let saved = vars
            .iter()
            .map(|(key, value)| {
                let previous = std::env::var(key).ok();
                std::env::set_var(key, value);
                (key.to_string(), previous)
            })
            .collect();
        Self { saved, _lock: lock }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, previous) in &self.saved {
            match previous {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
        }
    }
}
