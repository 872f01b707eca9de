//! `memory.py`: chat history per session, on the backend picked in the export options.

use crate::error::PipelineError;
use crate::export::{ExportArtifact, ExportContext, Generator, MemoryBackend};
use crate::manifest::StateStrategy;

pub struct MemoryGenerator;

/// Default window when a manifest asks for windowed state without a size.
const DEFAULT_WINDOW: u64 = 20;

impl Generator for MemoryGenerator {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn generate(&self, ctx: &ExportContext<'_>) -> Result<Vec<ExportArtifact>, PipelineError> {
        let mut out = String::from(
            "\"\"\"Conversation state. Generated by agentspec.\"\"\"\n\nfrom __future__ import annotations\n\nimport os\n\n",
        );

        let (Some(state), Some(backend)) = (ctx.active_state(), ctx.memory_backend()) else {
            out.push_str(STATELESS);
            return Ok(vec![ExportArtifact::source("memory.py", out)]);
        };

        let window = match state.strategy() {
            StateStrategy::Buffer => None,
            StateStrategy::Window | StateStrategy::Summary => Some(state.window.unwrap_or(DEFAULT_WINDOW)),
        };
        out.push_str(&format!(
            "STRATEGY = \"{}\"\nWINDOW = {}\nTTL_SECONDS = {}\n\n",
            state.strategy().as_str(),
            window.map_or("None".to_string(), |w| w.to_string()),
            state.ttl_seconds.map_or("None".to_string(), |t| t.to_string()),
        ));

        out.push_str(match backend {
            MemoryBackend::InMemory => IN_MEMORY,
            MemoryBackend::Summarizing => SUMMARIZING,
            MemoryBackend::KeyValue => KEY_VALUE,
            MemoryBackend::Relational => RELATIONAL,
        });
        out.push_str(TRIM);

        Ok(vec![ExportArtifact::source("memory.py", out)])
    }
}

const STATELESS: &str = r#"from langchain_core.chat_history import InMemoryChatMessageHistory

BACKEND = "none"


def get_session_history(session_id: str) -> InMemoryChatMessageHistory:
    """Every request starts with an empty history."""
    return InMemoryChatMessageHistory()
"#;

const IN_MEMORY: &str = r#"from langchain_core.chat_history import InMemoryChatMessageHistory

BACKEND = "in-memory"
_SESSIONS: dict[str, InMemoryChatMessageHistory] = {}


def _open(session_id: str) -> InMemoryChatMessageHistory:
    return _SESSIONS.setdefault(session_id, InMemoryChatMessageHistory())
"#;

const SUMMARIZING: &str = r#"from langchain_core.chat_history import InMemoryChatMessageHistory
from langchain_core.messages import SystemMessage

BACKEND = "summarizing"
_SESSIONS: dict[str, InMemoryChatMessageHistory] = {}
_SUMMARIZER = None


def set_summarizer(llm) -> None:
    """Register the chat model used to condense old turns."""
    global _SUMMARIZER
    _SUMMARIZER = llm


def _summarize(history: InMemoryChatMessageHistory, keep: int) -> None:
    old = history.messages[:-keep]
    if not old or _SUMMARIZER is None:
        return
    transcript = "\n".join(f"{m.type}: {m.content}" for m in old)
    summary = _SUMMARIZER.invoke(
        "Summarize this conversation so it can be continued later:\n" + transcript
    )
    recent = history.messages[-keep:]
    history.clear()
    history.add_message(SystemMessage(content="Conversation summary: " + str(summary.content)))
    history.add_messages(recent)


def _open(session_id: str) -> InMemoryChatMessageHistory:
    history = _SESSIONS.setdefault(session_id, InMemoryChatMessageHistory())
    if WINDOW is not None and len(history.messages) > WINDOW:
        _summarize(history, WINDOW // 2 or 1)
    return history
"#;

const KEY_VALUE: &str = r#"from langchain_community.chat_message_histories import RedisChatMessageHistory

BACKEND = "key-value"
REDIS_URL = os.environ.get("REDIS_URL", "redis://localhost:6379/0")


def _open(session_id: str) -> RedisChatMessageHistory:
    return RedisChatMessageHistory(session_id, url=REDIS_URL, ttl=TTL_SECONDS)
"#;

const RELATIONAL: &str = r#"from langchain_community.chat_message_histories import SQLChatMessageHistory

BACKEND = "relational"
DATABASE_URL = os.environ.get("DATABASE_URL", "sqlite:///chat_history.db")


def _open(session_id: str) -> SQLChatMessageHistory:
    return SQLChatMessageHistory(session_id=session_id, connection=DATABASE_URL)
"#;

const TRIM: &str = r#"

def get_session_history(session_id: str):
    """History for one session, trimmed to the configured window."""
    history = _open(session_id)
    windowed = STRATEGY == "window" or (STRATEGY == "summary" and BACKEND != "summarizing")
    if windowed and WINDOW is not None and len(history.messages) > WINDOW:
        recent = history.messages[-WINDOW:]
        history.clear()
        history.add_messages(recent)
    return history
"#;
