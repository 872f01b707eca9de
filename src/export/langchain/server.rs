//! `server.py`: FastAPI entry point with `/chat`, `/health` and `/ready`.

use crate::error::PipelineError;
use crate::export::python::string_literal;
use crate::export::{ExportArtifact, ExportContext, Generator};

pub struct ServerGenerator;

impl Generator for ServerGenerator {
    fn name(&self) -> &'static str {
        "server"
    }

    fn generate(&self, ctx: &ExportContext<'_>) -> Result<Vec<ExportArtifact>, PipelineError> {
        let version = ctx.metadata.version.as_deref().unwrap_or("0.1.0");
        let title = ctx
            .metadata
            .description
            .as_deref()
            .map(|d| format!("{} - {}", ctx.name(), d))
            .unwrap_or_else(|| ctx.name().to_string());

        let mut out = String::from("\"\"\"HTTP interface. Generated by agentspec.\"\"\"\n\n");
        out.push_str(HEADER);
        out.push_str(&format!(
            "app = FastAPI(title={}, version={})\n",
            string_literal(&title),
            string_literal(version)
        ));
        out.push_str(BODY);
        Ok(vec![ExportArtifact::source("server.py", out)])
    }
}

const HEADER: &str = r#"from __future__ import annotations

import asyncio
import time
from collections import deque

from fastapi import FastAPI, HTTPException
from pydantic import BaseModel, Field

import agent as agent_module

"#;

const BODY: &str = r#"

class ChatRequest(BaseModel):
    message: str = Field(min_length=1)
    session_id: str = "default"


class ChatResponse(BaseModel):
    response: str
    session_id: str


_agent = None
_requests: deque[float] = deque()
_tokens_today = {"day": time.strftime("%Y-%m-%d"), "used": 0}
_limit = agent_module.POLICIES["max_concurrent_requests"]
_slots = asyncio.Semaphore(_limit) if _limit else None


def get_agent():
    global _agent
    if _agent is None:
        _agent = agent_module.build_agent()
    return _agent


def _check_rate_limit() -> None:
    per_minute = agent_module.POLICIES["requests_per_minute"]
    if not per_minute:
        return
    now = time.monotonic()
    while _requests and now - _requests[0] > 60:
        _requests.popleft()
    if len(_requests) >= per_minute:
        raise HTTPException(status_code=429, detail="rate limit exceeded")
    _requests.append(now)


def _check_budget(tokens: int) -> None:
    per_day = agent_module.POLICIES["max_tokens_per_day"]
    today = time.strftime("%Y-%m-%d")
    if _tokens_today["day"] != today:
        _tokens_today.update(day=today, used=0)
    _tokens_today["used"] += tokens
    if per_day and _tokens_today["used"] > per_day:
        raise HTTPException(status_code=429, detail="daily token budget exhausted")


@app.get("/health")
async def health() -> dict:
    return {"status": "ok", "agent": agent_module.AGENT_NAME}


@app.get("/ready")
async def ready() -> dict:
    try:
        get_agent()
    except Exception as exc:  # noqa: BLE001
        raise HTTPException(status_code=503, detail=f"agent not ready: {exc}") from exc
    return {"status": "ready"}


async def _invoke(request: ChatRequest) -> ChatResponse:
    message = agent_module.redact(request.message)
    result = await get_agent().ainvoke(
        {"input": message},
        config={"configurable": {"session_id": request.session_id}},
    )
    output = agent_module.redact(str(result.get("output", "")))
    _check_budget(len(message.split()) + len(output.split()))
    return ChatResponse(response=output, session_id=request.session_id)


@app.post("/chat", response_model=ChatResponse)
async def chat(request: ChatRequest) -> ChatResponse:
    _check_rate_limit()
    if _slots is None:
        return await _invoke(request)
    async with _slots:
        return await _invoke(request)


def main() -> None:
    import os

    import uvicorn

    uvicorn.run(app, host="0.0.0.0", port=int(os.environ.get("PORT", "8000")))


if __name__ == "__main__":
    main()
"#;
