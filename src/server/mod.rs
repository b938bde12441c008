//! MCP server: newline-delimited JSON-RPC 2.0 on stdin/stdout.
//!
//! stdout carries protocol frames only; logs go to stderr.

pub mod args;
pub mod dispatch;
pub mod tools;

use anyhow::Result;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

pub use dispatch::Dispatcher;

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "devops-mcp";

const PARSE_ERROR: i32 = -32700;
const INVALID_PARAMS: i32 = -32602;
const METHOD_NOT_FOUND: i32 = -32601;

pub struct McpServer {
    dispatcher: Dispatcher,
}

impl McpServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Serve requests from stdin until it closes.
    pub async fn run(&mut self) -> Result<()> {
        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut lines = BufReader::new(stdin).lines();

        tracing::info!("stdio server started");

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(response) = self.handle_message(line).await {
                let mut bytes = response.into_bytes();
                bytes.push(b'\n');
                stdout.write_all(&bytes).await?;
                stdout.flush().await?;
            }
        }

        tracing::info!("stdin closed, stopping");
        Ok(())
    }

    /// Handle one frame. Notifications produce no response.
    pub async fn handle_message(&mut self, line: &str) -> Option<String> {
        let request: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "unparsable request");
                return Some(error_response(
                    Value::Null,
                    PARSE_ERROR,
                    &format!("Parse error: {e}"),
                ));
            }
        };

        let id = request.get("id").cloned().filter(|id| !id.is_null());
        let method = request
            .get("method")
            .and_then(|m| m.as_str())
            .unwrap_or("");
        let params = request.get("params").cloned().unwrap_or_else(|| json!({}));

        tracing::debug!(method, "request");

        // Notifications, `notifications/initialized` included, never get a reply.
        let Some(id) = id else {
            return None;
        };

        let response = match method {
            "initialize" => success_response(id, initialize_result(&params)),
            "ping" => success_response(id, json!({})),
            "tools/list" => success_response(id, json!({ "tools": tools::catalog() })),
            "tools/call" => self.handle_tools_call(id, &params).await,
            _ => error_response(id, METHOD_NOT_FOUND, &format!("Method not found: {method}")),
        };
        Some(response)
    }

    async fn handle_tools_call(&mut self, id: Value, params: &Value) -> String {
        let Some(name) = params.get("name").and_then(|n| n.as_str()) else {
            return error_response(id, INVALID_PARAMS, "tools/call requires a tool name");
        };
        let arguments = match params.get("arguments") {
            None | Some(Value::Null) => json!({}),
            Some(v) => v.clone(),
        };

        let reply = self.dispatcher.call(name, arguments).await;
        success_response(
            id,
            json!({
                "content": [{ "type": "text", "text": reply.text }],
                "isError": reply.is_error
            }),
        )
    }
}

fn initialize_result(params: &Value) -> Value {
    let protocol_version = params
        .get("protocolVersion")
        .and_then(|v| v.as_str())
        .unwrap_or(PROTOCOL_VERSION);
    json!({
        "protocolVersion": protocol_version,
        "capabilities": { "tools": {} },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

fn success_response(id: Value, result: Value) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
    .to_string()
}

fn error_response(id: Value, code: i32, message: &str) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": code,
            "message": message
        }
    })
    .to_string()
}
