use std::sync::Arc;
use std::time::Instant;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, error};

use crate::engine::{Engine, EngineError};
use crate::limits::MAX_LINE_LEN;
use crate::observability::{TOOL_CALLS_TOTAL, TOOL_DURATION_SECONDS, tool_label};
use crate::tools::{self, ToolError};

/// Serve one client: read request lines, answer each with one response line,
/// until the peer closes the connection.
///
/// A malformed request is answered with a `bad_request` error and the
/// connection stays open. An over-long line also gets `bad_request`, after
/// which the connection is closed.
pub async fn process_connection<S>(socket: S, engine: Arc<Engine>) -> Result<(), LinesCodecError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(socket, LinesCodec::new_with_max_length(MAX_LINE_LEN));

    while let Some(line) = framed.next().await {
        let response = match line {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => handle_line(&engine, &line).await,
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                metrics::counter!(TOOL_CALLS_TOTAL, "tool" => "unknown", "status" => "bad_request")
                    .increment(1);
                failure(
                    Value::Null,
                    "bad_request",
                    &format!("request line longer than {MAX_LINE_LEN} bytes"),
                )
            }
            Err(e) => return Err(e),
        };
        framed.send(response.to_string()).await?;
    }
    Ok(())
}

/// Parse, dispatch and render one request line.
pub async fn handle_line(engine: &Engine, line: &str) -> Value {
    let (id, call) = tools::parse_request(line);
    let call = match call {
        Ok(call) => call,
        Err(e) => {
            debug!("bad request: {e}");
            metrics::counter!(TOOL_CALLS_TOTAL, "tool" => "unknown", "status" => "bad_request")
                .increment(1);
            return bad_request(id, &e);
        }
    };

    let tool = tool_label(&call);
    let start = Instant::now();
    let result = tools::dispatch(engine, call).await;
    metrics::histogram!(TOOL_DURATION_SECONDS, "tool" => tool).record(start.elapsed().as_secs_f64());

    match result {
        Ok(output) => {
            metrics::counter!(TOOL_CALLS_TOTAL, "tool" => tool, "status" => "ok").increment(1);
            json!({"id": id, "ok": true, "result": output})
        }
        Err(e) => {
            error!("{tool} failed: {e}");
            metrics::counter!(TOOL_CALLS_TOTAL, "tool" => tool, "status" => e.kind()).increment(1);
            engine_failure(id, &e)
        }
    }
}

fn bad_request(id: Value, err: &ToolError) -> Value {
    failure(id, "bad_request", &err.to_string())
}

fn engine_failure(id: Value, err: &EngineError) -> Value {
    failure(id, err.kind(), &err.to_string())
}

fn failure(id: Value, kind: &str, message: &str) -> Value {
    json!({
        "id": id,
        "ok": false,
        "error": {"kind": kind, "message": message},
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    fn test_engine(name: &str) -> (Engine, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("spacebook_test_wire_{name}_{}", Ulid::new()));
        std::fs::create_dir_all(&dir).unwrap();
        (Engine::open(&dir).unwrap(), dir)
    }

    #[tokio::test]
    async fn success_envelope() {
        let (engine, _) = test_engine("ok");
        let response = handle_line(
            &engine,
            r#"{"id": 1, "name": "check_availability", "arguments": {"space_type": "hall",
                "date": "2024-11-12", "start_time": "10:00", "end_time": "11:00"}}"#,
        )
        .await;
        assert_eq!(response["id"], 1);
        assert_eq!(response["ok"], true);
        assert_eq!(response["result"]["available"], true);
        assert!(response["result"].get("conflict").is_none());
    }

    #[tokio::test]
    async fn conflict_is_ok_true() {
        let (engine, _) = test_engine("conflict");
        let reserve = r#"{"id": "r", "name": "make_reservation", "arguments": {"space_type": "office",
            "date": "2024-11-12", "start_time": "09:00", "end_time": "17:00"}}"#;
        let first = handle_line(&engine, reserve).await;
        assert_eq!(first["result"]["reserved"], true);
        assert_eq!(first["result"]["booking"]["span"], json!(["09:00", "17:00"]));

        let second = handle_line(&engine, reserve).await;
        assert_eq!(second["ok"], true);
        assert_eq!(second["result"]["reserved"], false);
    }

    #[tokio::test]
    async fn malformed_line_is_bad_request() {
        let (engine, _) = test_engine("malformed");
        let response = handle_line(&engine, "{not json").await;
        assert_eq!(response["ok"], false);
        assert_eq!(response["id"], Value::Null);
        assert_eq!(response["error"]["kind"], "bad_request");
    }

    #[tokio::test]
    async fn persistence_failure_is_ok_false() {
        let (engine, dir) = test_engine("persist");
        std::fs::remove_dir_all(&dir).unwrap();
        let response = handle_line(
            &engine,
            r#"{"id": 9, "name": "make_reservation", "arguments": {"space_type": "hall",
                "date": "2024-11-12", "start_time": "09:00", "end_time": "10:00"}}"#,
        )
        .await;
        assert_eq!(response["id"], 9);
        assert_eq!(response["ok"], false);
        assert_eq!(response["error"]["kind"], "persistence");
    }

    #[tokio::test]
    async fn connection_answers_each_line() {
        let (engine, _) = test_engine("duplex");
        let (client, server) = tokio::io::duplex(4096);
        let serve = tokio::spawn(process_connection(server, Arc::new(engine)));

        let mut client = Framed::new(client, LinesCodec::new());
        client.send(r#"{"id": 1, "name": "list_tools"}"#.to_string()).await.unwrap();
        client.send("garbage".to_string()).await.unwrap();
        client.send(String::new()).await.unwrap();
        client
            .send(r#"{"id": 3, "name": "get_available_slots", "arguments": {"space_type": "hall", "date": "2024-11-12"}}"#.to_string())
            .await
            .unwrap();

        let first: Value = serde_json::from_str(&client.next().await.unwrap().unwrap()).unwrap();
        assert_eq!(first["result"]["tools"].as_array().unwrap().len(), 4);
        let second: Value = serde_json::from_str(&client.next().await.unwrap().unwrap()).unwrap();
        assert_eq!(second["error"]["kind"], "bad_request");
        let third: Value = serde_json::from_str(&client.next().await.unwrap().unwrap()).unwrap();
        assert_eq!(third["id"], 3);
        assert_eq!(third["result"]["slots"], json!([["08:00", "22:00"]]));

        drop(client);
        serve.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn overlong_line_is_rejected_then_closed() {
        let (engine, _) = test_engine("overlong");
        let (client, server) = tokio::io::duplex(4 * MAX_LINE_LEN);
        let serve = tokio::spawn(process_connection(server, Arc::new(engine)));

        let mut client = Framed::new(client, LinesCodec::new());
        let padding = "x".repeat(MAX_LINE_LEN + 1);
        client
            .send(format!(r#"{{"id": 1, "name": "list_tools", "pad": "{padding}"}}"#))
            .await
            .unwrap();

        let reply: Value = serde_json::from_str(&client.next().await.unwrap().unwrap()).unwrap();
        assert_eq!(reply["ok"], false);
        assert_eq!(reply["id"], Value::Null);
        assert_eq!(reply["error"]["kind"], "bad_request");
        assert!(reply["error"]["message"].as_str().unwrap().contains("longer than"));

        assert!(client.next().await.is_none());
        serve.await.unwrap().unwrap();
    }
}
