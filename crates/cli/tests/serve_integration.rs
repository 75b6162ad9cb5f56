//! Integration tests for the `livecode serve` HTTP API.
//!
//! Each test starts the server as a child process on a unique port,
//! makes HTTP requests, and verifies the responses. Generation requests go
//! to a scripted generator listening on an ephemeral port in the test.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::{Child, Command};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

/// Atomic port counter to avoid port conflicts between parallel tests.
static NEXT_PORT: AtomicU16 = AtomicU16::new(0);
static PORT_INIT: std::sync::Once = std::sync::Once::new();

fn next_port() -> u16 {
    PORT_INIT.call_once(|| {
        let base = 20000 + (std::process::id() as u16 % 20000);
        NEXT_PORT.store(base, Ordering::SeqCst);
    });
    NEXT_PORT.fetch_add(1, Ordering::SeqCst)
}

/// Kills the server when a test finishes, pass or fail.
struct Server {
    child: Child,
    port: u16,
}

impl Drop for Server {
    fn drop(&mut self) {
        self.child.kill().ok();
        self.child.wait().ok();
    }
}

/// Helper: start `livecode serve` with extra environment variables.
fn start_server(env: &[(&str, &str)]) -> Server {
    let port = next_port();
    let manifest_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    let workspace_root = manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root");

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_livecode"));
    cmd.current_dir(workspace_root);
    cmd.arg("serve").arg("--port").arg(port.to_string());
    cmd.env_remove("LIVECODE_API_KEY");
    cmd.env("LIVECODE_GENERATOR_URL", "http://127.0.0.1:9");
    for (k, v) in env {
        cmd.env(k, v);
    }
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());

    let child = cmd.spawn().expect("failed to start livecode serve");
    for _ in 0..50 {
        if TcpStream::connect(format!("127.0.0.1:{}", port)).is_ok() {
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    Server { child, port }
}

/// A generator that answers every request with `status` and `body`.
fn scripted_generator(status_line: &'static str, body: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            read_request(&mut stream);
            let reply = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            let _ = stream.write_all(reply.as_bytes());
        }
    });
    format!("http://{}", addr)
}

/// Consume one request (headers plus Content-Length body).
fn read_request(stream: &mut TcpStream) {
    stream.set_read_timeout(Some(Duration::from_secs(5))).ok();
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        data.extend_from_slice(&buf[..n]);
        let text = String::from_utf8_lossy(&data);
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .find_map(|l| {
                    let (k, v) = l.split_once(':')?;
                    k.eq_ignore_ascii_case("content-length")
                        .then(|| v.trim().parse::<usize>().ok())?
                })
                .unwrap_or(0);
            if data.len() >= end + 4 + length {
                return;
            }
        }
    }
}

/// Helper: send a request and return (status, headers, body).
fn http(
    port: u16,
    method: &str,
    path: &str,
    body: Option<&str>,
    extra_headers: &[(&str, &str)],
) -> (u16, String, String) {
    let mut stream = TcpStream::connect(format!("127.0.0.1:{}", port)).expect("failed to connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();

    let mut header_lines = String::new();
    for (name, value) in extra_headers {
        header_lines.push_str(&format!("{}: {}\r\n", name, value));
    }
    let body = body.unwrap_or("");
    let request = format!(
        "{} {} HTTP/1.1\r\nHost: localhost:{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n{}",
        method,
        path,
        port,
        body.len(),
        header_lines,
        body
    );
    stream.write_all(request.as_bytes()).expect("failed to write");

    let mut response = String::new();
    let _ = stream.read_to_string(&mut response);
    parse_http_response_full(&response)
}

fn get(port: u16, path: &str) -> (u16, serde_json::Value) {
    let (status, _, body) = http(port, "GET", path, None, &[]);
    (status, serde_json::from_str(&body).unwrap_or(serde_json::Value::Null))
}

fn post(port: u16, path: &str, body: serde_json::Value) -> (u16, serde_json::Value) {
    let (status, _, body) = http(port, "POST", path, Some(&body.to_string()), &[]);
    (status, serde_json::from_str(&body).unwrap_or(serde_json::Value::Null))
}

/// Extract a header value from raw headers string.
fn extract_header<'a>(headers: &'a str, name: &str) -> Option<&'a str> {
    let name_lower = name.to_lowercase();
    for line in headers.lines() {
        if let Some((key, value)) = line.split_once(':') {
            if key.trim().to_lowercase() == name_lower {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Parse an HTTP response into (status_code, headers_string, body).
fn parse_http_response_full(response: &str) -> (u16, String, String) {
    let parts: Vec<&str> = response.splitn(2, "\r\n\r\n").collect();
    let headers = parts.first().unwrap_or(&"").to_string();
    let body = parts.get(1).unwrap_or(&"").to_string();

    let status_line = headers.lines().next().unwrap_or("");
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(0);

    let chunked = extract_header(&headers, "transfer-encoding")
        .map(|v| v.eq_ignore_ascii_case("chunked"))
        .unwrap_or(false);
    let body = if chunked { decode_chunked(&body) } else { body };

    (status, headers, body)
}

/// Decode chunked transfer encoding.
fn decode_chunked(data: &str) -> String {
    let mut result = String::new();
    let mut remaining = data;

    while let Some(line_end) = remaining.find("\r\n") {
        let size = match usize::from_str_radix(remaining[..line_end].trim(), 16) {
            Ok(s) => s,
            Err(_) => break,
        };
        if size == 0 {
            break;
        }
        let chunk_start = line_end + 2;
        let chunk_end = chunk_start + size;
        if chunk_end > remaining.len() {
            result.push_str(&remaining[chunk_start..]);
            break;
        }
        result.push_str(&remaining[chunk_start..chunk_end]);
        remaining = remaining.get(chunk_end + 2..).unwrap_or("");
    }

    result
}

/// Poll `/session` until its state is `want` or give up.
fn wait_for_state(port: u16, want: &str) -> serde_json::Value {
    let mut last = serde_json::Value::Null;
    for _ in 0..100 {
        let (_, snapshot) = get(port, "/session");
        if snapshot["state"]["state"] == want {
            return snapshot;
        }
        last = snapshot;
        std::thread::sleep(Duration::from_millis(100));
    }
    panic!("session never reached '{}'; last snapshot: {}", want, last);
}

const PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgo=";

#[test]
fn health_returns_200_with_version() {
    let server = start_server(&[]);
    let (status, json) = get(server.port, "/health");
    assert_eq!(status, 200);
    assert_eq!(json["status"], "ok");
    assert!(json.get("harness_version").is_some());
}

#[test]
fn unknown_route_is_404() {
    let server = start_server(&[]);
    let (status, json) = get(server.port, "/nope");
    assert_eq!(status, 404);
    assert_eq!(json["error"], "not found");
}

#[test]
fn scope_lists_bindings() {
    let server = start_server(&[]);
    let (status, json) = get(server.port, "/scope");
    assert_eq!(status, 200);
    let bindings = json["bindings"].as_array().expect("bindings array");
    assert!(bindings.iter().any(|b| b["name"] == "React"));
}

#[test]
fn fresh_session_is_idle_and_rejects_edits() {
    let server = start_server(&[]);
    let (status, snapshot) = get(server.port, "/session");
    assert_eq!(status, 200);
    assert_eq!(snapshot["state"]["state"], "idle");
    assert!(snapshot["source"].is_null());

    let (status, json) = post(
        server.port,
        "/edit",
        serde_json::json!({ "source": "const CodeComponent = () => null;" }),
    );
    assert_eq!(status, 409);
    assert!(json["error"].as_str().unwrap().contains("idle"));

    let (status, _) = post(server.port, "/acknowledge", serde_json::json!({}));
    assert_eq!(status, 409);
}

#[test]
fn evaluate_is_stateless() {
    let server = start_server(&[]);
    let (status, json) = post(
        server.port,
        "/evaluate",
        serde_json::json!({
            "source": "```jsx\nconst CodeComponent = () => <p>ok</p>;\n```",
            "raw": true
        }),
    );
    assert_eq!(status, 200);
    assert_eq!(json["outcome"], "success");

    let (status, json) = post(
        server.port,
        "/evaluate",
        serde_json::json!({ "source": "const CodeComponent = () => <div" }),
    );
    assert_eq!(status, 200);
    assert_eq!(json["outcome"], "compile_error");

    let (status, json) = post(server.port, "/evaluate", serde_json::json!({}));
    assert_eq!(status, 400);
    assert_eq!(json["error"], "missing 'source' field");

    let (_, snapshot) = get(server.port, "/session");
    assert_eq!(snapshot["state"]["state"], "idle");
}

#[test]
fn upload_generate_edit_flow() {
    let code = "```jsx\nconst CodeComponent = () => (\n  <Card>\n    <CardTitle>Hello</CardTitle>\n  </Card>\n);\n```";
    let url = scripted_generator("200 OK", serde_json::json!({ "code": code }).to_string());
    let server = start_server(&[("LIVECODE_GENERATOR_URL", url.as_str())]);

    let (status, json) = post(
        server.port,
        "/upload",
        serde_json::json!({ "image": PNG_DATA_URL }),
    );
    assert_eq!(status, 202);
    assert!(json["ticket"].as_u64().is_some());

    let snapshot = wait_for_state(server.port, "ready");
    assert_eq!(snapshot["result"]["outcome"], "success");
    assert_eq!(snapshot["preview"]["state"], "mounted");
    let source = snapshot["source"].as_str().unwrap().to_string();
    assert!(!source.contains("```"));

    // A broken edit reports a compile error and keeps the preview.
    let broken = source.replace("<CardTitle>", "<CardTitle ");
    let (status, snapshot) = post(server.port, "/edit", serde_json::json!({ "source": broken }));
    assert_eq!(status, 200);
    assert_eq!(snapshot["state"]["state"], "ready");
    assert_eq!(snapshot["result"]["outcome"], "compile_error");
    assert!(snapshot["excerpt"].as_str().is_some());
    assert!(snapshot["preview"]["html"]
        .as_str()
        .unwrap()
        .contains("Hello"));

    let fixed = source.replace("Hello", "Hello again");
    let (_, snapshot) = post(server.port, "/edit", serde_json::json!({ "source": fixed }));
    assert_eq!(snapshot["result"]["outcome"], "success");
    assert!(snapshot["preview"]["html"]
        .as_str()
        .unwrap()
        .contains("Hello again"));

    // Character-offset operations apply to the current text.
    let current = snapshot["source"].as_str().unwrap().to_string();
    let at = current.chars().count();
    let (status, snapshot) = post(
        server.port,
        "/edit",
        serde_json::json!({ "op": { "op": "insert", "at": at, "text": "\n// note" } }),
    );
    assert_eq!(status, 200);
    assert!(snapshot["source"].as_str().unwrap().ends_with("// note"));
    assert_eq!(snapshot["result"]["outcome"], "success");

    let (status, json) = post(
        server.port,
        "/edit",
        serde_json::json!({ "op": { "op": "delete", "start": 0, "end": at + 100 } }),
    );
    assert_eq!(status, 400);
    assert!(json["error"].as_str().unwrap().contains("past the end"));

    let (status, _) = post(server.port, "/edit", serde_json::json!({ "op": { "op": "rotate" } }));
    assert_eq!(status, 400);
}

#[test]
fn generator_500_fails_session_until_acknowledged() {
    let url = scripted_generator(
        "500 Internal Server Error",
        serde_json::json!({ "error": "boom" }).to_string(),
    );
    let server = start_server(&[("LIVECODE_GENERATOR_URL", url.as_str())]);

    let (status, _) = post(
        server.port,
        "/upload",
        serde_json::json!({ "image": PNG_DATA_URL }),
    );
    assert_eq!(status, 202);
    let snapshot = wait_for_state(server.port, "failed");
    assert!(snapshot["state"]["message"].as_str().unwrap().contains("500"));
    assert!(snapshot["source"].is_null());

    let (status, snapshot) = post(server.port, "/acknowledge", serde_json::json!({}));
    assert_eq!(status, 200);
    assert_eq!(snapshot["state"]["state"], "idle");
}

#[test]
fn upload_rejects_non_data_urls() {
    let server = start_server(&[]);
    let (status, json) = post(
        server.port,
        "/upload",
        serde_json::json!({ "image": "https://example.com/design.png" }),
    );
    assert_eq!(status, 400);
    assert!(json["error"].as_str().unwrap().contains("data URL"));

    let (status, _) = post(server.port, "/upload", serde_json::json!({}));
    assert_eq!(status, 400);
}

#[test]
fn preview_has_etag_and_honours_if_none_match() {
    let server = start_server(&[]);
    let (status, headers, body) = http(server.port, "GET", "/preview", None, &[]);
    assert_eq!(status, 200);
    assert!(body.contains("<!DOCTYPE html>"));
    let etag = extract_header(&headers, "etag")
        .expect("ETag header")
        .to_string();
    assert_eq!(etag.trim_matches('"').len(), 64);

    let (status, _, _) = http(
        server.port,
        "GET",
        "/preview",
        None,
        &[("If-None-Match", etag.as_str())],
    );
    assert_eq!(status, 304);

    let (status, _, _) = http(
        server.port,
        "GET",
        "/preview",
        None,
        &[("If-None-Match", "\"stale\"")],
    );
    assert_eq!(status, 200);
}

#[test]
fn api_key_is_required_except_for_health() {
    let server = start_server(&[("LIVECODE_API_KEY", "s3cret")]);

    let (status, _) = get(server.port, "/health");
    assert_eq!(status, 200);

    let (status, _, _) = http(server.port, "GET", "/session", None, &[]);
    assert_eq!(status, 401);

    let (status, _, _) = http(
        server.port,
        "GET",
        "/session",
        None,
        &[("Authorization", "Bearer wrong")],
    );
    assert_eq!(status, 403);

    let (status, _, _) = http(
        server.port,
        "GET",
        "/session",
        None,
        &[("Authorization", "Bearer s3cret")],
    );
    assert_eq!(status, 200);

    let (status, _, _) = http(server.port, "GET", "/scope", None, &[("X-API-Key", "s3cret")]);
    assert_eq!(status, 200);
}
