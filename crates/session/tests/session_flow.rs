//! Orchestrator flows: generation tickets, editing, sticky preview, failures.

use async_trait::async_trait;
use livecode_core::RawGeneration;
use livecode_eval::{build_scope, EvaluationResult, SandboxLimits};
use livecode_session::{
    CodeGenerator, Completion, EditError, EditOp, GenerationError, HttpGenerator, ImageInput,
    Orchestrator, PreviewState, SessionError, SessionState,
};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::time::Duration;

const GOOD: &str = "```jsx\nconst CodeComponent = () => (\n  <Card>\n    <CardTitle>Plans</CardTitle>\n    <Button onClick={() => {}}>Buy</Button>\n  </Card>\n);\n```";

fn image() -> ImageInput {
    ImageInput::from_bytes(b"\x89PNG\r\n\x1a\n0000", None)
}

fn session() -> Orchestrator {
    Orchestrator::new(build_scope(), SandboxLimits::default())
}

fn ready_session() -> Orchestrator {
    let mut s = session();
    let ticket = s.upload(&image());
    assert_eq!(
        s.complete_generation(ticket, Ok(RawGeneration::new(GOOD))),
        Completion::Applied
    );
    s
}

/// Replies from a fixed script instead of calling a service.
struct ScriptedGenerator {
    reply: Result<String, GenerationError>,
}

#[async_trait]
impl CodeGenerator for ScriptedGenerator {
    async fn generate(&self, _image: &ImageInput) -> Result<RawGeneration, GenerationError> {
        self.reply.clone().map(RawGeneration::new)
    }
}

#[test]
fn generation_success_reaches_ready_with_mounted_preview() {
    let s = ready_session();
    assert_eq!(s.state(), &SessionState::Ready);
    let source = s.source().expect("source is set");
    assert!(!source.contains("```"));
    assert!(source.contains("<CodeComponent />"));
    assert!(s.last_result().map(EvaluationResult::is_success).unwrap_or(false));
    let html = s.preview().mounted_html().expect("mounted");
    assert!(html.contains("Plans"));
    assert!(html.contains("<button"));
    assert!(s.editor_view().unwrap().diagnostic.is_none());
}

#[test]
fn stale_ticket_is_discarded() {
    let mut s = session();
    let a = s.upload(&image());
    let b = s.upload(&image());
    assert_ne!(a, b);
    assert_eq!(s.pending_ticket(), Some(b));

    let fresh = "const CodeComponent = () => <p>from B</p>;";
    assert_eq!(
        s.complete_generation(b, Ok(RawGeneration::new(fresh))),
        Completion::Applied
    );
    let stale = "const CodeComponent = () => <p>from A</p>;";
    assert_eq!(
        s.complete_generation(a, Ok(RawGeneration::new(stale))),
        Completion::Discarded
    );
    assert!(s.source().unwrap().contains("from B"));
    assert_eq!(s.preview().mounted_html(), Some("<p>from B</p>"));

    // A stale failure does not disturb the session either.
    assert_eq!(
        s.complete_generation(a, Err(GenerationError::Status { status: 500 })),
        Completion::Discarded
    );
    assert_eq!(s.state(), &SessionState::Ready);
}

#[test]
fn edits_keep_last_good_preview() {
    let mut s = ready_session();
    let good_html = s.preview().mounted_html().unwrap().to_string();
    let good_source = s.source().unwrap().to_string();

    let broken = good_source.replace("<CardTitle>", "<CardTitle ");
    match s.edit(broken).unwrap() {
        EvaluationResult::CompileError(d) => assert!(d.line.is_some()),
        other => panic!("expected compile error, got {:?}", other),
    }
    assert_eq!(s.state(), &SessionState::Ready);
    assert_eq!(s.preview().mounted_html(), Some(good_html.as_str()));
    let view = s.editor_view().unwrap();
    assert!(view.diagnostic.is_some());
    assert!(view.excerpt().unwrap().contains('^'));

    let throwing = good_source.replace(
        "<CardTitle>Plans",
        "<CardTitle>{[1].map(() => { throw new Error('nope'); })}Plans",
    );
    assert!(matches!(
        s.edit(throwing).unwrap(),
        EvaluationResult::RuntimeError(_)
    ));
    assert_eq!(s.preview().mounted_html(), Some(good_html.as_str()));

    let fixed = "const CodeComponent = () => <h2>Fixed</h2>;\n\nrender(<CodeComponent />);".to_string();
    assert!(s.edit(fixed).unwrap().is_success());
    assert_eq!(s.preview().mounted_html(), Some("<h2>Fixed</h2>"));
}

#[test]
fn staged_edits_apply_on_flush() {
    let mut s = ready_session();
    let before = s.source().unwrap().to_string();
    let next = before.replace("Plans", "Pricing");
    s.stage_edit(next.clone()).unwrap();
    assert_eq!(s.state(), &SessionState::Editing);
    assert_eq!(s.source(), Some(before.as_str()));
    assert_eq!(s.editor_view().unwrap().source, next);
    assert!(s.snapshot().staged.is_some());

    let result = s.flush().unwrap().expect("staged edit evaluated");
    assert!(result.is_success());
    assert_eq!(s.state(), &SessionState::Ready);
    assert_eq!(s.source(), Some(next.as_str()));
    assert!(s.preview().mounted_html().unwrap().contains("Pricing"));
    assert!(s.flush().unwrap().is_none());
}

#[test]
fn mount_failure_is_reported_beside_the_editor() {
    let mut s = ready_session();
    let good_html = s.preview().mounted_html().unwrap().to_string();
    let unsafe_source =
        "const CodeComponent = () => <script>alert(1)</script>;\n\nrender(<CodeComponent />);";
    assert!(s.edit(unsafe_source.to_string()).unwrap().is_success());
    assert!(matches!(s.preview().state(), PreviewState::MountFailed { .. }));
    assert_eq!(s.preview().mounted_html(), Some(good_html.as_str()));

    let view = s.editor_view().unwrap();
    assert!(view.diagnostic.is_none());
    assert_eq!(view.mount_error, Some("<script> elements are not allowed in the preview"));
    let excerpt = s.snapshot().excerpt.expect("mount error surfaced");
    assert!(excerpt.starts_with("mount error: <script>"));
}

#[test]
fn edit_ops_apply_to_the_visible_text() {
    let mut s = ready_session();
    let before = s.source().unwrap().to_string();
    let at = before.find("Plans").unwrap();
    let next = s
        .text_after(&EditOp::Insert { at, text: "Team ".into() })
        .unwrap();
    assert!(next.contains("Team Plans"));
    s.stage_edit(next).unwrap();

    // Offsets are taken against the staged text, not the committed source.
    let staged_len = s.editor_view().unwrap().source.chars().count();
    let err = s
        .text_after(&EditOp::Delete { start: 0, end: staged_len + 1 })
        .unwrap_err();
    assert_eq!(
        err,
        SessionError::Edit(EditError::OutOfRange { offset: staged_len + 1, len: staged_len })
    );
    assert!(session()
        .text_after(&EditOp::Replace { text: "x".into() })
        .is_err());
}

#[test]
fn edits_are_rejected_outside_ready() {
    let mut s = session();
    assert_eq!(
        s.edit("x".into()).unwrap_err(),
        SessionError::InvalidState {
            operation: "edit",
            state: "idle"
        }
    );
    s.upload(&image());
    assert!(s.stage_edit("x".into()).is_err());
    assert!(s.acknowledge().is_err());
    assert!(s.editor_view().is_none());
}

#[test]
fn generator_failure_enters_failed_and_clears_source() {
    let mut s = ready_session();
    let ticket = s.upload(&image());
    s.complete_generation(ticket, Err(GenerationError::Status { status: 500 }));
    match s.state() {
        SessionState::Failed { message } => assert!(message.contains("500")),
        other => panic!("expected failed, got {:?}", other),
    }
    assert!(s.source().is_none());
    assert!(s.editor_view().is_none());
    assert_eq!(s.preview().state(), &PreviewState::Placeholder);

    s.acknowledge().unwrap();
    assert_eq!(s.state(), &SessionState::Idle);
}

#[test]
fn failed_session_can_upload_again() {
    let mut s = session();
    let t = s.upload(&image());
    s.complete_generation(t, Err(GenerationError::Transport("refused".into())));
    let t = s.upload(&image());
    assert_eq!(s.state(), &SessionState::Generating);
    s.complete_generation(t, Ok(RawGeneration::new(GOOD)));
    assert_eq!(s.state(), &SessionState::Ready);
}

#[test]
fn snapshot_serializes() {
    let s = ready_session();
    let json = serde_json::to_value(s.snapshot()).unwrap();
    assert_eq!(json["state"]["state"], "ready");
    assert_eq!(json["result"]["outcome"], "success");
    assert_eq!(json["preview"]["state"], "mounted");
    assert!(json["pending_ticket"].is_null());
}

#[tokio::test]
async fn generator_trait_drives_the_session() {
    let generator = ScriptedGenerator {
        reply: Ok(GOOD.to_string()),
    };
    let mut s = session();
    let img = image();
    let ticket = s.upload(&img);
    let outcome = generator.generate(&img).await;
    s.complete_generation(ticket, outcome);
    assert_eq!(s.state(), &SessionState::Ready);
}

/// One-shot HTTP server answering every request with `status`.
fn serve_once(status_line: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 8192];
            let _ = stream.read(&mut buf);
            let reply = format!("HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n", status_line);
            let _ = stream.write_all(reply.as_bytes());
        }
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn http_500_from_generator_fails_the_session() {
    let url = serve_once("500 Internal Server Error");
    let generator = HttpGenerator::new(url, Duration::from_secs(5));
    let mut s = session();
    let img = image();
    let ticket = s.upload(&img);
    let outcome = generator.generate(&img).await;
    assert_eq!(outcome, Err(GenerationError::Status { status: 500 }));
    s.complete_generation(ticket, outcome);
    assert!(matches!(s.state(), SessionState::Failed { .. }));
    assert!(s.source().is_none());
    assert!(s.editor_view().is_none());
}
