// Exercises the Google Translate speech backend against a local HTTP server
// that records each request and answers with canned audio bytes.

use slidecast::narration::{split_text, MAX_CHUNK_CHARS};
use slidecast::{
    render_narration, ErrorKind, GoogleTranslateTts, NarrationConfig, Script, SlidecastError,
    SpeechSynthesizer,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;
use tiny_http::{Header, Response, Server, StatusCode};
use url::Url;

struct RecordedRequest {
    path: String,
    query: HashMap<String, String>,
    user_agent: Option<String>,
}

/// Serve `count` requests, answering each with `audio:<idx>:<q>;` or a 500
/// when the text contains "fail".
fn spawn_tts_server(
    count: usize,
) -> (String, Arc<Mutex<Vec<RecordedRequest>>>, thread::JoinHandle<()>) {
    let server = Server::http("127.0.0.1:0").expect("Failed to start test server");
    let port = server
        .server_addr()
        .to_ip()
        .expect("Test server should listen on an IP address")
        .port();
    let recorded = Arc::new(Mutex::new(Vec::new()));

    let log = Arc::clone(&recorded);
    let handle = thread::spawn(move || {
        for request in server.incoming_requests().take(count) {
            let url = Url::parse(&format!("http://localhost{}", request.url())).unwrap();
            let query: HashMap<String, String> = url.query_pairs().into_owned().collect();
            let user_agent = request
                .headers()
                .iter()
                .find(|h| h.field.equiv("User-Agent"))
                .map(|h| h.value.to_string());

            let text = query.get("q").cloned().unwrap_or_default();
            let idx = query.get("idx").cloned().unwrap_or_default();
            log.lock().unwrap().push(RecordedRequest {
                path: url.path().to_string(),
                query,
                user_agent,
            });

            let response = if text.contains("fail") {
                Response::from_string("backend exploded").with_status_code(StatusCode(500))
            } else {
                let header = Header::from_bytes(&b"Content-Type"[..], &b"audio/mpeg"[..]).unwrap();
                Response::from_data(format!("audio:{}:{};", idx, text).into_bytes())
                    .with_header(header)
            };
            let _ = request.respond(response);
        }
    });

    (
        format!("http://127.0.0.1:{}/translate_tts", port),
        recorded,
        handle,
    )
}

#[test]
fn test_google_tts_sends_one_request_per_chunk_and_concatenates_audio() {
    let text = "This sentence is long enough that it needs to be split, because the endpoint limits requests to one hundred characters of text.";
    let chunks = split_text(text, MAX_CHUNK_CHARS);
    assert_eq!(chunks.len(), 2);

    let (endpoint, recorded, handle) = spawn_tts_server(chunks.len());
    let tts = GoogleTranslateTts::new(&endpoint, Duration::from_secs(10)).unwrap();

    let audio = tts.synthesize(text, "de").unwrap();
    handle.join().unwrap();

    let expected: String = chunks
        .iter()
        .enumerate()
        .map(|(i, c)| format!("audio:{}:{};", i, c))
        .collect();
    assert_eq!(String::from_utf8(audio).unwrap(), expected);

    let requests = recorded.lock().unwrap();
    assert_eq!(requests.len(), 2);
    for (i, request) in requests.iter().enumerate() {
        assert_eq!(request.path, "/translate_tts");
        let q = &request.query;
        assert_eq!(q["ie"], "UTF-8");
        assert_eq!(q["client"], "tw-ob");
        assert_eq!(q["tl"], "de");
        assert_eq!(q["total"], "2");
        assert_eq!(q["idx"], i.to_string());
        assert_eq!(q["q"], chunks[i]);
        assert_eq!(q["textlen"], chunks[i].chars().count().to_string());
        assert!(request
            .user_agent
            .as_deref()
            .is_some_and(|ua| ua.starts_with("Mozilla/5.0")));
    }
}

#[test]
fn test_google_tts_server_error_names_failing_slide() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let audio_dir = temp_dir.path().join("audio");
    let script = Script::from_json(
        r#"[
            {"title": "One", "bullets": [], "narration": "Welcome"},
            {"title": "Two", "bullets": [], "narration": "This one will fail"},
            {"title": "Three", "bullets": [], "narration": "Never reached"}
        ]"#,
    )
    .unwrap();

    // Slide 0 succeeds, slide 1 gets a 500 and aborts the run.
    let (endpoint, recorded, handle) = spawn_tts_server(2);
    let tts = GoogleTranslateTts::new(&endpoint, Duration::from_secs(10)).unwrap();

    let err = render_narration(&script, &audio_dir, &NarrationConfig::default(), &tts)
        .unwrap_err();
    handle.join().unwrap();

    assert_eq!(err.kind(), ErrorKind::Synthesis);
    match &err {
        SlidecastError::Synthesis { index, message } => {
            assert_eq!(*index, 1);
            assert!(message.contains("500"), "message: {}", message);
        }
        other => panic!("Expected a synthesis error, got {:?}", other),
    }

    assert_eq!(recorded.lock().unwrap().len(), 2);
    assert_eq!(
        std::fs::read_to_string(audio_dir.join("slide_0.mp3")).unwrap(),
        "audio:0:Welcome;"
    );
    assert!(!audio_dir.join("slide_1.mp3").exists());
    assert!(!audio_dir.join("slide_2.mp3").exists());
}
