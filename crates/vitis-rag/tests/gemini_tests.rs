mod common;

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use common::{grape_corpus, service, MemoryLoader};
use vitis_core::config::LlmSettings;
use vitis_rag::{GeminiClient, GenerationError, Generator, APOLOGY_MESSAGE};

const OK_BODY: &str = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Esca adalah penyakit kayu."}]}}]}"#;

/// Serves one canned response per connection and returns the raw requests.
fn serve(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let mut requests = Vec::new();
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().unwrap();
            requests.push(read_request(&mut stream));
            let reply = format!(
                "HTTP/1.1 {status} Test\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(reply.as_bytes()).unwrap();
        }
        requests
    });
    (format!("http://{addr}"), handle)
}

fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).unwrap();
        if n == 0 { break; }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let len = head.lines().find_map(|l| l.strip_prefix("content-length:")).and_then(|v| v.trim().parse::<usize>().ok()).unwrap_or(0);
            if buf.len() >= end + 4 + len { break; }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn settings(base_url: String) -> LlmSettings {
    std::env::set_var("NO_PROXY", "127.0.0.1");
    LlmSettings { base_url, max_attempts: 2, backoff_ms: 10, timeout_secs: 5, ..LlmSettings::default() }
}

#[test]
fn retries_once_after_server_error() {
    let (url, server) = serve(vec![(503, r#"{"error":{"message":"overloaded"}}"#), (200, OK_BODY)]);
    let client = GeminiClient::new(&settings(url), "test-key").unwrap();

    assert_eq!(client.generate("Apa itu Esca?").unwrap(), "Esca adalah penyakit kayu.");
    let requests = server.join().unwrap();
    assert_eq!(requests.len(), 2);
    let first = requests[0].to_lowercase();
    assert!(first.starts_with("post /models/gemini-2.5-flash:generatecontent"));
    assert!(first.contains("x-goog-api-key: test-key"));
    assert!(requests[0].contains(r#""text":"Apa itu Esca?""#));
}

#[test]
fn client_errors_are_not_retried() {
    let (url, server) = serve(vec![(400, r#"{"error":{"message":"bad request"}}"#)]);
    let client = GeminiClient::new(&settings(url), "test-key").unwrap();

    let err = client.generate("q").unwrap_err();
    assert!(matches!(err, GenerationError::Status { status: 400, .. }));
    assert_eq!(server.join().unwrap().len(), 1);
}

#[test]
fn gives_up_after_max_attempts() {
    let (url, server) = serve(vec![(429, "{}"), (500, "{}")]);
    let client = GeminiClient::new(&settings(url), "test-key").unwrap();

    let err = client.generate("q").unwrap_err();
    assert!(matches!(err, GenerationError::Status { status: 500, .. }));
    assert_eq!(server.join().unwrap().len(), 2);
}

#[test]
fn missing_api_key_is_reported() {
    let s = LlmSettings { api_key_env: "VITIS_TEST_KEY_THAT_IS_NEVER_SET".into(), ..LlmSettings::default() };
    assert!(matches!(GeminiClient::from_env(&s), Err(GenerationError::MissingApiKey(name)) if name == "VITIS_TEST_KEY_THAT_IS_NEVER_SET"));
}

#[test]
fn refused_connection_is_retried_then_becomes_apology() {
    let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let s = LlmSettings { backoff_ms: 200, ..settings(format!("http://{addr}")) };
    let client = GeminiClient::new(&s, "test-key").unwrap();

    let started = Instant::now();
    let err = client.generate("q").unwrap_err();
    assert!(started.elapsed() >= Duration::from_millis(200), "second attempt follows the backoff");
    match &err {
        GenerationError::Transport(e) => assert!(e.is_connect(), "{e}"),
        other => panic!("expected transport error, got {other:?}"),
    }
    assert!(err.is_transient());

    let svc = service(MemoryLoader::new(grape_corpus()), Arc::new(client));
    assert_eq!(svc.answer_text("Apa itu black rot?", &[]), APOLOGY_MESSAGE);
}

#[test]
fn silent_server_times_out_and_is_retried() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();
    // Holds every connection open without replying.
    thread::spawn(move || {
        let mut open = Vec::new();
        for stream in listener.incoming().flatten() {
            counter.fetch_add(1, Ordering::SeqCst);
            open.push(stream);
        }
    });
    let s = LlmSettings { timeout_secs: 1, ..settings(format!("http://{addr}")) };
    let client = GeminiClient::new(&s, "test-key").unwrap();

    let err = client.generate("q").unwrap_err();
    match &err {
        GenerationError::Transport(e) => assert!(e.is_timeout(), "{e}"),
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(err.is_transient());
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
}
