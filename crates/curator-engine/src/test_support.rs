use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone)]
pub(crate) struct CapturedRequest {
    pub method: String,
    pub target: String,
    pub body: String,
}

/// Minimal HTTP/1.1 responder on an ephemeral port. Routes match on the
/// request path without query; unmatched paths answer 404.
pub(crate) struct HttpStub {
    addr: String,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl HttpStub {
    pub fn start(routes: Vec<(&'static str, u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub listener");
        let addr = listener.local_addr().expect("stub addr").to_string();
        let captured = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&captured);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                handle(stream, &routes, &sink);
            }
        });
        Self { addr, captured }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.captured.lock().map(|rows| rows.clone()).unwrap_or_default()
    }
}

fn handle(
    mut stream: TcpStream,
    routes: &[(&'static str, u16, String)],
    sink: &Arc<Mutex<Vec<CapturedRequest>>>,
) {
    let Ok(clone) = stream.try_clone() else { return };
    let mut reader = BufReader::new(clone);
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).is_err() || line == "\r\n" || line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }
    let mut body = vec![0u8; content_length];
    if content_length > 0 && reader.read_exact(&mut body).is_err() {
        return;
    }

    let path = target.split('?').next().unwrap_or_default().to_string();
    if let Ok(mut rows) = sink.lock() {
        rows.push(CapturedRequest {
            method,
            target: target.clone(),
            body: String::from_utf8_lossy(&body).to_string(),
        });
    }

    let (status, payload) = routes
        .iter()
        .find(|(route, _, _)| *route == path)
        .map(|(_, status, payload)| (*status, payload.clone()))
        .unwrap_or((404, "not found".to_string()));
    let response = format!(
        "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        payload.len()
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

/// URL of a port nothing listens on.
pub(crate) fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe listener");
    let addr = listener.local_addr().expect("probe addr");
    drop(listener);
    format!("http://{addr}")
}
