//! Media directory and webhook fixtures

use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Camera media root plus a state directory
pub struct MediaTree {
    media: TempDir,
    state: TempDir,
}

impl MediaTree {
    pub fn new() -> Self {
        Self {
            media: TempDir::new().unwrap(),
            state: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.media.path()
    }

    pub fn state_dir(&self) -> &Path {
        self.state.path()
    }

    /// Write a file under the media root, `secs_ago` seconds old
    pub fn write(&self, rel: &str, contents: &[u8], secs_ago: u64) -> PathBuf {
        let path = self.media.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(secs_ago);
        set_file_mtime(&path, FileTime::from_system_time(mtime)).unwrap();
        path
    }

    /// Persisted state for a kind key ("image" / "video"), if written
    pub fn state(&self, kind: &str) -> Option<serde_json::Value> {
        let path = self.state.path().join(format!("last-{}.json", kind));
        let contents = fs::read(path).ok()?;
        serde_json::from_slice(&contents).ok()
    }
}

/// Local HTTP endpoint answering every request with a fixed status
pub struct WebhookStub {
    url: String,
    bodies: Arc<Mutex<Vec<String>>>,
}

impl WebhookStub {
    pub async fn start(status: u16) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/webhook", listener.local_addr().unwrap());
        let bodies = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&bodies);
        tokio::spawn(async move {
            loop {
                let (mut stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                let body = read_body(&mut stream).await;
                recorded.lock().unwrap().push(body);

                let response = format!(
                    "HTTP/1.1 {} Stub\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                    status
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        Self { url, bodies }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// JSON bodies received so far
    pub fn payloads(&self) -> Vec<serde_json::Value> {
        self.bodies
            .lock()
            .unwrap()
            .iter()
            .map(|body| serde_json::from_str(body).unwrap())
            .collect()
    }
}

async fn read_body(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let len = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + len {
                return String::from_utf8_lossy(&buf[end + 4..end + 4 + len]).to_string();
            }
        }
    }

    String::new()
}

/// Poll `condition` for up to five seconds
pub async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("condition not met in time");
}
