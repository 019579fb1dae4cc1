//! Static asset server
//!
//! Serves the companion display page (HTML, scripts, team logos) read-only
//! over plain HTTP/1.1. One request per connection; `GET` and `HEAD` only.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Longest accepted request head
const MAX_REQUEST_HEAD: usize = 8 * 1024;

/// File served for directory paths
const INDEX_FILE: &str = "index.html";

/// Accept connections and serve files from `root` until the task is aborted
///
/// A client gets `request_timeout` to send its request head.
pub async fn serve_assets(listener: TcpListener, root: PathBuf, request_timeout: Duration) {
    let root = Arc::new(root);

    loop {
        match listener.accept().await {
            Ok((socket, peer_addr)) => {
                let root = Arc::clone(&root);
                tokio::spawn(async move {
                    if let Err(e) = handle_request(socket, &root, request_timeout).await {
                        tracing::debug!(peer = %peer_addr, error = %e, "Asset request failed");
                    }
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to accept asset connection");
            }
        }
    }
}

/// Result of reading a request head
enum RequestHead {
    /// The request line of a complete (or peer-terminated) head
    Complete(String),
    /// The head did not end within `MAX_REQUEST_HEAD` bytes
    TooLarge,
}

/// Read the request line and drain the headers, never buffering more than
/// `MAX_REQUEST_HEAD` bytes
async fn read_head<R>(reader: R) -> io::Result<RequestHead>
where
    R: AsyncBufRead + Unpin,
{
    let mut limited = reader.take(MAX_REQUEST_HEAD as u64);
    let mut request_line: Option<String> = None;
    let mut consumed = 0;
    let mut line = Vec::new();

    loop {
        line.clear();
        let n = limited.read_until(b'\n', &mut line).await?;
        consumed += n;

        if !line.ends_with(b"\n") {
            // Cut short by the cap or by the peer closing
            if consumed >= MAX_REQUEST_HEAD {
                return Ok(RequestHead::TooLarge);
            }
            if request_line.is_none() {
                request_line = Some(String::from_utf8_lossy(&line).into_owned());
            }
            break;
        }

        match request_line {
            None => request_line = Some(String::from_utf8_lossy(&line).into_owned()),
            // Headers are drained; nothing in them changes the response
            Some(_) if line == b"\r\n" || line == b"\n" => break,
            Some(_) => {}
        }
    }

    Ok(RequestHead::Complete(request_line.unwrap_or_default()))
}

async fn handle_request(
    socket: TcpStream,
    root: &Path,
    request_timeout: Duration,
) -> io::Result<()> {
    let mut reader = BufReader::new(socket);

    let head = tokio::time::timeout(request_timeout, read_head(&mut reader)).await;
    let request_line = match head {
        Ok(Ok(RequestHead::Complete(line))) => line,
        Ok(Ok(RequestHead::TooLarge)) => {
            tracing::debug!(limit = MAX_REQUEST_HEAD, "Asset request head too large");
            return reply(reader.into_inner(), &Response::error(400), true).await;
        }
        Ok(Err(e)) => return Err(e),
        Err(_) => {
            tracing::debug!("Asset request timed out");
            return reply(reader.into_inner(), &Response::error(408), true).await;
        }
    };

    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default();
    let target = parts.next().unwrap_or("/");

    let response = respond(root, method, target).await;
    tracing::debug!(method = method, target = target, status = response.status, "Asset request");

    reply(reader.into_inner(), &response, method != "HEAD").await
}

async fn reply(mut socket: TcpStream, response: &Response, with_body: bool) -> io::Result<()> {
    socket.write_all(&response.head()).await?;
    if with_body {
        socket.write_all(&response.body).await?;
    }
    socket.shutdown().await
}

struct Response {
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
}

impl Response {
    fn error(status: u16) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: format!("{} {}\n", status, reason(status)).into_bytes(),
        }
    }

    fn head(&self) -> Vec<u8> {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n",
            self.status,
            reason(self.status),
            self.content_type,
            self.body.len()
        );
        if self.status == 405 {
            head.push_str("Allow: GET, HEAD\r\n");
        }
        head.push_str("\r\n");
        head.into_bytes()
    }
}

async fn respond(root: &Path, method: &str, target: &str) -> Response {
    if method != "GET" && method != "HEAD" {
        return Response::error(405);
    }

    let Some(mut path) = resolve_path(root, target) else {
        return Response::error(403);
    };

    if tokio::fs::metadata(&path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
    {
        path.push(INDEX_FILE);
    }

    match tokio::fs::read(&path).await {
        Ok(body) => Response {
            status: 200,
            content_type: content_type(&path),
            body,
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => Response::error(404),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read asset");
            Response::error(404)
        }
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        _ => "Error",
    }
}

/// Map a request target onto the asset root
///
/// The query string is ignored and percent-escapes are decoded. Returns `None`
/// for any path that would leave the root.
pub fn resolve_path(root: &Path, target: &str) -> Option<PathBuf> {
    let path = target
        .split(|c| c == '?' || c == '#')
        .next()
        .unwrap_or_default();
    let decoded = percent_decode(path)?;

    let mut resolved = root.to_path_buf();
    for component in Path::new(decoded.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(resolved)
}

fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(out).ok()
}

/// Content type by file extension
pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "application/javascript; charset=utf-8",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "woff2" => "font/woff2",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_path() {
        let root = Path::new("/srv/web");

        assert_eq!(
            resolve_path(root, "/js/app.js?v=3"),
            Some(PathBuf::from("/srv/web/js/app.js"))
        );
        assert_eq!(
            resolve_path(root, "/team%20logos/home.png"),
            Some(PathBuf::from("/srv/web/team logos/home.png"))
        );
        assert_eq!(resolve_path(root, "/"), Some(PathBuf::from("/srv/web")));
    }

    #[test]
    fn test_resolve_path_rejects_traversal() {
        let root = Path::new("/srv/web");

        assert_eq!(resolve_path(root, "/../etc/passwd"), None);
        assert_eq!(resolve_path(root, "/img/%2e%2e/%2e%2e/secret"), None);
        assert_eq!(resolve_path(root, "/bad%zz"), None);
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type(Path::new("index.HTML")), "text/html; charset=utf-8");
        assert_eq!(content_type(Path::new("logo.png")), "image/png");
        assert_eq!(content_type(Path::new("blob")), "application/octet-stream");
    }

    async fn request(addr: std::net::SocketAddr, raw: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_serve_assets() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>scoreboard</h1>").unwrap();
        std::fs::create_dir(dir.path().join("css")).unwrap();
        std::fs::write(dir.path().join("css").join("board.css"), "body{}").unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(serve_assets(
            listener,
            dir.path().to_path_buf(),
            Duration::from_secs(5),
        ));

        let index = request(addr, "GET / HTTP/1.1\r\nHost: test\r\n\r\n").await;
        assert!(index.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(index.contains("Content-Type: text/html"));
        assert!(index.ends_with("<h1>scoreboard</h1>"));

        let css = request(addr, "HEAD /css/board.css HTTP/1.1\r\n\r\n").await;
        assert!(css.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(css.contains("Content-Length: 6\r\n"));
        assert!(css.ends_with("\r\n\r\n"));

        let missing = request(addr, "GET /nope.js HTTP/1.1\r\n\r\n").await;
        assert!(missing.starts_with("HTTP/1.1 404 Not Found\r\n"));

        let traversal = request(addr, "GET /../secret HTTP/1.1\r\n\r\n").await;
        assert!(traversal.starts_with("HTTP/1.1 403 Forbidden\r\n"));

        let post = request(addr, "POST / HTTP/1.1\r\nContent-Length: 0\r\n\r\n").await;
        assert!(post.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));
        assert!(post.contains("Allow: GET, HEAD\r\n"));

        task.abort();
    }

    #[tokio::test]
    async fn test_request_head_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(serve_assets(
            listener,
            dir.path().to_path_buf(),
            Duration::from_secs(5),
        ));

        // A request line that never ends
        let flood = "A".repeat(MAX_REQUEST_HEAD);
        let response = request(addr, &flood).await;
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));

        // Endless headers
        let mut headers = String::from("GET / HTTP/1.1\r\n");
        while headers.len() < MAX_REQUEST_HEAD {
            headers.push_str("X-Filler: 0123456789\r\n");
        }
        headers.truncate(MAX_REQUEST_HEAD);
        let response = request(addr, &headers).await;
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));

        task.abort();
    }

    #[tokio::test]
    async fn test_silent_client_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(serve_assets(
            listener,
            dir.path().to_path_buf(),
            Duration::from_millis(50),
        ));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let mut response = String::new();
        tokio::time::timeout(Duration::from_secs(5), stream.read_to_string(&mut response))
            .await
            .expect("server kept an idle connection open")
            .unwrap();
        assert!(response.starts_with("HTTP/1.1 408 Request Timeout\r\n"));

        task.abort();
    }

    #[tokio::test]
    async fn test_read_head() {
        let head = read_head(&b"GET /a HTTP/1.1\r\nHost: x\r\n\r\nbody"[..])
            .await
            .unwrap();
        assert!(matches!(head, RequestHead::Complete(line) if line == "GET /a HTTP/1.1\r\n"));

        // Peer closed before the blank line
        let head = read_head(&b"GET /b HTTP/1.1"[..]).await.unwrap();
        assert!(matches!(head, RequestHead::Complete(line) if line == "GET /b HTTP/1.1"));

        let flood = vec![b'A'; MAX_REQUEST_HEAD * 4];
        let head = read_head(&flood[..]).await.unwrap();
        assert!(matches!(head, RequestHead::TooLarge));
    }
}
