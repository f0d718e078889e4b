use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use reqwest::{Client, Method};
use tokio::fs;

use crate::error::{Error, Result};

/// Request shape for one HTTP call. Unset fields use GET, no body, and the
/// client's default timeout.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub method: Option<Method>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct FetchResult {
    pub status: u16,
    pub status_text: String,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub success: bool,
}

/// One HTTP request. A non-2xx response is a normal result reported through
/// `status`/`success`; only a transport failure is `Error::Fetch`.
pub async fn fetch_data(url: &str, options: FetchOptions) -> Result<FetchResult> {
    let client = Client::new();
    let mut request = client
        .request(options.method.unwrap_or(Method::GET), url)
        .header("Content-Type", "application/json");
    for (name, value) in &options.headers {
        request = request.header(name, value);
    }
    if let Some(body) = options.body {
        request = request.body(body);
    }
    if let Some(timeout) = options.timeout {
        request = request.timeout(timeout);
    }

    let response = request
        .send()
        .await
        .map_err(|e| Error::Fetch(format!("{url}: {e}")))?;

    let status = response.status();
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    let body = response
        .text()
        .await
        .map_err(|e| Error::Fetch(format!("{url}: {e}")))?;

    Ok(FetchResult {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or("").to_string(),
        headers,
        body,
        success: status.is_success(),
    })
}

/// Download a URL to a file, creating parent directories as needed.
/// Returns the number of bytes written. Unlike `fetch_data`, a non-2xx
/// status fails the download.
pub async fn download_file(url: &str, path: &Path) -> Result<u64> {
    let response = Client::new()
        .get(url)
        .send()
        .await
        .map_err(|e| Error::Fetch(format!("{url}: {e}")))?;

    if !response.status().is_success() {
        return Err(Error::Fetch(format!(
            "download of {url} failed with status {}",
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::Fetch(format!("{url}: {e}")))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::file(path, e))?;
        }
    }
    fs::write(path, &bytes)
        .await
        .map_err(|e| Error::file(path, e))?;
    Ok(bytes.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    // Minimal HTTP server answering exactly one request with a canned
    // response, then closing the connection.
    async fn one_shot_server(response: &'static str) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        addr
    }

    #[tokio::test]
    async fn fetch_captures_status_headers_and_body() {
        let addr = one_shot_server(
            "HTTP/1.1 200 OK\r\ncontent-length: 2\r\nx-kind: demo\r\nconnection: close\r\n\r\nok",
        )
        .await;

        let result = fetch_data(&format!("http://{addr}/"), FetchOptions::default())
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.status, 200);
        assert_eq!(result.body, "ok");
        assert_eq!(result.headers.get("x-kind").map(String::as_str), Some("demo"));
    }

    #[tokio::test]
    async fn non_2xx_status_is_a_result_not_an_error() {
        let addr = one_shot_server(
            "HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        )
        .await;

        let result = fetch_data(&format!("http://{addr}/missing"), FetchOptions::default())
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.status, 404);
        assert_eq!(result.status_text, "Not Found");
    }

    #[tokio::test]
    async fn transport_failure_is_a_fetch_error() {
        let err = fetch_data("http://127.0.0.1:1/", FetchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
    }

    #[tokio::test]
    async fn download_writes_the_body_to_the_target_file() {
        let addr = one_shot_server(
            "HTTP/1.1 200 OK\r\ncontent-length: 5\r\nconnection: close\r\n\r\nhello",
        )
        .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("payload.txt");
        let written = download_file(&format!("http://{addr}/file"), &path)
            .await
            .unwrap();
        assert_eq!(written, 5);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
    }

    #[tokio::test]
    async fn failed_download_names_the_status() {
        let addr = one_shot_server(
            "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        )
        .await;

        let dir = tempfile::tempdir().unwrap();
        let err = download_file(&format!("http://{addr}/file"), &dir.path().join("out"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
