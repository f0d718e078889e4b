use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;

use super::command;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct PingResult {
    pub host: String,
    pub alive: bool,
    pub time_ms: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct PortResult {
    pub host: String,
    pub port: u16,
    pub open: bool,
    pub error: Option<String>,
}

/// One probe through the system ping binary. An unreachable host is a
/// normal result, not an error.
pub async fn ping(host: &str) -> Result<PingResult> {
    let result = command::run("ping", &["-c", "1", "-W", "5", host], None).await?;

    let time_ms = result
        .stdout
        .lines()
        .find_map(|line| line.split("time=").nth(1))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|value| value.parse::<f32>().ok())
        .map(|ms| ms.round() as u32);

    Ok(PingResult {
        host: host.to_string(),
        alive: result.success,
        time_ms,
    })
}

/// TCP connect probe with a timeout. Refused and timed-out are both
/// reported as closed, with the reason attached.
pub async fn check_port(host: &str, port: u16, wait: Duration) -> PortResult {
    match timeout(wait, TcpStream::connect((host, port))).await {
        Ok(Ok(_)) => PortResult {
            host: host.to_string(),
            port,
            open: true,
            error: None,
        },
        Ok(Err(e)) => PortResult {
            host: host.to_string(),
            port,
            open: false,
            error: Some(e.to_string()),
        },
        Err(_) => PortResult {
            host: host.to_string(),
            port,
            open: false,
            error: Some("Timeout".to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn open_port_is_detected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let result = check_port("127.0.0.1", port, Duration::from_secs(1)).await;
        assert!(result.open);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn closed_port_reports_the_reason() {
        // Bind then drop to get a port that is very likely closed.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let result = check_port("127.0.0.1", port, Duration::from_secs(1)).await;
        assert!(!result.open);
        assert!(result.error.is_some());
    }
}
