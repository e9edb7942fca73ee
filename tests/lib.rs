//! Test fixtures for onionscout integration tests
//!
//! Provides a fake relay network on loopback: listeners standing in for
//! reachable relays, closed ports standing in for blocked ones, and a tiny
//! HTTP server publishing them as an Onionoo document.

use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Fingerprint prefix of relays that accept connections
pub const LIVE_PREFIX: &str = "11AA";

/// Fingerprint prefix of relays whose port is closed
pub const DEAD_PREFIX: &str = "00DD";

/// Loopback relay network
pub struct RelayNetwork {
    /// Listeners kept open for the lifetime of the fixture
    _listeners: Vec<TcpListener>,
    /// Endpoints that accept connections
    pub live: Vec<SocketAddr>,
    /// Endpoints that refuse connections
    pub dead: Vec<SocketAddr>,
}

impl RelayNetwork {
    /// Bind `live` open ports and reserve `dead` closed ones
    pub async fn start(live: usize, dead: usize) -> Self {
        let mut listeners = Vec::with_capacity(live);
        let mut live_addrs = Vec::with_capacity(live);
        for _ in 0..live {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            live_addrs.push(listener.local_addr().unwrap());
            listeners.push(listener);
        }

        let mut dead_addrs = Vec::with_capacity(dead);
        for _ in 0..dead {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            dead_addrs.push(listener.local_addr().unwrap());
        }

        tracing::debug!("Relay network: {} live, {} dead", live, dead);

        Self {
            _listeners: listeners,
            live: live_addrs,
            dead: dead_addrs,
        }
    }

    /// Fingerprint assigned to the i-th live relay
    pub fn live_fingerprint(i: usize) -> String {
        format!("{LIVE_PREFIX}{i:036}")
    }

    /// Fingerprint assigned to the i-th dead relay
    pub fn dead_fingerprint(i: usize) -> String {
        format!("{DEAD_PREFIX}{i:036}")
    }

    /// Onionoo details document listing every relay, all in `country`
    pub fn onionoo_json(&self, country: &str) -> String {
        self.onionoo_json_split(country, country)
    }

    /// Onionoo details document with live and dead relays in different countries
    pub fn onionoo_json_split(&self, live_country: &str, dead_country: &str) -> String {
        let entries: Vec<String> = self
            .live
            .iter()
            .enumerate()
            .map(|(i, addr)| (Self::live_fingerprint(i), addr, live_country))
            .chain(
                self.dead
                    .iter()
                    .enumerate()
                    .map(|(i, addr)| (Self::dead_fingerprint(i), addr, dead_country)),
            )
            .map(|(fingerprint, addr, country)| {
                format!(
                    r#"{{"fingerprint":"{fingerprint}","or_addresses":["{addr}"],"country":"{country}"}}"#
                )
            })
            .collect();

        format!(
            r#"{{"version":"8.0","relays_published":"2024-01-01 00:00:00","relays":[{}],"bridges":[]}}"#,
            entries.join(",")
        )
    }
}

/// Serve `body` with `status` to every request; returns the URL
pub async fn serve_http(status: &'static str, body: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let body = body.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{addr}/details")
}

/// URL on a port nobody listens on
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/details")
}
