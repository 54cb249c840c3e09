//! Banner grabbing on ports a scan already found open.
//!
//! Web ports get an HTTP(S) GET and report the `Server` header; every other
//! port gets a plain TCP connect and whatever the service sends first.
//! Failures become descriptive text, so this never fails a run.

use crate::error::BannerError;
use crate::types::ScanTarget;
use futures::stream::{self, StreamExt};
use reqwest::header::SERVER;
use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Maximum bytes to read for a banner.
const MAX_BANNER_SIZE: usize = 1024;

/// Default per-port banner timeout.
pub const BANNER_TIMEOUT: Duration = Duration::from_secs(5);

/// How many ports are grabbed at once.
const BANNER_CONCURRENCY: usize = 16;

const NO_BANNER: &str = "No banner received";
const NO_SERVER_HEADER: &str = "No Server Header";

/// Grabs banners from open ports of one target.
pub struct BannerGrabber {
    http: reqwest::Client,
    timeout: Duration,
}

impl BannerGrabber {
    pub fn new(timeout: Duration) -> Result<Self, BannerError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .no_proxy()
            .build()?;
        Ok(Self { http, timeout })
    }

    /// Grab a banner from every port in `open_ports`, keyed by port.
    pub async fn grab_all(&self, target: &ScanTarget, open_ports: &[u16]) -> BTreeMap<u16, String> {
        debug!(ports = open_ports.len(), "grabbing banners");
        stream::iter(open_ports.iter().copied())
            .map(|port| async move { (port, self.grab(target, port).await) })
            .buffer_unordered(BANNER_CONCURRENCY)
            .collect()
            .await
    }

    /// Grab a single banner.
    pub async fn grab(&self, target: &ScanTarget, port: u16) -> String {
        let host = url_host(target);
        match port {
            80 | 8080 => {
                self.http_banner(&format!("http://{}:{}/", host, port), "HTTP")
                    .await
            }
            443 => self.http_banner(&format!("https://{}/", host), "HTTPS").await,
            _ => self.raw_banner(SocketAddr::new(target.ip, port)).await,
        }
    }

    async fn http_banner(&self, url: &str, scheme: &str) -> String {
        match self.http.get(url).send().await {
            Ok(response) => {
                let server = response
                    .headers()
                    .get(SERVER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or(NO_SERVER_HEADER);
                format!("{} Banner: {}", scheme, server)
            }
            Err(e) => format!("HTTP/HTTPS Error: {}", e),
        }
    }

    async fn raw_banner(&self, addr: SocketAddr) -> String {
        let mut stream = match timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return format!("Error: {}", e),
            Err(_) => return "Connection timed out".to_string(),
        };

        let mut buffer = vec![0u8; MAX_BANNER_SIZE];
        match timeout(self.timeout, stream.read(&mut buffer)).await {
            Ok(Ok(n)) if n > 0 => {
                let banner = sanitize_banner(&buffer[..n]);
                if banner.is_empty() {
                    NO_BANNER.to_string()
                } else {
                    banner
                }
            }
            Ok(Ok(_)) => NO_BANNER.to_string(),
            Ok(Err(e)) => format!("Error: {}", e),
            Err(_) => "Connection timed out".to_string(),
        }
    }
}

/// Host as it goes into a URL: the name the user gave, IPv6 bracketed.
fn url_host(target: &ScanTarget) -> String {
    match target.original.parse::<IpAddr>() {
        Ok(IpAddr::V6(ip)) => format!("[{}]", ip),
        _ => target.original.clone(),
    }
}

/// Sanitize banner by removing non-printable characters and limiting length.
fn sanitize_banner(data: &[u8]) -> String {
    let printable: String = data
        .iter()
        .take(256)
        .map(|&b| match b {
            b'\r' | b'\n' | b'\t' => ' ',
            b if b.is_ascii_graphic() || b == b' ' => b as char,
            _ => '.',
        })
        .collect();

    printable.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    fn localhost() -> ScanTarget {
        ScanTarget::new("127.0.0.1", IpAddr::V4(Ipv4Addr::LOCALHOST))
    }

    #[test]
    fn test_sanitize_banner() {
        assert_eq!(sanitize_banner(b"SSH-2.0-OpenSSH_8.9\r\n"), "SSH-2.0-OpenSSH_8.9");
        assert_eq!(sanitize_banner(b"\x00\x01Hello\x02World\x03"), "..Hello.World.");
        assert_eq!(sanitize_banner(b"220  ready\r\n\r\n"), "220 ready");
    }

    #[test]
    fn test_url_host() {
        assert_eq!(url_host(&localhost()), "127.0.0.1");
        let v6 = ScanTarget::new("::1", "::1".parse().unwrap());
        assert_eq!(url_host(&v6), "[::1]");
        let named = ScanTarget::new("example.com", IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(url_host(&named), "example.com");
    }

    #[tokio::test]
    async fn test_raw_banner_reads_greeting() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"SSH-2.0-OpenSSH_8.9\r\n").await.unwrap();
        });

        let grabber = BannerGrabber::new(Duration::from_secs(2)).unwrap();
        assert_eq!(grabber.grab(&localhost(), port).await, "SSH-2.0-OpenSSH_8.9");
    }

    #[tokio::test]
    async fn test_raw_banner_silent_service() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            drop(socket);
        });

        let grabber = BannerGrabber::new(Duration::from_secs(2)).unwrap();
        assert_eq!(grabber.grab(&localhost(), port).await, NO_BANNER);
    }

    #[tokio::test]
    async fn test_raw_banner_times_out() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
            drop(socket);
        });

        let grabber = BannerGrabber::new(Duration::from_millis(100)).unwrap();
        assert_eq!(grabber.grab(&localhost(), port).await, "Connection timed out");
        server.abort();
    }

    #[tokio::test]
    async fn test_http_banner_reports_server_header() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\nServer: test-server/1.0\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                )
                .await
                .unwrap();
        });

        let grabber = BannerGrabber::new(Duration::from_secs(2)).unwrap();
        let banner = grabber
            .http_banner(&format!("http://127.0.0.1:{}/", port), "HTTP")
            .await;
        assert_eq!(banner, "HTTP Banner: test-server/1.0");
    }

    #[tokio::test]
    async fn test_grab_all_keys_by_port() {
        let grabber = BannerGrabber::new(Duration::from_millis(200)).unwrap();
        assert!(grabber.grab_all(&localhost(), &[]).await.is_empty());

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"220 ftp ready\r\n").await.unwrap();
        });

        let banners = grabber.grab_all(&localhost(), &[port]).await;
        assert_eq!(banners.get(&port).map(String::as_str), Some("220 ftp ready"));
    }
}
