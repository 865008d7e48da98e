use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::config::CollectorConfig;
use crate::error::BenchError;
use crate::request::{WorkloadRequest, ARRIVE_TIMESTAMP};

pub const POD_IP_HEADER: &str = "X-PodIP";

/// Pushes result lines to the collector. Best effort: one POST per result,
/// no retry.
#[derive(Debug, Clone)]
pub struct Reporter {
    client: Client,
    config: CollectorConfig,
}

impl Reporter {
    pub fn new(config: CollectorConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn url(&self) -> &Url {
        &self.config.url
    }

    /// POSTs `line` to the collector and checks the status code. The
    /// response body is ignored.
    pub async fn deliver(&self, line: &str, request: &WorkloadRequest) -> Result<(), BenchError> {
        let mut post = self
            .client
            .post(self.config.url.clone())
            .header(POD_IP_HEADER, self.config.pod_ip.to_string())
            .body(line.to_owned());
        if self.config.forward_arrive_timestamp {
            post = post.header(ARRIVE_TIMESTAMP, request.arrive_timestamp.to_string());
        }

        match post.send().await.and_then(|response| response.error_for_status()) {
            Ok(response) => {
                debug!(status = %response.status(), url = %self.config.url, "result delivered");
                Ok(())
            }
            Err(source) => Err(BenchError::Delivery {
                url: self.config.url.clone(),
                source,
            }),
        }
    }
}

/// Finds the address this pod uses to reach the collector.
///
/// Connecting a UDP socket sends nothing; it only makes the kernel pick the
/// outbound interface, whose address is what the collector will see.
pub fn resolve_pod_ip(collector: &Url) -> IpAddr {
    let target = collector
        .socket_addrs(|| Some(80))
        .ok()
        .and_then(|addrs| addrs.into_iter().next());

    let resolved = target.and_then(|target| local_addr_towards(target).ok());
    match resolved {
        Some(ip) if !ip.is_unspecified() => ip,
        _ => {
            warn!(%collector, "could not resolve pod address, reporting loopback");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}

fn local_addr_towards(target: SocketAddr) -> std::io::Result<IpAddr> {
    let bind: SocketAddr = match target {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (std::net::Ipv6Addr::UNSPECIFIED, 0).into(),
    };
    let socket = UdpSocket::bind(bind)?;
    socket.connect(target)?;
    Ok(socket.local_addr()?.ip())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use warp::http::HeaderMap;
    use warp::Filter;

    /// What a fake collector saw in one POST.
    #[derive(Debug)]
    pub(crate) struct Captured {
        pub body: String,
        pub headers: HeaderMap,
    }

    /// Starts a collector on an ephemeral port that answers `status` and
    /// forwards every POST it receives.
    pub(crate) fn fake_collector(status: u16) -> (Url, mpsc::UnboundedReceiver<Captured>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let route = warp::post()
            .and(warp::header::headers_cloned())
            .and(warp::body::bytes())
            .map(move |headers: HeaderMap, body: warp::hyper::body::Bytes| {
                let _ = tx.send(Captured {
                    body: String::from_utf8_lossy(&body).into_owned(),
                    headers,
                });
                warp::reply::with_status(
                    "ok",
                    warp::http::StatusCode::from_u16(status).unwrap(),
                )
            });
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        let url = Url::parse(&format!("http://{addr}/store")).unwrap();
        (url, rx)
    }

    /// A URL on which nothing listens.
    pub(crate) fn dead_collector() -> Url {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        Url::parse(&format!("http://{addr}/store")).unwrap()
    }

    fn reporter(url: Url, forward: bool) -> Reporter {
        Reporter::new(CollectorConfig {
            url,
            pod_ip: "10.1.2.3".parse().unwrap(),
            forward_arrive_timestamp: forward,
        })
    }

    fn request() -> WorkloadRequest {
        WorkloadRequest {
            route_timestamp: 1000.0,
            arrive_timestamp: 1010.0,
            seq_start_time: None,
            rate: 5,
            last_rate: 0,
        }
    }

    #[tokio::test]
    async fn posts_line_with_pod_ip() {
        let (url, mut rx) = fake_collector(200);
        reporter(url, false).deliver("5 1 2 3 0\n", &request()).await.unwrap();

        let seen = rx.recv().await.unwrap();
        assert_eq!(seen.body, "5 1 2 3 0\n");
        assert_eq!(seen.headers.get("x-podip").unwrap(), "10.1.2.3");
        assert!(seen.headers.get("x-arrive-timestamp").is_none());
    }

    #[tokio::test]
    async fn forwards_arrive_timestamp_when_asked() {
        let (url, mut rx) = fake_collector(200);
        reporter(url, true).deliver("line\n", &request()).await.unwrap();

        let seen = rx.recv().await.unwrap();
        assert_eq!(seen.headers.get("x-arrive-timestamp").unwrap(), "1010");
    }

    #[tokio::test]
    async fn non_success_status_is_a_delivery_error() {
        let (url, _rx) = fake_collector(503);
        let err = reporter(url.clone(), false)
            .deliver("line\n", &request())
            .await
            .unwrap_err();
        match err {
            BenchError::Delivery { url: failed, .. } => assert_eq!(failed, url),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_collector_is_a_delivery_error() {
        let url = dead_collector();
        let err = reporter(url, false).deliver("line\n", &request()).await.unwrap_err();
        assert!(err.to_string().starts_with("unable to deliver result to collector"));
    }

    #[test]
    fn pod_ip_towards_loopback() {
        let url = Url::parse("http://127.0.0.1:30001/store").unwrap();
        assert_eq!(resolve_pod_ip(&url), IpAddr::V4(Ipv4Addr::LOCALHOST));
    }
}
