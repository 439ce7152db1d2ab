#![allow(dead_code)]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use reverse_proxy_gateway::configuration::{Backend, Configuration, Route, Rule, Server};
use reverse_proxy_gateway::provider::{configuration_channel, ConfigurationSender};
use reverse_proxy_gateway::routing::MatcherRegistry;
use reverse_proxy_gateway::server::{
    routing_table_channel, ConfigurationWatcher, LifecycleState, ServerManager, Shutdown,
};

/// 자기 이름을 응답하는 테스트용 백엔드.
/// `/slow/{ms}` 경로는 지정한 시간만큼 기다린 뒤 응답합니다.
pub struct MockBackend {
    pub name: &'static str,
    pub addr: SocketAddr,
    pub hits: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl MockBackend {
    pub async fn start(name: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else { continue };
                let counter = counter.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let counter = counter.clone();
                        async move {
                            counter.fetch_add(1, Ordering::SeqCst);
                            if let Some(ms) = req.uri().path().strip_prefix("/slow/") {
                                let ms = ms.parse().unwrap_or(0);
                                tokio::time::sleep(Duration::from_millis(ms)).await;
                            }
                            Ok::<_, Infallible>(Response::new(Full::new(Bytes::from(name))))
                        }
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        Self { name, addr, hits, handle }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// 관리자, 감시자, 설정 채널을 묶은 테스트 게이트웨이
pub struct TestGateway {
    pub addr: SocketAddr,
    pub config_tx: ConfigurationSender,
    pub shutdown: Shutdown,
    pub state: watch::Receiver<LifecycleState>,
    manager: JoinHandle<reverse_proxy_gateway::server::Result<()>>,
}

impl TestGateway {
    pub async fn start(grace: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let manager = ServerManager::new(listener, None, grace, Duration::from_millis(20));
        let state = manager.subscribe_state();

        let (table_tx, table_rx) = routing_table_channel();
        let (config_tx, config_rx) = configuration_channel();
        tokio::spawn(ConfigurationWatcher::new(MatcherRegistry::with_defaults(), table_tx).run(config_rx));

        let shutdown = Shutdown::new();
        let manager = tokio::spawn(manager.run(table_rx, shutdown.subscribe()));

        let mut gateway = Self { addr, config_tx, shutdown, state, manager };
        gateway.wait_for_generation(1).await;
        gateway
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn push(&self, configuration: Configuration) {
        self.config_tx.send(Some(configuration)).await.unwrap();
    }

    /// 설정을 보내고 해당 세대의 인스턴스가 서비스를 시작할 때까지 기다립니다.
    pub async fn apply(&mut self, configuration: Configuration, generation: u64) {
        self.push(configuration).await;
        self.wait_for_generation(generation).await;
    }

    pub async fn wait_for_generation(&mut self, generation: u64) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let LifecycleState::Serving { generation: current } = *self.state.borrow_and_update() {
                    if current >= generation {
                        return;
                    }
                }
                self.state.changed().await.unwrap();
            }
        })
        .await
        .expect("서버 인스턴스가 시작되지 않았습니다");
    }

    pub fn generation(&self) -> Option<u64> {
        match *self.state.borrow() {
            LifecycleState::Serving { generation } => Some(generation),
            _ => None,
        }
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(10), self.manager)
            .await
            .expect("관리자가 종료되지 않았습니다")
            .unwrap()
            .unwrap();
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
}

pub async fn get_text(client: &reqwest::Client, url: &str) -> (u16, String) {
    let response = client.get(url).send().await.unwrap();
    let status = response.status().as_u16();
    (status, response.text().await.unwrap())
}

pub fn backend(servers: &[(&str, &MockBackend, u32)]) -> Backend {
    Backend::with_servers(
        servers
            .iter()
            .map(|(name, server, weight)| (name.to_string(), Server::new(server.url(), *weight))),
    )
}

pub fn route(backend: &str, rules: &[(&str, &str)]) -> Route {
    Route::new(
        backend,
        rules.iter().map(|(category, value)| Rule::new(*category, *value)).collect(),
    )
}
