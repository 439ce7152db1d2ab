use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, instrument, warn};

use crate::proxy::ProxyConfig;
use crate::settings::Settings;
use crate::tls;
use super::error::Error;
use super::handler::RequestHandler;
use super::listener::ServerInstance;
use super::watcher::TableReceiver;
use super::Result;

/// 관리자가 외부에 알리는 생명주기 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    /// `generation`번째 인스턴스가 요청을 받는 중
    Serving { generation: u64 },
    /// 다음 인스턴스 시작 전 대기 중
    Draining { generation: u64 },
    Terminated,
}

/// 서버 인스턴스를 시작하고, 새 라우팅 테이블이 오면 교체하는 관리자입니다.
///
/// 인스턴스는 동시에 하나만 새 연결을 받으며, 이전 인스턴스는
/// 유예 시간 안에서 진행 중인 요청을 마무리합니다.
pub struct ServerManager {
    listener: Arc<TcpListener>,
    tls: Option<TlsAcceptor>,
    proxy_config: ProxyConfig,
    grace_timeout: Duration,
    settle_delay: Duration,
    state_tx: watch::Sender<LifecycleState>,
}

impl ServerManager {
    /// 리스닝 소켓을 바인딩하고 TLS acceptor를 준비합니다.
    #[instrument(skip(settings), level = "debug", err)]
    pub async fn bind(settings: &Settings) -> Result<Self> {
        let address = settings.server.address;
        let listener = TcpListener::bind(address)
            .await
            .map_err(|e| {
                error!(error = %e, %address, "포트 바인딩 실패");
                Error::Bind { address, error: e }
            })?;

        let tls = tls::build_acceptor(&settings.tls).map_err(|e| Error::Tls(e.to_string()))?;
        info!(address = %listener.local_addr()?, tls = tls.is_some(), "리스너 시작");

        Ok(Self::new(listener, tls, settings.server.grace_timeout(), settings.server.settle_delay()))
    }

    pub fn new(
        listener: TcpListener,
        tls: Option<TlsAcceptor>,
        grace_timeout: Duration,
        settle_delay: Duration,
    ) -> Self {
        let (state_tx, _) = watch::channel(LifecycleState::Starting);
        Self {
            listener: Arc::new(listener),
            tls,
            proxy_config: ProxyConfig::new(),
            grace_timeout,
            settle_delay,
            state_tx,
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn subscribe_state(&self) -> watch::Receiver<LifecycleState> {
        self.state_tx.subscribe()
    }

    /// 종료 신호가 올 때까지 인스턴스를 실행합니다.
    ///
    /// 테이블이 바뀔 때마다 현재 인스턴스를 중지하고, `settle_delay` 뒤
    /// 가장 최근 테이블로 새 인스턴스를 시작합니다.
    pub async fn run(self, mut tables: TableReceiver, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut draining = JoinSet::new();
        let mut generation = 0u64;
        let mut tables_open = true;

        loop {
            if *shutdown.borrow() {
                break;
            }

            let table = tables.borrow_and_update().clone();
            generation += 1;

            let handler = Arc::new(RequestHandler::new(table, self.proxy_config.clone(), self.tls.is_some()));
            let instance = ServerInstance::start(
                generation,
                self.listener.clone(),
                handler,
                self.tls.clone(),
                self.grace_timeout,
            );
            self.state_tx.send_replace(LifecycleState::Serving { generation });

            let cutover = loop {
                tokio::select! {
                    changed = tables.changed(), if tables_open => match changed {
                        Ok(()) => break true,
                        Err(_) => {
                            warn!("라우팅 테이블 채널이 닫혔습니다, 현재 테이블로 계속 서비스합니다");
                            tables_open = false;
                        }
                    },
                    _ = shutdown.changed() => break false,
                }
            };

            debug!(instance = instance.generation(), cutover, "현재 인스턴스 중지");
            let drain = instance.stop();
            draining.spawn(async move {
                if let Err(e) = drain.await {
                    error!(error = %e, "드레이닝 태스크 실패");
                }
            });
            while draining.try_join_next().is_some() {}

            if !cutover {
                break;
            }

            self.state_tx.send_replace(LifecycleState::Draining { generation });
            tokio::time::sleep(self.settle_delay).await;
            info!(from = generation, "새 라우팅 테이블로 서버 교체");
        }

        info!(draining = draining.len(), "종료 중, 진행 중인 연결을 기다립니다");
        while draining.join_next().await.is_some() {}

        self.state_tx.send_replace(LifecycleState::Terminated);
        info!("서버 종료");
        Ok(())
    }
}
