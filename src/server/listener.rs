use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, warn};

use super::handler::RequestHandler;

/// 연결 수락 실패 후 다시 시도하기 전 대기 시간 (EMFILE 등)
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// 하나의 라우팅 테이블에 묶인 서버 인스턴스입니다.
///
/// 리스닝 소켓은 인스턴스들이 공유하므로 교체 중에도 포트가 닫히지 않습니다.
pub struct ServerInstance {
    generation: u64,
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ServerInstance {
    pub fn start(
        generation: u64,
        listener: Arc<TcpListener>,
        handler: Arc<RequestHandler>,
        tls: Option<TlsAcceptor>,
        grace_timeout: Duration,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(accept_loop(generation, listener, handler, tls, grace_timeout, stop_rx));

        Self {
            generation,
            stop_tx,
            task,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// 새 연결 수락을 멈추고 드레이닝을 시작합니다.
    /// 반환된 핸들은 모든 연결이 끝나거나 유예 시간이 지나면 완료됩니다.
    pub fn stop(self) -> JoinHandle<()> {
        debug!(instance = self.generation, "인스턴스 중지 요청");
        self.stop_tx.send_replace(true);
        self.task
    }
}

async fn accept_loop(
    generation: u64,
    listener: Arc<TcpListener>,
    handler: Arc<RequestHandler>,
    tls: Option<TlsAcceptor>,
    grace_timeout: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut connections = JoinSet::new();
    info!(instance = generation, routes = handler.routing_table().len(), "서버 인스턴스 시작");

    loop {
        tokio::select! {
            _ = stop_rx.changed() => break,
            result = listener.accept() => {
                match result {
                    Ok((stream, remote_addr)) => {
                        connections.spawn(handle_stream(
                            handler.clone(),
                            tls.clone(),
                            stream,
                            remote_addr,
                            stop_rx.clone(),
                        ));
                    }
                    Err(e) => backoff_after_accept_error(generation, &e).await,
                }
            }
            Some(finished) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = finished {
                    if e.is_panic() {
                        error!(instance = generation, error = %e, "연결 태스크 패닉");
                    }
                }
            }
        }
    }

    let active = connections.len();
    info!(instance = generation, active_connections = active, "드레이닝 시작");

    let drained = tokio::time::timeout(grace_timeout, async {
        while connections.join_next().await.is_some() {}
    })
    .await;

    if drained.is_err() {
        warn!(
            instance = generation,
            remaining = connections.len(),
            grace_secs = grace_timeout.as_secs_f64(),
            "유예 시간 초과, 남은 연결을 강제 종료합니다"
        );
        connections.shutdown().await;
    }

    info!(instance = generation, "서버 인스턴스 종료");
}

async fn backoff_after_accept_error(generation: u64, error: &std::io::Error) {
    error!(instance = generation, error = %error, "연결 수락 실패");
    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
}

async fn handle_stream(
    handler: Arc<RequestHandler>,
    tls: Option<TlsAcceptor>,
    stream: TcpStream,
    remote_addr: SocketAddr,
    stop_rx: watch::Receiver<bool>,
) {
    match tls {
        Some(acceptor) => match acceptor.accept(stream).await {
            Ok(tls_stream) => {
                let io = TokioIo::new(tls_stream);
                if let Err(err) = handler.serve_connection(io, Some(remote_addr), stop_rx).await {
                    error!(error = %err, "HTTPS 연결 처리 실패");
                }
            }
            Err(e) => {
                error!(error = %e, "TLS 핸드쉐이크 실패");
            }
        },
        None => {
            let io = TokioIo::new(stream);
            if let Err(err) = handler.serve_connection(io, Some(remote_addr), stop_rx).await {
                debug!(error = %err, "HTTP 연결 처리 실패");
            }
        }
    }
}
