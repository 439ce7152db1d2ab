use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use hyper::{Request, Response, StatusCode};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use http_body_util::Full;
use tokio::sync::watch;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::logging::{log_request, RequestLog};
use crate::proxy::{self, ForwardContext, ProxyConfig};
use crate::routing::RoutingTable;

/// 라우트가 없는 요청에 대한 고정 응답 본문
pub const NOT_FOUND_BODY: &str = "404 page not found\n";

/// 서버 인스턴스 하나에 묶인 요청 처리기. 인스턴스의 라우팅 테이블은 바뀌지 않습니다.
pub struct RequestHandler {
    routing_table: Arc<RoutingTable>,
    proxy_config: ProxyConfig,
    scheme: &'static str,
}

impl RequestHandler {
    pub fn new(routing_table: Arc<RoutingTable>, proxy_config: ProxyConfig, tls: bool) -> Self {
        Self {
            routing_table,
            proxy_config,
            scheme: if tls { "https" } else { "http" },
        }
    }

    pub fn routing_table(&self) -> &Arc<RoutingTable> {
        &self.routing_table
    }

    #[instrument(skip(self, req), fields(method = %req.method(), path = %req.uri().path()))]
    pub async fn handle_request(
        &self,
        req: Request<Incoming>,
        remote_addr: Option<SocketAddr>,
    ) -> Result<Response<Full<Bytes>>, Infallible> {
        let start_time = Instant::now();
        let mut log = RequestLog::new(Uuid::new_v4().to_string());
        log.with_request(&req);

        let response = match self.routing_table.route_request(&req, self.scheme) {
            Err(e) => {
                debug!(error = %e, "라우팅 실패");
                proxy::build_error_response(StatusCode::NOT_FOUND, NOT_FOUND_BODY)
            }
            Ok(route) => {
                log.with_route(&route.name);
                match route.backend().next_server() {
                    Err(e) => {
                        log.with_error(&e);
                        proxy::build_error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
                    }
                    Ok(target) => {
                        log.with_backend(&target.url);
                        let ctx = ForwardContext {
                            remote_addr,
                            scheme: self.scheme,
                        };
                        match proxy::forward(&self.proxy_config, target, ctx, req).await {
                            Ok(response) => response,
                            Err(e) => {
                                log.with_error(&e);
                                proxy::build_error_response(e.status(), e.to_string())
                            }
                        }
                    }
                }
            }
        };

        log.with_response(response.status());
        log.duration_ms = start_time.elapsed().as_millis() as u64;
        log_request(&log);

        Ok(response)
    }

    /// 연결 하나를 처리합니다. 중지 신호를 받으면 진행 중인 요청을 마친 뒤 연결을 닫습니다.
    pub async fn serve_connection<I>(
        self: Arc<Self>,
        io: I,
        remote_addr: Option<SocketAddr>,
        mut stop_rx: watch::Receiver<bool>,
    ) -> Result<(), hyper::Error>
    where
        I: hyper::rt::Read + hyper::rt::Write + Send + Unpin + 'static,
    {
        let handler = self.clone();
        let service = service_fn(move |req| {
            let handler = handler.clone();
            async move { handler.handle_request(req, remote_addr).await }
        });

        let conn = http1::Builder::new().serve_connection(io, service);
        let mut conn = std::pin::pin!(conn);

        let mut stopping = *stop_rx.borrow();
        if stopping {
            conn.as_mut().graceful_shutdown();
        }

        loop {
            tokio::select! {
                result = conn.as_mut() => return result,
                _ = stop_rx.changed(), if !stopping => {
                    stopping = true;
                    conn.as_mut().graceful_shutdown();
                }
            }
        }
    }
}
