use std::fmt;
use std::net::SocketAddr;
use hyper::{header, Request, Response, StatusCode, Uri};
use hyper::body::{Incoming, Bytes};
use hyper::header::{HeaderMap, HeaderName, HeaderValue};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tracing::debug;

use crate::routing::ServerTarget;

const HOP_BY_HOP_HEADERS: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_FORWARDED_HOST: &str = "x-forwarded-host";
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

#[derive(Debug)]
pub enum ProxyError {
    InvalidUri(String),
    Request(hyper::http::Error),
    Upstream(legacy::Error),
    Body(hyper::Error),
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyError::InvalidUri(e) => write!(f, "백엔드 URI 생성 실패: {}", e),
            ProxyError::Request(e) => write!(f, "프록시 요청 생성 실패: {}", e),
            ProxyError::Upstream(e) => write!(f, "백엔드 요청 실패: {}", e),
            ProxyError::Body(e) => write!(f, "백엔드 응답 본문 수집 실패: {}", e),
        }
    }
}

impl std::error::Error for ProxyError {}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidUri(_) | ProxyError::Request(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::Upstream(_) | ProxyError::Body(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

/// 백엔드 요청에 쓰는 연결 풀 클라이언트
#[derive(Clone)]
pub struct ProxyConfig {
    client: legacy::Client<HttpConnector, Incoming>,
}

impl ProxyConfig {
    pub fn new() -> Self {
        let connector = HttpConnector::new();
        let client = legacy::Client::builder(TokioExecutor::new())
            .build::<_, Incoming>(connector);

        Self { client }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// 요청 주변 정보 (X-Forwarded-* 헤더 생성용)
#[derive(Debug, Clone, Copy)]
pub struct ForwardContext<'a> {
    pub remote_addr: Option<SocketAddr>,
    pub scheme: &'a str,
}

/// 선택된 서버로 요청을 전달하고 응답을 돌려줍니다.
pub async fn forward(
    config: &ProxyConfig,
    target: &ServerTarget,
    ctx: ForwardContext<'_>,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, ProxyError> {
    let proxied_req = build_proxied_request(target, ctx, req)?;
    debug!(uri = %proxied_req.uri(), "Forwarding request");

    let res = config.client
        .request(proxied_req)
        .await
        .map_err(ProxyError::Upstream)?;

    let (mut parts, body) = res.into_parts();
    remove_hop_by_hop_headers(&mut parts.headers);
    let bytes = body.collect().await.map_err(ProxyError::Body)?.to_bytes();
    // 본문을 모두 모았으므로 길이를 다시 계산하게 둔다
    parts.headers.remove(header::CONTENT_LENGTH);

    Ok(Response::from_parts(parts, Full::new(bytes)))
}

fn build_proxied_request(
    target: &ServerTarget,
    ctx: ForwardContext<'_>,
    req: Request<Incoming>,
) -> Result<Request<Incoming>, ProxyError> {
    let path_and_query = req.uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let uri: Uri = format!("http://{}{}", target.authority(), path_and_query)
        .parse()
        .map_err(|e: hyper::http::uri::InvalidUri| ProxyError::InvalidUri(e.to_string()))?;

    let (mut parts, body) = req.into_parts();
    let incoming_host = parts.headers.get(header::HOST).cloned()
        .or_else(|| parts.uri.authority().and_then(|a| HeaderValue::from_str(a.as_str()).ok()));

    remove_hop_by_hop_headers(&mut parts.headers);
    append_forwarded_headers(&mut parts.headers, ctx, incoming_host);

    let mut builder = Request::builder()
        .method(parts.method)
        .uri(uri)
        .version(hyper::Version::HTTP_11);
    if let Some(headers) = builder.headers_mut() {
        *headers = parts.headers;
    }
    builder.body(body).map_err(ProxyError::Request)
}

fn remove_hop_by_hop_headers(headers: &mut HeaderMap) {
    // Connection 헤더에 나열된 헤더도 hop-by-hop
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP_HEADERS.iter()) {
        headers.remove(name);
    }
}

fn append_forwarded_headers(headers: &mut HeaderMap, ctx: ForwardContext<'_>, host: Option<HeaderValue>) {
    if let Some(addr) = ctx.remote_addr {
        let client_ip = addr.ip().to_string();
        let value = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
            Some(existing) => format!("{}, {}", existing, client_ip),
            None => client_ip,
        };
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(X_FORWARDED_FOR, value);
        }
    }
    if let Some(host) = host {
        headers.insert(X_FORWARDED_HOST, host);
    }
    if let Ok(proto) = HeaderValue::from_str(ctx.scheme) {
        headers.insert(X_FORWARDED_PROTO, proto);
    }
}

pub fn build_error_response(status: StatusCode, message: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(message.into()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
