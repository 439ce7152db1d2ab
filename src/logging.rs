use std::fs::OpenOptions;
use tracing::{debug, info, warn, error, Level, span};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

use crate::settings::{LogFormat, LogSettings, SettingsError};

/// 파일 로거의 백그라운드 writer를 붙잡아 두는 가드입니다.
/// 드롭되면 남은 로그를 flush 합니다.
#[must_use]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// 로그 설정에 따라 전역 subscriber를 설치합니다.
///
/// 로그 파일을 열 수 없거나 subscriber가 이미 설치된 경우 에러를 반환합니다.
pub fn init_logging(settings: &LogSettings) -> Result<LoggingGuard, SettingsError> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(settings.level).into())
        .from_env_lossy();

    let stdout_layer = settings.stdout.then(|| match settings.format {
        LogFormat::Text => fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .boxed(),
    });

    let (file_layer, file_guard) = match &settings.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| SettingsError::FileError {
                    path: path.to_string_lossy().to_string(),
                    error: e,
                })?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .with(filter)
        .try_init()
        .map_err(|e| SettingsError::InvalidConfig(format!("로깅 초기화 실패: {}", e)))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// 요청 하나의 처리 기록입니다.
#[derive(Debug)]
pub struct RequestLog {
    pub request_id: String,
    pub method: String,
    pub path: String,
    pub host: String,
    pub route: Option<String>,
    pub status_code: u16,
    pub duration_ms: u64,
    pub backend_address: Option<String>,
    pub error: Option<String>,
}

impl RequestLog {
    pub fn new(request_id: String) -> Self {
        Self {
            request_id,
            method: String::new(),
            path: String::new(),
            host: String::new(),
            route: None,
            status_code: 0,
            duration_ms: 0,
            backend_address: None,
            error: None,
        }
    }

    pub fn with_request<B>(&mut self, req: &hyper::Request<B>) {
        self.method = req.method().to_string();
        self.path = req.uri().path().to_string();
        if let Some(host) = req.headers().get(hyper::header::HOST) {
            self.host = host.to_str().unwrap_or_default().to_string();
        }

        debug!(
            request_id = %self.request_id,
            method = %self.method,
            path = %self.path,
            host = %self.host,
            "Received request"
        );
    }

    pub fn with_route(&mut self, route: &str) {
        self.route = Some(route.to_string());
    }

    pub fn with_response(&mut self, status: hyper::StatusCode) {
        self.status_code = status.as_u16();
    }

    pub fn with_backend(&mut self, address: impl std::fmt::Display) {
        self.backend_address = Some(address.to_string());
        debug!(
            request_id = %self.request_id,
            backend = %self.backend_address.as_deref().unwrap_or_default(),
            "Selected backend"
        );
    }

    pub fn with_error(&mut self, error: impl std::fmt::Display) {
        self.error = Some(error.to_string());
    }
}

pub fn log_request(log: &RequestLog) {
    let level = if log.error.is_some() {
        Level::ERROR
    } else if log.status_code >= 400 {
        Level::WARN
    } else {
        Level::INFO
    };

    let span = span!(
        Level::INFO,
        "request",
        request_id = %log.request_id,
        method = %log.method,
        path = %log.path,
        host = %log.host,
        status = %log.status_code,
        duration_ms = %log.duration_ms
    );
    let _enter = span.enter();

    match level {
        Level::ERROR => error!(
            route = ?log.route,
            backend = ?log.backend_address,
            error = ?log.error,
            "Request failed"
        ),
        Level::WARN => warn!(
            route = ?log.route,
            backend = ?log.backend_address,
            "Request completed with warning"
        ),
        _ => info!(
            route = ?log.route,
            backend = ?log.backend_address,
            "Request completed successfully"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_log_records_request() {
        let req = hyper::Request::builder()
            .method("POST")
            .uri("/api/items")
            .header("host", "a.com")
            .body(())
            .unwrap();

        let mut log = RequestLog::new("id-1".to_string());
        log.with_request(&req);
        log.with_route("api");
        log.with_response(hyper::StatusCode::CREATED);

        assert_eq!(log.method, "POST");
        assert_eq!(log.path, "/api/items");
        assert_eq!(log.host, "a.com");
        assert_eq!(log.route.as_deref(), Some("api"));
        assert_eq!(log.status_code, 201);
    }

    #[test]
    fn test_unopenable_log_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LogSettings {
            stdout: false,
            file: Some(dir.path().join("missing").join("gateway.log")),
            ..LogSettings::default()
        };
        assert!(matches!(init_logging(&settings), Err(SettingsError::FileError { .. })));
    }
}
