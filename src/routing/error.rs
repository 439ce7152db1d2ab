use std::fmt;

/// 요청 처리 중 라우트를 찾지 못했을 때의 에러입니다.
#[derive(Debug, PartialEq)]
pub enum RoutingError {
    /// 일치하는 라우트 없음
    RouteNotFound {
        method: String,
        host: Option<String>,
        path: String,
    },
}

impl fmt::Display for RoutingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingError::RouteNotFound { method, host, path } =>
                write!(f, "일치하는 라우트 없음: {} {}{}", method, host.as_deref().unwrap_or(""), path),
        }
    }
}

impl std::error::Error for RoutingError {}

/// 규칙 카테고리를 매처로 변환하는 과정의 에러입니다.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleError {
    /// 레지스트리에 등록되지 않은 카테고리
    UnknownCategory {
        category: String,
    },
    /// 인자 개수가 맞지 않음
    InvalidArity {
        category: String,
        expected: String,
        actual: usize,
    },
    /// 인자 값이 잘못됨
    InvalidArgument {
        category: String,
        argument: String,
        reason: String,
    },
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleError::UnknownCategory { category } =>
                write!(f, "알 수 없는 규칙 카테고리: {}", category),
            RuleError::InvalidArity { category, expected, actual } =>
                write!(f, "{} 규칙 인자 개수 오류: {} 필요, {}개 전달됨", category, expected, actual),
            RuleError::InvalidArgument { category, argument, reason } =>
                write!(f, "{} 규칙 인자 {:?} 오류: {}", category, argument, reason),
        }
    }
}

impl std::error::Error for RuleError {}

/// 라우팅 테이블 빌드 중 발생하는 라우트/백엔드/서버 단위 에러입니다.
///
/// 어느 것도 빌드 전체를 중단시키지 않습니다.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildError {
    /// 규칙 적용 실패로 라우트가 제외됨
    InvalidRule {
        route: String,
        error: RuleError,
    },
    /// 존재하지 않는 백엔드를 참조하여 라우트가 제외됨
    UnknownBackend {
        route: String,
        backend: String,
    },
    /// 잘못된 서버 항목이 백엔드에서 제외됨
    InvalidServer {
        backend: String,
        server: String,
        url: String,
        reason: String,
    },
}

impl BuildError {
    /// 에러가 가리키는 라우트 이름 (서버 에러는 None)
    pub fn route(&self) -> Option<&str> {
        match self {
            BuildError::InvalidRule { route, .. } | BuildError::UnknownBackend { route, .. } => Some(route),
            BuildError::InvalidServer { .. } => None,
        }
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::InvalidRule { route, error } =>
                write!(f, "라우트 {} 규칙 오류: {}", route, error),
            BuildError::UnknownBackend { route, backend } =>
                write!(f, "라우트 {}가 존재하지 않는 백엔드 {}를 참조함", route, backend),
            BuildError::InvalidServer { backend, server, url, reason } =>
                write!(f, "백엔드 {}의 서버 {} ({}) 오류: {}", backend, server, url, reason),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::InvalidRule { error, .. } => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum BackendError {
    /// 사용 가능한 서버가 하나도 없음
    NoServers { backend: String },
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NoServers { backend } => write!(f, "백엔드 {}에 사용 가능한 서버가 없음", backend),
        }
    }
}

impl std::error::Error for BackendError {}
