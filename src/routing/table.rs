use std::sync::Arc;
use hyper::Request;
use tracing::{debug, error, info, warn};

use crate::configuration::{Configuration, Rule};
use crate::routing::{
    BackendPool,
    BuildError,
    LoadBalancer,
    MatchContext,
    MatcherRegistry,
    RequestMatcher,
    RouteBuilder,
    RouteMatcher,
    RoutingError,
};

/// 매처와 백엔드 핸들러가 연결된 라우트 하나입니다.
#[derive(Debug)]
pub struct CompiledRoute {
    pub name: String,
    matcher: RouteMatcher,
    backend: Arc<LoadBalancer>,
}

impl CompiledRoute {
    pub fn new(name: impl Into<String>, matcher: RouteMatcher, backend: Arc<LoadBalancer>) -> Self {
        Self {
            name: name.into(),
            matcher,
            backend,
        }
    }

    pub fn backend(&self) -> &Arc<LoadBalancer> {
        &self.backend
    }

    pub fn matches(&self, ctx: &MatchContext<'_>) -> bool {
        self.matcher.matches(ctx)
    }
}

/// 완성된 뒤에는 변경되지 않는 라우팅 테이블입니다.
///
/// 라우트는 추가된 순서대로 검사하며 처음 일치하는 라우트를 사용합니다.
#[derive(Debug, Default)]
pub struct RoutingTable {
    routes: Vec<CompiledRoute>,
}

impl RoutingTable {
    /// 라우트가 없는 테이블. 모든 요청이 not found로 응답됩니다.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_routes(routes: Vec<CompiledRoute>) -> Self {
        Self { routes }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn route_names(&self) -> Vec<&str> {
        self.routes.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&CompiledRoute> {
        self.routes.iter().find(|r| r.name == name)
    }

    pub fn find(&self, ctx: &MatchContext<'_>) -> Option<&CompiledRoute> {
        self.routes.iter().find(|route| route.matches(ctx))
    }

    /// HTTP 요청에 해당하는 라우트를 찾습니다.
    ///
    /// # 인자
    ///
    /// * `req` - HTTP 요청
    /// * `scheme` - 요청이 들어온 연결의 스킴 ("http" 또는 "https")
    pub fn route_request<B>(&self, req: &Request<B>, scheme: &str) -> Result<&CompiledRoute, RoutingError> {
        let ctx = MatchContext::from_request(req, scheme);
        match self.find(&ctx) {
            Some(route) => {
                debug!(route = %route.name, backend = %route.backend.name(), "라우트 찾음");
                Ok(route)
            }
            None => Err(RoutingError::RouteNotFound {
                method: req.method().to_string(),
                host: ctx.host_name().map(str::to_string),
                path: req.uri().path().to_string(),
            }),
        }
    }
}

/// 테이블 빌드 결과. 부분 성공을 허용하므로 에러 목록을 함께 돌려줍니다.
#[derive(Debug)]
pub struct BuildReport {
    pub table: RoutingTable,
    pub errors: Vec<BuildError>,
}

impl BuildReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// 설정 하나를 라우팅 테이블로 변환합니다.
#[derive(Debug, Clone, Copy)]
pub struct TableBuilder<'a> {
    registry: &'a MatcherRegistry,
}

impl<'a> TableBuilder<'a> {
    pub fn new(registry: &'a MatcherRegistry) -> Self {
        Self { registry }
    }

    pub fn build(&self, configuration: &Configuration) -> BuildReport {
        let mut pool = BackendPool::new(&configuration.backends);
        let mut routes = Vec::with_capacity(configuration.routes.len());
        let mut errors = Vec::new();

        for (route_name, route) in &configuration.routes {
            debug!(route = %route_name, "라우트 생성");

            let matcher = match self.build_matcher(route_name, &route.rules) {
                Ok(matcher) => matcher,
                Err(e) => {
                    error!(route = %route_name, error = %e, "라우트 규칙 생성 실패, 라우트 제외");
                    errors.push(e);
                    continue;
                }
            };

            let Some(backend) = pool.resolve(&route.backend) else {
                let e = BuildError::UnknownBackend {
                    route: route_name.clone(),
                    backend: route.backend.clone(),
                };
                error!(route = %route_name, backend = %route.backend, "존재하지 않는 백엔드, 라우트 제외");
                errors.push(e);
                continue;
            };

            routes.push(CompiledRoute::new(route_name.clone(), matcher, backend));
        }

        let backend_count = pool.len();
        errors.extend(pool.into_errors());

        if errors.is_empty() {
            info!(routes = routes.len(), backends = backend_count, "라우팅 테이블 생성 완료");
        } else {
            warn!(routes = routes.len(), backends = backend_count, errors = errors.len(), "라우팅 테이블 일부 생성 실패");
        }

        BuildReport {
            table: RoutingTable::from_routes(routes),
            errors,
        }
    }

    fn build_matcher(&self, route_name: &str, rules: &[Rule]) -> Result<RouteMatcher, BuildError> {
        let mut builder = RouteBuilder::new();
        for rule in rules {
            debug!(route = %route_name, category = %rule.category, "규칙 생성");
            builder = self.registry
                .apply(builder, &rule.category, &rule.arguments())
                .map_err(|error| BuildError::InvalidRule {
                    route: route_name.to_string(),
                    error,
                })?;
        }
        Ok(builder.build())
    }
}
