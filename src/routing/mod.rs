//! 규칙 기반 라우팅의 핵심 기능을 제공하는 모듈입니다.
//!
//! 규칙 디스패처(`MatcherRegistry`), 백엔드 풀(`BackendPool`, `LoadBalancer`),
//! 라우트 테이블 빌더(`TableBuilder`)로 구성됩니다.

mod error;
mod host;
mod backend;
mod matcher;
mod registry;
mod table;

pub use error::{RoutingError, RuleError, BuildError, BackendError};
pub use host::HostInfo;
pub use backend::{BackendPool, LoadBalancer, ServerTarget};
pub use matcher::{
    AnyOf, HeaderMatcher, HostMatcher, HostRegexMatcher, MatchContext, MethodMatcher,
    PathMatcher, PathMatcherKind, QueryMatcher, RequestMatcher, RouteMatcher, SchemeMatcher,
};
pub use registry::{MatcherFactory, MatcherRegistry, RouteBuilder};
pub use table::{BuildReport, CompiledRoute, RoutingTable, TableBuilder};
