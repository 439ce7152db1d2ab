//! 규칙 카테고리 이름 → 매처 생성기 레지스트리입니다.
//!
//! 카테고리는 컴파일된 열거형이 아니라 문자열 키로 조회되므로,
//! 초기화 시점에 `register`로 새 카테고리를 추가할 수 있습니다.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::routing::error::RuleError;
use crate::routing::matcher::{
    AnyOf, HeaderMatcher, HostMatcher, HostRegexMatcher, MethodMatcher, PathMatcher,
    QueryMatcher, RequestMatcher, RouteMatcher, SchemeMatcher,
};

/// 규칙 인자로부터 매처를 만드는 생성기
pub type MatcherFactory =
    Arc<dyn Fn(&[String]) -> Result<Box<dyn RequestMatcher>, RuleError> + Send + Sync>;

/// 빌드 중인 라우트. 규칙을 하나씩 적용할 때마다 조건이 좁혀집니다.
#[derive(Debug, Default)]
pub struct RouteBuilder {
    matchers: Vec<Box<dyn RequestMatcher>>,
}

impl RouteBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_matcher(mut self, matcher: Box<dyn RequestMatcher>) -> Self {
        self.matchers.push(matcher);
        self
    }

    pub fn constraint_count(&self) -> usize {
        self.matchers.len()
    }

    pub fn build(self) -> RouteMatcher {
        RouteMatcher::new(self.matchers)
    }
}

#[derive(Clone, Default)]
pub struct MatcherRegistry {
    factories: HashMap<String, MatcherFactory>,
}

impl fmt::Debug for MatcherRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatcherRegistry")
            .field("categories", &self.categories())
            .finish()
    }
}

impl MatcherRegistry {
    /// 카테고리가 하나도 없는 빈 레지스트리
    pub fn new() -> Self {
        Self::default()
    }

    /// 기본 규칙 카테고리가 모두 등록된 레지스트리
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register("Host", |args| {
            any_of("Host", args, |arg| Ok(Box::new(HostMatcher::new(arg)?)))
        });
        registry.register("HostRegexp", |args| {
            any_of("HostRegexp", args, |arg| Ok(Box::new(HostRegexMatcher::new(arg)?)))
        });
        registry.register("Path", |args| {
            any_of("Path", args, |arg| Ok(Box::new(PathMatcher::exact(arg)?)))
        });
        registry.register("PathPrefix", |args| {
            any_of("PathPrefix", args, |arg| Ok(Box::new(PathMatcher::prefix(arg)?)))
        });
        registry.register("PathRegexp", |args| {
            any_of("PathRegexp", args, |arg| Ok(Box::new(PathMatcher::regex(arg)?)))
        });
        registry.register("Headers", |args| Ok(Box::new(HeaderMatcher::exact(args)?)));
        registry.register("HeadersRegexp", |args| Ok(Box::new(HeaderMatcher::regex(args)?)));
        registry.register("Queries", |args| Ok(Box::new(QueryMatcher::new(args)?)));
        registry.register("Schemes", |args| {
            require_some("Schemes", args)?;
            Ok(Box::new(SchemeMatcher::new(args)?))
        });

        let methods: MatcherFactory = Arc::new(|args: &[String]| {
            require_some("Methods", args)?;
            Ok(Box::new(MethodMatcher::new(args)?) as Box<dyn RequestMatcher>)
        });
        registry.register_factory("Method", methods.clone());
        registry.register_factory("Methods", methods);

        registry
    }

    /// 카테고리 생성기를 등록합니다. 같은 이름이 있으면 교체됩니다.
    pub fn register<F>(&mut self, category: impl Into<String>, factory: F)
    where
        F: Fn(&[String]) -> Result<Box<dyn RequestMatcher>, RuleError> + Send + Sync + 'static,
    {
        self.register_factory(category, Arc::new(factory));
    }

    pub fn register_factory(&mut self, category: impl Into<String>, factory: MatcherFactory) {
        self.factories.insert(category.into(), factory);
    }

    pub fn contains(&self, category: &str) -> bool {
        self.factories.contains_key(category)
    }

    pub fn categories(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// 카테고리 이름으로 생성기를 찾아 빌드 중인 라우트에 조건을 추가합니다.
    pub fn apply(&self, route: RouteBuilder, category: &str, args: &[String]) -> Result<RouteBuilder, RuleError> {
        let factory = self.factories.get(category).ok_or_else(|| RuleError::UnknownCategory {
            category: category.to_string(),
        })?;

        debug!(category = %category, args = ?args, "규칙 적용");
        let matcher = factory(args)?;
        Ok(route.with_matcher(matcher))
    }
}

fn require_some(category: &str, args: &[String]) -> Result<(), RuleError> {
    if args.is_empty() {
        return Err(RuleError::InvalidArity {
            category: category.to_string(),
            expected: "1개 이상".to_string(),
            actual: 0,
        });
    }
    Ok(())
}

fn any_of<F>(category: &str, args: &[String], build: F) -> Result<Box<dyn RequestMatcher>, RuleError>
where
    F: Fn(&str) -> Result<Box<dyn RequestMatcher>, RuleError>,
{
    require_some(category, args)?;
    let mut matchers = args.iter().map(|arg| build(arg.as_str())).collect::<Result<Vec<_>, _>>()?;
    if matchers.len() == 1 {
        return Ok(matchers.remove(0));
    }
    Ok(Box::new(AnyOf(matchers)))
}
