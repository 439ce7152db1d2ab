use std::fmt;
use hyper::header::HeaderName;
use hyper::{HeaderMap, Method, Request, Uri};
use regex_lite as regex;

use crate::routing::error::RuleError;
use crate::routing::host::HostInfo;

/// 매처가 요청을 검사할 때 보는 읽기 전용 뷰입니다.
#[derive(Debug)]
pub struct MatchContext<'a> {
    pub method: &'a Method,
    pub uri: &'a Uri,
    pub headers: &'a HeaderMap,
    pub host: Option<HostInfo>,
    /// 연결 수준 스킴 ("http" 또는 "https")
    pub scheme: &'a str,
}

impl<'a> MatchContext<'a> {
    pub fn new(method: &'a Method, uri: &'a Uri, headers: &'a HeaderMap, scheme: &'a str) -> Self {
        Self {
            method,
            uri,
            headers,
            host: HostInfo::from_parts(uri, headers),
            scheme,
        }
    }

    pub fn from_request<B>(req: &'a Request<B>, scheme: &'a str) -> Self {
        Self::new(req.method(), req.uri(), req.headers(), scheme)
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn host_name(&self) -> Option<&str> {
        self.host.as_ref().map(|h| h.name.as_str())
    }
}

/// 단일 매칭 조건. 규칙 카테고리마다 구현이 하나씩 있습니다.
pub trait RequestMatcher: Send + Sync + fmt::Debug {
    fn matches(&self, ctx: &MatchContext<'_>) -> bool;
}

/// 인자 중 하나라도 만족하면 매칭 (여러 인자를 받는 카테고리용)
#[derive(Debug)]
pub struct AnyOf(pub Vec<Box<dyn RequestMatcher>>);

impl RequestMatcher for AnyOf {
    fn matches(&self, ctx: &MatchContext<'_>) -> bool {
        self.0.iter().any(|m| m.matches(ctx))
    }
}

/// 라우트의 최종 매처. 모든 조건을 AND로 결합합니다.
#[derive(Debug, Default)]
pub struct RouteMatcher {
    matchers: Vec<Box<dyn RequestMatcher>>,
}

impl RouteMatcher {
    pub fn new(matchers: Vec<Box<dyn RequestMatcher>>) -> Self {
        Self { matchers }
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

impl RequestMatcher for RouteMatcher {
    fn matches(&self, ctx: &MatchContext<'_>) -> bool {
        self.matchers.iter().all(|m| m.matches(ctx))
    }
}

fn compile_anchored(category: &str, pattern: &str) -> Result<regex::Regex, RuleError> {
    let body = pattern.strip_prefix('^').unwrap_or(pattern);
    let body = body.strip_suffix('$').unwrap_or(body);
    regex::Regex::new(&format!("^(?:{})$", body)).map_err(|e| RuleError::InvalidArgument {
        category: category.to_string(),
        argument: pattern.to_string(),
        reason: e.to_string(),
    })
}

fn invalid(category: &str, argument: &str, reason: &str) -> RuleError {
    RuleError::InvalidArgument {
        category: category.to_string(),
        argument: argument.to_string(),
        reason: reason.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum HostPattern {
    Exact(String),
    /// "*.example.com" → ".example.com"
    Wildcard(String),
}

#[derive(Debug, Clone)]
pub struct HostMatcher {
    pattern: HostPattern,
}

impl HostMatcher {
    pub fn new(host: &str) -> Result<Self, RuleError> {
        let info = HostInfo::from_header_value(host)
            .ok_or_else(|| invalid("Host", host, "유효하지 않은 호스트"))?;

        let pattern = match info.name.strip_prefix('*') {
            Some(suffix) if suffix.starts_with('.') && suffix.len() > 1 => HostPattern::Wildcard(suffix.to_string()),
            Some(_) => return Err(invalid("Host", host, "와일드카드는 '*.' 형태여야 함")),
            None => HostPattern::Exact(info.name),
        };
        Ok(Self { pattern })
    }
}

impl RequestMatcher for HostMatcher {
    fn matches(&self, ctx: &MatchContext<'_>) -> bool {
        let Some(name) = ctx.host_name() else {
            return false;
        };
        match &self.pattern {
            HostPattern::Exact(host) => host == name,
            HostPattern::Wildcard(suffix) => name.len() > suffix.len() && name.ends_with(suffix.as_str()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HostRegexMatcher {
    regex: regex::Regex,
}

impl HostRegexMatcher {
    pub fn new(pattern: &str) -> Result<Self, RuleError> {
        Ok(Self { regex: compile_anchored("HostRegexp", pattern)? })
    }
}

impl RequestMatcher for HostRegexMatcher {
    fn matches(&self, ctx: &MatchContext<'_>) -> bool {
        ctx.host_name().map_or(false, |name| self.regex.is_match(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathMatcherKind {
    Exact,
    Prefix,
    Regex,
}

#[derive(Debug, Clone)]
pub struct PathMatcher {
    pub kind: PathMatcherKind,
    pub pattern: String,
    regex: Option<regex::Regex>,
}

impl PathMatcher {
    pub fn exact(pattern: &str) -> Result<Self, RuleError> {
        Self::literal(PathMatcherKind::Exact, "Path", pattern)
    }

    pub fn prefix(pattern: &str) -> Result<Self, RuleError> {
        Self::literal(PathMatcherKind::Prefix, "PathPrefix", pattern)
    }

    pub fn regex(pattern: &str) -> Result<Self, RuleError> {
        Ok(PathMatcher {
            kind: PathMatcherKind::Regex,
            pattern: pattern.to_string(),
            regex: Some(compile_anchored("PathRegexp", pattern)?),
        })
    }

    fn literal(kind: PathMatcherKind, category: &str, pattern: &str) -> Result<Self, RuleError> {
        if !pattern.starts_with('/') {
            return Err(invalid(category, pattern, "경로는 '/'로 시작해야 함"));
        }
        Ok(PathMatcher {
            kind,
            pattern: pattern.to_string(),
            regex: None,
        })
    }

    pub fn matches_path(&self, path: &str) -> bool {
        match self.kind {
            PathMatcherKind::Exact => self.pattern == path,
            // 세그먼트 경계를 따지지 않는 단순 접두사 매칭
            PathMatcherKind::Prefix => path.starts_with(&self.pattern),
            PathMatcherKind::Regex => self.regex.as_ref()
                .map(|r| r.is_match(path))
                .unwrap_or(false),
        }
    }
}

impl RequestMatcher for PathMatcher {
    fn matches(&self, ctx: &MatchContext<'_>) -> bool {
        self.matches_path(ctx.path())
    }
}

impl PartialEq for PathMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.pattern == other.pattern
    }
}

impl Eq for PathMatcher {}

#[derive(Debug, Clone)]
pub struct MethodMatcher {
    methods: Vec<Method>,
}

impl MethodMatcher {
    pub fn new(methods: &[String]) -> Result<Self, RuleError> {
        let methods = methods
            .iter()
            .map(|m| {
                Method::from_bytes(m.trim().to_ascii_uppercase().as_bytes())
                    .map_err(|e| invalid("Methods", m, &e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { methods })
    }
}

impl RequestMatcher for MethodMatcher {
    fn matches(&self, ctx: &MatchContext<'_>) -> bool {
        self.methods.contains(ctx.method)
    }
}

#[derive(Debug, Clone)]
enum ValueCheck {
    Present,
    Equals(String),
    Regex(regex::Regex),
}

impl ValueCheck {
    fn check(&self, value: &str) -> bool {
        match self {
            ValueCheck::Present => true,
            ValueCheck::Equals(expected) => expected == value,
            ValueCheck::Regex(re) => re.is_match(value),
        }
    }
}

fn pairs<'a>(category: &str, args: &'a [String]) -> Result<Vec<(&'a str, &'a str)>, RuleError> {
    if args.is_empty() || args.len() % 2 != 0 {
        return Err(RuleError::InvalidArity {
            category: category.to_string(),
            expected: "키/값 쌍".to_string(),
            actual: args.len(),
        });
    }
    Ok(args.chunks(2).map(|pair| (pair[0].as_str(), pair[1].as_str())).collect())
}

/// 모든 헤더 쌍을 만족해야 매칭됩니다. 빈 값은 존재 여부만 검사합니다.
#[derive(Debug, Clone)]
pub struct HeaderMatcher {
    checks: Vec<(HeaderName, ValueCheck)>,
}

impl HeaderMatcher {
    pub fn exact(args: &[String]) -> Result<Self, RuleError> {
        Self::build("Headers", args, |_, value| {
            Ok(if value.is_empty() { ValueCheck::Present } else { ValueCheck::Equals(value.to_string()) })
        })
    }

    pub fn regex(args: &[String]) -> Result<Self, RuleError> {
        Self::build("HeadersRegexp", args, |category, value| {
            Ok(ValueCheck::Regex(compile_anchored(category, value)?))
        })
    }

    fn build<F>(category: &str, args: &[String], check: F) -> Result<Self, RuleError>
    where
        F: Fn(&str, &str) -> Result<ValueCheck, RuleError>,
    {
        let checks = pairs(category, args)?
            .into_iter()
            .map(|(name, value)| {
                let header = HeaderName::from_bytes(name.trim().as_bytes())
                    .map_err(|e| invalid(category, name, &e.to_string()))?;
                Ok((header, check(category, value)?))
            })
            .collect::<Result<Vec<_>, RuleError>>()?;
        Ok(Self { checks })
    }
}

impl RequestMatcher for HeaderMatcher {
    fn matches(&self, ctx: &MatchContext<'_>) -> bool {
        self.checks.iter().all(|(name, check)| {
            ctx.headers
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .any(|v| check.check(v))
        })
    }
}

#[derive(Debug, Clone)]
pub struct QueryMatcher {
    checks: Vec<(String, ValueCheck)>,
}

impl QueryMatcher {
    pub fn new(args: &[String]) -> Result<Self, RuleError> {
        let checks = pairs("Queries", args)?
            .into_iter()
            .map(|(key, value)| {
                let check = if value.is_empty() { ValueCheck::Present } else { ValueCheck::Equals(value.to_string()) };
                (key.to_string(), check)
            })
            .collect();
        Ok(Self { checks })
    }
}

impl RequestMatcher for QueryMatcher {
    fn matches(&self, ctx: &MatchContext<'_>) -> bool {
        let query = ctx.uri.query().unwrap_or("");
        let params: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();

        self.checks.iter().all(|(key, check)| {
            params.iter().any(|(k, v)| k == key && check.check(v))
        })
    }
}

#[derive(Debug, Clone)]
pub struct SchemeMatcher {
    schemes: Vec<String>,
}

impl SchemeMatcher {
    pub fn new(schemes: &[String]) -> Result<Self, RuleError> {
        let schemes = schemes
            .iter()
            .map(|s| {
                let scheme = s.trim().to_ascii_lowercase();
                match scheme.as_str() {
                    "http" | "https" => Ok(scheme),
                    _ => Err(invalid("Schemes", s, "http 또는 https만 지원")),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { schemes })
    }
}

impl RequestMatcher for SchemeMatcher {
    fn matches(&self, ctx: &MatchContext<'_>) -> bool {
        self.schemes.iter().any(|s| s == ctx.scheme)
    }
}
