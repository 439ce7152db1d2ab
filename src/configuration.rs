//! 프로바이더가 밀어 넣는 동적 설정 스냅샷입니다.
//!
//! 라우트는 문서에 선언된 순서를 유지하며, 라우팅 테이블은 이 순서대로
//! 먼저 매칭되는 라우트를 선택합니다. 백엔드는 이름 순으로 보관됩니다.

use std::collections::BTreeMap;
use std::fmt;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// 라우팅 규칙과 백엔드 풀 전체를 담는 불변 스냅샷입니다.
///
/// 두 스냅샷은 필드 단위 구조적 동등성으로 비교되며,
/// 동일한 스냅샷은 새 설정으로 취급되지 않습니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Configuration {
    /// 선언 순서가 곧 매칭 우선순위
    #[serde(default)]
    pub routes: IndexMap<String, Route>,
    #[serde(default)]
    pub backends: BTreeMap<String, Backend>,
}

// IndexMap의 PartialEq는 순서를 무시하므로 라우트 순서까지 비교
impl PartialEq for Configuration {
    fn eq(&self, other: &Self) -> bool {
        self.routes.len() == other.routes.len()
            && self.routes.iter().eq(other.routes.iter())
            && self.backends == other.backends
    }
}

impl Eq for Configuration {}

/// 규칙 체인과 대상 백엔드 이름입니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// 선언 순서대로 적용되며 모두 만족해야 매칭됩니다.
    #[serde(default)]
    pub rules: Vec<Rule>,
    pub backend: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub category: String,
    pub value: RuleValue,
}

/// 규칙 인자. 단일 문자열 또는 문자열 목록을 허용합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Single(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backend {
    #[serde(default)]
    pub servers: BTreeMap<String, Server>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

/// 설정 문서 디코딩 실패
#[derive(Debug)]
pub enum ConfigurationError {
    Toml(toml::de::Error),
    Json(serde_json::Error),
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Toml(e) => write!(f, "TOML 설정 파싱 오류: {}", e),
            Self::Json(e) => write!(f, "JSON 설정 파싱 오류: {}", e),
        }
    }
}

impl std::error::Error for ConfigurationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Toml(e) => Some(e),
            Self::Json(e) => Some(e),
        }
    }
}

impl Configuration {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigurationError> {
        toml::from_str(content).map_err(ConfigurationError::Toml)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(content).map_err(ConfigurationError::Json)
    }

    /// 라우트와 백엔드가 모두 비어 있으면 "아직 데이터 없음"으로 간주합니다.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty() && self.backends.is_empty()
    }
}

impl Rule {
    pub fn new(category: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            value: RuleValue::Single(value.into()),
        }
    }

    pub fn with_values<I, S>(category: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            category: category.into(),
            value: RuleValue::Many(values.into_iter().map(Into::into).collect()),
        }
    }

    /// 매처 생성기에 넘길 인자 목록
    pub fn arguments(&self) -> Vec<String> {
        match &self.value {
            RuleValue::Single(value) => vec![value.clone()],
            RuleValue::Many(values) => values.clone(),
        }
    }
}

impl Route {
    pub fn new(backend: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self {
            rules,
            backend: backend.into(),
        }
    }
}

impl Server {
    pub fn new(url: impl Into<String>, weight: u32) -> Self {
        Self {
            url: url.into(),
            weight,
        }
    }
}

impl Backend {
    pub fn with_servers<I, N>(servers: I) -> Self
    where
        I: IntoIterator<Item = (N, Server)>,
        N: Into<String>,
    {
        Self {
            servers: servers.into_iter().map(|(name, server)| (name.into(), server)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [backends.backend1.servers.server1]
        url = "http://127.0.0.1:9001"
        weight = 1

        [backends.backend1.servers.server2]
        url = "http://127.0.0.1:9002"
        weight = 3

        [routes.api]
        backend = "backend1"
        rules = [
            { category = "Host", value = "a.com" },
            { category = "Methods", value = ["GET", "POST"] },
        ]
    "#;

    #[test]
    fn test_parse_toml_configuration() {
        let config = Configuration::from_toml_str(SAMPLE).unwrap();

        assert_eq!(config.backends["backend1"].servers.len(), 2);
        assert_eq!(config.backends["backend1"].servers["server2"].weight, 3);

        let route = &config.routes["api"];
        assert_eq!(route.backend, "backend1");
        assert_eq!(route.rules[0], Rule::new("Host", "a.com"));
        assert_eq!(route.rules[1].arguments(), vec!["GET", "POST"]);
    }

    #[test]
    fn test_default_weight() {
        let config = Configuration::from_toml_str(r#"
            [backends.b.servers.s]
            url = "http://127.0.0.1:9001"
        "#).unwrap();

        assert_eq!(config.backends["b"].servers["s"].weight, 1);
    }

    #[test]
    fn test_structural_equality() {
        let first = Configuration::from_toml_str(SAMPLE).unwrap();
        let second = Configuration::from_toml_str(SAMPLE).unwrap();
        assert_eq!(first, second);

        let mut third = second.clone();
        third.routes.get_mut("api").unwrap().backend = "other".to_string();
        assert_ne!(first, third);
    }

    #[test]
    fn test_route_declaration_order_is_kept() {
        let config = Configuration::from_toml_str(r#"
            [routes.zz_api]
            backend = "b"
            rules = [{ category = "PathPrefix", value = "/api" }]

            [routes.aa_catchall]
            backend = "b"
            rules = [{ category = "PathPrefix", value = "/" }]
        "#).unwrap();

        let names: Vec<&str> = config.routes.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["zz_api", "aa_catchall"]);
    }

    #[test]
    fn test_reordered_routes_are_not_equal() {
        let first = Configuration::from_toml_str(r#"
            [routes.a]
            backend = "b"
            [routes.c]
            backend = "b"
        "#).unwrap();
        let second = Configuration::from_toml_str(r#"
            [routes.c]
            backend = "b"
            [routes.a]
            backend = "b"
        "#).unwrap();

        assert_ne!(first, second);
        assert_eq!(first, first.clone());
    }

    #[test]
    fn test_json_configuration() {
        let config = Configuration::from_json_str(r#"{
            "routes": { "web": { "backend": "b", "rules": [{ "category": "PathPrefix", "value": "/" }] } },
            "backends": { "b": { "servers": { "s": { "url": "http://127.0.0.1:9001", "weight": 2 } } } }
        }"#).unwrap();

        assert_eq!(config.routes["web"].rules[0].category, "PathPrefix");
        assert_eq!(config.backends["b"].servers["s"].weight, 2);
    }

    #[test]
    fn test_empty_configuration() {
        assert!(Configuration::default().is_empty());
        assert!(Configuration::from_toml_str("").unwrap().is_empty());
        assert!(!Configuration::from_toml_str(SAMPLE).unwrap().is_empty());
    }
}
