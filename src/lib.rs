//! Reverse Proxy Gateway는 설정을 무중단으로 다시 불러오는 경량 리버스 프록시입니다.
//!
//! # 주요 기능
//!
//! - 규칙 기반 라우팅 (Host, Path, Method, Headers, Queries 등)
//! - 가중치 라운드 로빈 로드 밸런싱
//! - 설정 변경 시 서버 인스턴스 교체와 graceful 드레이닝
//!
//! # 예제
//!
//! ```
//! use reverse_proxy_gateway::configuration::{Backend, Configuration, Route, Rule, Server};
//! use reverse_proxy_gateway::routing::{MatcherRegistry, TableBuilder};
//!
//! let mut configuration = Configuration::default();
//! configuration.backends.insert(
//!     "api".to_string(),
//!     Backend::with_servers([("s1", Server::new("http://127.0.0.1:9001", 1))]),
//! );
//! configuration.routes.insert(
//!     "api".to_string(),
//!     Route::new("api", vec![Rule::new("Host", "api.example.com"), Rule::new("PathPrefix", "/v1")]),
//! );
//!
//! let registry = MatcherRegistry::with_defaults();
//! let report = TableBuilder::new(&registry).build(&configuration);
//! assert!(report.is_clean());
//! assert_eq!(report.table.len(), 1);
//! ```

pub mod configuration;
pub mod logging;
pub mod provider;
pub mod proxy;
pub mod routing;
pub mod server;
pub mod settings;
pub mod tls;
