use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use url::Url;

use crate::configuration::Backend;
use crate::routing::error::{BackendError, BuildError};

/// 로드밸런서가 요청을 보낼 수 있는 서버 하나입니다.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerTarget {
    pub name: String,
    pub url: Url,
    pub weight: u32,
}

impl ServerTarget {
    /// 서버 URL을 검증하여 대상으로 변환합니다.
    pub fn parse(name: &str, url: &str, weight: u32) -> Result<Self, String> {
        if weight == 0 {
            return Err("가중치는 0보다 커야 함".to_string());
        }
        let parsed = Url::parse(url).map_err(|e| e.to_string())?;
        if parsed.scheme() != "http" {
            return Err(format!("지원하지 않는 스킴: {}", parsed.scheme()));
        }
        if parsed.host_str().map_or(true, str::is_empty) {
            return Err("호스트가 없음".to_string());
        }
        Ok(Self {
            name: name.to_string(),
            url: parsed,
            weight,
        })
    }

    /// 요청 URI 조립에 쓰는 "host:port" 형태
    pub fn authority(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        match self.url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct Cursor {
    index: Option<usize>,
    current_weight: u32,
}

/// 가중치 라운드로빈 분배기입니다.
///
/// 각 서버는 가중치에 비례하는 슬롯을 가지며, 슬롯은 회전 순서 안에서 교차 배치됩니다.
/// 서버 구성은 생성 후 바뀌지 않고, 회전 위치만 공유 상태로 갱신됩니다.
#[derive(Debug)]
pub struct LoadBalancer {
    name: String,
    targets: Vec<ServerTarget>,
    max_weight: u32,
    weight_gcd: u32,
    cursor: Mutex<Cursor>,
}

impl LoadBalancer {
    pub fn new(name: impl Into<String>, targets: Vec<ServerTarget>) -> Self {
        let max_weight = targets.iter().map(|t| t.weight).max().unwrap_or(0);
        let weight_gcd = targets.iter().map(|t| t.weight).fold(0, gcd);
        Self {
            name: name.into(),
            targets,
            max_weight,
            weight_gcd,
            cursor: Mutex::new(Cursor::default()),
        }
    }

    /// 설정의 서버 목록으로 로드밸런서를 만듭니다.
    ///
    /// 잘못된 서버는 건너뛰고 에러 목록에 담아 반환합니다.
    pub fn from_backend(name: &str, backend: &Backend) -> (Self, Vec<BuildError>) {
        let mut targets = Vec::with_capacity(backend.servers.len());
        let mut errors = Vec::new();

        for (server_name, server) in &backend.servers {
            match ServerTarget::parse(server_name, &server.url, server.weight) {
                Ok(target) => {
                    debug!(backend = %name, server = %server_name, url = %target.url, weight = target.weight, "서버 생성");
                    targets.push(target);
                }
                Err(reason) => errors.push(BuildError::InvalidServer {
                    backend: name.to_string(),
                    server: server_name.clone(),
                    url: server.url.clone(),
                    reason,
                }),
            }
        }

        (Self::new(name, targets), errors)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn servers(&self) -> &[ServerTarget] {
        &self.targets
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// 회전 순서상 다음 서버를 선택합니다.
    pub fn next_server(&self) -> Result<&ServerTarget, BackendError> {
        if self.targets.is_empty() {
            return Err(BackendError::NoServers {
                backend: self.name.clone(),
            });
        }

        let mut cursor = self.cursor.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let len = self.targets.len();
        loop {
            let index = cursor.index.map_or(0, |i| (i + 1) % len);
            cursor.index = Some(index);
            if index == 0 {
                cursor.current_weight = cursor.current_weight.saturating_sub(self.weight_gcd);
                if cursor.current_weight == 0 {
                    cursor.current_weight = self.max_weight;
                }
            }
            let target = &self.targets[index];
            if target.weight >= cursor.current_weight {
                return Ok(target);
            }
        }
    }
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 { a } else { gcd(b, a % b) }
}

/// 한 번의 테이블 빌드 동안 백엔드 이름별 로드밸런서를 캐시합니다.
///
/// 같은 백엔드를 참조하는 라우트는 모두 같은 인스턴스를 공유합니다.
#[derive(Debug)]
pub struct BackendPool<'a> {
    backends: &'a BTreeMap<String, Backend>,
    cache: HashMap<String, Arc<LoadBalancer>>,
    errors: Vec<BuildError>,
}

impl<'a> BackendPool<'a> {
    pub fn new(backends: &'a BTreeMap<String, Backend>) -> Self {
        Self {
            backends,
            cache: HashMap::new(),
            errors: Vec::new(),
        }
    }

    /// 캐시에 있으면 재사용하고, 없으면 생성 후 캐시합니다.
    /// 설정에 없는 이름이면 `None`.
    pub fn resolve(&mut self, name: &str) -> Option<Arc<LoadBalancer>> {
        if let Some(existing) = self.cache.get(name) {
            debug!(backend = %name, "백엔드 재사용");
            return Some(existing.clone());
        }

        let backend = self.backends.get(name)?;
        debug!(backend = %name, "백엔드 생성");

        let (balancer, errors) = LoadBalancer::from_backend(name, backend);
        for error in &errors {
            warn!(backend = %name, error = %error, "서버 제외");
        }
        if balancer.is_empty() {
            warn!(backend = %name, "유효한 서버가 없는 백엔드");
        }
        self.errors.extend(errors);

        let balancer = Arc::new(balancer);
        self.cache.insert(name.to_string(), balancer.clone());
        Some(balancer)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// 누적된 서버 에러를 꺼냅니다.
    pub fn into_errors(self) -> Vec<BuildError> {
        self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::Server;

    fn balancer(weights: &[u32]) -> LoadBalancer {
        let targets = weights
            .iter()
            .enumerate()
            .map(|(i, w)| ServerTarget::parse(&format!("s{}", i), &format!("http://127.0.0.1:{}", 9000 + i), *w).unwrap())
            .collect();
        LoadBalancer::new("test", targets)
    }

    fn picks(lb: &LoadBalancer, n: usize) -> Vec<String> {
        (0..n).map(|_| lb.next_server().unwrap().name.clone()).collect()
    }

    #[test]
    fn test_equal_weights_rotate() {
        let lb = balancer(&[1, 1, 1]);
        assert_eq!(picks(&lb, 6), vec!["s0", "s1", "s2", "s0", "s1", "s2"]);
    }

    #[test]
    fn test_weighted_rotation() {
        let lb = balancer(&[1, 3]);
        let selected = picks(&lb, 400);
        let heavy = selected.iter().filter(|s| *s == "s1").count();
        assert_eq!(heavy, 300);
        assert_eq!(selected.len() - heavy, 100);
    }

    #[test]
    fn test_weights_with_common_divisor() {
        let lb = balancer(&[2, 4]);
        let selected = picks(&lb, 6);
        assert_eq!(selected.iter().filter(|s| *s == "s0").count(), 2);
        assert_eq!(selected.iter().filter(|s| *s == "s1").count(), 4);
    }

    #[test]
    fn test_empty_balancer() {
        let lb = LoadBalancer::new("empty", vec![]);
        assert!(matches!(lb.next_server(), Err(BackendError::NoServers { .. })));
    }

    #[test]
    fn test_invalid_servers_are_skipped() {
        let backend = Backend::with_servers([
            ("good", Server::new("http://127.0.0.1:9001", 1)),
            ("bad-url", Server::new("not a url", 1)),
            ("bad-scheme", Server::new("ftp://127.0.0.1", 1)),
            ("zero", Server::new("http://127.0.0.1:9002", 0)),
        ]);

        let (lb, errors) = LoadBalancer::from_backend("b1", &backend);
        assert_eq!(lb.servers().len(), 1);
        assert_eq!(lb.servers()[0].name, "good");
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_pool_reuses_instances() {
        let mut backends = BTreeMap::new();
        backends.insert("b1".to_string(), Backend::with_servers([("s", Server::new("http://127.0.0.1:9001", 1))]));

        let mut pool = BackendPool::new(&backends);
        let first = pool.resolve("b1").unwrap();
        let second = pool.resolve("b1").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(pool.len(), 1);

        assert!(pool.resolve("missing").is_none());
    }

    #[test]
    fn test_authority() {
        let target = ServerTarget::parse("s", "http://localhost:8081/ignored", 1).unwrap();
        assert_eq!(target.authority(), "localhost:8081");
    }
}
