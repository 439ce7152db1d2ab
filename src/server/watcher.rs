use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::configuration::Configuration;
use crate::provider::ConfigurationReceiver;
use crate::routing::{BuildError, MatcherRegistry, RoutingTable, TableBuilder};

pub type TableSender = watch::Sender<Arc<RoutingTable>>;
pub type TableReceiver = watch::Receiver<Arc<RoutingTable>>;

/// 빈 라우팅 테이블로 시작하는 테이블 채널을 만듭니다.
/// 설정이 도착하기 전까지 모든 요청은 404를 받습니다.
pub fn routing_table_channel() -> (TableSender, TableReceiver) {
    watch::channel(Arc::new(RoutingTable::new()))
}

/// 들어온 설정 하나를 처리한 결과
#[derive(Debug)]
pub enum ReloadOutcome {
    /// 비어 있거나 `None`인 설정
    SkippedEmpty,
    /// 현재 설정과 구조적으로 같은 설정
    SkippedUnchanged,
    Applied {
        routes: usize,
        errors: Vec<BuildError>,
    },
}

impl ReloadOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ReloadOutcome::Applied { .. })
    }
}

/// 프로바이더 채널을 소비하며 새 라우팅 테이블을 만들어 발행합니다.
///
/// 현재 설정은 이 감시자만 소유하므로 잠금이 필요 없습니다.
pub struct ConfigurationWatcher {
    registry: MatcherRegistry,
    current: Option<Configuration>,
    table_tx: TableSender,
    reloads: u64,
}

impl ConfigurationWatcher {
    pub fn new(registry: MatcherRegistry, table_tx: TableSender) -> Self {
        Self {
            registry,
            current: None,
            table_tx,
            reloads: 0,
        }
    }

    pub fn current(&self) -> Option<&Configuration> {
        self.current.as_ref()
    }

    /// 지금까지 발행한 테이블 수
    pub fn reloads(&self) -> u64 {
        self.reloads
    }

    pub fn handle(&mut self, incoming: Option<Configuration>) -> ReloadOutcome {
        let configuration = match incoming {
            Some(configuration) if !configuration.is_empty() => configuration,
            _ => {
                debug!("빈 설정 무시");
                return ReloadOutcome::SkippedEmpty;
            }
        };

        if self.current.as_ref() == Some(&configuration) {
            debug!("설정 변경 없음");
            return ReloadOutcome::SkippedUnchanged;
        }

        let report = TableBuilder::new(&self.registry).build(&configuration);
        let routes = report.table.len();
        if !report.is_clean() {
            warn!(errors = report.errors.len(), "일부 라우트를 건너뛰었습니다");
        }

        self.current = Some(configuration);
        self.reloads += 1;
        self.table_tx.send_replace(Arc::new(report.table));
        info!(routes, reload = self.reloads, "새 라우팅 테이블 발행");

        ReloadOutcome::Applied {
            routes,
            errors: report.errors,
        }
    }

    /// 채널이 닫힐 때까지 설정을 처리하고 자신을 돌려줍니다.
    pub async fn run(mut self, mut rx: ConfigurationReceiver) -> Self {
        while let Some(incoming) = rx.recv().await {
            self.handle(incoming);
        }
        info!("설정 채널 종료, 감시자 중지");
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::{Backend, Route, Rule, Server};

    fn configuration(path: &str) -> Configuration {
        let mut configuration = Configuration::default();
        configuration.backends.insert(
            "b1".to_string(),
            Backend::with_servers([("s1", Server::new("http://127.0.0.1:9001", 1))]),
        );
        configuration.routes.insert(
            "r1".to_string(),
            Route::new("b1", vec![Rule::new("PathPrefix", path)]),
        );
        configuration
    }

    #[test]
    fn test_identical_configuration_rebuilds_once() {
        let (tx, rx) = routing_table_channel();
        let mut watcher = ConfigurationWatcher::new(MatcherRegistry::with_defaults(), tx);

        assert!(watcher.handle(Some(configuration("/"))).is_applied());
        assert!(matches!(watcher.handle(Some(configuration("/"))), ReloadOutcome::SkippedUnchanged));
        assert_eq!(watcher.reloads(), 1);
        assert_eq!(rx.borrow().len(), 1);
    }

    #[test]
    fn test_empty_configuration_is_ignored() {
        let (tx, rx) = routing_table_channel();
        let mut watcher = ConfigurationWatcher::new(MatcherRegistry::with_defaults(), tx);

        assert!(matches!(watcher.handle(None), ReloadOutcome::SkippedEmpty));
        assert!(matches!(watcher.handle(Some(Configuration::default())), ReloadOutcome::SkippedEmpty));
        assert!(watcher.current().is_none());
        assert!(rx.borrow().is_empty());
    }

    #[test]
    fn test_changed_configuration_is_published() {
        let (tx, mut rx) = routing_table_channel();
        let mut watcher = ConfigurationWatcher::new(MatcherRegistry::with_defaults(), tx);

        watcher.handle(Some(configuration("/a")));
        rx.borrow_and_update();
        watcher.handle(Some(configuration("/b")));

        assert!(rx.has_changed().unwrap());
        assert_eq!(watcher.reloads(), 2);
    }

    #[test]
    fn test_reordered_routes_are_rebuilt() {
        let (tx, rx) = routing_table_channel();
        let mut watcher = ConfigurationWatcher::new(MatcherRegistry::with_defaults(), tx);

        let mut first = configuration("/");
        first.routes.insert("r2".to_string(), Route::new("b1", vec![Rule::new("PathPrefix", "/api")]));
        let mut second = first.clone();
        second.routes = first.routes.iter().rev().map(|(k, v)| (k.clone(), v.clone())).collect();

        assert!(watcher.handle(Some(first)).is_applied());
        assert!(watcher.handle(Some(second)).is_applied());
        assert_eq!(rx.borrow().route_names(), vec!["r2", "r1"]);
    }

    #[test]
    fn test_partial_failure_still_publishes() {
        let (tx, rx) = routing_table_channel();
        let mut watcher = ConfigurationWatcher::new(MatcherRegistry::with_defaults(), tx);

        let mut config = configuration("/");
        config.routes.insert("broken".to_string(), Route::new("b1", vec![Rule::new("Nope", "x")]));

        match watcher.handle(Some(config)) {
            ReloadOutcome::Applied { routes, errors } => {
                assert_eq!(routes, 1);
                assert_eq!(errors.len(), 1);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(rx.borrow().route_names(), vec!["r1"]);
    }

    #[tokio::test]
    async fn test_run_consumes_channel() {
        let (tx, _rx) = routing_table_channel();
        let watcher = ConfigurationWatcher::new(MatcherRegistry::with_defaults(), tx);
        let (config_tx, config_rx) = crate::provider::configuration_channel();

        config_tx.send(None).await.unwrap();
        config_tx.send(Some(configuration("/"))).await.unwrap();
        config_tx.send(Some(configuration("/"))).await.unwrap();
        drop(config_tx);

        let watcher = watcher.run(config_rx).await;
        assert_eq!(watcher.reloads(), 1);
    }
}
