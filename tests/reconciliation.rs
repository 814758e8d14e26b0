//! Watcher-level behavior: dedupe, throttling, bootstrap policy, merge.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;

use dynamic_gateway::dynamic::{DynamicModel, RouterDef, ServerDef, ServiceDef};
use dynamic_gateway::http::build_client;
use dynamic_gateway::middleware::MiddlewareRegistry;
use dynamic_gateway::routing::{RouterFactory, TableSwapController};
use dynamic_gateway::watcher::{ConfigurationWatcher, WatcherError, WatcherSettings};

struct Harness {
    watcher: ConfigurationWatcher,
    tables: Arc<TableSwapController>,
    seen: Arc<Mutex<Vec<DynamicModel>>>,
}

fn harness(throttle: Duration) -> Harness {
    let tables = Arc::new(TableSwapController::new());
    let factory = RouterFactory::new(
        Arc::new(MiddlewareRegistry::with_builtins()),
        vec!["web".into()],
        build_client(Duration::from_secs(1)),
    );
    let settings = WatcherSettings {
        throttle,
        default_entrypoints: vec!["web".into()],
    };
    let mut watcher = ConfigurationWatcher::new(settings, factory, tables.clone());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    watcher.add_listener(move |model| sink.lock().unwrap().push(model.clone()));

    Harness { watcher, tables, seen }
}

fn model(port: u16) -> DynamicModel {
    DynamicModel {
        routers: vec![RouterDef::new("test", "Path('/')", "svc")],
        middlewares: vec![],
        services: vec![ServiceDef::new("svc", vec![ServerDef::new("127.0.0.1", port)])],
    }
}

#[tokio::test]
async fn same_snapshot_twice_notifies_once() {
    let Harness { watcher, seen, .. } = harness(Duration::from_millis(20));
    let publisher = watcher.publisher();
    let handle = watcher.start();

    publisher.publish("mock", Some(model(8081))).unwrap();
    handle.bootstrapped().await.unwrap();
    publisher.publish("mock", Some(model(8081))).unwrap();
    drop(publisher);

    handle.join().await.unwrap();
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn names_are_qualified_per_provider() {
    let Harness { watcher, seen, .. } = harness(Duration::from_millis(20));
    let publisher = watcher.publisher();
    let handle = watcher.start();

    publisher.publish("p1", Some(model(8081))).unwrap();
    publisher.publish("p2", Some(model(8082))).unwrap();
    drop(publisher);
    handle.join().await.unwrap();

    let seen = seen.lock().unwrap();
    let merged = seen.last().unwrap();
    let routers: Vec<&str> = merged.routers.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(routers, vec!["test@p1", "test@p2"]);
    assert!(merged.router("test").is_none());

    for router in &merged.routers {
        let provider = router.name.rsplit('@').next().unwrap();
        assert_eq!(router.service, format!("svc@{provider}"));
        assert!(merged.service(&router.service).is_some());
    }
}

#[tokio::test]
async fn first_invalid_configuration_is_fatal() {
    let Harness { watcher, tables, seen } = harness(Duration::from_millis(20));
    let publisher = watcher.publisher();
    let handle = watcher.start();

    let mut broken = model(8081);
    broken.routers[0].service = "missing".into();
    publisher.publish("mock", Some(broken)).unwrap();

    assert!(matches!(handle.bootstrapped().await, Err(WatcherError::Bootstrap(_))));
    assert!(matches!(handle.join().await, Err(WatcherError::Bootstrap(_))));
    assert!(seen.lock().unwrap().is_empty());
    assert!(tables.load().is_none());
}

#[tokio::test]
async fn router_cannot_reach_another_providers_service() {
    let Harness { watcher, tables, seen } = harness(Duration::from_millis(20));
    let publisher = watcher.publisher();
    let handle = watcher.start();

    let routers_only = DynamicModel {
        routers: vec![RouterDef::new("r", "Path('/')", "svc")],
        ..DynamicModel::default()
    };
    let services_only = DynamicModel {
        services: vec![ServiceDef::new("svc", vec![ServerDef::new("127.0.0.1", 8081)])],
        ..DynamicModel::default()
    };
    publisher.publish("p1", Some(routers_only)).unwrap();
    publisher.publish("p2", Some(services_only)).unwrap();

    let Err(WatcherError::Bootstrap(reason)) = handle.bootstrapped().await else {
        panic!("router resolved a service declared by another provider");
    };
    assert!(reason.contains("svc@p1"), "{reason}");
    assert!(seen.lock().unwrap().is_empty());
    assert!(!tables.is_serving());
}

#[tokio::test]
async fn unknown_rule_fails_bootstrap() {
    let Harness { watcher, tables, .. } = harness(Duration::from_millis(20));
    let publisher = watcher.publisher();
    let handle = watcher.start();

    let mut broken = model(8081);
    broken.routers[0].rule = "unknownRule('x')".into();
    publisher.publish("mock", Some(broken)).unwrap();

    let err = handle.bootstrapped().await.unwrap_err();
    assert!(err.to_string().contains("unknownRule"));
    assert!(!tables.is_serving());
}

#[tokio::test]
async fn later_invalid_configuration_keeps_previous_table() {
    let Harness { watcher, tables, seen } = harness(Duration::from_millis(20));
    let publisher = watcher.publisher();
    let handle = watcher.start();

    publisher.publish("mock", Some(model(8081))).unwrap();
    assert_eq!(handle.bootstrapped().await.unwrap(), 1);

    let mut broken = model(8082);
    broken.routers[0].rule = "Path(\"/\")".into();
    publisher.publish("mock", Some(broken)).unwrap();
    drop(publisher);

    handle.join().await.unwrap();
    assert_eq!(seen.lock().unwrap().len(), 1);
    assert_eq!(tables.generation(), 1);

    let table = tables.load().unwrap();
    let route = table
        .entrypoint("web")
        .unwrap()
        .match_request(&Request::builder().uri("/").body(Body::empty()).unwrap())
        .unwrap();
    let upstreams = route.chain().service().pool().upstreams();
    assert_eq!(upstreams[0].port, 8081);
}

#[tokio::test]
async fn bursts_are_coalesced_to_the_latest_state() {
    const SNAPSHOTS: u16 = 10;
    let Harness { watcher, seen, .. } = harness(Duration::from_millis(200));
    let publisher = watcher.publisher();
    let handle = watcher.start();

    for i in 0..SNAPSHOTS {
        publisher.publish("mock", Some(model(9000 + i))).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    drop(publisher);
    handle.join().await.unwrap();

    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    assert!(seen.len() < SNAPSHOTS as usize);
    let last = seen.last().unwrap();
    assert_eq!(last.services[0].servers[0].port, 9000 + SNAPSHOTS - 1);
}

#[tokio::test]
async fn more_specific_prefix_is_tried_first() {
    let Harness { watcher, tables, .. } = harness(Duration::from_millis(20));
    let publisher = watcher.publisher();
    let handle = watcher.start();

    let model = DynamicModel {
        routers: vec![
            RouterDef::new("a", "PathPrefix('/a')", "svc"),
            RouterDef::new("ab", "PathPrefix('/a/b')", "svc"),
        ],
        middlewares: vec![],
        services: vec![ServiceDef::new("svc", vec![ServerDef::new("127.0.0.1", 8081)])],
    };
    publisher.publish("mock", Some(model)).unwrap();
    handle.bootstrapped().await.unwrap();

    let table = tables.load().unwrap();
    let web = table.entrypoint("web").unwrap();
    let request = Request::builder().uri("/a/b/x").body(Body::empty()).unwrap();
    assert_eq!(web.match_request(&request).unwrap().name(), "ab@mock");
}

#[tokio::test]
async fn empty_snapshot_does_not_clear_provider_state() {
    let Harness { watcher, tables, seen } = harness(Duration::from_millis(20));
    let publisher = watcher.publisher();
    let handle = watcher.start();

    publisher.publish("mock", Some(model(8081))).unwrap();
    handle.bootstrapped().await.unwrap();
    publisher.publish("mock", None).unwrap();
    drop(publisher);

    handle.join().await.unwrap();
    assert_eq!(seen.lock().unwrap().len(), 1);
    assert_eq!(tables.load().unwrap().route_count(), 1);
}
