//! Hot reload through the rule store.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tunnel_ingress::config::watcher::ConfigWatcher;
use tunnel_ingress::config::LoadError;
use tunnel_ingress::routing::matcher::HostMatcher;
use tunnel_ingress::routing::{Outcome, ReloadStatus, Resolver, RuleStore};

mod common;
use common::{request, rewrite, yaml_file};

const INITIAL: &str = r#"
tunnel: reload-test
ingress:
  - hostname: a.example.com
    service: http://localhost:8000
  - service: http://localhost:9000
"#;

const UPDATED: &str = r#"
tunnel: reload-test
originRequest:
  ipRules:
    - prefix: 10.0.0.0/8
      allow: true
ingress:
  - hostname: b.example.com
    service: http://localhost:8001
  - service: http_status:404
"#;

const NO_CATCH_ALL: &str = r#"
tunnel: reload-test
ingress:
  - hostname: b.example.com
    service: http://localhost:8001
"#;

#[test]
fn test_invalid_reload_keeps_active_rules() {
    let file = yaml_file(INITIAL);
    let store = RuleStore::from_path(file.path()).unwrap();
    let before = store.load();

    rewrite(&file, NO_CATCH_ALL);
    let err = store.reload(file.path()).unwrap_err();
    assert!(matches!(err, LoadError::Validation(_)));
    assert!(Arc::ptr_eq(&before, &store.load()));

    rewrite(&file, "ingress: [");
    let err = store.reload(file.path()).unwrap_err();
    assert!(matches!(err, LoadError::Decode(_)));
    assert!(Arc::ptr_eq(&before, &store.load()));
}

#[test]
fn test_valid_reload_applies_then_reports_unchanged() {
    let file = yaml_file(INITIAL);
    let store = RuleStore::from_path(file.path()).unwrap();

    rewrite(&file, UPDATED);
    assert_eq!(store.reload(file.path()).unwrap(), ReloadStatus::Applied);
    assert_eq!(
        store.load().rules()[0].matcher.host,
        HostMatcher::Exact("b.example.com".into())
    );

    // same content, reformatted
    rewrite(&file, &format!("# touched\n{UPDATED}"));
    assert_eq!(store.reload(file.path()).unwrap(), ReloadStatus::Unchanged);
}

#[tokio::test]
async fn test_in_flight_snapshot_survives_swap() {
    let file = yaml_file(INITIAL);
    let store = RuleStore::from_path(file.path()).unwrap();
    let resolver = Resolver::default();

    let snapshot = store.load();
    rewrite(&file, UPDATED);
    store.reload(file.path()).unwrap();

    // the old snapshot still routes a.example.com to its own rule
    let req = request("a.example.com", "/", "192.0.2.1");
    let outcome = resolver.resolve(&snapshot, &req).await;
    assert!(matches!(outcome, Outcome::Matched(rule) if rule.index == 0));

    // the new set applies the global IP rules to every rule
    let current = store.load();
    let outcome = resolver.resolve(&current, &req).await;
    assert!(matches!(outcome, Outcome::Denied(_)));
    assert_eq!(current.tunnel_id(), "reload-test");
}

#[test]
fn test_concurrent_reloads_apply_once() {
    let file = yaml_file(INITIAL);
    let store = Arc::new(RuleStore::from_path(file.path()).unwrap());
    rewrite(&file, UPDATED);

    let handles = (0..8)
        .map(|_| {
            let store = store.clone();
            let path = file.path().to_path_buf();
            std::thread::spawn(move || store.reload(&path).unwrap())
        })
        .collect::<Vec<_>>();
    let applied = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|status| *status == ReloadStatus::Applied)
        .count();

    assert_eq!(applied, 1);
    assert_eq!(
        store.load().rules()[0].matcher.host,
        HostMatcher::Exact("b.example.com".into())
    );
}

/// Wait until the watcher reports an applied reload.
async fn next_applied(updates: &mut UnboundedReceiver<ReloadStatus>) -> bool {
    let wait = async {
        while let Some(status) = updates.recv().await {
            if status == ReloadStatus::Applied {
                return true;
            }
        }
        false
    };
    tokio::time::timeout(Duration::from_secs(10), wait)
        .await
        .unwrap_or(false)
}

#[tokio::test]
async fn test_watcher_applies_file_change() {
    let file = yaml_file(INITIAL);
    let store = Arc::new(RuleStore::from_path(file.path()).unwrap());
    let before = store.load();

    let (watcher, mut updates) = ConfigWatcher::new(file.path(), store.clone());
    let _watcher = watcher.run().unwrap();

    rewrite(&file, UPDATED);
    assert!(next_applied(&mut updates).await, "no reload reported");

    let current = store.load();
    assert!(!Arc::ptr_eq(&before, &current));
    assert_eq!(current.rules()[0].matcher.host, HostMatcher::Exact("b.example.com".into()));
    assert_eq!(current.rules()[0].ip_rules.len(), 1);
}

#[tokio::test]
async fn test_watcher_ignores_invalid_change() {
    let file = yaml_file(INITIAL);
    let store = Arc::new(RuleStore::from_path(file.path()).unwrap());
    let before = store.load();

    let (watcher, mut updates) = ConfigWatcher::new(file.path(), store.clone());
    let _watcher = watcher.run().unwrap();

    rewrite(&file, NO_CATCH_ALL);
    let received = tokio::time::timeout(Duration::from_secs(2), updates.recv()).await;
    assert!(received.is_err(), "invalid change was reported: {received:?}");
    assert!(Arc::ptr_eq(&before, &store.load()));
}
