use driftwatch::{DiffEvent, Error, Side, compare_databases};
use driftwatch_config::Config;
use std::collections::HashMap;

/// Both sides point at a port nothing listens on.
fn unreachable_config() -> Config {
    let params: HashMap<&str, &str> = [
        ("DEV_DB_HOST", "127.0.0.1"),
        ("DEV_DB_PORT", "1"),
        ("DEV_DB_USER", "ci"),
        ("DEV_DB_PASSWORD", "secret"),
        ("DEV_DB_NAME", "app"),
        ("MAIN_DB_HOST", "127.0.0.1"),
        ("MAIN_DB_PORT", "1"),
        ("MAIN_DB_USER", "ci"),
        ("MAIN_DB_PASSWORD", "secret"),
        ("MAIN_DB_NAME", "app"),
    ]
    .into_iter()
    .collect();

    Config::from_lookup(|key| params.get(key).map(|v| v.to_string()))
        .expect("complete configuration")
}

#[tokio::test]
async fn unreachable_reference_is_a_connection_error() {
    let config = unreachable_config();
    assert!(!config.reference.ssl);

    let mut events: Vec<DiffEvent> = Vec::new();
    let err = compare_databases(&config, &mut events)
        .await
        .expect_err("nothing listens on port 1");

    match &err {
        Error::Connection { side, target, .. } => {
            assert_eq!(*side, Side::Reference);
            assert_eq!(target, "ci@127.0.0.1:1/app");
        }
        other => panic!("expected a connection error, got {other:?}"),
    }
    assert_eq!(err.side(), Some(Side::Reference));
    assert!(!err.to_string().contains("secret"), "{err}");
    assert!(events.is_empty());
}
