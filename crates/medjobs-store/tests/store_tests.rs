// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use medjobs_app::{SESSION_KEY, SessionService, SessionStore};
use medjobs_store::{Store, validate_db_path};
use medjobs_testkit::{sample_session, temp_db_path};

#[test]
fn validate_db_path_rejects_uri_forms() {
    assert!(validate_db_path("file:test.db").is_err());
    assert!(validate_db_path("https://example.com/db.sqlite").is_err());
    assert!(validate_db_path("db.sqlite?mode=ro").is_err());
    assert!(validate_db_path("").is_err());
    assert!(validate_db_path(":memory:").is_ok());
    assert!(validate_db_path("/tmp/medjobs.db").is_ok());
}

#[test]
fn bootstrap_is_idempotent() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    store.set_item("k", "v")?;
    store.bootstrap()?;
    assert_eq!(store.get_item("k")?.as_deref(), Some("v"));
    Ok(())
}

#[test]
fn bootstrap_rejects_foreign_database() -> Result<()> {
    let store = Store::open_memory()?;
    store
        .raw_connection()
        .execute_batch("CREATE TABLE projects (id INTEGER PRIMARY KEY);")?;

    let error = store
        .bootstrap()
        .expect_err("foreign schema should be rejected");
    assert!(
        error
            .to_string()
            .contains("missing required table `local_storage`")
    );
    Ok(())
}

#[test]
fn bootstrap_rejects_table_missing_columns() -> Result<()> {
    let store = Store::open_memory()?;
    store
        .raw_connection()
        .execute_batch("CREATE TABLE local_storage (key TEXT PRIMARY KEY, value TEXT);")?;

    let error = store
        .bootstrap()
        .expect_err("schema validation should fail");
    let message = error.to_string();
    assert!(message.contains("missing required columns"));
    assert!(message.contains("updated_at"));
    Ok(())
}

#[test]
fn items_persist_across_reopen() -> Result<()> {
    let (_dir, db_path) = temp_db_path()?;
    {
        let store = Store::open(&db_path)?;
        store.bootstrap()?;
        store.set_item("last_screen", "drugs")?;
    }

    let reopened = Store::open(&db_path)?;
    reopened.bootstrap()?;
    assert_eq!(reopened.get_item("last_screen")?.as_deref(), Some("drugs"));
    let entry = reopened
        .get_entry("last_screen")?
        .expect("entry should exist");
    assert_eq!(entry.value, "drugs");
    Ok(())
}

#[test]
fn remove_item_reports_whether_anything_was_deleted() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    store.set_item("a", "1")?;
    assert!(store.remove_item("a")?);
    assert!(!store.remove_item("a")?);
    assert_eq!(store.get_item("a")?, None);
    Ok(())
}

#[test]
fn session_is_stored_under_well_known_key() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    let service = SessionService::new(store);

    service.set(sample_session())?;
    let raw = service
        .store()
        .get_item(SESSION_KEY)?
        .expect("session row should exist");
    assert!(raw.contains("test-token"));

    service.clear()?;
    assert_eq!(service.store().load_session()?, None);
    Ok(())
}

#[test]
fn session_survives_restart() -> Result<()> {
    let (_dir, db_path) = temp_db_path()?;
    {
        let store = Store::open(&db_path)?;
        store.bootstrap()?;
        SessionService::new(store).set(sample_session())?;
    }

    let store = Store::open(&db_path)?;
    store.bootstrap()?;
    let service = SessionService::new(store);
    assert_eq!(service.restore()?, Some(sample_session()));
    assert!(service.handle().is_signed_in());
    Ok(())
}

#[test]
fn corrupt_session_row_is_removed_on_restore() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    store.set_item(SESSION_KEY, "{\"token\":")?;

    let service = SessionService::new(store);
    assert_eq!(service.restore()?, None);
    assert_eq!(service.store().get_item(SESSION_KEY)?, None);
    Ok(())
}
