//! Integration tests for the file-backed store: persistence, commit policy,
//! locking between connections and dump/load across stores.

mod common;

use std::collections::BTreeSet;

use common::{Person, Point, TestDir, person};
use pdict::kv::{Json, KvError, KvStore, MATCH_ALL, OpenOptions};

fn sorted(keys: Vec<String>) -> BTreeSet<String> {
    keys.into_iter().collect()
}

// =============================================================================
// Open / Schema
// =============================================================================

#[test]
fn test_open_creates_file_and_table() -> anyhow::Result<()> {
    let dir = TestDir::new()?;
    assert!(!dir.path.exists());

    let store = dir.open()?;
    assert!(dir.path.exists());
    assert_eq!(store.path(), Some(dir.path.as_path()));
    assert!(store.is_empty(MATCH_ALL)?);
    store.close()?;
    Ok(())
}

#[test]
fn test_reopen_keeps_data() -> anyhow::Result<()> {
    let dir = TestDir::new()?;
    {
        let store = dir.open()?;
        store.set("people/ada", &person("Ada", 36))?;
        store.close()?;
    }

    let store = dir.open()?;
    assert_eq!(store.get::<Person>("people/ada")?, Some(person("Ada", 36)));
    assert_eq!(store.len(MATCH_ALL)?, 1);
    Ok(())
}

#[test]
fn test_open_fails_when_parent_missing() -> anyhow::Result<()> {
    let dir = TestDir::new()?;
    let path = dir.path.with_file_name("missing").join("store.sqlite");

    let err = KvStore::open(&path).unwrap_err();
    assert!(matches!(err, KvError::StorageUnavailable(_)));
    Ok(())
}

#[test]
fn test_open_fails_on_non_database_file() -> anyhow::Result<()> {
    let dir = TestDir::new()?;
    std::fs::write(&dir.path, vec![0x42u8; 4096])?;

    let err = KvStore::open(&dir.path).unwrap_err();
    assert!(matches!(err, KvError::StorageUnavailable(_)));
    Ok(())
}

// =============================================================================
// Basic Operations
// =============================================================================

#[test]
fn test_namespaced_keys_with_generated_suffix() -> anyhow::Result<()> {
    let dir = TestDir::new()?;
    let store = dir.open()?;

    let key = format!("test/{}", store.generate_key());
    store.set(&key, &Point { x: 1, y: 2 })?;

    assert_eq!(store.get_exact::<Point>(&key)?, Point { x: 1, y: 2 });
    assert_eq!(store.keys("test/*")?, vec![key.clone()]);

    store.delete(&key)?;
    assert!(store.get::<Point>(&key)?.is_none());
    Ok(())
}

#[test]
fn test_namespace_glob_keys_and_delete() -> anyhow::Result<()> {
    let dir = TestDir::new()?;
    let store = dir.open()?;
    store.set("ns/a", &1)?;
    store.set("ns/b", &2)?;
    store.set("other/c", &3)?;

    assert_eq!(
        sorted(store.keys("ns/*")?),
        sorted(vec!["ns/a".into(), "ns/b".into()])
    );

    store.delete("ns/*")?;
    assert_eq!(store.keys(MATCH_ALL)?, vec!["other/c".to_string()]);
    Ok(())
}

#[test]
fn test_overwrite_after_reopen_keeps_single_row() -> anyhow::Result<()> {
    let dir = TestDir::new()?;
    dir.open()?.set("k", "v1")?;
    dir.open()?.set("k", "v2")?;

    let store = dir.open()?;
    assert_eq!(store.get_exact::<String>("k")?, "v2");
    assert_eq!(store.len("k")?, 1);
    Ok(())
}

#[test]
fn test_nil_set_deletes_persistently() -> anyhow::Result<()> {
    let dir = TestDir::new()?;
    {
        let store = dir.open()?;
        store.set("k", &Point { x: 0, y: 0 })?;
        store.set("k", &None::<Point>)?;
    }
    let store = dir.open()?;
    assert!(!store.contains("k")?);
    assert!(store.get_exact::<Point>("k").unwrap_err().is_not_found());
    Ok(())
}

#[test]
fn test_get_wrong_type_is_serialization_error() -> anyhow::Result<()> {
    let dir = TestDir::new()?;
    let store = dir.open()?;
    store.set("k", "text")?;

    let err = store.get::<Point>("k").unwrap_err();
    assert!(matches!(err, KvError::Serialization(_)));
    Ok(())
}

// =============================================================================
// Commit Policy
// =============================================================================

#[test]
fn test_uncommitted_write_invisible_to_other_connection() -> anyhow::Result<()> {
    let dir = TestDir::new()?;
    let writer = dir.open_manual()?;
    let reader = dir.open_impatient()?;

    writer.set("pending", &42)?;
    assert_eq!(writer.get::<i32>("pending")?, Some(42));
    assert_eq!(reader.get::<i32>("pending")?, None);

    writer.commit()?;
    assert_eq!(reader.get::<i32>("pending")?, Some(42));
    Ok(())
}

#[test]
fn test_close_without_commit_discards_batch() -> anyhow::Result<()> {
    let dir = TestDir::new()?;
    {
        let store = dir.open_manual()?;
        store.set("a", &1)?;
        store.commit()?;

        store.set("b", &2)?;
        store.delete("a")?;
        store.close()?;
    }

    let store = dir.open()?;
    assert_eq!(store.get::<i32>("a")?, Some(1));
    assert_eq!(store.get::<i32>("b")?, None);
    Ok(())
}

#[test]
fn test_drop_without_commit_discards_batch() -> anyhow::Result<()> {
    let dir = TestDir::new()?;
    {
        let store = dir.open_manual()?;
        store.set("a", &1)?;
    }
    assert!(dir.open()?.is_empty(MATCH_ALL)?);
    Ok(())
}

#[test]
fn test_autocommit_visible_immediately() -> anyhow::Result<()> {
    let dir = TestDir::new()?;
    let writer = dir.open()?;
    let reader = dir.open()?;

    writer.set("now", &true)?;
    assert_eq!(reader.get::<bool>("now")?, Some(true));

    writer.delete("n*")?;
    assert!(!reader.contains("now")?);
    Ok(())
}

// =============================================================================
// Locking
// =============================================================================

#[test]
fn test_concurrent_writer_fails_instead_of_losing_data() -> anyhow::Result<()> {
    let dir = TestDir::new()?;
    let first = dir.open_manual()?;
    let second = dir.open_impatient()?;

    first.set("from-first", &1)?;

    let err = second.set("from-second", &2).unwrap_err();
    assert!(matches!(err, KvError::StorageUnavailable(_)));
    assert!(err.is_locked());

    first.commit()?;
    second.set("from-second", &2)?;

    let check = dir.open()?;
    assert_eq!(check.get::<i32>("from-first")?, Some(1));
    assert_eq!(check.get::<i32>("from-second")?, Some(2));
    Ok(())
}

// =============================================================================
// Dump / Load
// =============================================================================

#[test]
fn test_dump_load_into_fresh_store() -> anyhow::Result<()> {
    let source_dir = TestDir::new()?;
    let source = source_dir.open()?;
    source.set("ns/a", &person("Ada", 36))?;
    source.set("ns/b", &person("Bob", 41))?;
    source.set("other/c", &person("Cy", 12))?;
    let blob = source.dump::<Person>("ns/*")?;

    let target_dir = TestDir::new()?;
    let target = target_dir.open()?;
    target.set("local/z", &person("Zed", 99))?;
    assert_eq!(target.load::<Person>(&blob)?, 2);

    assert_eq!(
        sorted(target.keys("ns/*")?),
        sorted(source.keys("ns/*")?)
    );
    for (key, value) in source.items::<Person>("ns/*")? {
        assert_eq!(target.get_exact::<Person>(&key)?, value);
    }
    assert_eq!(target.get::<Person>("local/z")?, Some(person("Zed", 99)));
    assert!(!target.contains("other/c")?);
    Ok(())
}

#[test]
fn test_dump_of_empty_match_loads_nothing() -> anyhow::Result<()> {
    let dir = TestDir::new()?;
    let store = dir.open()?;
    store.set("a", &1)?;

    let blob = store.dump::<i32>("nothing/*")?;
    assert_eq!(store.load::<i32>(&blob)?, 0);
    assert_eq!(store.len(MATCH_ALL)?, 1);
    Ok(())
}

#[test]
fn test_mixed_values_dump_as_generic_json() -> anyhow::Result<()> {
    let dir = TestDir::new()?;
    let store = dir.open()?;
    store.set("mixed/point", &Point { x: 1, y: 2 })?;
    store.set("mixed/name", "pdict")?;
    store.set("mixed/list", &vec![1, 2, 3])?;

    let blob = store.dump::<serde_json::Value>("mixed/*")?;
    store.delete("mixed/*")?;
    store.load::<serde_json::Value>(&blob)?;

    assert_eq!(store.get_exact::<Point>("mixed/point")?, Point { x: 1, y: 2 });
    assert_eq!(store.get_exact::<String>("mixed/name")?, "pdict");
    assert_eq!(store.get_exact::<Vec<i32>>("mixed/list")?, vec![1, 2, 3]);
    Ok(())
}

#[test]
fn test_load_in_one_transaction() -> anyhow::Result<()> {
    let source = KvStore::open_in_memory()?;
    for i in 0..50 {
        source.set(&format!("batch/{i:02}"), &i)?;
    }
    let blob = source.dump::<i32>(MATCH_ALL)?;

    let dir = TestDir::new()?;
    let target = dir.open_manual()?;
    target.load::<i32>(&blob)?;
    assert!(dir.open_impatient()?.is_empty(MATCH_ALL)?);

    target.commit()?;
    assert_eq!(dir.open()?.len("batch/*")?, 50);
    Ok(())
}

// =============================================================================
// Serializers
// =============================================================================

#[test]
fn test_json_store_file_is_readable_json() -> anyhow::Result<()> {
    let dir = TestDir::new()?;
    let store = OpenOptions::new().serializer(Json).open(&dir.path)?;
    store.set("p", &Point { x: 5, y: 6 })?;

    let blob = store.dump::<Point>(MATCH_ALL)?;
    let text = String::from_utf8(blob)?;
    assert_eq!(text, r#"{"p":{"x":5,"y":6}}"#);
    Ok(())
}

#[test]
fn test_serializer_mismatch_is_serialization_error() -> anyhow::Result<()> {
    let dir = TestDir::new()?;
    dir.open()?.set("p", &Point { x: 5, y: 6 })?;

    let json_store = OpenOptions::new().serializer(Json).open(&dir.path)?;
    let err = json_store.get::<Point>("p").unwrap_err();
    assert!(matches!(err, KvError::Serialization(_)));
    Ok(())
}
