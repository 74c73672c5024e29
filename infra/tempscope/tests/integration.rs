use mhub_tempscope::*;
use serial_test::serial;
use std::collections::HashSet;
use std::io::Write;
use tempfile::TempDir;

#[test]
fn test_tracked_names_then_clear() {
    let temp = TempDir::new().unwrap();
    let mut scope = TempScope::new_in_with_tracking(temp.path(), true).unwrap();

    let first = scope.temp_file_name_with(".txt").unwrap();
    let second = scope.temp_file_name_with(".txt").unwrap();

    assert_ne!(first, second);
    for path in [&first, &second] {
        assert!(path.starts_with(scope.base_dir()));
        assert!(path.to_string_lossy().ends_with(".txt"));
    }
    assert_eq!(scope.issued_names(), [first.clone(), second.clone()]);

    std::fs::write(&first, b"1").unwrap();
    std::fs::write(&second, b"2").unwrap();

    scope.clear().unwrap();

    assert!(scope.issued_names().is_empty());
    assert!(scope.base_dir().is_dir());
    assert!(!first.exists());
    assert!(!second.exists());
}

#[test]
fn test_names_are_pairwise_distinct() {
    let temp = TempDir::new().unwrap();
    let mut scope = TempScope::new_in(temp.path()).unwrap();

    let names: HashSet<_> = (0..500).map(|_| scope.temp_file_name().unwrap()).collect();

    assert_eq!(names.len(), 500);
    assert!(names.iter().all(|p| scope.contains(p)));
    assert!(scope.issued_names().is_empty(), "tracking is off by default");
}

#[test]
fn test_scope_end_removes_tree() {
    let temp = TempDir::new().unwrap();
    let base = {
        let mut scope = TempScope::new_in(temp.path()).unwrap();
        let mut kept = scope.file().keep(true).open().unwrap();
        kept.write_all(b"survives the handle, not the scope").unwrap();
        drop(kept);

        let nested = scope.base_dir().join("deep").join("er");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("file.bin"), b"x").unwrap();
        scope.base_dir().to_path_buf()
    };

    assert!(!base.exists());
}

#[test]
fn test_handles_outlive_scope_bookkeeping() {
    let temp = TempDir::new().unwrap();
    let mut scope = TempScope::new_in_with_tracking(temp.path(), true).unwrap();

    let mut stream = scope.temp_file_stream().unwrap();
    stream.write_all(b"scratch").unwrap();
    let path = stream.path().to_path_buf();
    assert_eq!(scope.issued_names(), [path.clone()]);

    drop(stream);
    assert!(!path.exists(), "stream removes its own file");
    assert_eq!(scope.issued_names(), [path], "registry keeps the name");
}

#[test]
fn test_teardown_failure_is_swallowed() {
    let temp = TempDir::new().unwrap();
    let mut scope = TempScope::new_in(temp.path()).unwrap();
    let base = scope.base_dir().to_path_buf();

    // A regular file where the directory was: removal and recreation both fail.
    std::fs::remove_dir_all(&base).unwrap();
    std::fs::write(&base, b"squatter").unwrap();

    let err = scope.clear().unwrap_err();
    assert!(matches!(err, TempScopeError::Construction { .. }), "unexpected error: {err:?}");
    assert!(scope.issued_names().is_empty());

    drop(scope);
    assert!(base.is_file(), "teardown left the squatter in place");
}

#[test]
fn test_config_driven_scope() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("scope.toml");
    std::fs::write(
        &file,
        format!(
            "parent_dir = {:?}\nprefix = \"cfg_\"\nstore_names = true\nextension = \".dat\"\n",
            temp.path().join("scopes")
        ),
    )
    .unwrap();

    let config = load_config(&file).unwrap();
    let mut scope = TempScopeBuilder::from_config(&config).create().unwrap();

    assert!(scope.base_dir().starts_with(temp.path().join("scopes")));
    assert!(scope.base_dir().file_name().unwrap().to_string_lossy().starts_with("cfg_"));
    assert!(scope.store_names());

    let name = scope.temp_file_name().unwrap();
    assert!(name.to_string_lossy().ends_with(".dat"));
    assert_eq!(scope.issued_names().len(), 1);
}

#[test]
fn test_stale_scopes_are_purged() {
    let temp = TempDir::new().unwrap();
    let stale = temp.path().join("sweep_1");
    std::fs::create_dir(&stale).unwrap();
    let unrelated = temp.path().join("keepme");
    std::fs::create_dir(&unrelated).unwrap();

    std::thread::sleep(std::time::Duration::from_millis(50));

    let scope = TempScope::builder()
        .parent(temp.path())
        .prefix("sweep_")
        .purge_stale(std::time::Duration::from_millis(10))
        .create()
        .unwrap();

    assert!(!stale.exists());
    assert!(unrelated.exists());
    assert!(scope.base_dir().is_dir());
}

#[test]
fn test_sweep_spares_live_sibling() {
    let temp = TempDir::new().unwrap();
    let first = TempScope::builder().parent(temp.path()).prefix("job_").create().unwrap();
    let payload = first.base_dir().join("payload.bin");
    std::fs::write(&payload, b"in use").unwrap();

    std::thread::sleep(std::time::Duration::from_millis(50));

    let second = TempScope::builder()
        .parent(temp.path())
        .prefix("job_")
        .purge_stale(std::time::Duration::from_millis(10))
        .create()
        .unwrap();

    assert!(payload.exists(), "live scope directory was swept");
    assert_ne!(first.base_dir(), second.base_dir());

    let kept = first.keep();
    std::thread::sleep(std::time::Duration::from_millis(50));
    let _third = TempScope::builder()
        .parent(temp.path())
        .prefix("job_")
        .purge_stale(std::time::Duration::from_millis(10))
        .create()
        .unwrap();

    assert!(!kept.exists(), "kept scope is fair game for the sweep");
    assert!(second.base_dir().is_dir());
}

#[test]
#[serial]
fn test_global_prefix_names_scope_dirs() {
    let temp = TempDir::new().unwrap();

    set_naming_prefix("integration_").unwrap();
    let scope = TempScope::new_in(temp.path()).unwrap();
    reset_naming_prefix();

    let name = scope.base_dir().file_name().unwrap().to_string_lossy().into_owned();
    let tick = name.strip_prefix("integration_").expect("prefix applied");
    assert!(tick.parse::<u64>().is_ok(), "unexpected tick in {name}");
}

#[test]
#[serial]
fn test_builder_prefix_beats_global_prefix() {
    let temp = TempDir::new().unwrap();

    set_naming_prefix("global_").unwrap();
    let scope = TempScope::builder().parent(temp.path()).prefix("local_").create().unwrap();
    reset_naming_prefix();

    assert!(scope.base_dir().file_name().unwrap().to_string_lossy().starts_with("local_"));
}

#[test]
fn test_invalid_arguments() {
    let temp = TempDir::new().unwrap();

    assert!(matches!(TempScope::new_in(""), Err(TempScopeError::InvalidArgument { .. })));

    let mut scope = TempScope::new_in(temp.path()).unwrap();
    assert!(matches!(scope.temp_file_name_with(""), Err(TempScopeError::InvalidArgument { .. })));
    assert!(matches!(
        scope.temp_file_stream_with("/x"),
        Err(TempScopeError::InvalidArgument { .. })
    ));
    assert!(matches!(set_naming_prefix(".."), Err(TempScopeError::InvalidArgument { .. })));
}
