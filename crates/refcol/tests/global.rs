//! The process-wide collector. Kept in its own test binary because it
//! reads the process environment.

use std::fs;

use refcol::config::{CONFIG_PATH_ENV, LOG_DIR_ENV};
use refcol::sink::LOG_FILE_PREFIX;

#[test]
fn test_global_collector_uses_env_log_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::env::remove_var(CONFIG_PATH_ENV);
    std::env::set_var(LOG_DIR_ENV, dir.path());

    let collector = refcol::global().unwrap();
    assert_eq!(collector.config().log_dir.as_deref(), Some(dir.path()));

    // Same instance every time
    let again = refcol::global().unwrap();
    assert!(std::ptr::eq(collector, again));

    let domain = collector.domain_create("global").unwrap();
    collector.task_end(Some(&domain));

    let log = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .find(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX))
        })
        .unwrap();
    let text = fs::read_to_string(log).unwrap();
    assert!(text.starts_with("[INFO] __itt_api_init(...) - function call\n"));
    assert!(text.contains("[INFO] __itt_task_end(...) - functions args: domain=global\n"));
}
