use super::*;

#[test]
fn run_log_writes_events_only_inside_its_scope() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("shot.log");
    let log = RunLog::create(&path, false).unwrap();
    assert_eq!(log.path(), path.as_path());

    tracing::info!("outside the run");
    log.in_scope(|| {
        tracing::info!(frame = 1001, "inside the run");
        tracing::debug!("verbose detail");
    });

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("inside the run"), "{text}");
    assert!(text.contains("frame=1001"), "{text}");
    assert!(!text.contains("outside the run"));
    assert!(!text.contains("verbose detail"));
    assert!(!text.contains('\u{1b}'), "log file must not contain ANSI escapes");
}

#[test]
fn verbose_run_log_keeps_debug_events() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("shot.log");
    let log = RunLog::create(&path, true).unwrap();
    log.in_scope(|| tracing::debug!("verbose detail"));
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("verbose detail"), "{text}");
}

#[test]
fn run_log_truncates_an_existing_file() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("shot.log");
    std::fs::write(&path, "stale content from an earlier run\n").unwrap();
    let log = RunLog::create(&path, false).unwrap();
    log.in_scope(|| tracing::info!("fresh"));
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(!text.contains("stale"));
    assert!(text.contains("fresh"));
}

#[test]
fn run_log_lines_start_with_level_then_timestamp() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("shot.log");
    let log = RunLog::create(&path, false).unwrap();
    log.in_scope(|| tracing::warn!(frame = 7, "slow frame"));

    let text = std::fs::read_to_string(&path).unwrap();
    let line = text.lines().find(|l| l.contains("slow frame")).unwrap();
    let (level, rest) = line.split_once(' ').unwrap();
    assert_eq!(level, "WARN");
    let (stamp, message) = rest.trim_start().split_once(' ').unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok(), "{line}");
    assert_eq!(message, "slow frame frame=7");
}
