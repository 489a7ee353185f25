//! End-to-end tests for the log channels.
//!
//! These tests drive every channel through `LogManager` against a
//! temporary log directory.

use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use std::thread;

use chrono::{Duration, TimeZone, Utc};
use tempfile::TempDir;

use lumo_logs::access::{AccessEntry, AccessFormat};
use lumo_logs::audit::{
    Actor, AuditEntry, AuditResult, Category, ExportFormat, QueryOptions, RetentionPolicy,
    Severity,
};
use lumo_logs::channel::FieldValue;
use lumo_logs::config::LogSettings;
use lumo_logs::manager::LogManager;

fn test_settings(dir: &Path) -> LogSettings {
    let mut settings = LogSettings::default();
    settings.logs.directory = dir.to_path_buf();
    settings.server.console = false;
    settings.security.console = false;
    settings.audit.console = false;
    settings
}

fn manager(dir: &TempDir) -> LogManager {
    LogManager::new(&test_settings(dir.path())).unwrap()
}

fn file_names(dir: &Path) -> BTreeSet<PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect()
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Access channel and rotation
// =============================================================================

#[test]
fn test_rotation_moves_access_lines_in_order() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager(&temp_dir);
    let access_path = temp_dir.path().join("access.log");

    for ip in ["192.0.2.1", "192.0.2.2", "192.0.2.3"] {
        manager.access().log(&AccessEntry::new(ip, "GET", "/", 200));
    }

    let before = file_names(temp_dir.path());
    manager.access().rotate().unwrap();
    let after = file_names(temp_dir.path());
    let rotated: Vec<&PathBuf> = after.difference(&before).collect();
    assert_eq!(rotated.len(), 1);

    let rotated_name = rotated[0].file_name().unwrap().to_string_lossy().to_string();
    assert!(rotated_name.starts_with("access.log."));

    let lines = read_lines(rotated[0]);
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("192.0.2.1 "));
    assert!(lines[1].starts_with("192.0.2.2 "));
    assert!(lines[2].starts_with("192.0.2.3 "));

    assert_eq!(fs::read_to_string(&access_path).unwrap(), "");
}

#[test]
fn test_repeated_rotation_loses_and_duplicates_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager(&temp_dir);
    let access_path = temp_dir.path().join("access.log");
    let rotations = 4;

    let mut logged = Vec::new();
    let mut segments = Vec::new();
    let mut known = file_names(temp_dir.path());

    for round in 0..rotations {
        for i in 0..3 {
            let ip = format!("10.0.{}.{}", round, i);
            manager.access().log(&AccessEntry::new(ip.as_str(), "GET", "/", 200));
            logged.push(ip);
        }
        manager.access().rotate().unwrap();

        let now = file_names(temp_dir.path());
        let new: Vec<PathBuf> = now.difference(&known).cloned().collect();
        assert_eq!(new.len(), 1, "round {} produced {:?}", round, new);
        segments.push(new[0].clone());
        known = now;
    }
    manager.access().log(&AccessEntry::new("10.9.9.9", "GET", "/", 200));
    logged.push("10.9.9.9".to_string());
    segments.push(access_path.clone());

    let access_files = known
        .iter()
        .filter(|p| p.file_name().unwrap().to_string_lossy().starts_with("access.log"))
        .count();
    assert_eq!(access_files, rotations + 1);

    let seen: Vec<String> = segments
        .iter()
        .flat_map(|p| read_lines(p))
        .map(|line| line.split(' ').next().unwrap().to_string())
        .collect();
    assert_eq!(seen, logged);
}

#[test]
fn test_empty_fields_render_as_dash() {
    let temp_dir = TempDir::new().unwrap();
    let mut settings = test_settings(temp_dir.path());
    settings.access.format = "custom".to_string();
    settings.access.template = Some("$remote_addr $http_referer $http_user_agent".to_string());
    let manager = LogManager::new(&settings).unwrap();
    assert_eq!(manager.access().format(), AccessFormat::Custom);

    manager.access().log(&AccessEntry::new("192.0.2.50", "GET", "/", 204));
    manager.access().set_format(AccessFormat::Combined, None);
    manager.access().log(&AccessEntry::new("192.0.2.51", "GET", "/", 204));

    let lines = read_lines(&temp_dir.path().join("access.log"));
    assert_eq!(lines[0], "192.0.2.50 - -");
    assert!(lines[1].ends_with("204 0 \"-\" \"-\""));
}

#[test]
fn test_validate_format_through_manager() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager(&temp_dir);
    assert_eq!(
        manager.access().validate_format("$remote_addr $bogus"),
        vec!["$bogus".to_string()]
    );
    assert!(manager.access().validate_format("$request_time_ms $request_time").is_empty());
}

// =============================================================================
// Audit store
// =============================================================================

#[test]
fn test_failed_login_query_by_warning_severity() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager(&temp_dir);

    manager
        .audit()
        .login_failed(Actor::user("u1", "alice", "203.0.113.7"), "bad password");
    manager
        .audit()
        .login_success(Actor::user("u2", "bob", "203.0.113.8"));

    let result = manager
        .audit()
        .query(&QueryOptions {
            severity: Some("warning".parse::<Severity>().unwrap()),
            ..Default::default()
        })
        .unwrap();

    assert_eq!(result.total, 1);
    assert_eq!(result.count, 1);
    assert_eq!(result.entries[0].result, AuditResult::Failure);
    assert_eq!(result.entries[0].actor.username, "alice");
}

#[test]
fn test_ids_share_prefix_and_sort_by_time() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager(&temp_dir);
    let base = Utc.with_ymd_and_hms(2024, 5, 5, 5, 5, 5).unwrap();

    let ids: Vec<String> = (0..20)
        .map(|i| {
            let entry = AuditEntry::new(
                "system.task",
                Category::System,
                Severity::Info,
                Actor::system(),
            )
            .at(base + Duration::milliseconds(i / 4));
            manager.audit().log(entry).id
        })
        .collect();

    assert!(ids.iter().all(|id| id.starts_with("aud_")));
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
    assert_eq!(ids.iter().collect::<BTreeSet<_>>().len(), ids.len());
}

#[test]
fn test_query_total_count_and_order_with_corrupt_lines() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager(&temp_dir);
    let base = Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap();

    for i in 0..7 {
        manager.audit().log(
            AuditEntry::new("user.updated", Category::Users, Severity::Info, Actor::system())
                .at(base + Duration::hours(i)),
        );
    }
    OpenOptions::new()
        .append(true)
        .open(temp_dir.path().join("audit.log"))
        .unwrap()
        .write_all(b"{\"truncated\": \n")
        .unwrap();

    let all = manager.audit().query(&QueryOptions::default()).unwrap();
    assert_eq!(all.total, 7);
    assert_eq!(all.count, 7);

    let page = manager
        .audit()
        .query(&QueryOptions {
            offset: 5,
            limit: 3,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(page.total, 7);
    assert_eq!(page.count, 2);
    assert_eq!(page.entries[0].time, Some(base + Duration::hours(1)));
    assert_eq!(page.entries[1].time, Some(base));

    let times: Vec<_> = all.entries.iter().map(|e| e.timestamp()).collect();
    assert!(times.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn test_cleanup_by_age_keeps_critical() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager(&temp_dir);
    let old = Utc::now() - Duration::days(200);

    manager.audit().log(
        AuditEntry::new("auth.2fa_disabled", Category::Authentication, Severity::Critical, Actor::system())
            .at(old),
    );
    manager.audit().log(
        AuditEntry::new("auth.logout", Category::Authentication, Severity::Info, Actor::system())
            .at(old),
    );

    let removed = manager
        .audit()
        .cleanup(&RetentionPolicy::from_days(90, 0, true))
        .unwrap();
    assert_eq!(removed, 1);

    let left = manager.audit().query(&QueryOptions::default()).unwrap();
    assert_eq!(left.total, 1);
    assert_eq!(left.entries[0].severity, Severity::Critical);
}

#[test]
fn test_cleanup_cap_keeps_all_critical() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager(&temp_dir);
    let base = Utc::now() - Duration::days(1);

    for i in 0..3 {
        manager.audit().log(
            AuditEntry::new("admin.deleted", Category::Admin, Severity::Critical, Actor::system())
                .at(base + Duration::minutes(i)),
        );
    }
    for i in 0..10 {
        manager.audit().log(
            AuditEntry::new("user.updated", Category::Users, Severity::Info, Actor::system())
                .with_detail("seq", i)
                .at(base + Duration::minutes(10 + i)),
        );
    }

    let removed = manager
        .audit()
        .cleanup(&RetentionPolicy {
            max_entries: 5,
            preserve_critical: true,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(removed, 8);

    let left = manager.audit().query(&QueryOptions::default()).unwrap();
    assert_eq!(left.total, 5);
    let critical = left.entries.iter().filter(|e| e.is_critical()).count();
    assert_eq!(critical, 3);

    let mut kept_seq: Vec<String> = left
        .entries
        .iter()
        .filter_map(|e| e.details.get("seq").map(|v| v.to_string()))
        .collect();
    kept_seq.sort();
    assert_eq!(kept_seq, vec!["8", "9"]);
}

#[test]
fn test_cleanup_keeps_critical_with_non_finite_detail() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager(&temp_dir);
    let old = Utc::now() - Duration::days(200);

    let written = manager.audit().log(
        AuditEntry::new("server.overloaded", Category::System, Severity::Critical, Actor::system())
            .with_detail("score", FieldValue::Float(f64::NAN))
            .with_detail("load", f64::INFINITY)
            .at(old),
    );
    assert_eq!(written.details.get("score"), Some(&FieldValue::Null));
    manager.audit().log(
        AuditEntry::new("auth.logout", Category::Authentication, Severity::Info, Actor::system())
            .at(old),
    );

    assert_eq!(manager.audit().query(&QueryOptions::default()).unwrap().total, 2);

    let removed = manager
        .audit()
        .cleanup(&RetentionPolicy::from_days(90, 0, true))
        .unwrap();
    assert_eq!(removed, 1);

    let left = manager.audit().query(&QueryOptions::default()).unwrap();
    assert_eq!(left.total, 1);
    assert_eq!(left.entries[0].event, "server.overloaded");
    assert_eq!(left.entries[0].details.get("load"), Some(&FieldValue::Null));
}

#[test]
fn test_cleanup_keeps_hand_written_nested_details() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager(&temp_dir);
    let old = (Utc::now() - Duration::days(200)).to_rfc3339();

    let line = format!(
        concat!(
            r#"{{"id":"aud_external","time":"{}","event":"admin.roles_changed","#,
            r#""category":"admin","severity":"critical","#,
            r#""details":{{"roles":["a","b"],"note":null,"scope":{{"org":7}}}}}}"#,
            "\n"
        ),
        old
    );
    manager.audit().log(
        AuditEntry::new("auth.logout", Category::Authentication, Severity::Info, Actor::system())
            .at(Utc::now() - Duration::days(200)),
    );
    OpenOptions::new()
        .append(true)
        .open(temp_dir.path().join("audit.log"))
        .unwrap()
        .write_all(line.as_bytes())
        .unwrap();

    let all = manager.audit().query(&QueryOptions::default()).unwrap();
    assert_eq!(all.total, 2);

    let removed = manager
        .audit()
        .cleanup(&RetentionPolicy::from_days(90, 0, true))
        .unwrap();
    assert_eq!(removed, 1);

    let left = manager.audit().query(&QueryOptions::default()).unwrap();
    assert_eq!(left.total, 1);
    let details = &left.entries[0].details;
    assert_eq!(details.get("roles"), Some(&FieldValue::from(vec!["a", "b"])));
    assert_eq!(details.get("note"), Some(&FieldValue::Null));
    assert_eq!(details.get("scope").map(|v| v.to_string()), Some(r#"{"org":7}"#.to_string()));
}

#[test]
fn test_export_csv_through_manager() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager(&temp_dir);
    manager
        .audit()
        .user_created(Actor::user("u1", "root", "10.0.0.1"), "u5", "dana");
    manager.audit().logout(Actor::user("u1", "root", "10.0.0.1"));

    let mut out = Vec::new();
    let exported = manager
        .audit()
        .export(
            &QueryOptions {
                category: Some(Category::Users),
                ..Default::default()
            },
            ExportFormat::Csv,
            &mut out,
        )
        .unwrap();

    assert_eq!(exported, 1);
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains(",user.created,users,info,root,10.0.0.1,user,dana,success,"));
}

// =============================================================================
// Concurrency
// =============================================================================

const WRITERS: usize = 8;
const PER_WRITER: usize = 50;

#[test]
fn test_concurrent_audit_writes_stay_whole_lines() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager(&temp_dir);

    thread::scope(|s| {
        for w in 0..WRITERS {
            let manager = &manager;
            s.spawn(move || {
                for i in 0..PER_WRITER {
                    manager.audit().log(
                        AuditEntry::new("user.updated", Category::Users, Severity::Info, Actor::system())
                            .with_detail("writer", w as i64)
                            .with_detail("seq", i as i64)
                            .with_detail("note", "x".repeat(512)),
                    );
                }
            });
        }
    });

    let lines = read_lines(&temp_dir.path().join("audit.log"));
    assert_eq!(lines.len(), WRITERS * PER_WRITER);
    let entries: Vec<AuditEntry> = lines
        .iter()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let ids: BTreeSet<&str> = entries.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids.len(), entries.len());
    assert_eq!(manager.audit().write_failures(), 0);
}

#[test]
fn test_concurrent_access_writes_stay_whole_lines() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager(&temp_dir);

    thread::scope(|s| {
        for w in 0..WRITERS {
            let manager = &manager;
            s.spawn(move || {
                for i in 0..PER_WRITER {
                    let ip = format!("10.{}.0.{}", w, i);
                    manager.access().log(&AccessEntry::new(ip.as_str(), "GET", "/", 200));
                }
            });
        }
    });

    let lines = read_lines(&temp_dir.path().join("access.log"));
    assert_eq!(lines.len(), WRITERS * PER_WRITER);
    assert!(lines.iter().all(|l| l.starts_with("10.") && l.ends_with("\"-\" \"-\"")));
    let ips: BTreeSet<&str> = lines.iter().filter_map(|l| l.split(' ').next()).collect();
    assert_eq!(ips.len(), WRITERS * PER_WRITER);
}

// =============================================================================
// Manager
// =============================================================================

#[test]
fn test_all_channels_write_and_rotate() {
    let temp_dir = TempDir::new().unwrap();
    let mut settings = test_settings(temp_dir.path());
    settings.debug.enabled = true;
    let manager = LogManager::new(&settings).unwrap();

    manager.access().log(&AccessEntry::new("192.0.2.9", "GET", "/", 200));
    manager.server().info("started");
    manager.error().log_error(
        "upstream failed",
        &std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out"),
    );
    manager.debug().debug("cache warmed");
    manager.security().login_failed("192.0.2.9", "eve", "bad password");
    manager.audit().server_started("1.0.0");

    for name in [
        "access.log",
        "server.log",
        "error.log",
        "debug.log",
        "security.log",
        "audit.log",
    ] {
        assert_eq!(read_lines(&temp_dir.path().join(name)).len(), 1, "{}", name);
    }

    manager.rotate_all().unwrap();
    assert_eq!(file_names(temp_dir.path()).len(), 12);
    manager.close().unwrap();
    assert_eq!(manager.write_failures(), 0);
}
