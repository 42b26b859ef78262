//! JSONL audit logging for executed commands.
//!
//! Every top-level invocation is logged as a single line in
//! `{config_dir}/command-logs/YYYY-MM-DD.jsonl`. Best-effort: never
//! panics or fails the caller.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::Serialize;

use crate::result::{CommandOutcome, ResultKind};

#[derive(Serialize)]
struct CommandAuditEntry<'a> {
    ts: u64,
    input: &'a str,
    chained: bool,
    steps: usize,
    ok: bool,
    kind: ResultKind,
    message: &'a str,
    duration_ms: u64,
}

/// Appends one line per invocation. Appends are serialized so concurrent
/// sessions never interleave partial lines.
pub struct AuditLog {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl AuditLog {
    pub fn new(config_dir: &Path) -> Self {
        Self {
            dir: crate::paths::command_logs_dir(config_dir),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Log a single invocation to today's file.
    pub fn record(&self, input: &str, outcome: &CommandOutcome, duration: Duration) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let (chained, steps) = match outcome {
            CommandOutcome::Chained(c) => (true, c.results.len()),
            CommandOutcome::Single(_) => (false, 1),
        };

        let entry = CommandAuditEntry {
            ts: now,
            input,
            chained,
            steps,
            ok: outcome.success(),
            kind: outcome.kind(),
            message: outcome.message(),
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        };

        let Ok(json) = serde_json::to_string(&entry) else {
            return;
        };
        let path = self.dir.join(format!("{}.jsonl", date_from_epoch(now)));

        let _guard = self.write_lock.lock();
        if fs::create_dir_all(&self.dir).is_err() {
            tracing::debug!(dir = %self.dir.display(), "audit log directory unavailable");
            return;
        }
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&path) {
            let _ = writeln!(file, "{json}");
        }
    }
}

/// Format epoch seconds as `YYYY-MM-DD` without external deps.
#[allow(clippy::unreadable_literal, clippy::cast_possible_wrap, clippy::cast_sign_loss)]
fn date_from_epoch(epoch_secs: u64) -> String {
    // Civil date from day count (algorithm from Howard Hinnant)
    let days = (epoch_secs / 86400) as i64;
    let z = days + 719468;
    let era = (if z >= 0 { z } else { z - 146096 }) / 146097;
    let doe = (z - era * 146097) as u64; // day of era [0, 146096]
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = (yoe as i64) + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };

    format!("{y:04}-{m:02}-{d:02}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::result::CommandResult;

    #[test]
    fn test_date_from_epoch() {
        assert_eq!(date_from_epoch(1_740_355_200), "2025-02-24");
        assert_eq!(date_from_epoch(0), "1970-01-01");
        assert_eq!(date_from_epoch(946_684_800), "2000-01-01");
        assert_eq!(date_from_epoch(1_740_355_200 + 86399), "2025-02-24");
    }

    #[test]
    fn appends_one_line_per_invocation() {
        let config_dir = std::env::temp_dir().join("study_commands_test_audit");
        let _ = fs::remove_dir_all(&config_dir);
        let log = AuditLog::new(&config_dir);

        let outcome = CommandOutcome::Single(CommandResult::info("ok"));
        log.record("/help", &outcome, Duration::from_millis(3));
        log.record("/help solve", &outcome, Duration::from_millis(4));

        let files: Vec<_> = fs::read_dir(log.dir()).unwrap().collect();
        assert_eq!(files.len(), 1);
        let text = fs::read_to_string(files[0].as_ref().unwrap().path()).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["input"], "/help solve");
        assert_eq!(lines[0]["kind"], "info");
        assert_eq!(lines[0]["chained"], false);

        let _ = fs::remove_dir_all(&config_dir);
    }

    #[test]
    fn unwritable_location_is_ignored() {
        let bogus = Path::new("/proc/study-commands-test-nonexistent");
        let log = AuditLog::new(bogus);
        log.record("/help", &CommandOutcome::Single(CommandResult::info("ok")), Duration::ZERO);
    }
}
