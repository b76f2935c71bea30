//! Live log monitor for a running session.
//!
//! The monitor owns the session record while the wrapped command runs. A
//! periodic task scans newly appended log lines, folds them into the record,
//! and persists it when something changed. When the launcher stops the task it
//! gets the monitor back through the `JoinHandle`, so the final pass over the
//! whole log can never overlap a tick.

use chrono::{DateTime, Utc};
use std::io;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::classify::SignalPatterns;
use crate::config::LogLimits;
use crate::log_file::{read_log, truncate_log_file};
use crate::session::{write_meta, SessionPaths, SessionRecord};

pub struct LogMonitor {
    paths: SessionPaths,
    record: SessionRecord,
    patterns: SignalPatterns,
    limits: LogLimits,
    /// Newline-terminated lines already folded into the record.
    ///
    /// Truncation can leave this past the end of the shrunken log; the next
    /// tick then processes nothing and re-syncs, and the final pass covers
    /// whatever was skipped.
    last_processed_line: usize,
}

impl LogMonitor {
    pub fn new(paths: SessionPaths, record: SessionRecord, limits: LogLimits) -> Self {
        Self {
            paths,
            record,
            patterns: SignalPatterns::builtin(),
            limits,
            last_processed_line: 0,
        }
    }

    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    pub fn last_processed_line(&self) -> usize {
        self.last_processed_line
    }

    /// One periodic scan. Returns whether the record was rewritten.
    pub fn tick(&mut self, now: DateTime<Utc>) -> bool {
        match self.scan_new_lines(now) {
            Ok(true) => self.persist(),
            Ok(false) => false,
            Err(err) if err.kind() == io::ErrorKind::NotFound => false,
            Err(err) => {
                tracing::debug!(session = %self.record.session, error = %err, "monitor tick skipped");
                false
            }
        }
    }

    fn scan_new_lines(&mut self, now: DateTime<Utc>) -> io::Result<bool> {
        truncate_log_file(&self.paths.log_path, self.limits);
        let content = read_log(&self.paths.log_path)?;

        // A trailing fragment without a newline is still being written.
        let complete: Vec<&str> = content.split_inclusive('\n').filter(|l| l.ends_with('\n')).collect();

        let mut changed = false;
        for line in complete.iter().skip(self.last_processed_line) {
            let line = line.trim_end_matches(['\n', '\r']);
            changed |= self.patterns.apply_line(&mut self.record, line, now);
        }
        self.last_processed_line = complete.len();

        Ok(changed)
    }

    /// Rebuild error and success state from the whole log.
    ///
    /// Runs after the periodic task has stopped. Clearing first makes the
    /// result independent of how the output was split across ticks.
    pub fn final_pass(&mut self, now: DateTime<Utc>) {
        truncate_log_file(&self.paths.log_path, self.limits);
        let content = match read_log(&self.paths.log_path) {
            Ok(content) => content,
            Err(err) => {
                tracing::debug!(session = %self.record.session, error = %err, "final log pass skipped");
                return;
            }
        };

        self.record.reset_signals();
        for line in content.split('\n') {
            self.patterns
                .apply_line(&mut self.record, line.trim_end_matches('\r'), now);
        }
        self.last_processed_line = content.split_inclusive('\n').count();
    }

    /// Final pass, mark the session exited, and persist the record
    pub fn finish(mut self, exit_code: i32) -> SessionRecord {
        self.final_pass(Utc::now());
        self.record.mark_exited(Some(exit_code));
        self.persist();
        self.record
    }

    fn persist(&self) -> bool {
        match write_meta(&self.paths.meta_path, &self.record) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(path = %self.paths.meta_path.display(), error = %err, "could not write session metadata");
                false
            }
        }
    }

    /// Run [`tick`](Self::tick) every `period` until `shutdown` flips to true.
    ///
    /// The first scan happens one full period after spawning. The task hands
    /// the monitor back when it stops.
    pub fn spawn(mut self, period: Duration, mut shutdown: watch::Receiver<bool>) -> JoinHandle<LogMonitor> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;

            loop {
                tokio::select! {
                    biased;
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            tracing::debug!(session = %self.record.session, "monitor stopping");
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        self.tick(Utc::now());
                    }
                }
            }

            self
        })
    }
}
