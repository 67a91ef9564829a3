//! Tails the BHX log file and publishes each new record.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::events::{Listener, Publisher};
use crate::watcher::{parse_line, read_last_line, ChangeDetector, LogRecord, MACHINE_LOG};

/// Watches one directory and publishes `machine_log` events for a single file.
pub struct LogFileWatcher {
    folder: PathBuf,
    file_name: String,
    poll_interval: Duration,
    detector: ChangeDetector,
    publisher: Publisher<LogRecord>,
}

impl LogFileWatcher {
    pub fn new(folder: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            file_name: file_name.into(),
            poll_interval: Duration::from_millis(500),
            detector: ChangeDetector::new(),
            publisher: Publisher::new(),
        }
    }

    /// How long the loop waits for a notification before re-checking
    /// cancellation.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn subscribe(&self, listener: Arc<dyn Listener<LogRecord>>) -> bool {
        self.publisher.subscribe(listener)
    }

    pub fn log_path(&self) -> PathBuf {
        self.folder.join(&self.file_name)
    }

    /// React to one filesystem notification.
    ///
    /// Only modifications of the watched file count. Returns the record that
    /// was published, if any. Nothing in here is allowed to take the
    /// watcher down.
    pub fn handle_event(&mut self, event: &Event) -> Option<LogRecord> {
        if !matches!(event.kind, EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any)) {
            return None;
        }
        if !event.paths.iter().any(|p| self.is_target(p)) {
            return None;
        }

        match self.process_tail() {
            Ok(record) => record,
            Err(e @ Error::MalformedRecord { .. }) => {
                warn!(error = %e, "Skipping malformed log line");
                None
            }
            Err(e) => {
                error!(path = %self.log_path().display(), error = %e, "Failed to process log change");
                None
            }
        }
    }

    /// Read the file's last line and publish it if it is new.
    pub fn process_tail(&mut self) -> Result<Option<LogRecord>, Error> {
        let Some(last_line) = read_last_line(&self.log_path())? else {
            return Ok(None);
        };

        if !self.detector.accept(&last_line) {
            debug!("Log tail unchanged");
            return Ok(None);
        }

        let record = parse_line(&last_line)?;
        debug!(action = %record.action, program = %record.program, "New log record");
        self.publisher.notify(MACHINE_LOG, &record)?;
        Ok(Some(record))
    }

    fn is_target(&self, path: &Path) -> bool {
        path.ends_with(&self.file_name)
    }

    /// Start watching on a background thread.
    ///
    /// The notification handle is acquired before this returns, so failure to
    /// watch the folder is reported here. The thread exits once `cancel`
    /// fires, at most one poll interval later, and always releases the
    /// handle.
    pub fn spawn(mut self, cancel: CancellationToken) -> Result<WatcherHandle, Error> {
        let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
        let mut watcher = RecommendedWatcher::new(tx, notify::Config::default())?;
        watcher.watch(&self.folder, RecursiveMode::Recursive)?;
        info!(folder = %self.folder.display(), file = %self.file_name, "Watching machine log");
        if self.publisher.is_empty() {
            warn!("Log watcher has no subscribers, records will be dropped");
        }

        let join = thread::Builder::new()
            .name("log-watcher".to_string())
            .spawn(move || {
                let _guard = WatchGuard {
                    watcher,
                    folder: self.folder.clone(),
                };
                self.run(&rx, &cancel);
            })?;

        Ok(WatcherHandle { join })
    }

    fn run(&mut self, rx: &mpsc::Receiver<notify::Result<Event>>, cancel: &CancellationToken) {
        while !cancel.is_cancelled() {
            match rx.recv_timeout(self.poll_interval) {
                Ok(Ok(event)) => {
                    self.handle_event(&event);
                }
                Ok(Err(e)) => warn!(error = %e, "File watch error"),
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    error!("File watch channel closed");
                    break;
                }
            }
        }
        debug!("Log watcher loop exited");
    }
}

/// Unwatches and drops the notification handle however the loop ends.
struct WatchGuard {
    watcher: RecommendedWatcher,
    folder: PathBuf,
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        if let Err(e) = self.watcher.unwatch(&self.folder) {
            debug!(error = %e, "Unwatch failed");
        }
        info!(folder = %self.folder.display(), "Stopped watching machine log");
    }
}

/// Handle to a running watcher thread.
pub struct WatcherHandle {
    join: JoinHandle<()>,
}

impl WatcherHandle {
    /// Wait for the thread to exit.
    pub fn join(self) -> thread::Result<()> {
        self.join.join()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, OpenOptions};
    use std::io::Write;
    use std::sync::Mutex;
    use std::time::Instant;

    use notify::event::{CreateKind, DataChange};

    use crate::machine::{MachineState, MesExporter};

    type Records = Arc<Mutex<Vec<LogRecord>>>;

    fn collector(records: &Records) -> Arc<dyn Listener<LogRecord>> {
        let records = Arc::clone(records);
        Arc::new(move |_: &str, record: &LogRecord| -> Result<(), Error> {
            records.lock().unwrap().push(record.clone());
            Ok(())
        })
    }

    fn append(path: &Path, line: &str) {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        writeln!(file, "{line}").unwrap();
    }

    fn modified(path: &Path) -> Event {
        Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(path.to_path_buf())
    }

    #[test]
    fn publishes_last_line_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = LogFileWatcher::new(dir.path(), "bhx.log");
        let records: Records = Arc::default();
        watcher.subscribe(collector(&records));
        let log = watcher.log_path();

        append(&log, "01.01.2024,08:00:00,START,12,job1.mpr,0");
        let published = watcher.handle_event(&modified(&log));
        assert_eq!(published.map(|r| r.action), Some("START".to_string()));

        // Second notification for the same append.
        assert_eq!(watcher.handle_event(&modified(&log)), None);
        assert_eq!(records.lock().unwrap().len(), 1);
    }

    #[test]
    fn ignores_other_files_and_event_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = LogFileWatcher::new(dir.path(), "bhx.log");
        let records: Records = Arc::default();
        watcher.subscribe(collector(&records));

        let other = dir.path().join("other.log");
        append(&other, "01.01.2024,08:00:00,START,12,job1.mpr,0");
        assert_eq!(watcher.handle_event(&modified(&other)), None);

        let log = watcher.log_path();
        append(&log, "01.01.2024,08:00:00,START,12,job1.mpr,0");
        let created = Event::new(EventKind::Create(CreateKind::File)).add_path(log.clone());
        assert_eq!(watcher.handle_event(&created), None);

        assert!(records.lock().unwrap().is_empty());
    }

    #[test]
    fn empty_or_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = LogFileWatcher::new(dir.path(), "bhx.log");
        let log = watcher.log_path();

        assert_eq!(watcher.handle_event(&modified(&log)), None);

        fs::write(&log, "").unwrap();
        assert_eq!(watcher.process_tail().unwrap(), None);

        fs::write(&log, "\n\n").unwrap();
        assert_eq!(watcher.process_tail().unwrap(), None);
    }

    #[test]
    fn trailing_blank_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = LogFileWatcher::new(dir.path(), "bhx.log");
        let log = watcher.log_path();

        fs::write(&log, "a,b,START,1,p1,2\nd,t,END,1,p2,2\n\n").unwrap();
        let record = watcher.process_tail().unwrap().unwrap();
        assert_eq!(record.program, "p2");
    }

    #[test]
    fn malformed_line_is_skipped_and_watcher_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = LogFileWatcher::new(dir.path(), "bhx.log");
        let records: Records = Arc::default();
        watcher.subscribe(collector(&records));
        let log = watcher.log_path();

        append(&log, "01.01.2024,08:00");
        assert_eq!(watcher.handle_event(&modified(&log)), None);

        append(&log, "01.01.2024,08:00:00,START,12,job1.mpr,0");
        assert!(watcher.handle_event(&modified(&log)).is_some());
        assert_eq!(records.lock().unwrap().len(), 1);
    }

    #[test]
    fn code_page_bytes_in_history_do_not_block_new_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = LogFileWatcher::new(dir.path(), "bhx.log");
        let records: Records = Arc::default();
        watcher.subscribe(collector(&records));
        let log = watcher.log_path();

        fs::write(&log, b"01.01.2024,07:00:00,START,1,C:\\P\\T\xfcr.mpr,0\n").unwrap();
        assert!(watcher.handle_event(&modified(&log)).is_some());

        append(&log, "01.01.2024,08:00:00,START,12,job1.mpr,0");
        let published = watcher.handle_event(&modified(&log));
        assert_eq!(published.map(|r| r.program), Some("job1.mpr".to_string()));
        assert_eq!(records.lock().unwrap().len(), 2);
    }

    #[test]
    fn failing_subscriber_does_not_stop_the_watcher() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = LogFileWatcher::new(dir.path(), "bhx.log");
        watcher.subscribe(Arc::new(|_: &str, _: &LogRecord| -> Result<(), Error> {
            Err(Error::UnknownMethod("subscriber".to_string()))
        }));
        let log = watcher.log_path();

        append(&log, "d,t,START,1,p,2");
        assert_eq!(watcher.handle_event(&modified(&log)), None);
        append(&log, "d,t,END,1,p,2");
        assert_eq!(watcher.handle_event(&modified(&log)), None);
    }

    #[test]
    fn unchanged_tail_leaves_everything_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let export = tempfile::tempdir().unwrap();
        let mut watcher = LogFileWatcher::new(dir.path(), "bhx.log");
        let state = Arc::new(MachineState::new(MesExporter::new(true, export.path())));
        watcher.subscribe(state.clone());
        let fields: Arc<Mutex<usize>> = Arc::default();
        {
            let fields = Arc::clone(&fields);
            state.subscribe(Arc::new(move |_: &str, _: &str| -> Result<(), Error> {
                *fields.lock().unwrap() += 1;
                Ok(())
            }));
        }
        let log = watcher.log_path();

        append(&log, "01.01.2024,08:00:00,START,12,job1.mpr,0");
        watcher.handle_event(&modified(&log));
        assert_eq!(*fields.lock().unwrap(), 6);
        assert_eq!(state.pending_mes_entries(), 1);

        watcher.handle_event(&modified(&log));
        assert_eq!(*fields.lock().unwrap(), 6);
        assert_eq!(state.pending_mes_entries(), 1);
        assert_eq!(fs::read_dir(export.path()).unwrap().count(), 0);
    }

    #[test]
    fn start_end_pair_through_the_pipeline_writes_mes_file() {
        let dir = tempfile::tempdir().unwrap();
        let export = tempfile::tempdir().unwrap();
        let mut watcher = LogFileWatcher::new(dir.path(), "bhx.log");
        let state = Arc::new(MachineState::new(MesExporter::new(true, export.path())));
        watcher.subscribe(state);
        let log = watcher.log_path();

        append(&log, "01.01.2024,08:00:00,START,12,job1.mpr,0");
        watcher.handle_event(&modified(&log));
        append(&log, "01.01.2024,08:05:00,END,12,job1.mpr,1");
        watcher.handle_event(&modified(&log));

        let exported = export.path().join("20240101080500.txt");
        assert_eq!(
            fs::read_to_string(exported).unwrap(),
            "START,20240101080500,job1.mpr,job1,END,20240101080500\n"
        );
    }

    #[test]
    fn spawned_watcher_follows_appends_and_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("bhx.log");
        fs::write(&log, "").unwrap();

        let watcher =
            LogFileWatcher::new(dir.path(), "bhx.log").with_poll_interval(Duration::from_millis(50));
        let records: Records = Arc::default();
        watcher.subscribe(collector(&records));

        let cancel = CancellationToken::new();
        let handle = watcher.spawn(cancel.clone()).unwrap();

        append(&log, "01.01.2024,08:00:00,START,12,job1.mpr,0");
        let deadline = Instant::now() + Duration::from_secs(10);
        while records.lock().unwrap().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }

        cancel.cancel();
        handle.join().unwrap();

        let records = records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].program, "job1.mpr");
    }

    #[test]
    fn missing_folder_fails_at_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = LogFileWatcher::new(dir.path().join("absent"), "bhx.log");
        assert!(watcher.spawn(CancellationToken::new()).is_err());
    }
}
