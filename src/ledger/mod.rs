//! Durable per-item, per-target completion flags.
//!
//! The files on disk are the only source of truth. Every operation takes the
//! in-process mutex and an exclusive lock on a sibling `.lock` file, then
//! reloads both snapshots before reading or mutating them, so separate
//! processes sharing one ledger never overwrite each other's flags.
//!
//! Archival is claimed durably (a `pending` archived record) before the
//! archiver runs and finished afterwards. A claim left behind is finished on
//! the next `mark_complete` without running the archiver again.

pub mod store;

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{LedgerError, MediaError};
use crate::target::Target;

/// Completion flag per target. A missing target reads as `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletionRecord {
    flags: BTreeMap<Target, bool>,
}

impl CompletionRecord {
    /// Every known target present and `false`.
    pub fn zeroed() -> Self {
        Self {
            flags: Target::ALL.iter().map(|t| (*t, false)).collect(),
        }
    }

    pub fn is_complete(&self, target: Target) -> bool {
        self.flags.get(&target).copied().unwrap_or(false)
    }

    pub fn is_fully_complete(&self) -> bool {
        Target::ALL.iter().all(|t| self.is_complete(*t))
    }

    /// Sets the flag. Returns whether it changed; flags never go back to `false`.
    pub fn mark(&mut self, target: Target) -> bool {
        let flag = self.flags.entry(target).or_insert(false);
        let changed = !*flag;
        *flag = true;
        changed
    }

    pub fn pending(&self) -> Vec<Target> {
        Target::ALL
            .into_iter()
            .filter(|t| !self.is_complete(*t))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedRecord {
    pub archived_at: DateTime<Utc>,
    pub targets: CompletionRecord,
    /// Archival claimed but not yet confirmed finished.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pending: bool,
}

/// What the ledger knows about a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LedgerEntry {
    Active { record: CompletionRecord },
    Archived { record: ArchivedRecord },
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkOutcome {
    pub record: CompletionRecord,
    /// The flag went from `false` to `true` on this call.
    pub changed: bool,
    /// This call ran the archiver.
    pub archived_now: bool,
}

/// The one-time side effect run when an item completes on every target.
pub trait Archiver: Send + Sync {
    /// `media` is the bundle the item owns, if any; variant children share
    /// their parent's bundle and pass `None`.
    fn archive(&self, item_key: &str, media: Option<&str>) -> Result<(), MediaError>;
}

/// Archives nothing. For callers that only track flags.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopArchiver;

impl Archiver for NoopArchiver {
    fn archive(&self, _item_key: &str, _media: Option<&str>) -> Result<(), MediaError> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Entries {
    active: BTreeMap<String, CompletionRecord>,
    archived: BTreeMap<String, ArchivedRecord>,
}

/// Exclusive access to the ledger files for one operation.
struct Held<'a> {
    lock_file: &'a File,
    _guard: MutexGuard<'a, ()>,
}

impl Drop for Held<'_> {
    fn drop(&mut self) {
        let _ = FileExt::unlock(self.lock_file);
    }
}

pub struct CompletionLedger {
    path: PathBuf,
    archive_path: PathBuf,
    lock_path: PathBuf,
    lock_file: File,
    archiver: Box<dyn Archiver>,
    guard: Mutex<()>,
}

impl CompletionLedger {
    /// Opens the ledger, creating its lock file, and checks that both
    /// snapshots parse.
    pub fn open(
        path: impl Into<PathBuf>,
        archive_path: impl Into<PathBuf>,
        archiver: impl Archiver + 'static,
    ) -> Result<Self, LedgerError> {
        let path = path.into();
        let archive_path = archive_path.into();
        let lock_path = lock_path_for(&path);
        let lock_file = open_lock_file(&lock_path).map_err(|source| LedgerError::Lock {
            path: lock_path.clone(),
            source,
        })?;

        let ledger = Self {
            path,
            archive_path,
            lock_path,
            lock_file,
            archiver: Box::new(archiver),
            guard: Mutex::new(()),
        };
        let held = ledger.hold()?;
        ledger.load()?;
        drop(held);
        Ok(ledger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates a zeroed record if the key is unknown; returns the current flags.
    pub fn ensure_registered(&self, item_key: &str) -> Result<CompletionRecord, LedgerError> {
        let _held = self.hold()?;
        let mut entries = self.load()?;
        if let Some(archived) = entries.archived.get(item_key) {
            return Ok(archived.targets.clone());
        }
        if let Some(record) = entries.active.get(item_key) {
            return Ok(record.clone());
        }

        let record = CompletionRecord::zeroed();
        entries.active.insert(item_key.to_string(), record.clone());
        store::save(&self.path, &entries.active)?;
        info!(item = item_key, "registered");
        Ok(record)
    }

    /// Idempotently sets `target` for `item_key`, archiving the item's own
    /// media bundle (named like the key) once every target is complete.
    pub fn mark_complete(&self, item_key: &str, target: Target) -> Result<MarkOutcome, LedgerError> {
        self.mark_complete_with_media(item_key, target, Some(item_key))
    }

    /// Like [`mark_complete`](Self::mark_complete), with the media bundle to
    /// hand to the archiver stated explicitly.
    pub fn mark_complete_with_media(
        &self,
        item_key: &str,
        target: Target,
        media: Option<&str>,
    ) -> Result<MarkOutcome, LedgerError> {
        let _held = self.hold()?;
        let mut entries = self.load()?;

        if let Some(archived) = entries.archived.get(item_key) {
            let record = archived.targets.clone();
            if archived.pending {
                warn!(item = item_key, "finishing an archival claimed earlier");
                self.finish_archival(&mut entries, item_key)?;
            }
            return Ok(MarkOutcome {
                record,
                changed: false,
                archived_now: false,
            });
        }

        let previous = entries.active.get(item_key);
        let registered = previous.is_some();
        let mut record = previous.cloned().unwrap_or_else(CompletionRecord::zeroed);
        let changed = record.mark(target);

        if changed || !registered {
            entries.active.insert(item_key.to_string(), record.clone());
            store::save(&self.path, &entries.active)?;
            info!(item = item_key, %target, "marked complete");
        }

        let mut archived_now = false;
        if record.is_fully_complete() {
            self.archive(&mut entries, item_key, &record, media)?;
            archived_now = true;
        }

        Ok(MarkOutcome {
            record,
            changed,
            archived_now,
        })
    }

    pub fn is_complete(&self, item_key: &str, target: Target) -> Result<bool, LedgerError> {
        Ok(match self.status(item_key)? {
            LedgerEntry::Archived { record } => record.targets.is_complete(target),
            LedgerEntry::Active { record } => record.is_complete(target),
            LedgerEntry::Unknown => false,
        })
    }

    pub fn is_fully_complete(&self, item_key: &str) -> Result<bool, LedgerError> {
        Ok(match self.status(item_key)? {
            LedgerEntry::Archived { .. } => true,
            LedgerEntry::Active { record } => record.is_fully_complete(),
            LedgerEntry::Unknown => false,
        })
    }

    pub fn is_archived(&self, item_key: &str) -> Result<bool, LedgerError> {
        Ok(matches!(self.status(item_key)?, LedgerEntry::Archived { .. }))
    }

    pub fn status(&self, item_key: &str) -> Result<LedgerEntry, LedgerError> {
        let _held = self.hold()?;
        let mut entries = self.load()?;
        if let Some(record) = entries.archived.remove(item_key) {
            return Ok(LedgerEntry::Archived { record });
        }
        Ok(match entries.active.remove(item_key) {
            Some(record) => LedgerEntry::Active { record },
            None => LedgerEntry::Unknown,
        })
    }

    /// Claims the archival, runs the archiver, then finishes the claim.
    /// A failing archiver releases the claim so a later call tries again.
    fn archive(
        &self,
        entries: &mut Entries,
        item_key: &str,
        record: &CompletionRecord,
        media: Option<&str>,
    ) -> Result<(), LedgerError> {
        entries.archived.insert(
            item_key.to_string(),
            ArchivedRecord {
                archived_at: Utc::now(),
                targets: record.clone(),
                pending: true,
            },
        );
        if let Err(e) = store::save(&self.archive_path, &entries.archived) {
            entries.archived.remove(item_key);
            return Err(e);
        }

        if let Err(source) = self.archiver.archive(item_key, media) {
            entries.archived.remove(item_key);
            if let Err(e) = store::save(&self.archive_path, &entries.archived) {
                warn!(item = item_key, %e, "archival claim could not be released");
            }
            return Err(LedgerError::Archive {
                item_key: item_key.to_string(),
                source,
            });
        }

        self.finish_archival(entries, item_key)?;
        info!(item = item_key, "fully complete, archived");
        Ok(())
    }

    fn finish_archival(&self, entries: &mut Entries, item_key: &str) -> Result<(), LedgerError> {
        if let Some(archived) = entries.archived.get_mut(item_key) {
            archived.pending = false;
        }
        store::save(&self.archive_path, &entries.archived)?;

        entries.active.remove(item_key);
        if let Err(e) = store::save(&self.path, &entries.active) {
            // The archived snapshot already wins for this key on every load.
            warn!(item = item_key, %e, "archived, but active ledger not rewritten");
        }
        Ok(())
    }

    /// Both snapshots as they are on disk. A key present in both is archived.
    fn load(&self) -> Result<Entries, LedgerError> {
        let mut active: BTreeMap<String, CompletionRecord> = store::load(&self.path)?;
        let archived: BTreeMap<String, ArchivedRecord> = store::load(&self.archive_path)?;
        active.retain(|key, _| !archived.contains_key(key));
        Ok(Entries { active, archived })
    }

    fn hold(&self) -> Result<Held<'_>, LedgerError> {
        let guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        FileExt::lock_exclusive(&self.lock_file).map_err(|source| LedgerError::Lock {
            path: self.lock_path.clone(),
            source,
        })?;
        Ok(Held {
            lock_file: &self.lock_file,
            _guard: guard,
        })
    }
}

/// `ledger.json` is guarded by `ledger.json.lock` in the same directory.
fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "ledger".into());
    name.push(".lock");
    path.with_file_name(name)
}

fn open_lock_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::thread;
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct CountingArchiver {
        calls: Arc<AtomicU32>,
        fail: Arc<AtomicBool>,
    }

    impl Archiver for CountingArchiver {
        fn archive(&self, item_key: &str, _media: Option<&str>) -> Result<(), MediaError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(MediaError::Io {
                    path: PathBuf::from(item_key),
                    source: std::io::Error::other("disk full"),
                });
            }
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Succeeds, but on its first call swaps the archived snapshot for a
    /// non-empty directory so the write that follows fails.
    #[derive(Clone)]
    struct SnapshotBlockingArchiver {
        archive_path: PathBuf,
        calls: Arc<AtomicU32>,
        saved: Arc<Mutex<Vec<u8>>>,
    }

    impl Archiver for SnapshotBlockingArchiver {
        fn archive(&self, _item_key: &str, _media: Option<&str>) -> Result<(), MediaError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                *self.saved.lock().unwrap() = fs::read(&self.archive_path).unwrap();
                fs::remove_file(&self.archive_path).unwrap();
                fs::create_dir_all(self.archive_path.join("occupied")).unwrap();
            }
            Ok(())
        }
    }

    fn ledger(dir: &TempDir, archiver: impl Archiver + 'static) -> CompletionLedger {
        CompletionLedger::open(
            dir.path().join("ledger.json"),
            dir.path().join("archived.json"),
            archiver,
        )
        .unwrap()
    }

    #[test]
    fn missing_target_reads_false() {
        let record: CompletionRecord = serde_json::from_str(r#"{"meesho": true}"#).unwrap();
        assert!(record.is_complete(Target::Meesho));
        assert!(!record.is_complete(Target::Flipkart));
        assert_eq!(record.pending(), vec![Target::Flipkart, Target::Myntra]);
    }

    #[test]
    fn record_serializes_as_flat_object() {
        let mut record = CompletionRecord::zeroed();
        record.mark(Target::Flipkart);
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            serde_json::json!({"meesho": false, "flipkart": true, "myntra": false})
        );
    }

    #[test]
    fn lock_file_sits_next_to_the_ledger() {
        assert_eq!(
            lock_path_for(Path::new("/var/lib/listwright/ledger.json")),
            PathBuf::from("/var/lib/listwright/ledger.json.lock")
        );
        let dir = TempDir::new().unwrap();
        let _ledger = ledger(&dir, NoopArchiver);
        assert!(dir.path().join("ledger.json.lock").is_file());
    }

    #[test]
    fn ensure_registered_creates_zeroed_record_once() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir, CountingArchiver::default());

        assert_eq!(ledger.status("NKL1234").unwrap(), LedgerEntry::Unknown);
        let record = ledger.ensure_registered("NKL1234").unwrap();
        assert_eq!(record, CompletionRecord::zeroed());

        ledger.mark_complete("NKL1234", Target::Meesho).unwrap();
        let again = ledger.ensure_registered("NKL1234").unwrap();
        assert!(again.is_complete(Target::Meesho));
    }

    #[test]
    fn mark_complete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir, CountingArchiver::default());

        let first = ledger.mark_complete("NKL1234", Target::Flipkart).unwrap();
        let second = ledger.mark_complete("NKL1234", Target::Flipkart).unwrap();
        assert!(first.changed);
        assert!(!second.changed);
        assert_eq!(first.record, second.record);
        assert_eq!(
            ledger.status("NKL1234").unwrap(),
            LedgerEntry::Active {
                record: first.record
            }
        );
    }

    #[test]
    fn three_targets_archive_exactly_once() {
        let dir = TempDir::new().unwrap();
        let archiver = CountingArchiver::default();
        let ledger = ledger(&dir, archiver.clone());

        ledger.mark_complete("NKL1234", Target::Meesho).unwrap();
        ledger.mark_complete("NKL1234", Target::Flipkart).unwrap();
        assert!(!ledger.is_fully_complete("NKL1234").unwrap());
        let last = ledger.mark_complete("NKL1234", Target::Myntra).unwrap();

        assert!(last.archived_now);
        assert!(ledger.is_fully_complete("NKL1234").unwrap());
        assert!(ledger.is_archived("NKL1234").unwrap());
        assert_eq!(archiver.calls.load(Ordering::SeqCst), 1);

        let again = ledger.mark_complete("NKL1234", Target::Myntra).unwrap();
        assert!(!again.archived_now);
        assert_eq!(archiver.calls.load(Ordering::SeqCst), 1);

        let LedgerEntry::Archived { record } = ledger.status("NKL1234").unwrap() else {
            panic!("expected an archived entry");
        };
        assert!(!record.pending);
    }

    #[test]
    fn concurrent_completions_archive_exactly_once() {
        for round in 0..20 {
            let dir = TempDir::new().unwrap();
            let archiver = CountingArchiver::default();
            let ledger = Arc::new(ledger(&dir, archiver.clone()));
            let key = format!("NKL{round}");

            let handles: Vec<_> = Target::ALL
                .into_iter()
                .map(|target| {
                    let ledger = Arc::clone(&ledger);
                    let key = key.clone();
                    thread::spawn(move || ledger.mark_complete(&key, target).unwrap())
                })
                .collect();
            let archived_now = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|outcome| outcome.archived_now)
                .count();

            assert_eq!(archived_now, 1);
            assert_eq!(archiver.calls.load(Ordering::SeqCst), 1);
            assert!(ledger.is_fully_complete(&key).unwrap());
        }
    }

    #[test]
    fn separate_instances_keep_each_others_flags() {
        let dir = TempDir::new().unwrap();
        let a = ledger(&dir, NoopArchiver);
        let b = ledger(&dir, NoopArchiver);

        b.mark_complete("NKL1234", Target::Flipkart).unwrap();
        a.mark_complete("NKL1234", Target::Meesho).unwrap();
        assert!(a.is_complete("NKL1234", Target::Flipkart).unwrap());

        let reopened = ledger(&dir, NoopArchiver);
        assert!(reopened.is_complete("NKL1234", Target::Flipkart).unwrap());
        assert!(reopened.is_complete("NKL1234", Target::Meesho).unwrap());
        assert!(!reopened.is_complete("NKL1234", Target::Myntra).unwrap());
    }

    #[test]
    fn separate_instances_archive_exactly_once() {
        for round in 0..10 {
            let dir = Arc::new(TempDir::new().unwrap());
            let archiver = CountingArchiver::default();
            let key = format!("NKL{round}");

            let handles: Vec<_> = Target::ALL
                .into_iter()
                .map(|target| {
                    let instance = ledger(&dir, archiver.clone());
                    let key = key.clone();
                    thread::spawn(move || instance.mark_complete(&key, target).unwrap())
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }

            assert_eq!(archiver.calls.load(Ordering::SeqCst), 1);
            assert!(ledger(&dir, NoopArchiver).is_archived(&key).unwrap());
        }
    }

    #[test]
    fn survives_restart() {
        let dir = TempDir::new().unwrap();
        {
            let ledger = ledger(&dir, CountingArchiver::default());
            ledger.mark_complete("NKL1", Target::Meesho).unwrap();
            for target in Target::ALL {
                ledger.mark_complete("NKL2", target).unwrap();
            }
        }

        let reopened = ledger(&dir, CountingArchiver::default());
        assert!(reopened.is_complete("NKL1", Target::Meesho).unwrap());
        assert!(!reopened.is_complete("NKL1", Target::Myntra).unwrap());
        assert!(matches!(
            reopened.status("NKL2").unwrap(),
            LedgerEntry::Archived { .. }
        ));
    }

    #[test]
    fn key_in_both_snapshots_is_archived() {
        let dir = TempDir::new().unwrap();
        fs_write(&dir, "ledger.json", r#"{"NKL9": {"meesho": true}}"#);
        fs_write(
            &dir,
            "archived.json",
            r#"{"NKL9": {"archived_at": "2026-01-01T00:00:00Z", "targets": {"meesho": true, "flipkart": true, "myntra": true}}}"#,
        );
        let ledger = ledger(&dir, CountingArchiver::default());
        assert!(ledger.is_archived("NKL9").unwrap());
        assert!(ledger.is_complete("NKL9", Target::Myntra).unwrap());
    }

    #[test]
    fn failed_archival_leaves_record_active_and_retries() {
        let dir = TempDir::new().unwrap();
        let archiver = CountingArchiver::default();
        let ledger = ledger(&dir, archiver.clone());
        ledger.mark_complete("NKL1234", Target::Meesho).unwrap();
        ledger.mark_complete("NKL1234", Target::Flipkart).unwrap();

        archiver.fail.store(true, Ordering::SeqCst);
        let err = ledger.mark_complete("NKL1234", Target::Myntra).unwrap_err();
        assert!(matches!(err, LedgerError::Archive { .. }));
        assert!(!ledger.is_archived("NKL1234").unwrap());
        assert!(ledger.is_complete("NKL1234", Target::Myntra).unwrap());

        archiver.fail.store(false, Ordering::SeqCst);
        let retried = ledger.mark_complete("NKL1234", Target::Myntra).unwrap();
        assert!(!retried.changed);
        assert!(retried.archived_now);
        assert_eq!(archiver.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn archival_that_could_not_be_recorded_is_never_repeated() {
        let dir = TempDir::new().unwrap();
        let archive_path = dir.path().join("archived.json");
        let archiver = SnapshotBlockingArchiver {
            archive_path: archive_path.clone(),
            calls: Arc::default(),
            saved: Arc::default(),
        };
        let ledger = ledger(&dir, archiver.clone());
        ledger.mark_complete("NKL1234", Target::Meesho).unwrap();
        ledger.mark_complete("NKL1234", Target::Flipkart).unwrap();

        let err = ledger.mark_complete("NKL1234", Target::Myntra).unwrap_err();
        assert!(matches!(err, LedgerError::Write { .. }));

        // put back the snapshot holding the claim
        fs::remove_dir_all(&archive_path).unwrap();
        fs::write(&archive_path, archiver.saved.lock().unwrap().as_slice()).unwrap();

        let retried = ledger.mark_complete("NKL1234", Target::Myntra).unwrap();
        assert!(!retried.archived_now);
        assert_eq!(archiver.calls.load(Ordering::SeqCst), 1);
        let LedgerEntry::Archived { record } = ledger.status("NKL1234").unwrap() else {
            panic!("expected an archived entry");
        };
        assert!(!record.pending);
    }

    #[test]
    fn pending_claim_on_disk_is_finished_without_archiving_again() {
        let dir = TempDir::new().unwrap();
        fs_write(&dir, "ledger.json", r#"{"NKL9": {"meesho": true, "flipkart": true, "myntra": true}}"#);
        fs_write(
            &dir,
            "archived.json",
            r#"{"NKL9": {"archived_at": "2026-01-01T00:00:00Z", "targets": {"meesho": true, "flipkart": true, "myntra": true}, "pending": true}}"#,
        );
        let archiver = CountingArchiver::default();
        let ledger = ledger(&dir, archiver.clone());

        let outcome = ledger.mark_complete("NKL9", Target::Meesho).unwrap();
        assert!(!outcome.archived_now);
        assert_eq!(archiver.calls.load(Ordering::SeqCst), 0);

        let archived: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("archived.json")).unwrap())
                .unwrap();
        assert!(archived["NKL9"].get("pending").is_none());
        let active: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("ledger.json")).unwrap())
                .unwrap();
        assert!(active.get("NKL9").is_none());
    }

    #[test]
    fn unreadable_ledger_is_reported_and_left_alone() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir, NoopArchiver);
        ledger.mark_complete("NKL1", Target::Meesho).unwrap();
        fs_write(&dir, "ledger.json", "{truncated");

        let err = ledger.mark_complete("NKL1", Target::Flipkart).unwrap_err();
        assert!(matches!(err, LedgerError::Parse { .. }));
        assert!(ledger.ensure_registered("NKL2").is_err());
        assert_eq!(
            fs::read_to_string(dir.path().join("ledger.json")).unwrap(),
            "{truncated"
        );
    }

    #[test]
    fn unwritable_location_fails_to_open() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("sub");
        fs::write(&blocker, "").unwrap();
        let err = CompletionLedger::open(
            blocker.join("ledger.json"),
            blocker.join("archived.json"),
            NoopArchiver,
        )
        .err()
        .unwrap();
        assert!(matches!(err, LedgerError::Lock { .. }));
    }

    fn fs_write(dir: &TempDir, name: &str, contents: &str) {
        fs::write(dir.path().join(name), contents).unwrap();
    }
}
