//! Sharded JSON document store.
//!
//! Every domain document lives in its own directory derived from its UUID:
//!
//! ```text
//! <data_dir>/
//!   users/<s1>/<s2>/<uuid>/user.json
//!   users/email-index/<sha256(email)>            # uniqueness constraint
//!   appointments/<s1>/<s2>/<uuid>/appointment.json
//!   appointments/slots/<physio>/<date>_<start>.json  # slot ledger
//!   chats/<s1>/<s2>/<uuid>/thread.json
//! ```
//!
//! where `s1`/`s2` are the first four hex characters of the UUID.
//!
//! ## Concurrency
//!
//! All mutating operations on a collection run under a per-collection mutex.
//! [`Collection::update_where`] re-reads the document while holding the lock
//! and applies the caller's guard against *current* state, so a guard like
//! "status must still be pending" admits at most one winner between two
//! concurrent writers. The [`EmailIndex`] and [`SlotLedger`] provide the
//! equivalent of database uniqueness constraints: a claim checks and creates
//! the marker file under the lock in one critical section.

use crate::{BookingError, BookingResult};
use physio_types::BookingUuid;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

fn hold(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One collection of sharded JSON documents.
#[derive(Debug)]
pub struct Collection<T> {
    dir: PathBuf,
    file_name: &'static str,
    entity: &'static str,
    lock: Mutex<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Creates a collection rooted at `dir`.
    ///
    /// `file_name` is the document file inside each sharded directory;
    /// `entity` names the document kind in `NotFound` errors.
    pub fn new(dir: PathBuf, file_name: &'static str, entity: &'static str) -> Self {
        Self {
            dir,
            file_name,
            entity,
            lock: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    fn doc_path(&self, id: &BookingUuid) -> PathBuf {
        id.sharded_dir(&self.dir).join(self.file_name)
    }

    fn read_doc(&self, id: &BookingUuid) -> BookingResult<T> {
        let path = self.doc_path(id);
        let contents = fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BookingError::NotFound(self.entity)
            } else {
                BookingError::FileRead(e)
            }
        })?;
        serde_json::from_str(&contents).map_err(BookingError::Deserialization)
    }

    fn write_doc(&self, id: &BookingUuid, doc: &T) -> BookingResult<()> {
        let path = self.doc_path(id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(BookingError::StorageDirCreation)?;
        }
        let json = serde_json::to_string_pretty(doc).map_err(BookingError::Serialization)?;
        fs::write(&path, json).map_err(BookingError::FileWrite)
    }

    /// Persists a new document under `id`.
    pub fn insert(&self, id: &BookingUuid, doc: &T) -> BookingResult<()> {
        let _guard = hold(&self.lock);
        self.write_doc(id, doc)
    }

    /// Reads the document for `id`, failing with `NotFound` if absent.
    pub fn get(&self, id: &BookingUuid) -> BookingResult<T> {
        let _guard = hold(&self.lock);
        self.read_doc(id)
    }

    /// Reads the document for `id`, returning `None` if absent.
    pub fn try_get(&self, id: &BookingUuid) -> BookingResult<Option<T>> {
        match self.get(id) {
            Ok(doc) => Ok(Some(doc)),
            Err(BookingError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Conditionally mutates the document for `id`.
    ///
    /// The document is re-read under the collection lock and `f` is applied to
    /// the current state. If `f` returns an error (a failed guard), nothing
    /// is written and the error is returned. Otherwise the mutated document is
    /// persisted and `f`'s value returned.
    pub fn update_where<R>(
        &self,
        id: &BookingUuid,
        f: impl FnOnce(&mut T) -> BookingResult<R>,
    ) -> BookingResult<R> {
        let _guard = hold(&self.lock);
        let mut doc = self.read_doc(id)?;
        let outcome = f(&mut doc)?;
        self.write_doc(id, &doc)?;
        Ok(outcome)
    }

    /// Removes the document for `id`, if present.
    pub fn remove(&self, id: &BookingUuid) -> BookingResult<()> {
        let _guard = hold(&self.lock);
        match fs::remove_file(self.doc_path(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BookingError::FileWrite(e)),
        }
    }

    /// Lists every document in the collection.
    ///
    /// Traverses the sharded directory structure; individual documents that
    /// cannot be parsed are logged as warnings and skipped.
    pub fn list(&self) -> Vec<T> {
        let _guard = hold(&self.lock);
        let mut docs = Vec::new();

        let s1_iter = match fs::read_dir(&self.dir) {
            Ok(it) => it,
            Err(_) => return docs,
        };
        for s1 in s1_iter.flatten() {
            let s1_path = s1.path();
            if !s1_path.is_dir() {
                continue;
            }

            let s2_iter = match fs::read_dir(&s1_path) {
                Ok(it) => it,
                Err(_) => continue,
            };

            for s2 in s2_iter.flatten() {
                let s2_path = s2.path();
                if !s2_path.is_dir() {
                    continue;
                }

                let id_iter = match fs::read_dir(&s2_path) {
                    Ok(it) => it,
                    Err(_) => continue,
                };

                for id_ent in id_iter.flatten() {
                    let doc_path = id_ent.path().join(self.file_name);
                    if !doc_path.is_file() {
                        continue;
                    }

                    match fs::read_to_string(&doc_path)
                        .ok()
                        .map(|contents| serde_json::from_str::<T>(&contents))
                    {
                        Some(Ok(doc)) => docs.push(doc),
                        Some(Err(e)) => {
                            tracing::warn!(
                                "failed to parse {}: {} - {}",
                                self.file_name,
                                doc_path.display(),
                                e
                            );
                        }
                        None => {}
                    }
                }
            }
        }

        docs
    }
}

/// Email uniqueness index for the users collection.
///
/// One marker file per registered address, named by the address's SHA-256
/// digest and containing the owning user's id. Claiming is check-and-create
/// under a lock, so two concurrent registrations of the same address admit at
/// most one winner.
#[derive(Debug)]
pub struct EmailIndex {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl EmailIndex {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            lock: Mutex::new(()),
        }
    }

    fn entry_path(&self, email: &str) -> PathBuf {
        self.dir.join(crate::tokens::sha256_hex(email))
    }

    /// Claims `email` for `user_id`, failing with `EmailTaken` if already
    /// claimed.
    pub fn claim(&self, email: &str, user_id: &BookingUuid) -> BookingResult<()> {
        let _guard = hold(&self.lock);
        let path = self.entry_path(email);
        if path.exists() {
            return Err(BookingError::EmailTaken);
        }
        fs::create_dir_all(&self.dir).map_err(BookingError::StorageDirCreation)?;
        fs::write(&path, user_id.to_string()).map_err(BookingError::FileWrite)
    }

    /// Releases a claim, e.g. when persisting the user failed after the claim
    /// succeeded. Releasing an unclaimed address is a no-op.
    pub fn release(&self, email: &str) -> BookingResult<()> {
        let _guard = hold(&self.lock);
        match fs::remove_file(self.entry_path(email)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BookingError::FileWrite(e)),
        }
    }

    /// Looks up the user id registered under `email`.
    pub fn lookup(&self, email: &str) -> BookingResult<Option<BookingUuid>> {
        let _guard = hold(&self.lock);
        let path = self.entry_path(email);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BookingError::FileRead(e)),
        };
        let id = BookingUuid::parse(contents.trim())?;
        Ok(Some(id))
    }
}

/// Claim record stored in the slot ledger.
#[derive(Debug, Serialize, Deserialize)]
struct SlotClaim {
    appointment_id: BookingUuid,
}

/// Uniqueness ledger for appointment slots.
///
/// One file per claimed (physiotherapist, date, start-time) triple. A slot is
/// claimed while its appointment is pending or confirmed and released when the
/// appointment leaves that set, mirroring a partial uniqueness constraint.
#[derive(Debug)]
pub struct SlotLedger {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl SlotLedger {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            lock: Mutex::new(()),
        }
    }

    fn claim_path(&self, physio: &BookingUuid, date: &str, start_time: &str) -> PathBuf {
        self.dir
            .join(physio.to_string())
            .join(format!("{date}_{start_time}.json"))
    }

    /// Claims the slot for `appointment_id`.
    ///
    /// # Errors
    ///
    /// Returns `SlotConflict` if the slot is already claimed.
    pub fn claim(
        &self,
        physio: &BookingUuid,
        date: &str,
        start_time: &str,
        appointment_id: &BookingUuid,
    ) -> BookingResult<()> {
        let _guard = hold(&self.lock);
        let path = self.claim_path(physio, date, start_time);
        if path.exists() {
            return Err(BookingError::SlotConflict);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(BookingError::StorageDirCreation)?;
        }
        let claim = SlotClaim {
            appointment_id: appointment_id.clone(),
        };
        let json = serde_json::to_string(&claim).map_err(BookingError::Serialization)?;
        fs::write(&path, json).map_err(BookingError::FileWrite)
    }

    /// Releases the slot. Releasing an unclaimed slot is a no-op.
    pub fn release(
        &self,
        physio: &BookingUuid,
        date: &str,
        start_time: &str,
    ) -> BookingResult<()> {
        let _guard = hold(&self.lock);
        match fs::remove_file(self.claim_path(physio, date, start_time)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BookingError::FileWrite(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Doc {
        id: BookingUuid,
        status: String,
        counter: u32,
    }

    fn test_collection(dir: &Path) -> Collection<Doc> {
        Collection::new(dir.to_path_buf(), "doc.json", "document")
    }

    #[test]
    fn test_insert_then_get_round_trips() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let collection = test_collection(temp.path());

        let id = BookingUuid::new();
        let doc = Doc {
            id: id.clone(),
            status: "pending".into(),
            counter: 0,
        };

        collection.insert(&id, &doc).expect("insert should succeed");
        let fetched = collection.get(&id).expect("get should succeed");
        assert_eq!(fetched, doc);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let collection = test_collection(temp.path());

        let err = collection
            .get(&BookingUuid::new())
            .expect_err("missing document should fail");
        assert!(matches!(err, BookingError::NotFound("document")));

        assert!(collection
            .try_get(&BookingUuid::new())
            .expect("try_get should not error")
            .is_none());
    }

    #[test]
    fn test_update_where_applies_mutation() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let collection = test_collection(temp.path());

        let id = BookingUuid::new();
        let doc = Doc {
            id: id.clone(),
            status: "pending".into(),
            counter: 0,
        };
        collection.insert(&id, &doc).expect("insert should succeed");

        collection
            .update_where(&id, |doc| {
                doc.status = "confirmed".into();
                doc.counter += 1;
                Ok(())
            })
            .expect("update should succeed");

        let fetched = collection.get(&id).expect("get should succeed");
        assert_eq!(fetched.status, "confirmed");
        assert_eq!(fetched.counter, 1);
    }

    #[test]
    fn test_update_where_failed_guard_writes_nothing() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let collection = test_collection(temp.path());

        let id = BookingUuid::new();
        let doc = Doc {
            id: id.clone(),
            status: "confirmed".into(),
            counter: 7,
        };
        collection.insert(&id, &doc).expect("insert should succeed");

        let err = collection
            .update_where(&id, |doc| {
                if doc.status != "pending" {
                    return Err(BookingError::InvalidState("not pending".into()));
                }
                doc.counter = 99;
                Ok(())
            })
            .expect_err("guard should fail");
        assert!(matches!(err, BookingError::InvalidState(_)));

        let fetched = collection.get(&id).expect("get should succeed");
        assert_eq!(fetched.counter, 7, "failed guard must not write");
    }

    #[test]
    fn test_list_skips_unparsable_documents() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let collection = test_collection(temp.path());

        let id = BookingUuid::new();
        collection
            .insert(
                &id,
                &Doc {
                    id: id.clone(),
                    status: "pending".into(),
                    counter: 0,
                },
            )
            .expect("insert should succeed");

        let broken_id = BookingUuid::new();
        let broken_dir = broken_id.sharded_dir(temp.path());
        fs::create_dir_all(&broken_dir).expect("should create directory");
        fs::write(broken_dir.join("doc.json"), "{not json").expect("should write broken file");

        let docs = collection.list();
        assert_eq!(docs.len(), 1, "broken document should be skipped");
        assert_eq!(docs[0].id, id);
    }

    #[test]
    fn test_email_index_claims_once() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let index = EmailIndex::new(temp.path().join("email-index"));

        let first = BookingUuid::new();
        index
            .claim("alice@example.com", &first)
            .expect("first claim should succeed");

        let err = index
            .claim("alice@example.com", &BookingUuid::new())
            .expect_err("second claim should fail");
        assert!(matches!(err, BookingError::EmailTaken));

        let found = index
            .lookup("alice@example.com")
            .expect("lookup should succeed")
            .expect("entry should exist");
        assert_eq!(found, first);

        assert!(index
            .lookup("bob@example.com")
            .expect("lookup should succeed")
            .is_none());
    }

    #[test]
    fn test_slot_ledger_admits_one_claim() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let ledger = SlotLedger::new(temp.path().join("slots"));

        let physio = BookingUuid::new();
        ledger
            .claim(&physio, "2025-03-10", "10:00", &BookingUuid::new())
            .expect("first claim should succeed");

        let err = ledger
            .claim(&physio, "2025-03-10", "10:00", &BookingUuid::new())
            .expect_err("second claim should conflict");
        assert!(matches!(err, BookingError::SlotConflict));

        // Different start time on the same day is a different slot.
        ledger
            .claim(&physio, "2025-03-10", "11:00", &BookingUuid::new())
            .expect("different slot should claim");

        ledger
            .release(&physio, "2025-03-10", "10:00")
            .expect("release should succeed");
        ledger
            .claim(&physio, "2025-03-10", "10:00", &BookingUuid::new())
            .expect("released slot should claim again");
    }

    #[test]
    fn test_slot_ledger_concurrent_claims_admit_one_winner() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let ledger = std::sync::Arc::new(SlotLedger::new(temp.path().join("slots")));
        let physio = BookingUuid::new();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = ledger.clone();
                let physio = physio.clone();
                std::thread::spawn(move || {
                    ledger
                        .claim(&physio, "2025-03-10", "10:00", &BookingUuid::new())
                        .is_ok()
                })
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().expect("thread should not panic"))
            .filter(|&ok| ok)
            .count();
        assert_eq!(wins, 1, "exactly one concurrent claim should win");
    }
}
