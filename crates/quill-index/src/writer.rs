//! Write dispatch.
//!
//! An [`IndexWriter`] decides *when* prepared documents reach the engine:
//!
//! | Writer | `config.writer` | Behaviour |
//! |--------|-----------------|-----------|
//! | [`DirectWriter`] | `direct` | apply and commit on every call |
//! | [`TransactionWriter`] | `transactional` | buffer, commit once |
//! | [`NoOpWriter`] | `noop` | indexing disabled |
//! | [`QueuedWriter`] | `queued` | hand off to a background tokio task |
//!
//! Documents are always built on the calling thread; only the resulting
//! [`WriteOp`]s travel. Objects whose blueprint ignores them are unindexed
//! instead of stored.
//!
//! Every writer also implements [`LifecycleHooks`], the entry points an
//! application calls after persisting, updating or destroying an object.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

use quill_core::{Error, Result};

use crate::adapter::Indexable;
use crate::database::Database;
use crate::document::Document;

// ============================================================================
// Operations
// ============================================================================

/// A prepared change to the index.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Store (or replace) a document.
    Store(Document),
    /// Delete the document with this unique key.
    Delete(String),
    /// Delete every document of this class.
    DeleteClass(String),
}

/// Turn `object` into the operation that brings the index up to date.
fn prepare(db: &Database, object: &dyn Indexable) -> Result<WriteOp> {
    let snapshot = db.registry().snapshot();
    let blueprint = snapshot.blueprint_for(object.class_name())?;
    let key = db.unique_key(object);

    if blueprint.should_ignore(object) {
        log::warn!("'{key}' is ignored by its blueprint, removing it from the index");
        return Ok(WriteOp::Delete(key));
    }

    let document = db.indexer_for(snapshot).build_document_for(object, &key)?;
    Ok(WriteOp::Store(document))
}

/// Statistics from a class reindex.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Documents stored.
    pub documents_indexed: usize,
    /// Objects left out because their blueprint ignores them.
    pub documents_skipped: usize,
}

/// Prepare the operations rebuilding `class` from `objects`.
fn reindex_ops(
    db: &Database,
    class: &str,
    objects: &[&dyn Indexable],
) -> Result<(Vec<WriteOp>, IndexStats)> {
    let mut ops = vec![WriteOp::DeleteClass(class.to_string())];
    let mut stats = IndexStats::default();
    for object in objects {
        match prepare(db, *object)? {
            op @ WriteOp::Store(_) => {
                ops.push(op);
                stats.documents_indexed += 1;
            }
            _ => stats.documents_skipped += 1,
        }
    }
    Ok((ops, stats))
}

// ============================================================================
// IndexWriter
// ============================================================================

/// Applies index changes for domain objects.
pub trait IndexWriter: fmt::Debug + Send + Sync {
    /// Writer name, as used in configuration.
    fn name(&self) -> &str;

    /// The database written to.
    fn database(&self) -> &Database;

    /// Index (or re-index) `object`.
    fn index(&self, object: &dyn Indexable) -> Result<()>;

    /// Remove `object` from the index.
    fn unindex(&self, object: &dyn Indexable) -> Result<()>;

    /// Replace every document of `class` with documents for `objects`.
    fn reindex_class(&self, class: &str, objects: &[&dyn Indexable]) -> Result<IndexStats>;

    /// Index `object`, then every dependent registered for a change of
    /// `changed` fields on its class.
    ///
    /// Returns the number of dependents reindexed.
    fn index_changes(&self, object: &dyn Indexable, changed: &[&str]) -> Result<usize> {
        self.index(object)?;

        let mut reindexed = 0;
        let dependencies = self
            .database()
            .registry()
            .dependencies_for(object.class_name(), changed);
        for dependency in dependencies {
            for dependent in dependency.dependents(object) {
                self.index(dependent.as_ref())?;
                reindexed += 1;
            }
        }
        if reindexed > 0 {
            log::debug!(
                "reindexed {reindexed} dependent(s) of {} after change to {changed:?}",
                object.class_name()
            );
        }
        Ok(reindexed)
    }
}

/// Hooks to call from an application's persistence layer.
pub trait LifecycleHooks {
    /// After an object was first saved.
    fn after_create(&self, object: &dyn Indexable) -> Result<()>;

    /// After an object was updated; `changed` lists the modified fields.
    fn after_update(&self, object: &dyn Indexable, changed: &[&str]) -> Result<()>;

    /// After an object was destroyed.
    fn after_destroy(&self, object: &dyn Indexable) -> Result<()>;
}

impl<W: IndexWriter + ?Sized> LifecycleHooks for W {
    fn after_create(&self, object: &dyn Indexable) -> Result<()> {
        self.index(object)
    }

    fn after_update(&self, object: &dyn Indexable, changed: &[&str]) -> Result<()> {
        self.index_changes(object, changed).map(|_| ())
    }

    fn after_destroy(&self, object: &dyn Indexable) -> Result<()> {
        self.unindex(object)
    }
}

/// Create the writer named by `db.config().writer`.
///
/// # Errors
///
/// Returns [`Error::Config`] for an unknown writer name, or for `queued`
/// outside a tokio runtime.
pub fn create_writer(db: &Database) -> Result<Box<dyn IndexWriter>> {
    let name = db.config().writer.clone();
    let db = db.clone();
    let writer: Box<dyn IndexWriter> = match name.as_str() {
        "direct" => Box::new(DirectWriter::new(db)),
        "transactional" => Box::new(TransactionWriter::new(db)),
        "noop" => Box::new(NoOpWriter::new(db)),
        "queued" => Box::new(QueuedWriter::spawn(db)?),
        other => {
            return Err(Error::config(format!(
                "unknown writer '{other}' (expected direct, transactional, noop or queued)"
            )));
        }
    };
    Ok(writer)
}

// ============================================================================
// DirectWriter
// ============================================================================

/// Applies and commits every change immediately.
#[derive(Debug, Clone)]
pub struct DirectWriter {
    db: Database,
}

impl DirectWriter {
    /// Create a writer over `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl IndexWriter for DirectWriter {
    fn name(&self) -> &str {
        "direct"
    }

    fn database(&self) -> &Database {
        &self.db
    }

    fn index(&self, object: &dyn Indexable) -> Result<()> {
        let op = prepare(&self.db, object)?;
        self.db.apply(vec![op], true)
    }

    fn unindex(&self, object: &dyn Indexable) -> Result<()> {
        let key = self.db.unique_key(object);
        self.db.apply(vec![WriteOp::Delete(key)], true)
    }

    fn reindex_class(&self, class: &str, objects: &[&dyn Indexable]) -> Result<IndexStats> {
        let (ops, stats) = reindex_ops(&self.db, class, objects)?;
        self.db.apply(ops, true)?;
        log::info!(
            "reindexed {class}: {} indexed, {} skipped",
            stats.documents_indexed,
            stats.documents_skipped
        );
        Ok(stats)
    }
}

// ============================================================================
// TransactionWriter
// ============================================================================

/// Buffers changes until [`commit`](Self::commit).
pub struct TransactionWriter {
    db: Database,
    pending: Mutex<Vec<WriteOp>>,
}

impl TransactionWriter {
    /// Create an empty transaction over `db`.
    pub fn new(db: Database) -> Self {
        Self {
            db,
            pending: Mutex::new(Vec::new()),
        }
    }

    fn push(&self, op: WriteOp) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(op);
    }

    /// Number of buffered changes.
    pub fn pending(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Drop buffered changes.
    pub fn rollback(&self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Apply buffered changes and commit once. Returns how many were applied.
    pub fn commit(&self) -> Result<usize> {
        let ops = std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner));
        let count = ops.len();
        self.db.apply(ops, true)?;
        log::info!("committed transaction with {count} change(s)");
        Ok(count)
    }
}

impl IndexWriter for TransactionWriter {
    fn name(&self) -> &str {
        "transactional"
    }

    fn database(&self) -> &Database {
        &self.db
    }

    fn index(&self, object: &dyn Indexable) -> Result<()> {
        let op = prepare(&self.db, object)?;
        self.push(op);
        Ok(())
    }

    fn unindex(&self, object: &dyn Indexable) -> Result<()> {
        self.push(WriteOp::Delete(self.db.unique_key(object)));
        Ok(())
    }

    fn reindex_class(&self, _class: &str, _objects: &[&dyn Indexable]) -> Result<IndexStats> {
        Err(Error::unsupported("reindex_class inside a transaction"))
    }
}

impl fmt::Debug for TransactionWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionWriter")
            .field("pending", &self.pending())
            .finish()
    }
}

// ============================================================================
// NoOpWriter
// ============================================================================

/// Discards every change.
#[derive(Debug, Clone)]
pub struct NoOpWriter {
    db: Database,
}

impl NoOpWriter {
    /// Create a writer over `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl IndexWriter for NoOpWriter {
    fn name(&self) -> &str {
        "noop"
    }

    fn database(&self) -> &Database {
        &self.db
    }

    fn index(&self, object: &dyn Indexable) -> Result<()> {
        log::debug!("indexing disabled, skipping {}", self.db.unique_key(object));
        Ok(())
    }

    fn unindex(&self, _object: &dyn Indexable) -> Result<()> {
        Ok(())
    }

    fn reindex_class(&self, _class: &str, _objects: &[&dyn Indexable]) -> Result<IndexStats> {
        Err(Error::unsupported("reindex_class with indexing disabled"))
    }
}

// ============================================================================
// QueuedWriter
// ============================================================================

enum Job {
    Apply(Vec<WriteOp>),
    Flush(oneshot::Sender<()>),
}

/// Sends changes to a background task that applies them in order.
///
/// Errors inside the worker are logged, not returned; call
/// [`flush`](Self::flush) to wait until everything queued so far is applied.
#[derive(Clone)]
pub struct QueuedWriter {
    db: Database,
    jobs: mpsc::UnboundedSender<Job>,
}

impl QueuedWriter {
    /// Start the worker on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when called outside a runtime.
    pub fn spawn(db: Database) -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|_| Error::config("the queued writer requires a tokio runtime"))?;
        let (jobs, mut rx) = mpsc::unbounded_channel::<Job>();

        let worker_db = db.clone();
        handle.spawn(async move {
            log::info!("queued writer started");
            while let Some(job) = rx.recv().await {
                match job {
                    Job::Apply(ops) => {
                        if let Err(err) = worker_db.apply(ops, true) {
                            log::warn!("queued write failed: {err}");
                        }
                    }
                    Job::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            log::info!("queued writer stopped");
        });

        Ok(Self { db, jobs })
    }

    fn enqueue(&self, ops: Vec<WriteOp>) -> Result<()> {
        self.jobs
            .send(Job::Apply(ops))
            .map_err(|_| Error::engine("queued writer has stopped"))
    }

    /// Wait until every change queued before this call has been applied.
    pub async fn flush(&self) -> Result<()> {
        let (done, wait) = oneshot::channel();
        self.jobs
            .send(Job::Flush(done))
            .map_err(|_| Error::engine("queued writer has stopped"))?;
        wait.await
            .map_err(|_| Error::engine("queued writer stopped before flushing"))
    }
}

impl IndexWriter for QueuedWriter {
    fn name(&self) -> &str {
        "queued"
    }

    fn database(&self) -> &Database {
        &self.db
    }

    fn index(&self, object: &dyn Indexable) -> Result<()> {
        let op = prepare(&self.db, object)?;
        self.enqueue(vec![op])
    }

    fn unindex(&self, object: &dyn Indexable) -> Result<()> {
        self.enqueue(vec![WriteOp::Delete(self.db.unique_key(object))])
    }

    fn reindex_class(&self, class: &str, objects: &[&dyn Indexable]) -> Result<IndexStats> {
        let (ops, stats) = reindex_ops(&self.db, class, objects)?;
        self.enqueue(ops)?;
        log::info!(
            "queued reindex of {class}: {} to index, {} skipped",
            stats.documents_indexed,
            stats.documents_skipped
        );
        Ok(stats)
    }
}

impl fmt::Debug for QueuedWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedWriter")
            .field("closed", &self.jobs.is_closed())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
