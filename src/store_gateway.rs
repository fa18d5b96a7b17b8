//! Gateway to the encrypted local store. The sqlcipher connection lives on
//! a dedicated worker thread; the rest of the app only sees the narrow
//! contract: `initialize`, an opaque `call(op, args)` surface, `close`,
//! and a long-lived corruption notification that in normal operation
//! never resolves.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread,
};

use rusqlite::Connection;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{oneshot, watch};

#[derive(Debug, Error, Clone)]
pub(crate) enum StoreError {
    #[error("database is corrupted: {0}")]
    Corrupted(String),
    #[error("database error: {0}")]
    Sql(String),
    #[error("unknown store operation '{0}'")]
    UnknownOperation(String),
    #[error("invalid arguments for store operation '{op}': {reason}")]
    BadArguments { op: String, reason: String },
    #[error("store worker is gone")]
    WorkerGone,
}

enum Request {
    Call {
        op: String,
        args: Vec<Value>,
        reply: oneshot::Sender<Result<Value, StoreError>>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
}

/// Cheap-to-clone handle to the store worker. `close` is effective once;
/// later closes and calls observe `WorkerGone`.
#[derive(Clone, Debug)]
pub(crate) struct StoreHandle {
    requests: mpsc::Sender<Request>,
    corruption: watch::Receiver<Option<String>>,
    worker: Arc<Mutex<Option<thread::JoinHandle<()>>>>,
}

impl StoreHandle {
    /// Opens (creating if needed) the encrypted database and boots its
    /// schema. Must settle before any `call` is issued; the channel makes
    /// that structural rather than a convention, since the worker only
    /// starts serving after a successful open.
    pub(crate) async fn initialize(db_path: PathBuf, key: String) -> Result<Self, StoreError> {
        if key.len() != 64 || !key.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return Err(StoreError::Sql(
                "encryption key must be 64 hex characters".to_string(),
            ));
        }
        if let Some(parent_dir) = db_path.parent() {
            fs::create_dir_all(parent_dir)
                .map_err(|error| StoreError::Sql(format!("cannot create db directory: {error}")))?;
        }

        let (request_tx, request_rx) = mpsc::channel::<Request>();
        let (corruption_tx, corruption_rx) = watch::channel::<Option<String>>(None);
        let (init_tx, init_rx) = oneshot::channel::<Result<(), StoreError>>();

        let worker = thread::Builder::new()
            .name("courier-store".to_string())
            .spawn(move || worker_main(db_path, key, request_rx, corruption_tx, init_tx))
            .map_err(|error| StoreError::Sql(format!("cannot spawn store worker: {error}")))?;

        match init_rx.await {
            Ok(Ok(())) => Ok(Self {
                requests: request_tx,
                corruption: corruption_rx,
                worker: Arc::new(Mutex::new(Some(worker))),
            }),
            Ok(Err(error)) => {
                let _ = worker.join();
                Err(error)
            }
            Err(_) => {
                let _ = worker.join();
                Err(StoreError::WorkerGone)
            }
        }
    }

    pub(crate) async fn call(&self, op: &str, args: Vec<Value>) -> Result<Value, StoreError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.requests
            .send(Request::Call {
                op: op.to_string(),
                args,
                reply: reply_tx,
            })
            .map_err(|_| StoreError::WorkerGone)?;
        reply_rx.await.map_err(|_| StoreError::WorkerGone)?
    }

    /// Closes the connection and joins the worker. Called exactly once
    /// during shutdown; extra closes are no-ops.
    pub(crate) async fn close(&self) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .requests
            .send(Request::Close { reply: reply_tx })
            .is_ok()
        {
            let _ = reply_rx.await;
        }
        let worker = self.worker.lock().ok().and_then(|mut guard| guard.take());
        if let Some(worker) = worker {
            let _ = worker.join();
        }
    }

    /// Resolves at most once, if the worker ever observes a corruption-class
    /// sqlite error. Absent corruption it stays pending forever, including
    /// after a clean close.
    pub(crate) async fn when_corrupted(&self) -> StoreError {
        let mut corruption = self.corruption.clone();
        loop {
            if let Some(message) = corruption.borrow_and_update().clone() {
                return StoreError::Corrupted(message);
            }
            if corruption.changed().await.is_err() {
                // Worker exited cleanly without corruption.
                std::future::pending::<()>().await;
            }
        }
    }

    /// Non-blocking probe used to let a corruption signal win over an init
    /// success landing in the same phase.
    pub(crate) fn corruption_now(&self) -> Option<StoreError> {
        self.corruption
            .borrow()
            .clone()
            .map(StoreError::Corrupted)
    }
}

fn worker_main(
    db_path: PathBuf,
    key: String,
    requests: mpsc::Receiver<Request>,
    corruption: watch::Sender<Option<String>>,
    init_reply: oneshot::Sender<Result<(), StoreError>>,
) {
    let connection = match open_and_bootstrap(&db_path, &key) {
        Ok(connection) => {
            let _ = init_reply.send(Ok(()));
            connection
        }
        Err(error) => {
            let _ = init_reply.send(Err(error));
            return;
        }
    };

    while let Ok(request) = requests.recv() {
        match request {
            Request::Call { op, args, reply } => {
                let result = dispatch(&connection, &op, &args);
                if let Err(error) = &result {
                    if matches!(error, StoreError::Corrupted(_)) {
                        let _ = corruption.send(Some(error.to_string()));
                    }
                }
                let _ = reply.send(result);
            }
            Request::Close { reply } => {
                let _ = reply.send(());
                break;
            }
        }
    }
}

fn open_and_bootstrap(db_path: &Path, key: &str) -> Result<Connection, StoreError> {
    let connection = Connection::open(db_path).map_err(map_sql_error)?;

    // Key is validated hex, so the quoting below cannot be escaped.
    connection
        .execute_batch(&format!("PRAGMA key = \"x'{key}'\";"))
        .map_err(map_sql_error)?;

    // A wrong key surfaces here as NOTADB, same as real corruption; the
    // caller treats both as the fatal-at-boundary class.
    connection
        .query_row("SELECT count(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(map_sql_error)?;

    connection
        .execute_batch(
            "CREATE TABLE IF NOT EXISTS items (
                id TEXT PRIMARY KEY,
                json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS attachments (
                id TEXT PRIMARY KEY,
                message_id TEXT NOT NULL,
                path TEXT
            );",
        )
        .map_err(map_sql_error)?;

    Ok(connection)
}

fn dispatch(connection: &Connection, op: &str, args: &[Value]) -> Result<Value, StoreError> {
    match op {
        "getItemById" => {
            let id = string_arg(op, args, 0)?;
            let row: Option<String> = connection
                .query_row("SELECT json FROM items WHERE id = ?1", [id], |row| {
                    row.get(0)
                })
                .map(Some)
                .or_else(|error| match error {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(map_sql_error(other)),
                })?;
            match row {
                Some(raw) => serde_json::from_str(&raw)
                    .map_err(|error| StoreError::Sql(format!("stored item is not JSON: {error}"))),
                None => Ok(Value::Null),
            }
        }
        "setItem" => {
            let id = string_arg(op, args, 0)?;
            let value = args.get(1).cloned().ok_or_else(|| StoreError::BadArguments {
                op: op.to_string(),
                reason: "missing value argument".to_string(),
            })?;
            let raw = serde_json::to_string(&value)
                .map_err(|error| StoreError::Sql(format!("value is not serializable: {error}")))?;
            connection
                .execute(
                    "INSERT INTO items (id, json) VALUES (?1, ?2)
                     ON CONFLICT (id) DO UPDATE SET json = excluded.json",
                    [id, &raw],
                )
                .map_err(map_sql_error)?;
            Ok(Value::Null)
        }
        "removeItemById" => {
            let id = string_arg(op, args, 0)?;
            connection
                .execute("DELETE FROM items WHERE id = ?1", [id])
                .map_err(map_sql_error)?;
            Ok(Value::Null)
        }
        "removeOrphanedAttachments" => {
            let removed = connection
                .execute(
                    "DELETE FROM attachments
                     WHERE message_id NOT IN (SELECT id FROM messages)",
                    [],
                )
                .map_err(map_sql_error)?;
            Ok(Value::from(removed as u64))
        }
        unknown => Err(StoreError::UnknownOperation(unknown.to_string())),
    }
}

fn string_arg<'a>(op: &str, args: &'a [Value], index: usize) -> Result<&'a str, StoreError> {
    args.get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::BadArguments {
            op: op.to_string(),
            reason: format!("argument {index} must be a string"),
        })
}

fn map_sql_error(error: rusqlite::Error) -> StoreError {
    if is_corruption_error(&error) {
        StoreError::Corrupted(error.to_string())
    } else {
        StoreError::Sql(error.to_string())
    }
}

fn is_corruption_error(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(
                failure.code,
                rusqlite::ErrorCode::DatabaseCorrupt | rusqlite::ErrorCode::NotADatabase
            )
    )
}

/// Removes the database and its sidecar files. Used by the
/// delete-and-restart recovery path.
pub(crate) fn erase_store_files(db_path: &Path) -> Result<(), String> {
    let mut candidates = vec![db_path.to_path_buf()];
    for suffix in ["-wal", "-shm"] {
        let mut sidecar = db_path.as_os_str().to_owned();
        sidecar.push(suffix);
        candidates.push(PathBuf::from(sidecar));
    }
    for candidate in candidates {
        match fs::remove_file(&candidate) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => {
                return Err(format!(
                    "Failed to remove {}: {error}",
                    candidate.display()
                ));
            }
        }
    }
    Ok(())
}
