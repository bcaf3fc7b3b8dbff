//! Key-value persistence for notes and settings.
//!
//! `Database` keeps its SQLite connection on one worker thread; callers ship
//! closures to it and await the answer on a oneshot channel.

use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use log::{debug, error, info};
use rusqlite::Connection;
use tokio::sync::oneshot;

mod memory;
mod migrations;
mod repositories;
mod store;

use migrations::run_migrations;

pub use memory::MemoryStore;
pub use store::{KeyValueStore, APP_SETTINGS_KEY, VOICE_NOTES_KEY};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum WorkerMessage {
    Run(Job),
    Close,
}

struct Worker {
    jobs: mpsc::Sender<WorkerMessage>,
    handle: Mutex<Option<JoinHandle<()>>>,
    path: PathBuf,
}

impl Drop for Worker {
    fn drop(&mut self) {
        let handle = match self.handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(handle) = handle else {
            return;
        };

        if self.jobs.send(WorkerMessage::Close).is_err() {
            error!("Database worker for {} already gone", self.path.display());
        }
        if let Err(panic) = handle.join() {
            error!("Database worker panicked: {panic:?}");
        }
    }
}

#[derive(Clone)]
pub struct Database {
    worker: Arc<Worker>,
}

impl Database {
    /// Opens (or creates) the database file and brings its schema up to date.
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }

        let (jobs_tx, jobs_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let thread_path = path.clone();

        let handle = thread::Builder::new()
            .name("voicenotes-db".into())
            .spawn(move || serve(thread_path, ready_tx, jobs_rx))
            .context("failed to spawn database thread")?;

        ready_rx
            .recv()
            .context("database thread exited during startup")??;
        info!("Database ready at {}", path.display());

        Ok(Self {
            worker: Arc::new(Worker {
                jobs: jobs_tx,
                handle: Mutex::new(Some(handle)),
                path,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.worker.path
    }

    /// Runs `task` against the connection on the database thread.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |conn| {
            if reply_tx.send(task(conn)).is_err() {
                debug!("Database caller went away before the reply");
            }
        });

        self.worker
            .jobs
            .send(WorkerMessage::Run(job))
            .map_err(|_| anyhow!("database thread is not running"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread dropped the request"))?
    }
}

fn serve(
    path: PathBuf,
    ready: mpsc::Sender<Result<()>>,
    jobs: mpsc::Receiver<WorkerMessage>,
) {
    let mut conn = match open_connection(&path) {
        Ok(conn) => conn,
        Err(err) => {
            let _ = ready.send(Err(err));
            return;
        }
    };
    if ready.send(Ok(())).is_err() {
        return;
    }

    for message in jobs {
        match message {
            WorkerMessage::Run(job) => job(&mut conn),
            WorkerMessage::Close => break,
        }
    }
    debug!("Database thread for {} stopped", path.display());
}

fn open_connection(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        error!("Failed to enable WAL mode: {err}");
    }
    conn.busy_timeout(BUSY_TIMEOUT)
        .context("failed to set busy timeout")?;

    run_migrations(&mut conn).context("failed to run database migrations")?;
    Ok(conn)
}
