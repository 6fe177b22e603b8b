use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use serde::Serialize;
use tokio::sync::{Mutex, mpsc, oneshot};

use crate::AppResult;
use crate::db::{Message, MessageStore, SNAPSHOT_LIMIT};

use super::conns::{ConnId, ConnectionRegistry};

/// Server-push wire frames. Clients never send any.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerFrame {
    Version { version: String },
    Messages { data: Vec<Message> },
}

pub struct Attached {
    pub id: ConnId,
    pub frames: mpsc::UnboundedReceiver<String>,
}

enum RoomCommand {
    Attach { reply: oneshot::Sender<AppResult<Attached>> },
    Detach { id: ConnId },
    Post { author: String, body: String, reply: oneshot::Sender<AppResult<Vec<Message>>> },
    Recent { reply: oneshot::Sender<AppResult<Vec<Message>>> },
}

/// One task per room. Owns the log and the live connections; commands
/// run one at a time to completion, so everything touching a room is
/// totally ordered without locks.
struct RoomActor {
    store: MessageStore,
    conns: ConnectionRegistry,
    version: String,
    rx: mpsc::UnboundedReceiver<RoomCommand>,
}

impl RoomActor {
    async fn run(mut self) {
        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                RoomCommand::Attach { reply } => {
                    let _ = reply.send(self.attach().await);
                }
                RoomCommand::Detach { id } => self.conns.remove(id),
                RoomCommand::Post { author, body, reply } => {
                    let _ = reply.send(self.post(&author, &body).await);
                }
                RoomCommand::Recent { reply } => {
                    let _ = reply.send(self.store.recent(SNAPSHOT_LIMIT).await);
                }
            }
        }
    }

    /// Queue the version frame and the current snapshot into the
    /// connection's channel, then add it to the live set. Both frames
    /// sit ahead of any broadcast the connection will ever see.
    async fn attach(&mut self) -> AppResult<Attached> {
        let snapshot = self.store.recent(SNAPSHOT_LIMIT).await?;

        let (tx, frames) = mpsc::unbounded_channel();
        let _ = tx.send(serde_json::to_string(&ServerFrame::Version {
            version: self.version.clone(),
        })?);
        let _ = tx.send(serde_json::to_string(&ServerFrame::Messages { data: snapshot })?);

        let id = self.conns.register(tx);
        tracing::debug!(conn = id, live = self.conns.len(), "connection attached");
        Ok(Attached { id, frames })
    }

    /// Append, recompute the snapshot, fan it out, return it. A failed
    /// append replies with the error before any broadcast happens.
    async fn post(&mut self, author: &str, body: &str) -> AppResult<Vec<Message>> {
        let appended = self.store.append(author, body).await?;
        tracing::debug!(id = appended.id, "message appended");

        let snapshot = self.store.recent(SNAPSHOT_LIMIT).await?;
        let payload = serde_json::to_string(&ServerFrame::Messages { data: snapshot.clone() })?;
        self.conns.broadcast(&payload);
        Ok(snapshot)
    }
}

#[derive(Clone)]
pub struct RoomHandle {
    tx: mpsc::UnboundedSender<RoomCommand>,
}

impl RoomHandle {
    pub async fn attach(&self) -> AppResult<Attached> {
        self.request(|reply| RoomCommand::Attach { reply }).await
    }

    pub async fn post(&self, author: String, body: String) -> AppResult<Vec<Message>> {
        self.request(|reply| RoomCommand::Post { author, body, reply }).await
    }

    pub async fn recent(&self) -> AppResult<Vec<Message>> {
        self.request(|reply| RoomCommand::Recent { reply }).await
    }

    pub fn detach(&self, id: ConnId) {
        let _ = self.tx.send(RoomCommand::Detach { id });
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<AppResult<T>>) -> RoomCommand,
    ) -> AppResult<T> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(make(reply)).map_err(|_| anyhow!("room task is gone"))?;
        rx.await.map_err(|_| anyhow!("room task dropped the request"))?
    }
}

/// Actor-per-name registry. Rooms are created lazily on first access
/// and the lock is held across creation, so exactly one actor per name
/// ever exists.
#[derive(Clone)]
pub struct Rooms {
    data_dir: PathBuf,
    version: String,
    handles: Arc<Mutex<HashMap<String, RoomHandle>>>,
}

impl Rooms {
    pub fn new(data_dir: PathBuf, version: String) -> Self {
        Self {
            data_dir,
            version,
            handles: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn get(&self, name: &str) -> AppResult<RoomHandle> {
        let mut handles = self.handles.lock().await;
        if let Some(handle) = handles.get(name) {
            return Ok(handle.clone());
        }

        let store = MessageStore::open(&self.data_dir, name).await?;
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(
            RoomActor {
                store,
                conns: ConnectionRegistry::new(),
                version: self.version.clone(),
                rx,
            }
            .run(),
        );
        tracing::info!(room = name, "room actor started");

        let handle = RoomHandle { tx };
        handles.insert(name.to_owned(), handle.clone());
        Ok(handle)
    }
}
