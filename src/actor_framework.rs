use std::collections::HashMap;
use std::fmt::{self, Debug, Display};
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, instrument, warn};

use crate::storage::{SnapshotFile, StorageError};

// =============================================================================
// 1. THE ABSTRACTION (Traits with Hooks, Params, Filters and Actions)
// =============================================================================

/// A field that failed validation and the constraint it violated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub constraint: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            constraint: constraint.into(),
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.constraint)
    }
}

impl std::error::Error for ValidationError {}

/// Trait that any domain entity must implement to be managed by ResourceActor
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug + Serialize + DeserializeOwned;
    type CreateParams: Send + Sync + Debug;
    type Replacement: Send + Sync + Debug;
    type Filter: Send + Sync + Debug;
    type Action: Send + Sync + Debug;
    type ActionResult: Send + Sync + Debug;

    fn id(&self) -> &Self::Id;

    /// Monotonic revision, bumped by the actor on every successful replace.
    fn revision(&self) -> u64;
    fn set_revision(&mut self, revision: u64);

    /// Construct the full Entity from the assigned ID and creation params.
    fn from_create_params(id: Self::Id, params: Self::CreateParams) -> Result<Self, ValidationError>;

    /// Stable summary of what a create asks for. A reused idempotency key is
    /// only replayed when the fingerprints match.
    fn create_fingerprint(params: &Self::CreateParams) -> String;

    // --- Lifecycle Hooks ---

    fn on_create(&mut self) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Apply a full-record replacement. Runs on a copy; an error discards it.
    fn on_replace(&mut self, replacement: Self::Replacement) -> Result<(), ValidationError>;

    fn matches(&self, filter: &Self::Filter) -> bool;

    // --- Action Handler ---

    /// Handle a custom domain-specific action. Runs on a copy like `on_replace`.
    fn handle_action(&mut self, action: Self::Action) -> Result<Self::ActionResult, ValidationError>;
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FrameworkError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Revision conflict on {id}: expected {expected}, current {current}")]
    Conflict { id: String, expected: u64, current: u64 },
    #[error("Idempotency key {0} was already used for a different request")]
    KeyReused(String),
    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped")]
    ActorDropped,
}

/// Outcome of a create request.
#[derive(Debug, Clone, PartialEq)]
pub struct Created<Id> {
    pub id: Id,
    /// True when an idempotency key matched an earlier create.
    pub replayed: bool,
}

// =============================================================================
// 2. THE GENERIC MESSAGES
// =============================================================================

pub type Response<T> = oneshot::Sender<Result<T, FrameworkError>>;

#[derive(Debug)]
pub enum ResourceRequest<T: Entity> {
    Create {
        params: T::CreateParams,
        idempotency_key: Option<String>,
        respond_to: Response<Created<T::Id>>,
    },
    Get {
        id: T::Id,
        respond_to: Response<Option<T>>,
    },
    Replace {
        id: T::Id,
        expected_revision: Option<u64>,
        replacement: T::Replacement,
        respond_to: Response<T>,
    },
    Search {
        filter: T::Filter,
        respond_to: Response<Vec<T>>,
    },
    Action {
        id: T::Id,
        action: T::Action,
        respond_to: Response<T::ActionResult>,
    },
    Count {
        respond_to: Response<usize>,
    },
    Shutdown,
}

/// On-disk form of a resource store.
#[derive(Serialize, Deserialize)]
#[serde(bound = "", rename_all = "camelCase")]
struct StoreSnapshot<T: Entity> {
    records: Vec<T>,
    idempotency_keys: HashMap<String, IdempotencyRecord<T>>,
}

/// The record an idempotency key created, and the request that created it.
#[derive(Clone, Serialize, Deserialize)]
#[serde(bound = "", rename_all = "camelCase")]
struct IdempotencyRecord<T: Entity> {
    id: T::Id,
    fingerprint: String,
}

// =============================================================================
// 3. THE GENERIC ACTOR SERVER
// =============================================================================

pub struct ResourceActor<T: Entity> {
    receiver: mpsc::Receiver<ResourceRequest<T>>,
    store: HashMap<T::Id, T>,
    idempotency_keys: HashMap<String, IdempotencyRecord<T>>,
    next_id_fn: Box<dyn Fn() -> T::Id + Send + Sync>,
    snapshot: Option<SnapshotFile>,
}

impl<T: Entity> ResourceActor<T> {
    pub fn new(
        buffer_size: usize,
        next_id_fn: impl Fn() -> T::Id + Send + Sync + 'static,
    ) -> (Self, ResourceClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            store: HashMap::new(),
            idempotency_keys: HashMap::new(),
            next_id_fn: Box::new(next_id_fn),
            snapshot: None,
        };
        (actor, ResourceClient::new(sender))
    }

    /// Back the store with a snapshot file, loading whatever it already holds.
    pub fn with_snapshot(mut self, snapshot: SnapshotFile) -> Result<Self, StorageError> {
        if let Some(saved) = snapshot.load::<StoreSnapshot<T>>()? {
            info!(
                path = %snapshot.path().display(),
                records = saved.records.len(),
                "Loaded store snapshot"
            );
            self.store = saved
                .records
                .into_iter()
                .map(|item| (item.id().clone(), item))
                .collect();
            self.idempotency_keys = saved.idempotency_keys;
        }
        self.snapshot = Some(snapshot);
        Ok(self)
    }

    #[instrument(name = "resource_actor", skip(self), fields(entity = std::any::type_name::<T>()))]
    pub async fn run(mut self) {
        info!("ResourceActor starting");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ResourceRequest::Create {
                    params,
                    idempotency_key,
                    respond_to,
                } => {
                    let result = self.handle_create(params, idempotency_key).await;
                    let _ = respond_to.send(result);
                }
                ResourceRequest::Get { id, respond_to } => {
                    let _ = respond_to.send(Ok(self.store.get(&id).cloned()));
                }
                ResourceRequest::Replace {
                    id,
                    expected_revision,
                    replacement,
                    respond_to,
                } => {
                    let result = self.handle_replace(id, expected_revision, replacement).await;
                    let _ = respond_to.send(result);
                }
                ResourceRequest::Search { filter, respond_to } => {
                    let found: Vec<T> = self
                        .store
                        .values()
                        .filter(|item| item.matches(&filter))
                        .cloned()
                        .collect();
                    debug!(matches = found.len(), "Search complete");
                    let _ = respond_to.send(Ok(found));
                }
                ResourceRequest::Action {
                    id,
                    action,
                    respond_to,
                } => {
                    let result = self.handle_action(id, action).await;
                    let _ = respond_to.send(result);
                }
                ResourceRequest::Count { respond_to } => {
                    let _ = respond_to.send(Ok(self.store.len()));
                }
                ResourceRequest::Shutdown => {
                    info!("ResourceActor shutting down");
                    break;
                }
            }
        }

        info!("ResourceActor stopped");
    }

    #[instrument(skip(self, params))]
    async fn handle_create(
        &mut self,
        params: T::CreateParams,
        idempotency_key: Option<String>,
    ) -> Result<Created<T::Id>, FrameworkError> {
        let fingerprint = T::create_fingerprint(&params);
        if let Some(key) = &idempotency_key {
            if let Some(existing) = self.idempotency_keys.get(key) {
                if existing.fingerprint != fingerprint {
                    warn!(id = %existing.id, "Idempotency key reused for a different request");
                    return Err(FrameworkError::KeyReused(key.clone()));
                }
                info!(id = %existing.id, "Idempotency key replayed");
                return Ok(Created {
                    id: existing.id.clone(),
                    replayed: true,
                });
            }
        }

        let mut id = (self.next_id_fn)();
        while self.store.contains_key(&id) {
            warn!(id = %id, "Generated id already in use, drawing another");
            id = (self.next_id_fn)();
        }

        let mut item = T::from_create_params(id.clone(), params)?;
        item.on_create()?;

        self.store.insert(id.clone(), item);
        if let Some(key) = idempotency_key.clone() {
            self.idempotency_keys.insert(
                key,
                IdempotencyRecord {
                    id: id.clone(),
                    fingerprint,
                },
            );
        }

        if let Err(e) = self.persist().await {
            self.store.remove(&id);
            if let Some(key) = idempotency_key {
                self.idempotency_keys.remove(&key);
            }
            return Err(e);
        }

        info!(id = %id, "Item created");
        Ok(Created { id, replayed: false })
    }

    #[instrument(fields(id = %id), skip(self, id, replacement))]
    async fn handle_replace(
        &mut self,
        id: T::Id,
        expected_revision: Option<u64>,
        replacement: T::Replacement,
    ) -> Result<T, FrameworkError> {
        let current = self
            .store
            .get(&id)
            .ok_or_else(|| FrameworkError::NotFound(id.to_string()))?;

        if let Some(expected) = expected_revision {
            if expected != current.revision() {
                warn!(expected, current = current.revision(), "Stale revision");
                return Err(FrameworkError::Conflict {
                    id: id.to_string(),
                    expected,
                    current: current.revision(),
                });
            }
        }

        let mut next = current.clone();
        next.on_replace(replacement)?;
        next.set_revision(current.revision() + 1);

        let previous = self.store.insert(id.clone(), next.clone());
        if let Err(e) = self.persist().await {
            if let Some(previous) = previous {
                self.store.insert(id, previous);
            }
            return Err(e);
        }

        info!(revision = next.revision(), "Item replaced");
        Ok(next)
    }

    #[instrument(fields(id = %id), skip(self, id))]
    async fn handle_action(
        &mut self,
        id: T::Id,
        action: T::Action,
    ) -> Result<T::ActionResult, FrameworkError> {
        let mut next = self
            .store
            .get(&id)
            .cloned()
            .ok_or_else(|| FrameworkError::NotFound(id.to_string()))?;

        let result = next.handle_action(action)?;

        let previous = self.store.insert(id.clone(), next);
        if let Err(e) = self.persist().await {
            if let Some(previous) = previous {
                self.store.insert(id, previous);
            }
            return Err(e);
        }

        Ok(result)
    }

    async fn persist(&self) -> Result<(), FrameworkError> {
        let Some(snapshot) = &self.snapshot else {
            return Ok(());
        };

        let state = StoreSnapshot::<T> {
            records: self.store.values().cloned().collect(),
            idempotency_keys: self.idempotency_keys.clone(),
        };
        snapshot.store(&state).await.map_err(|e| {
            error!(error = %e, "Snapshot write failed, rolling back");
            FrameworkError::Storage(e)
        })
    }
}

// =============================================================================
// 4. THE GENERIC CLIENT
// =============================================================================

#[derive(Clone)]
pub struct ResourceClient<T: Entity> {
    sender: mpsc::Sender<ResourceRequest<T>>,
}

impl<T: Entity> ResourceClient<T> {
    pub fn new(sender: mpsc::Sender<ResourceRequest<T>>) -> Self {
        Self { sender }
    }

    async fn request<R>(
        &self,
        build: impl FnOnce(Response<R>) -> ResourceRequest<T>,
    ) -> Result<R, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    pub async fn create(
        &self,
        params: T::CreateParams,
        idempotency_key: Option<String>,
    ) -> Result<Created<T::Id>, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Create {
            params,
            idempotency_key,
            respond_to,
        })
        .await
    }

    pub async fn get(&self, id: T::Id) -> Result<Option<T>, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Get { id, respond_to })
            .await
    }

    pub async fn replace(
        &self,
        id: T::Id,
        expected_revision: Option<u64>,
        replacement: T::Replacement,
    ) -> Result<T, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Replace {
            id,
            expected_revision,
            replacement,
            respond_to,
        })
        .await
    }

    pub async fn search(&self, filter: T::Filter) -> Result<Vec<T>, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Search { filter, respond_to })
            .await
    }

    pub async fn perform_action(
        &self,
        id: T::Id,
        action: T::Action,
    ) -> Result<T::ActionResult, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Action {
            id,
            action,
            respond_to,
        })
        .await
    }

    pub async fn count(&self) -> Result<usize, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Count { respond_to })
            .await
    }

    pub async fn shutdown(&self) -> Result<(), FrameworkError> {
        self.sender
            .send(ResourceRequest::Shutdown)
            .await
            .map_err(|_| FrameworkError::ActorClosed)
    }
}

// =============================================================================
// 5. EXAMPLE USAGE (Test)
// =============================================================================
