//! Generic resource store.
//!
//! One engine serves every collection. A [`ResourceSpec`] supplies the path
//! prefix and the scoping rule; the entity type supplies the id. State is
//! published through a `watch` channel so views always read a consistent
//! snapshot.
//!
//! Three sequence counters fence concurrent work:
//! - `ops`: `loading` is cleared only by the most recently issued operation.
//! - `fetches`: a list response is applied only if it answers the most
//!   recently issued `fetch_all`.
//! - `generation`: advanced by `reset` and by scope switches, so responses
//!   already in flight cannot write into a cache they no longer belong to.

use super::error::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tempo_core::{EntityIdType, ProjectId, RequestBody, Resource, ResourceKind, Transport};
use tokio::sync::watch;
use tracing::{debug, warn};

/// How a collection relates to its parent project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeRule {
    /// Listed at `{kind}`.
    Unscoped,
    /// Listed at `{kind}/project/{id}`. Listing needs a project; mutations
    /// do not.
    ParentPath,
    /// Listed at `{kind}?project_id={id}`. Every mutation needs a selected
    /// project, whose id is injected into the request.
    ParentQuery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceSpec {
    pub kind: ResourceKind,
    pub scope: ScopeRule,
    /// Whether `fetch_one` stores its result as the current selection.
    pub tracks_selection: bool,
}

impl ResourceSpec {
    pub const fn new(kind: ResourceKind, scope: ScopeRule, tracks_selection: bool) -> Self {
        Self {
            kind,
            scope,
            tracks_selection,
        }
    }
}

/// Snapshot of one store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreState<E> {
    pub items: Vec<E>,
    pub loading: bool,
    pub error: Option<String>,
    pub selection: Option<E>,
    /// Project the cache currently belongs to, for scoped collections.
    pub scope: Option<ProjectId>,
}

impl<E> Default for StoreState<E> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            error: None,
            selection: None,
            scope: None,
        }
    }
}

impl<E: Resource> StoreState<E> {
    pub fn get(&self, id: E::Id) -> Option<&E> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn contains(&self, id: E::Id) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn ids(&self) -> Vec<E::Id> {
        self.items.iter().map(Resource::id).collect()
    }

    /// Replace in place, or append when the id is new.
    fn upsert(&mut self, item: E) {
        if let Some(existing) = self.items.iter_mut().find(|e| e.id() == item.id()) {
            *existing = item;
        } else {
            self.items.push(item);
        }
    }

    /// Replace in place. Returns false, leaving the cache untouched, when the
    /// id is not cached.
    fn replace(&mut self, item: E) -> bool {
        match self.items.iter_mut().find(|e| e.id() == item.id()) {
            Some(existing) => {
                *existing = item;
                true
            }
            None => false,
        }
    }

    fn remove(&mut self, id: E::Id) {
        self.items.retain(|item| item.id() != id);
        if self.selection.as_ref().is_some_and(|s| s.id() == id) {
            self.selection = None;
        }
    }

    fn refresh_selection(&mut self, item: &E) {
        if self.selection.as_ref().is_some_and(|s| s.id() == item.id()) {
            self.selection = Some(item.clone());
        }
    }
}

pub struct ResourceStore<E: Resource> {
    transport: Arc<dyn Transport>,
    spec: ResourceSpec,
    state: watch::Sender<StoreState<E>>,
    ops: AtomicU64,
    fetches: AtomicU64,
    generation: AtomicU64,
}

impl<E: Resource> ResourceStore<E> {
    pub fn new(transport: Arc<dyn Transport>, spec: ResourceSpec) -> Self {
        Self {
            transport,
            spec,
            state: watch::Sender::new(StoreState::default()),
            ops: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
            generation: AtomicU64::new(0),
        }
    }

    pub fn spec(&self) -> ResourceSpec {
        self.spec
    }

    pub fn kind(&self) -> ResourceKind {
        self.spec.kind
    }

    /// Reactive handle. Receivers see every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<StoreState<E>> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> StoreState<E> {
        self.state.borrow().clone()
    }

    pub fn items(&self) -> Vec<E> {
        self.state.borrow().items.clone()
    }

    pub fn loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn selection(&self) -> Option<E> {
        self.state.borrow().selection.clone()
    }

    pub fn scope(&self) -> Option<ProjectId> {
        self.state.borrow().scope
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Replace the whole collection from the backend.
    ///
    /// `parent` is ignored by unscoped collections. A response that is not a
    /// list yields an empty cache and no error.
    pub async fn fetch_all(&self, parent: Option<ProjectId>) -> Result<Vec<E>, StoreError> {
        let kind = self.spec.kind;
        let fallback = format!("Failed to fetch {}", kind.plural());
        let parent = parent.filter(EntityIdType::is_valid);

        let (path, query) = match (self.spec.scope, parent) {
            (ScopeRule::Unscoped, _) => (kind.path().to_string(), Vec::new()),
            (ScopeRule::ParentPath, Some(project)) => {
                self.enter_scope(project);
                (format!("{}/project/{}", kind.path(), project), Vec::new())
            }
            (ScopeRule::ParentPath, None) => {
                return Err(self.reject(format!(
                    "A project must be selected to fetch {}",
                    kind.plural()
                )));
            }
            (ScopeRule::ParentQuery, Some(project)) => {
                self.enter_scope(project);
                (
                    kind.path().to_string(),
                    vec![("project_id".to_string(), project.to_string())],
                )
            }
            (ScopeRule::ParentQuery, None) => {
                self.leave_scope();
                return Ok(Vec::new());
            }
        };

        let seq = self.begin();
        let fetch = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = self.generation.load(Ordering::SeqCst);
        debug!(kind = %kind, path = %path, seq, "fetching collection");

        let result = match self.transport.get(&path, &query).await {
            Ok(value) => decode_entities::<E>(value, &fallback),
            Err(err) => Err(StoreError::from_transport(err, &fallback)),
        };

        self.state.send_modify(|state| {
            let latest = self.fetches.load(Ordering::SeqCst) == fetch;
            if latest && self.is_current(generation) {
                match &result {
                    Ok(items) => state.items = items.clone(),
                    Err(err) => {
                        state.items.clear();
                        state.error = Some(err.to_string());
                    }
                }
            } else {
                debug!(kind = %kind, seq, "discarding superseded collection response");
            }
            self.settle(seq, state);
        });

        if let Err(err) = &result {
            warn!(kind = %kind, error = %err, "collection fetch failed");
        }
        result
    }

    /// Fetch a single entity without touching the collection.
    pub async fn fetch_one(&self, id: E::Id) -> Result<E, StoreError> {
        let kind = self.spec.kind;
        if !id.is_valid() {
            return Err(self.reject(format!("A valid {} id is required", kind.noun())));
        }
        let fallback = format!("Failed to fetch {}", kind.noun());

        let seq = self.begin();
        let generation = self.generation.load(Ordering::SeqCst);
        let result = match self.transport.get(&self.item_path(id), &[]).await {
            Ok(Value::Null) => Err(StoreError::not_found(format!(
                "{} {} not found",
                capitalize(kind.noun()),
                id
            ))),
            Ok(value) => decode_entity::<E>(value, &fallback),
            Err(err) => Err(StoreError::from_transport(err, &fallback)),
        };

        self.state.send_modify(|state| {
            if self.is_current(generation) {
                match &result {
                    Ok(item) if self.spec.tracks_selection => state.selection = Some(item.clone()),
                    Ok(_) => {}
                    Err(err) => {
                        if self.spec.tracks_selection {
                            state.selection = None;
                        }
                        state.error = Some(err.to_string());
                    }
                }
            }
            self.settle(seq, state);
        });
        result
    }

    /// Create an entity and append the server's representation.
    pub async fn create<P>(&self, payload: &P) -> Result<E, StoreError>
    where
        P: Serialize + ?Sized,
    {
        let kind = self.spec.kind;
        let body = self.scoped_body(payload, "create")?;
        let fallback = format!("Failed to create {}", kind.noun());

        let seq = self.begin();
        let generation = self.generation.load(Ordering::SeqCst);
        let result = match self
            .transport
            .post(kind.path(), RequestBody::Json(body))
            .await
        {
            Ok(value) => decode_entity::<E>(value, &fallback),
            Err(err) => Err(StoreError::from_transport(err, &fallback)),
        };

        self.state.send_modify(|state| {
            if self.is_current(generation) {
                match &result {
                    Ok(item) => state.upsert(item.clone()),
                    Err(err) => state.error = Some(err.to_string()),
                }
            }
            self.settle(seq, state);
        });

        match &result {
            Ok(item) => debug!(kind = %kind, id = %item.id(), "created"),
            Err(err) => warn!(kind = %kind, error = %err, "create failed"),
        }
        result
    }

    /// Update an entity in place.
    ///
    /// When the id is not cached the cache is left as it was. A selection with
    /// the same id is refreshed.
    pub async fn update<P>(&self, id: E::Id, payload: &P) -> Result<E, StoreError>
    where
        P: Serialize + ?Sized,
    {
        let kind = self.spec.kind;
        if !id.is_valid() {
            return Err(self.reject(format!("A valid {} id is required", kind.noun())));
        }
        let body = self.scoped_body(payload, "update")?;
        let fallback = format!("Failed to update {}", kind.noun());

        let seq = self.begin();
        let generation = self.generation.load(Ordering::SeqCst);
        let result = match self.transport.put(&self.item_path(id), body).await {
            Ok(value) => decode_entity::<E>(value, &fallback),
            Err(err) => Err(StoreError::from_transport(err, &fallback)),
        };

        self.state.send_modify(|state| {
            if self.is_current(generation) {
                match &result {
                    Ok(item) => {
                        if !state.replace(item.clone()) {
                            debug!(kind = %kind, id = %id, "updated entity not cached");
                        }
                        state.refresh_selection(item);
                    }
                    Err(err) => state.error = Some(err.to_string()),
                }
            }
            self.settle(seq, state);
        });

        if let Err(err) = &result {
            warn!(kind = %kind, id = %id, error = %err, "update failed");
        }
        result
    }

    /// Delete an entity. The cache is only touched on success.
    pub async fn delete(&self, id: E::Id) -> Result<(), StoreError> {
        let kind = self.spec.kind;
        if !id.is_valid() {
            return Err(self.reject(format!("A valid {} id is required", kind.noun())));
        }
        let query = match self.spec.scope {
            ScopeRule::ParentQuery => {
                let project = self.require_scope("delete")?;
                vec![("project_id".to_string(), project.to_string())]
            }
            _ => Vec::new(),
        };
        let fallback = format!("Failed to delete {}", kind.noun());

        let seq = self.begin();
        let generation = self.generation.load(Ordering::SeqCst);
        let result = self
            .transport
            .delete(&self.item_path(id), &query)
            .await
            .map(|_| ())
            .map_err(|err| StoreError::from_transport(err, &fallback));

        self.state.send_modify(|state| {
            if self.is_current(generation) {
                match &result {
                    Ok(()) => state.remove(id),
                    Err(err) => state.error = Some(err.to_string()),
                }
            }
            self.settle(seq, state);
        });

        match &result {
            Ok(()) => debug!(kind = %kind, id = %id, "deleted"),
            Err(err) => warn!(kind = %kind, id = %id, error = %err, "delete failed"),
        }
        result
    }

    /// Back to the initial state. Responses still in flight are discarded.
    pub fn reset(&self) {
        self.ops.fetch_add(1, Ordering::SeqCst);
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(StoreState::default());
        debug!(kind = %self.spec.kind, "store reset");
    }

    /// Run a request that shares this store's `loading` and `error` slots.
    pub(crate) async fn track<T, F>(&self, request: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let seq = self.begin();
        let generation = self.generation.load(Ordering::SeqCst);
        let result = request.await;
        self.state.send_modify(|state| {
            if let Err(err) = &result {
                if self.is_current(generation) {
                    state.error = Some(err.to_string());
                }
            }
            self.settle(seq, state);
        });
        result
    }

    /// Read-only list from a related endpoint. The cache is not touched.
    pub(crate) async fn fetch_related<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
        fallback: &str,
    ) -> Result<Vec<T>, StoreError> {
        self.track(async {
            let value = self
                .transport
                .get(path, query)
                .await
                .map_err(|err| StoreError::from_transport(err, fallback))?;
            decode_list(value, fallback)
        })
        .await
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Record a failure that never reached the network.
    pub(crate) fn reject(&self, message: String) -> StoreError {
        let err = StoreError::precondition(message);
        self.state.send_modify(|state| state.error = Some(err.to_string()));
        debug!(kind = %self.spec.kind, error = %err, "rejected before request");
        err
    }

    fn begin(&self) -> u64 {
        let seq = self.ops.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
        seq
    }

    fn settle(&self, seq: u64, state: &mut StoreState<E>) {
        if self.ops.load(Ordering::SeqCst) == seq {
            state.loading = false;
        }
    }

    fn enter_scope(&self, project: ProjectId) {
        self.state.send_modify(|state| {
            if state.scope != Some(project) {
                self.generation.fetch_add(1, Ordering::SeqCst);
                state.items.clear();
                state.selection = None;
                state.scope = Some(project);
            }
        });
    }

    fn leave_scope(&self) {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|state| {
            state.items.clear();
            state.selection = None;
            state.scope = None;
        });
    }

    fn require_scope(&self, action: &str) -> Result<ProjectId, StoreError> {
        match self.scope() {
            Some(project) => Ok(project),
            None => Err(self.reject(format!(
                "A project must be selected to {} a {}",
                action,
                self.spec.kind.noun()
            ))),
        }
    }

    fn scoped_body<P>(&self, payload: &P, action: &str) -> Result<Value, StoreError>
    where
        P: Serialize + ?Sized,
    {
        let project = match self.spec.scope {
            ScopeRule::ParentQuery => Some(self.require_scope(action)?),
            _ => None,
        };
        let mut body = serde_json::to_value(payload).map_err(|e| {
            self.reject(format!("Invalid {} payload: {}", self.spec.kind.noun(), e))
        })?;
        if let Some(project) = project {
            match body.as_object_mut() {
                Some(fields) => {
                    fields.insert("project_id".to_string(), Value::from(project.as_i64()));
                }
                None => {
                    return Err(self.reject(format!(
                        "Invalid {} payload: expected an object",
                        self.spec.kind.noun()
                    )));
                }
            }
        }
        Ok(body)
    }

    fn item_path(&self, id: E::Id) -> String {
        format!("{}/{}", self.spec.kind.path(), id)
    }
}

/// Decode a list response, tolerating a non-list as empty.
pub(crate) fn decode_list<T: DeserializeOwned>(
    value: Value,
    fallback: &str,
) -> Result<Vec<T>, StoreError> {
    let elements = match value {
        Value::Array(elements) => elements,
        other => {
            warn!(found = %json_kind(&other), "expected a list response, using empty list");
            return Ok(Vec::new());
        }
    };
    elements
        .into_iter()
        .map(|element| {
            serde_json::from_value(element)
                .map_err(|e| StoreError::malformed(format!("{}: {}", fallback, e)))
        })
        .collect()
}

/// Decode a list of entities, keeping the first occurrence of each id.
pub(crate) fn decode_entities<E: Resource>(
    value: Value,
    fallback: &str,
) -> Result<Vec<E>, StoreError> {
    let decoded = decode_list::<E>(value, fallback)?;
    let mut items: Vec<E> = Vec::with_capacity(decoded.len());
    for item in decoded {
        if items.iter().any(|existing| existing.id() == item.id()) {
            warn!(kind = %E::KIND, id = %item.id(), "dropping duplicate id in list response");
            continue;
        }
        items.push(item);
    }
    Ok(items)
}

fn decode_entity<E: Resource>(value: Value, fallback: &str) -> Result<E, StoreError> {
    if value.is_null() {
        return Err(StoreError::malformed(format!("{}: empty response", fallback)));
    }
    serde_json::from_value(value).map_err(|e| StoreError::malformed(format!("{}: {}", fallback, e)))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub(crate) fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
