//! The registry: owned entity collections, the global gate and invocation.
//!
//! Each collection sits behind its own lock. Every mutation validates and
//! persists while holding that collection's write lock, so two concurrent
//! writers can never both pass a uniqueness check against a stale read.
//! Invocation clones an entity snapshot and releases the lock before
//! executing.
//!
//! A persistent registry may share its data directory with other processes
//! (the CLI next to a running server). Mutations take an advisory file lock
//! and reload the collection from disk before validating. Reads and the
//! global gate reload whenever the file on disk has changed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::RegistryConfig;
use crate::constants::{PROMPTS_FILE, RESOURCES_FILE, SETTINGS_FILE, TOOLS_FILE};
use crate::context::{InvocationContext, SessionContext};
use crate::error::{RegistryError, RegistryResult};
use crate::executor::{Engine, InvocationOutput, InvokeOptions, render_prompt};
use crate::model::{
    Entity, EntityKind, EntityRecord, Prompt, PromptDraft, PromptPatch, Resource, ResourceDraft,
    ResourcePatch, Tool, ToolDraft, ToolPatch,
};
use crate::status::{Counts, RegistryStatus};
use crate::storage::{FileLock, FileStamp, Settings, Storage};
use crate::suggest::{find_similar, format_suggestions};
use crate::validate::{
    self, ErrorCode, ValidationOutcome, ValidationResult, check_params, normalize_name,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A lifecycle-scoped registry instance.
///
/// Construct one per host (or per test) with [`Registry::open`] or
/// [`Registry::in_memory`]; there is no global state.
pub struct Registry {
    pub(crate) tools: RwLock<Vec<Tool>>,
    pub(crate) prompts: RwLock<Vec<Prompt>>,
    pub(crate) resources: RwLock<Vec<Resource>>,
    enabled: AtomicBool,
    settings_lock: Mutex<()>,
    storage: Option<Storage>,
    stamps: std::sync::Mutex<HashMap<&'static str, Option<FileStamp>>>,
    engine: Engine,
    default_session: SessionContext,
}

/// Entities the registry stores: validation, drafts and their collection.
pub trait Stored: Entity {
    type Draft: DeserializeOwned + Clone + Send + Sync;
    type Patch: DeserializeOwned + Default + Send;

    /// File name of the persisted collection.
    const FILE: &'static str;

    fn collection(registry: &Registry) -> &RwLock<Vec<Self>>;

    /// Run every validator for `draft` against the rest of the collection.
    fn validate(draft: &Self::Draft, existing: &[Self], exclude_id: Option<&str>) -> ValidationResult;

    fn draft_name(draft: &Self::Draft) -> &str;

    /// Secondary unique key, if the kind has one.
    fn draft_uri(_draft: &Self::Draft) -> Option<&str> {
        None
    }

    /// Stored value of the secondary key.
    fn uri(&self) -> Option<&str> {
        None
    }

    fn create_from(draft: Self::Draft) -> Self;
    fn replace_with(&mut self, draft: Self::Draft);
    fn patched(&self, patch: Self::Patch) -> Self::Draft;
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Registry {
    /// Open a persistent registry rooted at `config.data_dir`.
    pub fn open(config: &RegistryConfig) -> RegistryResult<Self> {
        let storage = Storage::new(&config.data_dir);
        let mut stamps = HashMap::new();
        for file in [TOOLS_FILE, PROMPTS_FILE, RESOURCES_FILE, SETTINGS_FILE] {
            stamps.insert(file, storage.stamp(file)?);
        }

        let tools = storage.load_collection(TOOLS_FILE)?;
        let prompts = storage.load_collection(PROMPTS_FILE)?;
        let resources = storage.load_collection(RESOURCES_FILE)?;
        let settings = storage.load_settings()?;

        tracing::debug!(
            data_dir = %config.data_dir.display(),
            tools = tools.len(),
            prompts = prompts.len(),
            resources = resources.len(),
            "opened registry"
        );

        Ok(Self {
            tools: RwLock::new(tools),
            prompts: RwLock::new(prompts),
            resources: RwLock::new(resources),
            enabled: AtomicBool::new(settings.enabled),
            settings_lock: Mutex::new(()),
            storage: Some(storage),
            stamps: std::sync::Mutex::new(stamps),
            engine: Engine::from_config(config),
            default_session: config.default_session(),
        })
    }

    /// A registry that never touches disk.
    pub fn in_memory(config: &RegistryConfig) -> Self {
        Self {
            tools: RwLock::new(Vec::new()),
            prompts: RwLock::new(Vec::new()),
            resources: RwLock::new(Vec::new()),
            enabled: AtomicBool::new(true),
            settings_lock: Mutex::new(()),
            storage: None,
            stamps: std::sync::Mutex::new(HashMap::new()),
            engine: Engine::from_config(config),
            default_session: config.default_session(),
        }
    }

    /// Replace the executor engine.
    pub fn with_engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    //----------------------------------------------------------------------------------------------
    // Typed CRUD
    //----------------------------------------------------------------------------------------------

    /// Validate and insert a new entity.
    pub async fn create<T: Stored>(&self, draft: T::Draft) -> RegistryResult<T> {
        let (mut items, _lock) = self.write_collection::<T>().await?;
        ensure_valid::<T>(T::validate(&draft, &items, None), &draft)?;

        let entity = T::create_from(draft);
        let mut next = items.clone();
        next.push(entity.clone());
        self.commit(&mut items, next)?;

        tracing::debug!(kind = %T::KIND, id = entity.id(), name = entity.name(), "created entity");
        Ok(entity)
    }

    /// Apply a partial update. The result is validated like a create,
    /// except the entity may keep its own name and uri.
    pub async fn update<T: Stored>(&self, id: &str, patch: T::Patch) -> RegistryResult<T> {
        let (mut items, _lock) = self.write_collection::<T>().await?;
        let index = position(items.as_slice(), id).ok_or_else(|| RegistryError::not_found(T::KIND, id))?;

        let draft = items[index].patched(patch);
        ensure_valid::<T>(T::validate(&draft, &items, Some(id)), &draft)?;

        let mut next = items.clone();
        next[index].replace_with(draft);
        let entity = next[index].clone();
        self.commit(&mut items, next)?;

        tracing::debug!(kind = %T::KIND, id, name = entity.name(), "updated entity");
        Ok(entity)
    }

    /// Delete an entity. Irreversible.
    pub async fn delete<T: Stored>(&self, id: &str) -> RegistryResult<()> {
        let (mut items, _lock) = self.write_collection::<T>().await?;
        let index = position(items.as_slice(), id).ok_or_else(|| RegistryError::not_found(T::KIND, id))?;

        let mut next = items.clone();
        let removed = next.remove(index);
        self.commit(&mut items, next)?;

        tracing::debug!(kind = %T::KIND, id, name = removed.name(), "deleted entity");
        Ok(())
    }

    /// Get an entity by id.
    pub async fn get<T: Stored>(&self, id: &str) -> RegistryResult<T> {
        let items = self.read_collection::<T>().await;
        items
            .iter()
            .find(|item| item.id() == id)
            .cloned()
            .ok_or_else(|| RegistryError::not_found(T::KIND, id))
    }

    /// All entities of a kind, in creation order.
    pub async fn list<T: Stored>(&self) -> Vec<T> {
        self.read_collection::<T>().await.clone()
    }

    /// Flip `enabled`. Content is untouched.
    pub async fn toggle<T: Stored>(&self, id: &str) -> RegistryResult<T> {
        let (mut items, _lock) = self.write_collection::<T>().await?;
        let index = position(items.as_slice(), id).ok_or_else(|| RegistryError::not_found(T::KIND, id))?;

        let mut next = items.clone();
        let enabled = !next[index].enabled();
        next[index].set_enabled(enabled);
        next[index].touch();
        let entity = next[index].clone();
        self.commit(&mut items, next)?;

        tracing::debug!(kind = %T::KIND, id, enabled, "toggled entity");
        Ok(entity)
    }

    //----------------------------------------------------------------------------------------------
    // Kind-dispatched operations
    //----------------------------------------------------------------------------------------------

    /// Create from a JSON draft.
    pub async fn create_entity(&self, kind: EntityKind, data: Value) -> RegistryResult<EntityRecord> {
        Ok(match kind {
            EntityKind::Tool => self.create::<Tool>(serde_json::from_value(data)?).await?.into(),
            EntityKind::Prompt => self.create::<Prompt>(serde_json::from_value(data)?).await?.into(),
            EntityKind::Resource => {
                self.create::<Resource>(serde_json::from_value(data)?).await?.into()
            }
        })
    }

    /// Update from a JSON patch.
    pub async fn update_entity(
        &self,
        kind: EntityKind,
        id: &str,
        patch: Value,
    ) -> RegistryResult<EntityRecord> {
        Ok(match kind {
            EntityKind::Tool => self.update::<Tool>(id, serde_json::from_value(patch)?).await?.into(),
            EntityKind::Prompt => {
                self.update::<Prompt>(id, serde_json::from_value(patch)?).await?.into()
            }
            EntityKind::Resource => {
                self.update::<Resource>(id, serde_json::from_value(patch)?).await?.into()
            }
        })
    }

    pub async fn delete_entity(&self, kind: EntityKind, id: &str) -> RegistryResult<()> {
        match kind {
            EntityKind::Tool => self.delete::<Tool>(id).await,
            EntityKind::Prompt => self.delete::<Prompt>(id).await,
            EntityKind::Resource => self.delete::<Resource>(id).await,
        }
    }

    pub async fn get_entity(&self, kind: EntityKind, id: &str) -> RegistryResult<EntityRecord> {
        Ok(match kind {
            EntityKind::Tool => self.get::<Tool>(id).await?.into(),
            EntityKind::Prompt => self.get::<Prompt>(id).await?.into(),
            EntityKind::Resource => self.get::<Resource>(id).await?.into(),
        })
    }

    pub async fn list_entities(&self, kind: EntityKind) -> Vec<EntityRecord> {
        match kind {
            EntityKind::Tool => records(self.list::<Tool>().await),
            EntityKind::Prompt => records(self.list::<Prompt>().await),
            EntityKind::Resource => records(self.list::<Resource>().await),
        }
    }

    pub async fn toggle_entity(&self, kind: EntityKind, id: &str) -> RegistryResult<EntityRecord> {
        Ok(match kind {
            EntityKind::Tool => self.toggle::<Tool>(id).await?.into(),
            EntityKind::Prompt => self.toggle::<Prompt>(id).await?.into(),
            EntityKind::Resource => self.toggle::<Resource>(id).await?.into(),
        })
    }

    /// Find an entity by id, name or (for resources) uri.
    pub async fn find_entity(&self, kind: EntityKind, reference: &str) -> RegistryResult<EntityRecord> {
        Ok(match kind {
            EntityKind::Tool => self.find::<Tool>(reference).await?.into(),
            EntityKind::Prompt => self.find::<Prompt>(reference).await?.into(),
            EntityKind::Resource => self.find::<Resource>(reference).await?.into(),
        })
    }

    //----------------------------------------------------------------------------------------------
    // Global gate & status
    //----------------------------------------------------------------------------------------------

    /// The global gate, re-read from disk if another process changed it.
    pub fn is_enabled(&self) -> bool {
        if let Some(storage) = &self.storage {
            self.reload_gate(storage);
        }
        self.enabled.load(Ordering::SeqCst)
    }

    fn reload_gate(&self, storage: &Storage) {
        let stamp = match storage.stamp(SETTINGS_FILE) {
            Ok(stamp) => stamp,
            Err(e) => {
                tracing::warn!(error = %e, "failed to stat settings");
                return;
            }
        };
        if self.stamp_of(SETTINGS_FILE) == stamp {
            return;
        }

        match storage.load_settings() {
            Ok(settings) => {
                self.enabled.store(settings.enabled, Ordering::SeqCst);
                self.set_stamp(SETTINGS_FILE, stamp);
                tracing::debug!(enabled = settings.enabled, "reloaded registry gate");
            }
            Err(e) => tracing::warn!(error = %e, "failed to reload settings"),
        }
    }

    /// Open the global gate.
    pub async fn enable(&self) -> RegistryResult<RegistryStatus> {
        self.set_enabled(true).await?;
        Ok(self.status().await)
    }

    /// Close the global gate. Every invocation is refused until re-enabled.
    pub async fn disable(&self) -> RegistryResult<RegistryStatus> {
        self.set_enabled(false).await?;
        Ok(self.status().await)
    }

    async fn set_enabled(&self, enabled: bool) -> RegistryResult<()> {
        let _guard = self.settings_lock.lock().await;
        if let Some(storage) = &self.storage {
            let _lock = storage.lock(SETTINGS_FILE).await?;
            storage.save_settings(&Settings { enabled })?;
            self.set_stamp(SETTINGS_FILE, storage.stamp(SETTINGS_FILE)?);
        }
        self.enabled.store(enabled, Ordering::SeqCst);
        tracing::info!(enabled, "registry gate changed");
        Ok(())
    }

    /// Aggregate counts and the gate.
    pub async fn status(&self) -> RegistryStatus {
        let tools = Counts::of(self.read_collection::<Tool>().await.as_slice());
        let prompts = Counts::of(self.read_collection::<Prompt>().await.as_slice());
        let resources = Counts::of(self.read_collection::<Resource>().await.as_slice());
        RegistryStatus::new(self.is_enabled(), tools, prompts, resources)
    }

    //----------------------------------------------------------------------------------------------
    // Validation for live feedback
    //----------------------------------------------------------------------------------------------

    /// Check a name's syntax and uniqueness in `kind`, ignoring `exclude_id`.
    pub async fn validate_name(
        &self,
        name: &str,
        kind: EntityKind,
        exclude_id: Option<&str>,
    ) -> ValidationOutcome {
        let result = match kind {
            EntityKind::Tool => {
                name_result(name, self.read_collection::<Tool>().await.as_slice(), exclude_id)
            }
            EntityKind::Prompt => {
                name_result(name, self.read_collection::<Prompt>().await.as_slice(), exclude_id)
            }
            EntityKind::Resource => {
                name_result(name, self.read_collection::<Resource>().await.as_slice(), exclude_id)
            }
        };
        result.into()
    }

    pub fn validate_schema(&self, schema: &Value) -> ValidationOutcome {
        validate::validate_schema(schema).into()
    }

    pub fn validate_function(&self, code: &str) -> ValidationOutcome {
        validate::validate_function(code).into()
    }

    /// Check a resource uri's syntax and uniqueness, ignoring `exclude_id`.
    pub async fn validate_uri(&self, uri: &str, exclude_id: Option<&str>) -> ValidationOutcome {
        let resources = self.read_collection::<Resource>().await;
        validate::validate_uri(
            uri,
            resources.iter().map(|r| (r.id.as_str(), r.uri.as_str())),
            exclude_id,
        )
        .into()
    }

    //----------------------------------------------------------------------------------------------
    // Invocation
    //----------------------------------------------------------------------------------------------

    /// Invoke an entity by id or name.
    ///
    /// Resources also resolve by uri and always receive empty params. The
    /// entity and the global gate must both be enabled; either one closed
    /// yields [`RegistryError::Disabled`].
    pub async fn invoke(
        &self,
        kind: EntityKind,
        reference: &str,
        params: Value,
        session: Option<SessionContext>,
        options: &InvokeOptions,
    ) -> RegistryResult<InvocationOutput> {
        let context = InvocationContext::new(session.unwrap_or_default().or(&self.default_session));

        match kind {
            EntityKind::Tool => {
                let tool = self.find::<Tool>(reference).await?;
                self.ensure_invocable(&tool)?;

                let params = if params.is_null() {
                    Value::Object(Default::default())
                } else {
                    params
                };
                if let Some(failure) = check_params(&tool.input_schema, &params).first_failure() {
                    return Err(RegistryError::Validation(failure));
                }

                tracing::debug!(
                    tool = %tool.name,
                    executor = tool.executor.kind_name(),
                    request_id = %context.request.request_id,
                    "invoking tool"
                );
                Ok(self
                    .engine
                    .execute(&tool.executor, &params, &context, options)
                    .await?)
            }
            EntityKind::Prompt => {
                let prompt = self.find::<Prompt>(reference).await?;
                self.ensure_invocable(&prompt)?;

                tracing::debug!(prompt = %prompt.name, request_id = %context.request.request_id, "rendering prompt");
                render_prompt(&prompt, &params, &context).map(InvocationOutput::text)
            }
            EntityKind::Resource => {
                let resource = self.find::<Resource>(reference).await?;
                self.ensure_invocable(&resource)?;

                tracing::debug!(
                    resource = %resource.name,
                    uri = %resource.uri,
                    request_id = %context.request.request_id,
                    "reading resource"
                );
                let empty = Value::Object(Default::default());
                let mut output = self
                    .engine
                    .execute(&resource.executor, &empty, &context, options)
                    .await?;
                output.mime_type = Some(resource.mime_type.clone());
                Ok(output)
            }
        }
    }

    fn ensure_invocable<T: Entity>(&self, entity: &T) -> RegistryResult<()> {
        if !entity.enabled() || !self.is_enabled() {
            return Err(RegistryError::Disabled {
                kind: T::KIND,
                name: entity.name().to_string(),
            });
        }
        Ok(())
    }

    /// Snapshot an entity by id, exact name, normalized name or uri.
    pub async fn find<T: Stored>(&self, reference: &str) -> RegistryResult<T> {
        let items = self.read_collection::<T>().await;
        let normalized = normalize_name(reference);

        let found = items
            .iter()
            .find(|item| item.id() == reference || item.name() == reference)
            .or_else(|| items.iter().find(|item| item.name() == normalized))
            .or_else(|| items.iter().find(|item| item.uri() == Some(reference)));

        if let Some(item) = found {
            return Ok(item.clone());
        }

        let suggestions = find_similar(reference, items.iter().map(|item| item.name()));
        Err(RegistryError::NotFound {
            kind: T::KIND,
            reference: reference.to_string(),
            suggestion: format_suggestions(&suggestions),
        })
    }

    //----------------------------------------------------------------------------------------------
    // Persistence
    //----------------------------------------------------------------------------------------------

    /// Persist `next` and swap it in. On a failed write the collection is unchanged.
    pub(crate) fn commit<T: Stored>(
        &self,
        guard: &mut RwLockWriteGuard<'_, Vec<T>>,
        next: Vec<T>,
    ) -> RegistryResult<()> {
        if let Some(storage) = &self.storage {
            storage.save_collection(T::FILE, &next)?;
            self.set_stamp(T::FILE, storage.stamp(T::FILE)?);
        }
        **guard = next;
        Ok(())
    }

    /// Lock a collection for a mutation.
    ///
    /// When persistent, the collection's file lock is held as well and the
    /// collection is reloaded from disk, so validation sees every write that
    /// landed before ours, from any process.
    pub(crate) async fn write_collection<T: Stored>(
        &self,
    ) -> RegistryResult<(RwLockWriteGuard<'_, Vec<T>>, Option<FileLock>)> {
        let mut guard = T::collection(self).write().await;
        let Some(storage) = &self.storage else {
            return Ok((guard, None));
        };

        let lock = storage.lock(T::FILE).await?;
        let stamp = storage.stamp(T::FILE)?;
        if self.stamp_of(T::FILE) != stamp {
            *guard = storage.load_collection(T::FILE)?;
            self.set_stamp(T::FILE, stamp);
            tracing::debug!(kind = %T::KIND, "reloaded collection before write");
        }
        Ok((guard, Some(lock)))
    }

    /// Read a collection, reloading it first if its file changed on disk.
    ///
    /// A failed reload is logged and the last loaded state is served.
    pub(crate) async fn read_collection<T: Stored>(&self) -> RwLockReadGuard<'_, Vec<T>> {
        if let Some(storage) = &self.storage
            && let Err(e) = self.refresh::<T>(storage).await
        {
            tracing::warn!(kind = %T::KIND, error = %e, "failed to reload collection");
        }
        T::collection(self).read().await
    }

    async fn refresh<T: Stored>(&self, storage: &Storage) -> RegistryResult<()> {
        if self.stamp_of(T::FILE) == storage.stamp(T::FILE)? {
            return Ok(());
        }

        let mut guard = T::collection(self).write().await;
        let stamp = storage.stamp(T::FILE)?;
        if self.stamp_of(T::FILE) != stamp {
            *guard = storage.load_collection(T::FILE)?;
            self.set_stamp(T::FILE, stamp);
            tracing::debug!(kind = %T::KIND, "reloaded collection");
        }
        Ok(())
    }

    fn stamp_of(&self, file: &'static str) -> Option<FileStamp> {
        let stamps = self.stamps.lock().unwrap_or_else(|e| e.into_inner());
        stamps.get(file).copied().flatten()
    }

    fn set_stamp(&self, file: &'static str, stamp: Option<FileStamp>) {
        let mut stamps = self.stamps.lock().unwrap_or_else(|e| e.into_inner());
        stamps.insert(file, stamp);
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Stored for Tool {
    type Draft = ToolDraft;
    type Patch = ToolPatch;

    const FILE: &'static str = TOOLS_FILE;

    fn collection(registry: &Registry) -> &RwLock<Vec<Self>> {
        &registry.tools
    }

    fn validate(draft: &ToolDraft, existing: &[Self], exclude_id: Option<&str>) -> ValidationResult {
        let mut result = name_result(&draft.name, existing, exclude_id);
        result.merge(validate::validate_schema(&draft.input_schema));
        result.merge(validate::validate_executor(&draft.executor));
        result
    }

    fn draft_name(draft: &ToolDraft) -> &str {
        &draft.name
    }

    fn create_from(draft: ToolDraft) -> Self {
        Tool::from_draft(draft)
    }

    fn replace_with(&mut self, draft: ToolDraft) {
        Tool::replace_with(self, draft)
    }

    fn patched(&self, patch: ToolPatch) -> ToolDraft {
        Tool::patched(self, patch)
    }
}

impl Stored for Prompt {
    type Draft = PromptDraft;
    type Patch = PromptPatch;

    const FILE: &'static str = PROMPTS_FILE;

    fn collection(registry: &Registry) -> &RwLock<Vec<Self>> {
        &registry.prompts
    }

    fn validate(draft: &PromptDraft, existing: &[Self], exclude_id: Option<&str>) -> ValidationResult {
        let mut result = name_result(&draft.name, existing, exclude_id);
        result.merge(validate::validate_prompt(&draft.template, &draft.arguments));
        result
    }

    fn draft_name(draft: &PromptDraft) -> &str {
        &draft.name
    }

    fn create_from(draft: PromptDraft) -> Self {
        Prompt::from_draft(draft)
    }

    fn replace_with(&mut self, draft: PromptDraft) {
        Prompt::replace_with(self, draft)
    }

    fn patched(&self, patch: PromptPatch) -> PromptDraft {
        Prompt::patched(self, patch)
    }
}

impl Stored for Resource {
    type Draft = ResourceDraft;
    type Patch = ResourcePatch;

    const FILE: &'static str = RESOURCES_FILE;

    fn collection(registry: &Registry) -> &RwLock<Vec<Self>> {
        &registry.resources
    }

    fn validate(
        draft: &ResourceDraft,
        existing: &[Self],
        exclude_id: Option<&str>,
    ) -> ValidationResult {
        let mut result = name_result(&draft.name, existing, exclude_id);
        result.merge(validate::validate_uri(
            &draft.uri,
            existing.iter().map(|r| (r.id.as_str(), r.uri.as_str())),
            exclude_id,
        ));
        result.merge(validate::validate_executor(&draft.executor));
        result
    }

    fn draft_name(draft: &ResourceDraft) -> &str {
        &draft.name
    }

    fn draft_uri(draft: &ResourceDraft) -> Option<&str> {
        Some(&draft.uri)
    }

    fn uri(&self) -> Option<&str> {
        Some(&self.uri)
    }

    fn create_from(draft: ResourceDraft) -> Self {
        Resource::from_draft(draft)
    }

    fn replace_with(&mut self, draft: ResourceDraft) {
        Resource::replace_with(self, draft)
    }

    fn patched(&self, patch: ResourcePatch) -> ResourceDraft {
        Resource::patched(self, patch)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("enabled", &self.is_enabled())
            .field("persistent", &self.storage.is_some())
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Turn the first validation error into a registry error.
///
/// Duplicate names and uris surface as [`RegistryError::Conflict`].
pub(crate) fn ensure_valid<T: Stored>(result: ValidationResult, draft: &T::Draft) -> RegistryResult<()> {
    let Some(failure) = result.first_failure() else {
        return Ok(());
    };

    if failure.code.is_conflict() {
        let (field, value) = match failure.code {
            ErrorCode::DuplicateUri => ("uri", T::draft_uri(draft).unwrap_or_default()),
            _ => ("name", T::draft_name(draft)),
        };
        return Err(RegistryError::Conflict {
            kind: T::KIND,
            field,
            value: value.to_string(),
        });
    }

    Err(RegistryError::Validation(failure))
}

fn name_result<T: Entity>(name: &str, existing: &[T], exclude_id: Option<&str>) -> ValidationResult {
    validate::validate_name(
        name,
        existing.iter().map(|item| (item.id(), item.name())),
        exclude_id,
    )
}

fn position<T: Entity>(items: &[T], id: &str) -> Option<usize> {
    items.iter().position(|item| item.id() == id)
}

fn records<T: Into<EntityRecord>>(items: Vec<T>) -> Vec<EntityRecord> {
    items.into_iter().map(Into::into).collect()
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecutionReason;
    use crate::model::{ContentType, Executor, FunctionExecutor, PromptArgument, StaticExecutor};
    use serde_json::json;
    use std::sync::Arc;

    fn registry() -> Registry {
        Registry::in_memory(&RegistryConfig::default())
    }

    fn static_tool(name: &str, content: &str) -> ToolDraft {
        serde_json::from_value(json!({
            "name": name,
            "description": "test tool",
            "executor": { "type": "static", "content": content }
        }))
        .unwrap()
    }

    fn resource(name: &str, uri: &str) -> ResourceDraft {
        serde_json::from_value(json!({
            "name": name,
            "uri": uri,
            "mimeType": "application/json",
            "executor": { "type": "static", "content": "{\"ok\":true}", "contentType": "json" }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let registry = registry();
        let tool = registry.create::<Tool>(static_tool("weather", "sunny")).await.unwrap();

        let fetched = registry.get::<Tool>(&tool.id).await.unwrap();
        assert_eq!(fetched, tool);
        assert_eq!(registry.list::<Tool>().await.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts() {
        let registry = registry();
        let first = registry.create::<Tool>(static_tool("weather", "a")).await.unwrap();

        let err = registry.create::<Tool>(static_tool("weather", "b")).await.unwrap_err();
        assert!(matches!(err, RegistryError::Conflict { field: "name", .. }));
        assert_eq!(registry.list::<Tool>().await.len(), 1);

        let updated = registry
            .update::<Tool>(
                &first.id,
                ToolPatch {
                    name: Some("weather".into()),
                    description: Some("same name".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "weather");
        assert_eq!(updated.description, "same name");
        assert_eq!(updated.id, first.id);
    }

    #[tokio::test]
    async fn test_names_scoped_per_collection() {
        let registry = registry();
        registry.create::<Tool>(static_tool("shared", "x")).await.unwrap();
        let prompt: PromptDraft =
            serde_json::from_value(json!({"name": "shared", "template": "hi"})).unwrap();
        assert!(registry.create::<Prompt>(prompt).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_create_is_not_persisted() {
        let registry = registry();
        let err = registry.create::<Tool>(static_tool("Bad Name", "x")).await.unwrap_err();
        match err {
            RegistryError::Validation(failure) => {
                assert_eq!(failure.code, ErrorCode::InvalidNameCharacters);
                assert_eq!(failure.field, "name");
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        let mut draft = static_tool("schema_bad", "x");
        draft.input_schema = json!({"type": "array"});
        assert!(matches!(
            registry.create::<Tool>(draft).await,
            Err(RegistryError::Validation(_))
        ));

        let mut draft = static_tool("fn_bad", "x");
        draft.executor = Executor::Function(FunctionExecutor { code: "(p) => {".into() });
        assert!(matches!(
            registry.create::<Tool>(draft).await,
            Err(RegistryError::Validation(_))
        ));

        assert!(registry.list::<Tool>().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_update_leaves_entity_untouched() {
        let registry = registry();
        let tool = registry.create::<Tool>(static_tool("weather", "a")).await.unwrap();

        let err = registry
            .update::<Tool>(
                &tool.id,
                ToolPatch {
                    description: Some("changed".into()),
                    input_schema: Some(json!({"type": "object", "required": ["missing"]})),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
        assert_eq!(registry.get::<Tool>(&tool.id).await.unwrap(), tool);
    }

    #[tokio::test]
    async fn test_missing_id_is_not_found() {
        let registry = registry();
        assert!(matches!(
            registry.get::<Tool>("nope").await,
            Err(RegistryError::NotFound { .. })
        ));
        assert!(matches!(
            registry.delete::<Prompt>("nope").await,
            Err(RegistryError::NotFound { .. })
        ));
        assert!(matches!(
            registry.toggle::<Resource>("nope").await,
            Err(RegistryError::NotFound { .. })
        ));
        assert!(matches!(
            registry.update::<Tool>("nope", ToolPatch::default()).await,
            Err(RegistryError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_toggle_twice_restores() {
        let registry = registry();
        let tool = registry.create::<Tool>(static_tool("weather", "a")).await.unwrap();

        let once = registry.toggle::<Tool>(&tool.id).await.unwrap();
        assert_eq!(once.enabled, !tool.enabled);
        let twice = registry.toggle::<Tool>(&tool.id).await.unwrap();
        assert_eq!(twice.enabled, tool.enabled);
        assert_eq!(twice.executor, tool.executor);
    }

    #[tokio::test]
    async fn test_delete() {
        let registry = registry();
        let tool = registry.create::<Tool>(static_tool("weather", "a")).await.unwrap();
        registry.delete::<Tool>(&tool.id).await.unwrap();
        assert!(registry.list::<Tool>().await.is_empty());
        assert!(registry.get::<Tool>(&tool.id).await.is_err());
    }

    #[tokio::test]
    async fn test_resource_uri_unique() {
        let registry = registry();
        let first = registry.create::<Resource>(resource("notes", "custom://notes")).await.unwrap();

        let err = registry
            .create::<Resource>(resource("other", "custom://notes"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Conflict { field: "uri", .. }));

        let err = registry
            .create::<Resource>(resource("bad_uri", "notes"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));

        assert!(registry.validate_uri("custom://notes", Some(&first.id)).await.valid);
        assert!(!registry.validate_uri("custom://notes", None).await.valid);
    }

    #[tokio::test]
    async fn test_validate_name_outcome() {
        let registry = registry();
        let tool = registry.create::<Tool>(static_tool("weather", "a")).await.unwrap();

        assert!(registry.validate_name("forecast", EntityKind::Tool, None).await.valid);
        assert!(!registry.validate_name("weather", EntityKind::Tool, None).await.valid);
        assert!(registry.validate_name("weather", EntityKind::Tool, Some(&tool.id)).await.valid);
        assert!(registry.validate_name("weather", EntityKind::Prompt, None).await.valid);

        let outcome = registry.validate_name("Weather!", EntityKind::Tool, None).await;
        assert!(!outcome.valid);
        assert!(outcome.error.is_some());
    }

    #[tokio::test]
    async fn test_status_counts() {
        let registry = registry();
        let a = registry.create::<Tool>(static_tool("a", "a")).await.unwrap();
        registry.create::<Tool>(static_tool("b", "b")).await.unwrap();
        registry.toggle::<Tool>(&a.id).await.unwrap();
        registry.create::<Resource>(resource("r", "custom://r")).await.unwrap();

        let status = registry.status().await;
        assert!(status.enabled);
        assert_eq!(status.tools_count, 2);
        assert_eq!(status.enabled_tools_count, 1);
        assert_eq!(status.prompts_count, 0);
        assert_eq!(status.resources_count, 1);
        assert_eq!(status.enabled_resources_count, 1);

        let status = registry.disable().await.unwrap();
        assert!(!status.enabled);
    }

    #[tokio::test]
    async fn test_invoke_static_by_name() {
        let registry = registry();
        registry.create::<Tool>(static_tool("greeting", "hello")).await.unwrap();

        let output = registry
            .invoke(
                EntityKind::Tool,
                "greeting",
                json!({"ignored": true}),
                None,
                &InvokeOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(output.content, json!("hello"));
        assert_eq!(output.content_type, ContentType::Text);
    }

    #[tokio::test]
    async fn test_invoke_global_disable_wins_over_execution() {
        let registry = registry();
        let mut draft = static_tool("boom", "x");
        draft.executor = Executor::Function(FunctionExecutor {
            code: "() => { throw new Error('should not run'); }".into(),
        });
        registry.create::<Tool>(draft).await.unwrap();
        registry.disable().await.unwrap();

        let err = registry
            .invoke(EntityKind::Tool, "boom", json!({}), None, &InvokeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Disabled { kind: EntityKind::Tool, .. }));

        registry.enable().await.unwrap();
        let err = registry
            .invoke(EntityKind::Tool, "boom", json!({}), None, &InvokeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Execution(ref e) if e.reason == ExecutionReason::Runtime
        ));
    }

    #[tokio::test]
    async fn test_invoke_disabled_entity() {
        let registry = registry();
        let tool = registry.create::<Tool>(static_tool("greeting", "hello")).await.unwrap();
        registry.toggle::<Tool>(&tool.id).await.unwrap();
        registry.disable().await.unwrap();

        let err = registry
            .invoke(EntityKind::Tool, &tool.id, json!({}), None, &InvokeOptions::default())
            .await
            .unwrap_err();
        match err {
            RegistryError::Disabled { kind, name } => {
                assert_eq!(kind, EntityKind::Tool);
                assert_eq!(name, "greeting");
            }
            other => panic!("expected disabled, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invoke_checks_params() {
        let registry = registry();
        let mut draft = static_tool("weather", "x");
        draft.input_schema = json!({
            "type": "object",
            "properties": { "city": { "type": "string" } },
            "required": ["city"]
        });
        registry.create::<Tool>(draft).await.unwrap();

        let err = registry
            .invoke(EntityKind::Tool, "weather", json!({}), None, &InvokeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Validation(ref f) if f.code == ErrorCode::InvalidParams));

        let err = registry
            .invoke(EntityKind::Tool, "weather", json!({"city": 5}), None, &InvokeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));

        assert!(
            registry
                .invoke(EntityKind::Tool, "weather", json!({"city": "nyc"}), None, &InvokeOptions::default())
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_invoke_not_found_suggests() {
        let registry = registry();
        registry.create::<Tool>(static_tool("weather", "x")).await.unwrap();

        let err = registry
            .invoke(EntityKind::Tool, "wether", json!({}), None, &InvokeOptions::default())
            .await
            .unwrap_err();
        match err {
            RegistryError::NotFound { suggestion, .. } => {
                assert_eq!(suggestion.as_deref(), Some("Did you mean `weather`?"));
            }
            other => panic!("expected not found, got {other:?}"),
        }

        let output = registry
            .invoke(EntityKind::Tool, "Weather", json!({}), None, &InvokeOptions::default())
            .await
            .unwrap();
        assert_eq!(output.content, json!("x"));
    }

    #[tokio::test]
    async fn test_invoke_prompt() {
        let registry = registry();
        registry
            .create::<Prompt>(PromptDraft {
                name: "greet".into(),
                description: String::new(),
                enabled: true,
                template: "Hello {{who}} from {{SESSION.workspaceId}}".into(),
                arguments: vec![PromptArgument {
                    name: "who".into(),
                    description: String::new(),
                    required: true,
                }],
            })
            .await
            .unwrap();

        let session = SessionContext {
            workspace_id: Some("ws1".into()),
            ..Default::default()
        };
        let output = registry
            .invoke(
                EntityKind::Prompt,
                "greet",
                json!({"who": "ada"}),
                Some(session),
                &InvokeOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(output.content, json!("Hello ada from ws1"));

        let err = registry
            .invoke(EntityKind::Prompt, "greet", json!({}), None, &InvokeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Validation(ref f) if f.code == ErrorCode::MissingArgument));
    }

    #[tokio::test]
    async fn test_invoke_resource_by_uri() {
        let registry = registry();
        registry.create::<Resource>(resource("status", "custom://status")).await.unwrap();

        let output = registry
            .invoke(
                EntityKind::Resource,
                "custom://status",
                json!({"ignored": 1}),
                None,
                &InvokeOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(output.content, json!("{\"ok\":true}"));
        assert_eq!(output.content_type, ContentType::Json);
        assert_eq!(output.mime_type.as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_resource_function_gets_empty_params() {
        let registry = registry();
        let mut draft = resource("keys", "custom://keys");
        draft.executor = Executor::Function(FunctionExecutor {
            code: "(params) => Object.keys(params).length".into(),
        });
        registry.create::<Resource>(draft).await.unwrap();

        let output = registry
            .invoke(
                EntityKind::Resource,
                "keys",
                json!({"a": 1, "b": 2}),
                None,
                &InvokeOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(output.content, json!(0));
    }

    #[tokio::test]
    async fn test_concurrent_creates_same_name() {
        let registry = Arc::new(registry());
        let mut handles = Vec::new();
        for i in 0..16 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry
                    .create::<Tool>(static_tool("racer", &i.to_string()))
                    .await
            }));
        }

        let mut created = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(RegistryError::Conflict { .. }) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(created, 1);
        assert_eq!(conflicts, 15);
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = RegistryConfig::with_data_dir(dir.path());

        let id = {
            let registry = Registry::open(&config).unwrap();
            let tool = registry.create::<Tool>(static_tool("weather", "sunny")).await.unwrap();
            registry
                .create::<Prompt>(
                    serde_json::from_value(json!({"name": "p", "template": "t"})).unwrap(),
                )
                .await
                .unwrap();
            registry.disable().await.unwrap();
            tool.id
        };

        let registry = Registry::open(&config).unwrap();
        assert!(!registry.is_enabled());
        let tool = registry.get::<Tool>(&id).await.unwrap();
        assert_eq!(tool.name, "weather");
        assert_eq!(
            tool.executor,
            Executor::Static(StaticExecutor {
                content: "sunny".into(),
                content_type: ContentType::Text,
                editor_mode: None,
            })
        );
        assert_eq!(registry.list::<Prompt>().await.len(), 1);
    }

    #[tokio::test]
    async fn test_disable_from_another_instance_is_seen() {
        let dir = tempfile::tempdir().unwrap();
        let config = RegistryConfig::with_data_dir(dir.path());

        let server = Registry::open(&config).unwrap();
        server.create::<Tool>(static_tool("t", "hi")).await.unwrap();
        let output = server
            .invoke(EntityKind::Tool, "t", json!({}), None, &InvokeOptions::default())
            .await
            .unwrap();
        assert_eq!(output.content, json!("hi"));

        let cli = Registry::open(&config).unwrap();
        cli.disable().await.unwrap();

        let err = server
            .invoke(EntityKind::Tool, "t", json!({}), None, &InvokeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Disabled { .. }));
        assert!(!server.status().await.enabled);

        cli.enable().await.unwrap();
        assert!(server.is_enabled());
    }

    #[tokio::test]
    async fn test_instances_sharing_a_directory_keep_names_unique() {
        let dir = tempfile::tempdir().unwrap();
        let config = RegistryConfig::with_data_dir(dir.path());

        let first = Registry::open(&config).unwrap();
        let second = Registry::open(&config).unwrap();

        first.create::<Tool>(static_tool("weather", "a")).await.unwrap();
        let err = second
            .create::<Tool>(static_tool("weather", "b"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Conflict { field: "name", .. }));

        // No lost update: both instances' writes survive.
        second.create::<Tool>(static_tool("search", "c")).await.unwrap();
        let names: Vec<_> = first
            .list::<Tool>()
            .await
            .into_iter()
            .map(|tool| tool.name)
            .collect();
        assert_eq!(names, vec!["weather", "search"]);

        let reopened = Registry::open(&config).unwrap();
        assert_eq!(reopened.list::<Tool>().await.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_creates_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let config = RegistryConfig::with_data_dir(dir.path());
        let a = std::sync::Arc::new(Registry::open(&config).unwrap());
        let b = std::sync::Arc::new(Registry::open(&config).unwrap());

        let mut handles = Vec::new();
        for i in 0..8 {
            let registry = if i % 2 == 0 { a.clone() } else { b.clone() };
            handles.push(tokio::spawn(async move {
                registry.create::<Tool>(static_tool("same", "x")).await
            }));
        }

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(Registry::open(&config).unwrap().list::<Tool>().await.len(), 1);
    }

    #[tokio::test]
    async fn test_kind_dispatched_json_operations() {
        let registry = registry();
        let record = registry
            .create_entity(
                EntityKind::Resource,
                json!({
                    "name": "doc",
                    "uri": "custom://doc",
                    "executor": { "type": "static", "content": "text" }
                }),
            )
            .await
            .unwrap();
        assert_eq!(record.kind(), EntityKind::Resource);

        let updated = registry
            .update_entity(EntityKind::Resource, record.id(), json!({"description": "d"}))
            .await
            .unwrap();
        assert_eq!(updated.description(), "d");

        let toggled = registry.toggle_entity(EntityKind::Resource, record.id()).await.unwrap();
        assert!(!toggled.enabled());

        assert_eq!(registry.list_entities(EntityKind::Resource).await.len(), 1);
        registry.delete_entity(EntityKind::Resource, record.id()).await.unwrap();
        assert!(registry.list_entities(EntityKind::Resource).await.is_empty());
    }
}
