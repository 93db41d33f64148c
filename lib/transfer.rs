//! Bulk export and import of registry entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::EXPORT_VERSION;
use crate::error::{RegistryError, RegistryResult};
use crate::model::{EntityKind, Prompt, Resource, Tool};
use crate::store::{Registry, Stored, ensure_valid};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Which entities of one collection to export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    /// Leave the collection out of the document.
    #[default]
    None,
    /// Every entity of the collection.
    All,
    /// Only these ids. Unknown ids are ignored.
    Ids(Vec<String>),
}

/// Per-collection export selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSelection {
    #[serde(default)]
    pub tools: Selection,
    #[serde(default)]
    pub prompts: Selection,
    #[serde(default)]
    pub resources: Selection,
}

/// Portable document of full entity records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts: Option<Vec<Prompt>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<Resource>>,
}

/// What to do when an incoming entity collides with an existing one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictStrategy {
    /// Overwrite the existing entity, keeping its id.
    Replace,
    /// Leave the existing entity untouched.
    #[default]
    Skip,
}

/// Import options. Collections are toggled independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOptions {
    #[serde(default)]
    pub conflict_strategy: ConflictStrategy,
    #[serde(default = "default_true")]
    pub import_tools: bool,
    #[serde(default = "default_true")]
    pub import_prompts: bool,
    #[serde(default = "default_true")]
    pub import_resources: bool,
}

/// Outcome of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: ImportedCounts,
    pub skipped: SkippedNames,
    pub errors: Vec<ImportItemError>,
}

/// Number of entities created or replaced, per collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportedCounts {
    pub tools: usize,
    pub prompts: usize,
    pub resources: usize,
}

/// Names left untouched under [`ConflictStrategy::Skip`], per collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SkippedNames {
    pub tools: Vec<String>,
    pub prompts: Vec<String>,
    pub resources: Vec<String>,
}

/// An entity that could not be imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportItemError {
    pub name: String,
    pub kind: EntityKind,
    pub reason: String,
}

enum Outcome {
    Imported,
    Skipped,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ExportSelection {
    /// Select every entity of every collection.
    pub fn all() -> Self {
        Self {
            tools: Selection::All,
            prompts: Selection::All,
            resources: Selection::All,
        }
    }
}

impl ImportReport {
    /// Total entities created or replaced.
    pub fn imported_total(&self) -> usize {
        self.imported.tools + self.imported.prompts + self.imported.resources
    }

    /// Total entities skipped.
    pub fn skipped_total(&self) -> usize {
        self.skipped.tools.len() + self.skipped.prompts.len() + self.skipped.resources.len()
    }

    fn count(&mut self, kind: EntityKind) -> &mut usize {
        match kind {
            EntityKind::Tool => &mut self.imported.tools,
            EntityKind::Prompt => &mut self.imported.prompts,
            EntityKind::Resource => &mut self.imported.resources,
        }
    }

    fn skipped_names(&mut self, kind: EntityKind) -> &mut Vec<String> {
        match kind {
            EntityKind::Tool => &mut self.skipped.tools,
            EntityKind::Prompt => &mut self.skipped.prompts,
            EntityKind::Resource => &mut self.skipped.resources,
        }
    }
}

impl Registry {
    /// Export the selected entities. Unrequested collections are omitted.
    pub async fn export(&self, selection: &ExportSelection) -> ExportDocument {
        let document = ExportDocument {
            version: EXPORT_VERSION,
            exported_at: Utc::now(),
            tools: self.select::<Tool>(&selection.tools).await,
            prompts: self.select::<Prompt>(&selection.prompts).await,
            resources: self.select::<Resource>(&selection.resources).await,
        };

        tracing::info!(
            tools = document.tools.as_ref().map_or(0, Vec::len),
            prompts = document.prompts.as_ref().map_or(0, Vec::len),
            resources = document.resources.as_ref().map_or(0, Vec::len),
            "exported registry entities"
        );
        document
    }

    async fn select<T: Stored>(&self, selection: &Selection) -> Option<Vec<T>> {
        match selection {
            Selection::None => None,
            Selection::All => Some(self.read_collection::<T>().await.clone()),
            Selection::Ids(ids) => Some(
                self.read_collection::<T>()
                    .await
                    .iter()
                    .filter(|item| ids.iter().any(|id| id == item.id()))
                    .cloned()
                    .collect(),
            ),
        }
    }

    /// Import a document.
    ///
    /// Items are reconciled one at a time by name (and uri for resources).
    /// A failing item is reported and the rest continue. Each collection is
    /// processed inside its own write lock; there is no atomicity across
    /// collections.
    pub async fn import(
        &self,
        document: &Value,
        options: &ImportOptions,
    ) -> RegistryResult<ImportReport> {
        let version = document
            .get("version")
            .and_then(Value::as_u64)
            .ok_or_else(|| RegistryError::Generic("Not an export document: missing `version`".into()))?;
        if version == 0 || version > u64::from(EXPORT_VERSION) {
            return Err(RegistryError::UnsupportedVersion(
                u32::try_from(version).unwrap_or(u32::MAX),
            ));
        }

        let mut report = ImportReport::default();
        if options.import_tools {
            self.import_collection::<Tool>(document, options.conflict_strategy, &mut report)
                .await?;
        }
        if options.import_prompts {
            self.import_collection::<Prompt>(document, options.conflict_strategy, &mut report)
                .await?;
        }
        if options.import_resources {
            self.import_collection::<Resource>(document, options.conflict_strategy, &mut report)
                .await?;
        }

        tracing::info!(
            imported = report.imported_total(),
            skipped = report.skipped_total(),
            errors = report.errors.len(),
            strategy = ?options.conflict_strategy,
            "import finished"
        );
        Ok(report)
    }

    /// Import a typed document.
    pub async fn import_document(
        &self,
        document: &ExportDocument,
        options: &ImportOptions,
    ) -> RegistryResult<ImportReport> {
        self.import(&serde_json::to_value(document)?, options).await
    }

    async fn import_collection<T: Stored>(
        &self,
        document: &Value,
        strategy: ConflictStrategy,
        report: &mut ImportReport,
    ) -> RegistryResult<()> {
        let items = match document.get(T::KIND.plural()) {
            None | Some(Value::Null) => return Ok(()),
            Some(Value::Array(items)) => items,
            Some(_) => {
                report.errors.push(ImportItemError {
                    name: T::KIND.plural().to_string(),
                    kind: T::KIND,
                    reason: format!("`{}` must be an array", T::KIND.plural()),
                });
                return Ok(());
            }
        };

        let (mut guard, _lock) = self.write_collection::<T>().await?;
        let mut next = guard.clone();
        let mut changed = false;

        for item in items {
            let name = item
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("<unnamed>")
                .to_string();

            match reconcile::<T>(&mut next, item, strategy) {
                Ok(Outcome::Imported) => {
                    *report.count(T::KIND) += 1;
                    changed = true;
                }
                Ok(Outcome::Skipped) => report.skipped_names(T::KIND).push(name),
                Err(e) => {
                    tracing::warn!(kind = %T::KIND, name = %name, error = %e, "import item rejected");
                    report.errors.push(ImportItemError {
                        name,
                        kind: T::KIND,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if changed {
            self.commit(&mut guard, next)?;
        }
        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Apply one incoming item to the working copy of a collection.
fn reconcile<T: Stored>(
    items: &mut Vec<T>,
    item: &Value,
    strategy: ConflictStrategy,
) -> RegistryResult<Outcome> {
    let draft: T::Draft = serde_json::from_value(item.clone())?;
    let name = T::draft_name(&draft);
    let uri = T::draft_uri(&draft);

    let existing = items
        .iter()
        .position(|e| e.name() == name)
        .or_else(|| uri.and_then(|uri| items.iter().position(|e| e.uri() == Some(uri))));

    match (existing, strategy) {
        (None, _) => {
            ensure_valid::<T>(T::validate(&draft, items, None), &draft)?;
            items.push(T::create_from(draft));
            Ok(Outcome::Imported)
        }
        (Some(_), ConflictStrategy::Skip) => Ok(Outcome::Skipped),
        (Some(index), ConflictStrategy::Replace) => {
            let id = items[index].id().to_string();
            ensure_valid::<T>(T::validate(&draft, items, Some(&id)), &draft)?;
            items[index].replace_with(draft);
            Ok(Outcome::Imported)
        }
    }
}

fn default_true() -> bool {
    true
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            conflict_strategy: ConflictStrategy::Skip,
            import_tools: true,
            import_prompts: true,
            import_resources: true,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use crate::model::{PromptDraft, ResourceDraft, ToolDraft};
    use serde_json::json;

    fn registry() -> Registry {
        Registry::in_memory(&RegistryConfig::default())
    }

    async fn seeded() -> Registry {
        let registry = registry();
        registry
            .create::<Tool>(
                serde_json::from_value::<ToolDraft>(json!({
                    "name": "weather",
                    "executor": { "type": "http", "url": "https://api.example.com/{{city}}" }
                }))
                .unwrap(),
            )
            .await
            .unwrap();
        registry
            .create::<Tool>(
                serde_json::from_value::<ToolDraft>(json!({
                    "name": "echo",
                    "enabled": false,
                    "executor": { "type": "function", "code": "(params) => params" }
                }))
                .unwrap(),
            )
            .await
            .unwrap();
        registry
            .create::<Prompt>(
                serde_json::from_value::<PromptDraft>(json!({
                    "name": "summarize",
                    "template": "Summarize {{text}}",
                    "arguments": [{ "name": "text", "required": true }]
                }))
                .unwrap(),
            )
            .await
            .unwrap();
        registry
            .create::<Resource>(
                serde_json::from_value::<ResourceDraft>(json!({
                    "name": "readme",
                    "uri": "docs://readme",
                    "executor": { "type": "static", "content": "# Readme" }
                }))
                .unwrap(),
            )
            .await
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn test_export_selection() {
        let registry = seeded().await;
        let tools = registry.list::<Tool>().await;

        let document = registry
            .export(&ExportSelection {
                tools: Selection::Ids(vec![tools[1].id.clone(), "missing".into()]),
                prompts: Selection::All,
                resources: Selection::None,
            })
            .await;

        assert_eq!(document.version, EXPORT_VERSION);
        assert_eq!(document.tools.as_ref().unwrap().len(), 1);
        assert_eq!(document.tools.as_ref().unwrap()[0].name, "echo");
        assert_eq!(document.prompts.as_ref().unwrap().len(), 1);
        assert!(document.resources.is_none());

        let json = serde_json::to_value(&document).unwrap();
        assert!(json.get("exportedAt").is_some());
        assert!(json.get("resources").is_none());
    }

    #[tokio::test]
    async fn test_import_into_empty_registry() {
        let source = seeded().await;
        let document = source.export(&ExportSelection::all()).await;

        let target = registry();
        let report = target
            .import_document(&document, &ImportOptions::default())
            .await
            .unwrap();

        assert_eq!(report.imported, ImportedCounts { tools: 2, prompts: 1, resources: 1 });
        assert!(report.errors.is_empty());

        let echo = target.find::<Tool>("echo").await.unwrap();
        assert!(!echo.enabled);
        let original = source.find::<Tool>("echo").await.unwrap();
        assert_ne!(echo.id, original.id);
        assert_eq!(echo.executor, original.executor);
    }

    #[tokio::test]
    async fn test_skip_import_is_idempotent() {
        let registry = seeded().await;
        let document = registry.export(&ExportSelection::all()).await;
        let before = registry.status().await;

        let report = registry
            .import_document(&document, &ImportOptions::default())
            .await
            .unwrap();

        assert_eq!(report.imported_total(), 0);
        assert_eq!(report.skipped_total(), 4);
        assert_eq!(report.skipped.tools, vec!["weather", "echo"]);
        assert!(report.errors.is_empty());
        assert_eq!(registry.status().await, before);

        let again = registry
            .import_document(&document, &ImportOptions::default())
            .await
            .unwrap();
        assert_eq!(again, report);
    }

    #[tokio::test]
    async fn test_replace_with_one_invalid_item() {
        let registry = seeded().await;
        let weather = registry.find::<Tool>("weather").await.unwrap();

        let document = json!({
            "version": 1,
            "exportedAt": "2024-05-01T00:00:00Z",
            "tools": [
                {
                    "name": "weather",
                    "description": "replaced",
                    "executor": { "type": "static", "content": "sunny" }
                },
                {
                    "name": "Bad Name",
                    "executor": { "type": "static", "content": "x" }
                }
            ]
        });
        let options = ImportOptions {
            conflict_strategy: ConflictStrategy::Replace,
            ..Default::default()
        };

        let report = registry.import(&document, &options).await.unwrap();
        assert_eq!(report.imported.tools, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].name, "Bad Name");
        assert_eq!(report.errors[0].kind, EntityKind::Tool);

        let replaced = registry.find::<Tool>("weather").await.unwrap();
        assert_eq!(replaced.id, weather.id);
        assert_eq!(replaced.created_at, weather.created_at);
        assert_eq!(replaced.description, "replaced");
        assert_eq!(registry.list::<Tool>().await.len(), 2);
    }

    #[tokio::test]
    async fn test_resource_conflicts_on_uri() {
        let registry = seeded().await;
        let document = json!({
            "version": 1,
            "resources": [
                {
                    "name": "readme_copy",
                    "uri": "docs://readme",
                    "executor": { "type": "static", "content": "copy" }
                }
            ]
        });

        let report = registry.import(&document, &ImportOptions::default()).await.unwrap();
        assert_eq!(report.skipped.resources, vec!["readme_copy"]);

        let options = ImportOptions {
            conflict_strategy: ConflictStrategy::Replace,
            ..Default::default()
        };
        let report = registry.import(&document, &options).await.unwrap();
        assert_eq!(report.imported.resources, 1);

        let resources = registry.list::<Resource>().await;
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].name, "readme_copy");
    }

    #[tokio::test]
    async fn test_malformed_item_does_not_abort() {
        let registry = registry();
        let document = json!({
            "version": 1,
            "tools": [
                { "name": "no_executor" },
                { "name": "ok", "executor": { "type": "static", "content": "x" } }
            ],
            "prompts": "not a list"
        });

        let report = registry.import(&document, &ImportOptions::default()).await.unwrap();
        assert_eq!(report.imported.tools, 1);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.errors[0].name, "no_executor");
        assert_eq!(report.errors[1].kind, EntityKind::Prompt);
    }

    #[tokio::test]
    async fn test_collection_toggles() {
        let source = seeded().await;
        let document = source.export(&ExportSelection::all()).await;

        let target = registry();
        let report = target
            .import_document(
                &document,
                &ImportOptions {
                    import_tools: false,
                    import_resources: false,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(report.imported, ImportedCounts { tools: 0, prompts: 1, resources: 0 });
        assert!(target.list::<Tool>().await.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_names_within_document() {
        let registry = registry();
        let document = json!({
            "version": 1,
            "tools": [
                { "name": "dup", "executor": { "type": "static", "content": "first" } },
                { "name": "dup", "executor": { "type": "static", "content": "second" } }
            ]
        });

        let report = registry.import(&document, &ImportOptions::default()).await.unwrap();
        assert_eq!(report.imported.tools, 1);
        assert_eq!(report.skipped.tools, vec!["dup"]);
    }

    #[tokio::test]
    async fn test_unsupported_version() {
        let registry = registry();
        let err = registry
            .import(&json!({"version": 2, "tools": []}), &ImportOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnsupportedVersion(2)));

        assert!(
            registry
                .import(&json!({"tools": []}), &ImportOptions::default())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_import_persists() {
        let dir = tempfile::tempdir().unwrap();
        let config = RegistryConfig::with_data_dir(dir.path());
        let document = seeded().await.export(&ExportSelection::all()).await;

        {
            let registry = Registry::open(&config).unwrap();
            registry
                .import_document(&document, &ImportOptions::default())
                .await
                .unwrap();
        }

        let registry = Registry::open(&config).unwrap();
        assert_eq!(registry.status().await.tools_count, 2);
        assert_eq!(registry.status().await.resources_count, 1);
    }
}
