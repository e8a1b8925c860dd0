//! Schema Registry - store per-year reconciliation schemas on disk.
//!
//! Built-in schemas cover the supported releases. A new release with a
//! known header shape can be handled by importing a [`YearSchema`] JSON
//! file instead of changing code; [`SchemaCatalog`] then prefers the newest
//! stored schema for that year over the built-in one.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ReconcileError, RegistryError, RegistryResult};
use crate::transform::shapes::{YearSchema, RECONCILED_COLUMNS};

/// Directory where schemas are stored (relative to current dir)
pub const DEFAULT_REGISTRY_DIR: &str = ".happydash/schemas";

/// A stored schema with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSchema {
    /// Unique identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Year this schema reconciles (mirrors `schema.year`)
    pub year: i32,
    /// The schema itself
    pub schema: YearSchema,
    /// Creation timestamp
    pub created_at: String,
}

/// Registry for managing stored year schemas
pub struct SchemaRegistry {
    registry_dir: PathBuf,
    schemas: HashMap<String, StoredSchema>,
}

impl SchemaRegistry {
    /// Create a registry in the default directory, loading existing schemas
    pub fn new() -> Self {
        Self::with_dir(DEFAULT_REGISTRY_DIR)
    }

    /// Create a registry with a custom directory
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        let mut registry = Self {
            registry_dir: dir.as_ref().to_path_buf(),
            schemas: HashMap::new(),
        };
        registry.load_all();
        registry
    }

    pub fn dir(&self) -> &Path {
        &self.registry_dir
    }

    /// Load every `*.json` file; unreadable entries are skipped.
    fn load_all(&mut self) {
        let Ok(entries) = fs::read_dir(&self.registry_dir) else {
            return;
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "json") {
                if let Ok(content) = fs::read_to_string(&path) {
                    if let Ok(stored) = serde_json::from_str::<StoredSchema>(&content) {
                        self.schemas.insert(stored.id.clone(), stored);
                    }
                }
            }
        }
    }

    /// All stored schemas, by year then creation time
    pub fn list(&self) -> Vec<&StoredSchema> {
        let mut all: Vec<_> = self.schemas.values().collect();
        all.sort_by(|a, b| a.year.cmp(&b.year).then_with(|| a.created_at.cmp(&b.created_at)));
        all
    }

    /// Get a schema by ID
    pub fn get(&self, id: &str) -> Option<&StoredSchema> {
        self.schemas.get(id)
    }

    /// Newest stored schema for a year
    pub fn for_year(&self, year: i32) -> Option<&StoredSchema> {
        self.schemas
            .values()
            .filter(|s| s.year == year)
            .max_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
    }

    /// Check and save a schema
    pub fn save(&mut self, schema: YearSchema, name: &str) -> RegistryResult<String> {
        check_schema(&schema)?;
        fs::create_dir_all(&self.registry_dir)?;

        let id = self.generate_id(name);
        let stored = StoredSchema {
            id: id.clone(),
            name: name.to_string(),
            year: schema.year,
            schema,
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        let path = self.registry_dir.join(format!("{}.json", id));
        fs::write(&path, serde_json::to_string_pretty(&stored)?)?;

        self.schemas.insert(id.clone(), stored);
        Ok(id)
    }

    /// Import a [`YearSchema`] JSON file
    pub fn import(&mut self, path: &Path, name: Option<&str>) -> RegistryResult<String> {
        let content = fs::read_to_string(path)?;
        let schema = YearSchema::from_json(&content)?;

        let schema_name = name.unwrap_or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("imported")
        });

        self.save(schema, schema_name)
    }

    /// Delete a schema from the registry
    pub fn delete(&mut self, id: &str) -> RegistryResult<()> {
        if self.schemas.remove(id).is_none() {
            return Err(RegistryError::NotFound(id.to_string()));
        }
        fs::remove_file(self.registry_dir.join(format!("{}.json", id)))?;
        Ok(())
    }

    /// Slug of `name` plus a millisecond timestamp
    fn generate_id(&self, name: &str) -> String {
        let slug = name
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-");

        let mut id = format!("{}-{}", slug, chrono::Utc::now().timestamp_millis());
        while self.schemas.contains_key(&id) {
            id.push('x');
        }
        id
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Every rename must target a canonical column.
fn check_schema(schema: &YearSchema) -> RegistryResult<()> {
    for (from, to) in &schema.renames {
        if !RECONCILED_COLUMNS.contains(&to.as_str()) || to == "year" {
            return Err(RegistryError::InvalidSchema(format!(
                "'{}' renames to non-canonical column '{}'",
                from, to
            )));
        }
    }
    Ok(())
}

// =============================================================================
// Catalog
// =============================================================================

/// Resolves the schema used for a year: stored first, then built-in.
#[derive(Default)]
pub struct SchemaCatalog {
    registry: Option<SchemaRegistry>,
}

impl SchemaCatalog {
    /// Built-in schemas only.
    pub fn builtin() -> Self {
        Self { registry: None }
    }

    pub fn with_registry(registry: SchemaRegistry) -> Self {
        Self {
            registry: Some(registry),
        }
    }

    pub fn resolve(&self, year: i32) -> Result<YearSchema, ReconcileError> {
        if let Some(stored) = self.registry.as_ref().and_then(|r| r.for_year(year)) {
            return Ok(stored.schema.clone());
        }
        YearSchema::builtin(year).ok_or(ReconcileError::UnsupportedYear(year))
    }

    /// Where the schema for a year comes from ("builtin" or a stored id).
    pub fn source_of(&self, year: i32) -> Option<String> {
        match self.registry.as_ref().and_then(|r| r.for_year(year)) {
            Some(stored) => Some(stored.id.clone()),
            None => YearSchema::builtin(year).map(|_| "builtin".to_string()),
        }
    }
}
