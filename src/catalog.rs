//! Read-only catalog of application packages.
//!
//! Maps a client-supplied package id to the DSL source and target resources
//! the pipeline runs with. Packages come from the config file; ids it does not
//! know fall back to a built-in HelloWorld package unless that is disabled.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::debug;

use crate::config::{OrchestratorConfig, PackageConfig};
use crate::error::{OrchestrationError, Result};
use crate::model::Resources;
use crate::types::AppPackageId;

/// DSL used when a package id is not declared in the catalog.
pub const DEFAULT_DSL_TEXT: &str =
    "dag HelloWorld = { [out_var] = TaskA(), [final_result] = TaskB(out_var) }";

/// A resolved package, ready to feed into the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct AppPackage {
    pub id: AppPackageId,
    pub dsl_text: String,
    pub resources: Resources,
}

#[derive(Debug, Clone)]
enum DslSource {
    Inline(String),
    File(PathBuf),
}

#[derive(Debug, Clone)]
struct CatalogEntry {
    dsl: DslSource,
    resources: Option<Resources>,
}

#[derive(Debug, Clone)]
pub struct AppPackageCatalog {
    entries: BTreeMap<AppPackageId, CatalogEntry>,
    default_resources: Resources,
    fallback_to_default: bool,
}

impl Default for AppPackageCatalog {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            default_resources: Resources::default(),
            fallback_to_default: true,
        }
    }
}

impl AppPackageCatalog {
    pub fn from_config(config: &OrchestratorConfig) -> Self {
        let entries = config
            .packages
            .iter()
            .filter_map(|(id, pkg)| Some((id.clone(), CatalogEntry::from_config(pkg)?)))
            .collect();

        Self {
            entries,
            default_resources: config.default_resources.clone(),
            fallback_to_default: config.fallback_to_default,
        }
    }

    /// Add an inline package, replacing any previous one with the same id.
    pub fn with_package(
        mut self,
        id: impl Into<AppPackageId>,
        dsl_text: impl Into<String>,
        resources: Option<Resources>,
    ) -> Self {
        self.entries.insert(
            id.into(),
            CatalogEntry {
                dsl: DslSource::Inline(dsl_text.into()),
                resources,
            },
        );
        self
    }

    pub fn with_fallback(mut self, fallback_to_default: bool) -> Self {
        self.fallback_to_default = fallback_to_default;
        self
    }

    /// Resolve a package id into DSL text and resources.
    ///
    /// `dsl_file` sources are read on every call so edits are picked up
    /// without a restart.
    pub async fn resolve(&self, id: &AppPackageId) -> Result<AppPackage> {
        let Some(entry) = self.entries.get(id) else {
            if !self.fallback_to_default {
                return Err(OrchestrationError::UnknownPackage(id.clone()));
            }
            debug!("Package `{id}` not in catalog, using built-in default");
            return Ok(AppPackage {
                id: id.clone(),
                dsl_text: DEFAULT_DSL_TEXT.to_string(),
                resources: self.default_resources.clone(),
            });
        };

        let dsl_text = match &entry.dsl {
            DslSource::Inline(text) => text.clone(),
            DslSource::File(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
                OrchestrationError::Internal(format!(
                    "Failed to read DSL for package `{id}` from {}: {e}",
                    path.display()
                ))
            })?,
        };

        Ok(AppPackage {
            id: id.clone(),
            dsl_text,
            resources: entry
                .resources
                .clone()
                .unwrap_or_else(|| self.default_resources.clone()),
        })
    }
}

impl CatalogEntry {
    fn from_config(pkg: &PackageConfig) -> Option<Self> {
        let dsl = match (&pkg.dsl_text, &pkg.dsl_file) {
            (Some(text), _) => DslSource::Inline(text.clone()),
            (None, Some(path)) => DslSource::File(path.clone()),
            (None, None) => return None,
        };
        Some(Self {
            dsl,
            resources: pkg.resources.clone(),
        })
    }
}
