use std::collections::HashSet;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum CatalogError {
    #[error("package query failed: {message}")]
    Query { message: String },
}

/// Raw platform queries about installed applications, uncached.
pub trait PackageCatalog: Send + Sync {
    fn home_packages(&self) -> Result<HashSet<String>, CatalogError>;

    fn launchable_packages(&self) -> Result<HashSet<String>, CatalogError>;

    fn has_launch_entry(&self, package: &str) -> Result<bool, CatalogError>;

    fn application_label(&self, package: &str) -> Result<Option<String>, CatalogError>;
}
