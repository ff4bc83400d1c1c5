//! Category and keyword administration.
//!
//! The manager keeps a copy of the category list. It never edits that copy itself: after every
//! successful change it asks the service for the whole list again.

use crate::api::{Backend, CategoryMap};
use crate::error::Error;
use crate::Result;
use tracing::{debug, info, warn};

/// Manages the categories the service classifies into.
pub struct CategoryManager<'a> {
    backend: &'a dyn Backend,
    categories: CategoryMap,
}

impl<'a> CategoryManager<'a> {
    /// Creates a manager with an empty list. Call `refresh` to load it.
    pub fn new(backend: &'a dyn Backend) -> Self {
        Self {
            backend,
            categories: CategoryMap::new(),
        }
    }

    /// The list as of the last successful fetch.
    pub fn categories(&self) -> &CategoryMap {
        &self.categories
    }

    /// Replaces the list with the service's. The list is unchanged on failure.
    pub async fn refresh(&mut self) -> Result<&CategoryMap> {
        let categories = self.backend.list_categories().await?;
        debug!("Fetched {} categories", categories.len());
        self.categories = categories;
        Ok(&self.categories)
    }

    /// Creates a category with no keywords.
    pub async fn create_category(&mut self, name: &str) -> Result<String> {
        let name = required("category name", name)?;
        let message = self.backend.create_category(name, &[]).await?;
        self.after_change(message).await
    }

    pub async fn add_keyword(&mut self, category: &str, keyword: &str) -> Result<String> {
        let category = required("category name", category)?;
        let keyword = required("keyword", keyword)?;
        let message = self.backend.add_keyword(category, keyword).await?;
        self.after_change(message).await
    }

    pub async fn delete_category(&mut self, category: &str) -> Result<String> {
        let category = required("category name", category)?;
        let message = self.backend.delete_category(category).await?;
        self.after_change(message).await
    }

    pub async fn delete_keyword(&mut self, category: &str, keyword: &str) -> Result<String> {
        let category = required("category name", category)?;
        let keyword = required("keyword", keyword)?;
        let message = self.backend.delete_keyword(category, keyword).await?;
        self.after_change(message).await
    }

    /// The change went through, so a failed refresh only leaves the list out of date.
    async fn after_change(&mut self, message: String) -> Result<String> {
        info!("{message}");
        if let Err(e) = self.refresh().await {
            warn!("Unable to refresh the categories after a change: {e}");
        }
        Ok(message)
    }
}

fn required<'s>(what: &str, value: &'s str) -> Result<&'s str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("Please enter a {what}.")));
    }
    Ok(trimmed)
}
