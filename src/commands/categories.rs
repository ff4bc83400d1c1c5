use crate::api::{self, CategoryMap, Mode};
use crate::args::CategoriesAction;
use crate::categories::CategoryManager;
use crate::commands::Out;
use crate::{Config, Result};

/// Lists the categories, or changes them and lists the result.
pub async fn categories(
    config: Config,
    mode: Mode,
    action: &CategoriesAction,
) -> Result<Out<CategoryMap>> {
    let backend = api::backend(&config, mode)?;
    let mut manager = CategoryManager::new(backend.as_ref());

    let message = match action {
        CategoriesAction::List => {
            let categories = manager.refresh().await?;
            format!("Found {} categories", categories.len())
        }
        CategoriesAction::Add { name } => manager.create_category(name).await?,
        CategoriesAction::AddKeyword { category, keyword } => {
            manager.add_keyword(category, keyword).await?
        }
        CategoriesAction::Delete { category } => manager.delete_category(category).await?,
        CategoriesAction::DeleteKeyword { category, keyword } => {
            manager.delete_keyword(category, keyword).await?
        }
    };

    for (name, keywords) in manager.categories() {
        println!("{name}: {}", keywords.join(", "));
    }
    Ok(Out::new(message, manager.categories().clone()))
}
