use crate::commands::{latest, Out};
use crate::present::ResultView;
use crate::{Config, Result};

/// Shows the most recently saved result without contacting the service.
pub async fn show(config: Config) -> Result<Out<()>> {
    let result = latest(&config).await?;
    let view = ResultView::new(&result);
    if view.is_empty() {
        return Ok("The last upload produced no ticket lines".into());
    }
    println!("{view}");
    Ok(format!("Showing {} ticket line(s) from the last upload", result.tickets().len()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;
    use crate::model::SessionResult;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_show_without_history() {
        let env = TestEnv::new().await;
        let e = show(env.config()).await.unwrap_err();
        assert_eq!(e.error_type(), ErrorType::Validation);
    }

    #[tokio::test]
    async fn test_show_empty_result() {
        let env = TestEnv::new().await;
        let history = env.config().history().unwrap();
        history.save(&SessionResult::default()).await.unwrap();
        let out = show(env.config()).await.unwrap();
        assert_eq!(out.message(), "The last upload produced no ticket lines");
    }
}
