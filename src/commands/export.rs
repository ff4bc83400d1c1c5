use crate::args::ExportArgs;
use crate::commands::{latest, Out};
use crate::export::{save_csv, DEFAULT_FILE_NAME};
use crate::{Config, Result};
use std::path::{Path, PathBuf};

/// Exports the ticket lines of the most recently saved result to CSV.
pub async fn export(config: Config, args: &ExportArgs) -> Result<Out<PathBuf>> {
    let result = latest(&config).await?;
    let path = args.output().unwrap_or(Path::new(DEFAULT_FILE_NAME));
    let saved = save_csv(result.tickets(), path)?;
    Ok(Out::new(
        format!("Saved {} ticket line(s) to {}", result.tickets().len(), saved.display()),
        saved,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;
    use crate::model::SessionResult;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_export_latest() {
        let env = TestEnv::new().await;
        let history = env.config().history().unwrap();
        let result: SessionResult = serde_json::from_str(
            r#"{"tickets": [{"Número de artículos": 1, "Descripción": "Leche", "Importe": 1.1}]}"#,
        )
        .unwrap();
        history.save(&result).await.unwrap();

        let output = env.scratch().join("mine.csv");
        let out = export(env.config(), &ExportArgs::new(Some(output.clone())))
            .await
            .unwrap();
        assert_eq!(out.structure(), Some(&output));
        let csv = std::fs::read_to_string(&output).unwrap();
        assert_eq!(csv.lines().nth(1), Some("1,Leche,,1.1,,,"));
    }

    #[tokio::test]
    async fn test_export_empty_result() {
        let env = TestEnv::new().await;
        let history = env.config().history().unwrap();
        history.save(&SessionResult::default()).await.unwrap();

        let output = env.scratch().join("mine.csv");
        let e = export(env.config(), &ExportArgs::new(Some(output.clone())))
            .await
            .unwrap_err();
        assert_eq!(e.error_type(), ErrorType::Validation);
        assert!(!output.exists());
    }
}
