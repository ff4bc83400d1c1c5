use crate::api::{self, Mode};
use crate::args::UploadArgs;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{export, utils, Config, Result, Session};
use anyhow::Context;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, warn};

/// What an upload produced, for the structured part of the command output.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UploadSummary {
    pub tickets: usize,
    pub dates: usize,
    pub categories: usize,
    pub saved: Option<PathBuf>,
    pub exported: Option<PathBuf>,
    pub charts: Option<PathBuf>,
}

/// Sends the selected files, shows the result and saves it to the history.
///
/// The result is also exported to CSV when `args.export()` is set, and both chart datasets are
/// written as JSON when `args.charts()` is set.
pub async fn upload(config: Config, mode: Mode, args: &UploadArgs) -> Result<Out<UploadSummary>> {
    let backend = api::backend(&config, mode)?;
    let mut session = Session::new();
    session.select_pdfs(args.pdfs().iter().cloned());
    session.select_csv(args.csv());

    session.submit(backend.as_ref()).await?;
    let result = session.result();
    let view = session.view();
    println!("{view}");

    let saved = match config.history() {
        Some(history) => match history.save(result).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("The result could not be saved for later: {e}");
                None
            }
        },
        None => {
            debug!("No tickets home, the result is not saved");
            None
        }
    };

    let exported = match args.export() {
        Some(path) if view.export_enabled() => Some(export::save_csv(result.tickets(), path)?),
        Some(_) => {
            warn!("There are no ticket lines to export");
            None
        }
        None => None,
    };

    let charts = match args.charts() {
        Some(path) => {
            let json = serde_json::to_string_pretty(&view.charts())
                .context("Unable to serialize the charts")
                .pub_result(ErrorType::Io)?;
            utils::write(path, json).await.pub_result(ErrorType::Io)?;
            Some(path.to_path_buf())
        }
        None => None,
    };

    let summary = UploadSummary {
        tickets: result.tickets().len(),
        dates: result.time_series().len(),
        categories: result.category_totals().len(),
        saved,
        exported,
        charts,
    };
    Ok(Out::new(
        format!(
            "Processed {} ticket line(s) across {} date(s) and {} categor{}",
            summary.tickets,
            summary.dates,
            summary.categories,
            if summary.categories == 1 { "y" } else { "ies" }
        ),
        summary,
    ))
}
