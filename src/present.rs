//! Views derived from a `SessionResult`: the ticket table and the two chart datasets.
//!
//! Everything here is a pure function of the result. A sequence that is empty produces no view at
//! all rather than an empty one.

use crate::model::{CategoryAggregate, SessionResult, TicketRow, TimeSeriesPoint};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Shown in place of a missing cell or label.
pub const NOT_AVAILABLE: &str = "N/A";

/// The table column headings. These differ from the field names in one place: the unit price is
/// spelled out.
pub const TABLE_HEADERS: [&str; 7] = [
    "Número de artículos",
    "Descripción",
    "Precio Unitario",
    "Importe",
    "Fecha",
    "Hora",
    "Clasificación",
];

const TIME_SERIES_TITLE: &str = "Serie Temporal de Gasto";
const TIME_SERIES_LABEL: &str = "Gasto en el tiempo";
const CATEGORY_TITLE: &str = "Gasto por Categoría";
const CATEGORY_LABEL: &str = "Gasto por Categoría";
const LINE_COLOR: &str = "rgba(75,192,192,1)";
const BAR_COLOR: &str = "rgba(75,192,192,0.4)";

/// Width in characters of the longest bar when a chart is rendered as text.
const BAR_WIDTH: usize = 40;

/// The ticket lines as rows of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    rows: Vec<[String; 7]>,
}

impl TableView {
    /// One row per ticket in the order given. Returns `None` when there are no tickets.
    pub fn new(tickets: &[TicketRow]) -> Option<Self> {
        if tickets.is_empty() {
            return None;
        }
        let rows = tickets
            .iter()
            .map(|ticket| {
                ticket
                    .cells()
                    .map(|cell| cell.unwrap_or_else(|| NOT_AVAILABLE.to_string()))
            })
            .collect();
        Some(Self { rows })
    }

    pub fn headers(&self) -> [&'static str; 7] {
        TABLE_HEADERS
    }

    pub fn rows(&self) -> &[[String; 7]] {
        &self.rows
    }
}

impl Display for TableView {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut widths = TABLE_HEADERS.map(|h| h.chars().count());
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }
        write_row(f, &widths, TABLE_HEADERS.iter().copied())?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        write_row(f, &widths, rule.iter().map(String::as_str))?;
        for row in &self.rows {
            write_row(f, &widths, row.iter().map(String::as_str))?;
        }
        Ok(())
    }
}

fn write_row<'a>(
    f: &mut Formatter<'_>,
    widths: &[usize],
    cells: impl Iterator<Item = &'a str>,
) -> std::fmt::Result {
    let line: Vec<String> = cells
        .zip(widths)
        .map(|(cell, width)| pad(cell, *width))
        .collect();
    writeln!(f, "{}", line.join("  ").trim_end())
}

/// Pads by character count, since the headings contain accented letters.
fn pad(s: &str, width: usize) -> String {
    let len = s.chars().count();
    format!("{s}{}", " ".repeat(width.saturating_sub(len)))
}

/// How a dataset is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
}

serde_plain::derive_display_from_serialize!(ChartKind);

/// One chart: labels along one axis and a single series of values.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartDataset {
    kind: ChartKind,
    title: &'static str,
    label: &'static str,
    labels: Vec<String>,
    data: Vec<f64>,
}

impl ChartDataset {
    /// Spending over time, one point per date in the order the server sent them.
    pub fn time_series(points: &[TimeSeriesPoint]) -> Option<Self> {
        Self::build(
            ChartKind::Line,
            TIME_SERIES_TITLE,
            TIME_SERIES_LABEL,
            points.iter().map(|p| (p.date(), p.amount())),
        )
    }

    /// Spending per category, one bar per category in the order the server sent them.
    pub fn category_totals(totals: &[CategoryAggregate]) -> Option<Self> {
        Self::build(
            ChartKind::Bar,
            CATEGORY_TITLE,
            CATEGORY_LABEL,
            totals.iter().map(|t| (t.category(), t.amount())),
        )
    }

    fn build<'a>(
        kind: ChartKind,
        title: &'static str,
        label: &'static str,
        points: impl ExactSizeIterator<Item = (Option<&'a str>, Option<crate::model::Number>)>,
    ) -> Option<Self> {
        if points.len() == 0 {
            return None;
        }
        let (labels, data) = points
            .map(|(label, amount)| {
                (
                    label.unwrap_or(NOT_AVAILABLE).to_string(),
                    amount.map(|n| n.to_f64()).unwrap_or(0.0),
                )
            })
            .unzip();
        Some(Self {
            kind,
            title,
            label,
            labels,
            data,
        })
    }

    pub fn kind(&self) -> ChartKind {
        self.kind
    }

    /// The heading shown above the chart.
    pub fn title(&self) -> &str {
        self.title
    }

    /// The name of the single series.
    pub fn label(&self) -> &str {
        self.label
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }
}

/// The Chart.js shape: `{ type, title, labels, datasets: [{ label, data, ... }] }`.
impl Serialize for ChartDataset {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Series<'a> {
            label: &'a str,
            data: &'a [f64],
            #[serde(skip_serializing_if = "Option::is_none")]
            border_color: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            background_color: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            fill: Option<bool>,
        }

        #[derive(Serialize)]
        struct Chart<'a> {
            #[serde(rename = "type")]
            kind: ChartKind,
            title: &'a str,
            labels: &'a [String],
            datasets: [Series<'a>; 1],
        }

        let series = match self.kind {
            ChartKind::Line => Series {
                label: self.label,
                data: &self.data,
                border_color: Some(LINE_COLOR),
                background_color: None,
                fill: Some(false),
            },
            ChartKind::Bar => Series {
                label: self.label,
                data: &self.data,
                border_color: None,
                background_color: Some(BAR_COLOR),
                fill: None,
            },
        };
        Chart {
            kind: self.kind,
            title: self.title,
            labels: &self.labels,
            datasets: [series],
        }
        .serialize(serializer)
    }
}

/// Renders the chart as labelled horizontal bars scaled to the largest value.
impl Display for ChartDataset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} ({})", self.title, self.label)?;
        let label_width = self
            .labels
            .iter()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0);
        let max = self.data.iter().copied().fold(0.0_f64, f64::max);
        for (label, value) in self.labels.iter().zip(&self.data) {
            let len = if max > 0.0 && *value > 0.0 {
                ((value / max) * BAR_WIDTH as f64).round() as usize
            } else {
                0
            };
            writeln!(
                f,
                "{}  {} {value}",
                pad(label, label_width),
                "#".repeat(len)
            )?;
        }
        Ok(())
    }
}

/// Every view of one result, plus whether it can be exported.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    table: Option<TableView>,
    time_series: Option<ChartDataset>,
    category_totals: Option<ChartDataset>,
}

impl ResultView {
    pub fn new(result: &SessionResult) -> Self {
        Self {
            table: TableView::new(result.tickets()),
            time_series: ChartDataset::time_series(result.time_series()),
            category_totals: ChartDataset::category_totals(result.category_totals()),
        }
    }

    pub fn table(&self) -> Option<&TableView> {
        self.table.as_ref()
    }

    pub fn time_series(&self) -> Option<&ChartDataset> {
        self.time_series.as_ref()
    }

    pub fn category_totals(&self) -> Option<&ChartDataset> {
        self.category_totals.as_ref()
    }

    /// The charts that have data, time series first.
    pub fn charts(&self) -> Vec<&ChartDataset> {
        self.time_series
            .iter()
            .chain(self.category_totals.iter())
            .collect()
    }

    /// Export is offered only when there are tickets to export.
    pub fn export_enabled(&self) -> bool {
        self.table.is_some()
    }

    /// True when there is nothing at all to show.
    pub fn is_empty(&self) -> bool {
        self.table.is_none() && self.time_series.is_none() && self.category_totals.is_none()
    }
}

impl Display for ResultView {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut sections: Vec<String> = self.charts().iter().map(|c| c.to_string()).collect();
        if let Some(table) = &self.table {
            sections.push(table.to_string());
        }
        write!(f, "{}", sections.join("\n"))
    }
}
