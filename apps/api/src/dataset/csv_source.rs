use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, warn};

use crate::dataset::{DataSource, DataSourceError, SourceDescription};
use crate::models::record::FAQ_MARKER;
use crate::models::QaRecord;

/// Column roles of the tabular dataset. Labels may be localized; roles are fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Question,
    Answer,
    Category,
    Source,
    Notes,
    FaqId,
    DisplayOrder,
}

/// Header label → role. Japanese labels are what the spreadsheet export uses.
const HEADER_LABELS: &[(&str, Column)] = &[
    ("質問", Column::Question),
    ("回答", Column::Answer),
    ("対応カテゴリー", Column::Category),
    ("根拠資料", Column::Source),
    ("備考", Column::Notes),
    ("FAQ_ID", Column::FaqId),
    ("表示順序", Column::DisplayOrder),
    ("question", Column::Question),
    ("answer", Column::Answer),
    ("category", Column::Category),
    ("source", Column::Source),
    ("notes", Column::Notes),
    ("faq_id", Column::FaqId),
    ("display_order", Column::DisplayOrder),
];

fn column_for(label: &str) -> Option<Column> {
    let label = label.trim().trim_start_matches('\u{feff}');
    HEADER_LABELS
        .iter()
        .find(|(l, _)| l.eq_ignore_ascii_case(label))
        .map(|(_, c)| *c)
}

#[derive(Debug, Clone)]
pub enum CsvLocation {
    File(PathBuf),
    Url(String),
}

impl CsvLocation {
    /// `http(s)://` strings are downloaded, anything else is a file path.
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            CsvLocation::Url(raw.to_string())
        } else {
            CsvLocation::File(PathBuf::from(raw))
        }
    }
}

/// CSV dataset read from disk or downloaded (e.g. a published spreadsheet export).
pub struct CsvSource {
    location: CsvLocation,
    client: Client,
}

impl CsvSource {
    pub fn new(location: CsvLocation) -> Self {
        Self {
            location,
            client: Client::new(),
        }
    }

    async fn read_bytes(&self) -> Result<Vec<u8>, DataSourceError> {
        match &self.location {
            CsvLocation::File(path) => tokio::fs::read(path).await.map_err(|e| {
                DataSourceError::Unavailable(format!("cannot read {}: {e}", path.display()))
            }),
            CsvLocation::Url(url) => {
                let response = self.client.get(url).send().await?.error_for_status()?;
                Ok(response.bytes().await?.to_vec())
            }
        }
    }
}

#[async_trait]
impl DataSource for CsvSource {
    async fn fetch(&self) -> Result<Vec<QaRecord>, DataSourceError> {
        let bytes = self.read_bytes().await?;
        let records = parse_records(&bytes)?;
        info!(
            "Loaded {} Q&A rows from {}",
            records.len(),
            self.describe().location
        );
        Ok(records)
    }

    fn describe(&self) -> SourceDescription {
        match &self.location {
            CsvLocation::File(path) => SourceDescription {
                kind: "csv_file".to_string(),
                location: path.display().to_string(),
            },
            CsvLocation::Url(url) => SourceDescription {
                kind: "csv_url".to_string(),
                location: url.clone(),
            },
        }
    }
}

/// Parses CSV bytes into normalized records. Blank rows are skipped.
pub fn parse_records(bytes: &[u8]) -> Result<Vec<QaRecord>, DataSourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let roles: Vec<Option<Column>> = reader.headers()?.iter().map(column_for).collect();
    if !roles.contains(&Some(Column::Question)) || !roles.contains(&Some(Column::Answer)) {
        return Err(DataSourceError::Malformed(
            "header must contain question and answer columns".to_string(),
        ));
    }

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        // Header is line 1.
        let line = index + 2;
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!("Skipping unreadable CSV line {line}: {e}");
                continue;
            }
        };
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let cell = |role: Column| -> String {
            roles
                .iter()
                .position(|r| *r == Some(role))
                .and_then(|i| row.get(i))
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };

        let notes = cell(Column::Notes);
        let faq_id = cell(Column::FaqId);
        let order = cell(Column::DisplayOrder);

        records.push(QaRecord {
            question: cell(Column::Question),
            answer: cell(Column::Answer),
            category: cell(Column::Category).to_lowercase(),
            source: cell(Column::Source),
            is_faq: notes == FAQ_MARKER || notes.eq_ignore_ascii_case("faq"),
            faq_id: (!faq_id.is_empty()).then_some(faq_id),
            display_order: order.parse().ok(),
        });
    }

    Ok(records)
}
