//! Source citations for search answers: extraction from the record's source
//! text, first-party URL suggestions, reachability verification and display
//! formatting.

pub mod extract;
pub mod format;
pub mod suggest;
pub mod verify;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{QaRecord, Topic};

pub use format::{FormattedCitation, FormattedCitations};
pub use verify::{CitationStats, HttpProbe, UrlProbe, UrlVerifier};

/// Citations shown when first-party suggestions are merged in.
pub const SUGGESTION_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    InternalData,
    OfficialWebsite,
    PdfManual,
    Faq,
    Documentation,
    BlogPost,
    Unknown,
}

impl SourceType {
    pub fn label(self) -> &'static str {
        match self {
            SourceType::InternalData => "内部データ",
            SourceType::OfficialWebsite => "公式サイト",
            SourceType::PdfManual => "PDFマニュアル",
            SourceType::Faq => "よくある質問",
            SourceType::Documentation => "ドキュメント",
            SourceType::BlogPost => "ブログ記事",
            SourceType::Unknown => "参考資料",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            SourceType::InternalData => "📊",
            SourceType::OfficialWebsite => "🌐",
            SourceType::PdfManual => "📄",
            SourceType::Faq => "❓",
            SourceType::Documentation => "📚",
            SourceType::BlogPost => "📝",
            SourceType::Unknown => "🔗",
        }
    }
}

/// A reference supporting an answer. Derived per query, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceCitation {
    pub title: String,
    pub url: Option<String>,
    pub source_type: SourceType,
    pub confidence: f64,
    pub last_verified: Option<DateTime<Utc>>,
    pub excerpt: Option<String>,
    pub section: Option<String>,
}

/// Builds the citation block of a search response.
#[derive(Clone)]
pub struct CitationService {
    verifier: UrlVerifier,
    limit: usize,
}

impl CitationService {
    pub fn new(verifier: UrlVerifier, limit: usize) -> Self {
        Self { verifier, limit }
    }

    pub fn verifier(&self) -> &UrlVerifier {
        &self.verifier
    }

    /// Extracts citations from `records`; when none of them carries a URL,
    /// first-party suggestions for the query are merged in. Every URL is
    /// verified before formatting.
    pub async fn cite(&self, records: &[&QaRecord], query: &str, topic: Topic) -> FormattedCitations {
        let mut citations: Vec<SourceCitation> =
            records.iter().flat_map(|r| extract::extract(r)).collect();

        let mut limit = self.limit;
        if citations.iter().all(|c| c.url.is_none()) {
            let suggested = suggest::suggest(query, Some(topic));
            debug!("No source URLs on matched records, adding {} suggestions", suggested.len());
            citations.extend(suggested);
            limit = SUGGESTION_LIMIT;
        }

        let verified = self.verifier.enhance(citations).await;
        format::format(&verified, limit)
    }
}
