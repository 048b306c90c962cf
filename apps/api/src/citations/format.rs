use serde::Serialize;

use crate::citations::{SourceCitation, SourceType};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedCitation {
    pub id: String,
    pub title: String,
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub type_label: &'static str,
    pub confidence: f64,
    pub excerpt: Option<String>,
    pub section: Option<String>,
    pub verified: bool,
    pub icon: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedCitations {
    pub citations: Vec<FormattedCitation>,
    pub total_sources: usize,
    pub showing: usize,
    pub has_more: bool,
}

/// Internal-data citations first, then by descending confidence; the sort is
/// stable, so equal keys keep input order. Truncated to `limit`.
pub fn format(citations: &[SourceCitation], limit: usize) -> FormattedCitations {
    let mut sorted: Vec<&SourceCitation> = citations.iter().collect();
    sorted.sort_by(|a, b| {
        let a_external = a.source_type != SourceType::InternalData;
        let b_external = b.source_type != SourceType::InternalData;
        a_external
            .cmp(&b_external)
            .then_with(|| b.confidence.total_cmp(&a.confidence))
    });

    let shown: Vec<FormattedCitation> = sorted
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, c)| FormattedCitation {
            id: format!("source_{}", i + 1),
            title: c.title.clone(),
            url: c.url.clone().filter(|u| !u.is_empty()),
            source_type: c.source_type,
            type_label: c.source_type.label(),
            confidence: (c.confidence * 100.0).round() / 100.0,
            excerpt: c.excerpt.clone(),
            section: c.section.clone(),
            verified: c.last_verified.is_some(),
            icon: c.source_type.icon(),
        })
        .collect();

    FormattedCitations {
        showing: shown.len(),
        citations: shown,
        total_sources: citations.len(),
        has_more: citations.len() > limit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citations::extract::extract;
    use crate::models::record::fixtures::record;

    fn citation(title: &str, source_type: SourceType, confidence: f64) -> SourceCitation {
        SourceCitation {
            title: title.into(),
            url: (source_type != SourceType::InternalData).then(|| format!("https://x.test/{title}")),
            source_type,
            confidence,
            last_verified: None,
            excerpt: None,
            section: None,
        }
    }

    #[test]
    fn test_internal_first_then_confidence() {
        let citations = vec![
            citation("low", SourceType::OfficialWebsite, 0.5),
            citation("high", SourceType::PdfManual, 0.95),
            citation("internal", SourceType::InternalData, 0.8),
        ];
        let formatted = format(&citations, 3);
        let titles: Vec<&str> = formatted.citations.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["internal", "high", "low"]);
        assert_eq!(formatted.citations[0].id, "source_1");
        assert_eq!(formatted.citations[0].icon, "📊");
        assert_eq!(formatted.citations[1].type_label, "PDFマニュアル");
    }

    #[test]
    fn test_truncation_reports_totals() {
        let citations: Vec<_> = (0..5)
            .map(|i| citation(&format!("c{i}"), SourceType::Unknown, 0.5))
            .collect();
        let formatted = format(&citations, 3);
        assert_eq!(formatted.showing, 3);
        assert_eq!(formatted.total_sources, 5);
        assert!(formatted.has_more);
        // Equal confidence keeps input order.
        assert_eq!(formatted.citations[2].title, "c2");
    }

    #[test]
    fn test_confidence_rounded_to_two_places() {
        let formatted = format(&[citation("a", SourceType::Unknown, 0.7_f64 - 1e-12)], 3);
        assert_eq!(formatted.citations[0].confidence, 0.7);
    }

    #[test]
    fn test_format_of_extracted_record_is_idempotent() {
        let mut r = record("価格は？", "月額制", "pricing");
        r.source = "料金表ページ https://www.pip-maker.com/pricing".into();
        let citations = extract(&r);
        assert_eq!(format(&citations, 3), format(&citations, 3));
    }

    #[test]
    fn test_type_serializes_as_type_key() {
        let formatted = format(&[citation("a", SourceType::BlogPost, 0.5)], 3);
        let json = serde_json::to_value(&formatted.citations[0]).unwrap();
        assert_eq!(json["type"], "blog_post");
    }
}
