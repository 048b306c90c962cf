use crate::citations::{SourceCitation, SourceType};
use crate::models::Topic;

const SITE_ROOT: &str = "https://www.pip-maker.com/";
const MANUAL_PDF: &str = "https://info.pip-maker.com/manual/pdf/PIP-Maker_creator.pdf";

fn page(title: &str, url: &str, source_type: SourceType, confidence: f64) -> SourceCitation {
    SourceCitation {
        title: title.to_string(),
        url: Some(url.to_string()),
        source_type,
        confidence,
        last_verified: None,
        excerpt: None,
        section: None,
    }
}

/// First-party pages relevant to the topic or to keywords in the query.
/// Never empty: the site root is the fallback.
pub fn suggest(query: &str, topic: Option<Topic>) -> Vec<SourceCitation> {
    let query = query.to_lowercase();
    let is = |t: Topic| topic == Some(t);
    let mentions = |words: &[&str]| words.iter().any(|w| query.contains(w));

    let mut suggested = Vec::new();

    if is(Topic::About) || mentions(&["概要", "とは"]) {
        suggested.push(page(
            "PIP-Maker製品概要",
            "https://www.pip-maker.com/product",
            SourceType::OfficialWebsite,
            0.8,
        ));
    }
    if is(Topic::Cases) || mentions(&["事例"]) {
        suggested.push(page(
            "PIP-Maker導入事例",
            "https://www.pip-maker.com/case-studies",
            SourceType::OfficialWebsite,
            0.8,
        ));
    }
    if is(Topic::Features) || mentions(&["機能"]) {
        suggested.push(page(
            "PIP-Maker機能一覧",
            "https://www.pip-maker.com/features",
            SourceType::OfficialWebsite,
            0.8,
        ));
        suggested.push(page(
            "PIP-Maker操作マニュアル",
            MANUAL_PDF,
            SourceType::PdfManual,
            0.9,
        ));
    }
    if is(Topic::Pricing) || mentions(&["料金", "価格"]) {
        suggested.push(page(
            "PIP-Maker料金プラン",
            "https://www.pip-maker.com/pricing",
            SourceType::OfficialWebsite,
            0.9,
        ));
    }

    if suggested.is_empty() {
        suggested.push(page(
            "PIP-Maker公式サイト",
            SITE_ROOT,
            SourceType::OfficialWebsite,
            0.7,
        ));
    }

    suggested
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(citations: &[SourceCitation]) -> Vec<&str> {
        citations.iter().filter_map(|c| c.url.as_deref()).collect()
    }

    #[test]
    fn test_features_adds_page_and_manual() {
        let s = suggest("", Some(Topic::Features));
        assert_eq!(urls(&s), vec!["https://www.pip-maker.com/features", MANUAL_PDF]);
        assert_eq!(s[1].source_type, SourceType::PdfManual);
    }

    #[test]
    fn test_query_keywords_add_pages_across_topics() {
        let s = suggest("導入事例と料金", Some(Topic::About));
        assert_eq!(
            urls(&s),
            vec![
                "https://www.pip-maker.com/product",
                "https://www.pip-maker.com/case-studies",
                "https://www.pip-maker.com/pricing",
            ]
        );
    }

    #[test]
    fn test_every_topic_yields_a_suggestion() {
        for topic in Topic::ALL {
            assert!(!suggest("", Some(topic)).is_empty(), "{topic}");
        }
    }

    #[test]
    fn test_fallback_is_site_root() {
        let s = suggest("hello", Some(Topic::Other));
        assert_eq!(urls(&s), vec![SITE_ROOT]);
        assert_eq!(s[0].confidence, 0.7);
    }
}
