use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::citations::{SourceCitation, SourceType};
use crate::models::QaRecord;

/// A URL, optionally containing one balanced parenthesized part.
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://[^\s)]+(?:\([^)]*\))?[^\s)]*").expect("URL pattern is valid")
});

/// Hosts treated as first-party, matched exactly or as a parent domain.
const FIRST_PARTY_HOSTS: &[&str] = &[
    "pip-maker.com",
    "info.pip-maker.com",
    "support.pip-maker.com",
    "blog.pip-maker.com",
];

const URL_CONFIDENCE: f64 = 0.9;
const INTERNAL_CONFIDENCE: f64 = 0.8;
const EXCERPT_CHARS: usize = 200;

/// One citation per URL in the record's source text, or a single
/// internal-data citation when there is none.
pub fn extract(record: &QaRecord) -> Vec<SourceCitation> {
    let excerpt: String = record.answer.chars().take(EXCERPT_CHARS).collect();
    let excerpt = (!excerpt.is_empty()).then_some(excerpt);
    let section = (!record.category.is_empty()).then(|| record.category.clone());

    let mut citations: Vec<SourceCitation> = find_urls(&record.source)
        .into_iter()
        .map(|url| SourceCitation {
            title: title_for(&record.source, &url),
            source_type: classify(&url),
            url: Some(url),
            confidence: URL_CONFIDENCE,
            last_verified: None,
            excerpt: excerpt.clone(),
            section: section.clone(),
        })
        .collect();

    if citations.is_empty() {
        citations.push(SourceCitation {
            title: if record.question.is_empty() {
                "PIP-Maker Q&A".to_string()
            } else {
                record.question.clone()
            },
            url: None,
            source_type: SourceType::InternalData,
            confidence: INTERNAL_CONFIDENCE,
            last_verified: None,
            excerpt,
            section,
        });
    }

    citations
}

/// URLs in order of appearance, trailing punctuation removed.
pub fn find_urls(text: &str) -> Vec<String> {
    URL_RE
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ')']).to_string())
        .filter(|url| !url.is_empty())
        .collect()
}

pub fn is_first_party(url: &str) -> bool {
    let Some(host) = Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_lowercase)) else {
        return false;
    };
    FIRST_PARTY_HOSTS
        .iter()
        .any(|known| host == *known || host.ends_with(&format!(".{known}")))
}

/// First-party URLs are typed by keywords anywhere in the URL; everything
/// else is `Unknown`.
pub fn classify(url: &str) -> SourceType {
    if !is_first_party(url) {
        return SourceType::Unknown;
    }

    let lowered = url.to_lowercase();
    if lowered.contains("faq") {
        SourceType::Faq
    } else if lowered.contains(".pdf") || lowered.contains("manual") {
        SourceType::PdfManual
    } else if lowered.contains("doc") || lowered.contains("guide") {
        SourceType::Documentation
    } else if lowered.contains("blog") || lowered.contains("news") {
        SourceType::BlogPost
    } else {
        SourceType::OfficialWebsite
    }
}

/// Text before the URL when it is long enough, else the last path segment,
/// else the host.
fn title_for(source_text: &str, url: &str) -> String {
    if let Some((before, _)) = source_text.split_once(url) {
        let before = before
            .trim()
            .trim_end_matches(['-', '(', ')'])
            .trim_end();
        let length = before.chars().count();
        if length > 5 {
            return before.chars().skip(length.saturating_sub(50)).collect();
        }
    }

    let Ok(parsed) = Url::parse(url) else {
        return "参考資料".to_string();
    };

    if let Some(segment) = parsed
        .path()
        .trim_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
    {
        let readable = segment
            .replace(['-', '_'], " ")
            .replace(".html", "")
            .replace(".pdf", "");
        return title_case(&readable);
    }

    parsed
        .host_str()
        .map(str::to_string)
        .unwrap_or_else(|| "参考資料".to_string())
}

/// Uppercases the first letter of every alphabetic run, lowercases the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_alpha = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if previous_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_alpha = true;
        } else {
            out.push(c);
            previous_alpha = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::fixtures::record;

    fn with_source(source: &str) -> QaRecord {
        let mut r = record("料金プランは？", "月額制のプランをご用意しています。", "pricing");
        r.source = source.to_string();
        r
    }

    #[test]
    fn test_no_url_yields_internal_citation() {
        let citations = extract(&with_source("社内資料"));
        assert_eq!(citations.len(), 1);
        let c = &citations[0];
        assert_eq!(c.source_type, SourceType::InternalData);
        assert_eq!(c.title, "料金プランは？");
        assert_eq!(c.url, None);
        assert_eq!(c.confidence, 0.8);
        assert_eq!(c.section.as_deref(), Some("pricing"));
    }

    #[test]
    fn test_trailing_punctuation_stripped() {
        let urls = find_urls("詳細は https://www.pip-maker.com/pricing. または (https://example.com/a).");
        assert_eq!(
            urls,
            vec!["https://www.pip-maker.com/pricing", "https://example.com/a"]
        );
    }

    #[test]
    fn test_closing_paren_ends_url() {
        let urls = find_urls("see https://en.wikipedia.org/wiki/Rust_(language) now");
        assert_eq!(urls, vec!["https://en.wikipedia.org/wiki/Rust_(language"]);
    }

    #[test]
    fn test_several_urls_each_cited() {
        let citations = extract(&with_source(
            "https://www.pip-maker.com/pricing https://info.pip-maker.com/manual/a.pdf",
        ));
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[1].source_type, SourceType::PdfManual);
    }

    #[test]
    fn test_classification() {
        assert_eq!(classify("https://www.pip-maker.com/faq/1"), SourceType::Faq);
        assert_eq!(
            classify("https://info.pip-maker.com/manual/pdf/PIP-Maker_creator.pdf"),
            SourceType::PdfManual
        );
        assert_eq!(
            classify("https://support.pip-maker.com/guide/setup"),
            SourceType::Documentation
        );
        assert_eq!(classify("https://blog.pip-maker.com/2024/launch"), SourceType::BlogPost);
        assert_eq!(classify("https://www.pip-maker.com/pricing"), SourceType::OfficialWebsite);
        assert_eq!(classify("https://example.com/faq"), SourceType::Unknown);
        assert_eq!(classify("https://pip-maker.com.evil.test/"), SourceType::Unknown);
    }

    #[test]
    fn test_title_from_preceding_text() {
        let c = &extract(&with_source("料金プラン詳細ページ - https://www.pip-maker.com/pricing"))[0];
        assert_eq!(c.title, "料金プラン詳細ページ");
        assert_eq!(c.confidence, 0.9);
        assert_eq!(c.source_type, SourceType::OfficialWebsite);
    }

    #[test]
    fn test_title_from_path_segment() {
        let c = &extract(&with_source("https://www.pip-maker.com/case-studies/big_client.html"))[0];
        assert_eq!(c.title, "Big Client");
    }

    #[test]
    fn test_title_falls_back_to_host() {
        let c = &extract(&with_source("https://www.pip-maker.com/"))[0];
        assert_eq!(c.title, "www.pip-maker.com");
    }

    #[test]
    fn test_excerpt_is_first_200_chars() {
        let mut r = with_source("");
        r.answer = "あ".repeat(250);
        let c = &extract(&r)[0];
        assert_eq!(c.excerpt.as_ref().unwrap().chars().count(), 200);
    }
}
