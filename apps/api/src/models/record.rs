use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::topic::Topic;

/// Notes-column marker identifying a curated FAQ row.
pub const FAQ_MARKER: &str = "よくある質問";

/// A single normalized dataset row. Immutable once part of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaRecord {
    pub question: String,
    pub answer: String,
    /// Raw category label as written in the dataset (trimmed).
    pub category: String,
    /// Free text describing where the answer comes from; may contain URLs.
    pub source: String,
    pub is_faq: bool,
    pub faq_id: Option<String>,
    pub display_order: Option<i64>,
}

impl QaRecord {
    pub fn topic(&self) -> Option<Topic> {
        Topic::parse_label(&self.category)
    }

    pub fn in_topic(&self, topic: Topic) -> bool {
        self.topic() == Some(topic)
    }

    /// A row is addressable from the FAQ menu only when it is flagged and has an id.
    pub fn is_addressable_faq(&self) -> bool {
        self.is_faq && self.faq_id.is_some()
    }
}

/// Per-topic row counts, as reported by the admin summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryStats {
    pub total_count: usize,
    pub faq_count: usize,
    pub general_count: usize,
}

/// An immutable, timestamped copy of the dataset.
#[derive(Debug, Clone)]
pub struct DatasetSnapshot {
    records: Vec<QaRecord>,
    fetched_at: DateTime<Utc>,
}

impl DatasetSnapshot {
    pub fn new(records: Vec<QaRecord>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            records,
            fetched_at,
        }
    }

    pub fn records(&self) -> &[QaRecord] {
        &self.records
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows belonging to `topic`, in snapshot order.
    pub fn in_topic(&self, topic: Topic) -> Vec<&QaRecord> {
        self.records.iter().filter(|r| r.in_topic(topic)).collect()
    }

    /// Addressable FAQ rows for `topic`, sorted by display order.
    /// Rows without an order sort last; ties keep snapshot order.
    pub fn faqs_in(&self, topic: Topic) -> Vec<&QaRecord> {
        let mut faqs: Vec<&QaRecord> = self
            .records
            .iter()
            .filter(|r| r.in_topic(topic) && r.is_addressable_faq())
            .collect();
        faqs.sort_by_key(|r| (r.display_order.is_none(), r.display_order));
        faqs
    }

    /// FAQ lookup across the whole dataset, independent of topic.
    pub fn faq_by_id(&self, faq_id: &str) -> Option<&QaRecord> {
        self.records
            .iter()
            .find(|r| r.faq_id.as_deref() == Some(faq_id))
    }

    pub fn category_stats(&self) -> BTreeMap<String, CategoryStats> {
        let mut stats: BTreeMap<String, CategoryStats> = BTreeMap::new();
        for record in &self.records {
            if record.category.is_empty() {
                continue;
            }
            let entry = stats.entry(record.category.clone()).or_default();
            entry.total_count += 1;
            if record.is_faq {
                entry.faq_count += 1;
            } else {
                entry.general_count += 1;
            }
        }
        stats
    }
}
