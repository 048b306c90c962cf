use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The fixed subject-matter buckets used for menu navigation and search scoping.
///
/// Declaration order matters: it is the menu order and the tie-break order
/// for intent classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    About,
    Cases,
    Features,
    Pricing,
    Other,
}

impl Topic {
    pub const ALL: [Topic; 5] = [
        Topic::About,
        Topic::Cases,
        Topic::Features,
        Topic::Pricing,
        Topic::Other,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Topic::About => "about",
            Topic::Cases => "cases",
            Topic::Features => "features",
            Topic::Pricing => "pricing",
            Topic::Other => "other",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Topic::About => "PIP-Makerとは？",
            Topic::Cases => "PIP-Makerの導入事例",
            Topic::Features => "PIP-Makerの機能",
            Topic::Pricing => "PIP-Makerの料金プラン / ライセンスルール",
            Topic::Other => "その他",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Topic::About => "PIP-Makerの基本的な概要と特徴について説明します。",
            Topic::Cases => "実際の導入事例と成功例をご紹介します。",
            Topic::Features => "PIP-Makerの主要機能と使い方について説明します。",
            Topic::Pricing => "料金体系とライセンス情報についてご案内します。",
            Topic::Other => "上記以外のご質問やご相談についてお答えします。",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Topic::About => "💡",
            Topic::Cases => "📈",
            Topic::Features => "⚙️",
            Topic::Pricing => "💰",
            Topic::Other => "❓",
        }
    }

    /// Keywords used by the rule-based intent classifier.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Topic::About => &[
                "とは", "概要", "説明", "紹介", "特徴", "メリット", "どんな", "なに",
            ],
            Topic::Cases => &[
                "事例", "導入", "実績", "成功", "効果", "企業", "会社", "実例",
            ],
            Topic::Features => &[
                "機能", "操作", "使い方", "方法", "設定", "画面", "できる", "やり方",
            ],
            Topic::Pricing => &[
                "料金", "価格", "プラン", "ライセンス", "費用", "コスト", "いくら", "値段",
            ],
            Topic::Other => &["サポート", "問い合わせ", "ヘルプ", "その他", "質問", "相談"],
        }
    }

    /// Substring → specific intent label, checked in order.
    pub fn intent_patterns(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Topic::Pricing => &[
                ("比較", "pricing_comparison"),
                ("プラン", "pricing_plan"),
                ("ライセンス", "license_info"),
                ("費用", "cost_estimation"),
            ],
            Topic::Features => &[
                ("使い方", "features_howto"),
                ("設定", "features_setup"),
                ("操作", "features_operation"),
                ("画面", "features_interface"),
            ],
            Topic::Cases => &[
                ("事例", "success_stories"),
                ("導入", "implementation"),
                ("効果", "results"),
            ],
            Topic::About => &[
                ("特徴", "overview_features"),
                ("メリット", "overview_benefits"),
                ("概要", "overview_general"),
            ],
            Topic::Other => &[],
        }
    }

    /// Resolves a free-form category label (e.g. a dataset cell) to a topic.
    pub fn parse_label(label: &str) -> Option<Topic> {
        label.parse().ok()
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTopic(pub String);

impl fmt::Display for UnknownTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown topic '{}'", self.0)
    }
}

impl std::error::Error for UnknownTopic {}

impl FromStr for Topic {
    type Err = UnknownTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Topic::ALL
            .into_iter()
            .find(|t| t.id() == normalized)
            .ok_or_else(|| UnknownTopic(s.to_string()))
    }
}
