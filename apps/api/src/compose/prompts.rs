use crate::models::Topic;

/// Grounding rules shared by every topic persona.
pub const BASE_SYSTEM_PROMPT: &str = "\
あなたはPIP-Makerの専門カスタマーサポートAIです。
以下のルールに従って回答してください：

1. 提供されたコンテキスト情報のみを使用してください
2. 情報が不足している場合は正直に「情報が不足している」と伝えてください
3. 丁寧で分かりやすい日本語で回答してください
4. PIP-Makerの製品に関する専門的な質問に答えてください
5. 不確実な情報は提供せず、確認を促してください
6. 回答は簡潔で実用的にしてください
";

fn persona(topic: Topic) -> &'static str {
    match topic {
        Topic::About => "\
あなたはPIP-Makerの概要説明の専門家です。
- PIP-Makerの基本的な特徴と概要を分かりやすく説明してください
- 技術的な詳細よりも、ユーザーメリットに焦点を当ててください
- 具体的な事例やベネフィットを含めて回答してください
",
        Topic::Cases => "\
あなたはPIP-Makerの導入事例の専門家です。
- 実際の導入事例と成功例を具体的に説明してください
- 業界別の活用方法や効果を含めて回答してください
- 数値や具体的な成果があれば積極的に含めてください
",
        Topic::Features => "\
あなたはPIP-Makerの機能説明の専門家です。
- 具体的な機能と操作方法を段階的に説明してください
- 実際の使用場面を想定した説明を心がけてください
- 設定方法や注意点があれば含めてください
",
        Topic::Pricing => "\
あなたはPIP-Makerの料金・ライセンスの専門家です。
- 料金体系を明確に説明してください
- ライセンス条件や制限事項を正確に伝えてください
- コスト面でのメリットがあれば含めてください
",
        Topic::Other => "\
あなたはPIP-Makerの総合サポート担当です。
- ユーザーの質問に対して適切なサポート情報を提供してください
- 不明な点があれば正直に伝えて、適切な問い合わせ先を案内してください
- 丁寧で親切な対応を心がけてください
",
    }
}

/// Base rules followed by the persona for `topic`.
pub fn system_prompt(topic: Topic) -> String {
    format!("{BASE_SYSTEM_PROMPT}\n{}", persona(topic))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_topic_prompt_keeps_base_rules() {
        for topic in Topic::ALL {
            let prompt = system_prompt(topic);
            assert!(prompt.starts_with(BASE_SYSTEM_PROMPT));
            assert!(prompt.len() > BASE_SYSTEM_PROMPT.len());
        }
    }
}
