// Shared prompt constants for the AI backend.
// Answer-composition personas live with the composer (compose/prompts.rs).

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Intent classification prompt. `{question}` is replaced with the user text.
pub const CLASSIFY_PROMPT_TEMPLATE: &str = "\
以下の質問を分析して、最も適切なカテゴリーと具体的な意図を特定してください。

質問: {question}

カテゴリー選択肢:
- about: PIP-Makerの概要、特徴、メリット
- cases: 導入事例、成功事例、実績
- features: 機能、操作方法、使い方
- pricing: 料金、価格、プラン、ライセンス
- other: その他、サポート、FAQ

具体的意図の例:
- pricing_plan: プラン詳細
- pricing_comparison: 料金比較
- features_howto: 使い方
- features_setup: 設定方法

次のJSON形式で回答してください:
{\"category\": \"選択したカテゴリー\", \"specific_intent\": \"具体的意図\", \"confidence\": 0.0から1.0の信頼度, \"keywords\": [\"抽出したキーワード\"]}";

/// Answer prompt. `{question}` and `{contexts}` are replaced.
pub const ANSWER_PROMPT_TEMPLATE: &str = "\
ユーザーの質問: {question}

関連するコンテキスト情報:
{contexts}

上記の情報を参考に、ユーザーの質問に適切に回答してください。
コンテキスト情報にない内容については言及せず、「詳細については担当者にお問い合わせください」と案内してください。";
