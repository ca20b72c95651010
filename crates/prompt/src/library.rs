//! Category/dialect keyed system prompts.

use crate::types::{PromptDialect, QueryCategory};
use std::collections::HashMap;
use tender_core::{AppError, AppResult};

const INSTRUCTIONAL_GREETING: &str = "You are a friendly chatbot assistant for RFP (request for proposal) analysis.

Example conversations:
User: 안녕하세요
Assistant: 안녕하세요! RFP 문서 분석을 도와드릴게요. 무엇이 궁금하신가요?

User: 처음 써봐요
Assistant: 환영합니다! 제안요청서 요약과 사업 정보 검색을 도와드립니다. 어떤 사업이 궁금하신가요?

Instructions:
- Greet the user warmly in one or two sentences, like the examples
- Offer help with RFP analysis
- Keep it short and natural

Respond in Korean:";

const INSTRUCTIONAL_THANKS: &str = "You are a friendly chatbot assistant for RFP analysis.

Example conversations:
User: 고마워요
Assistant: 천만에요! RFP 관련 질문이 생기면 언제든 말씀해주세요.

User: 덕분에 정리됐어요
Assistant: 도움이 되어 기쁩니다. 다른 사업도 궁금하시면 물어봐 주세요!

Instructions:
- Reply warmly in one or two sentences, like the examples
- Offer further help
- Keep it brief and friendly

Respond in Korean:";

const INSTRUCTIONAL_DOCUMENT: &str = "You are an expert in analysing RFP documents.

Example conversations:
User: 이 사업의 예산은 얼마인가요?
Assistant: 검색된 문서에 따르면 총 사업 예산은 5억원이며, 소프트웨어 개발비 3억원과 인프라 구축비 2억원으로 구성됩니다.

User: 필수 기술 요구사항은 무엇인가요?
Assistant: 검색된 문서에서 확인할 수 없습니다. 사업명이나 기관명을 포함해 다시 질문해주세요.

Instructions:
- Answer ONLY from the reference documents
- If the answer is not in the documents, say \"검색된 문서에서 확인할 수 없습니다\"
- Include concrete details (names, amounts, dates) like the examples
- Be professional and precise

Respond in Korean:";

const INSTRUCTIONAL_OUT_OF_SCOPE: &str = "You are a helpful assistant dedicated to RFP analysis.

Example conversations:
User: 오늘 날씨 어때?
Assistant: 죄송하지만 날씨 정보는 제공하지 않습니다. 저는 RFP 문서 분석과 공공조달 정보 검색을 도와드려요. RFP 관련 질문이 있으시면 말씀해주세요!

User: 주식 추천해줘
Assistant: 투자 관련 조언은 드리기 어렵습니다. 대신 입찰 문서 요약이나 사업 비교는 도와드릴 수 있어요.

Instructions:
- Politely decline in two or three sentences, like the examples
- Briefly say what you CAN help with
- Invite RFP-related questions
- Stay friendly and professional

Respond in Korean:";

const NATIVE_GREETING: &str = "당신은 친절한 RFP 분석 챗봇입니다.

대화 예시:
사용자: 안녕하세요
어시스턴트: 안녕하세요! RFP 문서 분석을 도와드릴게요. 무엇이 궁금하신가요?

지침:
- 1-2문장으로 따뜻하게 인사하세요
- RFP 분석 도움을 제안하세요

한국어로 답변:";

const NATIVE_THANKS: &str = "당신은 친절한 RFP 분석 챗봇입니다.

대화 예시:
사용자: 고마워요
어시스턴트: 천만에요! RFP 관련 질문이 생기면 언제든 말씀해주세요.

지침:
- 1-2문장으로 짧고 친근하게 답변하세요
- 계속 도울 의향을 표현하세요

한국어로 답변:";

const NATIVE_DOCUMENT: &str = "당신은 RFP 분석 전문가입니다.

대화 예시:
사용자: 이 사업의 예산은 얼마인가요?
어시스턴트: 검색된 문서에 따르면 총 사업 예산은 5억원입니다.

지침:
- 참고 문서 내용만으로 답변하세요
- 문서에 없으면 \"검색된 문서에서 확인할 수 없습니다\"라고 말하세요
- 이름, 금액, 날짜 같은 구체적인 정보를 포함하세요

한국어로 답변:";

const NATIVE_OUT_OF_SCOPE: &str = "당신은 RFP 분석 전용 어시스턴트입니다.

대화 예시:
사용자: 오늘 날씨 어때?
어시스턴트: 죄송하지만 날씨 정보는 제공하지 않습니다. RFP 문서 분석과 공공조달 정보 검색을 도와드릴 수 있어요!

지침:
- 2-3문장으로 정중하게 거절하세요
- 도울 수 있는 일을 간단히 알려주세요
- RFP 관련 질문을 유도하세요

한국어로 답변:";

/// Built-in prompt text for a category in a dialect.
pub fn builtin_prompt(category: QueryCategory, dialect: PromptDialect) -> &'static str {
    match (dialect, category) {
        (PromptDialect::Instructional, QueryCategory::Greeting) => INSTRUCTIONAL_GREETING,
        (PromptDialect::Instructional, QueryCategory::Thanks) => INSTRUCTIONAL_THANKS,
        (PromptDialect::Instructional, QueryCategory::Document) => INSTRUCTIONAL_DOCUMENT,
        (PromptDialect::Instructional, QueryCategory::OutOfScope) => INSTRUCTIONAL_OUT_OF_SCOPE,
        (PromptDialect::Native, QueryCategory::Greeting) => NATIVE_GREETING,
        (PromptDialect::Native, QueryCategory::Thanks) => NATIVE_THANKS,
        (PromptDialect::Native, QueryCategory::Document) => NATIVE_DOCUMENT,
        (PromptDialect::Native, QueryCategory::OutOfScope) => NATIVE_OUT_OF_SCOPE,
    }
}

/// System prompts keyed by `(category, dialect)`.
///
/// Starts from the built-in table; a YAML pack (see [`crate::loader`]) may
/// replace entries. Every dialect always covers every category.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    prompts: HashMap<(QueryCategory, PromptDialect), String>,
}

impl PromptLibrary {
    /// Library holding only the built-in prompts.
    pub fn builtin() -> Self {
        let mut prompts = HashMap::new();
        for dialect in PromptDialect::ALL {
            for category in QueryCategory::ALL {
                prompts.insert(
                    (category, dialect),
                    builtin_prompt(category, dialect).to_string(),
                );
            }
        }
        Self { prompts }
    }

    /// Typed lookup. Cannot miss because the table is complete.
    pub fn prompt(&self, category: QueryCategory, dialect: PromptDialect) -> &str {
        self.prompts
            .get(&(category, dialect))
            .map(String::as_str)
            .unwrap_or_else(|| builtin_prompt(category, dialect))
    }

    /// Lookup by category name, as a classifier or CLI would supply it.
    pub fn get_prompt(&self, category: &str, dialect: PromptDialect) -> AppResult<&str> {
        let parsed = QueryCategory::parse(category).ok_or_else(|| AppError::UnknownCategory {
            category: category.to_string(),
            dialect: dialect.to_string(),
        })?;
        Ok(self.prompt(parsed, dialect))
    }

    /// Replace the prompt for one `(category, dialect)` pair.
    pub fn set_prompt(
        &mut self,
        category: QueryCategory,
        dialect: PromptDialect,
        text: impl Into<String>,
    ) {
        self.prompts.insert((category, dialect), text.into());
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tender_core::ErrorKind;

    #[test]
    fn test_every_dialect_covers_every_category() {
        let library = PromptLibrary::builtin();
        for dialect in PromptDialect::ALL {
            for category in QueryCategory::ALL {
                assert!(!library.prompt(category, dialect).is_empty());
            }
        }
    }

    #[test]
    fn test_dialects_differ() {
        let library = PromptLibrary::builtin();
        let verbose = library.prompt(QueryCategory::Document, PromptDialect::Instructional);
        let terse = library.prompt(QueryCategory::Document, PromptDialect::Native);

        assert!(verbose.contains("Instructions:"));
        assert!(terse.contains("지침:"));
        assert!(terse.len() < verbose.len());
    }

    #[test]
    fn test_get_prompt_by_name() {
        let library = PromptLibrary::builtin();
        let prompt = library
            .get_prompt("out_of_scope", PromptDialect::Instructional)
            .unwrap();
        assert!(prompt.contains("Politely decline"));
    }

    #[test]
    fn test_get_prompt_unknown_category() {
        let library = PromptLibrary::builtin();
        let err = library
            .get_prompt("weather", PromptDialect::Native)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UnknownCategory);
        assert!(err.to_string().contains("weather"));
        assert!(err.to_string().contains("native"));
    }

    #[test]
    fn test_document_prompt_demands_grounding() {
        let library = PromptLibrary::builtin();
        for dialect in PromptDialect::ALL {
            let prompt = library.prompt(QueryCategory::Document, dialect);
            assert!(prompt.contains("검색된 문서에서 확인할 수 없습니다"));
        }
    }

    #[test]
    fn test_set_prompt_overrides_single_entry() {
        let mut library = PromptLibrary::builtin();
        library.set_prompt(QueryCategory::Thanks, PromptDialect::Native, "감사 인사에 답하세요.");

        assert_eq!(
            library.prompt(QueryCategory::Thanks, PromptDialect::Native),
            "감사 인사에 답하세요."
        );
        assert_eq!(
            library.prompt(QueryCategory::Thanks, PromptDialect::Instructional),
            builtin_prompt(QueryCategory::Thanks, PromptDialect::Instructional)
        );
    }
}
