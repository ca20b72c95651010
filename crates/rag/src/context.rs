//! Context assembly for document answers.

use crate::types::RetrievedDocument;

/// Context used when retrieval returns nothing, so the model is never
/// handed an empty reference section.
pub const NO_DOCUMENTS_SENTINEL: &str = "관련 문서를 찾을 수 없습니다.";

/// Render documents as numbered blocks in retrieval order.
///
/// Each block is `[Document N]\n{content}\n`; blocks are joined by a newline.
pub fn format_context(documents: &[RetrievedDocument]) -> String {
    if documents.is_empty() {
        return NO_DOCUMENTS_SENTINEL.to_string();
    }

    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| format!("[Document {}]\n{}\n", i + 1, doc.content))
        .collect::<Vec<_>>()
        .join("\n")
}
