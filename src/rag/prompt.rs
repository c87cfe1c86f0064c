use crate::db::models::Document;

const CONTEXT_HEADER: &str = "Context information is below.";
const RULE: &str = "---------------------";
const QUERY_INSTRUCTION: &str =
    "Given the context information and no prior knowledge, answer the following query:";
const GROUNDING_INSTRUCTION: &str = "If the context doesn't contain relevant information to answer the query, say so. Do not make up information that is not supported by the context.";

/// Renders one retrieved chunk as a context entry. The source suffix is
/// left out when the chunk has no source.
fn render_document(doc: &Document) -> String {
    let source = doc.metadata.source.trim();
    if source.is_empty() {
        format!("---\n{}\n", doc.content)
    } else {
        format!("---\n{} (from {source})\n", doc.content)
    }
}

/// Builds the grounded prompt handed to the generation step.
///
/// The wording is a contract with the downstream model: it must answer
/// only from the supplied context and say so when the context is
/// insufficient. An empty `documents` slice still yields the full template.
pub fn build_prompt(query: &str, documents: &[Document]) -> String {
    let context = documents
        .iter()
        .map(render_document)
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "\n{CONTEXT_HEADER}\n{RULE}\n{context}\n{RULE}\n{QUERY_INSTRUCTION}\n{query}\n\n{GROUNDING_INSTRUCTION}\n"
    )
}
