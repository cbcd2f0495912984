//! Knowledge-base search tool

use chameleon_config::KnowledgeConfig;
use chameleon_knowledge::{fallback_context, format_context, KnowledgeRetriever};

use super::required;
use crate::state::{ActionRequest, AgentState, ErrorKind, Observation};

/// Retrieve, render, and remember the rendered context on success
pub(crate) async fn search(
    retriever: &KnowledgeRetriever,
    config: &KnowledgeConfig,
    action: &ActionRequest,
    state: &mut AgentState,
) -> Observation {
    let query = match required(action, "query") {
        Ok(query) => query,
        Err(message) => return Observation::failure(ErrorKind::InvalidArguments, message),
    };

    let top_k = match action.arg("top_k") {
        Some(raw) => match raw.parse::<usize>() {
            Ok(n) => n,
            Err(_) => {
                return Observation::failure(
                    ErrorKind::InvalidArguments,
                    format!("Argument 'top_k' must be a positive integer, got '{}'", raw),
                )
            }
        },
        None => config.top_k,
    };

    let retrieval = retriever.retrieve(query, top_k, config.min_relevance).await;
    if retrieval.degraded {
        return Observation::failure(ErrorKind::RetrievalUnavailable, fallback_context());
    }

    let content = format_context(&retrieval.documents, config.max_context_length);
    state.append_knowledge(query, content.clone());
    Observation::ok(content)
}
