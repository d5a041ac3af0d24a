//! Turn orchestration
//!
//! - `orchestrator` drives one conversation turn through screening, model
//!   calls and tool rounds
//! - `formatter` normalizes the final answer

mod formatter;
mod orchestrator;

pub use formatter::format_response;
pub use orchestrator::{Orchestrator, TurnState};

use tera::{Context, Tera};

/// Instruction prepended to every transcript. `{{ domain }}` is replaced with
/// the configured subject.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a helpful assistant answering questions about {{ domain }} from a knowledge graph.

Use the get_ontology tool to learn the classes and properties of the graph, then
use the query_graph_database tool with a valid SPARQL query to retrieve the data.
Base every SPARQL query strictly on the provided ontology. Do not invent classes,
properties or prefixes.

When responding:
- answer the question based only on the data retrieved from the database
- never fabricate data; if the database holds no answer, say so
- if a tool returns an error, fix the query or explain what went wrong
- state that the answer comes from the database
- show the SPARQL query you used once, in a ```sparql code block
- keep sentences short and use numbered lists for several items"#;

/// Render the system prompt template with the configured domain
///
/// Falls back to the unrendered template if Tera rejects it.
pub fn render_system_prompt(template: Option<&str>, domain: &str) -> String {
    let template = template.unwrap_or(DEFAULT_SYSTEM_PROMPT);

    // If there's nothing that looks like a template, return as-is
    if !template.contains("{{") {
        return template.to_string();
    }

    let mut context = Context::new();
    context.insert("domain", domain);

    match Tera::one_off(template, &context, false) {
        Ok(rendered) => rendered,
        Err(e) => {
            tracing::warn!("Failed to render system prompt template: {}", e);
            template.to_string()
        }
    }
}
