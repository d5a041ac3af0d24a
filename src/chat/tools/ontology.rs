//! Ontology description used to ground query generation

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::sparql::{QueryResult, SparqlEndpoint};
use crate::chat::config::OntologyConfig;
use crate::chat::error::{QueryError, StoreResult};

const CLASSES_QUERY: &str = r#"PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>
PREFIX owl: <http://www.w3.org/2002/07/owl#>
SELECT DISTINCT ?class ?label ?comment WHERE {
  { ?class a owl:Class } UNION { ?class a rdfs:Class }
  FILTER(isIRI(?class) && !STRSTARTS(STR(?class), "http://www.w3.org/"))
  OPTIONAL { ?class rdfs:label ?label }
  OPTIONAL { ?class rdfs:comment ?comment }
}
ORDER BY ?class
LIMIT 500"#;

const PROPERTIES_QUERY: &str = r#"PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>
PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>
PREFIX owl: <http://www.w3.org/2002/07/owl#>
SELECT DISTINCT ?property ?kind ?domain ?range WHERE {
  VALUES ?kind { owl:ObjectProperty owl:DatatypeProperty rdf:Property }
  ?property a ?kind .
  FILTER(!STRSTARTS(STR(?property), "http://www.w3.org/"))
  OPTIONAL { ?property rdfs:domain ?domain }
  OPTIONAL { ?property rdfs:range ?range }
}
ORDER BY ?property
LIMIT 1000"#;

struct Cached {
    text: String,
    loaded_at: Instant,
}

/// Provides the ontology text, reloading it after the refresh interval
pub struct OntologyProvider {
    config: OntologyConfig,
    endpoint: Arc<dyn SparqlEndpoint>,
    cache: RwLock<Option<Cached>>,
}

impl OntologyProvider {
    pub fn new(config: OntologyConfig, endpoint: Arc<dyn SparqlEndpoint>) -> Self {
        Self {
            config,
            endpoint,
            cache: RwLock::new(None),
        }
    }

    /// Current ontology description
    pub async fn describe(&self) -> StoreResult<String> {
        let refresh = match &self.config {
            OntologyConfig::Inline { text } => return Ok(text.clone()),
            OntologyConfig::File { refresh_seconds, .. }
            | OntologyConfig::Introspect { refresh_seconds } => {
                Duration::from_secs(*refresh_seconds)
            }
        };

        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.loaded_at.elapsed() < refresh {
                return Ok(cached.text.clone());
            }
        }

        let text = self.load().await?;
        *self.cache.write().await = Some(Cached {
            text: text.clone(),
            loaded_at: Instant::now(),
        });
        Ok(text)
    }

    async fn load(&self) -> StoreResult<String> {
        match &self.config {
            OntologyConfig::Inline { text } => Ok(text.clone()),
            OntologyConfig::File { path, .. } => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| QueryError::Ontology(format!("cannot read {}: {}", path, e))),
            OntologyConfig::Introspect { .. } => {
                let classes = self.endpoint.query(CLASSES_QUERY).await?;
                let properties = self.endpoint.query(PROPERTIES_QUERY).await?;
                tracing::info!(
                    classes = classes.rows.len(),
                    properties = properties.rows.len(),
                    "Loaded ontology from graph store"
                );
                Ok(render_ontology(&classes, &properties))
            }
        }
    }
}

fn render_ontology(classes: &QueryResult, properties: &QueryResult) -> String {
    let mut out = String::from("Classes:\n");
    for row in &classes.rows {
        let Some(class) = row.get("class") else {
            continue;
        };
        let _ = write!(out, "- <{}>", class);
        if let Some(label) = row.get("label") {
            let _ = write!(out, " \"{}\"", label);
        }
        if let Some(comment) = row.get("comment") {
            let _ = write!(out, ": {}", comment);
        }
        out.push('\n');
    }

    out.push_str("\nProperties:\n");
    for row in &properties.rows {
        let Some(property) = row.get("property") else {
            continue;
        };
        let kind = row
            .get("kind")
            .and_then(|k| k.rsplit(|c| c == '#' || c == '/').next())
            .unwrap_or("Property");
        let _ = write!(out, "- <{}> ({})", property, kind);
        if let Some(domain) = row.get("domain") {
            let _ = write!(out, " domain <{}>", domain);
        }
        if let Some(range) = row.get("range") {
            let _ = write!(out, " range <{}>", range);
        }
        out.push('\n');
    }

    out
}
