//! # openapi-inspect
//!
//! Reading a document from disk and rendering its resolved routes and
//! components as text.

use anyhow::{Context, Result};
use openapi_loader::{DocumentLoader, ExternalDocument, LoaderSettings};
use openapi_model::{
    ComponentKind, Document, DocumentParser, ResolvedDocument, ResolvedEndpoint,
};
use std::fmt::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// Read and parse a document, optionally loading its external references
pub async fn load_document(
    path: &Path,
    settings: &LoaderSettings,
    external: bool,
) -> Result<Document> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let document = DocumentParser::parse(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    info!(
        "Loaded '{}' ({} paths) from {}",
        document.info.title,
        document.paths.len(),
        path.display()
    );

    if !external {
        return Ok(document);
    }

    let absolute = std::path::absolute(path)?;
    let base = Url::from_file_path(&absolute)
        .map_err(|_| anyhow::anyhow!("Cannot build a file URL for {}", absolute.display()))?;
    let loader = Arc::new(DocumentLoader::new(settings)?);
    let (document, messages) = document
        .externally_dereferenced(loader, settings, Some(base))
        .await?;
    for message in &messages {
        warn!("{}", message);
    }
    Ok(document)
}

/// One block per endpoint: method and path, then parameters, servers and security
pub fn render_routes(resolved: &ResolvedDocument) -> String {
    let mut out = String::new();
    for endpoint in resolved.endpoints() {
        render_endpoint(&mut out, endpoint);
    }
    out
}

fn render_endpoint(out: &mut String, endpoint: &ResolvedEndpoint) {
    let _ = write!(out, "{} {}", endpoint.method, endpoint.path);
    if let Some(summary) = endpoint.summary.as_ref().or(endpoint.route_summary.as_ref()) {
        let _ = write!(out, "  ({})", summary);
    }
    if endpoint.deprecated {
        out.push_str(" [deprecated]");
    }
    out.push('\n');

    for parameter in &endpoint.parameters {
        let _ = writeln!(
            out,
            "  param {} in {}{}",
            parameter.name,
            parameter.location,
            if parameter.required { " (required)" } else { "" }
        );
    }
    for server in &endpoint.servers {
        let _ = writeln!(out, "  server {}", server.url);
    }
    if endpoint.security.is_empty() {
        out.push_str("  security none\n");
    }
    for requirement in &endpoint.security {
        let schemes: Vec<String> = requirement
            .iter()
            .map(|(name, scoped)| {
                if scoped.scopes.is_empty() {
                    name.to_string()
                } else {
                    format!("{}[{}]", name, scoped.scopes.join(","))
                }
            })
            .collect();
        let _ = writeln!(out, "  security {}", schemes.join(" + "));
    }
}

/// Component names grouped by kind, skipping empty kinds
pub fn render_components(document: &Document) -> String {
    let mut out = String::new();
    for kind in ComponentKind::ALL {
        let names = document.components.names(kind);
        if names.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{}:", kind);
        for name in names {
            let _ = writeln!(out, "  {}", name);
        }
    }
    out
}
