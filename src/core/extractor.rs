//! DF-005: Block extraction.
//!
//! Walks the block tree once, in document order, and returns the symbol
//! table, the raw provider token expression, and the droplet attribute map.
//! Pure: no I/O, no resolution.

use super::error::{DropformError, Result};
use super::parser::{Attribute, Block, Document};
use super::symbols::SymbolTable;
use super::types::{ResourceConfig, SUPPORTED_PROVIDER, SUPPORTED_RESOURCE};

/// Everything extraction learns from a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    /// Variable defaults
    pub symbols: SymbolTable,

    /// Unresolved `token` text of the provider block (last one wins)
    pub provider_token: Option<String>,

    /// Droplet attributes, quote-stripped
    pub resource: ResourceConfig,

    /// Label of the last droplet resource block seen
    pub resource_label: Option<String>,

    /// Number of droplet resource blocks merged into `resource`
    pub resource_blocks: usize,

    /// Number of provider blocks seen
    pub provider_blocks: usize,

    /// `kind.name` of resource blocks skipped for an unsupported kind
    pub skipped_resources: Vec<String>,

    /// Droplet attributes assigned more than once, as `key (line N)` for
    /// each later assignment
    pub overridden_attributes: Vec<String>,
}

/// Strip surrounding double quotes from raw source text.
pub fn strip_quotes(raw: &str) -> &str {
    raw.trim_matches('"')
}

/// Extract configuration from a parsed document.
pub fn extract(doc: &Document) -> Result<ExtractionResult> {
    let mut out = ExtractionResult::default();

    for block in &doc.blocks {
        match block {
            Block::Variable { name, body } => {
                if let Some(default) = find(body, "default") {
                    out.symbols
                        .define(strip_quotes(name), strip_quotes(&default.expr));
                }
            }
            Block::Provider { name, body } => {
                let name = strip_quotes(name);
                if name != SUPPORTED_PROVIDER {
                    return Err(DropformError::UnsupportedProvider(name.to_string()));
                }
                out.provider_blocks += 1;
                if let Some(token) = find(body, "token") {
                    out.provider_token = Some(token.expr.clone());
                }
            }
            Block::Resource { kind, name, body } => {
                let kind = strip_quotes(kind);
                let name = strip_quotes(name);
                if kind != SUPPORTED_RESOURCE {
                    out.skipped_resources.push(format!("{}.{}", kind, name));
                    continue;
                }
                out.resource_blocks += 1;
                out.resource_label = Some(name.to_string());
                for attr in body {
                    let previous = out
                        .resource
                        .insert(attr.key.clone(), strip_quotes(&attr.expr).to_string());
                    if previous.is_some() {
                        out.overridden_attributes
                            .push(format!("{} (line {})", attr.key, attr.line));
                    }
                }
            }
        }
    }

    Ok(out)
}

/// Last attribute with the given key (later assignments win).
fn find<'a>(body: &'a [Attribute], key: &str) -> Option<&'a Attribute> {
    body.iter().rev().find(|a| a.key == key)
}
