//! DF-006: Reference resolution.
//!
//! Turns the provider's raw `token` expression into a concrete secret:
//! `var.<name>` looks up the symbol table (one hop only), anything else is
//! a literal with its quotes stripped.

use super::error::{DropformError, Result};
use super::extractor::strip_quotes;
use super::symbols::SymbolTable;
use super::types::ResolvedToken;

const VAR_PREFIX: &str = "var.";

/// Resolve a raw expression against the symbol table.
pub fn resolve(expr: Option<&str>, symbols: &SymbolTable) -> Result<ResolvedToken> {
    let expr = match expr {
        Some(e) if !e.is_empty() => e,
        _ => return Err(DropformError::NoTokenConfigured),
    };

    if let Some(rest) = expr.strip_prefix(VAR_PREFIX) {
        // `var.a.b` refers to `a`
        let name = rest.split('.').next().unwrap_or_default();
        return symbols
            .get(name)
            .map(ResolvedToken::new)
            .ok_or_else(|| DropformError::UndefinedVariable(name.to_string()));
    }

    Ok(ResolvedToken::new(strip_quotes(expr)))
}
