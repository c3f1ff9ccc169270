//! DF-008: Plan generation, showing what `apply` would create.

use super::error::{DropformError, Result};
use super::extractor::ExtractionResult;
use super::types::*;
use crate::tripwire::hasher;

/// Build the plan for an extraction. Needs a droplet resource; no network.
pub fn plan(extraction: &ExtractionResult, existing: Option<ResourceRecord>) -> Result<DropletPlan> {
    if extraction.resource.is_empty() {
        return Err(DropformError::MissingResource);
    }

    Ok(DropletPlan {
        label: extraction
            .resource_label
            .clone()
            .unwrap_or_else(|| "droplet".to_string()),
        attributes: extraction.resource.clone(),
        fingerprint: hasher::hash_config(&extraction.resource),
        missing: missing_attributes(&extraction.resource),
        existing,
    })
}

/// Required attributes absent from a resource config, in canonical order.
pub fn missing_attributes(config: &ResourceConfig) -> Vec<String> {
    REQUIRED_ATTRIBUTES
        .iter()
        .filter(|k| !config.contains_key(**k))
        .map(|k| k.to_string())
        .collect()
}

/// Render a plan for the terminal.
pub fn render(plan: &DropletPlan) -> String {
    let mut out = String::new();
    out.push_str("Plan mode: showing what would be created:\n\n");
    out.push_str(&format!("  + {}.{}\n", SUPPORTED_RESOURCE, plan.label));
    let width = plan.attributes.keys().map(String::len).max().unwrap_or(0);
    for (k, v) in &plan.attributes {
        out.push_str(&format!("      {:width$} = \"{}\"\n", k, v, width = width));
    }
    out.push_str(&format!("\n  fingerprint: {}\n", plan.fingerprint));

    if !plan.missing.is_empty() {
        out.push_str(&format!(
            "  warning: missing required attribute(s): {} (apply will fail)\n",
            plan.missing.join(", ")
        ));
    }
    if let Some(ref r) = plan.existing {
        out.push_str(&format!(
            "  note: droplet {} ({}) is already recorded; apply will create another\n",
            r.id, r.ip
        ));
    }

    out.push_str("\nPlan: 1 to add, 0 to change, 0 to destroy.\n");
    out
}
