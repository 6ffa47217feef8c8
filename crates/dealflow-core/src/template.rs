//! Placeholder substitution for rule email templates.

use crate::pipeline::Lead;

/// Render an email template against a lead.
///
/// Supported placeholders are `{{name}}`, `{{firm}}`, and `{{email}}`.
/// Anything else passes through verbatim.
pub fn render(template: &str, lead: &Lead) -> String {
    template
        .replace("{{name}}", &lead.name)
        .replace("{{firm}}", &lead.firm)
        .replace("{{email}}", &lead.email)
}
