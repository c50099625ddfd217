use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lead::Lead;
use crate::types::{TemplateId, TenantId};

/// A reusable message template rendered against lead fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub id: TemplateId,
    pub tenant: TenantId,
    pub name: String,
    pub subject: String,
    pub body_html: String,
    pub body_text: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MessageTemplate {
    /// Create an active template.
    #[must_use]
    pub fn new(
        id: impl Into<TemplateId>,
        tenant: impl Into<TenantId>,
        name: impl Into<String>,
        subject: impl Into<String>,
        body_html: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            tenant: tenant.into(),
            name: name.into(),
            subject: subject.into(),
            body_html: body_html.into(),
            body_text: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set a plain-text body.
    #[must_use]
    pub fn with_body_text(mut self, text: impl Into<String>) -> Self {
        self.body_text = Some(text.into());
        self
    }
}

/// Build the substitution variables a lead exposes to templates.
///
/// Absent optional fields render as empty strings.
#[must_use]
pub fn lead_variables(lead: &Lead) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    vars.insert("first_name".to_owned(), lead.first_name.clone());
    vars.insert(
        "last_name".to_owned(),
        lead.last_name.clone().unwrap_or_default(),
    );
    vars.insert("email".to_owned(), lead.email.clone().unwrap_or_default());
    vars.insert("phone".to_owned(), lead.phone.clone().unwrap_or_default());
    vars
}

/// Substitute `{{ field }}` placeholders in `template`.
///
/// Whitespace inside the braces is tolerated. Placeholders naming a
/// field not present in `variables` are left verbatim, as are unclosed
/// `{{` sequences.
#[must_use]
pub fn render_template(template: &str, variables: &HashMap<String, String>) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        let Some(end) = rest[start + 2..].find("}}") else {
            break;
        };
        let name = rest[start + 2..start + 2 + end].trim();

        result.push_str(&rest[..start]);
        if let Some(value) = variables.get(name) {
            result.push_str(value);
        } else {
            // Unknown field: keep the placeholder as written.
            result.push_str(&rest[start..start + 2 + end + 2]);
        }
        rest = &rest[start + 2 + end + 2..];
    }

    result.push_str(rest);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> HashMap<String, String> {
        let mut v = HashMap::new();
        v.insert("first_name".to_owned(), "Ada".to_owned());
        v.insert("last_name".to_owned(), "Lovelace".to_owned());
        v.insert("email".to_owned(), "ada@example.com".to_owned());
        v
    }

    #[test]
    fn substitutes_fields() {
        let out = render_template("Hi {{first_name}} {{last_name}}!", &vars());
        assert_eq!(out, "Hi Ada Lovelace!");
    }

    #[test]
    fn tolerates_whitespace_in_braces() {
        let out = render_template("Hi {{ first_name }}", &vars());
        assert_eq!(out, "Hi Ada");
    }

    #[test]
    fn unknown_placeholder_left_verbatim() {
        let out = render_template("Hi {{nickname}}, meet {{first_name}}", &vars());
        assert_eq!(out, "Hi {{nickname}}, meet Ada");
    }

    #[test]
    fn unclosed_braces_left_verbatim() {
        let out = render_template("broken {{first_name", &vars());
        assert_eq!(out, "broken {{first_name");
    }

    #[test]
    fn repeated_placeholder_replaced_each_time() {
        let out = render_template("{{first_name}} and {{first_name}}", &vars());
        assert_eq!(out, "Ada and Ada");
    }

    #[test]
    fn lead_variables_default_empty() {
        let lead = crate::lead::Lead::new("l1", "org", "Ada");
        let vars = lead_variables(&lead);
        assert_eq!(vars["first_name"], "Ada");
        assert_eq!(vars["last_name"], "");
        assert_eq!(vars["phone"], "");
    }

    #[test]
    fn no_placeholders_passthrough() {
        let out = render_template("plain text", &vars());
        assert_eq!(out, "plain text");
    }
}
