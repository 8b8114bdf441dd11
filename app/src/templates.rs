//! HTML templates for notification mail.
//!
//! Placeholders are written `{{Name}}` (or `{{.Name}}`) and are replaced by
//! the HTML-escaped value of the matching variable. A placeholder with no
//! matching variable is a render error rather than an empty string, so a
//! confirmation never goes out half-filled.

use hotel_booking_core::notification::{NotificationError, Renderer, TemplateVars};
use hotel_booking_runtime::dispatcher::DEFAULT_TEMPLATE;
use std::collections::HashMap;
use std::path::Path;

const BOOKING_CONFIRMATION: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Booking confirmation</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        <h2 style="color: #2563eb;">Your booking is confirmed</h2>
        <p>Hello {{UserName}},</p>
        <p>Thank you for your reservation. Booking number <strong>{{BookingID}}</strong> is confirmed.</p>
        <p>Total amount: <strong>{{Amount}}</strong></p>
        <p style="color: #666; font-size: 12px; margin-top: 40px;">
            This message was sent to {{UserEmail}}.
        </p>
    </div>
</body>
</html>
"#;

/// In-memory template set implementing [`Renderer`].
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    templates: HashMap<String, String>,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new().with_template(DEFAULT_TEMPLATE, BOOKING_CONFIRMATION)
    }
}

impl TemplateRenderer {
    /// Create a renderer with no templates.
    #[must_use]
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Add or replace a template.
    #[must_use]
    pub fn with_template(mut self, id: impl Into<String>, body: impl Into<String>) -> Self {
        self.templates.insert(id.into(), body.into());
        self
    }

    /// Add every `<name>.html` file in `dir` as template `<name>`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory or a template file cannot be read.
    pub fn load_dir(mut self, dir: &Path) -> std::io::Result<Self> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("html") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let body = std::fs::read_to_string(&path)?;
            tracing::debug!(template = name, path = %path.display(), "Loaded template");
            self.templates.insert(name.to_string(), body);
        }
        Ok(self)
    }

    /// Whether a template is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.templates.contains_key(id)
    }
}

impl Renderer for TemplateRenderer {
    fn render(&self, template_id: &str, vars: &TemplateVars) -> Result<String, NotificationError> {
        let template = self
            .templates
            .get(template_id)
            .ok_or_else(|| render_error(template_id, "unknown template"))?;
        substitute(template, vars).map_err(|reason| render_error(template_id, &reason))
    }
}

fn render_error(template: &str, reason: &str) -> NotificationError {
    NotificationError::Render {
        template: template.to_string(),
        reason: reason.to_string(),
    }
}

fn substitute(template: &str, vars: &TemplateVars) -> Result<String, String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| "unterminated placeholder".to_string())?;

        let key = after[..end].trim();
        let key = key.strip_prefix('.').unwrap_or(key);
        let value = vars
            .get(key)
            .ok_or_else(|| format!("missing variable '{key}'"))?;
        escape_into(&mut out, value);

        rest = &after[end + 2..];
    }

    out.push_str(rest);
    Ok(out)
}

fn escape_into(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> TemplateVars {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn substitutes_both_placeholder_forms() {
        let renderer = TemplateRenderer::new().with_template("t", "Hi {{Name}}, id {{ .Id }}!");
        let body = renderer
            .render("t", &vars(&[("Name", "Ada"), ("Id", "7")]))
            .unwrap();
        assert_eq!(body, "Hi Ada, id 7!");
    }

    #[test]
    fn escapes_values() {
        let renderer = TemplateRenderer::new().with_template("t", "<p>{{Name}}</p>");
        let body = renderer
            .render("t", &vars(&[("Name", "<b>Tom & \"Jerry\"</b>")]))
            .unwrap();
        assert_eq!(body, "<p>&lt;b&gt;Tom &amp; &#34;Jerry&#34;&lt;/b&gt;</p>");
    }

    #[test]
    fn unknown_template_is_render_error() {
        let err = TemplateRenderer::new().render("missing", &vars(&[])).unwrap_err();
        assert_eq!(err, render_error("missing", "unknown template"));
    }

    #[test]
    fn missing_variable_is_render_error() {
        let renderer = TemplateRenderer::new().with_template("t", "{{Name}}");
        let err = renderer.render("t", &vars(&[])).unwrap_err();
        assert!(err.to_string().contains("missing variable 'Name'"));
    }

    #[test]
    fn unterminated_placeholder_is_render_error() {
        let renderer = TemplateRenderer::new().with_template("t", "Hi {{Name");
        assert!(renderer.render("t", &vars(&[("Name", "Ada")])).is_err());
    }

    #[test]
    fn builtin_confirmation_renders() {
        let renderer = TemplateRenderer::default();
        assert!(renderer.contains("booking_confirmation"));

        let body = renderer
            .render(
                "booking_confirmation",
                &vars(&[
                    ("UserName", "Ada Lovelace"),
                    ("BookingID", "42"),
                    ("UserEmail", "ada@example.com"),
                    ("Amount", "300.00"),
                ]),
            )
            .unwrap();
        assert!(body.contains("Hello Ada Lovelace,"));
        assert!(body.contains("<strong>42</strong>"));
        assert!(body.contains("<strong>300.00</strong>"));
        assert!(!body.contains("{{"));
    }

    #[test]
    fn loads_html_files_from_a_directory() {
        let dir = std::env::temp_dir().join(format!("templates-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("reminder.html"), "See you, {{UserName}}").unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let renderer = TemplateRenderer::default().load_dir(&dir).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert!(renderer.contains("reminder"));
        assert!(!renderer.contains("notes"));
        assert!(renderer.contains("booking_confirmation"));
        assert_eq!(
            renderer.render("reminder", &vars(&[("UserName", "Ada")])).unwrap(),
            "See you, Ada"
        );
    }
}
