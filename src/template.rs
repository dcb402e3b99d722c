//! Message and fingerprint templates
//!
//! Templates are compiled once at startup and shared read-only for every
//! alert. The registry runs in non-strict mode, so a field that is missing
//! from an alert renders as an empty string instead of failing the render.

use handlebars::Handlebars;
use tracing::warn;

use crate::Alert;

/// Template applied when neither `--template` nor the environment provides one.
pub const DEFAULT_TEMPLATE: &str =
    "{{labels.alertname}} - {{labels.instance}}\n{{annotations.description}}";

const MESSAGE_TEMPLATE: &str = "message";

/// Compiled message and fingerprint templates.
///
/// The alert is the template context, so `{{labels.alertname}}`,
/// `{{annotations.description}}`, `{{status}}`, `{{startsAt}}` and
/// `{{endsAt}}` are all addressable.
pub struct Renderer {
    registry: Handlebars<'static>,
    fingerprint_count: usize,
}

impl Renderer {
    /// Compile the message template and every fingerprint template.
    ///
    /// A template that does not parse is a startup error; nothing is
    /// recompiled afterwards.
    pub fn new(
        message_template: &str,
        fingerprint_templates: &[String],
    ) -> Result<Self, handlebars::TemplateError> {
        let mut registry = Handlebars::new();
        registry.register_template_string(MESSAGE_TEMPLATE, message_template)?;

        for (index, template) in fingerprint_templates.iter().enumerate() {
            registry.register_template_string(&fingerprint_name(index), template)?;
        }

        Ok(Self {
            registry,
            fingerprint_count: fingerprint_templates.len(),
        })
    }

    /// Render the event message for one alert.
    ///
    /// A render failure is returned to the caller, which skips that alert's
    /// delivery.
    pub fn message(&self, alert: &Alert) -> Result<String, handlebars::RenderError> {
        self.registry.render(MESSAGE_TEMPLATE, alert)
    }

    /// Render every fingerprint template against one alert.
    ///
    /// A failing template is logged and its piece omitted; the remaining
    /// pieces are still produced.
    pub fn fingerprint(&self, alert: &Alert) -> Vec<String> {
        let mut fingerprint = Vec::with_capacity(self.fingerprint_count);

        for index in 0..self.fingerprint_count {
            match self.registry.render(&fingerprint_name(index), alert) {
                Ok(piece) => fingerprint.push(piece),
                Err(e) => {
                    warn!("fingerprint template {index} failed for {}: {e}", alert.name());
                }
            }
        }

        fingerprint
    }
}

fn fingerprint_name(index: usize) -> String {
    format!("fingerprint.{index}")
}
