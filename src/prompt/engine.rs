use crate::error::PromptError;
use tera::Tera;

/// Tera-backed template engine for model instructions.
pub struct TeraEngine {
    tera: Tera,
}

impl TeraEngine {
    /// Empty engine; templates are registered from strings.
    pub fn new() -> Self {
        Self {
            tera: Tera::default(),
        }
    }

    /// Register a template from a string, replacing any previous one.
    pub fn add_template(&mut self, name: &str, content: &str) -> Result<(), PromptError> {
        self.tera
            .add_raw_template(name, content)
            .map_err(|e| PromptError::Render(format!("{name}: {e}")))
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    /// Render a named template with the given context.
    pub fn render(&self, name: &str, context: &tera::Context) -> Result<String, PromptError> {
        if !self.has_template(name) {
            return Err(PromptError::NotFound(name.to_string()));
        }
        self.tera
            .render(name, context)
            .map_err(|e| PromptError::Render(render_error_chain(name, &e)))
    }
}

impl Default for TeraEngine {
    fn default() -> Self {
        Self::new()
    }
}

// Tera's top-level error only says "Failed to render"; the cause is nested.
fn render_error_chain(name: &str, err: &tera::Error) -> String {
    let mut message = format!("{name}: {err}");
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use tera::Context;

    #[test]
    fn missing_template_is_not_found() {
        let engine = TeraEngine::new();
        let err = engine.render("nonexistent", &Context::new()).unwrap_err();
        assert!(matches!(err, PromptError::NotFound(name) if name == "nonexistent"));
    }

    #[test]
    fn add_template_and_render() {
        let mut engine = TeraEngine::new();
        engine.add_template("greeting", "Hello, {{ name }}!").unwrap();

        let mut ctx = Context::new();
        ctx.insert("name", "World");
        assert_eq!(engine.render("greeting", &ctx).unwrap(), "Hello, World!");
    }

    #[test]
    fn missing_variable_reports_cause() {
        let mut engine = TeraEngine::new();
        engine.add_template("greeting", "Hello, {{ name }}!").unwrap();

        let err = engine.render("greeting", &Context::new()).unwrap_err();
        assert!(matches!(err, PromptError::Render(msg) if msg.contains("name")));
    }

    #[test]
    fn add_template_replaces_existing() {
        let mut engine = TeraEngine::new();
        engine.add_template("t", "version 1").unwrap();
        engine.add_template("t", "version 2").unwrap();
        assert_eq!(engine.render("t", &Context::new()).unwrap(), "version 2");
    }

    #[test]
    fn invalid_syntax_is_rejected() {
        let mut engine = TeraEngine::new();
        assert!(engine.add_template("bad", "{% if %}").is_err());
    }

    #[test]
    fn json_braces_survive_rendering() {
        let mut engine = TeraEngine::new();
        engine
            .add_template("json", r#"Return {"tone": "formal"} or {}."#)
            .unwrap();
        assert_eq!(
            engine.render("json", &Context::new()).unwrap(),
            r#"Return {"tone": "formal"} or {}."#
        );
    }
}
