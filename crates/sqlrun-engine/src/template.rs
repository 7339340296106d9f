//! Strict `{{ name }}` template rendering.
//!
//! The templating capability is intentionally restricted to plain value
//! interpolation: no control flow, no filters. Referencing a variable
//! absent from the context is a hard error rather than an empty-string
//! substitution, which would produce silently-wrong SQL.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::types::RunConfig;
use crate::error::PipelineError;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid placeholder regex")
});

/// Variable mapping for one unit's render.
#[derive(Debug, Clone)]
pub struct RenderContext {
    vars: BTreeMap<String, String>,
}

impl RenderContext {
    /// Build the context from a resolved run configuration: the user
    /// variable mapping, then the engine-injected `dataset` and
    /// `project_id` entries added afterwards when those values are
    /// non-empty. The injected entries shadow same-named user
    /// variables, never the reverse.
    pub fn new(config: &RunConfig) -> Self {
        let mut vars = config.vars.clone();
        if let Some(dataset) = config.dataset.as_deref().filter(|d| !d.is_empty()) {
            vars.insert("dataset".to_string(), dataset.to_string());
        }
        if !config.project_id.is_empty() {
            vars.insert("project_id".to_string(), config.project_id.clone());
        }
        Self { vars }
    }

    /// Build a context from a raw variable mapping.
    pub fn from_vars(vars: BTreeMap<String, String>) -> Self {
        Self { vars }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }
}

/// Substitute every `{{ name }}` placeholder in `text` with its mapped
/// value. `unit` is used only to annotate errors.
///
/// # Errors
///
/// Returns [`PipelineError::UndefinedVariable`] when a placeholder
/// references a key absent from the context, and
/// [`PipelineError::RenderFailed`] when an opening `{{` never forms a
/// well-formed placeholder. No partial output is ever produced.
pub fn render(text: &str, ctx: &RenderContext, unit: &Path) -> Result<String, PipelineError> {
    let mut rendered = String::with_capacity(text.len());
    let mut last_end = 0;

    for cap in PLACEHOLDER_RE.captures_iter(text) {
        let whole = cap.get(0).expect("capture group 0 always present");
        let name = &cap[1];

        let gap = &text[last_end..whole.start()];
        ensure_no_open_delimiter(gap, unit)?;
        rendered.push_str(gap);

        match ctx.get(name) {
            Some(value) => rendered.push_str(value),
            None => {
                return Err(PipelineError::UndefinedVariable {
                    name: name.to_string(),
                    unit: unit.to_path_buf(),
                });
            }
        }
        last_end = whole.end();
    }

    let tail = &text[last_end..];
    ensure_no_open_delimiter(tail, unit)?;
    rendered.push_str(tail);
    Ok(rendered)
}

fn ensure_no_open_delimiter(segment: &str, unit: &Path) -> Result<(), PipelineError> {
    if segment.contains("{{") {
        return Err(PipelineError::RenderFailed {
            unit: unit.to_path_buf(),
            reason: "unclosed or malformed `{{` placeholder".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn ctx(pairs: &[(&str, &str)]) -> RenderContext {
        RenderContext::from_vars(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn unit() -> PathBuf {
        PathBuf::from("sql/a.sql")
    }

    #[test]
    fn substitutes_placeholders() {
        let out = render("SELECT {{ env }}", &ctx(&[("env", "prod")]), &unit()).unwrap();
        assert_eq!(out, "SELECT prod");
    }

    #[test]
    fn whitespace_inside_delimiters_is_optional() {
        let vars = ctx(&[("env", "prod")]);
        assert_eq!(render("{{env}}", &vars, &unit()).unwrap(), "prod");
        assert_eq!(render("{{  env  }}", &vars, &unit()).unwrap(), "prod");
    }

    #[test]
    fn repeated_placeholders_all_substituted() {
        let out = render(
            "{{ a }} + {{ b }} + {{ a }}",
            &ctx(&[("a", "1"), ("b", "2")]),
            &unit(),
        )
        .unwrap();
        assert_eq!(out, "1 + 2 + 1");
    }

    #[test]
    fn text_without_placeholders_passes_through() {
        let out = render("SELECT 1", &ctx(&[]), &unit()).unwrap();
        assert_eq!(out, "SELECT 1");
    }

    #[test]
    fn undefined_variable_is_a_hard_error() {
        let err = render("SELECT {{ missing }}", &ctx(&[]), &unit()).unwrap_err();
        match err {
            PipelineError::UndefinedVariable { name, unit } => {
                assert_eq!(name, "missing");
                assert!(unit.ends_with("a.sql"));
            }
            other => panic!("expected UndefinedVariable, got {other}"),
        }
    }

    #[test]
    fn substituted_value_is_not_rescanned() {
        // A value containing placeholder syntax is emitted literally.
        let out = render("{{ a }}", &ctx(&[("a", "{{ b }}")]), &unit()).unwrap();
        assert_eq!(out, "{{ b }}");
    }

    #[test]
    fn unclosed_delimiter_fails() {
        let err = render("SELECT {{ env", &ctx(&[("env", "prod")]), &unit()).unwrap_err();
        assert!(matches!(err, PipelineError::RenderFailed { .. }));
    }

    #[test]
    fn malformed_placeholder_name_fails() {
        let err = render("SELECT {{ 9bad }}", &ctx(&[]), &unit()).unwrap_err();
        assert!(matches!(err, PipelineError::RenderFailed { .. }));
    }

    #[test]
    fn injected_variables_shadow_user_variables() {
        use std::collections::BTreeMap;

        let config = RunConfig {
            directory: PathBuf::from("sql"),
            project_id: "real-project".to_string(),
            dataset: Some("real_dataset".to_string()),
            location: None,
            impersonate_service_account: None,
            vars: BTreeMap::from([
                ("project_id".to_string(), "user-project".to_string()),
                ("dataset".to_string(), "user_dataset".to_string()),
                ("env".to_string(), "prod".to_string()),
            ]),
            dry_run: false,
        };
        let ctx = RenderContext::new(&config);
        assert_eq!(ctx.get("project_id"), Some("real-project"));
        assert_eq!(ctx.get("dataset"), Some("real_dataset"));
        assert_eq!(ctx.get("env"), Some("prod"));
    }

    #[test]
    fn empty_dataset_is_not_injected() {
        use std::collections::BTreeMap;

        let config = RunConfig {
            directory: PathBuf::from("sql"),
            project_id: "proj1".to_string(),
            dataset: None,
            location: None,
            impersonate_service_account: None,
            vars: BTreeMap::new(),
            dry_run: false,
        };
        let ctx = RenderContext::new(&config);
        assert_eq!(ctx.get("dataset"), None);
        assert_eq!(ctx.get("project_id"), Some("proj1"));
    }
}
