//! A minimal built-in template engine.
//!
//! Understands exactly two tag forms:
//!
//! | Tag | Effect |
//! |-----|--------|
//! | `{{ data.title }}` | Insert a scalar from the [`Scope`] |
//! | `{{> _nav.html }}` | Render a partial in place |
//!
//! Strings are inserted verbatim, numbers and booleans via their display
//! form, `null` as nothing. Objects, arrays, unknown names and malformed
//! tags abort the build with the diagnostic chain attached.
//!
//! Partials are looked up in the global directory first, then next to the
//! template that includes them.
//!
//! ## Bindings
//!
//! | Name | Value |
//! |------|-------|
//! | `page` | Rendered page body (skeleton only) |
//! | `data` | `<page>.<lang>.json`, required |
//! | `uni_data` | `<page>.json`, `null` when absent |
//! | `global` | Global data of the language |
//! | `lang_code` | Language code |
//! | `lang_dir_path` | `/<code>`, empty for the default language |
//! | `current_page` | Page file stem |
//! | `languages` | Comma-separated codes the page exists in |

use super::engine::{RenderContext, RenderError, RenderRequest, TemplateEngine};
use super::scope::Scope;
use crate::config::ProjectLayout;
use crate::naming::{
    language_dir_path, page_language_data_path, page_stem, page_universal_data_path,
};
use serde_json::Value;
use std::path::{Path, PathBuf};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";
const DEFAULT_MAX_INCLUDE_DEPTH: usize = 16;

#[derive(Debug, Clone)]
pub struct PlaceholderEngine {
    max_include_depth: usize,
}

impl Default for PlaceholderEngine {
    fn default() -> Self {
        Self {
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }
}

impl PlaceholderEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit on nested partials; deeper nesting is reported as an error.
    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    fn expand(
        &self,
        ctx: &mut RenderContext<'_>,
        template: &str,
        scope: &Scope<'_>,
        base_dir: &Path,
        depth: usize,
    ) -> Result<String, RenderError> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find(OPEN) {
            out.push_str(&rest[..start]);
            let after = &rest[start + OPEN.len()..];
            let Some(end) = after.find(CLOSE) else {
                let offset = template.len() - rest.len() + start;
                return Err(ctx.template_error(format!("unterminated tag at byte {offset}")));
            };
            let tag = after[..end].trim();
            let expanded = match tag.strip_prefix('>') {
                Some(name) => self.include(ctx, name.trim(), scope, base_dir, depth)?,
                None => render_value(ctx, tag, scope)?,
            };
            out.push_str(&expanded);
            rest = &after[end + CLOSE.len()..];
        }
        out.push_str(rest);
        Ok(out)
    }

    fn include(
        &self,
        ctx: &mut RenderContext<'_>,
        name: &str,
        scope: &Scope<'_>,
        base_dir: &Path,
        depth: usize,
    ) -> Result<String, RenderError> {
        if name.is_empty() {
            return Err(ctx.template_error("partial tag without a name"));
        }
        if depth >= self.max_include_depth {
            return Err(ctx.template_error(format!(
                "partials nested deeper than {} levels at '{name}'",
                self.max_include_depth
            )));
        }
        let Some(path) = resolve_partial(ctx.layout(), name, base_dir) else {
            return Err(ctx.template_error(format!("partial '{name}' not found")));
        };
        ctx.within(name, |ctx| {
            let text = ctx.read_template(&path)?;
            let dir = path.parent().unwrap_or(base_dir);
            self.expand(ctx, &text, scope, dir, depth + 1)
        })
    }
}

impl TemplateEngine for PlaceholderEngine {
    fn render(
        &self,
        ctx: &mut RenderContext<'_>,
        request: &RenderRequest<'_>,
    ) -> Result<String, RenderError> {
        let templates = ctx.templates();
        let page = request.page_path;

        let page_text = ctx.read_template(page)?;
        let data = ctx
            .read_data(
                &page_language_data_path(page, request.language, &templates.data_extension),
                true,
            )?
            .unwrap_or(Value::Null);
        let uni_data = ctx
            .read_data(&page_universal_data_path(page, &templates.data_extension), false)?
            .unwrap_or(Value::Null);

        let scope = Scope::new()
            .with("global", request.global_data.clone())
            .with("data", data)
            .with("uni_data", uni_data)
            .with("lang_code", request.language)
            .with(
                "lang_dir_path",
                language_dir_path(request.language, &templates.default_language),
            )
            .with("current_page", page_stem(page))
            .with("languages", request.available_languages.join(","));

        let page_dir = page.parent().unwrap_or(Path::new(""));
        let body = self.expand(ctx, &page_text, &scope, page_dir, 0)?;

        let outer = scope.child().with("page", body);
        let root = ctx.layout().root.clone();
        self.expand(ctx, request.skeleton, &outer, &root, 0)
    }
}

fn resolve_partial(layout: &ProjectLayout, name: &str, base_dir: &Path) -> Option<PathBuf> {
    [layout.global_dir.join(name), base_dir.join(name)]
        .into_iter()
        .find(|candidate| candidate.is_file())
}

fn render_value(
    ctx: &RenderContext<'_>,
    expr: &str,
    scope: &Scope<'_>,
) -> Result<String, RenderError> {
    if expr.is_empty() {
        return Err(ctx.template_error("empty tag"));
    }
    let well_formed = expr
        .split('.')
        .all(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-'));
    if !well_formed {
        return Err(ctx.template_error(format!("malformed expression '{expr}'")));
    }
    match scope.lookup(expr) {
        None => Err(ctx.template_error(format!("unknown variable '{expr}'"))),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(Value::Null) => Ok(String::new()),
        Some(_) => Err(ctx.template_error(format!("'{expr}' is not a scalar value"))),
    }
}
