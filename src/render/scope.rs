//! Immutable, layered template variables.
//!
//! A [`Scope`] holds named JSON values and optionally points at a parent.
//! Lookups walk from the innermost scope outwards, so a child can shadow a
//! parent's binding without touching it. Scopes are built once per target
//! and passed down by reference; nothing is shared between targets.

use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct Scope<'p> {
    bindings: BTreeMap<String, Value>,
    parent: Option<&'p Scope<'p>>,
}

impl<'p> Scope<'p> {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty scope layered on top of `self`.
    pub fn child(&self) -> Scope<'_> {
        Scope {
            bindings: BTreeMap::new(),
            parent: Some(self),
        }
    }

    /// Builder-style binding.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bindings.insert(name.into(), value.into());
        self
    }

    /// Resolve a dotted path such as `data.title` or `global.menu.0.label`.
    ///
    /// The first segment is looked up through the scope chain; the rest
    /// index into objects by key and into arrays by position.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut value = self.binding(segments.next()?)?;
        for segment in segments {
            value = match value {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(value)
    }

    fn binding(&self, name: &str) -> Option<&Value> {
        self.bindings
            .get(name)
            .or_else(|| self.parent.and_then(|p| p.binding(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_lookup() {
        let scope = Scope::new().with("data", json!({"title": "Hi", "tags": ["a", "b"]}));
        assert_eq!(scope.lookup("data.title"), Some(&json!("Hi")));
        assert_eq!(scope.lookup("data.tags.1"), Some(&json!("b")));
        assert_eq!(scope.lookup("data.tags.9"), None);
        assert_eq!(scope.lookup("data.title.x"), None);
        assert_eq!(scope.lookup("nope"), None);
    }

    #[test]
    fn child_shadows_parent_without_mutating_it() {
        let parent = Scope::new().with("lang_code", "pl").with("page", "outer");
        let child = parent.child().with("page", "<p>body</p>");
        assert_eq!(child.lookup("page"), Some(&json!("<p>body</p>")));
        assert_eq!(child.lookup("lang_code"), Some(&json!("pl")));
        assert_eq!(parent.lookup("page"), Some(&json!("outer")));
    }

    #[test]
    fn null_binding_is_found() {
        let scope = Scope::new().with("uni_data", Value::Null);
        assert_eq!(scope.lookup("uni_data"), Some(&Value::Null));
        assert_eq!(scope.lookup("uni_data.latin"), None);
    }
}
