//! Route-name registry
//!
//! Maps route names such as `"edit_article"` to path patterns such as
//! `"/article/{pk}/edit/"` so views can redirect by name.

use anyhow::{Result, anyhow, bail};
use indexmap::IndexMap;

/// Registry for reversing route names into paths
#[derive(Debug, Clone, Default)]
pub struct UrlRegistry {
    /// Maps route name -> path pattern
    routes: IndexMap<String, String>,
}

impl UrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from `(name, pattern)` pairs
    pub fn from_patterns<'a, I>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut registry = Self::new();
        for (name, pattern) in patterns {
            registry.register(name, pattern)?;
        }
        Ok(registry)
    }

    /// Register a pattern under a name
    ///
    /// Patterns must be absolute paths; placeholders are written `{name}`.
    pub fn register(&mut self, name: &str, pattern: &str) -> Result<()> {
        if name.is_empty() {
            bail!("route name must not be empty");
        }
        if !pattern.starts_with('/') {
            bail!("pattern '{}' for route '{}' must start with '/'", pattern, name);
        }
        placeholders(pattern)?;
        self.routes.insert(name.to_string(), pattern.to_string());
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    /// Substitute `kwargs` into the named pattern
    ///
    /// Every placeholder must be supplied and every argument must be used.
    pub fn reverse(&self, name: &str, kwargs: &[(&str, String)]) -> Result<String> {
        let pattern = self
            .routes
            .get(name)
            .ok_or_else(|| anyhow!("No route named '{}'", name))?;

        let expected = placeholders(pattern)?;
        for (key, _) in kwargs {
            if !expected.contains(key) {
                bail!("route '{}' has no '{}' argument", name, key);
            }
        }

        let mut path = pattern.clone();
        for key in expected {
            let value = kwargs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v)
                .ok_or_else(|| anyhow!("route '{}' requires a '{}' argument", name, key))?;
            path = path.replace(&format!("{{{}}}", key), &urlencoding::encode(value));
        }
        Ok(path)
    }
}

fn placeholders(pattern: &str) -> Result<Vec<&str>> {
    let mut found = Vec::new();
    let mut rest = pattern;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let end = after
            .find('}')
            .ok_or_else(|| anyhow!("unclosed placeholder in '{}'", pattern))?;
        let key = &after[..end];
        if key.is_empty() || key.contains('{') {
            bail!("malformed placeholder in '{}'", pattern);
        }
        found.push(key);
        rest = &after[end + 1..];
    }
    if rest.contains('}') {
        bail!("unmatched '}}' in '{}'", pattern);
    }
    Ok(found)
}
