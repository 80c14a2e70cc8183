//! URI templates with `{param}` placeholders.
//!
//! A template such as `file:///{path}` becomes an anchored regular expression
//! in which every literal character is escaped and every `{name}` is a named
//! capture matching one or more characters other than `/`. A candidate URI
//! must match in full; the named captures form the parameter map.
//!
//! # Ordering contract
//!
//! When several templates are registered, `resources/read` tries them in
//! registration order and the **first match wins**. Register more specific
//! templates (`/users/{id}/avatar`) before more general ones
//! (`/users/{id}/{field}`); no "best match" ranking is attempted.

use indexmap::IndexMap;
use regex::Regex;

/// Parameters extracted from a URI, in placeholder order.
pub type UriParams = IndexMap<String, String>;

/// A compiled URI template.
#[derive(Debug, Clone)]
pub struct UriTemplate {
    template: String,
    matcher: Regex,
    params: Vec<String>,
}

impl UriTemplate {
    /// Compiles a template.
    ///
    /// # Errors
    ///
    /// Returns an error if a placeholder name is not a valid capture name
    /// (for example `{a-b}`) or a name is repeated.
    pub fn parse(template: &str) -> Result<Self, regex::Error> {
        let mut pattern = String::with_capacity(template.len() * 2 + 2);
        let mut params = Vec::new();
        let mut rest = template;

        pattern.push('^');
        while let Some(open) = rest.find('{') {
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) if close > 0 => {
                    let name = &after[..close];
                    pattern.push_str(&regex::escape(&rest[..open]));
                    pattern.push_str("(?P<");
                    pattern.push_str(name);
                    pattern.push_str(">[^/]+)");
                    params.push(name.to_string());
                    rest = &after[close + 1..];
                }
                // `{}` or an unclosed brace is literal text
                _ => {
                    pattern.push_str(&regex::escape(&rest[..=open]));
                    rest = after;
                }
            }
        }
        pattern.push_str(&regex::escape(rest));
        pattern.push('$');

        Ok(Self {
            template: template.to_string(),
            matcher: Regex::new(&pattern)?,
            params,
        })
    }

    /// The template text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Placeholder names, in order of appearance.
    #[must_use]
    pub fn param_names(&self) -> &[String] {
        &self.params
    }

    /// Matches `uri` against the template, returning the extracted parameters.
    #[must_use]
    pub fn matches(&self, uri: &str) -> Option<UriParams> {
        let captures = self.matcher.captures(uri)?;

        Some(
            self.params
                .iter()
                .filter_map(|name| {
                    captures
                        .name(name)
                        .map(|m| (name.clone(), m.as_str().to_string()))
                })
                .collect(),
        )
    }
}

/// Matches `uri` against `template` in one step.
///
/// A template that fails to compile never matches.
#[must_use]
pub fn match_uri(uri: &str, template: &str) -> Option<UriParams> {
    match UriTemplate::parse(template) {
        Ok(compiled) => compiled.matches(uri),
        Err(e) => {
            tracing::warn!(template, error = %e, "Ignoring malformed URI template");
            None
        }
    }
}
