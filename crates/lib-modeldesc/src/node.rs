//! Generic element tree handed from a document reader to the model builder.
//!
//! The builder never sees raw text; any reader that can produce a
//! [`DescNode`] tree (the bundled [`xml`](crate::xml) reader, or a host's own
//! parser) can feed it.

use crate::error::{DescResult, DescriptionError};
use std::str::FromStr;

/// One element: name, attributes in document order, child elements.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DescNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<DescNode>,
    /// 1-based source line, 0 when the node was built programmatically.
    pub line: usize,
}

impl DescNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Builder-style child appender.
    pub fn with_child(mut self, child: DescNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn required_attr(&self, name: &str) -> DescResult<&str> {
        self.attr(name)
            .ok_or_else(|| DescriptionError::missing_attribute(self.qualified(name), self.line))
    }

    /// Parse an optional attribute with `FromStr`.
    pub fn parse_attr<T>(&self, name: &str) -> DescResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.attr(name) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
                DescriptionError::invalid_value(self.qualified(name), self.line, e.to_string())
            }),
        }
    }

    /// Boolean attribute (`true`/`false`/`1`/`0`), defaulting when absent.
    pub fn bool_attr(&self, name: &str, default: bool) -> DescResult<bool> {
        match self.attr(name).map(str::trim) {
            None => Ok(default),
            Some("true") | Some("1") => Ok(true),
            Some("false") | Some("0") => Ok(false),
            Some(other) => Err(DescriptionError::invalid_value(
                self.qualified(name),
                self.line,
                format!("expected boolean, got '{other}'"),
            )),
        }
    }

    /// First child with the given element name.
    pub fn child(&self, name: &str) -> Option<&DescNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a DescNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    fn qualified(&self, attr: &str) -> String {
        format!("{}.{}", self.name, attr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_helpers() {
        let node = DescNode::new("Real")
            .with_attr("start", "1.5")
            .with_attr("reinit", "true")
            .with_attr("min", "abc");

        assert_eq!(node.attr("start"), Some("1.5"));
        assert_eq!(node.parse_attr::<f64>("start").unwrap(), Some(1.5));
        assert_eq!(node.parse_attr::<f64>("max").unwrap(), None);
        assert!(node.parse_attr::<f64>("min").is_err());
        assert!(node.bool_attr("reinit", false).unwrap());
        assert!(!node.bool_attr("fixed", false).unwrap());
        assert!(node.required_attr("nominal").is_err());
    }

    #[test]
    fn test_child_lookup() {
        let node = DescNode::new("ModelVariables")
            .with_child(DescNode::new("ScalarVariable").with_attr("name", "a"))
            .with_child(DescNode::new("ScalarVariable").with_attr("name", "b"))
            .with_child(DescNode::new("Annotations"));

        assert_eq!(node.children_named("ScalarVariable").count(), 2);
        assert_eq!(node.child("ScalarVariable").and_then(|n| n.attr("name")), Some("a"));
        assert!(node.child("Missing").is_none());
    }
}
