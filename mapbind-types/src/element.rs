use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Detached element tree, the unit of content exchanged with a UI renderer.
///
/// Overlays use an element as their visual, and popups use one as their content container. The
/// engine adapter is responsible for turning it into whatever its platform displays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Element {
    tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<Element>,
}

impl Element {
    /// Creates an empty element with the given tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Creates an empty `div`, used as a detached container for rendered content.
    pub fn container() -> Self {
        Self::new("div")
    }

    /// Tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Sets an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Sets an attribute.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Value of an attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Sets the text content.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Text content of this element alone.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Appends a child element.
    pub fn append(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Appends a child element.
    pub fn with_child(mut self, child: Element) -> Self {
        self.append(child);
        self
    }

    /// Child elements.
    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Returns true if the element has no text and no children.
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.children.is_empty()
    }

    /// Concatenated text of the element and its descendants, depth first.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(text) = &self.text {
            out.push_str(text);
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }
}

/// Content panel attached to an overlay.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Popup {
    content: Element,
}

impl Popup {
    /// Creates a popup showing the given container.
    pub fn new(content: Element) -> Self {
        Self { content }
    }

    /// Content container of the popup.
    pub fn content(&self) -> &Element {
        &self.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_content_is_depth_first() {
        let element = Element::container()
            .with_child(Element::new("h3").with_text("Pier"))
            .with_child(Element::new("p").with_text(" at sunset"));

        assert_eq!(element.text_content(), "Pier at sunset");
        assert!(!element.is_empty());
        assert!(Element::container().is_empty());
    }
}
