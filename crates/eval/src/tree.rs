//! Render tree: the plain-data output of a successful evaluation.
//!
//! Only host elements and text remain; components, icons, primitives and
//! fragments have been expanded by the render pass. The tree is `Send` and
//! serializable so it can cross threads and the HTTP surface.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RenderTree {
    pub nodes: Vec<RenderNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderNode {
    Element(ElementNode),
    Text { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    pub tag: String,
    pub attrs: Vec<Attr>,
    pub children: Vec<RenderNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attr {
    pub name: String,
    pub value: AttrValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AttrValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Style(Vec<StyleDecl>),
    /// An event handler was supplied; handlers never run in a static render.
    Handler,
    /// A non-primitive value, stored as its string form.
    Object(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDecl {
    pub property: String,
    pub value: StyleValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleValue {
    Number(f64),
    Text(String),
}

impl RenderTree {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Concatenated text of every text node, in document order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            node.collect_text(&mut out);
        }
        out
    }

    /// Every element in document order.
    pub fn elements(&self) -> Vec<&ElementNode> {
        let mut out = Vec::new();
        for node in &self.nodes {
            node.collect_elements(&mut out);
        }
        out
    }

    /// First element with the given tag.
    pub fn find(&self, tag: &str) -> Option<&ElementNode> {
        self.elements().into_iter().find(|el| el.tag == tag)
    }
}

impl RenderNode {
    fn collect_text(&self, out: &mut String) {
        match self {
            RenderNode::Text { text } => out.push_str(text),
            RenderNode::Element(el) => {
                for child in &el.children {
                    child.collect_text(out);
                }
            }
        }
    }

    fn collect_elements<'a>(&'a self, out: &mut Vec<&'a ElementNode>) {
        if let RenderNode::Element(el) = self {
            out.push(el);
            for child in &el.children {
                child.collect_elements(out);
            }
        }
    }
}

impl ElementNode {
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.iter().find(|a| a.name == name).map(|a| &a.value)
    }

    /// The attribute as text, if it is a text attribute.
    pub fn text_attr(&self, name: &str) -> Option<&str> {
        match self.attr(name) {
            Some(AttrValue::Text(s)) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RenderTree {
        RenderTree {
            nodes: vec![RenderNode::Element(ElementNode {
                tag: "div".into(),
                attrs: vec![Attr {
                    name: "className".into(),
                    value: AttrValue::Text("p-4".into()),
                }],
                children: vec![
                    RenderNode::Text { text: "Hi ".into() },
                    RenderNode::Element(ElementNode {
                        tag: "b".into(),
                        attrs: vec![],
                        children: vec![RenderNode::Text { text: "there".into() }],
                    }),
                ],
            })],
        }
    }

    #[test]
    fn queries() {
        let tree = sample();
        assert_eq!(tree.text_content(), "Hi there");
        assert_eq!(tree.elements().len(), 2);
        assert_eq!(tree.find("div").unwrap().text_attr("className"), Some("p-4"));
        assert!(tree.find("span").is_none());
    }

    #[test]
    fn serialized_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        let div = &json["nodes"][0];
        assert_eq!(div["type"], "element");
        assert_eq!(div["attrs"][0]["value"]["kind"], "text");
        assert_eq!(div["children"][0], serde_json::json!({"type": "text", "text": "Hi "}));
    }
}
