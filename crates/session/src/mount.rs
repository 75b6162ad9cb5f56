//! Mounts a render tree into an isolated HTML fragment.
//!
//! Only structure and styles survive: event handlers are dropped, raw HTML
//! injection and script-capable elements are refused, and every text and
//! attribute value is escaped.

use livecode_eval::{AttrValue, ElementNode, RenderNode, RenderTree, StyleDecl, StyleValue};
use std::fmt::Write;

/// Deepest element nesting the mount will write.
pub const MAX_MOUNT_DEPTH: usize = 256;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const FORBIDDEN_ELEMENTS: &[&str] = &["embed", "iframe", "object", "script"];

/// SVG attributes that keep their camelCase spelling.
const CASE_PRESERVED: &[&str] = &["preserveAspectRatio", "viewBox"];

/// HTML props whose DOM attribute is the lowercased prop name.
const LOWERCASED: &[&str] = &[
    "autoComplete",
    "autoFocus",
    "autoPlay",
    "colSpan",
    "contentEditable",
    "crossOrigin",
    "dateTime",
    "encType",
    "maxLength",
    "minLength",
    "noValidate",
    "playsInline",
    "readOnly",
    "rowSpan",
    "spellCheck",
    "srcSet",
    "tabIndex",
];

const URL_ATTRIBUTES: &[&str] = &["action", "formAction", "href", "src", "xlinkHref"];

/// CSS properties whose numeric values take no `px` suffix.
const UNITLESS_PROPERTIES: &[&str] = &[
    "animationIterationCount",
    "aspectRatio",
    "columnCount",
    "columns",
    "fillOpacity",
    "flex",
    "flexGrow",
    "flexShrink",
    "fontWeight",
    "gridArea",
    "gridColumn",
    "gridColumnEnd",
    "gridColumnStart",
    "gridRow",
    "gridRowEnd",
    "gridRowStart",
    "lineClamp",
    "lineHeight",
    "opacity",
    "order",
    "orphans",
    "scale",
    "stopOpacity",
    "strokeDashoffset",
    "strokeMiterlimit",
    "strokeOpacity",
    "strokeWidth",
    "tabSize",
    "widows",
    "zIndex",
    "zoom",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MountError {
    #[error("<{tag}> is a void element and must not have children")]
    VoidChildren { tag: String },
    #[error("dangerouslySetInnerHTML is not supported in the preview")]
    InnerHtml,
    #[error("<{tag}> elements are not allowed in the preview")]
    ForbiddenElement { tag: String },
    #[error("invalid element name '{tag}'")]
    InvalidTag { tag: String },
    #[error("invalid attribute name '{name}' on <{tag}>")]
    InvalidAttribute { tag: String, name: String },
    #[error("element nesting exceeds {limit} levels")]
    TooDeep { limit: usize },
}

/// Render `tree` as an HTML fragment.
pub fn mount(tree: &RenderTree) -> Result<String, MountError> {
    let mut out = String::new();
    for node in &tree.nodes {
        write_node(node, &mut out, 0)?;
    }
    Ok(out)
}

fn write_node(node: &RenderNode, out: &mut String, depth: usize) -> Result<(), MountError> {
    match node {
        RenderNode::Text { text } => {
            out.push_str(&escape_text(text));
            Ok(())
        }
        RenderNode::Element(el) => write_element(el, out, depth),
    }
}

fn write_element(el: &ElementNode, out: &mut String, depth: usize) -> Result<(), MountError> {
    if depth >= MAX_MOUNT_DEPTH {
        return Err(MountError::TooDeep {
            limit: MAX_MOUNT_DEPTH,
        });
    }
    if !valid_tag(&el.tag) {
        return Err(MountError::InvalidTag {
            tag: el.tag.clone(),
        });
    }
    let tag = el.tag.to_ascii_lowercase();
    if FORBIDDEN_ELEMENTS.contains(&tag.as_str()) {
        return Err(MountError::ForbiddenElement { tag });
    }
    let is_void = VOID_ELEMENTS.contains(&tag.as_str());
    if is_void && !el.children.is_empty() {
        return Err(MountError::VoidChildren { tag });
    }

    out.push('<');
    out.push_str(&el.tag);
    for attr in &el.attrs {
        if attr.name == "dangerouslySetInnerHTML" {
            return Err(MountError::InnerHtml);
        }
        if !valid_attr_name(&attr.name) {
            return Err(MountError::InvalidAttribute {
                tag: el.tag.clone(),
                name: attr.name.clone(),
            });
        }
        if let Some(rendered) = attr_text(&attr.name, &attr.value) {
            if URL_ATTRIBUTES.contains(&attr.name.as_str()) && is_javascript_url(&rendered) {
                tracing::debug!(attr = %attr.name, "dropped javascript: url");
                continue;
            }
            let _ = write!(out, " {}", html_attr_name(&attr.name));
            if !rendered.is_empty() || !matches!(attr.value, AttrValue::Bool(true)) {
                let _ = write!(out, "=\"{}\"", escape_attr(&rendered));
            }
        }
    }
    out.push('>');
    if is_void {
        return Ok(());
    }
    for child in &el.children {
        write_node(child, out, depth + 1)?;
    }
    let _ = write!(out, "</{}>", el.tag);
    Ok(())
}

/// The attribute's serialized value; `None` omits the attribute. A `true`
/// boolean yields an empty string and is written bare.
fn attr_text(name: &str, value: &AttrValue) -> Option<String> {
    let stringly_bool = name.starts_with("aria-") || name.starts_with("data-");
    match value {
        AttrValue::Handler => None,
        AttrValue::Bool(b) if stringly_bool => Some(b.to_string()),
        AttrValue::Bool(true) => Some(String::new()),
        AttrValue::Bool(false) => None,
        AttrValue::Number(n) => Some(format_number(*n)),
        AttrValue::Text(s) | AttrValue::Object(s) => Some(s.clone()),
        AttrValue::Style(decls) => {
            let css = style_text(decls);
            (!css.is_empty()).then_some(css)
        }
    }
}

/// `margin-top:4px;color:red`, the way the view library serializes styles.
pub fn style_text(decls: &[StyleDecl]) -> String {
    decls
        .iter()
        .map(|d| {
            let value = match &d.value {
                StyleValue::Number(n)
                    if *n != 0.0
                        && !UNITLESS_PROPERTIES.contains(&d.property.as_str())
                        && !d.property.starts_with("--") =>
                {
                    format!("{}px", format_number(*n))
                }
                StyleValue::Number(n) => format_number(*n),
                StyleValue::Text(s) => s.trim().to_string(),
            };
            format!("{}:{}", css_property(&d.property), value)
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn css_property(name: &str) -> String {
    if name.starts_with("--") {
        return name.to_string();
    }
    let mut out = String::new();
    if name.starts_with("ms") && name.chars().nth(2).is_some_and(|c| c.is_ascii_uppercase()) {
        out.push('-');
    }
    out.push_str(&kebab(name));
    out
}

fn kebab(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// DOM attribute name for a prop name.
fn html_attr_name(name: &str) -> String {
    match name {
        "className" => "class".to_string(),
        "htmlFor" => "for".to_string(),
        "xlinkHref" => "xlink:href".to_string(),
        _ if CASE_PRESERVED.contains(&name)
            || name.starts_with("aria-")
            || name.starts_with("data-") =>
        {
            name.to_string()
        }
        _ if LOWERCASED.contains(&name) => name.to_ascii_lowercase(),
        _ => kebab(name),
    }
}

fn valid_tag(tag: &str) -> bool {
    let mut chars = tag.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn valid_attr_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
}

fn is_javascript_url(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect();
    compact.to_ascii_lowercase().starts_with("javascript:")
}

/// Integers print without a fraction, like the view library's string coercion.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i128)
    } else {
        format!("{}", n)
    }
}

pub(crate) fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;").replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use livecode_eval::Attr;

    fn el(tag: &str, attrs: Vec<(&str, AttrValue)>, children: Vec<RenderNode>) -> RenderNode {
        RenderNode::Element(ElementNode {
            tag: tag.to_string(),
            attrs: attrs
                .into_iter()
                .map(|(name, value)| Attr {
                    name: name.to_string(),
                    value,
                })
                .collect(),
            children,
        })
    }

    fn text(s: &str) -> RenderNode {
        RenderNode::Text {
            text: s.to_string(),
        }
    }

    fn mount_nodes(nodes: Vec<RenderNode>) -> Result<String, MountError> {
        mount(&RenderTree { nodes })
    }

    #[test]
    fn renames_and_escapes() {
        let html = mount_nodes(vec![el(
            "label",
            vec![
                ("className", AttrValue::Text("a \"b\"".into())),
                ("htmlFor", AttrValue::Text("x".into())),
                ("onClick", AttrValue::Handler),
            ],
            vec![text("1 < 2 & 3")],
        )])
        .unwrap();
        assert_eq!(
            html,
            r#"<label class="a &quot;b&quot;" for="x">1 &lt; 2 &amp; 3</label>"#
        );
    }

    #[test]
    fn booleans_numbers_and_svg_attributes() {
        let html = mount_nodes(vec![el(
            "svg",
            vec![
                ("viewBox", AttrValue::Text("0 0 24 24".into())),
                ("strokeWidth", AttrValue::Number(2.0)),
                ("strokeLinecap", AttrValue::Text("round".into())),
                ("hidden", AttrValue::Bool(true)),
                ("disabled", AttrValue::Bool(false)),
                ("aria-hidden", AttrValue::Bool(true)),
                ("width", AttrValue::Number(1.5)),
            ],
            vec![],
        )])
        .unwrap();
        assert_eq!(
            html,
            r#"<svg viewBox="0 0 24 24" stroke-width="2" stroke-linecap="round" hidden aria-hidden="true" width="1.5"></svg>"#
        );
    }

    #[test]
    fn style_declarations() {
        let decls = vec![
            StyleDecl {
                property: "marginTop".into(),
                value: StyleValue::Number(4.0),
            },
            StyleDecl {
                property: "opacity".into(),
                value: StyleValue::Number(0.5),
            },
            StyleDecl {
                property: "padding".into(),
                value: StyleValue::Number(0.0),
            },
            StyleDecl {
                property: "backgroundColor".into(),
                value: StyleValue::Text("red".into()),
            },
            StyleDecl {
                property: "msTransform".into(),
                value: StyleValue::Text("none".into()),
            },
        ];
        assert_eq!(
            style_text(&decls),
            "margin-top:4px;opacity:0.5;padding:0;background-color:red;-ms-transform:none"
        );
    }

    #[test]
    fn void_elements() {
        assert_eq!(
            mount_nodes(vec![el("br", vec![], vec![])]).unwrap(),
            "<br>"
        );
        assert_eq!(
            mount_nodes(vec![el("img", vec![], vec![text("x")])]),
            Err(MountError::VoidChildren { tag: "img".into() })
        );
    }

    #[test]
    fn unsafe_content_is_refused() {
        assert_eq!(
            mount_nodes(vec![el("script", vec![], vec![])]),
            Err(MountError::ForbiddenElement {
                tag: "script".into()
            })
        );
        assert_eq!(
            mount_nodes(vec![el(
                "div",
                vec![("dangerouslySetInnerHTML", AttrValue::Object("[object Object]".into()))],
                vec![]
            )]),
            Err(MountError::InnerHtml)
        );
        assert!(matches!(
            mount_nodes(vec![el("my tag", vec![], vec![])]),
            Err(MountError::InvalidTag { .. })
        ));
        assert!(matches!(
            mount_nodes(vec![el("div", vec![("on\"x", AttrValue::Text("1".into()))], vec![])]),
            Err(MountError::InvalidAttribute { .. })
        ));
        let html = mount_nodes(vec![el(
            "a",
            vec![("href", AttrValue::Text(" java\nscript:alert(1)".into()))],
            vec![text("x")],
        )])
        .unwrap();
        assert_eq!(html, "<a>x</a>");
    }

    #[test]
    fn depth_is_bounded() {
        let mut node = text("leaf");
        for _ in 0..(MAX_MOUNT_DEPTH + 1) {
            node = el("div", vec![], vec![node]);
        }
        assert_eq!(
            mount_nodes(vec![node]),
            Err(MountError::TooDeep {
                limit: MAX_MOUNT_DEPTH
            })
        );
    }
}
