//! Initial render pass: expands an element value into a host-only tree.

use livecode_core::ast::Span;
use std::rc::Rc;

use crate::icons::IconDef;
use crate::interpreter::{Eval, Fault, Interpreter};
use crate::primitives::Primitive;
use crate::tree::{Attr, AttrValue, ElementNode, RenderNode, RenderTree, StyleDecl, StyleValue};
use crate::value::{number_to_string, Element, ElementType, Function, Native, Object, Value};

const ICON_PROPS: &[&str] = &[
    "absoluteStrokeWidth",
    "children",
    "className",
    "color",
    "size",
    "strokeWidth",
];

impl Interpreter<'_> {
    pub(crate) fn render_root(&mut self, root: &Value) -> Eval<RenderTree> {
        let mut nodes = Vec::new();
        self.render_into(root, &mut nodes, self.last_span)?;
        Ok(RenderTree { nodes })
    }

    fn render_into(&mut self, value: &Value, out: &mut Vec<RenderNode>, span: Span) -> Eval<()> {
        match value {
            Value::Undefined | Value::Null | Value::Bool(_) | Value::Function(_) => Ok(()),
            Value::Number(n) => {
                push_text(out, number_to_string(*n));
                Ok(())
            }
            Value::Str(s) => {
                push_text(out, s.to_string());
                Ok(())
            }
            Value::Array(items) => {
                let items = items.borrow().clone();
                for item in &items {
                    self.render_into(item, out, span)?;
                }
                Ok(())
            }
            Value::Element(el) => {
                self.tick()?;
                self.enter(el.span)?;
                let result = self.render_element(el, out);
                self.leave();
                result
            }
            Value::Object(_) => Err(Fault::error(
                "Error",
                format!(
                    "Objects are not valid as a React child (found: {}). If you meant to render a collection of children, use an array instead.",
                    value.describe()
                ),
                span,
            )),
        }
    }

    fn render_element(&mut self, el: &Rc<Element>, out: &mut Vec<RenderNode>) -> Eval<()> {
        match &el.ty {
            ElementType::Host(tag) => {
                let mut node = ElementNode {
                    tag: tag.clone(),
                    attrs: Vec::new(),
                    children: Vec::new(),
                };
                for (name, value) in el.props.entries() {
                    if name != "children" {
                        push_attr(&mut node.attrs, name, attr_value(name, value, el.span)?);
                    }
                }
                self.render_children(&el.props, &mut node.children, el.span)?;
                out.push(RenderNode::Element(node));
                Ok(())
            }
            ElementType::Fragment | ElementType::StrictMode => {
                self.render_children(&el.props, out, el.span)
            }
            ElementType::Component(f) => match &**f {
                Function::Native(Native::Icon(def)) => {
                    let node = self.icon_node(def, &el.props, el.span)?;
                    out.push(RenderNode::Element(node));
                    Ok(())
                }
                Function::Native(Native::Primitive(p)) => {
                    let node = self.primitive_node(*p, &el.props, el.span)?;
                    out.push(RenderNode::Element(node));
                    Ok(())
                }
                _ => {
                    let props = Value::object(el.props.clone());
                    let rendered = self.call(f, vec![props], el.span)?;
                    self.render_into(&rendered, out, el.span)
                }
            },
        }
    }

    fn render_children(&mut self, props: &Object, out: &mut Vec<RenderNode>, span: Span) -> Eval<()> {
        match props.get("children") {
            Some(children) => self.render_into(&children, out, span),
            None => Ok(()),
        }
    }

    /// Lucide's `<svg>` wrapper: fixed presentation attributes, then caller props.
    fn icon_node(&mut self, def: &IconDef, props: &Object, span: Span) -> Eval<ElementNode> {
        let size = props.get("size").filter(|v| !v.is_nullish());
        let size_attr = match &size {
            Some(v) => attr_value("size", v, span)?.unwrap_or(AttrValue::Number(24.0)),
            None => AttrValue::Number(24.0),
        };
        let color = props
            .get("color")
            .filter(|v| !v.is_nullish())
            .map_or("currentColor".to_string(), |v| v.to_js_string());
        let mut stroke_width = props
            .get("strokeWidth")
            .filter(|v| !v.is_nullish())
            .map_or(2.0, |v| v.to_number());
        if props.get("absoluteStrokeWidth").is_some_and(|v| v.truthy()) {
            let size = size.map_or(24.0, |v| v.to_number());
            stroke_width = stroke_width * 24.0 / size;
        }
        let mut class = format!("lucide lucide-{}", def.kebab_name());
        if let Some(extra) = props.get("className").filter(|v| !v.is_nullish()) {
            let extra = extra.to_js_string();
            if !extra.trim().is_empty() {
                class.push(' ');
                class.push_str(extra.trim());
            }
        }

        let text = |s: &str| Some(AttrValue::Text(s.to_string()));
        let mut attrs = Vec::new();
        push_attr(&mut attrs, "xmlns", text("http://www.w3.org/2000/svg"));
        push_attr(&mut attrs, "width", Some(size_attr.clone()));
        push_attr(&mut attrs, "height", Some(size_attr));
        push_attr(&mut attrs, "viewBox", text("0 0 24 24"));
        push_attr(&mut attrs, "fill", text("none"));
        push_attr(&mut attrs, "stroke", text(&color));
        push_attr(&mut attrs, "strokeWidth", Some(AttrValue::Number(stroke_width)));
        push_attr(&mut attrs, "strokeLinecap", text("round"));
        push_attr(&mut attrs, "strokeLinejoin", text("round"));
        push_attr(&mut attrs, "className", text(&class));
        for (name, value) in props.entries() {
            if !ICON_PROPS.contains(&name) {
                push_attr(&mut attrs, name, attr_value(name, value, span)?);
            }
        }

        let mut children: Vec<RenderNode> = def
            .nodes
            .iter()
            .map(|n| {
                RenderNode::Element(ElementNode {
                    tag: n.tag.to_string(),
                    attrs: n
                        .attrs
                        .iter()
                        .map(|(k, v)| Attr {
                            name: k.to_string(),
                            value: AttrValue::Text(v.to_string()),
                        })
                        .collect(),
                    children: Vec::new(),
                })
            })
            .collect();
        self.render_children(props, &mut children, span)?;
        Ok(ElementNode {
            tag: "svg".to_string(),
            attrs,
            children,
        })
    }

    fn primitive_node(&mut self, p: Primitive, props: &Object, span: Span) -> Eval<ElementNode> {
        let selection = |key: &str| match props.get(key) {
            Some(Value::Str(s)) => Some(s.to_string()),
            _ => None,
        };
        let variant = selection(p.variant_prop());
        let size = selection("size");
        let extra = props
            .get("className")
            .filter(|v| !v.is_nullish())
            .map(|v| v.to_js_string());
        let mut attrs = Vec::new();
        for (name, value) in p.fixed_attrs() {
            push_attr(&mut attrs, name, Some(AttrValue::Text(value.to_string())));
        }
        let class = p.classes(variant.as_deref(), size.as_deref(), extra.as_deref());
        push_attr(&mut attrs, "className", Some(AttrValue::Text(class)));
        for (name, value) in props.entries() {
            if name != "className" && name != "children" && !p.consumes(name) {
                push_attr(&mut attrs, name, attr_value(name, value, span)?);
            }
        }
        let mut children = Vec::new();
        self.render_children(props, &mut children, span)?;
        Ok(ElementNode {
            tag: p.tag().to_string(),
            attrs,
            children,
        })
    }
}

/// Adjacent text merges into one node, as the DOM would show it.
fn push_text(out: &mut Vec<RenderNode>, text: String) {
    if text.is_empty() {
        return;
    }
    if let Some(RenderNode::Text { text: last }) = out.last_mut() {
        last.push_str(&text);
    } else {
        out.push(RenderNode::Text { text });
    }
}

/// Later values replace earlier ones in place, so caller props override defaults.
fn push_attr(attrs: &mut Vec<Attr>, name: &str, value: Option<AttrValue>) {
    let existing = attrs.iter().position(|a| a.name == name);
    match (existing, value) {
        (Some(i), Some(value)) => attrs[i].value = value,
        (Some(i), None) => {
            attrs.remove(i);
        }
        (None, Some(value)) => attrs.push(Attr {
            name: name.to_string(),
            value,
        }),
        (None, None) => {}
    }
}

fn attr_value(name: &str, value: &Value, span: Span) -> Eval<Option<AttrValue>> {
    Ok(Some(match value {
        Value::Undefined | Value::Null => return Ok(None),
        Value::Bool(b) => AttrValue::Bool(*b),
        Value::Number(n) => AttrValue::Number(*n),
        Value::Str(_) if name == "style" => {
            return Err(Fault::error(
                "Error",
                "The `style` prop expects a mapping from style properties to values, not a string. For example, style={{marginRight: spacing + 'em'}} when using JSX.",
                span,
            ))
        }
        Value::Str(s) => AttrValue::Text(s.to_string()),
        Value::Function(_) => AttrValue::Handler,
        Value::Object(obj) if name == "style" => AttrValue::Style(
            obj.borrow()
                .entries()
                .filter_map(|(property, v)| {
                    let value = match v {
                        Value::Number(n) => StyleValue::Number(*n),
                        Value::Undefined | Value::Null | Value::Bool(_) => return None,
                        other => StyleValue::Text(other.to_js_string()),
                    };
                    Some(StyleDecl {
                        property: property.to_string(),
                        value,
                    })
                })
                .collect(),
        ),
        Value::Array(_) => AttrValue::Text(value.to_js_string()),
        Value::Object(_) | Value::Element(_) => AttrValue::Object(value.to_js_string()),
    }))
}
