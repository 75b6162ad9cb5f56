//! Runtime values for the sandbox interpreter.
//!
//! Values are single-threaded (`Rc`/`RefCell`) and live only for the
//! duration of one evaluation. Nothing here crosses the sandbox boundary;
//! the render pass converts the final element tree into plain data.

use livecode_core::ast::{FunctionDef, Span};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::icons::IconDef;
use crate::primitives::Primitive;

// ──────────────────────────────────────────────
// Values
// ──────────────────────────────────────────────

#[derive(Clone)]
pub(crate) enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<Object>>),
    Function(Rc<Function>),
    Element(Rc<Element>),
}

impl Value {
    pub fn str(s: impl AsRef<str>) -> Value {
        Value::Str(Rc::from(s.as_ref()))
    }

    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(obj: Object) -> Value {
        Value::Object(Rc::new(RefCell::new(obj)))
    }

    pub fn native(native: Native) -> Value {
        Value::Function(Rc::new(Function::Native(native)))
    }

    /// An `Error`-like object with `name` and `message`.
    pub fn error(name: &str, message: impl Into<String>) -> Value {
        let mut obj = Object::default();
        obj.set("name", Value::str(name));
        obj.set("message", Value::str(message.into()));
        Value::object(obj)
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Function(f) => match **f {
                Function::Native(Native::Fragment) | Function::Native(Native::StrictMode) => {
                    "symbol"
                }
                _ => "function",
            },
            Value::Array(_) | Value::Object(_) | Value::Element(_) => "object",
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::Str(s) => string_to_number(s),
            Value::Array(items) => {
                let items = items.borrow();
                match items.len() {
                    0 => 0.0,
                    1 => items[0].to_number(),
                    _ => f64::NAN,
                }
            }
            _ => f64::NAN,
        }
    }

    /// `String(value)`.
    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::Str(s) => s.to_string(),
            Value::Array(items) => items
                .borrow()
                .iter()
                .map(|v| {
                    if v.is_nullish() {
                        String::new()
                    } else {
                        v.to_js_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(obj) => {
                let obj = obj.borrow();
                if let (Some(name), Some(message)) = (obj.get("name"), obj.get("message")) {
                    if let (Value::Str(n), Value::Str(m)) = (&name, &message) {
                        return if m.is_empty() {
                            n.to_string()
                        } else {
                            format!("{}: {}", n, m)
                        };
                    }
                }
                "[object Object]".to_string()
            }
            Value::Function(f) => match &**f {
                Function::Closure(c) => format!(
                    "function {}() {{ [source code] }}",
                    c.def.name.as_deref().unwrap_or("")
                ),
                _ => "function () { [native code] }".to_string(),
            },
            Value::Element(_) => "[object Object]".to_string(),
        }
    }

    /// Property key form of a value (`obj[value]`).
    pub fn to_property_key(&self) -> String {
        self.to_js_string()
    }

    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => {
                Rc::ptr_eq(a, b) || matches!((&**a, &**b), (Function::Native(x), Function::Native(y)) if x == y)
            }
            (Value::Element(a), Value::Element(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `==` with the usual primitive coercions.
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Value::Number(_), Value::Str(_))
            | (Value::Str(_), Value::Number(_))
            | (Value::Bool(_), _)
            | (_, Value::Bool(_)) => {
                if self.is_primitive() && other.is_primitive() {
                    self.to_number() == other.to_number()
                } else {
                    self.to_primitive().loose_equals(&other.to_primitive())
                }
            }
            (a, b) if a.is_primitive() != b.is_primitive() => {
                a.to_primitive().loose_equals(&b.to_primitive())
            }
            _ => self.strict_equals(other),
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_) | Value::Str(_)
        )
    }

    pub fn to_primitive(&self) -> Value {
        if self.is_primitive() {
            self.clone()
        } else {
            Value::str(self.to_js_string())
        }
    }

    /// A short description for diagnostics, e.g. `object with keys {a, b}`.
    pub fn describe(&self) -> String {
        match self {
            Value::Object(obj) => {
                let keys: Vec<String> = obj.borrow().keys().map(|k| k.to_string()).collect();
                format!("object with keys {{{}}}", keys.join(", "))
            }
            Value::Str(s) => format!("\"{}\"", s),
            other => other.to_js_string(),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Array(items) => write!(f, "Array(len={})", items.borrow().len()),
            Value::Object(obj) => write!(f, "Object({:?})", obj.borrow().keys().collect::<Vec<_>>()),
            Value::Function(func) => match &**func {
                Function::Closure(c) => write!(f, "Closure({:?})", c.def.name),
                Function::Native(n) => write!(f, "Native({:?})", n),
                Function::Method { name, .. } => write!(f, "Method({})", name),
            },
            Value::Element(el) => write!(f, "Element({:?})", el.ty),
            other => write!(f, "{}", other.to_js_string()),
        }
    }
}

/// `Number(string)`: whitespace-trimmed decimal, hex, or the empty string as 0.
pub(crate) fn string_to_number(s: &str) -> f64 {
    let t = s.trim();
    if t.is_empty() {
        return 0.0;
    }
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).map_or(f64::NAN, |n| n as f64);
    }
    match t {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if t.chars()
        .any(|c| !(c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')))
    {
        return f64::NAN;
    }
    t.parse::<f64>().unwrap_or(f64::NAN)
}

/// Number formatting as `String(n)` prints it.
pub(crate) fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let abs = n.abs();
    if abs >= 1e21 || abs < 1e-6 {
        let s = format!("{:e}", n);
        return match s.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => s,
        };
    }
    if n.fract() == 0.0 {
        return format!("{}", n as i64);
    }
    format!("{}", n)
}

// ──────────────────────────────────────────────
// Objects
// ──────────────────────────────────────────────

/// Insertion-ordered property map.
#[derive(Clone, Default)]
pub(crate) struct Object {
    props: Vec<(String, Value)>,
}

impl Object {
    pub fn get(&self, key: &str) -> Option<Value> {
        self.props
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.props.iter().any(|(k, _)| k == key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.props.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.props.push((key, value)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.props.iter().map(|(k, _)| k.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.props.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut obj = Object::default();
        for (k, v) in iter {
            obj.set(k, v);
        }
        obj
    }
}

// ──────────────────────────────────────────────
// Functions
// ──────────────────────────────────────────────

pub(crate) enum Function {
    Closure(Closure),
    Native(Native),
    /// A built-in method bound to its receiver, e.g. `items.map`.
    Method { receiver: Value, name: Rc<str> },
}

pub(crate) struct Closure {
    pub def: Rc<FunctionDef>,
    pub env: Rc<Env>,
}

/// Host-implemented callables exposed through the preview scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Native {
    Render,
    CreateElement,
    UseState,
    UseReducer,
    UseEffect,
    UseMemo,
    UseCallback,
    UseRef,
    /// The setter returned by `useState`; a single static render ignores it.
    StateSetter,
    Fragment,
    StrictMode,
    Icon(&'static IconDef),
    Primitive(Primitive),
    /// Namespaced helper such as `Math.max` or `JSON.stringify`.
    Builtin(&'static str),
    StringCtor,
    NumberCtor,
    ErrorCtor(&'static str),
    ArrayCtor,
    ObjectCtor,
}

// ──────────────────────────────────────────────
// Elements
// ──────────────────────────────────────────────

/// A view-library element: `type` plus props, children under `props.children`.
pub(crate) struct Element {
    pub ty: ElementType,
    pub props: Object,
    pub key: Option<String>,
    /// Where the element was created; render-pass faults point here.
    pub span: Span,
}

#[derive(Clone)]
pub(crate) enum ElementType {
    Host(String),
    Fragment,
    StrictMode,
    Component(Rc<Function>),
}

impl fmt::Debug for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Host(tag) => write!(f, "<{}>", tag),
            ElementType::Fragment => write!(f, "Fragment"),
            ElementType::StrictMode => write!(f, "StrictMode"),
            ElementType::Component(func) => match &**func {
                Function::Closure(c) => write!(f, "{}", c.def.name.as_deref().unwrap_or("anonymous")),
                Function::Native(n) => write!(f, "{:?}", n),
                Function::Method { name, .. } => write!(f, "{}", name),
            },
        }
    }
}

// ──────────────────────────────────────────────
// Environments
// ──────────────────────────────────────────────

#[derive(Clone)]
struct Slot {
    /// `None` until a `let`/`const` declaration runs (temporal dead zone).
    value: Option<Value>,
    mutable: bool,
}

/// One lexical environment record.
pub(crate) struct Env {
    vars: RefCell<HashMap<String, Slot>>,
    parent: Option<Rc<Env>>,
}

pub(crate) enum Lookup {
    Found(Value),
    Uninitialized,
    Missing,
}

pub(crate) enum AssignError {
    Const,
    Uninitialized,
    Missing,
}

impl Env {
    pub fn new(parent: Option<Rc<Env>>) -> Rc<Env> {
        Rc::new(Env {
            vars: RefCell::new(HashMap::new()),
            parent,
        })
    }

    /// Create a binding in this record, replacing any previous one.
    pub fn declare(&self, name: &str, value: Option<Value>, mutable: bool) {
        self.vars
            .borrow_mut()
            .insert(name.to_string(), Slot { value, mutable });
    }

    /// Fresh record holding copies of this one's bindings, under the same parent.
    pub fn copy_record(&self) -> Rc<Env> {
        Rc::new(Env {
            vars: RefCell::new(self.vars.borrow().clone()),
            parent: self.parent.clone(),
        })
    }

    /// Declare only if absent; used for `var` re-declarations.
    pub fn declare_var(&self, name: &str) {
        self.vars
            .borrow_mut()
            .entry(name.to_string())
            .or_insert(Slot {
                value: Some(Value::Undefined),
                mutable: true,
            });
    }

    pub fn lookup(&self, name: &str) -> Lookup {
        if let Some(slot) = self.vars.borrow().get(name) {
            return match &slot.value {
                Some(v) => Lookup::Found(v.clone()),
                None => Lookup::Uninitialized,
            };
        }
        match &self.parent {
            Some(p) => p.lookup(name),
            None => Lookup::Missing,
        }
    }

    pub fn assign(&self, name: &str, value: Value) -> Result<(), AssignError> {
        if let Some(slot) = self.vars.borrow_mut().get_mut(name) {
            if slot.value.is_none() {
                return Err(AssignError::Uninitialized);
            }
            if !slot.mutable {
                return Err(AssignError::Const);
            }
            slot.value = Some(value);
            return Ok(());
        }
        match &self.parent {
            Some(p) => p.assign(name, value),
            None => Err(AssignError::Missing),
        }
    }

    /// Drop every binding; breaks closure/environment reference cycles.
    pub fn clear(&self) {
        self.vars.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_formatting_matches_js() {
        assert_eq!(number_to_string(1.0), "1");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(number_to_string(12.5), "12.5");
        assert_eq!(number_to_string(1e21), "1e+21");
        assert_eq!(number_to_string(1e-7), "1e-7");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn string_coercion_to_number() {
        assert_eq!(string_to_number("  42 "), 42.0);
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("0x1f"), 31.0);
        assert!(string_to_number("12px").is_nan());
    }

    #[test]
    fn loose_and_strict_equality() {
        assert!(Value::Null.loose_equals(&Value::Undefined));
        assert!(!Value::Null.strict_equals(&Value::Undefined));
        assert!(Value::Number(1.0).loose_equals(&Value::str("1")));
        assert!(Value::Bool(true).loose_equals(&Value::Number(1.0)));
        assert!(!Value::Number(f64::NAN).strict_equals(&Value::Number(f64::NAN)));
        let arr = Value::array(vec![]);
        assert!(arr.strict_equals(&arr.clone()));
        assert!(!arr.strict_equals(&Value::array(vec![])));
    }

    #[test]
    fn truthiness() {
        assert!(!Value::str("").truthy());
        assert!(Value::str("0").truthy());
        assert!(!Value::Number(f64::NAN).truthy());
        assert!(Value::array(vec![]).truthy());
    }

    #[test]
    fn tdz_and_const_assignment() {
        let env = Env::new(None);
        env.declare("x", None, true);
        assert!(matches!(env.lookup("x"), Lookup::Uninitialized));
        env.declare("x", Some(Value::Number(1.0)), true);
        assert!(matches!(env.lookup("x"), Lookup::Found(Value::Number(n)) if n == 1.0));
        env.declare("c", Some(Value::Null), false);
        assert!(matches!(env.assign("c", Value::Null), Err(AssignError::Const)));
        let child = Env::new(Some(env.clone()));
        assert!(child.assign("x", Value::Number(2.0)).is_ok());
        assert!(matches!(env.lookup("x"), Lookup::Found(Value::Number(n)) if n == 2.0));
    }

    #[test]
    fn copied_record_is_independent() {
        let env = Env::new(None);
        env.declare("i", Some(Value::Number(0.0)), true);
        let copy = env.copy_record();
        assert!(copy.assign("i", Value::Number(1.0)).is_ok());
        assert!(matches!(env.lookup("i"), Lookup::Found(Value::Number(n)) if n == 0.0));
        assert!(matches!(copy.lookup("i"), Lookup::Found(Value::Number(n)) if n == 1.0));
    }
}
