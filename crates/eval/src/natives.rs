//! Host-implemented functions: hooks, helpers, and built-in methods.

use livecode_core::ast::Span;
use std::cell::RefCell;
use std::rc::Rc;

use crate::interpreter::{check_array_len, check_string_len, Eval, Fault, Interpreter};
use crate::scope::{Helper, REACT_MEMBERS};
use crate::value::{number_to_string, Function, Native, Object, Value};

pub(crate) const STRING_METHODS: &[&str] = &[
    "at",
    "charAt",
    "charCodeAt",
    "concat",
    "endsWith",
    "includes",
    "indexOf",
    "lastIndexOf",
    "localeCompare",
    "padEnd",
    "padStart",
    "repeat",
    "replace",
    "replaceAll",
    "slice",
    "split",
    "startsWith",
    "substr",
    "substring",
    "toLocaleLowerCase",
    "toLocaleUpperCase",
    "toLowerCase",
    "toString",
    "toUpperCase",
    "trim",
    "trimEnd",
    "trimStart",
    "valueOf",
];

pub(crate) const ARRAY_METHODS: &[&str] = &[
    "at",
    "concat",
    "every",
    "fill",
    "filter",
    "find",
    "findIndex",
    "findLast",
    "findLastIndex",
    "flat",
    "flatMap",
    "forEach",
    "includes",
    "indexOf",
    "join",
    "lastIndexOf",
    "map",
    "pop",
    "push",
    "reduce",
    "reduceRight",
    "reverse",
    "shift",
    "slice",
    "some",
    "sort",
    "splice",
    "toString",
    "unshift",
];

pub(crate) const NUMBER_METHODS: &[&str] = &["toFixed", "toLocaleString", "toString", "valueOf"];

pub(crate) const OBJECT_METHODS: &[&str] = &["hasOwnProperty", "toString"];

const MATH_FUNCTIONS: &[&str] = &[
    "Math.abs",
    "Math.acos",
    "Math.asin",
    "Math.atan",
    "Math.atan2",
    "Math.cbrt",
    "Math.ceil",
    "Math.cos",
    "Math.exp",
    "Math.floor",
    "Math.hypot",
    "Math.log",
    "Math.log10",
    "Math.log2",
    "Math.max",
    "Math.min",
    "Math.pow",
    "Math.random",
    "Math.round",
    "Math.sign",
    "Math.sin",
    "Math.sqrt",
    "Math.tan",
    "Math.trunc",
];

const MATH_CONSTANTS: &[(&str, f64)] = &[
    ("E", std::f64::consts::E),
    ("LN10", std::f64::consts::LN_10),
    ("LN2", std::f64::consts::LN_2),
    ("LOG10E", std::f64::consts::LOG10_E),
    ("LOG2E", std::f64::consts::LOG2_E),
    ("PI", std::f64::consts::PI),
    ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
    ("SQRT2", std::f64::consts::SQRT_2),
];

const CONSOLE_FUNCTIONS: &[&str] = &[
    "console.debug",
    "console.error",
    "console.info",
    "console.log",
    "console.warn",
];

/// Object keyed by the part of each builtin name after the namespace dot.
fn namespace_object(functions: &[&'static str]) -> Object {
    functions
        .iter()
        .map(|full| {
            let key = full.split_once('.').map_or(*full, |(_, k)| k);
            (key.to_string(), Value::native(Native::Builtin(full)))
        })
        .collect()
}

pub(crate) fn react_member(name: &str) -> Value {
    let native = match name {
        "createElement" => Native::CreateElement,
        "Fragment" => Native::Fragment,
        "StrictMode" => Native::StrictMode,
        "useState" => Native::UseState,
        "useReducer" => Native::UseReducer,
        "useEffect" | "useLayoutEffect" => Native::UseEffect,
        "useMemo" => Native::UseMemo,
        "useCallback" => Native::UseCallback,
        "useRef" => Native::UseRef,
        _ => return Value::Undefined,
    };
    Value::native(native)
}

pub(crate) fn react_value() -> Value {
    Value::object(
        REACT_MEMBERS
            .iter()
            .map(|m| (m.to_string(), react_member(m)))
            .collect(),
    )
}

pub(crate) fn helper_value(helper: Helper) -> Value {
    match helper {
        Helper::Math => {
            let mut math = namespace_object(MATH_FUNCTIONS);
            for (name, value) in MATH_CONSTANTS {
                math.set(*name, Value::Number(*value));
            }
            Value::object(math)
        }
        Helper::Json => Value::object(namespace_object(&["JSON.parse", "JSON.stringify"])),
        Helper::Console => Value::object(namespace_object(CONSOLE_FUNCTIONS)),
        Helper::Object => Value::native(Native::ObjectCtor),
        Helper::Array => Value::native(Native::ArrayCtor),
        Helper::String => Value::native(Native::StringCtor),
        Helper::Number => Value::native(Native::NumberCtor),
        Helper::Error(name) => Value::native(Native::ErrorCtor(name)),
    }
}

/// Static members of constructor helpers, such as `Object.keys`.
pub(crate) fn static_member(native: Native, key: &str) -> Option<Value> {
    let builtin = |name: &'static str| Some(Value::native(Native::Builtin(name)));
    match (native, key) {
        (Native::ObjectCtor, "keys") => builtin("Object.keys"),
        (Native::ObjectCtor, "values") => builtin("Object.values"),
        (Native::ObjectCtor, "entries") => builtin("Object.entries"),
        (Native::ObjectCtor, "assign") => builtin("Object.assign"),
        (Native::ObjectCtor, "fromEntries") => builtin("Object.fromEntries"),
        (Native::ObjectCtor, "freeze") => builtin("Object.freeze"),
        (Native::ArrayCtor, "isArray") => builtin("Array.isArray"),
        (Native::ArrayCtor, "from") => builtin("Array.from"),
        (Native::ArrayCtor, "of") => builtin("Array.of"),
        (Native::StringCtor, "fromCharCode") => builtin("String.fromCharCode"),
        (Native::NumberCtor, "isInteger") => builtin("Number.isInteger"),
        (Native::NumberCtor, "isSafeInteger") => builtin("Number.isSafeInteger"),
        (Native::NumberCtor, "isFinite") => builtin("Number.isFinite"),
        (Native::NumberCtor, "isNaN") => builtin("Number.isNaN"),
        (Native::NumberCtor, "parseFloat") => builtin("Number.parseFloat"),
        (Native::NumberCtor, "parseInt") => builtin("Number.parseInt"),
        (Native::NumberCtor, "MAX_SAFE_INTEGER") => Some(Value::Number(9007199254740991.0)),
        (Native::NumberCtor, "MIN_SAFE_INTEGER") => Some(Value::Number(-9007199254740991.0)),
        (Native::NumberCtor, "EPSILON") => Some(Value::Number(f64::EPSILON)),
        (Native::NumberCtor, "MAX_VALUE") => Some(Value::Number(f64::MAX)),
        (Native::NumberCtor, "POSITIVE_INFINITY") => Some(Value::Number(f64::INFINITY)),
        (Native::NumberCtor, "NEGATIVE_INFINITY") => Some(Value::Number(f64::NEG_INFINITY)),
        (Native::NumberCtor, "NaN") => Some(Value::Number(f64::NAN)),
        _ => None,
    }
}

pub(crate) fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::str(s),
        serde_json::Value::Array(items) => Value::array(items.iter().map(json_to_value).collect()),
        serde_json::Value::Object(map) => Value::object(
            map.iter()
                .map(|(k, v)| (k.clone(), json_to_value(v)))
                .collect(),
        ),
    }
}

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or(Value::Undefined)
}

fn get_field(value: &Value, key: &str) -> Option<Value> {
    match value {
        Value::Object(o) => o.borrow().get(key).filter(|v| !v.is_nullish()),
        _ => None,
    }
}

/// Resolve a relative index argument (`slice`, `at`, ...) against `len`.
fn relative_index(value: Option<&Value>, len: usize, default: usize) -> usize {
    let n = match value {
        None | Some(Value::Undefined) => return default,
        Some(v) => v.to_number(),
    };
    if n.is_nan() {
        return 0;
    }
    let n = n.trunc();
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        n.min(len as f64) as usize
    }
}

fn same_value_zero(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_nan() && y.is_nan() => true,
        _ => a.strict_equals(b),
    }
}

impl Interpreter<'_> {
    pub(crate) fn call_native(&mut self, native: Native, args: Vec<Value>, span: Span) -> Eval<Value> {
        match native {
            Native::Render => {
                self.rendered = Some(arg(&args, 0));
                Ok(Value::Undefined)
            }
            Native::CreateElement => self.create_element(args, span),
            Native::UseState => {
                let state = match arg(&args, 0) {
                    Value::Function(init) => self.call(&init, Vec::new(), span)?,
                    init => init,
                };
                Ok(Value::array(vec![state, Value::native(Native::StateSetter)]))
            }
            Native::UseReducer => {
                let initial = arg(&args, 1);
                let state = match arg(&args, 2) {
                    Value::Function(init) => self.call(&init, vec![initial], span)?,
                    _ => initial,
                };
                Ok(Value::array(vec![state, Value::native(Native::StateSetter)]))
            }
            Native::UseEffect | Native::StateSetter => Ok(Value::Undefined),
            Native::UseMemo => match arg(&args, 0) {
                Value::Function(f) => self.call(&f, Vec::new(), span),
                other => Err(Fault::type_error(
                    format!("useMemo expects a function, got {}", other.type_of()),
                    span,
                )),
            },
            Native::UseCallback => Ok(arg(&args, 0)),
            Native::UseRef => {
                let mut obj = Object::default();
                obj.set("current", arg(&args, 0));
                Ok(Value::object(obj))
            }
            Native::Fragment | Native::StrictMode => {
                let props = arg(&args, 0);
                Ok(get_field(&props, "children").unwrap_or(Value::Undefined))
            }
            Native::Icon(_) | Native::Primitive(_) => {
                self.create_element(vec![Value::native(native), arg(&args, 0)], span)
            }
            Native::Builtin(name) => self.call_builtin(name, args, span),
            Native::StringCtor => Ok(Value::str(
                args.first().map_or(String::new(), Value::to_js_string),
            )),
            Native::NumberCtor => Ok(Value::Number(args.first().map_or(0.0, Value::to_number))),
            Native::ErrorCtor(name) => {
                let message = match arg(&args, 0) {
                    Value::Undefined => String::new(),
                    v => v.to_js_string(),
                };
                Ok(Value::error(name, message))
            }
            Native::ArrayCtor => {
                if let [Value::Number(n)] = args.as_slice() {
                    let n = *n;
                    if n < 0.0 || n.fract() != 0.0 || !n.is_finite() {
                        return Err(Fault::range_error("Invalid array length", span));
                    }
                    check_array_len(n as usize, span)?;
                    return Ok(Value::array(vec![Value::Undefined; n as usize]));
                }
                Ok(Value::array(args))
            }
            Native::ObjectCtor => Ok(match arg(&args, 0) {
                v @ (Value::Object(_) | Value::Array(_)) => v,
                _ => Value::object(Object::default()),
            }),
        }
    }

    fn call_builtin(&mut self, name: &'static str, args: Vec<Value>, span: Span) -> Eval<Value> {
        let (namespace, member) = name.split_once('.').unwrap_or(("", name));
        match namespace {
            "Math" => self.math(member, &args),
            "JSON" => match member {
                "parse" => {
                    let text = arg(&args, 0).to_js_string();
                    let json: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
                        Fault::error("SyntaxError", format!("JSON.parse: {}", e), span)
                    })?;
                    Ok(json_to_value(&json))
                }
                _ => {
                    let indent = match arg(&args, 2) {
                        Value::Number(n) if n >= 1.0 => " ".repeat(n.min(10.0) as usize),
                        Value::Str(s) => s.chars().take(10).collect(),
                        _ => String::new(),
                    };
                    let mut out = String::new();
                    let mut stack = Vec::new();
                    if self.stringify(&arg(&args, 0), &indent, "", &mut stack, &mut out, span)? {
                        Ok(Value::str(out))
                    } else {
                        Ok(Value::Undefined)
                    }
                }
            },
            "console" => {
                let message = args
                    .iter()
                    .map(Value::to_js_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                tracing::debug!(target: "livecode::console", method = member, "{}", message);
                Ok(Value::Undefined)
            }
            "Object" => self.object_static(member, args, span),
            "Array" => self.array_static(member, args, span),
            "Number" => Ok(number_static(member, &args)),
            "String" => {
                let text: String = args
                    .iter()
                    .filter_map(|v| char::from_u32(v.to_number() as u32))
                    .collect();
                Ok(Value::str(text))
            }
            _ => Err(Fault::type_error(format!("{} is not a function", name), span)),
        }
    }

    fn math(&mut self, member: &str, args: &[Value]) -> Eval<Value> {
        let x = arg(args, 0).to_number();
        let y = arg(args, 1).to_number();
        let n = match member {
            "abs" => x.abs(),
            "acos" => x.acos(),
            "asin" => x.asin(),
            "atan" => x.atan(),
            "atan2" => x.atan2(y),
            "cbrt" => x.cbrt(),
            "ceil" => x.ceil(),
            "cos" => x.cos(),
            "exp" => x.exp(),
            "floor" => x.floor(),
            "hypot" => args.iter().map(|v| v.to_number().powi(2)).sum::<f64>().sqrt(),
            "log" => x.ln(),
            "log10" => x.log10(),
            "log2" => x.log2(),
            "max" => args.iter().map(Value::to_number).fold(f64::NEG_INFINITY, |acc, v| {
                if acc.is_nan() || v.is_nan() {
                    f64::NAN
                } else {
                    acc.max(v)
                }
            }),
            "min" => args.iter().map(Value::to_number).fold(f64::INFINITY, |acc, v| {
                if acc.is_nan() || v.is_nan() {
                    f64::NAN
                } else {
                    acc.min(v)
                }
            }),
            "pow" => crate::interpreter::binary(
                livecode_core::ast::BinaryOp::Pow,
                &Value::Number(x),
                &Value::Number(y),
                self.last_span,
            )?
            .to_number(),
            "random" => self.next_random(),
            "round" => {
                let f = x.floor();
                if x - f >= 0.5 {
                    f + 1.0
                } else {
                    f
                }
            }
            "sign" => {
                if x.is_nan() || x == 0.0 {
                    x
                } else {
                    x.signum()
                }
            }
            "sin" => x.sin(),
            "sqrt" => x.sqrt(),
            "tan" => x.tan(),
            _ => x.trunc(),
        };
        Ok(Value::Number(n))
    }

    /// Deterministic xorshift sequence; every evaluation starts from the same seed.
    fn next_random(&mut self) -> f64 {
        let mut x = self.rng_state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.rng_state = x;
        (x >> 11) as f64 / (1u64 << 53) as f64
    }

    fn object_static(&mut self, member: &str, args: Vec<Value>, span: Span) -> Eval<Value> {
        let target = arg(&args, 0);
        Ok(match member {
            "keys" => Value::array(
                self.own_entries(&target)
                    .into_iter()
                    .map(|(k, _)| Value::str(k))
                    .collect(),
            ),
            "values" => Value::array(
                self.own_entries(&target)
                    .into_iter()
                    .map(|(_, v)| v)
                    .collect(),
            ),
            "entries" => Value::array(
                self.own_entries(&target)
                    .into_iter()
                    .map(|(k, v)| Value::array(vec![Value::str(k), v]))
                    .collect(),
            ),
            "assign" => {
                if target.is_nullish() {
                    return Err(Fault::type_error(
                        "Cannot convert undefined or null to object",
                        span,
                    ));
                }
                for source in &args[1..] {
                    for (k, v) in self.own_entries(source) {
                        self.set_property(&target, &k, v, span)?;
                    }
                }
                target
            }
            "fromEntries" => {
                let mut obj = Object::default();
                for entry in self.iter_items(&target, span)? {
                    let pair = self.iter_items(&entry, span)?;
                    let key = pair.first().cloned().unwrap_or(Value::Undefined);
                    let value = pair.get(1).cloned().unwrap_or(Value::Undefined);
                    obj.set(key.to_property_key(), value);
                }
                Value::object(obj)
            }
            _ => target,
        })
    }

    fn array_static(&mut self, member: &str, args: Vec<Value>, span: Span) -> Eval<Value> {
        match member {
            "isArray" => Ok(Value::Bool(matches!(arg(&args, 0), Value::Array(_)))),
            "of" => Ok(Value::array(args)),
            _ => {
                let source = arg(&args, 0);
                let items = match &source {
                    Value::Array(_) | Value::Str(_) => self.iter_items(&source, span)?,
                    Value::Object(_) => {
                        let len = get_field(&source, "length").map_or(0.0, |v| v.to_number());
                        let len = if len.is_finite() && len > 0.0 { len as usize } else { 0 };
                        check_array_len(len, span)?;
                        let mut items = Vec::with_capacity(len);
                        for i in 0..len {
                            items.push(self.get_property(&source, &i.to_string(), span)?);
                        }
                        items
                    }
                    Value::Undefined | Value::Null => {
                        return Err(Fault::type_error(
                            format!("{} is not iterable", source.to_js_string()),
                            span,
                        ))
                    }
                    _ => Vec::new(),
                };
                let Value::Function(map) = arg(&args, 1) else {
                    return Ok(Value::array(items));
                };
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.into_iter().enumerate() {
                    self.tick()?;
                    out.push(self.call(&map, vec![item, Value::Number(i as f64)], span)?);
                }
                Ok(Value::array(out))
            }
        }
    }

    // ── Methods ──────────────────────────────────────────────────────

    pub(crate) fn call_method(&mut self, receiver: &Value, name: &str, args: Vec<Value>, span: Span) -> Eval<Value> {
        match receiver {
            Value::Array(items) => self.array_method(receiver, items.clone(), name, args, span),
            Value::Str(s) => self.string_method(s.clone(), name, args, span),
            Value::Number(n) => number_method(*n, name, &args, span),
            Value::Bool(b) => Ok(match name {
                "valueOf" => Value::Bool(*b),
                _ => Value::str(b.to_string()),
            }),
            Value::Object(o) => Ok(match name {
                "hasOwnProperty" => {
                    Value::Bool(o.borrow().contains(&arg(&args, 0).to_property_key()))
                }
                _ => Value::str(receiver.to_js_string()),
            }),
            other => Err(Fault::type_error(
                format!("{}.{} is not a function", other.to_js_string(), name),
                span,
            )),
        }
    }

    fn callback(&self, args: &[Value], method: &str, span: Span) -> Eval<Rc<Function>> {
        match args.first() {
            Some(Value::Function(f)) => Ok(f.clone()),
            other => Err(Fault::type_error(
                format!(
                    "{} is not a function (in Array.prototype.{})",
                    other.map_or("undefined".to_string(), Value::describe),
                    method
                ),
                span,
            )),
        }
    }

    fn array_method(
        &mut self,
        receiver: &Value,
        items: Rc<RefCell<Vec<Value>>>,
        name: &str,
        args: Vec<Value>,
        span: Span,
    ) -> Eval<Value> {
        let snapshot = || items.borrow().clone();
        let len = items.borrow().len();
        match name {
            "map" | "filter" | "forEach" | "find" | "findIndex" | "some" | "every" => {
                let f = self.callback(&args, name, span)?;
                let mut out = Vec::new();
                for (i, item) in snapshot().into_iter().enumerate() {
                    self.tick()?;
                    let index = Value::Number(i as f64);
                    let result = self.call(&f, vec![item.clone(), index, receiver.clone()], span)?;
                    match name {
                        "map" => out.push(result),
                        "filter" if result.truthy() => out.push(item),
                        "find" if result.truthy() => return Ok(item),
                        "findIndex" if result.truthy() => return Ok(Value::Number(i as f64)),
                        "some" if result.truthy() => return Ok(Value::Bool(true)),
                        "every" if !result.truthy() => return Ok(Value::Bool(false)),
                        _ => {}
                    }
                }
                Ok(match name {
                    "map" | "filter" => Value::array(out),
                    "findIndex" => Value::Number(-1.0),
                    "some" => Value::Bool(false),
                    "every" => Value::Bool(true),
                    _ => Value::Undefined,
                })
            }
            "findLast" | "findLastIndex" => {
                let f = self.callback(&args, name, span)?;
                for (i, item) in snapshot().into_iter().enumerate().rev() {
                    self.tick()?;
                    let index = Value::Number(i as f64);
                    if self.call(&f, vec![item.clone(), index, receiver.clone()], span)?.truthy() {
                        return Ok(if name == "findLast" {
                            item
                        } else {
                            Value::Number(i as f64)
                        });
                    }
                }
                Ok(if name == "findLast" {
                    Value::Undefined
                } else {
                    Value::Number(-1.0)
                })
            }
            "reduce" | "reduceRight" => {
                let f = self.callback(&args, name, span)?;
                let mut indexed: Vec<(usize, Value)> = snapshot().into_iter().enumerate().collect();
                if name == "reduceRight" {
                    indexed.reverse();
                }
                let mut iter = indexed.into_iter();
                let mut acc = match args.get(1) {
                    Some(initial) => initial.clone(),
                    None => match iter.next() {
                        Some((_, first)) => first,
                        None => {
                            return Err(Fault::type_error(
                                "Reduce of empty array with no initial value",
                                span,
                            ))
                        }
                    },
                };
                for (i, item) in iter {
                    self.tick()?;
                    acc = self.call(
                        &f,
                        vec![acc, item, Value::Number(i as f64), receiver.clone()],
                        span,
                    )?;
                }
                Ok(acc)
            }
            "flatMap" => {
                let f = self.callback(&args, name, span)?;
                let mut out = Vec::new();
                for (i, item) in snapshot().into_iter().enumerate() {
                    self.tick()?;
                    match self.call(&f, vec![item, Value::Number(i as f64), receiver.clone()], span)? {
                        Value::Array(inner) => out.extend(inner.borrow().iter().cloned()),
                        v => out.push(v),
                    }
                }
                check_array_len(out.len(), span)?;
                Ok(Value::array(out))
            }
            "flat" => {
                let depth = match arg(&args, 0) {
                    Value::Undefined => 1.0,
                    v => v.to_number(),
                };
                let mut out = Vec::new();
                flatten_into(&snapshot(), depth, &mut out);
                check_array_len(out.len(), span)?;
                Ok(Value::array(out))
            }
            "includes" => {
                let needle = arg(&args, 0);
                Ok(Value::Bool(items.borrow().iter().any(|v| same_value_zero(v, &needle))))
            }
            "indexOf" | "lastIndexOf" => {
                let needle = arg(&args, 0);
                let items = items.borrow();
                let found = if name == "indexOf" {
                    items.iter().position(|v| v.strict_equals(&needle))
                } else {
                    items.iter().rposition(|v| v.strict_equals(&needle))
                };
                Ok(Value::Number(found.map_or(-1.0, |i| i as f64)))
            }
            "join" | "toString" => {
                let sep = match arg(&args, 0) {
                    Value::Undefined => ",".to_string(),
                    v if name == "join" => v.to_js_string(),
                    _ => ",".to_string(),
                };
                let joined = items
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
                    .join(&sep);
                check_string_len(joined.len(), span)?;
                Ok(Value::str(joined))
            }
            "slice" => {
                let start = relative_index(args.first(), len, 0);
                let end = relative_index(args.get(1), len, len);
                let items = items.borrow();
                Ok(Value::array(
                    items.get(start..end.max(start)).unwrap_or_default().to_vec(),
                ))
            }
            "at" => {
                let i = arg(&args, 0).to_number();
                let i = if i.is_nan() { 0.0 } else { i.trunc() };
                let idx = if i < 0.0 { len as f64 + i } else { i };
                Ok(if idx < 0.0 {
                    Value::Undefined
                } else {
                    items.borrow().get(idx as usize).cloned().unwrap_or(Value::Undefined)
                })
            }
            "concat" => {
                let mut out = snapshot();
                for a in &args {
                    match a {
                        Value::Array(other) => out.extend(other.borrow().iter().cloned()),
                        v => out.push(v.clone()),
                    }
                }
                check_array_len(out.len(), span)?;
                Ok(Value::array(out))
            }
            "push" => {
                check_array_len(len + args.len(), span)?;
                let mut items = items.borrow_mut();
                items.extend(args);
                Ok(Value::Number(items.len() as f64))
            }
            "unshift" => {
                check_array_len(len + args.len(), span)?;
                let mut items = items.borrow_mut();
                items.splice(0..0, args);
                Ok(Value::Number(items.len() as f64))
            }
            "pop" => Ok(items.borrow_mut().pop().unwrap_or(Value::Undefined)),
            "shift" => {
                let mut items = items.borrow_mut();
                Ok(if items.is_empty() {
                    Value::Undefined
                } else {
                    items.remove(0)
                })
            }
            "reverse" => {
                items.borrow_mut().reverse();
                Ok(receiver.clone())
            }
            "fill" => {
                let value = arg(&args, 0);
                let start = relative_index(args.get(1), len, 0);
                let end = relative_index(args.get(2), len, len);
                let mut items = items.borrow_mut();
                for slot in items.iter_mut().take(end).skip(start) {
                    *slot = value.clone();
                }
                Ok(receiver.clone())
            }
            "splice" => {
                let start = relative_index(args.first(), len, 0);
                let delete = match args.get(1) {
                    None => len - start,
                    Some(v) => {
                        let n = v.to_number();
                        if n.is_nan() || n < 0.0 {
                            0
                        } else {
                            (n as usize).min(len - start)
                        }
                    }
                };
                let inserted: Vec<Value> = args.into_iter().skip(2).collect();
                check_array_len(len - delete + inserted.len(), span)?;
                let removed: Vec<Value> = items
                    .borrow_mut()
                    .splice(start..start + delete, inserted)
                    .collect();
                Ok(Value::array(removed))
            }
            "sort" => {
                let cmp = match arg(&args, 0) {
                    Value::Function(f) => Some(f),
                    Value::Undefined => None,
                    other => {
                        return Err(Fault::type_error(
                            format!(
                                "The comparison function must be either a function or undefined: {}",
                                other.describe()
                            ),
                            span,
                        ))
                    }
                };
                let (defined, undefined): (Vec<Value>, Vec<Value>) = snapshot()
                    .into_iter()
                    .partition(|v| !matches!(v, Value::Undefined));
                let mut sorted = self.merge_sort(defined, cmp.as_ref(), span)?;
                sorted.extend(undefined);
                *items.borrow_mut() = sorted;
                Ok(receiver.clone())
            }
            _ => Err(Fault::type_error(
                format!("array.{} is not a function", name),
                span,
            )),
        }
    }

    /// Stable merge sort that tolerates inconsistent comparators.
    fn merge_sort(&mut self, mut items: Vec<Value>, cmp: Option<&Rc<Function>>, span: Span) -> Eval<Vec<Value>> {
        if items.len() <= 1 {
            return Ok(items);
        }
        let right = items.split_off(items.len() / 2);
        let left = self.merge_sort(items, cmp, span)?;
        let right = self.merge_sort(right, cmp, span)?;
        let mut out = Vec::with_capacity(left.len() + right.len());
        let (mut i, mut j) = (0, 0);
        while i < left.len() && j < right.len() {
            self.tick()?;
            let after = match cmp {
                Some(f) => {
                    self.call(f, vec![left[i].clone(), right[j].clone()], span)?
                        .to_number()
                        > 0.0
                }
                None => left[i].to_js_string() > right[j].to_js_string(),
            };
            if after {
                out.push(right[j].clone());
                j += 1;
            } else {
                out.push(left[i].clone());
                i += 1;
            }
        }
        out.extend_from_slice(&left[i..]);
        out.extend_from_slice(&right[j..]);
        Ok(out)
    }

    fn string_method(&mut self, s: Rc<str>, name: &str, args: Vec<Value>, span: Span) -> Eval<Value> {
        let text = |i: usize| arg(&args, i).to_js_string();
        let chars = || s.chars().collect::<Vec<char>>();
        let char_count = s.chars().count();
        Ok(match name {
            "toUpperCase" | "toLocaleUpperCase" => Value::str(s.to_uppercase()),
            "toLowerCase" | "toLocaleLowerCase" => Value::str(s.to_lowercase()),
            "trim" => Value::str(s.trim()),
            "trimStart" => Value::str(s.trim_start()),
            "trimEnd" => Value::str(s.trim_end()),
            "toString" | "valueOf" => Value::Str(s.clone()),
            "includes" => Value::Bool(s.contains(text(0).as_str())),
            "startsWith" => Value::Bool(s.starts_with(text(0).as_str())),
            "endsWith" => Value::Bool(s.ends_with(text(0).as_str())),
            "indexOf" => Value::Number(
                s.find(text(0).as_str())
                    .map_or(-1.0, |b| s[..b].chars().count() as f64),
            ),
            "lastIndexOf" => Value::Number(
                s.rfind(text(0).as_str())
                    .map_or(-1.0, |b| s[..b].chars().count() as f64),
            ),
            "split" => {
                let limit = match arg(&args, 1) {
                    Value::Undefined => usize::MAX,
                    v => v.to_number().max(0.0) as usize,
                };
                let parts: Vec<Value> = match arg(&args, 0) {
                    Value::Undefined => vec![Value::Str(s.clone())],
                    sep => {
                        let sep = sep.to_js_string();
                        if sep.is_empty() {
                            s.chars().map(|c| Value::str(c.to_string())).collect()
                        } else {
                            s.split(sep.as_str()).map(Value::str).collect()
                        }
                    }
                };
                check_array_len(parts.len().min(limit), span)?;
                Value::array(parts.into_iter().take(limit).collect())
            }
            "slice" => {
                let cs = chars();
                let start = relative_index(args.first(), cs.len(), 0);
                let end = relative_index(args.get(1), cs.len(), cs.len());
                Value::str(cs.get(start..end.max(start)).unwrap_or_default().iter().collect::<String>())
            }
            "substring" => {
                let cs = chars();
                let clamp = |v: Option<&Value>, default: usize| match v {
                    None | Some(Value::Undefined) => default,
                    Some(v) => {
                        let n = v.to_number();
                        if n.is_nan() || n < 0.0 {
                            0
                        } else {
                            (n as usize).min(cs.len())
                        }
                    }
                };
                let (a, b) = (clamp(args.first(), 0), clamp(args.get(1), cs.len()));
                let (start, end) = if a <= b { (a, b) } else { (b, a) };
                Value::str(cs[start..end].iter().collect::<String>())
            }
            "substr" => {
                let cs = chars();
                let start = relative_index(args.first(), cs.len(), 0);
                let count = match arg(&args, 1) {
                    Value::Undefined => cs.len() - start,
                    v => (v.to_number().max(0.0) as usize).min(cs.len() - start),
                };
                Value::str(cs[start..start + count].iter().collect::<String>())
            }
            "charAt" | "at" => {
                let cs = chars();
                let i = arg(&args, 0).to_number();
                let i = if i.is_nan() { 0.0 } else { i.trunc() };
                let idx = if name == "at" && i < 0.0 { cs.len() as f64 + i } else { i };
                match (idx >= 0.0).then(|| cs.get(idx as usize)).flatten() {
                    Some(c) => Value::str(c.to_string()),
                    None if name == "at" => Value::Undefined,
                    None => Value::str(""),
                }
            }
            "charCodeAt" => {
                let i = arg(&args, 0).to_number();
                let i = if i.is_nan() { 0.0 } else { i.trunc() };
                match (i >= 0.0).then(|| s.chars().nth(i as usize)).flatten() {
                    Some(c) => Value::Number(u32::from(c) as f64),
                    None => Value::Number(f64::NAN),
                }
            }
            "concat" => {
                let mut out = s.to_string();
                for a in &args {
                    out.push_str(&a.to_js_string());
                }
                check_string_len(out.len(), span)?;
                Value::str(out)
            }
            "repeat" => {
                let n = arg(&args, 0).to_number();
                let n = if n.is_nan() { 0.0 } else { n };
                if n < 0.0 || n.is_infinite() {
                    return Err(Fault::range_error(
                        format!("Invalid count value: {}", number_to_string(n)),
                        span,
                    ));
                }
                check_string_len(s.len().saturating_mul(n as usize), span)?;
                Value::str(s.repeat(n as usize))
            }
            "padStart" | "padEnd" => {
                let target = arg(&args, 0).to_number();
                let target = if target.is_nan() { 0 } else { target.max(0.0) as usize };
                check_string_len(target, span)?;
                let filler = match arg(&args, 1) {
                    Value::Undefined => " ".to_string(),
                    v => v.to_js_string(),
                };
                if target <= char_count || filler.is_empty() {
                    Value::Str(s.clone())
                } else {
                    let pad: String = filler.chars().cycle().take(target - char_count).collect();
                    if name == "padStart" {
                        Value::str(pad + &*s)
                    } else {
                        Value::str(s.to_string() + &pad)
                    }
                }
            }
            "replace" | "replaceAll" => {
                let pattern = text(0);
                let replacement = arg(&args, 1);
                let mut out = String::new();
                let mut rest: &str = &s;
                let mut offset = 0usize;
                loop {
                    let found = if pattern.is_empty() && offset > s.len() {
                        None
                    } else {
                        rest.find(pattern.as_str())
                    };
                    let Some(pos) = found else { break };
                    out.push_str(&rest[..pos]);
                    let at = offset + pos;
                    let piece = match &replacement {
                        Value::Function(f) => self
                            .call(
                                f,
                                vec![
                                    Value::str(&pattern),
                                    Value::Number(s[..at].chars().count() as f64),
                                    Value::Str(s.clone()),
                                ],
                                span,
                            )?
                            .to_js_string(),
                        v => v.to_js_string(),
                    };
                    out.push_str(&piece);
                    check_string_len(out.len(), span)?;
                    let advance = pos + pattern.len();
                    if pattern.is_empty() {
                        match rest[advance..].chars().next() {
                            Some(c) => {
                                out.push(c);
                                rest = &rest[advance + c.len_utf8()..];
                                offset += advance + c.len_utf8();
                            }
                            None => {
                                rest = "";
                                offset = s.len() + 1;
                            }
                        }
                    } else {
                        rest = &rest[advance..];
                        offset += advance;
                    }
                    if name == "replace" {
                        break;
                    }
                }
                out.push_str(rest);
                Value::str(out)
            }
            "localeCompare" => Value::Number(match (*s).cmp(text(0).as_str()) {
                std::cmp::Ordering::Less => -1.0,
                std::cmp::Ordering::Equal => 0.0,
                std::cmp::Ordering::Greater => 1.0,
            }),
            _ => {
                return Err(Fault::type_error(
                    format!("string.{} is not a function", name),
                    span,
                ))
            }
        })
    }

    // ── JSON ─────────────────────────────────────────────────────────

    /// Writes `value` as JSON; returns `false` when the value has no JSON form.
    fn stringify(
        &mut self,
        value: &Value,
        indent: &str,
        prefix: &str,
        stack: &mut Vec<*const ()>,
        out: &mut String,
        span: Span,
    ) -> Eval<bool> {
        let ptr = match value {
            Value::Array(items) => Some(Rc::as_ptr(items) as *const ()),
            Value::Object(obj) => Some(Rc::as_ptr(obj) as *const ()),
            _ => None,
        };
        if let Some(ptr) = ptr {
            if stack.contains(&ptr) {
                return Err(Fault::type_error("Converting circular structure to JSON", span));
            }
            if stack.len() >= 256 {
                return Err(Fault::range_error("JSON nesting too deep", span));
            }
            stack.push(ptr);
        }
        self.tick()?;
        let inner = format!("{}{}", prefix, indent);
        let (open_sep, close_sep, colon) = if indent.is_empty() {
            (String::new(), String::new(), ":")
        } else {
            (format!("\n{}", inner), format!("\n{}", prefix), ": ")
        };
        let written = match value {
            Value::Undefined | Value::Function(_) => false,
            Value::Null => {
                out.push_str("null");
                true
            }
            Value::Bool(b) => {
                out.push_str(if *b { "true" } else { "false" });
                true
            }
            Value::Number(n) => {
                out.push_str(&if n.is_finite() {
                    number_to_string(*n)
                } else {
                    "null".to_string()
                });
                true
            }
            Value::Str(s) => {
                write_json_string(s, out);
                true
            }
            Value::Array(items) => {
                let items = items.borrow().clone();
                if items.is_empty() {
                    out.push_str("[]");
                } else {
                    out.push('[');
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            out.push(',');
                        }
                        out.push_str(&open_sep);
                        if !self.stringify(item, indent, &inner, stack, out, span)? {
                            out.push_str("null");
                        }
                    }
                    out.push_str(&close_sep);
                    out.push(']');
                }
                true
            }
            Value::Object(_) | Value::Element(_) => {
                let entries = self.own_entries(value);
                let mut parts = Vec::new();
                for (k, v) in entries {
                    let mut part = String::new();
                    write_json_string(&k, &mut part);
                    part.push_str(colon);
                    if self.stringify(&v, indent, &inner, stack, &mut part, span)? {
                        parts.push(part);
                    }
                }
                if parts.is_empty() {
                    out.push_str("{}");
                } else {
                    out.push('{');
                    for (i, part) in parts.iter().enumerate() {
                        if i > 0 {
                            out.push(',');
                        }
                        out.push_str(&open_sep);
                        out.push_str(part);
                    }
                    out.push_str(&close_sep);
                    out.push('}');
                }
                true
            }
        };
        if ptr.is_some() {
            stack.pop();
        }
        check_string_len(out.len(), span)?;
        Ok(written)
    }
}

fn flatten_into(items: &[Value], depth: f64, out: &mut Vec<Value>) {
    for item in items {
        match item {
            Value::Array(inner) if depth >= 1.0 => {
                flatten_into(&inner.borrow(), depth - 1.0, out);
            }
            v => out.push(v.clone()),
        }
    }
}

fn write_json_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

// ── Numbers ──────────────────────────────────────────────────────────

fn number_static(member: &str, args: &[Value]) -> Value {
    let v = arg(args, 0);
    let num = match v {
        Value::Number(n) => Some(n),
        _ => None,
    };
    match member {
        "isInteger" => Value::Bool(num.is_some_and(|n| n.is_finite() && n.fract() == 0.0)),
        "isSafeInteger" => Value::Bool(
            num.is_some_and(|n| n.is_finite() && n.fract() == 0.0 && n.abs() <= 9007199254740991.0),
        ),
        "isFinite" => Value::Bool(num.is_some_and(f64::is_finite)),
        "isNaN" => Value::Bool(num.is_some_and(f64::is_nan)),
        "parseFloat" => Value::Number(parse_float(&v.to_js_string())),
        _ => Value::Number(parse_int(&v.to_js_string(), &arg(args, 1))),
    }
}

/// Longest numeric prefix, as `parseFloat` reads it.
pub(crate) fn parse_float(s: &str) -> f64 {
    let t = s.trim_start();
    for (lit, value) in [
        ("Infinity", f64::INFINITY),
        ("+Infinity", f64::INFINITY),
        ("-Infinity", f64::NEG_INFINITY),
    ] {
        if t.starts_with(lit) {
            return value;
        }
    }
    let bytes = t.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end == digits_start || &t[digits_start..end] == "." {
        return f64::NAN;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }
    t[..end].parse().unwrap_or(f64::NAN)
}

pub(crate) fn parse_int(s: &str, radix: &Value) -> f64 {
    let t = s.trim_start();
    let (negative, t) = match t.as_bytes().first() {
        Some(b'-') => (true, &t[1..]),
        Some(b'+') => (false, &t[1..]),
        _ => (false, t),
    };
    let mut radix = match radix {
        Value::Undefined => 0,
        v => v.to_number() as u32,
    };
    let mut t = t;
    if radix == 0 || radix == 16 {
        if let Some(rest) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
            t = rest;
            radix = 16;
        }
    }
    if radix == 0 {
        radix = 10;
    }
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }
    let mut value = 0.0f64;
    let mut any = false;
    for c in t.chars() {
        let Some(d) = c.to_digit(radix) else { break };
        value = value * radix as f64 + d as f64;
        any = true;
    }
    match (any, negative) {
        (false, _) => f64::NAN,
        (true, true) => -value,
        (true, false) => value,
    }
}

fn number_method(n: f64, name: &str, args: &[Value], span: Span) -> Eval<Value> {
    Ok(match name {
        "toFixed" => {
            let digits = arg(args, 0).to_number();
            let digits = if digits.is_nan() { 0.0 } else { digits.trunc() };
            if !(0.0..=100.0).contains(&digits) {
                return Err(Fault::range_error(
                    "toFixed() digits argument must be between 0 and 100",
                    span,
                ));
            }
            Value::str(to_fixed(n, digits as usize))
        }
        "toString" => match arg(args, 0) {
            Value::Undefined => Value::str(number_to_string(n)),
            radix => {
                let radix = radix.to_number() as u32;
                if !(2..=36).contains(&radix) {
                    return Err(Fault::range_error(
                        "toString() radix must be between 2 and 36",
                        span,
                    ));
                }
                Value::str(to_radix(n, radix))
            }
        },
        "toLocaleString" => Value::str(to_locale_string(n, &arg(args, 1))),
        _ => Value::Number(n),
    })
}

/// `Number.prototype.toFixed`: ties round away from zero.
pub(crate) fn to_fixed(n: f64, digits: usize) -> String {
    if !n.is_finite() || n.abs() >= 1e21 {
        return number_to_string(n);
    }
    let abs = n.abs();
    let scale = 10f64.powi(digits as i32);
    let scaled = abs * scale;
    let adjusted = if scaled - scaled.floor() == 0.5 {
        abs + 0.5 / scale
    } else {
        abs
    };
    let body = format!("{:.*}", digits, adjusted);
    if n < 0.0 {
        format!("-{}", body)
    } else {
        body
    }
}

fn to_radix(n: f64, radix: u32) -> String {
    if radix == 10 || !n.is_finite() || n.fract() != 0.0 || n.abs() > 9007199254740991.0 {
        return number_to_string(n);
    }
    let mut v = n.abs() as u64;
    if v == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while v > 0 {
        let d = (v % radix as u64) as u32;
        digits.push(char::from_digit(d, radix).unwrap_or('0'));
        v /= radix as u64;
    }
    if n < 0.0 {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

/// en-US formatting with grouping; honours `style`, `currency`, and the
/// fraction-digit options of `Intl.NumberFormat`.
pub(crate) fn to_locale_string(n: f64, options: &Value) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "∞" } else { "-∞" }.to_string();
    }
    let style = get_field(options, "style").map(|v| v.to_js_string());
    let currency = get_field(options, "currency").map(|v| v.to_js_string().to_uppercase());
    let (mut min_frac, mut max_frac) = match style.as_deref() {
        Some("currency") => (2, 2),
        Some("percent") => (0, 0),
        _ => (0, 3),
    };
    let digits = |key: &str| {
        get_field(options, key)
            .map(|v| v.to_number())
            .filter(|d| d.is_finite() && (0.0..=20.0).contains(d))
            .map(|d| d as usize)
    };
    if let Some(min) = digits("minimumFractionDigits") {
        min_frac = min;
        max_frac = max_frac.max(min);
    }
    if let Some(max) = digits("maximumFractionDigits") {
        max_frac = max;
        min_frac = min_frac.min(max);
    }
    let value = if style.as_deref() == Some("percent") { n * 100.0 } else { n };
    let fixed = to_fixed(value.abs(), max_frac);
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let mut frac = frac_part.to_string();
    while frac.len() > min_frac && frac.ends_with('0') {
        frac.pop();
    }
    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let mut body = grouped;
    if !frac.is_empty() {
        body.push('.');
        body.push_str(&frac);
    }
    let sign = if value < 0.0 && body.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    match style.as_deref() {
        Some("currency") => {
            let symbol = match currency.as_deref() {
                Some("USD") | None => "$".to_string(),
                Some("EUR") => "€".to_string(),
                Some("GBP") => "£".to_string(),
                Some("JPY") => "¥".to_string(),
                Some(code) => format!("{}\u{a0}", code),
            };
            format!("{}{}{}", sign, symbol, body)
        }
        Some("percent") => format!("{}{}%", sign, body),
        _ => format!("{}{}", sign, body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::array_index;

    #[test]
    fn to_fixed_rounds_ties_away_from_zero() {
        assert_eq!(to_fixed(2.5, 0), "3");
        assert_eq!(to_fixed(-1.5, 0), "-2");
        assert_eq!(to_fixed(1.005, 2), "1.00");
        assert_eq!(to_fixed(0.125, 2), "0.13");
        assert_eq!(to_fixed(19.99, 2), "19.99");
    }

    #[test]
    fn locale_formatting() {
        assert_eq!(to_locale_string(1234567.891, &Value::Undefined), "1,234,567.891");
        assert_eq!(to_locale_string(1000.0, &Value::Undefined), "1,000");
        let mut opts = Object::default();
        opts.set("style", Value::str("currency"));
        opts.set("currency", Value::str("USD"));
        assert_eq!(to_locale_string(1234.5, &Value::object(opts)), "$1,234.50");
        let mut opts = Object::default();
        opts.set("style", Value::str("percent"));
        assert_eq!(to_locale_string(0.256, &Value::object(opts)), "26%");
    }

    #[test]
    fn parse_helpers() {
        assert_eq!(parse_float("  3.25px"), 3.25);
        assert_eq!(parse_float("1e3x"), 1000.0);
        assert!(parse_float("px").is_nan());
        assert_eq!(parse_int("42abc", &Value::Undefined), 42.0);
        assert_eq!(parse_int("0x1F", &Value::Undefined), 31.0);
        assert_eq!(parse_int("-101", &Value::Number(2.0)), -5.0);
        assert!(parse_int("", &Value::Undefined).is_nan());
    }

    #[test]
    fn radix_strings() {
        assert_eq!(to_radix(255.0, 16), "ff");
        assert_eq!(to_radix(-5.0, 2), "-101");
        assert_eq!(to_radix(1.5, 2), "1.5");
    }

    #[test]
    fn json_strings_escape_controls() {
        let mut out = String::new();
        write_json_string("a\"b\n\u{1}", &mut out);
        assert_eq!(out, "\"a\\\"b\\n\\u0001\"");
    }

    #[test]
    fn relative_indices() {
        assert_eq!(relative_index(Some(&Value::Number(-2.0)), 5, 0), 3);
        assert_eq!(relative_index(Some(&Value::Number(10.0)), 5, 0), 5);
        assert_eq!(relative_index(None, 5, 5), 5);
    }

    #[test]
    fn array_index_is_canonical() {
        assert_eq!(array_index("0"), Some(0));
        assert_eq!(array_index("12"), Some(12));
        assert_eq!(array_index("01"), None);
        assert_eq!(array_index("-1"), None);
    }
}
