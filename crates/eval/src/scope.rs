//! Scope registry: the whitelist of identifiers evaluated code may reach.
//!
//! Built once per session by [`build_scope`] and shared read-only. The
//! sandbox resolves free identifiers only against these bindings (plus a
//! handful of intrinsics), so anything not registered here is a compile
//! error rather than a host lookup.

use livecode_core::Globals;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::icons::{self, IconDef};
use crate::primitives::Primitive;

/// Members of the `React` namespace the sandbox implements.
pub const REACT_MEMBERS: &[&str] = &[
    "createElement",
    "Fragment",
    "StrictMode",
    "useCallback",
    "useEffect",
    "useLayoutEffect",
    "useMemo",
    "useReducer",
    "useRef",
    "useState",
];

/// Whitelisted helper namespaces and constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Helper {
    Math,
    Json,
    Object,
    Array,
    String,
    Number,
    /// `Error` and its standard subclasses, keyed by constructor name.
    Error(&'static str),
    Console,
}

impl Helper {
    pub const ALL: &'static [(&'static str, Helper)] = &[
        ("Array", Helper::Array),
        ("Error", Helper::Error("Error")),
        ("JSON", Helper::Json),
        ("Math", Helper::Math),
        ("Number", Helper::Number),
        ("Object", Helper::Object),
        ("RangeError", Helper::Error("RangeError")),
        ("String", Helper::String),
        ("SyntaxError", Helper::Error("SyntaxError")),
        ("TypeError", Helper::Error("TypeError")),
        ("console", Helper::Console),
    ];
}

/// What a scope identifier is bound to.
#[derive(Debug, Clone)]
pub enum Binding {
    Icon(&'static IconDef),
    /// The view-library root namespace.
    React,
    Primitive(Primitive),
    Helper(Helper),
    /// A host-supplied constant, converted to a runtime value on use.
    Constant(serde_json::Value),
}

impl Binding {
    pub fn kind(&self) -> &'static str {
        match self {
            Binding::Icon(_) => "icon",
            Binding::React => "namespace",
            Binding::Primitive(_) => "primitive",
            Binding::Helper(_) => "helper",
            Binding::Constant(_) => "constant",
        }
    }
}

/// What an import specifier links to.
#[derive(Debug, Clone)]
pub enum ImportTarget {
    Binding(Binding),
    /// A member of the `React` namespace, e.g. `useState`.
    ReactMember(&'static str),
    /// An object holding every icon in the catalog.
    IconNamespace,
}

/// An importable module specifier.
#[derive(Debug, Clone, Default)]
pub struct ModuleDef {
    pub default: Option<ImportTarget>,
    pub namespace: Option<ImportTarget>,
    pub exports: BTreeMap<String, ImportTarget>,
}

impl ModuleDef {
    pub fn export(mut self, name: impl Into<String>, target: ImportTarget) -> Self {
        self.exports.insert(name.into(), target);
        self
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BindingSummary {
    pub name: String,
    pub kind: &'static str,
}

/// Immutable identifier whitelist plus the import module table.
#[derive(Debug, Clone, Default)]
pub struct ScopeBindings {
    bindings: Arc<BTreeMap<String, Binding>>,
    modules: Arc<BTreeMap<String, ModuleDef>>,
}

impl ScopeBindings {
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn module(&self, specifier: &str) -> Option<&ModuleDef> {
        self.modules.get(specifier)
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    pub fn summary(&self) -> Vec<BindingSummary> {
        self.bindings
            .iter()
            .map(|(name, b)| BindingSummary {
                name: name.clone(),
                kind: b.kind(),
            })
            .collect()
    }
}

impl Globals for ScopeBindings {
    fn is_global(&self, name: &str) -> bool {
        self.contains(name)
    }
}

/// Assembles a [`ScopeBindings`]; the result is frozen by [`ScopeBuilder::build`].
#[derive(Debug, Default)]
pub struct ScopeBuilder {
    bindings: BTreeMap<String, Binding>,
    modules: BTreeMap<String, ModuleDef>,
}

impl ScopeBuilder {
    pub fn empty() -> Self {
        ScopeBuilder::default()
    }

    /// Icons, `React`, UI primitives, helpers, and their import modules.
    pub fn standard() -> Self {
        let mut builder = ScopeBuilder::empty();
        for icon in icons::ICONS {
            builder.bindings.insert(icon.name.to_string(), Binding::Icon(icon));
        }
        builder.bindings.insert("React".to_string(), Binding::React);
        for p in Primitive::ALL {
            builder
                .bindings
                .insert(p.name().to_string(), Binding::Primitive(*p));
        }
        for (name, helper) in Helper::ALL {
            builder
                .bindings
                .insert(name.to_string(), Binding::Helper(*helper));
        }

        let mut react = ModuleDef {
            default: Some(ImportTarget::Binding(Binding::React)),
            namespace: Some(ImportTarget::Binding(Binding::React)),
            ..ModuleDef::default()
        };
        for member in REACT_MEMBERS {
            react = react.export(*member, ImportTarget::ReactMember(*member));
        }
        builder.modules.insert("react".to_string(), react);

        let mut lucide = ModuleDef {
            namespace: Some(ImportTarget::IconNamespace),
            ..ModuleDef::default()
        };
        for icon in icons::ICONS {
            let target = ImportTarget::Binding(Binding::Icon(icon));
            lucide = lucide
                .export(icon.name, target.clone())
                .export(format!("{}Icon", icon.name), target.clone())
                .export(format!("Lucide{}", icon.name), target);
        }
        builder.modules.insert("lucide-react".to_string(), lucide);

        for p in Primitive::ALL {
            let path = format!("@/components/ui/{}", p.module());
            let module = builder.modules.remove(&path).unwrap_or_default();
            builder.modules.insert(
                path,
                module.export(p.name(), ImportTarget::Binding(Binding::Primitive(*p))),
            );
        }
        builder
    }

    pub fn bind(mut self, name: impl Into<String>, binding: Binding) -> Self {
        self.bindings.insert(name.into(), binding);
        self
    }

    pub fn constant(self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.bind(name, Binding::Constant(value))
    }

    pub fn remove(mut self, name: &str) -> Self {
        self.bindings.remove(name);
        self
    }

    pub fn module(mut self, specifier: impl Into<String>, module: ModuleDef) -> Self {
        self.modules.insert(specifier.into(), module);
        self
    }

    pub fn build(self) -> ScopeBindings {
        tracing::debug!(
            bindings = self.bindings.len(),
            modules = self.modules.len(),
            "built preview scope"
        );
        ScopeBindings {
            bindings: Arc::new(self.bindings),
            modules: Arc::new(self.modules),
        }
    }
}

/// The standard session scope.
pub fn build_scope() -> ScopeBindings {
    ScopeBuilder::standard().build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn scope_is_shareable() {
        assert_send_sync::<ScopeBindings>();
    }

    #[test]
    fn standard_scope_contents() {
        let scope = build_scope();
        for name in [
            "React", "Upload", "FileText", "Card", "CardContent", "Button", "Math", "console",
            "TypeError", "RangeError", "SyntaxError",
        ] {
            assert!(scope.contains(name), "missing {}", name);
        }
        assert!(!scope.contains("window"));
        assert!(!scope.contains("fetch"));
        assert_eq!(scope.get("Card").map(Binding::kind), Some("primitive"));
    }

    #[test]
    fn module_table_covers_imports() {
        let scope = build_scope();
        let react = scope.module("react").unwrap();
        assert!(react.default.is_some());
        assert!(react.exports.contains_key("useState"));
        let lucide = scope.module("lucide-react").unwrap();
        assert!(lucide.exports.contains_key("UploadIcon"));
        let card = scope.module("@/components/ui/card").unwrap();
        assert_eq!(card.exports.len(), 6);
        assert!(scope.module("fs").is_none());
    }

    #[test]
    fn builder_extends_and_restricts() {
        let scope = ScopeBuilder::standard()
            .constant("BRAND", serde_json::json!("Acme"))
            .remove("console")
            .build();
        assert_eq!(scope.get("BRAND").map(Binding::kind), Some("constant"));
        assert!(!scope.contains("console"));
        let summary = scope.summary();
        assert!(summary.iter().any(|b| b.name == "BRAND" && b.kind == "constant"));
    }
}
