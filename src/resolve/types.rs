use std::{
    borrow::Cow,
    collections::HashMap,
    fmt::{self, Display},
    hash::{Hash, Hasher},
    sync::Arc,
};

use crate::descriptor::{is_primitive_name, simple_name};

/// A type as the resolver sees it. Two declarations are the same cache key when they name
/// the same class and agree on whether only static members are visible.
#[derive(Debug, Clone)]
pub struct TypeDeclaration {
    package: Arc<str>,
    name: Arc<str>,
    qualified_name: Arc<str>,
    statics_only: bool,
}

impl TypeDeclaration {
    pub fn new(qualified_name: &str) -> Self {
        let package = match qualified_name.rsplit_once('.') {
            Some((package, _)) => package,
            None => "",
        };
        Self {
            package: Arc::from(package),
            name: Arc::from(simple_name(qualified_name)),
            qualified_name: Arc::from(qualified_name),
            statics_only: false,
        }
    }

    /// A declaration exposing only static members, as when a class name itself is the
    /// receiver (`Math.max`).
    pub fn statics(qualified_name: &str) -> Self {
        Self::new(qualified_name).with_statics_only(true)
    }

    pub fn with_statics_only(mut self, statics_only: bool) -> Self {
        self.statics_only = statics_only;
        self
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn qualified_name(&self) -> &Arc<str> {
        &self.qualified_name
    }

    pub fn is_statics_only(&self) -> bool {
        self.statics_only
    }
}

impl PartialEq for TypeDeclaration {
    fn eq(&self, other: &Self) -> bool {
        self.qualified_name == other.qualified_name && self.statics_only == other.statics_only
    }
}

impl Eq for TypeDeclaration {}

impl Hash for TypeDeclaration {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.qualified_name.hash(state);
        self.statics_only.hash(state);
    }
}

impl Display for TypeDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name)?;
        if self.statics_only {
            f.write_str(" (static)")?;
        }
        Ok(())
    }
}

pub(crate) const OBJECT: &str = "java.lang.Object";
pub(crate) const STRING: &str = "java.lang.String";
pub(crate) const NUMBER: &str = "java.lang.Number";
pub(crate) const BOOLEAN: &str = "java.lang.Boolean";
pub(crate) const DATE: &str = "java.util.Date";

/// Names that stand for "no type information" when given as an argument type.
pub(crate) const UNDEFINED_NAMES: [&str; 3] = ["any", "undefined", ""];

const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("String", STRING),
    ("string", STRING),
    ("Number", NUMBER),
    ("number", NUMBER),
    ("Boolean", BOOLEAN),
    ("Object", OBJECT),
    ("object", OBJECT),
    ("any", OBJECT),
    ("Date", DATE),
    ("Array", "java.lang.Object[]"),
];

/// Maps type names of the dynamic caller (`Number`, `any`) to platform types, and back.
/// Primitive names are never aliased.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    aliases: HashMap<String, TypeDeclaration>,
    reverse: HashMap<Arc<str>, String>,
    extra: Vec<(String, String)>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl TypeRegistry {
    /// Built-in aliases plus `extra`, where a later pair replaces an earlier one.
    pub fn new(extra: &[(String, String)]) -> Self {
        let mut registry = Self {
            aliases: HashMap::new(),
            reverse: HashMap::new(),
            extra: extra.to_vec(),
        };
        registry.populate();
        registry
    }

    fn populate(&mut self) {
        for (alias, qualified) in BUILTIN_ALIASES {
            self.insert(alias, qualified);
        }
        for (alias, qualified) in std::mem::take(&mut self.extra) {
            self.insert(&alias, &qualified);
            self.extra.push((alias, qualified));
        }
    }

    fn insert(&mut self, alias: &str, qualified: &str) -> bool {
        if is_primitive_name(alias) {
            return false;
        }
        let declaration = TypeDeclaration::new(qualified);
        self.reverse
            .entry(Arc::clone(declaration.qualified_name()))
            .or_insert_with(|| alias.to_string());
        self.aliases.insert(alias.to_string(), declaration);
        true
    }

    /// Adds an alias unless the name is a primitive or already taken.
    pub fn register(&mut self, alias: &str, qualified: &str) -> bool {
        if self.aliases.contains_key(alias) {
            return false;
        }
        self.insert(alias, qualified)
    }

    pub fn declaration(&self, alias: &str) -> Option<&TypeDeclaration> {
        self.aliases.get(alias)
    }

    /// First alias registered for a platform type.
    pub fn alias_of(&self, qualified: &str) -> Option<&str> {
        self.reverse.get(qualified).map(String::as_str)
    }

    /// Platform spelling of a type name: aliases are replaced, array suffixes kept,
    /// primitives and unknown names returned unchanged.
    pub fn normalize<'a>(&self, name: &'a str) -> Cow<'a, str> {
        let name = name.trim();
        if let Some(element) = name.strip_suffix("[]") {
            return match self.normalize(element) {
                Cow::Borrowed(_) => Cow::Borrowed(name),
                Cow::Owned(element) => Cow::Owned(element + "[]"),
            };
        }
        match self.aliases.get(name) {
            Some(declaration) if &**declaration.qualified_name() != name => {
                Cow::Owned(declaration.qualified_name().to_string())
            }
            _ => Cow::Borrowed(name),
        }
    }

    /// Drops discovered aliases and goes back to the built-in and configured ones.
    pub fn reset(&mut self) {
        self.aliases.clear();
        self.reverse.clear();
        self.populate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn declarations_compare_by_name_and_statics_flag() {
        let plain = TypeDeclaration::new("java.lang.Math");
        assert_eq!(plain.package(), "java.lang");
        assert_eq!(plain.name(), "Math");
        assert_eq!(plain, TypeDeclaration::new("java.lang.Math"));
        assert_ne!(plain, TypeDeclaration::statics("java.lang.Math"));
        assert_eq!(TypeDeclaration::new("Top").package(), "");
    }

    #[test]
    fn normalize_aliases_and_arrays() {
        let registry = TypeRegistry::default();
        assert_eq!(registry.normalize("Number"), "java.lang.Number");
        assert_eq!(registry.normalize("String[][]"), "java.lang.String[][]");
        assert_eq!(registry.normalize("Array"), "java.lang.Object[]");
        assert_eq!(registry.normalize("int"), "int");
        assert_eq!(registry.normalize("com.acme.Widget"), "com.acme.Widget");
        assert_eq!(registry.alias_of("java.lang.String"), Some("String"));
    }

    #[test]
    fn primitives_cannot_be_aliased() {
        let mut registry = TypeRegistry::default();
        assert!(!registry.register("int", "java.lang.Integer"));
        assert_eq!(registry.normalize("int"), "int");
    }

    #[test]
    fn reset_keeps_configured_aliases() {
        let mut registry = TypeRegistry::new(&[("Widget".into(), "com.acme.Widget".into())]);
        assert!(registry.register("ArrayList", "java.util.ArrayList"));
        assert!(!registry.register("ArrayList", "com.acme.ArrayList"));
        registry.reset();
        assert!(registry.declaration("ArrayList").is_none());
        assert_eq!(registry.normalize("Widget"), "com.acme.Widget");
    }
}
