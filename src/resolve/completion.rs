use std::{borrow::Cow, collections::HashMap, sync::Arc};

use log::warn;

use crate::{
    class::{ClassDescription, FieldInfo, MethodInfo},
    consts::method_modifiers,
    resolve::{
        overload::Candidate,
        signature::parse_signature,
        types::TypeDeclaration,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletionKind {
    Method,
    Field,
    /// A `getX()`/`isX()` accessor surfaced as `x`.
    Property,
    Function,
    Constant,
    Tag,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Platform spelling, e.g. `int` or `java.lang.String[]`.
    pub type_name: Arc<str>,
    pub name: Arc<str>,
}

/// One completion entry: a member of a resolved type or a keyword record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberCompletion {
    kind: CompletionKind,
    name: Arc<str>,
    owner: Option<Arc<str>>,
    key: Arc<str>,
    return_type: Option<Arc<str>>,
    parameters: Vec<Parameter>,
    is_static: bool,
    is_deprecated: bool,
    summary: Arc<str>,
}

impl MemberCompletion {
    pub fn kind(&self) -> CompletionKind {
        self.kind
    }

    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    /// Qualified name of the declaring type; `None` for keyword records.
    pub fn owner(&self) -> Option<&Arc<str>> {
        self.owner.as_ref()
    }

    /// Unique within one type: `name(int, java.lang.String)` for methods, the bare name
    /// otherwise.
    pub fn key(&self) -> &Arc<str> {
        &self.key
    }

    pub fn return_type(&self) -> Option<&Arc<str>> {
        self.return_type.as_ref()
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn is_deprecated(&self) -> bool {
        self.is_deprecated
    }

    /// External documentation when supplied, the synthesized signature otherwise.
    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.kind, CompletionKind::Method | CompletionKind::Function)
    }

    /// `int max(int a, int b)`, `java.lang.String name`.
    pub fn signature(&self) -> String {
        let return_type = self.return_type.as_deref().unwrap_or("void");
        match self.kind {
            CompletionKind::Method | CompletionKind::Function => {
                let parameters: Vec<_> = self
                    .parameters
                    .iter()
                    .map(|p| format!("{} {}", p.type_name, p.name))
                    .collect();
                if self.kind == CompletionKind::Function && self.return_type.is_none() {
                    format!("{}({})", self.name, parameters.join(", "))
                } else {
                    format!("{return_type} {}({})", self.name, parameters.join(", "))
                }
            }
            CompletionKind::Field | CompletionKind::Property => {
                format!("{return_type} {}", self.name)
            }
            CompletionKind::Constant | CompletionKind::Tag => self.name.to_string(),
        }
    }
}

impl Candidate for MemberCompletion {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    fn parameter_type(&self, index: usize) -> Cow<'_, str> {
        Cow::Borrowed(&self.parameters[index].type_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordKind {
    Function,
    Constant,
    Tag,
}

/// A pre-parsed keyword record from a declarative keyword list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    pub name: String,
    pub kind: KeywordKind,
    /// `name(Type a, Type b)` for functions.
    pub signature: Option<String>,
    pub description: Option<String>,
}

impl Keyword {
    pub(crate) fn to_completion(&self) -> MemberCompletion {
        let mut parameters = vec![];
        if let (KeywordKind::Function, Some(signature)) = (self.kind, &self.signature) {
            match parse_signature(signature) {
                Ok(declared) => {
                    parameters = declared
                        .parameters
                        .into_iter()
                        .enumerate()
                        .map(|(i, p)| Parameter {
                            type_name: Arc::from(p.type_name),
                            name: p.name.map(Arc::from).unwrap_or_else(|| arg_name(i)),
                        })
                        .collect();
                }
                Err(e) => warn!("keyword {}: {e}", self.name),
            }
        }
        let kind = match self.kind {
            KeywordKind::Function => CompletionKind::Function,
            KeywordKind::Constant => CompletionKind::Constant,
            KeywordKind::Tag => CompletionKind::Tag,
        };
        let key = match kind {
            CompletionKind::Function => {
                let types: Vec<_> = parameters.iter().map(|p| &*p.type_name).collect();
                format!("{}({})", self.name, types.join(", "))
            }
            _ => self.name.clone(),
        };
        let mut completion = MemberCompletion {
            kind,
            name: Arc::from(self.name.as_str()),
            owner: None,
            key: Arc::from(key),
            return_type: None,
            parameters,
            is_static: true,
            is_deprecated: false,
            summary: Arc::from(""),
        };
        completion.summary = match &self.description {
            Some(description) => Arc::from(description.as_str()),
            None => Arc::from(completion.signature()),
        };
        completion
    }
}

/// What an external documentation provider is asked about.
#[derive(Debug, Clone, Copy)]
pub struct DocRequest<'a> {
    pub class: &'a ClassDescription,
    pub member: &'a str,
    /// `name(int, java.lang.String)`, or the field name.
    pub key: &'a str,
    /// Text of the compilation unit, when the library has a source location.
    pub source: Option<&'a str>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberDocs {
    pub summary: Option<String>,
    /// Declared parameter names, in order.
    pub parameter_names: Vec<String>,
}

/// Supplies documentation recovered by a source-level parser.
pub trait DocumentationProvider: Send + Sync {
    fn member_docs(&self, request: &DocRequest<'_>) -> Option<MemberDocs>;
}

fn arg_name(index: usize) -> Arc<str> {
    Arc::from(format!("arg{index}"))
}

/// `@param name` tags of a doc comment, in order.
fn param_tags(doc: &str) -> Vec<&str> {
    doc.split("@param")
        .skip(1)
        .filter_map(|rest| rest.split_whitespace().next())
        .collect()
}

/// `getFooBar` -> `fooBar`, `isURL` -> `URL`.
fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    if chars.next().is_some_and(char::is_uppercase) && first.is_uppercase() {
        return name.to_string();
    }
    first.to_lowercase().chain(name.chars().skip(1)).collect()
}

fn property_name(method: &MethodInfo) -> Option<String> {
    if method.parameter_count() != 0 || method.is_static() {
        return None;
    }
    let return_type = method.descriptor().return_type()?;
    let name = method.name();
    let stem = match name.strip_prefix("get") {
        Some(stem) => stem,
        None if return_type.java_name() == "boolean" => name.strip_prefix("is")?,
        None => return None,
    };
    if stem.is_empty() || !stem.starts_with(char::is_uppercase) {
        return None;
    }
    Some(decapitalize(stem))
}

/// Builds the completion set of one class for a declaration.
pub(crate) struct MemberCollector<'a> {
    pub(crate) class: &'a ClassDescription,
    pub(crate) declaration: &'a TypeDeclaration,
    pub(crate) bean_properties: bool,
    pub(crate) docs: Option<&'a dyn DocumentationProvider>,
    pub(crate) source: Option<&'a str>,
}

impl MemberCollector<'_> {
    fn visible(&self, is_public: bool, is_static: bool) -> bool {
        is_public && (is_static || !self.declaration.is_statics_only())
    }

    fn docs_for(&self, member: &str, key: &str) -> MemberDocs {
        self.docs
            .and_then(|docs| {
                docs.member_docs(&DocRequest {
                    class: self.class,
                    member,
                    key,
                    source: self.source,
                })
            })
            .unwrap_or_default()
    }

    pub(crate) fn collect(&self) -> Vec<MemberCompletion> {
        let mut members = vec![];
        for field in self.class.fields() {
            if self.visible(field.is_public(), field.is_static()) {
                members.push(self.field(field));
            }
        }
        for method in self.class.methods() {
            if method.is_constructor()
                || method.is_static_initializer()
                || method.is_compiler_generated()
            {
                continue;
            }
            if !self.visible(method.is_public(), method.is_static()) {
                continue;
            }
            members.push(self.method(method));
            if self.bean_properties {
                if let Some(property) = property_name(method) {
                    members.push(self.property(method, property));
                }
            }
        }
        members
    }

    fn field(&self, field: &FieldInfo) -> MemberCompletion {
        let docs = self.docs_for(field.name(), field.name());
        let type_name = field.field_type().java_name();
        let summary = docs.summary.unwrap_or_else(|| {
            let mut modifiers = vec!["public"];
            if field.is_static() {
                modifiers.push("static");
            }
            if field.is_final() {
                modifiers.push("final");
            }
            format!("{} {type_name} {}", modifiers.join(" "), field.name())
        });
        MemberCompletion {
            kind: CompletionKind::Field,
            name: Arc::clone(field.name()),
            owner: Some(Arc::clone(self.class.name())),
            key: Arc::clone(field.name()),
            return_type: Some(Arc::from(type_name)),
            parameters: vec![],
            is_static: field.is_static(),
            is_deprecated: field.is_deprecated(),
            summary: Arc::from(summary),
        }
    }

    fn method(&self, method: &MethodInfo) -> MemberCompletion {
        let key = method.name_and_parameters();
        let docs = self.docs_for(method.name(), &key);
        let tags = docs.summary.as_deref().map(param_tags).unwrap_or_default();

        let parameters: Vec<_> = method
            .descriptor()
            .parameters()
            .iter()
            .enumerate()
            .map(|(i, ty)| {
                let name = method
                    .parameter_name(i)
                    .or_else(|| docs.parameter_names.get(i).map(|n| Arc::from(n.as_str())))
                    .or_else(|| tags.get(i).map(|n| Arc::from(*n)))
                    .unwrap_or_else(|| arg_name(i));
                Parameter {
                    type_name: Arc::from(ty.java_name()),
                    name,
                }
            })
            .collect();

        let return_type = method.return_type_name(true);
        let summary = match docs.summary {
            Some(summary) => summary,
            None => {
                let modifiers = method_modifiers(method.access_flags());
                let rendered: Vec<_> = parameters
                    .iter()
                    .map(|p| format!("{} {}", p.type_name, p.name))
                    .collect();
                let head = if modifiers.is_empty() {
                    return_type.clone()
                } else {
                    format!("{modifiers} {return_type}")
                };
                format!("{head} {}({})", method.name(), rendered.join(", "))
            }
        };

        MemberCompletion {
            kind: CompletionKind::Method,
            name: Arc::clone(method.name()),
            owner: Some(Arc::clone(self.class.name())),
            key: Arc::from(key),
            return_type: method
                .descriptor()
                .return_type()
                .map(|_| Arc::from(return_type)),
            parameters,
            is_static: method.is_static(),
            is_deprecated: method.is_deprecated(),
            summary: Arc::from(summary),
        }
    }

    fn property(&self, method: &MethodInfo, property: String) -> MemberCompletion {
        let return_type = method.return_type_name(true);
        MemberCompletion {
            kind: CompletionKind::Property,
            summary: Arc::from(format!("{return_type} {property}")),
            key: Arc::from(property.as_str()),
            name: Arc::from(property),
            owner: Some(Arc::clone(self.class.name())),
            return_type: Some(Arc::from(return_type)),
            parameters: vec![],
            is_static: false,
            is_deprecated: method.is_deprecated(),
        }
    }
}

/// The cached view of one type: its own members and the keys of the types it extends.
#[derive(Debug)]
pub struct ResolvedType {
    declaration: TypeDeclaration,
    class: Option<Arc<ClassDescription>>,
    members: Vec<MemberCompletion>,
    by_key: HashMap<Arc<str>, usize>,
    extensions: Vec<TypeDeclaration>,
}

impl ResolvedType {
    pub(crate) fn new(
        declaration: TypeDeclaration,
        class: Option<Arc<ClassDescription>>,
        members: Vec<MemberCompletion>,
        extensions: Vec<TypeDeclaration>,
    ) -> Self {
        let mut by_key = HashMap::with_capacity(members.len());
        let mut unique = Vec::with_capacity(members.len());
        for member in members {
            if by_key.contains_key(member.key()) {
                continue;
            }
            by_key.insert(Arc::clone(member.key()), unique.len());
            unique.push(member);
        }
        Self {
            declaration,
            class,
            members: unique,
            by_key,
            extensions,
        }
    }

    pub(crate) fn missing(declaration: TypeDeclaration) -> Self {
        Self::new(declaration, None, vec![], vec![])
    }

    pub fn declaration(&self) -> &TypeDeclaration {
        &self.declaration
    }

    /// The decoded class, `None` when no library declares the type.
    pub fn class(&self) -> Option<&Arc<ClassDescription>> {
        self.class.as_ref()
    }

    pub fn is_found(&self) -> bool {
        self.class.is_some()
    }

    /// Own members in declaration order.
    pub fn members(&self) -> &[MemberCompletion] {
        &self.members
    }

    pub fn member(&self, key: &str) -> Option<&MemberCompletion> {
        self.by_key.get(key).map(|&i| &self.members[i])
    }

    /// Superclass first, then interfaces; keys into the engine's cache.
    pub fn extensions(&self) -> &[TypeDeclaration] {
        &self.extensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decapitalize_follows_bean_rules() {
        assert_eq!(decapitalize("FooBar"), "fooBar");
        assert_eq!(decapitalize("URL"), "URL");
        assert_eq!(decapitalize("X"), "x");
    }

    #[test]
    fn param_tags_in_order() {
        let doc = "Returns the larger.\n@param a first value\n@param b second value\n@return max";
        assert_eq!(param_tags(doc), vec!["a", "b"]);
        assert!(param_tags("no tags").is_empty());
    }

    #[test]
    fn keyword_function_records() {
        let keyword = Keyword {
            name: "parseInt".into(),
            kind: KeywordKind::Function,
            signature: Some("parseInt(String s, Number radix)".into()),
            description: None,
        };
        let completion = keyword.to_completion();
        assert_eq!(completion.kind(), CompletionKind::Function);
        assert_eq!(&**completion.key(), "parseInt(String, Number)");
        assert_eq!(completion.summary(), "parseInt(String s, Number radix)");
        assert!(completion.is_callable());
        assert_eq!(completion.parameter_type(1), "Number");
    }

    #[test]
    fn keyword_constants_use_their_description() {
        let keyword = Keyword {
            name: "NaN".into(),
            kind: KeywordKind::Constant,
            signature: None,
            description: Some("Not a number".into()),
        };
        let completion = keyword.to_completion();
        assert_eq!(completion.kind(), CompletionKind::Constant);
        assert_eq!(completion.summary(), "Not a number");
        assert!(!completion.is_callable());
    }

    #[test]
    fn resolved_type_keeps_first_member_per_key() {
        let keyword = |name: &str, description: &str| Keyword {
            name: name.into(),
            kind: KeywordKind::Tag,
            signature: None,
            description: Some(description.into()),
        };
        let resolved = ResolvedType::new(
            TypeDeclaration::new("a.B"),
            None,
            vec![
                keyword("x", "first").to_completion(),
                keyword("x", "second").to_completion(),
            ],
            vec![],
        );
        assert_eq!(resolved.members().len(), 1);
        assert_eq!(resolved.member("x").map(|m| m.summary()), Some("first"));
    }
}
