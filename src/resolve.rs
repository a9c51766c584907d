use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use dashmap::DashMap;
use log::{debug, warn};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use crate::{
    class::ClassDescription,
    config::EngineConfig,
    error::{RegistrationError, SignatureError},
    library::{Library, LibraryIndex, LibraryLocation, SourceLocation},
};

mod completion;
mod overload;
mod signature;
mod types;

pub use completion::{
    CompletionKind, DocRequest, DocumentationProvider, Keyword, KeywordKind, MemberCompletion,
    MemberDocs, Parameter, ResolvedType,
};
pub use overload::{
    ArgKind, BuiltinHierarchy, Candidate, NO_MATCH, Overload, Scorer, TypeHierarchy,
    best_overload, is_assignable,
};
pub use signature::{
    CallSite, DeclaredParameter, DeclaredSignature, parse_call_site, parse_signature,
};
pub use types::{TypeDeclaration, TypeRegistry};

use completion::MemberCollector;

/// Outcome of resolving a call against a type.
#[derive(Debug, Clone, PartialEq)]
pub enum CallResolution {
    Resolved { member: MemberCompletion, score: u32 },
    /// The type exists but no member converts from the argument types.
    NoMatch,
    TypeNotFound,
}

type Slot = Arc<OnceCell<Arc<ResolvedType>>>;

/// Resolves types to their members and extension chains, and calls to the best overload.
///
/// Every type is populated at most once per cache lifetime: concurrent requests for the
/// same declaration share one population and observe the same [`ResolvedType`].
pub struct Engine {
    index: Arc<LibraryIndex>,
    config: EngineConfig,
    registry: RwLock<TypeRegistry>,
    cache: DashMap<TypeDeclaration, Slot>,
    keywords: RwLock<Vec<MemberCompletion>>,
    docs: Option<Arc<dyn DocumentationProvider>>,
    populations: AtomicUsize,
}

impl Engine {
    pub fn new(index: Arc<LibraryIndex>, config: EngineConfig) -> Self {
        let registry = TypeRegistry::new(&config.aliases);
        Self {
            index,
            config,
            registry: RwLock::new(registry),
            cache: DashMap::new(),
            keywords: RwLock::new(vec![]),
            docs: None,
            populations: AtomicUsize::new(0),
        }
    }

    pub fn with_documentation(mut self, provider: Arc<dyn DocumentationProvider>) -> Self {
        self.docs = Some(provider);
        self
    }

    pub fn index(&self) -> &Arc<LibraryIndex> {
        &self.index
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Snapshot of the alias registry.
    pub fn registry(&self) -> TypeRegistry {
        self.registry.read().clone()
    }

    /// How many types have been populated since the engine was created.
    pub fn populations(&self) -> usize {
        self.populations.load(Ordering::Relaxed)
    }

    /// Declaration for a type name as the caller wrote it: an alias, a qualified name, or a
    /// simple name found in one of the default packages.
    pub fn declaration(&self, name: &str) -> TypeDeclaration {
        if let Some(declaration) = self.registry.read().declaration(name) {
            return declaration.clone();
        }
        if !name.contains('.') {
            for package in &self.config.default_packages {
                let qualified = format!("{package}.{name}");
                if self.index.contains(&qualified) {
                    return TypeDeclaration::new(&qualified);
                }
            }
        }
        TypeDeclaration::new(name)
    }

    pub fn resolve_name(&self, name: &str, statics_only: bool) -> Arc<ResolvedType> {
        self.resolve(&self.declaration(name).with_statics_only(statics_only))
    }

    /// The resolved type for a declaration, with every type on its extension chain
    /// resolved as well. A type no library declares resolves to an empty record.
    pub fn resolve(&self, declaration: &TypeDeclaration) -> Arc<ResolvedType> {
        let resolved = self.resolve_one(declaration);

        let mut visited = HashSet::from([declaration.clone()]);
        let mut pending: Vec<_> = resolved.extensions().to_vec();
        while let Some(next) = pending.pop() {
            if !visited.insert(next.clone()) {
                continue;
            }
            pending.extend(self.resolve_one(&next).extensions().iter().cloned());
        }
        resolved
    }

    /// The cached record, without populating it.
    pub fn cached(&self, declaration: &TypeDeclaration) -> Option<Arc<ResolvedType>> {
        self.cache
            .get(declaration)
            .and_then(|slot| slot.get().cloned())
    }

    fn resolve_one(&self, declaration: &TypeDeclaration) -> Arc<ResolvedType> {
        let slot = match self.cache.get(declaration) {
            Some(slot) => Arc::clone(slot.value()),
            None => Arc::clone(
                self.cache
                    .entry(declaration.clone())
                    .or_default()
                    .value(),
            ),
        };
        // the map guard is released above, population runs outside of it
        let resolved = slot.get_or_init(|| {
            self.populations.fetch_add(1, Ordering::Relaxed);
            Arc::new(self.populate(declaration))
        });
        Arc::clone(resolved)
    }

    /// Builds the record of a single type. Supertypes only become keys; they are resolved by
    /// the caller so a population never waits on another cell.
    fn populate(&self, declaration: &TypeDeclaration) -> ResolvedType {
        let Some(class) = self.index.lookup_in(
            declaration.qualified_name(),
            "",
            &self.config.default_packages,
        ) else {
            debug!("{declaration} is not in any library");
            return ResolvedType::missing(declaration.clone());
        };

        let source = self.docs.as_ref().and_then(|_| self.source_text(&class));
        let members = MemberCollector {
            class: &class,
            declaration,
            bean_properties: self.config.bean_properties,
            docs: self.docs.as_deref(),
            source: source.as_deref(),
        }
        .collect();

        let extensions: Vec<_> = class
            .super_class()
            .into_iter()
            .chain(class.interfaces())
            .filter(|name| !self.config.is_ignored(name))
            .map(|name| {
                TypeDeclaration::new(name).with_statics_only(declaration.is_statics_only())
            })
            .collect();

        self.registry
            .write()
            .register(class.simple_name(), class.name());
        debug!(
            "populated {declaration}: {} members, {} extensions",
            members.len(),
            extensions.len()
        );
        ResolvedType::new(declaration.clone(), Some(class), members, extensions)
    }

    fn source_text(&self, class: &ClassDescription) -> Option<String> {
        let library = self.index.owner(class.name())?;
        let location = library.source_location()?;
        match location.read_source(class.name()) {
            Ok(text) => text,
            Err(e) => {
                warn!("no documentation for {}: {e}", class.name());
                None
            }
        }
    }

    /// Members of the type and everything it extends. A member is hidden by a member with
    /// the same key declared further down its chain; like-keyed members of sibling
    /// supertypes are all kept.
    pub fn completions(&self, declaration: &TypeDeclaration) -> Vec<MemberCompletion> {
        let root = self.resolve(declaration);

        let mut completions = vec![];
        let mut visited = HashSet::new();
        let mut stack = vec![(root, Arc::new(HashSet::<Arc<str>>::new()))];
        while let Some((resolved, shadowed)) = stack.pop() {
            if !visited.insert(resolved.declaration().clone()) {
                continue;
            }
            for member in resolved.members() {
                if !shadowed.contains(member.key()) {
                    completions.push(member.clone());
                }
            }
            if resolved.extensions().is_empty() {
                continue;
            }
            let mut inherited = (*shadowed).clone();
            inherited.extend(resolved.members().iter().map(|m| Arc::clone(m.key())));
            let inherited = Arc::new(inherited);
            for extension in resolved.extensions().iter().rev() {
                stack.push((self.resolve_one(extension), Arc::clone(&inherited)));
            }
        }
        completions
    }

    /// Best overload among the given candidates, scored against this engine's aliases and
    /// the registered libraries.
    pub fn best_overload<'c, C, I>(&self, candidates: I, name: &str, arguments: &[String]) -> Overload<'c, C>
    where
        C: Candidate + ?Sized + 'c,
        I: IntoIterator<Item = &'c C>,
    {
        let registry = self.registry.read();
        best_overload(&registry, &*self.index, candidates, name, arguments)
    }

    /// Resolves `call` (`name(Type, Type)`) against the members of a type.
    pub fn resolve_call(&self, type_name: &str, call: &str) -> Result<CallResolution, SignatureError> {
        let call = parse_call_site(call)?;
        Ok(self.resolve_call_site(&self.declaration(type_name), &call))
    }

    pub fn resolve_call_site(&self, declaration: &TypeDeclaration, call: &CallSite) -> CallResolution {
        if !self.resolve(declaration).is_found() {
            return CallResolution::TypeNotFound;
        }
        let completions = self.completions(declaration);
        let candidates = completions.iter().filter(|member| member.is_callable());
        match self.best_overload(candidates, &call.name, &call.arguments) {
            Overload::Match { candidate, score } => CallResolution::Resolved {
                member: candidate.clone(),
                score,
            },
            Overload::NoMatch => CallResolution::NoMatch,
        }
    }

    /// Resolves a call against the global keyword functions.
    pub fn resolve_function_call(&self, call: &CallSite) -> CallResolution {
        let keywords = self.keywords.read();
        let candidates = keywords.iter().filter(|keyword| keyword.is_callable());
        match self.best_overload(candidates, &call.name, &call.arguments) {
            Overload::Match { candidate, score } => CallResolution::Resolved {
                member: candidate.clone(),
                score,
            },
            Overload::NoMatch => CallResolution::NoMatch,
        }
    }

    /// Adds keyword records to the global completion set. A record whose key is already
    /// present is ignored.
    pub fn merge_keywords(&self, keywords: impl IntoIterator<Item = Keyword>) {
        let mut merged = self.keywords.write();
        let mut keys: HashSet<_> = merged.iter().map(|k| Arc::clone(k.key())).collect();
        for keyword in keywords {
            let completion = keyword.to_completion();
            if keys.insert(Arc::clone(completion.key())) {
                merged.push(completion);
            }
        }
    }

    pub fn keywords(&self) -> Vec<MemberCompletion> {
        self.keywords.read().clone()
    }

    /// Drops the cached records of the named types and of every cached type whose
    /// extension chain reaches one of them.
    pub fn invalidate<S: AsRef<str>>(&self, qualified_names: &[S]) {
        let mut affected: HashSet<Arc<str>> = qualified_names
            .iter()
            .map(|name| Arc::from(name.as_ref()))
            .collect();

        let mut dependents: HashMap<Arc<str>, Vec<Arc<str>>> = HashMap::new();
        for entry in self.cache.iter() {
            let Some(resolved) = entry.value().get() else {
                continue;
            };
            for extension in resolved.extensions() {
                dependents
                    .entry(Arc::clone(extension.qualified_name()))
                    .or_default()
                    .push(Arc::clone(entry.key().qualified_name()));
            }
        }
        let mut pending: Vec<_> = affected.iter().cloned().collect();
        while let Some(name) = pending.pop() {
            for dependent in dependents.get(&name).into_iter().flatten() {
                if affected.insert(Arc::clone(dependent)) {
                    pending.push(Arc::clone(dependent));
                }
            }
        }

        self.cache
            .retain(|declaration, _| !affected.contains(declaration.qualified_name()));
        debug!("invalidated {} types", affected.len());
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Restores the built-in and configured aliases, forgetting discovered ones.
    pub fn reset_aliases(&self) {
        self.registry.write().reset();
    }

    /// Registers a library and drops every cached record, since types may have gained
    /// supertypes.
    pub fn register_library(
        &self,
        location: LibraryLocation,
        source_location: Option<SourceLocation>,
    ) -> Result<Arc<Library>, RegistrationError> {
        let library = self.index.register_with_source(location, source_location)?;
        self.clear_cache();
        Ok(library)
    }

    /// Removes a library and invalidates the types it served along with their dependents.
    pub fn remove_library(&self, location: &LibraryLocation) {
        let removed = self.index.remove(location);
        self.invalidate(&removed);
    }
}
