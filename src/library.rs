use std::{collections::HashMap, sync::Arc};

use log::{debug, warn};
use parking_lot::RwLock;

use crate::{class, class::ClassDescription, error::RegistrationError};

mod location;
mod package_tree;

use location::ClassSource;
pub use location::{LibraryLocation, SourceLocation};
pub use package_tree::{ClassSlot, PackageNode, PackageTree};

/// Packages searched for unqualified names when the caller supplies none.
pub const DEFAULT_PACKAGES: &[&str] = &["java.lang"];

/// One registered location with its enumerated classes.
#[derive(Debug)]
pub struct Library {
    location: LibraryLocation,
    source_location: Option<SourceLocation>,
    source: Box<dyn ClassSource>,
    slots: HashMap<Arc<str>, ClassSlot>,
    tree: PackageTree,
}

impl Library {
    fn open(
        location: LibraryLocation,
        source_location: Option<SourceLocation>,
    ) -> Result<Self, RegistrationError> {
        let source = location.open()?;
        let mut slots = HashMap::with_capacity(source.class_names().len());
        let mut tree = PackageTree::default();
        for name in source.class_names() {
            let slot = ClassSlot::default();
            tree.insert(name, Arc::clone(&slot));
            slots.insert(Arc::clone(name), slot);
        }
        Ok(Self {
            location,
            source_location,
            source,
            slots,
            tree,
        })
    }

    pub fn location(&self) -> &LibraryLocation {
        &self.location
    }

    pub fn source_location(&self) -> Option<&SourceLocation> {
        self.source_location.as_ref()
    }

    pub fn package_tree(&self) -> &PackageTree {
        &self.tree
    }

    pub fn contains(&self, qualified: &str) -> bool {
        self.slots.contains_key(qualified)
    }

    pub fn class_names(&self) -> impl Iterator<Item = &Arc<str>> {
        self.source.class_names().iter()
    }

    /// Decodes a class of this library on first request. Decode failures are logged and
    /// remembered; I/O failures are logged and retried on the next request.
    pub fn class(&self, qualified: &str) -> Option<Arc<ClassDescription>> {
        let slot = self.slots.get(qualified)?;
        let class = slot.get_or_try_init(|| match self.source.read_class(qualified) {
            Ok(Some(bytes)) => match class::decode(&bytes) {
                Ok(class) => Ok(Some(class)),
                Err(e) => {
                    warn!("skipping {qualified} in {}: {e}", self.location);
                    Ok(None)
                }
            },
            Ok(None) => {
                warn!("{qualified} is no longer present in {}", self.location);
                Ok(None)
            }
            Err(e) => {
                warn!("cannot read {qualified} from {}: {e}", self.location);
                Err(())
            }
        });
        class.ok()?.clone()
    }
}

#[derive(Debug, Default)]
struct IndexState {
    libraries: Vec<Arc<Library>>,
    /// Owning library of every known class; the earliest registration wins.
    classes: HashMap<Arc<str>, Arc<Library>>,
}

/// All registered libraries, keyed by qualified class name. Registration takes the write
/// lock; lookups share the read lock and decode outside of it.
#[derive(Debug, Default)]
pub struct LibraryIndex {
    state: RwLock<IndexState>,
}

impl LibraryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, location: LibraryLocation) -> Result<Arc<Library>, RegistrationError> {
        self.register_with_source(location, None)
    }

    /// Registers a location together with the companion source location used for
    /// documentation. Fails immediately when the location cannot be opened.
    pub fn register_with_source(
        &self,
        location: LibraryLocation,
        source_location: Option<SourceLocation>,
    ) -> Result<Arc<Library>, RegistrationError> {
        if self.is_registered(&location) {
            return Err(RegistrationError::AlreadyRegistered(location.display_path()));
        }
        let library = Arc::new(Library::open(location, source_location)?);

        let mut state = self.state.write();
        if state
            .libraries
            .iter()
            .any(|registered| registered.location == library.location)
        {
            return Err(RegistrationError::AlreadyRegistered(
                library.location.display_path(),
            ));
        }
        let mut shadowed = 0;
        for name in library.class_names() {
            if state.classes.contains_key(name) {
                shadowed += 1;
            } else {
                state.classes.insert(Arc::clone(name), Arc::clone(&library));
            }
        }
        state.libraries.push(Arc::clone(&library));
        debug!(
            "registered {} ({} classes, {shadowed} shadowed by earlier libraries)",
            library.location,
            library.slots.len()
        );
        Ok(library)
    }

    fn is_registered(&self, location: &LibraryLocation) -> bool {
        self.state
            .read()
            .libraries
            .iter()
            .any(|library| library.location == *location)
    }

    /// Unregisters a location. Returns the names whose owning library changed, including
    /// names now served by a later registration.
    pub fn remove(&self, location: &LibraryLocation) -> Vec<Arc<str>> {
        let mut state = self.state.write();
        let Some(position) = state
            .libraries
            .iter()
            .position(|library| library.location == *location)
        else {
            return vec![];
        };
        let removed = state.libraries.remove(position);

        let mut affected = Vec::new();
        for name in removed.class_names() {
            let owned = state
                .classes
                .get(name)
                .is_some_and(|owner| Arc::ptr_eq(owner, &removed));
            if !owned {
                continue;
            }
            let successor = state
                .libraries
                .iter()
                .find(|library| library.contains(name))
                .cloned();
            match successor {
                Some(library) => {
                    state.classes.insert(Arc::clone(name), library);
                }
                None => {
                    state.classes.remove(name);
                }
            }
            affected.push(Arc::clone(name));
        }
        debug!("removed {location}, {} classes affected", affected.len());
        affected
    }

    pub fn contains(&self, qualified: &str) -> bool {
        self.state.read().classes.contains_key(qualified)
    }

    pub fn libraries(&self) -> Vec<Arc<Library>> {
        self.state.read().libraries.clone()
    }

    pub fn library(&self, location: &LibraryLocation) -> Option<Arc<Library>> {
        self.state
            .read()
            .libraries
            .iter()
            .find(|library| library.location == *location)
            .cloned()
    }

    pub fn package_tree(&self, location: &LibraryLocation) -> Option<PackageTree> {
        self.library(location)
            .map(|library| library.package_tree().clone())
    }

    /// Sorted qualified names of the classes directly inside `package`.
    pub fn classes_in_package(&self, package: &str) -> Vec<Arc<str>> {
        let mut names: Vec<_> = self
            .state
            .read()
            .classes
            .keys()
            .filter(|name| match name.rsplit_once('.') {
                Some((pkg, _)) => pkg == package,
                None => package.is_empty(),
            })
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// The library that serves `qualified`, if any.
    pub fn owner(&self, qualified: &str) -> Option<Arc<Library>> {
        self.state.read().classes.get(qualified).cloned()
    }

    /// Looks a name up across all libraries, trying [`DEFAULT_PACKAGES`] for simple names.
    pub fn lookup(&self, name: &str) -> Option<Arc<ClassDescription>> {
        self.lookup_in(name, "", DEFAULT_PACKAGES)
    }

    /// Looks a name up as written, then, for a simple name, in `current_package` and each of
    /// `default_packages`. A name that is nowhere to be found is `None`, never an error.
    pub fn lookup_in<S: AsRef<str>>(
        &self,
        name: &str,
        current_package: &str,
        default_packages: &[S],
    ) -> Option<Arc<ClassDescription>> {
        let (qualified, library) = {
            let state = self.state.read();
            candidate_names(name, current_package, default_packages)
                .into_iter()
                .find_map(|candidate| {
                    let library = state.classes.get(candidate.as_str())?;
                    Some((candidate, Arc::clone(library)))
                })?
        };
        library.class(&qualified)
    }
}

fn candidate_names<S: AsRef<str>>(
    name: &str,
    current_package: &str,
    default_packages: &[S],
) -> Vec<String> {
    let mut candidates = vec![name.to_string()];
    if name.contains('.') {
        return candidates;
    }
    let packages = std::iter::once(current_package)
        .chain(default_packages.iter().map(|package| package.as_ref()))
        .filter(|package| !package.is_empty());
    for package in packages {
        let candidate = format!("{package}.{name}");
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn qualified_names_are_looked_up_as_written() {
        assert_eq!(
            candidate_names("java.util.List", "a.b", DEFAULT_PACKAGES),
            vec!["java.util.List"]
        );
    }

    #[test]
    fn simple_names_try_current_then_default_packages() {
        assert_eq!(
            candidate_names("String", "a.b", DEFAULT_PACKAGES),
            vec!["String", "a.b.String", "java.lang.String"]
        );
        assert_eq!(
            candidate_names("String", "", &["java.lang", "java.lang"]),
            vec!["String", "java.lang.String"]
        );
    }

    #[test]
    fn missing_location_is_rejected_at_registration() {
        let index = LibraryIndex::new();
        let result = index.register(LibraryLocation::Directory("/no/such/classes".into()));
        assert!(matches!(result, Err(RegistrationError::NotFound(_))));
        assert!(index.libraries().is_empty());
    }
}
