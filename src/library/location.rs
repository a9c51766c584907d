use std::{
    collections::HashMap,
    env,
    fmt::{self, Debug, Display},
    fs::{self, File},
    io::{self, Read},
    path::{Path, PathBuf},
    sync::Arc,
};

use log::{debug, warn};
use parking_lot::Mutex;
use zip::{ZipArchive, result::ZipError};

use crate::{
    class,
    error::{LibraryError, RegistrationError},
};

const CLASS_EXTENSION: &str = "class";
const SOURCE_EXTENSION: &str = "java";

/// Where the compiled classes of one library live.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LibraryLocation {
    /// A `.jar` or `.zip` archive.
    Archive(PathBuf),
    /// The root of a directory tree of class files, laid out by package.
    Directory(PathBuf),
    /// A platform path list (`a.jar:classes/`). Within the list the first entry wins.
    Classpath(String),
    /// A single class file; its package is read from the class itself.
    ClassFile(PathBuf),
}

impl LibraryLocation {
    /// Picks the location kind from the path: archives by extension, class files by
    /// extension, anything else is treated as a directory.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("jar") || ext.eq_ignore_ascii_case("zip") => {
                LibraryLocation::Archive(path)
            }
            Some(CLASS_EXTENSION) => LibraryLocation::ClassFile(path),
            _ => LibraryLocation::Directory(path),
        }
    }

    pub(crate) fn display_path(&self) -> PathBuf {
        match self {
            LibraryLocation::Archive(path)
            | LibraryLocation::Directory(path)
            | LibraryLocation::ClassFile(path) => path.clone(),
            LibraryLocation::Classpath(list) => PathBuf::from(list),
        }
    }

    /// Opens the backing storage and enumerates every class it holds.
    pub(crate) fn open(&self) -> Result<Box<dyn ClassSource>, RegistrationError> {
        match self {
            LibraryLocation::Archive(path) => Ok(Box::new(ArchiveSource::open(path)?)),
            LibraryLocation::Directory(path) => Ok(Box::new(DirectorySource::open(path)?)),
            LibraryLocation::ClassFile(path) => Ok(Box::new(ClassFileSource::open(path)?)),
            LibraryLocation::Classpath(list) => Ok(Box::new(ClasspathSource::open(list)?)),
        }
    }
}

impl Display for LibraryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryLocation::Archive(path) => write!(f, "archive {}", path.display()),
            LibraryLocation::Directory(path) => write!(f, "directory {}", path.display()),
            LibraryLocation::Classpath(list) => write!(f, "classpath {list}"),
            LibraryLocation::ClassFile(path) => write!(f, "class file {}", path.display()),
        }
    }
}

/// Backing storage of one registered library.
pub(crate) trait ClassSource: Debug + Send + Sync {
    /// Qualified names of every class, in enumeration order.
    fn class_names(&self) -> &[Arc<str>];

    /// Raw bytes of a class, `None` when the entry has disappeared.
    fn read_class(&self, qualified: &str) -> Result<Option<Vec<u8>>, LibraryError>;
}

fn require_existing(path: &Path) -> Result<(), RegistrationError> {
    match path.try_exists() {
        Ok(true) => Ok(()),
        Ok(false) => Err(RegistrationError::NotFound(path.to_path_buf())),
        Err(source) => Err(RegistrationError::Unreadable {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// `java/util/Map$Entry.class` -> `java.util.Map$Entry`. Skips non-class entries and the
/// `module-info`/`package-info` pseudo classes.
fn class_name_of_entry(entry: &str) -> Option<Arc<str>> {
    let stem = entry.strip_suffix(".class")?;
    let simple = stem.rsplit('/').next().unwrap_or(stem);
    if simple.is_empty() || simple.contains('-') || stem.starts_with("META-INF/") {
        return None;
    }
    Some(Arc::from(stem.replace('/', ".")))
}

fn entry_name_of_class(qualified: &str, extension: &str) -> String {
    format!("{}.{extension}", qualified.replace('.', "/"))
}

/// Upper bound on the buffer reserved from a declared entry size.
const MAX_PREALLOCATION: u64 = 1 << 20;

fn read_fully<R: Read>(mut reader: R, size_hint: u64) -> io::Result<Vec<u8>> {
    let mut content = Vec::with_capacity(size_hint.min(MAX_PREALLOCATION) as usize);
    reader.read_to_end(&mut content)?;
    Ok(content)
}

fn open_archive(path: &Path) -> Result<ZipArchive<File>, RegistrationError> {
    require_existing(path)?;
    let file = File::open(path).map_err(|source| RegistrationError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    ZipArchive::new(file).map_err(|source| RegistrationError::InvalidArchive {
        path: path.to_path_buf(),
        source,
    })
}

struct ArchiveSource {
    path: PathBuf,
    archive: Mutex<ZipArchive<File>>,
    names: Vec<Arc<str>>,
}

impl ArchiveSource {
    fn open(path: &Path) -> Result<Self, RegistrationError> {
        let archive = open_archive(path)?;
        let names: Vec<_> = archive.file_names().filter_map(class_name_of_entry).collect();
        debug!("{}: {} classes", path.display(), names.len());
        Ok(Self {
            path: path.to_path_buf(),
            archive: Mutex::new(archive),
            names,
        })
    }
}

impl Debug for ArchiveSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveSource")
            .field("path", &self.path)
            .field("classes", &self.names.len())
            .finish()
    }
}

impl ClassSource for ArchiveSource {
    fn class_names(&self) -> &[Arc<str>] {
        &self.names
    }

    fn read_class(&self, qualified: &str) -> Result<Option<Vec<u8>>, LibraryError> {
        let mut archive = self.archive.lock();
        let mut class_file = match archive.by_name(&entry_name_of_class(qualified, CLASS_EXTENSION))
        {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let size = class_file.size();
        Ok(Some(read_fully(&mut class_file, size)?))
    }
}

#[derive(Debug)]
struct DirectorySource {
    root: PathBuf,
    names: Vec<Arc<str>>,
}

impl DirectorySource {
    fn open(root: &Path) -> Result<Self, RegistrationError> {
        require_existing(root)?;
        fn traverse(dir: &Path, package: &str, names: &mut Vec<Arc<str>>) -> io::Result<()> {
            let mut entries = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
            entries.sort_by_key(|entry| entry.file_name());
            for entry in entries {
                let path = entry.path();
                let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                    continue;
                };
                let relative = if package.is_empty() {
                    file_name.to_string()
                } else {
                    format!("{package}/{file_name}")
                };
                if path.is_dir() {
                    traverse(&path, &relative, names)?;
                } else if let Some(name) = class_name_of_entry(&relative) {
                    names.push(name);
                }
            }
            Ok(())
        }

        let mut names = Vec::new();
        traverse(root, "", &mut names).map_err(|source| RegistrationError::Unreadable {
            path: root.to_path_buf(),
            source,
        })?;
        debug!("{}: {} classes", root.display(), names.len());
        Ok(Self {
            root: root.to_path_buf(),
            names,
        })
    }
}

impl ClassSource for DirectorySource {
    fn class_names(&self) -> &[Arc<str>] {
        &self.names
    }

    fn read_class(&self, qualified: &str) -> Result<Option<Vec<u8>>, LibraryError> {
        match fs::read(self.root.join(entry_name_of_class(qualified, CLASS_EXTENSION))) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug)]
struct ClassFileSource {
    path: PathBuf,
    names: [Arc<str>; 1],
}

impl ClassFileSource {
    fn open(path: &Path) -> Result<Self, RegistrationError> {
        require_existing(path)?;
        let bytes = fs::read(path).map_err(|source| RegistrationError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let class = class::decode(&bytes).map_err(|source| RegistrationError::InvalidClassFile {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            names: [Arc::clone(class.name())],
        })
    }
}

impl ClassSource for ClassFileSource {
    fn class_names(&self) -> &[Arc<str>] {
        &self.names
    }

    fn read_class(&self, qualified: &str) -> Result<Option<Vec<u8>>, LibraryError> {
        if *self.names[0] != *qualified {
            return Ok(None);
        }
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug)]
struct ClasspathSource {
    entries: Vec<Box<dyn ClassSource>>,
    owners: HashMap<Arc<str>, usize>,
    names: Vec<Arc<str>>,
}

impl ClasspathSource {
    fn open(list: &str) -> Result<Self, RegistrationError> {
        let mut entries = Vec::new();
        let mut owners = HashMap::new();
        let mut names = Vec::new();
        for path in env::split_paths(list).filter(|path| !path.as_os_str().is_empty()) {
            let source = LibraryLocation::from_path(path).open()?;
            for name in source.class_names() {
                if !owners.contains_key(name) {
                    owners.insert(Arc::clone(name), entries.len());
                    names.push(Arc::clone(name));
                }
            }
            entries.push(source);
        }
        Ok(Self {
            entries,
            owners,
            names,
        })
    }
}

impl ClassSource for ClasspathSource {
    fn class_names(&self) -> &[Arc<str>] {
        &self.names
    }

    fn read_class(&self, qualified: &str) -> Result<Option<Vec<u8>>, LibraryError> {
        match self.owners.get(qualified) {
            Some(&entry) => self.entries[entry].read_class(qualified),
            None => Ok(None),
        }
    }
}

/// Companion location of a library's source files, consulted only for documentation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceLocation {
    Directory(PathBuf),
    Archive(PathBuf),
}

impl SourceLocation {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.is_dir() {
            SourceLocation::Directory(path)
        } else {
            SourceLocation::Archive(path)
        }
    }

    /// Source text of the compilation unit declaring `qualified`. Nested classes map to the
    /// file of their outermost class.
    pub fn read_source(&self, qualified: &str) -> Result<Option<String>, LibraryError> {
        let outer = qualified.split('$').next().unwrap_or(qualified);
        let entry = entry_name_of_class(outer, SOURCE_EXTENSION);
        match self {
            SourceLocation::Directory(root) => match fs::read_to_string(root.join(&entry)) {
                Ok(text) => Ok(Some(text)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            },
            SourceLocation::Archive(path) => {
                let file = File::open(path)?;
                let mut archive = ZipArchive::new(file)?;
                let mut source = match archive.by_name(&entry) {
                    Ok(source) => source,
                    Err(ZipError::FileNotFound) => {
                        warn!("{entry} not found in {}", path.display());
                        return Ok(None);
                    }
                    Err(e) => return Err(e.into()),
                };
                let size = source.size();
                let bytes = read_fully(&mut source, size)?;
                Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_size_does_not_drive_allocation() {
        let content = read_fully(&b"cafe"[..], u64::MAX).unwrap();
        assert_eq!(content, b"cafe");
        assert!(content.capacity() <= MAX_PREALLOCATION as usize);
    }

    #[test]
    fn entry_names() {
        assert_eq!(
            class_name_of_entry("java/util/Map$Entry.class").as_deref(),
            Some("java.util.Map$Entry")
        );
        assert_eq!(class_name_of_entry("Top.class").as_deref(), Some("Top"));
        assert_eq!(class_name_of_entry("module-info.class"), None);
        assert_eq!(class_name_of_entry("a/package-info.class"), None);
        assert_eq!(class_name_of_entry("META-INF/versions/9/a/B.class"), None);
        assert_eq!(class_name_of_entry("a/B.java"), None);
        assert_eq!(class_name_of_entry("a/"), None);
    }

    #[test]
    fn location_kind_from_extension() {
        assert_eq!(
            LibraryLocation::from_path("lib/rt.JAR"),
            LibraryLocation::Archive("lib/rt.JAR".into())
        );
        assert_eq!(
            LibraryLocation::from_path("out/A.class"),
            LibraryLocation::ClassFile("out/A.class".into())
        );
        assert_eq!(
            LibraryLocation::from_path("out/classes"),
            LibraryLocation::Directory("out/classes".into())
        );
    }

    #[test]
    fn missing_paths_fail_to_open() {
        let location = LibraryLocation::Archive("/definitely/not/here.jar".into());
        assert!(matches!(
            location.open(),
            Err(RegistrationError::NotFound(path)) if path == Path::new("/definitely/not/here.jar")
        ));
    }
}
