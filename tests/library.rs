mod common;

use std::{env, sync::Arc};

use common::*;
use jvmdex::{
    LibraryIndex, LibraryLocation, RegistrationError, SourceLocation,
    library::PackageNode,
};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn class_with_method(internal_name: &str, method: &str) -> Vec<u8> {
    ClassFileBuilder::new(internal_name)
        .method(ACC_PUBLIC, method, "()V")
        .build()
}

#[test]
fn archive_lookup_decodes_lazily() {
    let dir = tempdir().unwrap();
    let jar = dir.path().join("lib.jar");
    write_jar(
        &jar,
        &[
            (entry("com/acme/Widget").as_str(), class_with_method("com/acme/Widget", "spin")),
            (entry("com/acme/util/Strings").as_str(), class_with_method("com/acme/util/Strings", "trim")),
            ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n".to_vec()),
            ("module-info.class", vec![0xca, 0xfe]),
        ],
    );

    let index = LibraryIndex::new();
    let library = index.register(LibraryLocation::from_path(&jar)).unwrap();
    assert_eq!(library.class_names().count(), 2);
    assert!(index.contains("com.acme.Widget"));
    assert!(!index.contains("module-info"));

    let tree = library.package_tree();
    assert!(tree.get("com.acme").unwrap().is_package());
    assert!(tree.get("com.acme.Widget").unwrap().loaded().is_none());

    let widget = index.lookup("com.acme.Widget").unwrap();
    assert_eq!(widget.methods()[0].name().as_ref(), "spin");
    assert!(tree.get("com.acme.Widget").unwrap().loaded().is_some());
    // decoded once, shared afterwards
    assert!(Arc::ptr_eq(&widget, &index.lookup("com.acme.Widget").unwrap()));

    assert_eq!(
        tree.class_names(),
        vec!["com.acme.Widget".to_string(), "com.acme.util.Strings".to_string()]
    );
    assert_eq!(
        index.classes_in_package("com.acme"),
        vec![Arc::<str>::from("com.acme.Widget")]
    );
}

#[test]
fn missing_names_are_none() {
    let dir = tempdir().unwrap();
    write_tree(dir.path(), &[(entry("a/A").as_str(), class_with_method("a/A", "run"))]);
    let index = LibraryIndex::new();
    index.register(LibraryLocation::from_path(dir.path())).unwrap();

    assert!(index.lookup("a.Missing").is_none());
    assert!(index.lookup("A").is_none());
    assert!(index.lookup_in("A", "a", &["java.lang"]).is_some());
}

#[test]
fn first_registration_wins() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("first.jar");
    let second = dir.path().join("second.jar");
    write_jar(&first, &[(entry("pkg/Foo").as_str(), class_with_method("pkg/Foo", "fromFirst"))]);
    write_jar(&second, &[(entry("pkg/Foo").as_str(), class_with_method("pkg/Foo", "fromSecond"))]);

    let index = LibraryIndex::new();
    index.register(LibraryLocation::from_path(&first)).unwrap();
    index.register(LibraryLocation::from_path(&second)).unwrap();

    let foo = index.lookup("pkg.Foo").unwrap();
    assert_eq!(foo.methods()[0].name().as_ref(), "fromFirst");

    let affected = index.remove(&LibraryLocation::from_path(&first));
    assert_eq!(affected, vec![Arc::<str>::from("pkg.Foo")]);
    let foo = index.lookup("pkg.Foo").unwrap();
    assert_eq!(foo.methods()[0].name().as_ref(), "fromSecond");
    assert_eq!(index.libraries().len(), 1);
}

#[test]
fn nonexistent_location_fails_at_registration() {
    let dir = tempdir().unwrap();
    let index = LibraryIndex::new();
    let missing = dir.path().join("nope.jar");
    assert!(matches!(
        index.register(LibraryLocation::from_path(&missing)),
        Err(RegistrationError::NotFound(path)) if path == missing
    ));
    assert!(matches!(
        index.register(LibraryLocation::Directory(dir.path().join("nodir"))),
        Err(RegistrationError::NotFound(_))
    ));
    assert!(index.libraries().is_empty());
}

#[test]
fn garbage_archive_is_rejected() {
    let dir = tempdir().unwrap();
    let jar = dir.path().join("broken.jar");
    std::fs::write(&jar, b"not a zip").unwrap();
    assert!(matches!(
        LibraryIndex::new().register(LibraryLocation::from_path(&jar)),
        Err(RegistrationError::InvalidArchive { .. })
    ));
}

#[test]
fn registering_twice_is_an_error() {
    let dir = tempdir().unwrap();
    let index = LibraryIndex::new();
    index.register(LibraryLocation::from_path(dir.path())).unwrap();
    assert!(matches!(
        index.register(LibraryLocation::from_path(dir.path())),
        Err(RegistrationError::AlreadyRegistered(_))
    ));
}

#[test]
fn undecodable_entry_is_skipped() {
    let dir = tempdir().unwrap();
    let jar = dir.path().join("mixed.jar");
    write_jar(
        &jar,
        &[
            (entry("p/Broken").as_str(), vec![0xde, 0xad, 0xbe, 0xef]),
            (entry("p/Fine").as_str(), class_with_method("p/Fine", "ok")),
        ],
    );

    let index = LibraryIndex::new();
    index.register(LibraryLocation::from_path(&jar)).unwrap();
    assert!(index.contains("p.Broken"));
    assert!(index.lookup("p.Broken").is_none());
    assert!(index.lookup("p.Fine").is_some());
}

#[test]
fn single_class_file_location() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Loose.class");
    std::fs::write(&path, class_with_method("deep/pkg/Loose", "go")).unwrap();

    let index = LibraryIndex::new();
    let location = LibraryLocation::from_path(&path);
    assert_eq!(location, LibraryLocation::ClassFile(path.clone()));
    index.register(location.clone()).unwrap();
    assert!(index.lookup("deep.pkg.Loose").is_some());
    assert!(matches!(
        index.package_tree(&location).unwrap().get("deep.pkg.Loose"),
        Some(PackageNode::Class(_))
    ));

    let junk = dir.path().join("Junk.class");
    std::fs::write(&junk, b"junk").unwrap();
    assert!(matches!(
        index.register(LibraryLocation::from_path(&junk)),
        Err(RegistrationError::InvalidClassFile { .. })
    ));
}

#[test]
fn classpath_first_entry_wins() {
    let dir = tempdir().unwrap();
    let classes = dir.path().join("classes");
    let jar = dir.path().join("dep.jar");
    write_tree(
        &classes,
        &[(entry("app/Main").as_str(), class_with_method("app/Main", "fromDirectory"))],
    );
    write_jar(
        &jar,
        &[
            (entry("app/Main").as_str(), class_with_method("app/Main", "fromJar")),
            (entry("dep/Helper").as_str(), class_with_method("dep/Helper", "help")),
        ],
    );

    let list = env::join_paths([&classes, &jar]).unwrap();
    let index = LibraryIndex::new();
    index
        .register(LibraryLocation::Classpath(list.to_string_lossy().into_owned()))
        .unwrap();

    let main = index.lookup("app.Main").unwrap();
    assert_eq!(main.methods()[0].name().as_ref(), "fromDirectory");
    assert!(index.lookup("dep.Helper").is_some());
}

#[test]
fn source_text_for_nested_classes() {
    let dir = tempdir().unwrap();
    let sources = dir.path().join("src");
    write_tree(&sources, &[("a/Outer.java", b"class Outer {}".to_vec())]);
    let location = SourceLocation::from_path(&sources);
    assert_eq!(location, SourceLocation::Directory(sources.clone()));
    assert_eq!(
        location.read_source("a.Outer$Inner").unwrap().as_deref(),
        Some("class Outer {}")
    );
    assert_eq!(location.read_source("a.Other").unwrap(), None);

    let jar = dir.path().join("src.jar");
    write_jar(&jar, &[("a/Outer.java", b"class Outer {}".to_vec())]);
    let archive = SourceLocation::from_path(&jar);
    assert_eq!(
        archive.read_source("a.Outer").unwrap().as_deref(),
        Some("class Outer {}")
    );
    assert_eq!(archive.read_source("a.Other").unwrap(), None);
}
