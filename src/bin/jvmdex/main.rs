use std::{collections::BTreeMap, error::Error, fs, path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use jvmdex::{
    CallResolution, Engine, EngineConfig, LibraryIndex, LibraryLocation,
    library::PackageNode,
};

#[derive(Parser)]
#[command(version, about = "Inspect JVM class files and resolve members against libraries")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a single class file and print its declaration.
    Dump { path: PathBuf },
    /// Print the package tree of a library.
    Tree { library: PathBuf },
    /// List the completions of a type.
    Members {
        #[arg(short, long = "lib", required = true)]
        libraries: Vec<PathBuf>,
        type_name: String,
        /// Only static members, as when the class itself is the receiver.
        #[arg(long)]
        statics: bool,
        #[arg(long)]
        bean_properties: bool,
    },
    /// Resolve a call such as `max(Number, Number)` against a type.
    Call {
        #[arg(short, long = "lib", required = true)]
        libraries: Vec<PathBuf>,
        type_name: String,
        call: String,
        #[arg(long)]
        statics: bool,
    },
}

fn engine(libraries: Vec<PathBuf>, config: EngineConfig) -> Result<Engine, Box<dyn Error>> {
    let index = Arc::new(LibraryIndex::new());
    for path in libraries {
        let library = index.register(LibraryLocation::from_path(path))?;
        log::info!(
            "registered {} ({} classes)",
            library.location(),
            library.class_names().count()
        );
    }
    Ok(Engine::new(index, config))
}

fn print_tree(nodes: &BTreeMap<String, PackageNode>, depth: usize) {
    for (name, node) in nodes {
        match node {
            PackageNode::Package(children) => {
                println!("{:indent$}{name}/", "", indent = depth * 2);
                print_tree(children, depth + 1);
            }
            PackageNode::Class(_) => println!("{:indent$}{name}", "", indent = depth * 2),
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    match Cli::parse().command {
        Command::Dump { path } => {
            let class = jvmdex::decode(&fs::read(&path)?)?;
            let (major, minor) = class.version();
            println!("{} (version {major}.{minor})", class.name());
            if let Some(super_class) = class.super_class() {
                println!("  extends {super_class}");
            }
            for interface in class.interfaces() {
                println!("  implements {interface}");
            }
            for field in class.fields() {
                println!("  {} {}", field.field_type().java_name(), field.name());
            }
            for method in class.methods() {
                println!("  {}", method.signature());
            }
        }
        Command::Tree { library } => {
            let index = LibraryIndex::new();
            let library = index.register(LibraryLocation::from_path(library))?;
            print_tree(library.package_tree().root(), 0);
        }
        Command::Members {
            libraries,
            type_name,
            statics,
            bean_properties,
        } => {
            let engine = engine(libraries, EngineConfig::default().bean_properties(bean_properties))?;
            let declaration = engine.declaration(&type_name).with_statics_only(statics);
            if !engine.resolve(&declaration).is_found() {
                return Err(format!("type {type_name} not found").into());
            }
            for member in engine.completions(&declaration) {
                let owner = member.owner().map(|owner| &**owner).unwrap_or("");
                println!("{:<48} {owner}", member.signature());
            }
        }
        Command::Call {
            libraries,
            type_name,
            call,
            statics,
        } => {
            let engine = engine(libraries, EngineConfig::default())?;
            let declaration = engine.declaration(&type_name).with_statics_only(statics);
            let call = jvmdex::resolve::parse_call_site(&call)?;
            match engine.resolve_call_site(&declaration, &call) {
                CallResolution::Resolved { member, score } => {
                    println!("{} (score {score})", member.signature());
                }
                CallResolution::NoMatch => println!("no matching overload"),
                CallResolution::TypeNotFound => {
                    return Err(format!("type {type_name} not found").into());
                }
            }
        }
    }
    Ok(())
}
