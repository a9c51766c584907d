pub mod class;
pub mod config;
pub mod consts;
pub mod descriptor;
pub mod error;
pub mod library;
pub mod resolve;

pub use class::{ClassDescription, decode};
pub use config::EngineConfig;
pub use error::{DecodeError, LibraryError, RegistrationError, SignatureError};
pub use library::{LibraryIndex, LibraryLocation, SourceLocation};
pub use resolve::{CallResolution, Engine, TypeDeclaration};
