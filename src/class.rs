mod parser;
mod structs;

pub use parser::decode;
pub use structs::*;
