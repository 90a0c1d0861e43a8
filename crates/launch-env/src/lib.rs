pub mod env;
pub mod wrappers;

pub use env::EnvComposer;
pub use wrappers::{build_wrapper_chain, ResolvedTools};
