mod collaborator;
mod session;
mod version_store;

pub use collaborator::*;
pub use session::*;
pub use version_store::*;
