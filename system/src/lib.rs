mod element;
mod message;
mod reconcile;
mod types;

pub use element::*;
pub use message::*;
pub use reconcile::*;
pub use types::*;

pub use serde;
pub use serde_json;
