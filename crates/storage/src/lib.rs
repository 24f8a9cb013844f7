pub mod backend;
pub mod error;
mod models;
mod validate;

pub use crate::backend::RemoteStore;
pub use crate::models::{FolderId, RemoteFolder};
pub use crate::validate::name as validate_name;
use std::sync::Arc;

pub type StoreHandle = Arc<dyn RemoteStore + Send + Sync>;
