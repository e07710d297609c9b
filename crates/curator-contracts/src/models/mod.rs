mod backend_id;
mod selectors;

pub use backend_id::{BackendId, BackendKind, DEFAULT_HOSTED_MODEL, LOCAL_PROVIDER};
pub use selectors::{BackendSelection, BackendSelector};
