//! Session state: the current principal and where it is persisted.

mod identity;
mod principal;
mod state;
pub mod storage;

pub use identity::{DEFAULT_ME_PATH, HttpIdentitySource, IdentitySource};
pub use principal::{Principal, ScopeGrant};
pub use state::SessionState;
pub use storage::{FileStore, LocalStore, MemoryStore, THEME_KEY, USER_KEY};
