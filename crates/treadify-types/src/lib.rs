pub mod api;
pub mod models;
pub mod session;

pub use models::{CommitStatus, GoalStatus, Permission, ProductStatus, Role};
pub use session::{Scope, SessionState, SessionUser};
