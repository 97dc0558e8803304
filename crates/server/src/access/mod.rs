//! Tenant-scoped access: grants, default selection, role resolution and
//! session assembly.

pub mod backend;
pub mod defaults;
pub mod memory;
pub mod pg;
pub mod resolver;
pub mod session;
pub mod store;

pub use backend::AccessBackend;
pub use defaults::{clear_defaults, set_defaults};
pub use memory::MemoryAccessStore;
pub use pg::PgAccessStore;
pub use resolver::{resolve_role, session_role};
pub use session::assemble_session;
pub use store::{AccessSnapshot, AccessStore, DefaultRef};
