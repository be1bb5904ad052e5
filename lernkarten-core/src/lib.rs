pub mod errors;
pub mod filters;
pub mod models;
pub mod queue;
pub mod repo;
pub mod scheduler;
pub mod screening;
pub mod session;
pub mod stats;

pub use errors::*;
pub use filters::*;
pub use models::*;
pub use queue::*;
pub use repo::*;
pub use scheduler::*;
pub use screening::*;
pub use session::*;
pub use stats::*;
