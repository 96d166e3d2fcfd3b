pub mod generator;
pub mod handlers;
pub mod provider;
pub mod router;
pub mod storage;
pub mod task_store;
pub mod types;

pub use generator::VideoGenerator;
pub use router::app_router;
pub use task_store::TaskStore;
