pub mod task_ctx;
pub mod task_flow;

pub use task_ctx::TaskUnit;
pub use task_flow::TaskFlow;
