pub mod task_pool;
pub mod wait_group;

pub use task_pool::{PoolConfig, PoolState, Task, TaskPool};
pub use wait_group::{WaitGroup, WaitGuard};
