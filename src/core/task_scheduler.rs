//! 任务调度：限制同时运行的 Task 数量
//!
//! 每个 Task 独占自己的执行记录与上下文，只共享只读的工具注册表；Semaphore 只用于限流。

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub struct TaskScheduler {
    task_semaphore: Arc<Semaphore>,
    limit: usize,
}

impl TaskScheduler {
    pub fn new(max_concurrent_tasks: usize) -> Self {
        let limit = max_concurrent_tasks.max(1);
        Self {
            task_semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// 获取运行许可；信号量从不关闭，None 只在被外部关闭时出现
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        self.task_semaphore.clone().acquire_owned().await.ok()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn available(&self) -> usize {
        self.task_semaphore.available_permits()
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_permits_are_bounded() {
        let scheduler = TaskScheduler::new(0);
        assert_eq!(scheduler.limit(), 1);

        let permit = scheduler.acquire().await;
        assert!(permit.is_some());
        assert_eq!(scheduler.available(), 0);
        drop(permit);
        assert_eq!(scheduler.available(), 1);
    }
}
