//! タスクのインメモリ保管
//!
//! プロセス内でのみ保持し、永続化は行いません。

use std::collections::HashMap;

use crate::task::Task;

/// タスクのインメモリストア
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tasks: HashMap<String, Task>,
    // 保存順（同じ ID の再保存では順序を変えない）
    order: Vec<String>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// タスクを保存する
    ///
    /// 同じ ID のタスクが既にある場合は置き換えます。
    pub fn save_task(&mut self, task: Task) {
        let id = task.id().to_string();
        if self.tasks.insert(id.clone(), task).is_none() {
            self.order.push(id);
        }
    }

    pub fn get_task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.get(task_id)
    }

    pub fn get_task_mut(&mut self, task_id: &str) -> Option<&mut Task> {
        self.tasks.get_mut(task_id)
    }

    /// 保存済みタスク（新しい順）
    pub fn tasks(&self) -> Vec<&Task> {
        self.order
            .iter()
            .rev()
            .filter_map(|id| self.tasks.get(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
