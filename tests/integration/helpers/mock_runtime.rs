// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use docrawl::domain::models::WorkerStatus;
use docrawl::fleet::{ContainerHandle, ContainerRuntime, ContainerSpec, RuntimeError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 容器运行时替身，记录创建和删除顺序
#[derive(Default)]
pub struct MockRuntime {
    next_id: AtomicUsize,
    containers: Mutex<HashMap<String, WorkerStatus>>,
    pub created: Mutex<Vec<ContainerSpec>>,
    pub removed: Mutex<Vec<String>>,
}

impl MockRuntime {
    /// 模拟容器在管理器之外消失
    pub fn vanish(&self, id: &str) {
        self.containers.lock().remove(id);
    }

    pub fn live_count(&self) -> usize {
        self.containers.lock().len()
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn create(&self, spec: &ContainerSpec) -> Result<ContainerHandle, RuntimeError> {
        let id = format!("container-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.containers
            .lock()
            .insert(id.clone(), WorkerStatus::Running);
        self.created.lock().push(spec.clone());
        Ok(ContainerHandle {
            id,
            name: spec.name.clone(),
        })
    }

    async fn stop(&self, handle: &ContainerHandle) -> Result<(), RuntimeError> {
        if let Some(status) = self.containers.lock().get_mut(&handle.id) {
            *status = WorkerStatus::Stopped;
        }
        Ok(())
    }

    async fn remove(&self, handle: &ContainerHandle) -> Result<(), RuntimeError> {
        self.containers.lock().remove(&handle.id);
        self.removed.lock().push(handle.name.clone());
        Ok(())
    }

    async fn status(&self, handle: &ContainerHandle) -> WorkerStatus {
        self.containers
            .lock()
            .get(&handle.id)
            .copied()
            .unwrap_or(WorkerStatus::NotFound)
    }
}
