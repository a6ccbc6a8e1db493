// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::errors::PreconditionError;
use crate::workers::progress::ProgressChannel;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// 一次运行的句柄：进度通道、停止信号和后台任务
pub struct RunHandle {
    pub audit_id: Uuid,
    pub progress: ProgressChannel,
    stop_tx: watch::Sender<bool>,
    task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl RunHandle {
    fn new(audit_id: Uuid, progress_capacity: usize) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            audit_id,
            progress: ProgressChannel::new(progress_capacity),
            stop_tx,
            task: parking_lot::Mutex::new(None),
        }
    }

    pub fn stop_signal(&self) -> watch::Receiver<bool> {
        self.stop_tx.subscribe()
    }

    pub fn request_stop(&self) {
        self.stop_tx.send_replace(true);
    }

    pub fn attach_task(&self, task: JoinHandle<()>) {
        *self.task.lock() = Some(task);
    }

    pub fn take_task(&self) -> Option<JoinHandle<()>> {
        self.task.lock().take()
    }
}

/// 进程级运行注册表：审计ID → 运行句柄
#[derive(Default)]
pub struct RunRegistry {
    runs: DashMap<Uuid, Arc<RunHandle>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 原子地登记一次运行；已有运行时拒绝
    pub fn try_register(
        &self,
        audit_id: Uuid,
        progress_capacity: usize,
    ) -> Result<Arc<RunHandle>, PreconditionError> {
        match self.runs.entry(audit_id) {
            Entry::Occupied(_) => Err(PreconditionError::AlreadyRunning),
            Entry::Vacant(vacant) => {
                let handle = Arc::new(RunHandle::new(audit_id, progress_capacity));
                vacant.insert(Arc::clone(&handle));
                Ok(handle)
            }
        }
    }

    pub fn get(&self, audit_id: Uuid) -> Option<Arc<RunHandle>> {
        self.runs.get(&audit_id).map(|entry| Arc::clone(entry.value()))
    }

    /// 只移除与给定句柄相同的登记项
    pub fn remove(&self, handle: &Arc<RunHandle>) {
        self.runs
            .remove_if(&handle.audit_id, |_, current| Arc::ptr_eq(current, handle));
    }

    pub fn is_running(&self, audit_id: Uuid) -> bool {
        self.runs.contains_key(&audit_id)
    }
}
