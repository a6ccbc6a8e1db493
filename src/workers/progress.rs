// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::progress::ProgressEvent;
use futures::Stream;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tracing::warn;

/// 单次运行的进度广播通道
///
/// 终止事件发出后通道关闭，之后发布的事件被丢弃
pub struct ProgressChannel {
    sender: broadcast::Sender<ProgressEvent>,
    closed: AtomicBool,
}

impl ProgressChannel {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            closed: AtomicBool::new(false),
        }
    }

    pub fn publish(&self, event: ProgressEvent) {
        if event.terminal {
            // 先置关闭标志再发送：此后订阅的一方看到已关闭，之前订阅的一方能收到终止事件
            if self.closed.swap(true, Ordering::SeqCst) {
                return;
            }
        } else if self.is_closed() {
            return;
        }
        // 没有订阅者时发送失败，忽略
        let _ = self.sender.send(event);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }
}

/// 进度订阅
///
/// 运行中的审计得到实时事件；否则得到一个合成的状态快照
pub enum ProgressSubscription {
    Live {
        receiver: broadcast::Receiver<ProgressEvent>,
        finished: bool,
    },
    Snapshot(Option<ProgressEvent>),
}

impl ProgressSubscription {
    pub fn live(receiver: broadcast::Receiver<ProgressEvent>) -> Self {
        Self::Live {
            receiver,
            finished: false,
        }
    }

    pub fn snapshot(event: ProgressEvent) -> Self {
        Self::Snapshot(Some(event))
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live { .. })
    }

    /// 下一个事件；终止事件之后返回 None
    pub async fn next(&mut self) -> Option<ProgressEvent> {
        match self {
            Self::Snapshot(event) => event.take(),
            Self::Live { receiver, finished } => {
                if *finished {
                    return None;
                }
                loop {
                    match receiver.recv().await {
                        Ok(event) => {
                            if event.terminal {
                                *finished = true;
                            }
                            return Some(event);
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Progress subscriber lagged behind");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            *finished = true;
                            return None;
                        }
                    }
                }
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = ProgressEvent> + Send {
        futures::stream::unfold(self, |mut subscription| async move {
            subscription.next().await.map(|event| (event, subscription))
        })
    }
}
