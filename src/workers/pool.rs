// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use futures::FutureExt;
use metrics::{counter, histogram};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::domain::models::outcome::WorkerResult;
use crate::utils::errors::{PoolError, WorkError};

/// 工作池状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// 尚未分配工作槽
    Uninitialized,
    /// 可以接收工作
    Ready,
    /// 正在关闭，不再接收新工作
    Draining,
    /// 已关闭
    Closed,
}

/// 工作池配置
#[derive(Debug, Clone, Default)]
pub struct PoolConfig {
    /// 单个工作项的超时时间，None 表示不限制
    pub item_timeout: Option<Duration>,
}

impl PoolConfig {
    pub fn with_item_timeout(timeout: Duration) -> Self {
        Self {
            item_timeout: Some(timeout),
        }
    }
}

/// 进度事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// 本次调用中已完成的数量
    pub completed: usize,
    /// 本次调用的总数量
    pub total: usize,
    /// 最近完成的标识符
    pub last_identifier: String,
}

#[derive(Debug)]
struct PoolInner {
    state: PoolState,
    size: usize,
    gate: Option<Arc<Semaphore>>,
}

/// 有界并发工作池
///
/// `initialize(n)` 分配 n 个工作槽；`process_all` 把所有标识符一次性放入
/// 先进先出队列，由 n 个工作者并发领取，每次执行都经过容量为 n 的准入信号量。
/// 工作函数的任何失败（包括 panic 和超时）都被转换为失败结果，不会终止工作者
pub struct WorkerPool {
    config: PoolConfig,
    inner: Mutex<PoolInner>,
    shutdown: CancellationToken,
    progress: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl WorkerPool {
    /// 创建未初始化的工作池
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(PoolInner {
                state: PoolState::Uninitialized,
                size: 0,
                gate: None,
            }),
            shutdown: CancellationToken::new(),
            progress: None,
        }
    }

    /// 创建并立即初始化工作池
    pub fn with_size(size: usize, config: PoolConfig) -> Result<Self, PoolError> {
        let pool = Self::new(config);
        pool.initialize(size)?;
        Ok(pool)
    }

    /// 设置进度观察者
    ///
    /// 事件通过无界通道发送，观察者处理缓慢不会阻塞工作者
    pub fn with_progress(mut self, sender: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        self.progress = Some(sender);
        self
    }

    /// 分配工作槽，只能调用一次
    pub fn initialize(&self, size: usize) -> Result<(), PoolError> {
        if size == 0 {
            return Err(PoolError::InvalidSize(size));
        }

        let mut inner = self.inner.lock();
        match inner.state {
            PoolState::Uninitialized => {
                inner.state = PoolState::Ready;
                inner.size = size;
                inner.gate = Some(Arc::new(Semaphore::new(size)));
                debug!("Worker pool initialized with {} slots", size);
                Ok(())
            }
            PoolState::Ready | PoolState::Draining => Err(PoolError::AlreadyInitialized),
            PoolState::Closed => Err(PoolError::Closed),
        }
    }

    pub fn state(&self) -> PoolState {
        self.inner.lock().state
    }

    /// 工作槽数量，未初始化时为 0
    pub fn size(&self) -> usize {
        self.inner.lock().size
    }

    /// 关闭信号，`close` 时被取消
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// 处理所有标识符，等待全部工作者结束后返回
    ///
    /// 结果顺序与输入顺序无关
    pub async fn process_all<T, F, Fut>(
        &self,
        identifiers: &[String],
        work_fn: F,
    ) -> Result<Vec<WorkerResult<T>>, PoolError>
    where
        T: Send + 'static,
        F: Fn(String, usize) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, WorkError>> + Send + 'static,
    {
        self.process_all_with_cancel(identifiers, work_fn, CancellationToken::new())
            .await
    }

    /// 带外部取消信号的 `process_all`
    ///
    /// 取消后工作者不再领取新的标识符，正在执行的项照常完成，
    /// 返回已经完成的部分结果
    pub async fn process_all_with_cancel<T, F, Fut>(
        &self,
        identifiers: &[String],
        work_fn: F,
        cancel: CancellationToken,
    ) -> Result<Vec<WorkerResult<T>>, PoolError>
    where
        T: Send + 'static,
        F: Fn(String, usize) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, WorkError>> + Send + 'static,
    {
        let (size, gate) = {
            let inner = self.inner.lock();
            match inner.state {
                PoolState::Uninitialized => return Err(PoolError::NotInitialized),
                PoolState::Draining | PoolState::Closed => return Err(PoolError::Closed),
                PoolState::Ready => {}
            }
            let gate = inner.gate.clone().ok_or(PoolError::NotInitialized)?;
            (inner.size, gate)
        };

        let total = identifiers.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        info!("Processing {} identifiers with {} workers", total, size);
        let started = Instant::now();

        // 所有标识符预先入队，每个工作者从一开始就能看到全部工作
        let queue = Arc::new(Mutex::new(
            identifiers.iter().cloned().collect::<VecDeque<_>>(),
        ));
        let work_fn = Arc::new(work_fn);
        let completed = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut workers = JoinSet::new();
        for worker_index in 0..size {
            let queue = queue.clone();
            let work_fn = work_fn.clone();
            let gate = gate.clone();
            let tx = tx.clone();
            let completed = completed.clone();
            let progress = self.progress.clone();
            let cancel = cancel.clone();
            let shutdown = self.shutdown.clone();
            let item_timeout = self.config.item_timeout;

            workers.spawn(async move {
                loop {
                    if cancel.is_cancelled() || shutdown.is_cancelled() {
                        debug!("Worker {} stopping: cancellation requested", worker_index);
                        break;
                    }

                    let identifier = match queue.lock().pop_front() {
                        Some(identifier) => identifier,
                        None => break,
                    };

                    let outcome = run_item(
                        identifier,
                        worker_index,
                        work_fn.as_ref(),
                        &gate,
                        item_timeout,
                    )
                    .await;

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(progress) = &progress {
                        let _ = progress.send(ProgressEvent {
                            completed: done,
                            total,
                            last_identifier: outcome.identifier.clone(),
                        });
                    }

                    if tx.send(outcome).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!("Worker task terminated abnormally: {}", e);
            }
        }

        let mut outcomes = Vec::with_capacity(total);
        while let Some(outcome) = rx.recv().await {
            outcomes.push(outcome);
        }

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        info!(
            "Processed {}/{} identifiers ({} succeeded, {} failed) in {:?}",
            outcomes.len(),
            total,
            succeeded,
            outcomes.len() - succeeded,
            started.elapsed()
        );

        Ok(outcomes)
    }

    /// 关闭工作池
    ///
    /// 进入 Draining 后不再接收新工作，等待正在执行的项完成后进入 Closed
    pub async fn close(&self) {
        let (gate, size) = {
            let mut inner = self.inner.lock();
            match inner.state {
                PoolState::Closed => return,
                PoolState::Uninitialized => {
                    inner.state = PoolState::Closed;
                    return;
                }
                PoolState::Ready | PoolState::Draining => {}
            }
            inner.state = PoolState::Draining;
            (inner.gate.clone(), inner.size)
        };

        self.shutdown.cancel();

        if let Some(gate) = gate {
            // 拿到全部许可即表示没有正在执行的项
            if let Ok(permits) = gate.acquire_many(size as u32).await {
                drop(permits);
            }
            gate.close();
        }

        let mut inner = self.inner.lock();
        inner.state = PoolState::Closed;
        inner.gate = None;
        debug!("Worker pool closed");
    }
}

async fn run_item<T, F, Fut>(
    identifier: String,
    worker_index: usize,
    work_fn: &F,
    gate: &Arc<Semaphore>,
    item_timeout: Option<Duration>,
) -> WorkerResult<T>
where
    F: Fn(String, usize) -> Fut,
    Fut: Future<Output = Result<T, WorkError>>,
{
    let _permit = match gate.clone().acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            return WorkerResult::failure(identifier, WorkError::Cancelled, worker_index, Duration::ZERO)
        }
    };

    let start = Instant::now();
    let result = match std::panic::catch_unwind(AssertUnwindSafe(|| {
        work_fn(identifier.clone(), worker_index)
    })) {
        Ok(future) => {
            let guarded = AssertUnwindSafe(future).catch_unwind();
            let caught = match item_timeout {
                Some(limit) => match tokio::time::timeout(limit, guarded).await {
                    Ok(caught) => caught,
                    Err(_) => Ok(Err(WorkError::Timeout(limit))),
                },
                None => guarded.await,
            };
            caught.unwrap_or_else(|panic| Err(WorkError::Panicked(panic_message(panic.as_ref()))))
        }
        Err(panic) => Err(WorkError::Panicked(panic_message(panic.as_ref()))),
    };
    let duration = start.elapsed();

    histogram!("pool_item_duration_seconds").record(duration.as_secs_f64());
    match &result {
        Ok(_) => {
            counter!("pool_items_total", "outcome" => "success").increment(1);
            debug!("Worker {} finished {} in {:?}", worker_index, identifier, duration);
        }
        Err(e) => {
            counter!("pool_items_total", "outcome" => e.kind()).increment(1);
            debug!("Worker {} failed {}: {}", worker_index, identifier, e);
        }
    }

    WorkerResult {
        identifier,
        result,
        worker_index,
        duration,
        attempt: 1,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    fn identifiers(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://docs.example.com/page/{}", i)).collect()
    }

    #[tokio::test]
    async fn test_initialize_contract() {
        let pool = WorkerPool::default();
        assert_eq!(pool.state(), PoolState::Uninitialized);
        assert_eq!(pool.initialize(0), Err(PoolError::InvalidSize(0)));

        pool.initialize(3).unwrap();
        assert_eq!(pool.state(), PoolState::Ready);
        assert_eq!(pool.size(), 3);
        assert_eq!(pool.initialize(3), Err(PoolError::AlreadyInitialized));
    }

    #[tokio::test]
    async fn test_process_before_initialize_is_an_error() {
        let pool = WorkerPool::default();
        let result = pool
            .process_all(&identifiers(2), |_, _| async { Ok::<_, WorkError>(()) })
            .await;
        assert_eq!(result.unwrap_err(), PoolError::NotInitialized);
    }

    #[tokio::test]
    async fn test_all_succeed_with_three_workers() {
        let pool = WorkerPool::with_size(3, PoolConfig::default()).unwrap();
        let ids = identifiers(10);

        let outcomes = pool
            .process_all(&ids, |id, _| async move { Ok::<_, WorkError>(id.len()) })
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 10);
        assert!(outcomes.iter().all(|o| o.is_success()));
        assert!(outcomes.iter().all(|o| o.worker_index < 3));
        assert!(outcomes.iter().all(|o| o.attempt == 1));

        let seen: HashSet<_> = outcomes.iter().map(|o| o.identifier.clone()).collect();
        assert_eq!(seen, ids.into_iter().collect::<HashSet<_>>());
    }

    #[tokio::test]
    async fn test_each_identifier_runs_exactly_once() {
        let pool = WorkerPool::with_size(4, PoolConfig::default()).unwrap();
        let ids = identifiers(50);
        let calls: Arc<Mutex<HashMap<String, usize>>> = Arc::new(Mutex::new(HashMap::new()));

        let recorder = calls.clone();
        let outcomes = pool
            .process_all(&ids, move |id, _| {
                *recorder.lock().entry(id).or_insert(0) += 1;
                async { Ok::<_, WorkError>(()) }
            })
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 50);
        let calls = calls.lock();
        assert_eq!(calls.len(), 50);
        assert!(calls.values().all(|&c| c == 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_never_exceeds_pool_size() {
        let pool = WorkerPool::with_size(3, PoolConfig::default()).unwrap();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (a, p) = (active.clone(), peak.clone());
        let outcomes = pool
            .process_all(&identifiers(12), move |_, _| {
                let (active, peak) = (a.clone(), p.clone());
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, WorkError>(())
                }
            })
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 12);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_failures_and_panics_become_outcomes() {
        let pool = WorkerPool::with_size(2, PoolConfig::default()).unwrap();
        let ids = identifiers(6);

        let outcomes = pool
            .process_all(&ids, |id, _| async move {
                if id.ends_with("/1") {
                    panic!("selector exploded");
                }
                if id.ends_with("/2") {
                    return Err(WorkError::Extraction("HTTP 503".into()));
                }
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 6);
        let by_id: HashMap<_, _> = outcomes.iter().map(|o| (o.identifier.as_str(), o)).collect();
        assert_eq!(
            by_id["https://docs.example.com/page/1"].error(),
            Some(&WorkError::Panicked("selector exploded".into()))
        );
        assert_eq!(
            by_id["https://docs.example.com/page/2"].error(),
            Some(&WorkError::Extraction("HTTP 503".into()))
        );
        assert_eq!(outcomes.iter().filter(|o| o.is_success()).count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_item_timeout() {
        let pool = WorkerPool::with_size(2, PoolConfig::with_item_timeout(Duration::from_secs(1)))
            .unwrap();

        let outcomes = pool
            .process_all(&identifiers(2), |id, _| async move {
                if id.ends_with("/0") {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                }
                Ok::<_, WorkError>(())
            })
            .await
            .unwrap();

        let timed_out: Vec<_> = outcomes.iter().filter(|o| !o.is_success()).collect();
        assert_eq!(timed_out.len(), 1);
        assert_eq!(timed_out[0].identifier, "https://docs.example.com/page/0");
        assert_eq!(
            timed_out[0].error(),
            Some(&WorkError::Timeout(Duration::from_secs(1)))
        );
    }

    #[tokio::test]
    async fn test_cancellation_returns_partial_results() {
        let pool = WorkerPool::with_size(1, PoolConfig::default()).unwrap();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        let outcomes = pool
            .process_all_with_cancel(
                &identifiers(5),
                move |_, _| {
                    trigger.cancel();
                    async { Ok::<_, WorkError>(()) }
                },
                cancel,
            )
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_success());
    }

    #[tokio::test]
    async fn test_progress_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let pool = WorkerPool::with_size(2, PoolConfig::default())
            .unwrap()
            .with_progress(tx);

        pool.process_all(&identifiers(4), |_, _| async { Ok::<_, WorkError>(()) })
            .await
            .unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.len(), 4);
        assert!(events.iter().all(|e| e.total == 4));
        assert_eq!(events.iter().map(|e| e.completed).max(), Some(4));
    }

    #[tokio::test]
    async fn test_close_rejects_new_work() {
        let pool = WorkerPool::with_size(2, PoolConfig::default()).unwrap();
        pool.close().await;

        assert_eq!(pool.state(), PoolState::Closed);
        assert!(pool.shutdown_token().is_cancelled());
        let result = pool
            .process_all(&identifiers(1), |_, _| async { Ok::<_, WorkError>(()) })
            .await;
        assert_eq!(result.unwrap_err(), PoolError::Closed);
        assert_eq!(pool.initialize(2), Err(PoolError::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_waits_for_in_flight_items() {
        let pool = Arc::new(WorkerPool::with_size(2, PoolConfig::default()).unwrap());
        let finished = Arc::new(AtomicUsize::new(0));

        let runner = {
            let pool = pool.clone();
            let finished = finished.clone();
            tokio::spawn(async move {
                pool.process_all(&identifiers(6), move |_, _| {
                    let finished = finished.clone();
                    async move {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        finished.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, WorkError>(())
                    }
                })
                .await
            })
        };

        // 让两个工作者各自领取一个标识符
        tokio::time::sleep(Duration::from_millis(10)).await;
        pool.close().await;

        assert_eq!(pool.state(), PoolState::Closed);
        let outcomes = runner.await.unwrap().unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(finished.load(Ordering::SeqCst), 2);
    }
}
