//! 批次翻译服务
//!
//! 把大量并发的翻译请求合并成少量的引擎调用。引擎每次调用都有固定开销，
//! 而且只能单线程使用，所以由唯一的工作线程独占引擎，按轮次处理队列。
//!
//! ## 设计理念
//!
//! 1. **单一消费者**: 只有工作线程调用引擎，满足引擎不可重入的要求
//! 2. **先进先出**: 同一轮内按入队顺序合并、按同样顺序切分和交付
//! 3. **按轮失败**: 一轮失败只影响该轮的请求，工作线程继续服务下一轮
//! 4. **显式结束**: 关闭时尚未进入轮次的请求以 `Cancelled` 失败，不会被静默丢弃
//!
//! ## 使用示例
//!
//! ```rust
//! use transbatch::translation::{BatchConfig, BatchTranslator, TranslationResult};
//!
//! # async fn example() -> TranslationResult<()> {
//! let engine = |text: &str| -> TranslationResult<String> { Ok(text.to_uppercase()) };
//! let service = BatchTranslator::new(engine, BatchConfig::default())?;
//!
//! let (a, b) = tokio::join!(service.translate("first"), service.translate("second\nline"));
//! assert_eq!(a?, "FIRST");
//! assert_eq!(b?, "SECOND\nLINE");
//!
//! service.shutdown();
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::translation::config::{BatchConfig, ConfigManager};
use crate::translation::core::engine::{EscapedTranslator, Translator};
use crate::translation::error::{helpers, TranslationError, TranslationResult};
use crate::translation::pipeline::batch::{self, PendingTranslation, Round, Work};

/// 批次翻译服务
///
/// 可以放进 `Arc` 在多个任务或线程之间共享。
pub struct BatchTranslator {
    /// 请求队列的发送端，关闭后为 `None`
    sender: RwLock<Option<mpsc::UnboundedSender<Work>>>,
    shared: Arc<WorkerShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    config: BatchConfig,
}

/// 服务与工作线程共享的状态
#[derive(Debug, Default)]
struct WorkerShared {
    stopping: AtomicBool,
    last_round_failed: AtomicBool,
    stats: ServiceStats,
}

impl BatchTranslator {
    /// 创建服务并启动工作线程
    ///
    /// 引擎会被包上一层转义处理，之后只在工作线程上调用。
    pub fn new<T>(translator: T, config: BatchConfig) -> TranslationResult<Self>
    where
        T: Translator + 'static,
    {
        config.validate()?;
        let engine = EscapedTranslator::with_code_page(translator, &config.code_page)?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let shared = Arc::new(WorkerShared::default());

        let worker_shared = Arc::clone(&shared);
        let budget = config.round_char_budget;
        let handle = thread::Builder::new()
            .name(config.worker_thread_name.clone())
            .spawn(move || run_worker(engine, receiver, worker_shared, budget))
            .map_err(|e| helpers::internal_error(format!("无法启动工作线程: {}", e)))?;

        tracing::info!(
            "批次翻译服务已启动: 代码页 {}, 每轮 {} 字符",
            config.code_page,
            config.round_char_budget
        );

        Ok(Self {
            sender: RwLock::new(Some(sender)),
            shared,
            worker: Mutex::new(Some(handle)),
            config,
        })
    }

    /// 使用默认配置创建
    pub fn with_defaults<T>(translator: T) -> TranslationResult<Self>
    where
        T: Translator + 'static,
    {
        Self::new(translator, BatchConfig::default())
    }

    /// 使用配置文件与环境变量创建
    pub fn from_env<T>(translator: T) -> TranslationResult<Self>
    where
        T: Translator + 'static,
    {
        Self::new(translator, ConfigManager::new()?.into_config())
    }

    /// 提交一个请求，返回等待结果的句柄
    ///
    /// 不会因队列容量阻塞。服务关闭后返回 [`TranslationError::Cancelled`]。
    pub fn enqueue(&self, text: impl Into<String>) -> TranslationResult<PendingTranslation> {
        let guard = self
            .sender
            .read()
            .map_err(|_| helpers::internal_error("请求队列锁已损坏"))?;
        let sender = guard.as_ref().ok_or(TranslationError::Cancelled)?;

        let (work, pending) = Work::new(text.into());
        sender.send(work).map_err(|_| TranslationError::Cancelled)?;

        self.shared.stats.inc_requests_enqueued();
        Ok(pending)
    }

    /// 翻译一段文本
    pub async fn translate(&self, text: impl Into<String>) -> TranslationResult<String> {
        self.enqueue(text)?.await
    }

    /// 同步翻译一段文本，不能在异步运行时的线程上调用
    pub fn translate_blocking(&self, text: impl Into<String>) -> TranslationResult<String> {
        self.enqueue(text)?.wait_blocking()
    }

    /// 关闭服务并等待工作线程退出
    ///
    /// 正在处理的一轮会正常完成，尚未进入轮次的请求以 `Cancelled` 失败。
    /// 可以重复调用。
    pub fn shutdown(&self) {
        self.signal_stop();

        let handle = match self.worker.lock() {
            Ok(mut worker) => worker.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                tracing::error!("工作线程异常退出");
            }
            tracing::info!("批次翻译服务已关闭");
        }
    }

    fn signal_stop(&self) {
        if self.shared.stopping.swap(true, Ordering::AcqRel) {
            return;
        }

        // 丢弃唯一的发送端，阻塞中的工作线程随之醒来
        match self.sender.write() {
            Ok(mut sender) => drop(sender.take()),
            Err(poisoned) => drop(poisoned.into_inner().take()),
        }
    }

    /// 服务是否仍在接受请求
    pub fn is_running(&self) -> bool {
        !self.shared.stopping.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// 获取统计快照
    pub fn stats(&self) -> ServiceStatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// 获取健康状态
    pub fn health(&self) -> HealthStatus {
        let mut components = HashMap::new();

        let worker = if self.is_running() {
            HealthLevel::Healthy
        } else {
            HealthLevel::Unhealthy
        };
        components.insert("worker".to_string(), worker);

        let engine = if self.shared.last_round_failed.load(Ordering::Acquire) {
            HealthLevel::Degraded
        } else {
            HealthLevel::Healthy
        };
        components.insert("engine".to_string(), engine);

        let overall = if worker == HealthLevel::Unhealthy {
            HealthLevel::Unhealthy
        } else {
            engine
        };

        HealthStatus { overall, components }
    }
}

/// 批次翻译服务本身也可以作为引擎使用，调用会阻塞到本轮结束
///
/// 不能在异步运行时的线程上调用，也不能在同一个服务的工作线程里调用。
impl Translator for BatchTranslator {
    fn translate(&mut self, text: &str) -> TranslationResult<String> {
        self.translate_blocking(text)
    }
}

/// 共享引用版本，多个持有者可以同时提交请求
impl Translator for &BatchTranslator {
    fn translate(&mut self, text: &str) -> TranslationResult<String> {
        self.translate_blocking(text)
    }
}

impl Drop for BatchTranslator {
    fn drop(&mut self) {
        // 只发出信号，不在析构中等待正在进行的引擎调用
        self.signal_stop();
    }
}

impl std::fmt::Debug for BatchTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchTranslator")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// 工作线程主循环
fn run_worker<T: Translator>(
    mut engine: EscapedTranslator<T>,
    mut receiver: mpsc::UnboundedReceiver<Work>,
    shared: Arc<WorkerShared>,
    char_budget: usize,
) {
    tracing::debug!("工作线程启动");

    while let Some(round) = batch::drain_round(&mut receiver, char_budget) {
        shared.stats.add_requests_cancelled(round.abandoned());

        if shared.stopping.load(Ordering::Acquire) {
            shared.stats.add_requests_cancelled(round.len());
            round.cancel();
            break;
        }

        process_round(&mut engine, round, &shared);
    }

    receiver.close();
    let remaining = batch::drain_remaining(&mut receiver);
    shared
        .stats
        .add_requests_cancelled(remaining.len() + remaining.abandoned());
    if !remaining.is_empty() {
        tracing::info!("服务关闭，取消 {} 个未处理的请求", remaining.len());
    }
    remaining.cancel();

    tracing::debug!("工作线程退出");
}

/// 翻译一轮并交付结果
fn process_round<T: Translator>(engine: &mut EscapedTranslator<T>, round: Round, shared: &WorkerShared) {
    let round_id = shared.stats.inc_rounds_processed();
    let requests = round.len();
    let chars = round.char_count();
    let merged = round.merged_text();

    tracing::debug!("第 {} 轮: 合并 {} 个请求, 共 {} 字符", round_id, requests, chars);

    let start_time = Instant::now();
    let result = translate_guarded(engine, &merged);
    let elapsed = start_time.elapsed();
    shared.stats.add_engine_time(elapsed);

    match result {
        Ok(translated) => {
            round.complete(&translated);
            shared.stats.add_requests_completed(requests);
            shared.stats.add_chars_translated(chars);
            shared.last_round_failed.store(false, Ordering::Release);
            tracing::debug!("第 {} 轮完成，耗时 {:?}", round_id, elapsed);
        }
        Err(error) => {
            helpers::log(&error.clone().with_context(format!("第 {} 轮, {} 个请求", round_id, requests)));
            round.fail(&error);
            shared.stats.inc_rounds_failed();
            shared.stats.add_requests_failed(requests);
            shared.last_round_failed.store(true, Ordering::Release);
        }
    }
}

/// 调用引擎，把 panic 转换为本轮失败
fn translate_guarded<T: Translator>(engine: &mut EscapedTranslator<T>, text: &str) -> TranslationResult<String> {
    match panic::catch_unwind(AssertUnwindSafe(|| engine.translate(text))) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "未知 panic".to_string());
            Err(helpers::engine_error(format!("引擎调用 panic: {}", message)))
        }
    }
}

/// 服务运行统计
///
/// 全部使用原子计数器，工作线程写入、任意线程读取。
#[derive(Debug, Default)]
pub struct ServiceStats {
    /// 入队的请求数
    pub requests_enqueued: AtomicUsize,
    /// 成功交付的请求数
    pub requests_completed: AtomicUsize,
    /// 因引擎或转义错误失败的请求数
    pub requests_failed: AtomicUsize,
    /// 被取消或被调用方放弃的请求数
    pub requests_cancelled: AtomicUsize,
    /// 调用引擎的轮次数
    pub rounds_processed: AtomicUsize,
    /// 失败的轮次数
    pub rounds_failed: AtomicUsize,
    /// 成功翻译的原文字符数
    pub chars_translated: AtomicUsize,
    /// 引擎调用总耗时，以微秒为单位存储
    pub engine_time: AtomicU64,
}

impl ServiceStats {
    pub fn inc_requests_enqueued(&self) {
        self.requests_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_requests_completed(&self, count: usize) {
        self.requests_completed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_requests_failed(&self, count: usize) {
        self.requests_failed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_requests_cancelled(&self, count: usize) {
        self.requests_cancelled.fetch_add(count, Ordering::Relaxed);
    }

    /// 增加轮次计数，返回本轮序号（从 1 开始）
    pub fn inc_rounds_processed(&self) -> usize {
        self.rounds_processed.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn inc_rounds_failed(&self) {
        self.rounds_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_chars_translated(&self, count: usize) {
        self.chars_translated.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_engine_time(&self, duration: Duration) {
        self.engine_time
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    /// 获取统计数据快照
    pub fn snapshot(&self) -> ServiceStatsSnapshot {
        ServiceStatsSnapshot {
            requests_enqueued: self.requests_enqueued.load(Ordering::Relaxed),
            requests_completed: self.requests_completed.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            requests_cancelled: self.requests_cancelled.load(Ordering::Relaxed),
            rounds_processed: self.rounds_processed.load(Ordering::Relaxed),
            rounds_failed: self.rounds_failed.load(Ordering::Relaxed),
            chars_translated: self.chars_translated.load(Ordering::Relaxed),
            engine_time: Duration::from_micros(self.engine_time.load(Ordering::Relaxed)),
        }
    }
}

/// 统计数据的不可变快照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceStatsSnapshot {
    pub requests_enqueued: usize,
    pub requests_completed: usize,
    pub requests_failed: usize,
    pub requests_cancelled: usize,
    pub rounds_processed: usize,
    pub rounds_failed: usize,
    pub chars_translated: usize,
    pub engine_time: Duration,
}

impl ServiceStatsSnapshot {
    /// 平均每轮合并的请求数，衡量批次合并的效果
    pub fn average_round_size(&self) -> f64 {
        if self.rounds_processed == 0 {
            0.0
        } else {
            (self.requests_completed + self.requests_failed) as f64 / self.rounds_processed as f64
        }
    }
}

/// 服务健康状态报告
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// 整体健康级别
    pub overall: HealthLevel,

    /// 各组件的健康状态，键为 "worker" 和 "engine"
    pub components: HashMap<String, HealthLevel>,
}

/// 健康状态级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthLevel {
    /// 组件运行正常
    Healthy,

    /// 最近一轮引擎调用失败，服务仍在运行
    Degraded,

    /// 服务已关闭
    Unhealthy,
}
