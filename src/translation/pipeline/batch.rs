//! 翻译批次（轮次）管理
//!
//! 工作线程每一轮从队列中按先进先出顺序取出若干请求，用换行符把文本
//! 合并成一段交给引擎，再按每个请求原文中的换行数把译文切回去。
//!
//! ## 轮次规则
//!
//! - 至少包含一个请求；队列为空时工作线程阻塞等待
//! - 之后只取“立即可得”的请求，累计字符数达到预算即停止
//! - 调用方已放弃等待的请求在这里丢弃，不进入轮次

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot};

use crate::translation::config::constants;
use crate::translation::error::{TranslationError, TranslationResult};

/// 单个翻译请求
#[derive(Debug)]
pub struct Work {
    text: String,
    chars: usize,
    reply: oneshot::Sender<TranslationResult<String>>,
}

impl Work {
    /// 创建请求以及调用方持有的等待句柄
    pub fn new(text: String) -> (Self, PendingTranslation) {
        let (reply, receiver) = oneshot::channel();
        let chars = text.chars().count();
        (
            Self { text, chars, reply },
            PendingTranslation { receiver },
        )
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// 以字符数计的长度
    pub fn char_count(&self) -> usize {
        self.chars
    }

    /// 调用方是否已经丢弃了等待句柄
    pub fn is_abandoned(&self) -> bool {
        self.reply.is_closed()
    }

    /// 交付结果，调用方已离开时静默忽略
    pub fn complete(self, result: TranslationResult<String>) {
        let _ = self.reply.send(result);
    }
}

/// 调用方等待翻译结果的句柄
///
/// 可以直接 `.await`，也可以在同步代码中用 [`PendingTranslation::wait_blocking`]。
/// 在请求进入轮次之前丢弃它，请求就不会被翻译。
#[derive(Debug)]
pub struct PendingTranslation {
    receiver: oneshot::Receiver<TranslationResult<String>>,
}

impl PendingTranslation {
    /// 阻塞当前线程直到结果就绪，不能在异步运行时的线程上调用
    pub fn wait_blocking(self) -> TranslationResult<String> {
        self.receiver
            .blocking_recv()
            .unwrap_or(Err(TranslationError::Cancelled))
    }
}

impl Future for PendingTranslation {
    type Output = TranslationResult<String>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(TranslationError::Cancelled)))
    }
}

/// 一轮合并翻译的请求集合
#[derive(Debug, Default)]
pub struct Round {
    works: Vec<Work>,
    chars: usize,
    /// 取出时发现已被放弃的请求数
    abandoned: usize,
}

impl Round {
    pub fn len(&self) -> usize {
        self.works.len()
    }

    pub fn is_empty(&self) -> bool {
        self.works.is_empty()
    }

    /// 轮次内原文的字符总数
    pub fn char_count(&self) -> usize {
        self.chars
    }

    pub fn abandoned(&self) -> usize {
        self.abandoned
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.works.iter().map(Work::text)
    }

    fn push(&mut self, work: Work) {
        if work.is_abandoned() {
            self.abandoned += 1;
            return;
        }
        self.chars += work.char_count();
        self.works.push(work);
    }

    /// 用分隔符合并本轮全部原文
    pub fn merged_text(&self) -> String {
        join_texts(self.texts())
    }

    /// 按原文顺序把切分后的译文交付给每个请求
    pub fn complete(self, merged_translation: &str) {
        let segments = split_by_newline_count(merged_translation, self.texts());
        for (work, segment) in self.works.into_iter().zip(segments) {
            work.complete(Ok(segment.to_string()));
        }
    }

    /// 本轮全部请求以同一个错误失败
    pub fn fail(self, error: &TranslationError) {
        for work in self.works {
            work.complete(Err(error.clone()));
        }
    }

    /// 以 `Cancelled` 结束本轮全部请求
    pub fn cancel(self) {
        self.fail(&TranslationError::Cancelled);
    }
}

/// 从队列中取出一轮
///
/// 阻塞直到至少有一个请求；发送端全部关闭且队列已空时返回 `None`。
/// 取到的请求全部被放弃时继续等待下一个，保证返回的轮次非空。
pub fn drain_round(receiver: &mut mpsc::UnboundedReceiver<Work>, char_budget: usize) -> Option<Round> {
    let mut round = Round::default();

    while round.is_empty() {
        round.push(receiver.blocking_recv()?);

        while round.chars < char_budget {
            match receiver.try_recv() {
                Ok(work) => round.push(work),
                Err(_) => break,
            }
        }
    }

    Some(round)
}

/// 取出队列中剩余的请求，不阻塞
pub fn drain_remaining(receiver: &mut mpsc::UnboundedReceiver<Work>) -> Round {
    let mut round = Round::default();
    while let Ok(work) = receiver.try_recv() {
        round.push(work);
    }
    round
}

/// 用换行分隔符合并文本
pub fn join_texts<'a>(texts: impl IntoIterator<Item = &'a str>) -> String {
    let mut merged = String::new();
    for (i, text) in texts.into_iter().enumerate() {
        if i > 0 {
            merged.push(constants::ROUND_SEPARATOR);
        }
        merged.push_str(text);
    }
    merged
}

/// 按原文换行数切分合并后的译文
///
/// 第 i 段原文有 `n_i` 个换行，则从当前位置跳过 `n_i` 个换行后的下一个换行
/// 就是该段的边界；换行不够时该段延伸到末尾，最后一段总是取剩余的全部内容。
/// 返回的段数总是等于原文段数。
pub fn split_by_newline_count<'m, 'a>(
    merged: &'m str,
    texts: impl IntoIterator<Item = &'a str>,
) -> Vec<&'m str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut texts = texts.into_iter().peekable();

    while let Some(text) = texts.next() {
        let end = if texts.peek().is_none() {
            merged.len()
        } else {
            let newlines = text.matches(constants::ROUND_SEPARATOR).count();
            nth_separator_from(merged, start, newlines)
        };
        segments.push(&merged[start..end]);
        start = (end + 1).min(merged.len());
    }

    segments
}

/// 从 `start` 起第 `n + 1` 个分隔符的位置，不存在时返回字符串长度
fn nth_separator_from(merged: &str, start: usize, n: usize) -> usize {
    merged[start..]
        .match_indices(constants::ROUND_SEPARATOR)
        .nth(n)
        .map_or(merged.len(), |(offset, _)| start + offset)
}
