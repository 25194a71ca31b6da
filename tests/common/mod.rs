// 集成测试公共模块
//
// 提供模拟翻译引擎和测试辅助工具

#![allow(dead_code)]

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use transbatch::translation::error::helpers;
use transbatch::translation::{constants, BatchConfig, BatchTranslator, TranslationResult, Translator};

/// 引擎收到的每次调用的原始输入
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn record(&self, text: &str) {
        self.0.lock().unwrap().push(text.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

/// 一次性打开的闸门，用来让引擎停在某次调用里
#[derive(Debug, Default)]
pub struct Gate {
    open: Mutex<bool>,
    cond: Condvar,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.cond.notify_all();
    }

    pub fn wait(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.cond.wait(open).unwrap();
        }
    }
}

/// 模拟引擎的行为
#[derive(Debug, Clone)]
pub enum Behavior {
    /// 原样返回
    Identity,
    /// 转成大写
    Uppercase,
    /// 像真实引擎一样裁剪行首尾空白、合并重复符号，并转成大写
    Lossy,
    /// 输入包含指定内容时失败
    FailOn(String),
    /// 丢掉第一个转义标记
    DropMarker,
}

/// 模拟翻译引擎
pub struct MockEngine {
    behavior: Behavior,
    log: CallLog,
    gate: Option<Arc<Gate>>,
}

impl MockEngine {
    pub fn new(behavior: Behavior) -> (Self, CallLog) {
        let log = CallLog::default();
        let engine = Self {
            behavior,
            log: log.clone(),
            gate: None,
        };
        (engine, log)
    }

    pub fn with_gate(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }
}

impl Translator for MockEngine {
    fn translate(&mut self, text: &str) -> TranslationResult<String> {
        self.log.record(text);
        if let Some(gate) = &self.gate {
            gate.wait();
        }

        match &self.behavior {
            Behavior::Identity => Ok(text.to_string()),
            Behavior::Uppercase => Ok(text.to_uppercase()),
            Behavior::Lossy => Ok(lossy_translate(text)),
            Behavior::FailOn(trigger) if text.contains(trigger.as_str()) => {
                Err(helpers::engine_error(format!("引擎无法处理: {}", trigger)))
            }
            Behavior::FailOn(_) => Ok(text.to_uppercase()),
            Behavior::DropMarker => Ok(text.replacen(constants::ESCAPE_MARKER, "", 1)),
        }
    }
}

/// 模拟真实引擎对空白和符号的破坏
///
/// 真实引擎会裁剪整段输入首尾的所有空白。这里只裁剪空格、制表符和全角空格：
/// 转义后的文本里换行只以 `\r\n` 标记出现，而转义依赖引擎保留这个标记，
/// 会吞掉它的引擎不在可支持的范围内。
pub fn lossy_translate(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }

        let mut prev = None;
        for c in line.trim_matches([' ', '\t', '\u{3000}']).chars() {
            if matches!(c, ' ' | '#' | '─' | '―') && prev == Some(c) {
                continue;
            }
            prev = Some(c);
            if c == '-' {
                out.push('―');
            } else {
                out.extend(c.to_uppercase());
            }
        }
    }

    out
}

/// 测试环境
pub struct TestEnvironment {
    pub service: Arc<BatchTranslator>,
    pub log: CallLog,
}

impl TestEnvironment {
    pub fn new(behavior: Behavior) -> Self {
        Self::with_config(behavior, BatchConfig::default())
    }

    pub fn with_config(behavior: Behavior, config: BatchConfig) -> Self {
        let (engine, log) = MockEngine::new(behavior);
        let service = BatchTranslator::new(engine, config).expect("service should start");
        Self {
            service: Arc::new(service),
            log,
        }
    }

    /// 引擎停在第一次调用里，直到闸门打开
    pub fn gated(behavior: Behavior) -> (Self, Arc<Gate>) {
        Self::gated_with_config(behavior, BatchConfig::default())
    }

    pub fn gated_with_config(behavior: Behavior, config: BatchConfig) -> (Self, Arc<Gate>) {
        let gate = Gate::new();
        let (engine, log) = MockEngine::new(behavior);
        let service = BatchTranslator::new(engine.with_gate(Arc::clone(&gate)), config)
            .expect("service should start");
        let env = Self {
            service: Arc::new(service),
            log,
        };
        (env, gate)
    }
}

/// 测试数据生成器
pub struct TestDataGenerator;

impl TestDataGenerator {
    /// 生成互不相同的多行文本
    pub fn numbered_texts(count: usize) -> Vec<String> {
        (0..count)
            .map(|i| match i % 3 {
                0 => format!("line {}", i),
                1 => format!("first {}\nsecond {}", i, i),
                _ => format!("para {}\n\n  indented {}", i, i),
            })
            .collect()
    }
}

/// 性能测试辅助工具
pub struct PerformanceHelper;

impl PerformanceHelper {
    /// 轮询直到条件成立，超时则失败
    pub async fn wait_until<F: Fn() -> bool>(condition: F, description: &str) {
        let start = Instant::now();
        while !condition() {
            assert!(
                start.elapsed() < Duration::from_secs(10),
                "timed out waiting for: {}",
                description
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}
