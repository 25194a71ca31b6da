//! 翻译引擎输入输出的转义处理
//!
//! 引擎会裁剪首尾空白、改变重复符号的个数、把代码页之外的字符变成乱码。
//! 转义时把这些易损内容从文本中抠出来放进侧边表（[`Sidecar`]），
//! 原位置留下引擎不会改动的短标记；引擎翻译之后再按顺序把原内容填回去。
//!
//! 不能简单地做文本到文本的替换：行尾空白换成别的非空白字符会影响翻译结果，
//! 所以每段空白都整段保留并以标记代替。
//!
//! 批次调度依赖这里的一条不变式：原文中的每个换行符在
//! 转义、翻译、还原之后都原样存在。

use regex::Regex;

use crate::translation::config::constants;
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::pipeline::encoding::EncodabilityOracle;

/// 单次转义产生的保留片段，按压入顺序排列
///
/// 只能被与之配对的那一次 [`EscapeCodec::unescape`] 消费。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sidecar {
    fragments: Vec<String>,
}

impl Sidecar {
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    fn push(&mut self, fragment: String) {
        self.fragments.push(fragment);
    }
}

impl IntoIterator for Sidecar {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.fragments.into_iter()
    }
}

/// 转义结果：交给引擎的安全文本和对应的侧边表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Escaped {
    pub text: String,
    pub sidecar: Sidecar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunKind {
    None,
    Symbol,
    Space,
}

impl RunKind {
    fn of(c: char) -> RunKind {
        if constants::MUTABLE_SYMBOLS.contains(&c) {
            RunKind::Symbol
        } else if c.is_whitespace() {
            RunKind::Space
        } else {
            RunKind::None
        }
    }
}

/// 转义输出缓冲
struct EscapeWriter {
    text: String,
    sidecar: Sidecar,
}

impl EscapeWriter {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            text: String::with_capacity(capacity),
            sidecar: Sidecar::default(),
        }
    }

    /// 写入转义标记并保留原片段
    fn preserve(&mut self, token: &str, fragment: String) {
        self.text.push_str(token);
        self.sidecar.push(fragment);
    }

    fn finish(self) -> Escaped {
        Escaped {
            text: self.text,
            sidecar: self.sidecar,
        }
    }
}

/// 扫描过程中累积的空白串或符号串，生命周期仅限一次 `escape` 调用
struct RunState {
    kind: RunKind,
    run: String,
}

impl RunState {
    fn new() -> Self {
        Self {
            kind: RunKind::None,
            run: String::new(),
        }
    }

    fn feed(&mut self, kind: RunKind, c: char, out: &mut EscapeWriter) {
        if self.kind != kind {
            self.flush(out);
            self.kind = kind;
        }
        self.run.push(c);
    }

    fn flush(&mut self, out: &mut EscapeWriter) {
        self.kind = RunKind::None;
        if self.run.is_empty() {
            return;
        }

        let run = std::mem::take(&mut self.run);
        if run.contains('\n') {
            // 标记本身只含一个换行，合并后的行数仍然可以按原文计数
            out.preserve(constants::NEWLINE_ESCAPE, run);
        } else if run.chars().count() == 1 {
            out.text.push_str(&run);
        } else {
            out.preserve(constants::ESCAPE_MARKER, run);
        }
    }
}

/// 转义编解码器
///
/// 持有代码页检测器和还原用的分词正则，可以反复使用；
/// 每次转义的状态都在 [`Escaped`] 里随值传递，不在编解码器内部共享。
pub struct EscapeCodec {
    oracle: EncodabilityOracle,
    tokens: Regex,
}

impl EscapeCodec {
    pub fn new(oracle: EncodabilityOracle) -> TranslationResult<Self> {
        // 优先级: 换行标记、普通标记、单独的 \r 或 [、其他连续文本
        let pattern = format!(
            r"({})|({})|[\r{}]|[^\r{}]+",
            regex::escape(constants::NEWLINE_ESCAPE),
            regex::escape(constants::ESCAPE_MARKER),
            regex::escape(&constants::MARKER_LEAD.to_string()),
            regex::escape(&constants::MARKER_LEAD.to_string()),
        );

        Ok(Self {
            oracle,
            tokens: Regex::new(&pattern)?,
        })
    }

    /// 使用指定代码页标签创建编解码器
    pub fn for_code_page(label: &str) -> TranslationResult<Self> {
        Self::new(EncodabilityOracle::for_label(label)?)
    }

    pub fn code_page(&self) -> &'static str {
        self.oracle.encoding_name()
    }

    /// 把文本转成引擎可以安全处理的形式
    pub fn escape(&mut self, text: &str) -> Escaped {
        let mut out = EscapeWriter::with_capacity(text.len() * 3 / 2);
        let mut run = RunState::new();

        for c in text.chars() {
            match RunKind::of(c) {
                RunKind::None => {
                    run.flush(&mut out);
                    if self.is_unsafe_char(c) {
                        out.preserve(constants::ESCAPE_MARKER, c.to_string());
                    } else {
                        out.text.push(c);
                    }
                }
                kind => run.feed(kind, c, &mut out),
            }
        }
        run.flush(&mut out);

        out.finish()
    }

    /// 用侧边表还原引擎输出
    ///
    /// 标记数和片段数必须完全一致，否则说明引擎改动了标记，返回
    /// [`TranslationError::CodecConsistency`] 而不是猜测着填充。
    pub fn unescape(&self, translated: &str, sidecar: Sidecar) -> TranslationResult<String> {
        let preserved = sidecar.len();
        let mut fragments = sidecar.into_iter();
        let mut markers = 0;
        let mut restored = String::with_capacity(translated.len() + translated.len() / 2);

        for caps in self.tokens.captures_iter(translated) {
            if caps.get(1).is_some() || caps.get(2).is_some() {
                markers += 1;
                if let Some(fragment) = fragments.next() {
                    restored.push_str(&fragment);
                }
            } else {
                restored.push_str(&caps[0]);
            }
        }

        if markers != preserved {
            return Err(TranslationError::CodecConsistency { markers, preserved });
        }

        Ok(restored)
    }

    /// 单个字符是否可能被引擎篡改
    fn is_unsafe_char(&mut self, c: char) -> bool {
        c == constants::MARKER_LEAD
            || constants::UNSAFE_CHARS.contains(&c)
            || !self.oracle.is_encodable(c)
    }
}

impl std::fmt::Debug for EscapeCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscapeCodec")
            .field("code_page", &self.code_page())
            .finish()
    }
}
