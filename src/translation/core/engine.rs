//! 翻译引擎抽象与转义封装
//!
//! 外部引擎很慢、只能单线程调用，并且会损坏空白、重复符号和代码页之外的字符。
//! 本模块定义引擎接口 [`Translator`]，并提供 [`EscapedTranslator`]：
//! 每次调用都在引擎前后做一次配对的转义与还原。
//!
//! ## 工作流程
//! 1. 转义原文，得到安全文本和侧边表
//! 2. 调用引擎翻译安全文本
//! 3. 用侧边表还原引擎输出
//!
//! ## 使用示例
//! ```rust
//! use transbatch::translation::core::{EscapedTranslator, Translator};
//! use transbatch::translation::TranslationResult;
//!
//! let identity = |text: &str| -> TranslationResult<String> { Ok(text.to_string()) };
//! let mut translator = EscapedTranslator::with_default_code_page(identity).unwrap();
//! assert_eq!(translator.translate("  --##\n\n").unwrap(), "  --##\n\n");
//! ```

use std::time::Instant;

use crate::translation::error::TranslationResult;
use crate::translation::pipeline::escape::EscapeCodec;
use crate::translation::config::constants;

/// 外部翻译引擎接口
///
/// `&mut self` 表示同一时刻只能有一个调用者；实现只需要 `Send`，
/// 由批次调度器的工作线程独占。
pub trait Translator: Send {
    /// 翻译一段文本，失败时返回 [`TranslationError::TranslationFailure`]
    ///
    /// [`TranslationError::TranslationFailure`]: crate::translation::TranslationError::TranslationFailure
    fn translate(&mut self, text: &str) -> TranslationResult<String>;
}

impl<F> Translator for F
where
    F: FnMut(&str) -> TranslationResult<String> + Send,
{
    fn translate(&mut self, text: &str) -> TranslationResult<String> {
        self(text)
    }
}

/// 在引擎调用前后做转义与还原的翻译器
///
/// 转义状态只存在于单次 `translate` 调用中，不会在调用之间泄漏。
pub struct EscapedTranslator<T> {
    inner: T,
    codec: EscapeCodec,
}

impl<T: Translator> EscapedTranslator<T> {
    pub fn new(inner: T, codec: EscapeCodec) -> Self {
        Self { inner, codec }
    }

    /// 使用指定代码页创建
    pub fn with_code_page(inner: T, code_page: &str) -> TranslationResult<Self> {
        Ok(Self::new(inner, EscapeCodec::for_code_page(code_page)?))
    }

    pub fn with_default_code_page(inner: T) -> TranslationResult<Self> {
        Self::with_code_page(inner, constants::DEFAULT_CODE_PAGE)
    }
}

impl<T: Translator> Translator for EscapedTranslator<T> {
    fn translate(&mut self, text: &str) -> TranslationResult<String> {
        let start_time = Instant::now();
        let escaped = self.codec.escape(text);

        tracing::trace!(
            "转义完成: {} 个保留片段, {} -> {} 字节",
            escaped.sidecar.len(),
            text.len(),
            escaped.text.len()
        );

        let translated = self.inner.translate(&escaped.text)?;
        let restored = self.codec.unescape(&translated, escaped.sidecar)?;

        tracing::trace!("引擎调用耗时: {:?}", start_time.elapsed());
        Ok(restored)
    }
}

impl<T> std::fmt::Debug for EscapedTranslator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscapedTranslator")
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::error::{helpers, TranslationError};

    /// 模拟引擎的有损行为：裁剪首尾空格、把连续的 `#` 压成一个、把 `-` 改成 `―`
    ///
    /// 不裁剪 `\r\n`：转义后的换行只以这个标记出现，转义的前提就是引擎保留它。
    fn lossy(text: &str) -> TranslationResult<String> {
        let mut out = String::new();
        for c in text.trim_matches([' ', '\t', '　']).chars() {
            if c == '#' && out.ends_with('#') {
                continue;
            }
            out.push(if c == '-' { '―' } else { c });
        }
        Ok(out)
    }

    #[test]
    fn test_lossy_engine_is_shielded() {
        let mut translator = EscapedTranslator::with_default_code_page(lossy).unwrap();

        for text in ["\r", "\n\nd", "-----", "#####", "--##――@@--", "  a - b  ", "\n\n\n 　\n\n"] {
            assert_eq!(translator.translate(text).unwrap(), text);
        }
    }

    #[test]
    fn test_engine_receives_escaped_text() {
        let mut seen = Vec::new();
        {
            let recorder = |text: &str| -> TranslationResult<String> {
                seen.push(text.to_string());
                Ok(text.to_string())
            };
            let mut translator = EscapedTranslator::with_default_code_page(recorder).unwrap();
            translator.translate("a\n\nb  @").unwrap();
        }

        assert_eq!(seen, ["a\r\nb[;:}[;:}"]);
    }

    #[test]
    fn test_engine_failure_propagates() {
        let failing = |_: &str| -> TranslationResult<String> { Err(helpers::engine_error("offline")) };
        let mut translator = EscapedTranslator::with_default_code_page(failing).unwrap();

        assert_eq!(
            translator.translate("text"),
            Err(TranslationError::TranslationFailure("offline".to_string()))
        );
    }

    #[test]
    fn test_marker_loss_is_reported() {
        let eats_markers = |text: &str| -> TranslationResult<String> { Ok(text.replace("[;:}", "")) };
        let mut translator = EscapedTranslator::with_default_code_page(eats_markers).unwrap();

        let error = translator.translate("a  b").unwrap_err();
        assert!(matches!(error, TranslationError::CodecConsistency { markers: 0, preserved: 1 }));
    }

    #[test]
    fn test_prose_is_translated_around_markers() {
        let upper = |text: &str| -> TranslationResult<String> { Ok(text.to_uppercase()) };
        let mut translator = EscapedTranslator::with_default_code_page(upper).unwrap();
        assert_eq!(translator.translate("ab  cd").unwrap(), "AB  CD");
    }
}
