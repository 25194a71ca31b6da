//! 编码可用性检测
//!
//! 翻译引擎内部使用旧式代码页（默认 Shift_JIS），代码页之外的字符
//! 经过引擎后会变成乱码。这里判断单个字符能否在目标代码页中往返。

use std::collections::HashMap;

use encoding_rs::{EncoderResult, Encoding, SHIFT_JIS};

use crate::translation::config::constants;
use crate::translation::error::{TranslationError, TranslationResult};

/// 单字符编码往返检测器
pub struct EncodabilityOracle {
    encoding: &'static Encoding,
    /// 编码输出的临时缓冲区，跨调用复用
    scratch: [u8; 16],
    /// 非 ASCII 字符的检测结果
    verdicts: HashMap<char, bool>,
}

impl EncodabilityOracle {
    /// 根据 WHATWG 编码标签创建检测器
    pub fn for_label(label: &str) -> TranslationResult<Self> {
        let encoding = Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| {
            TranslationError::ConfigError(format!("未知的代码页标签: {}", label))
        })?;

        // UTF-16 在 encoding_rs 中只能解码，编码时会退化成 UTF-8
        if encoding.output_encoding() != encoding {
            return Err(TranslationError::ConfigError(format!(
                "代码页 {} 不支持编码输出",
                encoding.name()
            )));
        }

        Ok(Self::new(encoding))
    }

    pub fn new(encoding: &'static Encoding) -> Self {
        Self {
            encoding,
            scratch: [0; 16],
            verdicts: HashMap::new(),
        }
    }

    pub fn shift_jis() -> Self {
        Self::new(SHIFT_JIS)
    }

    /// 目标代码页名称
    pub fn encoding_name(&self) -> &'static str {
        self.encoding.name()
    }

    /// 字符能否经目标代码页编码再解码后保持不变
    pub fn is_encodable(&mut self, c: char) -> bool {
        if c.is_ascii() && self.encoding.is_ascii_compatible() {
            return true;
        }

        if let Some(&verdict) = self.verdicts.get(&c) {
            return verdict;
        }

        let verdict = self.round_trips(c);
        self.verdicts.insert(c, verdict);
        verdict
    }

    fn round_trips(&mut self, c: char) -> bool {
        let mut utf8 = [0u8; 4];
        let source: &str = c.encode_utf8(&mut utf8);

        let mut encoder = self.encoding.new_encoder();
        let (result, _read, written) =
            encoder.encode_from_utf8_without_replacement(source, &mut self.scratch, true);

        match result {
            EncoderResult::InputEmpty => self
                .encoding
                .decode_without_bom_handling_and_without_replacement(&self.scratch[..written])
                .map_or(false, |decoded| decoded == source),
            EncoderResult::Unmappable(_) | EncoderResult::OutputFull => false,
        }
    }
}

impl Default for EncodabilityOracle {
    fn default() -> Self {
        Self::for_label(constants::DEFAULT_CODE_PAGE).unwrap_or_else(|_| Self::shift_jis())
    }
}
