//! 外部命令翻译引擎
//!
//! 每次调用启动一个子进程，原文写入标准输入，标准输出作为译文。
//! 进程以非零状态退出时视为翻译失败。

use std::ffi::OsString;
use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;

use crate::translation::core::engine::Translator;
use crate::translation::error::{helpers, TranslationResult};

/// 通过外部命令翻译文本
#[derive(Debug, Clone)]
pub struct CommandTranslator {
    program: OsString,
    args: Vec<OsString>,
}

impl CommandTranslator {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl Translator for CommandTranslator {
    fn translate(&mut self, text: &str) -> TranslationResult<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                helpers::engine_error(format!("无法启动翻译命令 {:?}: {}", self.program, e))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| helpers::internal_error("翻译命令的标准输入不可用"))?;

        // 单独的线程写入，避免输出缓冲区填满时双方互相等待
        let input = text.to_owned();
        let writer = thread::spawn(move || stdin.write_all(input.as_bytes()));

        let output = child
            .wait_with_output()
            .map_err(|e| helpers::engine_error(format!("等待翻译命令失败: {}", e)))?;

        match writer.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => {
                return Err(helpers::engine_error(format!("写入翻译命令失败: {}", e)));
            }
            Err(_) => return Err(helpers::internal_error("写入线程异常退出")),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(helpers::engine_error(format!(
                "翻译命令退出状态 {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let mut translated = String::from_utf8(output.stdout)
            .map_err(|e| helpers::engine_error(format!("翻译命令输出不是有效的 UTF-8: {}", e)))?;

        // 许多命令会在末尾补一个换行
        if translated.ends_with('\n') && !text.ends_with('\n') {
            translated.pop();
        }

        tracing::trace!("翻译命令返回 {} 字节", translated.len());
        Ok(translated)
    }
}
