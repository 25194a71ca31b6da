//! transbatch 命令行入口
//!
//! 把一个外部翻译命令包装成批次翻译服务：输入的每一行是一个请求，
//! 所有请求并发入队，按原顺序输出译文。

#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::io::{self, Read, Write};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
use clap::{Args, Parser, Subcommand};

#[cfg(feature = "cli")]
use transbatch::env::{self as tenv, EnvVar};
#[cfg(feature = "cli")]
use transbatch::translation::{BatchConfig, BatchTranslator, CommandTranslator, ConfigManager};

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI features disabled. Enable with --features cli");
    std::process::exit(1);
}

/// 为慢速翻译引擎合并请求的批次翻译工具
#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "transbatch")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// 用外部命令翻译输入，每行一个请求
    Translate(TranslateArgs),

    /// 生成示例配置文件
    InitConfig {
        /// 输出路径
        #[arg(default_value = "transbatch.toml")]
        path: PathBuf,
    },

    /// 打印支持的环境变量
    EnvDocs,
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct TranslateArgs {
    /// 输入文件，缺省时读取标准输入
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// 配置文件，缺省时按搜索路径查找
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 每轮合并的字符数上限
    #[arg(long)]
    budget: Option<usize>,

    /// 引擎使用的代码页
    #[arg(long)]
    code_page: Option<String>,

    /// 把整个输入作为一个请求
    #[arg(long)]
    whole: bool,

    /// 结束后把统计信息写到标准错误
    #[arg(long)]
    stats: bool,

    /// 翻译命令及其参数
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    engine: Vec<String>,
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Translate(args) => {
            let failures = run_translate(args).await?;
            if failures > 0 {
                eprintln!("{} 个请求翻译失败", failures);
                std::process::exit(2);
            }
        }
        Commands::InitConfig { path } => {
            ConfigManager::generate_example_config(&path)?;
            eprintln!("已生成示例配置文件: {}", path.display());
        }
        Commands::EnvDocs => {
            print!("{}", tenv::generate_env_docs());
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn init_logging() {
    let level = tenv::core::LogLevel::get()
        .ok()
        .and_then(|level| level.parse::<tracing::Level>().ok())
        .unwrap_or(tracing::Level::WARN);
    let no_color = tenv::core::NoColor::get().unwrap_or(false);

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(!no_color)
        .with_writer(io::stderr)
        .init();
}

#[cfg(feature = "cli")]
fn load_config(args: &TranslateArgs) -> Result<BatchConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => ConfigManager::from_file(path)?.into_config(),
        None => ConfigManager::new()?.into_config(),
    };

    if let Some(budget) = args.budget {
        config.round_char_budget = budget;
    }
    if let Some(code_page) = &args.code_page {
        config.code_page = code_page.clone();
    }

    config.validate()?;
    Ok(config)
}

/// 翻译输入并按顺序输出，返回失败的请求数
#[cfg(feature = "cli")]
async fn run_translate(args: TranslateArgs) -> Result<usize, Box<dyn std::error::Error>> {
    let config = load_config(&args)?;

    let input = match &args.input {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let (program, engine_args) = args
        .engine
        .split_first()
        .ok_or("缺少翻译命令")?;
    let engine = CommandTranslator::new(program).args(engine_args);
    let service = BatchTranslator::new(engine, config)?;

    // 只按 `\n` 切分，CRLF 输入中的 `\r` 留在各自的请求里原样返回
    let requests: Vec<&str> = if args.whole {
        vec![input.as_str()]
    } else {
        let mut lines: Vec<&str> = input.split('\n').collect();
        if lines.last() == Some(&"") {
            lines.pop();
        }
        lines
    };

    // 先全部入队，工作线程才有机会把它们合并成少量的轮次
    let pending = requests
        .iter()
        .map(|text| service.enqueue(*text))
        .collect::<Result<Vec<_>, _>>()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut failures = 0;

    for (text, handle) in requests.iter().zip(pending) {
        match handle.await {
            Ok(translated) => write!(out, "{}", translated)?,
            Err(e) => {
                tracing::error!("翻译失败: {}", e);
                failures += 1;
                write!(out, "{}", text)?;
            }
        }
        if !args.whole {
            writeln!(out)?;
        }
    }
    out.flush()?;

    service.shutdown();

    if args.stats {
        let stats = service.stats();
        eprintln!(
            "requests: {}, rounds: {}, failed rounds: {}, chars: {}, engine time: {:?}, avg round size: {:.1}",
            stats.requests_enqueued,
            stats.rounds_processed,
            stats.rounds_failed,
            stats.chars_translated,
            stats.engine_time,
            stats.average_round_size()
        );
    }

    Ok(failures)
}
