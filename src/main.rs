use clap::{Parser, Subcommand};
use mirrortools_lib::commands::{inspect, log, mirror};
use mirrortools_lib::logging::{get_log_dir, LogConfig, SizeRotatingWriter};
use mirrortools_lib::AppState;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mirrortools", version, about = "镜像目录树并清理上次运行遗留的文件")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 把源目录镜像到目标目录
    Mirror {
        source: PathBuf,
        destination: PathBuf,
        /// 清单文件名
        #[arg(long)]
        manifest: Option<String>,
        /// 额外的排除规则（glob），可重复
        #[arg(long = "exclude")]
        excludes: Vec<String>,
        /// 同时镜像隐藏文件和目录
        #[arg(long)]
        include_hidden: bool,
        /// 以 JSON 输出报告
        #[arg(long)]
        json: bool,
    },
    /// 在 glob 匹配的文件中搜索正则，找到时退出码为 0
    Grep { pattern: String, glob: String },
    /// 列出清单文件中的记录
    Manifest { file: PathBuf },
    /// 计算目录树摘要
    Digest {
        dir: PathBuf,
        #[arg(long)]
        manifest: Option<String>,
    },
    /// 查看或修改镜像配置
    MirrorConfig {
        #[arg(long)]
        manifest: Option<String>,
        /// 替换排除规则，可重复
        #[arg(long = "exclude")]
        excludes: Vec<String>,
        #[arg(long)]
        include_hidden: Option<bool>,
        #[arg(long)]
        large_file_threshold: Option<u64>,
    },
    /// 查看或修改日志配置
    LogConfig {
        #[arg(long)]
        enabled: Option<bool>,
        #[arg(long)]
        max_size_mb: Option<u32>,
        #[arg(long)]
        level: Option<String>,
    },
}

/// 初始化日志系统
fn init_logging() -> Option<WorkerGuard> {
    let log_dir = get_log_dir();
    let _ = std::fs::create_dir_all(&log_dir);

    let config = LogConfig::load(&log_dir);

    if !config.enabled {
        // 日志已禁用，只初始化一个空的 subscriber
        let _ = tracing::subscriber::set_global_default(tracing_subscriber::registry());
        return None;
    }

    let env_filter = EnvFilter::builder()
        .with_default_directive(config.tracing_level().into())
        .from_env_lossy();

    // 控制台只输出到 stderr，stdout 留给命令结果
    let console_layer = cfg!(debug_assertions).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    match SizeRotatingWriter::new(&log_dir, config.max_size_mb) {
        Ok(file_writer) => {
            let (writer, guard) = tracing_appender::non_blocking(file_writer);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false);

            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer)
                .with(console_layer);
            let _ = tracing::subscriber::set_global_default(subscriber);
            Some(guard)
        }
        Err(e) => {
            // 文件日志创建失败，回退到控制台
            eprintln!("无法创建日志文件 {:?}: {}", log_dir, e);
            let subscriber = tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));
            let _ = tracing::subscriber::set_global_default(subscriber);
            None
        }
    }
}

async fn run(cli: Cli, state: AppState) -> anyhow::Result<ExitCode> {
    match cli.command {
        Command::Mirror {
            source,
            destination,
            manifest,
            excludes,
            include_hidden,
            json,
        } => {
            let overrides = mirror::MirrorOverrides {
                manifest_name: manifest,
                exclude_patterns: excludes,
                include_hidden: include_hidden.then_some(true),
                large_file_threshold: None,
            };
            let report = mirror::run_mirror(&state, source, destination, overrides).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "已镜像 {} 个文件 ({} 字节)，{} 个目录，清理 {} 项，用时 {}ms",
                    report.files_copied,
                    report.bytes_copied,
                    report.dirs_visited,
                    report.stale_removed,
                    report.duration_ms
                );
            }
        }
        Command::Grep { pattern, glob } => {
            if !inspect::search(&pattern, &glob)? {
                return Ok(ExitCode::from(1));
            }
        }
        Command::Manifest { file } => {
            for entry in inspect::show_manifest(&file)? {
                println!("{}", entry.display());
            }
        }
        Command::Digest { dir, manifest } => {
            let manifest =
                manifest.unwrap_or_else(|| mirror::get_mirror_config(&state).manifest_name);
            println!("{}", inspect::digest(&dir, &manifest)?);
        }
        Command::MirrorConfig {
            manifest,
            excludes,
            include_hidden,
            large_file_threshold,
        } => {
            let config = mirror::set_mirror_config(
                &state,
                mirror::MirrorOverrides {
                    manifest_name: manifest,
                    exclude_patterns: excludes,
                    include_hidden,
                    large_file_threshold,
                },
            )?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Command::LogConfig {
            enabled,
            max_size_mb,
            level,
        } => {
            let config = if enabled.is_none() && max_size_mb.is_none() && level.is_none() {
                log::get_log_config(&state)
            } else {
                log::set_log_config(&state, enabled, max_size_mb, level)?
            };
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_logging();

    let result = match AppState::new() {
        Ok(state) => run(cli, state).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("错误: {:#}", e);
            ExitCode::from(2)
        }
    }
}
