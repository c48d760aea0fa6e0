//! 日志基础设施

use anyhow::Result;
use std::io;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

pub struct Logger;

impl Logger {
    /// 初始化日志系统
    ///
    /// - 控制台始终输出
    /// - 配置了 `log_dir` 时额外写入按日期分割的日志文件
    /// - `RUST_LOG` 优先于配置中的级别
    ///
    /// 返回的 guard 必须在进程退出前一直持有，否则文件日志可能丢失。
    pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

        let mut guard = None;
        let file_layer = match &config.log_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                let file_appender = rolling::daily(dir, &config.file_prefix);
                let (writer, worker_guard) = non_blocking(file_appender);
                guard = Some(worker_guard);
                Some(
                    fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false)
                        .with_target(false)
                        .with_thread_names(true),
                )
            }
            None => None,
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(io::stdout).with_target(false))
            .with(file_layer)
            .try_init()?;

        Ok(guard)
    }
}
