//! 基础设施层：日志和数据库连接

#[cfg(feature = "database")]
pub mod database;
pub mod logger;
