//! 数据源错误类型

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataSourceError {
    /// 指定 id 的产品不存在
    #[error("product {0} not found")]
    NotFound(String),
    /// 远程后端在激活之后的操作中失败（超时、连接断开等）
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    /// 启动时无法连接远程后端，只记录日志并回退到内存存储
    #[error("remote backend activation failed: {0}")]
    ActivationFailure(String),
}

pub type Result<T> = std::result::Result<T, DataSourceError>;

#[cfg(feature = "database")]
impl From<sqlx::Error> for DataSourceError {
    fn from(err: sqlx::Error) -> Self {
        DataSourceError::BackendUnavailable(err.to_string())
    }
}
