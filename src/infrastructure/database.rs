//! 数据库基础设施

use sqlx::{
    postgres::{PgConnectOptions, PgPool, PgPoolOptions},
    Error,
};
use std::str::FromStr;

use crate::config::DatabaseConfig;

pub struct DatabaseManager {
    pool: PgPool,
}

impl DatabaseManager {
    /// 建立连接池并打开第一条连接
    ///
    /// 建连受 `connect_timeout` 限制；每条连接都设置了服务端
    /// `statement_timeout`，语句超时后以错误返回而不会一直挂起。
    pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<Self, Error> {
        let statement_timeout_ms = config.statement_timeout().as_millis().to_string();
        let options = PgConnectOptions::from_str(url)?
            .options([("statement_timeout", statement_timeout_ms.as_str())]);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(0)
            .acquire_timeout(config.connect_timeout())
            .connect_with(options);

        let pool = tokio::time::timeout(config.connect_timeout(), pool)
            .await
            .map_err(|_| Error::PoolTimedOut)??;

        Ok(Self { pool })
    }

    pub fn into_pool(self) -> PgPool {
        self.pool
    }
}
