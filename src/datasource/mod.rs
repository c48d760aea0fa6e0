//! 数据源抽象层
//!
//! 启动时根据远程文档库的连通性选择后端：
//!
//! - 连接成功：使用 [`DocumentStore`]（远程文档库）
//! - 连接失败：记录原因，回退到 [`InMemoryStore`]
//!
//! 选择在进程生命周期内只做一次，之后所有调用都经由 [`DataSource`]
//! 分发到当前后端，调用方不需要知道是哪个后端在应答。

#[cfg(feature = "database")]
mod document;
mod error;
mod memory;
mod model;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::DatabaseConfig;

#[cfg(feature = "database")]
pub use document::DocumentStore;
pub use error::{DataSourceError, Result};
pub use memory::InMemoryStore;
pub use model::{NewProduct, Product, ProductPatch};

/// 产品存储后端需要提供的能力
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// 按插入顺序（最早的在前）返回全部产品
    async fn get_all(&self) -> Result<Vec<Product>>;
    async fn get_by_id(&self, id: &str) -> Result<Product>;
    /// 分配新 id 并保存
    async fn create(&self, fields: NewProduct) -> Result<Product>;
    /// 部分更新，未提供的字段保留原值
    async fn update(&self, id: &str, patch: ProductPatch) -> Result<Product>;
    async fn delete(&self, id: &str) -> Result<()>;
}

/// 数据源选择器
///
/// 在启动时构造一次，通过 `Arc` 注入路由层。自身不保存任何产品数据。
#[derive(Clone)]
pub struct DataSource {
    store: Arc<dyn ProductStore>,
    remote: bool,
}

impl DataSource {
    /// 激活后端
    ///
    /// 任何激活失败（超时、认证失败、网络不可达、连接串格式错误、
    /// 未配置连接串）都只记录日志，并回退到内存存储，不会返回错误。
    pub async fn init(prefer_remote: bool, config: &DatabaseConfig) -> Self {
        if !prefer_remote {
            info!("Remote data source disabled by configuration, using in-memory store");
            return Self::in_memory();
        }

        info!(
            "Attempting to connect to remote data source (timeout {}s)...",
            config.connect_timeout_secs
        );
        if let Some(url) = config.redacted_url() {
            info!("Using URI: {}", url);
        }

        match activate_remote(config).await {
            Ok(store) => {
                info!("Connected to remote data source, using remote document store");
                Self::with_store(store, true)
            }
            Err(err) => {
                warn!("Failed to connect to remote data source, falling back to in-memory store");
                warn!("Connection error: {}", err);
                Self::in_memory()
            }
        }
    }

    /// 使用指定后端构造，`remote` 只用于展示
    pub fn with_store(store: Arc<dyn ProductStore>, remote: bool) -> Self {
        Self { store, remote }
    }

    /// 仅使用内存存储
    pub fn in_memory() -> Self {
        Self::with_store(Arc::new(InMemoryStore::new()), false)
    }

    pub fn is_remote_active(&self) -> bool {
        self.remote
    }

    /// 当前数据源的名称：`remote` 或 `in-memory`
    pub fn source_label(&self) -> &'static str {
        if self.remote {
            "remote"
        } else {
            "in-memory"
        }
    }

    pub async fn get_all(&self) -> Result<Vec<Product>> {
        self.store.get_all().await.map_err(|e| self.log_failure("get_all", e))
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Product> {
        self.store
            .get_by_id(id)
            .await
            .map_err(|e| self.log_failure("get_by_id", e))
    }

    pub async fn create(&self, fields: NewProduct) -> Result<Product> {
        self.store
            .create(fields)
            .await
            .map_err(|e| self.log_failure("create", e))
    }

    pub async fn update(&self, id: &str, patch: ProductPatch) -> Result<Product> {
        self.store
            .update(id, patch)
            .await
            .map_err(|e| self.log_failure("update", e))
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store
            .delete(id)
            .await
            .map_err(|e| self.log_failure("delete", e))
    }

    /// 后端故障不做重试或切换，记录后原样返回
    fn log_failure(&self, operation: &str, err: DataSourceError) -> DataSourceError {
        if let DataSourceError::BackendUnavailable(reason) = &err {
            error!(
                "{} failed on {} data source: {}",
                operation,
                self.source_label(),
                reason
            );
        }
        err
    }
}

#[cfg(feature = "database")]
async fn activate_remote(config: &DatabaseConfig) -> Result<Arc<dyn ProductStore>> {
    use crate::infrastructure::database::DatabaseManager;

    let url = config
        .url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| {
            DataSourceError::ActivationFailure("no connection string configured".to_string())
        })?;

    let manager = DatabaseManager::connect(url, config)
        .await
        .map_err(|e| DataSourceError::ActivationFailure(e.to_string()))?;

    let store = DocumentStore::new(manager.into_pool());
    store
        .ensure_schema()
        .await
        .map_err(|e| DataSourceError::ActivationFailure(e.to_string()))?;

    Ok(Arc::new(store))
}

#[cfg(not(feature = "database"))]
async fn activate_remote(_config: &DatabaseConfig) -> Result<Arc<dyn ProductStore>> {
    Err(DataSourceError::ActivationFailure(
        "built without the `database` feature".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prefer_remote_false_uses_memory() {
        let source = DataSource::init(false, &DatabaseConfig::default()).await;
        assert!(!source.is_remote_active());
        assert_eq!(source.source_label(), "in-memory");
    }

    #[tokio::test]
    async fn test_missing_url_falls_back() {
        let config = DatabaseConfig {
            url: None,
            ..Default::default()
        };
        let source = DataSource::init(true, &config).await;
        assert!(!source.is_remote_active());
        assert!(source.get_all().await.unwrap().is_empty());
    }

    #[test]
    fn test_with_store_reports_label() {
        let source = DataSource::with_store(Arc::new(InMemoryStore::new()), true);
        assert!(source.is_remote_active());
        assert_eq!(source.source_label(), "remote");
    }
}
