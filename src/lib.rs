//! # 产品目录服务
//!
//! 通过 HTTP API 管理产品（名称、价格、颜色、描述、图片）。
//! 数据保存在远程文档库中；启动时远程库不可用则回退到进程内存储。
//!
//! - `datasource`：数据源抽象层，启动时选择后端并提供统一的 CRUD 接口
//! - `app`：路由、处理器、表单校验和分页
//! - `core`：错误处理、响应结构和中间件
//! - `infrastructure`：日志和数据库连接
//! - `config`：配置加载

pub mod app;
pub mod config;
pub mod core;
pub mod datasource;
pub mod infrastructure;

pub use config::Config;
pub use datasource::{DataSource, DataSourceError, NewProduct, Product, ProductPatch, ProductStore};
