//! 远程文档后端
//!
//! 使用 PostgreSQL 的 `JSONB` 列作为文档存储：
//!
//! ```sql
//! CREATE TABLE products (
//!     id UUID PRIMARY KEY,      -- 原生 id，对外转换为字符串
//!     seq BIGSERIAL NOT NULL,   -- 插入顺序，保证列表顺序稳定
//!     doc JSONB NOT NULL,       -- 产品文档
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! )
//! ```
//!
//! 适配器本身不持有可变状态，并发控制交给数据库。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgPool, types::Json};
use tracing::{debug, info};
use uuid::Uuid;

use super::error::{DataSourceError, Result};
use super::model::{NewProduct, Product, ProductPatch};
use super::ProductStore;

/// 存入 `doc` 列的文档内容
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct ProductDocument {
    name: String,
    price: f64,
    color: String,
    description: String,
    image: String,
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    doc: Json<ProductDocument>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        let doc = row.doc.0;
        Product {
            id: row.id.to_string(),
            name: doc.name,
            price: doc.price,
            color: doc.color,
            description: doc.description,
            image: doc.image,
        }
    }
}

impl From<NewProduct> for ProductDocument {
    fn from(fields: NewProduct) -> Self {
        ProductDocument {
            name: fields.name,
            price: fields.price,
            color: fields.color,
            description: fields.description.unwrap_or_default(),
            image: fields.image.unwrap_or_default(),
        }
    }
}

/// 把对外的字符串 id 转换为原生 id
///
/// 只接受小写带连字符的规范形式；其他写法（大写、花括号、`urn:uuid:`）
/// 不可能是对外公布过的 id，和非法 UUID 一样视为不存在。
fn native_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id)
        .ok()
        .filter(|native| native.to_string() == id)
        .ok_or_else(|| DataSourceError::NotFound(id.to_string()))
}

pub struct DocumentStore {
    pool: PgPool,
}

impl DocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 创建产品表（已存在时跳过）
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id UUID PRIMARY KEY,
                seq BIGSERIAL NOT NULL,
                doc JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS products_seq_idx ON products (seq)")
            .execute(&self.pool)
            .await?;

        info!("Product collection ready");
        Ok(())
    }
}

#[async_trait]
impl ProductStore for DocumentStore {
    async fn get_all(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>("SELECT id, doc FROM products ORDER BY seq ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn get_by_id(&self, id: &str) -> Result<Product> {
        let native = native_id(id)?;
        sqlx::query_as::<_, ProductRow>("SELECT id, doc FROM products WHERE id = $1")
            .bind(native)
            .fetch_optional(&self.pool)
            .await?
            .map(Product::from)
            .ok_or_else(|| DataSourceError::NotFound(id.to_string()))
    }

    async fn create(&self, fields: NewProduct) -> Result<Product> {
        let row = sqlx::query_as::<_, ProductRow>(
            "INSERT INTO products (id, doc) VALUES ($1, $2) RETURNING id, doc",
        )
        .bind(Uuid::new_v4())
        .bind(Json(ProductDocument::from(fields)))
        .fetch_one(&self.pool)
        .await?;

        debug!("Inserted product document {}", row.id);
        Ok(row.into())
    }

    async fn update(&self, id: &str, patch: ProductPatch) -> Result<Product> {
        let native = native_id(id)?;
        if patch.is_empty() {
            return self.get_by_id(id).await;
        }

        // `||` 合并只覆盖补丁中出现的字段
        sqlx::query_as::<_, ProductRow>(
            "UPDATE products SET doc = doc || $2, updated_at = NOW() WHERE id = $1 RETURNING id, doc",
        )
        .bind(native)
        .bind(Json(&patch))
        .fetch_optional(&self.pool)
        .await?
        .map(Product::from)
        .ok_or_else(|| DataSourceError::NotFound(id.to_string()))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let native = native_id(id)?;
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(native)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DataSourceError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
