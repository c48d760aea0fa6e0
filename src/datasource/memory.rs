//! 内存后端
//!
//! 远程文档库不可用时使用。数据按插入顺序保存在一个 `Vec` 中，
//! 整个集合和 id 计数器由同一把锁保护，进程重启后数据丢失。

use async_trait::async_trait;
use parking_lot::Mutex;

use super::error::{DataSourceError, Result};
use super::model::{NewProduct, Product, ProductPatch};
use super::ProductStore;

pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

struct Inner {
    products: Vec<Product>,
    /// 下一个分配的 id，从 1 开始，删除后也不回收
    next_id: u64,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                products: Vec::new(),
                next_id: 1,
            }),
        }
    }

    /// 当前产品数量
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().products.is_empty()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn position(&self, id: &str) -> Result<usize> {
        self.products
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| DataSourceError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl ProductStore for InMemoryStore {
    async fn get_all(&self) -> Result<Vec<Product>> {
        Ok(self.inner.lock().products.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Product> {
        let inner = self.inner.lock();
        let index = inner.position(id)?;
        Ok(inner.products[index].clone())
    }

    async fn create(&self, fields: NewProduct) -> Result<Product> {
        let mut inner = self.inner.lock();
        let id = inner.next_id.to_string();
        inner.next_id += 1;

        let product = Product::from_new(id, fields);
        inner.products.push(product.clone());
        Ok(product)
    }

    async fn update(&self, id: &str, patch: ProductPatch) -> Result<Product> {
        let mut inner = self.inner.lock();
        let index = inner.position(id)?;
        let product = &mut inner.products[index];
        product.apply(patch);
        Ok(product.clone())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        let index = inner.position(id)?;
        inner.products.remove(index);
        Ok(())
    }
}
