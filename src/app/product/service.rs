//! 产品业务服务

use std::sync::Arc;
use tracing::info;

use super::pagination::{paginate, Pagination};
use crate::core::error::CoreError;
use crate::datasource::{DataSource, NewProduct, Product, ProductPatch};

#[derive(Clone)]
pub struct ProductService {
    data_source: Arc<DataSource>,
}

impl ProductService {
    pub fn new(data_source: Arc<DataSource>) -> Self {
        Self { data_source }
    }

    /// `remote` 或 `in-memory`
    pub fn source_label(&self) -> &'static str {
        self.data_source.source_label()
    }

    pub async fn list_page(
        &self,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<Product>, Pagination), CoreError> {
        let products = self.data_source.get_all().await?;
        Ok(paginate(products, page, limit))
    }

    pub async fn count(&self) -> Result<usize, CoreError> {
        Ok(self.data_source.get_all().await?.len())
    }

    pub async fn get_product(&self, id: &str) -> Result<Product, CoreError> {
        Ok(self.data_source.get_by_id(id).await?)
    }

    pub async fn create_product(&self, fields: NewProduct) -> Result<Product, CoreError> {
        let product = self.data_source.create(fields).await?;
        info!("Created product: {} ({})", product.name, product.id);
        Ok(product)
    }

    pub async fn update_product(
        &self,
        id: &str,
        patch: ProductPatch,
    ) -> Result<Product, CoreError> {
        let product = self.data_source.update(id, patch).await?;
        info!("Updated product: {} ({})", product.name, product.id);
        Ok(product)
    }

    pub async fn delete_product(&self, id: &str) -> Result<(), CoreError> {
        self.data_source.delete(id).await?;
        info!("Deleted product: {}", id);
        Ok(())
    }
}
