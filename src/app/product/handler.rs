//! 产品处理器

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{
    form::ProductSubmission, pagination::Pagination, service::ProductService,
    upload::UploadStore,
};
use crate::config::{Config, PaginationConfig};
use crate::core::{error::CoreError, response::ApiResponse};
use crate::datasource::{DataSource, Product};

#[derive(Clone)]
pub struct AppState {
    pub product_service: ProductService,
    pub uploads: UploadStore,
    pub pagination: PaginationConfig,
    pub hostname: String,
}

impl AppState {
    pub fn new(data_source: Arc<DataSource>, config: &Config) -> Self {
        Self {
            product_service: ProductService::new(data_source),
            uploads: UploadStore::new(config.uploads.dir.clone(), config.uploads.max_bytes),
            pagination: config.pagination.clone(),
            hostname: current_hostname(),
        }
    }
}

/// 本机主机名，系统调用失败时退回环境变量
fn current_hostname() -> String {
    system_hostname()
        .or_else(|| std::env::var("HOSTNAME").ok())
        .or_else(|| std::env::var("COMPUTERNAME").ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

#[cfg(unix)]
fn system_hostname() -> Option<String> {
    nix::unistd::gethostname()
        .ok()
        .and_then(|name| name.into_string().ok())
}

#[cfg(not(unix))]
fn system_hostname() -> Option<String> {
    None
}

/// 分页查询参数，无法解析的值按缺省处理
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

fn positive(value: Option<&str>) -> Option<u32> {
    value
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|v| *v > 0)
}

/// 首页数据：当前页产品、分页信息和数据源名称
#[derive(Debug, Serialize)]
pub struct CatalogPage {
    pub products: Vec<Product>,
    pub pagination: Pagination,
    pub hostname: String,
    pub source: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ProductList {
    pub products: Vec<Product>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: String,
    pub deleted: bool,
}

/// 首页，每页条数固定
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<CatalogPage>>, CoreError> {
    let page = positive(query.page.as_deref()).unwrap_or(1);
    let (products, pagination) = state
        .product_service
        .list_page(page, state.pagination.page_size)
        .await?;

    Ok(Json(ApiResponse::success(CatalogPage {
        products,
        pagination,
        hostname: state.hostname.clone(),
        source: state.product_service.source_label(),
    })))
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<ProductList>>, CoreError> {
    let page = positive(query.page.as_deref()).unwrap_or(1);
    let limit = positive(query.limit.as_deref())
        .unwrap_or(state.pagination.default_limit)
        .min(state.pagination.max_limit);

    let (products, pagination) = state.product_service.list_page(page, limit).await?;
    Ok(Json(ApiResponse::success(ProductList {
        products,
        pagination,
    })))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Product>>, CoreError> {
    let product = state.product_service.get_product(&id).await?;
    Ok(Json(ApiResponse::success(product)))
}

pub async fn create_product(
    State(state): State<AppState>,
    submission: ProductSubmission,
) -> Result<(StatusCode, Json<ApiResponse<Product>>), CoreError> {
    let mut fields = submission.form.into_new_product()?;
    let stored = match &submission.file {
        Some(file) => Some(state.uploads.save(file).await?),
        None => None,
    };
    if let Some(url) = &stored {
        fields.image = Some(url.clone());
    }

    let product = match state.product_service.create_product(fields).await {
        Ok(product) => product,
        Err(e) => {
            discard_upload(&state.uploads, stored.as_deref()).await;
            return Err(e);
        }
    };
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(product, "Product created")),
    ))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    submission: ProductSubmission,
) -> Result<Json<ApiResponse<Product>>, CoreError> {
    let mut patch = submission.form.into_patch()?;

    // 先确认产品存在，避免为不存在的产品保存上传文件
    state.product_service.get_product(&id).await?;
    let stored = match &submission.file {
        Some(file) => Some(state.uploads.save(file).await?),
        None => None,
    };
    if let Some(url) = &stored {
        patch.image = Some(url.clone());
    }

    // 产品在保存文件后被并发删除或后端不可用时，清理刚写入的文件
    let product = match state.product_service.update_product(&id, patch).await {
        Ok(product) => product,
        Err(e) => {
            discard_upload(&state.uploads, stored.as_deref()).await;
            return Err(e);
        }
    };
    Ok(Json(ApiResponse::with_message(product, "Product updated")))
}

async fn discard_upload(uploads: &UploadStore, stored: Option<&str>) {
    if let Some(url) = stored {
        uploads.remove(url).await;
    }
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Deleted>>, CoreError> {
    state.product_service.delete_product(&id).await?;
    Ok(Json(ApiResponse::with_message(
        Deleted { id, deleted: true },
        "Product deleted",
    )))
}

/// 健康检查
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let source = state.product_service.source_label();
    let body = match state.product_service.count().await {
        Ok(count) => serde_json::json!({
            "status": "healthy",
            "data_source": source,
            "products_count": count,
            "hostname": state.hostname,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }),
        Err(_) => serde_json::json!({
            "status": "degraded",
            "data_source": source,
            "hostname": state.hostname,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }),
    };

    Json(body)
}
