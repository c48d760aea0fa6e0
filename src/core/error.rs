//! 核心错误处理模块

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::datasource::DataSourceError;

/// 单个字段的校验错误
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub msg: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            msg: msg.into(),
        }
    }
}

/// 核心错误类型
#[derive(Debug)]
pub enum CoreError {
    BadRequest(String),
    Validation(Vec<FieldError>),
    NotFound(String),
    ServiceUnavailable(String),
    InternalServerError(String),
}

/// 错误响应结构
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
    pub timestamp: String,
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let (status, error_message, user_message, errors) = match self {
            CoreError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, vec![]),
            CoreError::Validation(errors) => {
                let message = errors
                    .iter()
                    .map(|e| e.msg.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message, errors)
            }
            CoreError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, vec![]),
            CoreError::ServiceUnavailable(msg) => {
                error!("Data source unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Data source is temporarily unavailable".to_string(),
                    vec![],
                )
            }
            CoreError::InternalServerError(msg) => {
                error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "Internal server error".to_string(),
                    vec![],
                )
            }
        };

        let error_response = ErrorResponse {
            error: error_message.to_string(),
            message: user_message,
            code: status.as_u16(),
            errors,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, axum::Json(error_response)).into_response()
    }
}

impl From<DataSourceError> for CoreError {
    fn from(err: DataSourceError) -> Self {
        match err {
            DataSourceError::NotFound(id) => CoreError::NotFound(format!("Product {} not found", id)),
            DataSourceError::BackendUnavailable(msg) => CoreError::ServiceUnavailable(msg),
            // 激活失败只在启动时触发回退，不会出现在请求路径上
            DataSourceError::ActivationFailure(msg) => CoreError::InternalServerError(msg),
        }
    }
}

/// 把 `validator` 的错误展开为按字段排序的列表
pub fn field_errors(err: &validator::ValidationErrors) -> Vec<FieldError> {
    let mut errors: Vec<FieldError> = err
        .field_errors()
        .into_iter()
        .flat_map(|(field, errors)| {
            let field = field.to_string();
            errors.iter().map(move |error| {
                let msg = error
                    .message
                    .as_ref()
                    .map(|msg| msg.to_string())
                    .unwrap_or_else(|| format!("Invalid {}", field));
                FieldError::new(field.clone(), msg)
            })
        })
        .collect();

    errors.sort_by(|a, b| a.field.cmp(&b.field));
    errors
}
