//! 产品表单：请求解析与校验
//!
//! 创建和更新请求可以是 JSON、urlencoded 表单或 multipart 表单。
//! multipart 中的 `imageFile` 是上传文件，`image` / `imageUrl` 是 data URL。

use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use serde::Deserialize;
use validator::Validate;

use super::upload::{image_extension, upload_file_name, UploadedFile};
use crate::core::error::{field_errors, CoreError, FieldError};
use crate::datasource::{NewProduct, ProductPatch};

/// 价格既可以是数字，也可以是可解析为数字的字符串
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Number(f64),
    Text(String),
}

/// 未校验的产品字段
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductForm {
    pub name: Option<String>,
    pub price: Option<PriceInput>,
    pub color: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "imageUrl")]
    pub image: Option<String>,
}

#[derive(Debug, Validate)]
struct ProductInput {
    #[validate(length(min = 1, message = "Name is required"))]
    name: Option<String>,
    #[validate(range(min = 0.0, message = "Price must be a non-negative number"))]
    price: Option<f64>,
    #[validate(length(min = 1, message = "Color is required"))]
    color: Option<String>,
    description: Option<String>,
    image: Option<String>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

/// 空字符串、白名单图片类型的 data URL，或单层的 `/uploads/` 路径
fn is_image_reference(image: &str) -> bool {
    if image.is_empty() || upload_file_name(image).is_some() {
        return true;
    }
    image
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .map(|(meta, _)| meta.split(';').next().unwrap_or_default())
        .and_then(image_extension)
        .is_some()
}

impl ProductForm {
    /// 转换为创建字段；`name`、`price`、`color` 必填
    pub fn into_new_product(self) -> Result<NewProduct, CoreError> {
        let (input, mut errors) = self.check();

        if input.name.is_none() {
            errors.push(FieldError::new("name", "Name is required"));
        }
        if input.price.is_none() && !errors.iter().any(|e| e.field == "price") {
            errors.push(FieldError::new("price", "Price is required"));
        }
        if input.color.is_none() {
            errors.push(FieldError::new("color", "Color is required"));
        }

        match (input.name, input.price, input.color) {
            (Some(name), Some(price), Some(color)) if errors.is_empty() => Ok(NewProduct {
                name,
                price,
                color,
                description: input.description,
                image: input.image,
            }),
            _ => Err(validation_failed(errors)),
        }
    }

    /// 转换为部分更新，未提供的字段保持不变
    pub fn into_patch(self) -> Result<ProductPatch, CoreError> {
        let (input, errors) = self.check();
        if !errors.is_empty() {
            return Err(validation_failed(errors));
        }

        Ok(ProductPatch {
            name: input.name,
            price: input.price,
            color: input.color,
            description: input.description,
            image: input.image,
        })
    }

    fn check(self) -> (ProductInput, Vec<FieldError>) {
        let mut errors = Vec::new();

        let price = match self.price {
            None => None,
            Some(PriceInput::Number(value)) => Some(value),
            Some(PriceInput::Text(text)) if text.trim().is_empty() => None,
            Some(PriceInput::Text(text)) => match text.trim().parse::<f64>() {
                Ok(value) => Some(value),
                Err(_) => {
                    errors.push(FieldError::new("price", "Price must be a number"));
                    None
                }
            },
        };
        if matches!(price, Some(value) if !value.is_finite()) {
            errors.push(FieldError::new("price", "Price must be a number"));
        }

        let image = trimmed(self.image);
        if let Some(image) = &image {
            if !is_image_reference(image) {
                errors.push(FieldError::new(
                    "image",
                    "Image must be a data URL or an uploaded file path",
                ));
            }
        }

        let input = ProductInput {
            name: trimmed(self.name),
            price: price.filter(|value| value.is_finite()),
            color: trimmed(self.color),
            description: trimmed(self.description),
            image,
        };

        if let Err(err) = input.validate() {
            errors.extend(field_errors(&err));
        }

        (input, errors)
    }
}

fn validation_failed(mut errors: Vec<FieldError>) -> CoreError {
    errors.sort_by(|a, b| a.field.cmp(&b.field));
    CoreError::Validation(errors)
}

/// 创建或更新请求：表单字段加上可选的上传文件
#[derive(Debug, Default)]
pub struct ProductSubmission {
    pub form: ProductForm,
    pub file: Option<UploadedFile>,
}

#[async_trait]
impl<S> FromRequest<S> for ProductSubmission
where
    S: Send + Sync,
{
    type Rejection = CoreError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| CoreError::BadRequest(e.body_text()))?;
            return read_multipart(multipart).await;
        }

        let form = if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(form) = Form::<ProductForm>::from_request(req, state)
                .await
                .map_err(|e| CoreError::BadRequest(e.body_text()))?;
            form
        } else {
            let Json(form) = Json::<ProductForm>::from_request(req, state)
                .await
                .map_err(|e| CoreError::BadRequest(e.body_text()))?;
            form
        };

        Ok(Self { form, file: None })
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<ProductSubmission, CoreError> {
    let mut submission = ProductSubmission::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| CoreError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "imageFile" {
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| CoreError::BadRequest(e.body_text()))?;
            // 浏览器在未选择文件时也会提交一个空的 part
            if !data.is_empty() {
                submission.file = Some(UploadedFile {
                    file_name,
                    content_type,
                    data: data.to_vec(),
                });
            }
            continue;
        }

        let text = field
            .text()
            .await
            .map_err(|e| CoreError::BadRequest(e.body_text()))?;
        let form = &mut submission.form;
        match name.as_str() {
            "name" => form.name = Some(text),
            "price" => form.price = Some(PriceInput::Text(text)),
            "color" => form.color = Some(text),
            "description" => form.description = Some(text),
            "image" | "imageUrl" => form.image = Some(text),
            _ => {}
        }
    }

    Ok(submission)
}
