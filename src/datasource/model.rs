//! 产品数据模型
//!
//! 两种后端共用同一份模型，`id` 始终是后端无关的字符串形式。

use serde::{Deserialize, Serialize};

/// 产品记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub color: String,
    pub description: String,
    /// data URL 或上传文件路径，数据源不解释其内容
    pub image: String,
}

/// 创建产品时提供的字段
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
    pub color: String,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// 更新产品时提供的字段，`None` 表示保留原值
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Product {
    /// 用后端分配的 id 构造记录，缺省的可选字段取空字符串
    pub fn from_new(id: String, fields: NewProduct) -> Self {
        Self {
            id,
            name: fields.name,
            price: fields.price,
            color: fields.color,
            description: fields.description.unwrap_or_default(),
            image: fields.image.unwrap_or_default(),
        }
    }

    /// 应用部分更新，`id` 不变
    pub fn apply(&mut self, patch: ProductPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(image) = patch.image {
            self.image = image;
        }
    }
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.price.is_none()
            && self.color.is_none()
            && self.description.is_none()
            && self.image.is_none()
    }
}
