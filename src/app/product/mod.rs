//! 产品管理

pub mod form;
pub mod handler;
pub mod pagination;
pub mod service;
pub mod upload;
