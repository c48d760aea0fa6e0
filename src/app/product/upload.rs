//! 产品图片上传

use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::error::{CoreError, FieldError};

/// 对外访问上传文件的路径前缀
pub const UPLOAD_URL_PREFIX: &str = "/uploads";

#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// 上传目录
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 确保上传目录存在，返回是否新建了目录
    pub async fn ensure_dir(&self) -> io::Result<bool> {
        if tokio::fs::try_exists(&self.dir).await? {
            return Ok(false);
        }
        tokio::fs::create_dir_all(&self.dir).await?;
        info!("Created uploads directory at {}", self.dir.display());
        Ok(true)
    }

    /// 保存上传文件，返回可以直接存入 `image` 字段的访问路径
    ///
    /// 只接受白名单中的位图类型，扩展名由 content type 决定，与客户端文件名无关。
    pub async fn save(&self, file: &UploadedFile) -> Result<String, CoreError> {
        let extension = file
            .content_type
            .as_deref()
            .and_then(image_extension)
            .ok_or_else(|| {
                CoreError::Validation(vec![FieldError::new(
                    "imageFile",
                    "Uploaded file must be a PNG, JPEG, GIF or WebP image",
                )])
            })?;
        if file.data.len() > self.max_bytes {
            return Err(CoreError::Validation(vec![FieldError::new(
                "imageFile",
                format!("Uploaded file must be at most {} bytes", self.max_bytes),
            )]));
        }

        let stored_name = format!("{}.{}", Uuid::new_v4(), extension);
        let path = self.dir.join(&stored_name);

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CoreError::InternalServerError(format!("create upload dir: {}", e)))?;
        tokio::fs::write(&path, &file.data)
            .await
            .map_err(|e| CoreError::InternalServerError(format!("write upload: {}", e)))?;

        info!("Stored upload {} ({} bytes)", stored_name, file.data.len());
        Ok(format!("{}/{}", UPLOAD_URL_PREFIX, stored_name))
    }

    /// 删除 `save` 返回的上传文件，文件不存在时忽略
    pub async fn remove(&self, url: &str) {
        let Some(file_name) = upload_file_name(url) else {
            return;
        };
        match tokio::fs::remove_file(self.dir.join(file_name)).await {
            Ok(()) => info!("Removed upload {}", file_name),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove upload {}: {}", file_name, e),
        }
    }
}

/// 允许的图片类型及其扩展名
///
/// SVG 可以携带脚本，不在白名单内。
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match mime.as_str() {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// 从 `/uploads/<file>` 中取出文件名；只允许单层、不含 `..` 的文件名
pub fn upload_file_name(url: &str) -> Option<&str> {
    let name = url.strip_prefix(UPLOAD_URL_PREFIX)?.strip_prefix('/')?;
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    valid.then_some(name)
}
