//! 列表分页
//!
//! 数据源不提供分页参数：调用方取回全部产品后在本地切片，
//! 依赖数据源返回稳定的插入顺序。

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    /// `page` 和 `limit` 小于 1 时按 1 处理
    pub fn new(page: u32, limit: u32, total: usize) -> Self {
        let page = page.max(1);
        let limit = limit.max(1);
        let per_page = limit as usize;
        let total_pages = (total + per_page - 1) / per_page;

        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: (page as usize) < total_pages,
            has_prev: page > 1,
        }
    }

    /// 当前页在完整列表中的下标范围，超出末尾时为空
    pub fn range(&self) -> std::ops::Range<usize> {
        let per_page = self.limit as usize;
        let start = (self.page as usize - 1).saturating_mul(per_page).min(self.total);
        let end = start.saturating_add(per_page).min(self.total);
        start..end
    }
}

/// 从完整列表中取出第 `page` 页
pub fn paginate<T>(mut items: Vec<T>, page: u32, limit: u32) -> (Vec<T>, Pagination) {
    let pagination = Pagination::new(page, limit, items.len());
    let range = pagination.range();
    items.truncate(range.end);
    let page_items = items.split_off(range.start);
    (page_items, pagination)
}
