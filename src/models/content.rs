//! 上游语义检索返回的课程内容片段

use serde::{Deserialize, Serialize};

/// 检索片段，按类型区分文档页与视频时间点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchSegment {
    /// 文档片段
    Document {
        content_id: String,
        page: u32,
        text: String,
    },
    /// 媒体片段
    Media {
        content_id: String,
        start_seconds: u32,
        text: String,
    },
}

impl SearchSegment {
    pub fn content_id(&self) -> &str {
        match self {
            SearchSegment::Document { content_id, .. } | SearchSegment::Media { content_id, .. } => {
                content_id
            }
        }
    }

    /// 渲染为提示词中的一行引用
    pub fn render(&self) -> String {
        match self {
            SearchSegment::Document {
                content_id,
                page,
                text,
            } => format!("[document {} p.{}] {}", content_id, page, text),
            SearchSegment::Media {
                content_id,
                start_seconds,
                text,
            } => format!(
                "[video {} at {}:{:02}] {}",
                content_id,
                start_seconds / 60,
                start_seconds % 60,
                text
            ),
        }
    }
}
