//! playlist/query.rs — 歌單查詢:過濾 → 穩定排序 → 分頁

use std::cmp::Ordering;

use serde::Deserialize;

use super::{duration_secs, Song};

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 500;

/* ---------------- 請求 ---------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Title,
    Duration,
    Occurrence,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "title" => Some(Self::Title),
            "duration" => Some(Self::Duration),
            "occurrence" => Some(Self::Occurrence),
            "createdAt" => Some(Self::CreatedAt),
            "updatedAt" => Some(Self::UpdatedAt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("asc") {
            Some(Self::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Some(Self::Desc)
        } else {
            None
        }
    }
}

/// query string 原樣進來,驗證交給 `PageRequest::parse`
#[derive(Debug, Default, Deserialize)]
pub struct RawPageQuery {
    pub page: Option<String>,
    pub size: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    #[serde(rename = "sortDirection")]
    pub sort_direction: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error("invalid page: {0}")]
    InvalidPage(String),
    #[error("invalid size: {0}")]
    InvalidSize(String),
    #[error("unknown sortBy: {0}")]
    UnknownSortField(String),
    #[error("unknown sortDirection: {0}")]
    UnknownDirection(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
    pub sort_by: SortField,
    pub direction: SortDirection,
    /// 已 trim 且非空才會是 Some
    pub search: Option<String>,
}

impl PageRequest {
    pub fn parse(raw: RawPageQuery) -> Result<Self, QueryError> {
        let page = match raw.page {
            None => 0,
            Some(s) => match s.trim().parse::<i64>() {
                Ok(p) if p >= 0 => p,
                _ => return Err(QueryError::InvalidPage(s)),
            },
        };
        let size = match raw.size {
            None => DEFAULT_PAGE_SIZE,
            Some(s) => match s.trim().parse::<i64>() {
                Ok(n) if n > 0 => n.min(MAX_PAGE_SIZE),
                _ => return Err(QueryError::InvalidSize(s)),
            },
        };
        let sort_by = match raw.sort_by {
            None => SortField::Title,
            Some(s) => SortField::parse(&s).ok_or(QueryError::UnknownSortField(s))?,
        };
        let direction = match raw.sort_direction {
            None => SortDirection::Asc,
            Some(s) => SortDirection::parse(&s).ok_or(QueryError::UnknownDirection(s))?,
        };
        let search = raw
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Ok(Self { page, size, sort_by, direction, search })
    }
}

/* ---------------- 結果 ---------------- */

#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    pub items: Vec<Song>,
    pub total_elements: i64,
    pub total_pages: i64,
    pub page_number: i64,
    pub is_first: bool,
    pub is_last: bool,
}

/// 整條管線是純函式:目錄進來、一頁出去。
/// 排序穩定,desc 是比較子取反,同鍵相對順序不動。
pub fn run(req: &PageRequest, mut songs: Vec<Song>) -> PageResult {
    if let Some(needle) = &req.search {
        let needle = needle.to_lowercase();
        songs.retain(|s| s.title.to_lowercase().contains(&needle));
    }

    songs.sort_by(|a, b| {
        let ord = compare(req.sort_by, a, b);
        match req.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });

    let total_elements = songs.len() as i64;
    let total_pages = if total_elements == 0 {
        0
    } else {
        (total_elements + req.size - 1) / req.size
    };

    let start = req.page as i128 * req.size as i128;
    let items: Vec<Song> = if start >= songs.len() as i128 {
        Vec::new()
    } else {
        songs
            .into_iter()
            .skip(start as usize)
            .take(req.size as usize)
            .collect()
    };

    PageResult {
        items,
        total_elements,
        total_pages,
        page_number: req.page,
        is_first: req.page == 0,
        is_last: req.page >= total_pages - 1,
    }
}

fn compare(field: SortField, a: &Song, b: &Song) -> Ordering {
    match field {
        SortField::Title => a.title.cmp(&b.title),
        // 依時長秒數比,不是字串比:"9:59" 要排在 "10:00" 前面
        SortField::Duration => duration_secs(&a.duration).cmp(&duration_secs(&b.duration)),
        SortField::Occurrence => a.occurrence.cmp(&b.occurrence),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
}
