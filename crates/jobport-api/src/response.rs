//! Standard response envelope and pagination.
//!
//! Every success body is `{ success: true, message?, data? }`; list
//! endpoints wrap their data in a pagination block.

use serde::Serialize;

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl Envelope<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

/// Pagination block carried alongside list data.
#[derive(Debug, Serialize)]
pub struct PageInfo {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub items_per_page: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

/// A page of items plus its pagination block.
#[derive(Debug, Serialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub pagination: PageInfo,
}

/// Slice `items` into the requested page.
pub fn paginate<T: Serialize>(items: Vec<T>, page: u32, limit: u32) -> Paginated<T> {
    let page = page.max(1);
    let limit = limit.clamp(1, 100);

    let total_items = items.len() as u64;
    let total_pages = ((total_items + limit as u64 - 1) / limit as u64).max(1) as u32;

    let start = ((page - 1) * limit) as usize;
    let page_items: Vec<T> = items
        .into_iter()
        .skip(start)
        .take(limit as usize)
        .collect();

    Paginated {
        items: page_items,
        pagination: PageInfo {
            current_page: page,
            total_pages,
            total_items,
            items_per_page: limit,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginate_slices_items() {
        let items: Vec<u32> = (1..=25).collect();
        let page = paginate(items, 2, 10);

        assert_eq!(page.items, (11..=20).collect::<Vec<u32>>());
        assert_eq!(page.pagination.current_page, 2);
        assert_eq!(page.pagination.total_pages, 3);
        assert_eq!(page.pagination.total_items, 25);
        assert!(page.pagination.has_next_page);
        assert!(page.pagination.has_prev_page);
    }

    #[test]
    fn test_paginate_out_of_range_page_is_empty() {
        let items: Vec<u32> = (1..=5).collect();
        let page = paginate(items, 9, 10);
        assert!(page.items.is_empty());
        assert_eq!(page.pagination.total_pages, 1);
        assert!(!page.pagination.has_next_page);
    }

    #[test]
    fn test_paginate_clamps_inputs() {
        let items: Vec<u32> = (1..=5).collect();
        let page = paginate(items, 0, 0);
        assert_eq!(page.pagination.current_page, 1);
        assert_eq!(page.pagination.items_per_page, 1);
    }

    #[test]
    fn test_envelope_shapes() {
        let body = serde_json::to_value(Envelope::data(vec![1, 2])).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], serde_json::json!([1, 2]));
        assert!(body.get("message").is_none());

        let body = serde_json::to_value(Envelope::message("done")).unwrap();
        assert_eq!(body["message"], "done");
        assert!(body.get("data").is_none());
    }
}
