//! The list endpoints answer with one of three JSON shapes. They are told apart here, once, by
//! the fields they carry: a board has `columns`, an infinite-scroll page has `hasNextPage`, and
//! anything else with `results` is a numbered page.

use crate::domain::view::{CursorPage, KanbanBoard, KanbanColumn, ListView, Page};
use indexmap::IndexMap;
use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct KanbanColumnDto<T> {
    pub title: String,
    pub items: Vec<T>,
    #[serde(rename = "totalCount", default)]
    pub total_count: Option<usize>,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum ListViewDto<T> {
    Kanban {
        columns: IndexMap<String, KanbanColumnDto<T>>,
        #[serde(rename = "totalCount", default)]
        total_count: Option<usize>,
    },
    Cursor {
        results: Vec<T>,
        #[serde(rename = "nextCursor", default)]
        next_cursor: Option<String>,
        #[serde(rename = "hasNextPage")]
        has_next_page: bool,
    },
    Paged {
        results: Vec<T>,
        #[serde(default)]
        page: u32,
        #[serde(rename = "totalPage", default)]
        total_page: u32,
        #[serde(rename = "additionalData", default)]
        additional_data: Option<serde_json::Value>,
    },
}

impl<T, D: From<T>> From<ListViewDto<T>> for ListView<D> {
    fn from(value: ListViewDto<T>) -> Self {
        match value {
            ListViewDto::Kanban {
                columns,
                total_count,
            } => {
                let columns: IndexMap<String, KanbanColumn<D>> = columns
                    .into_iter()
                    .map(|(key, column)| {
                        let items: Vec<D> = column.items.into_iter().map(D::from).collect();
                        let column = KanbanColumn {
                            title: column.title,
                            total_count: column.total_count.unwrap_or(items.len()),
                            items,
                        };
                        (key, column)
                    })
                    .collect();
                let total_count = total_count
                    .unwrap_or_else(|| columns.values().map(|column| column.total_count).sum());

                ListView::Kanban(KanbanBoard {
                    columns,
                    total_count,
                })
            }
            ListViewDto::Cursor {
                results,
                next_cursor,
                has_next_page,
            } => ListView::Cursor(CursorPage {
                results: results.into_iter().map(D::from).collect(),
                next_cursor: next_cursor.filter(|cursor| !cursor.is_empty()),
                has_next_page,
            }),
            ListViewDto::Paged {
                results,
                page,
                total_page,
                additional_data,
            } => ListView::Paged(Page {
                results: results.into_iter().map(D::from).collect(),
                page,
                total_page,
                additional_data: additional_data.and_then(raw_additional_data),
            }),
        }
    }
}

/// The backend sends statistics as a JSON string, but tolerate an inline object too
fn raw_additional_data(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(raw) => Some(raw),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize, Debug, Clone, PartialEq)]
    struct Row {
        id: i64,
    }

    fn decode(value: serde_json::Value) -> ListView<Row> {
        let dto: ListViewDto<Row> = serde_json::from_value(value).expect("view should decode");
        dto.into()
    }

    #[test]
    fn decodes_board() {
        let view = decode(json!({
            "columns": {
                "todo": { "title": "To Do", "items": [{"id": 1}, {"id": 2}], "totalCount": 2 },
                "done": { "title": "Done", "items": [{"id": 9}] }
            }
        }));

        let ListView::Kanban(board) = view else {
            panic!("Expected a board, got {view:#?}");
        };
        assert_eq!(vec!["todo", "done"], board.columns.keys().collect::<Vec<_>>());
        assert_eq!(1, board.columns["done"].total_count);
        assert_eq!(3, board.total_count);
    }

    #[test]
    fn decodes_cursor_page() {
        let view = decode(json!({
            "results": [{"id": 4}],
            "nextCursor": "",
            "hasNextPage": false
        }));

        let ListView::Cursor(page) = view else {
            panic!("Expected a cursor page, got {view:#?}");
        };
        assert_eq!(None, page.next_cursor);
        assert!(!page.has_next_page);
    }

    #[test]
    fn decodes_numbered_page_with_statistics() {
        let view = decode(json!({
            "results": [{"id": 4}, {"id": 5}],
            "page": 2,
            "totalPage": 7,
            "additionalData": "{\"expenseBreakdown\":null}"
        }));

        let ListView::Paged(page) = view else {
            panic!("Expected a numbered page, got {view:#?}");
        };
        assert_eq!(2, page.page);
        assert_eq!(7, page.total_page);
        assert_eq!(Some("{\"expenseBreakdown\":null}".to_owned()), page.additional_data);
    }

    #[test]
    fn rejects_unknown_shape() {
        let decoded = serde_json::from_value::<ListViewDto<Row>>(json!({ "rows": [] }));
        assert!(decoded.is_err());
    }
}
