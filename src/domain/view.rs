//! Cached list views and the optimistic edits that can be applied to them before the server
//! confirms a change.
//!
//! A list endpoint answers in one of three shapes. The shape is decided once when the response is
//! decoded (see [crate::dto::view]) and carried as a [ListView] variant from then on.

use crate::domain::task::TaskStatus;
use indexmap::IndexMap;
use tracing::warn;

/// Anything that can live in a cached list view
pub trait ViewItem: Clone {
    fn id(&self) -> i64;

    /// Title of the kanban column a freshly inserted item belongs in. [None] sends it to the
    /// board's first column.
    fn board_title(&self) -> Option<&'static str> {
        None
    }
}

/// Items that can be dragged between kanban columns
pub trait BoardItem: ViewItem {
    fn status(&self) -> TaskStatus;
    fn set_status(&mut self, status: TaskStatus);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Paged,
    Cursor,
    Kanban,
}

/// Page-number pagination
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub results: Vec<T>,
    pub page: u32,
    pub total_page: u32,
    /// Raw JSON the server attaches to some pages (expense statistics)
    pub additional_data: Option<String>,
}

/// Cursor pagination used by infinite scrolling
#[derive(Debug, Clone, PartialEq)]
pub struct CursorPage<T> {
    pub results: Vec<T>,
    pub next_cursor: Option<String>,
    pub has_next_page: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KanbanColumn<T> {
    pub title: String,
    pub items: Vec<T>,
    pub total_count: usize,
}

/// Board view: column key (e.g. "in_progress") to column, in server order
#[derive(Debug, Clone, PartialEq)]
pub struct KanbanBoard<T> {
    pub columns: IndexMap<String, KanbanColumn<T>>,
    pub total_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListView<T> {
    Paged(Page<T>),
    Cursor(CursorPage<T>),
    Kanban(KanbanBoard<T>),
}

/// What happened when an item was moved between kanban columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved { from: String, to: String },
    /// The item isn't in the view. Nothing changed.
    NotFound,
    /// The status maps to a column the board doesn't have. The board was left as it was.
    TargetMissing { target: String },
    /// Flat views have no columns, so only the item's status was rewritten
    StatusUpdated,
}

impl<T: ViewItem> ListView<T> {
    pub fn kind(&self) -> ViewKind {
        match self {
            Self::Paged(_) => ViewKind::Paged,
            Self::Cursor(_) => ViewKind::Cursor,
            Self::Kanban(_) => ViewKind::Kanban,
        }
    }

    /// Every item in the view, column by column for boards
    pub fn items(&self) -> Vec<&T> {
        match self {
            Self::Paged(page) => page.results.iter().collect(),
            Self::Cursor(page) => page.results.iter().collect(),
            Self::Kanban(board) => board
                .columns
                .values()
                .flat_map(|column| column.items.iter())
                .collect(),
        }
    }

    pub fn find(&self, id: i64) -> Option<&T> {
        self.items().into_iter().find(|item| item.id() == id)
    }

    /// Adds an item. Flat views append it; boards put it at the top of its default column.
    pub fn insert(&mut self, item: T) {
        match self {
            Self::Paged(page) => page.results.push(item),
            Self::Cursor(page) => page.results.push(item),
            Self::Kanban(board) => board.insert(item),
        }
    }

    /// Applies [update] to the item with the given ID wherever it is. Returns whether it was found.
    pub fn update(&mut self, id: i64, update: impl FnOnce(&mut T)) -> bool {
        let target = match self {
            Self::Paged(page) => page.results.iter_mut().find(|item| item.id() == id),
            Self::Cursor(page) => page.results.iter_mut().find(|item| item.id() == id),
            Self::Kanban(board) => board
                .columns
                .values_mut()
                .flat_map(|column| column.items.iter_mut())
                .find(|item| item.id() == id),
        };

        match target {
            Some(item) => {
                update(item);
                true
            }
            None => false,
        }
    }

    /// Replaces the item that has the same ID as [replacement]
    pub fn replace(&mut self, replacement: T) -> bool {
        self.update(replacement.id(), |item| *item = replacement)
    }

    /// Removes the item with the given ID and returns it
    pub fn remove(&mut self, id: i64) -> Option<T> {
        match self {
            Self::Paged(page) => take_by_id(&mut page.results, id),
            Self::Cursor(page) => take_by_id(&mut page.results, id),
            Self::Kanban(board) => board.remove(id).map(|(_, item)| item),
        }
    }

    /// Appends the next cursor page to this one. Only cursor views can be extended; other shapes
    /// are left untouched and `false` is returned.
    pub fn merge_next_page(&mut self, next: CursorPage<T>) -> bool {
        let Self::Cursor(page) = self else {
            return false;
        };

        page.results.extend(next.results);
        page.next_cursor = next.next_cursor;
        page.has_next_page = next.has_next_page;
        true
    }
}

impl<T: BoardItem> ListView<T> {
    /// Moves an item to the column for [status]. On flat views this only rewrites the status.
    pub fn move_to(&mut self, id: i64, status: TaskStatus) -> MoveOutcome {
        match self {
            Self::Kanban(board) => board.move_to(id, status),
            flat => {
                if flat.update(id, |item| item.set_status(status)) {
                    MoveOutcome::StatusUpdated
                } else {
                    MoveOutcome::NotFound
                }
            }
        }
    }
}

impl<T: ViewItem> KanbanBoard<T> {
    fn insert(&mut self, item: T) {
        let by_title = item.board_title().and_then(|title| {
            self.columns
                .iter()
                .position(|(_, column)| column.title == title)
        });
        let Some(index) = by_title.or(if self.columns.is_empty() { None } else { Some(0) }) else {
            warn!("Board has no columns, dropping optimistic insert of {}", item.id());
            return;
        };

        if let Some((_, column)) = self.columns.get_index_mut(index) {
            column.items.insert(0, item);
            column.total_count += 1;
            self.total_count += 1;
        }
    }

    /// Removes an item from whichever column holds it, returning the column key and the item
    fn remove(&mut self, id: i64) -> Option<(String, T)> {
        for (key, column) in self.columns.iter_mut() {
            if let Some(item) = take_by_id(&mut column.items, id) {
                column.total_count = column.total_count.saturating_sub(1);
                self.total_count = self.total_count.saturating_sub(1);
                return Some((key.clone(), item));
            }
        }

        None
    }

    /// Key of the column currently holding the item
    pub fn column_of(&self, id: i64) -> Option<&str> {
        self.columns
            .iter()
            .find(|(_, column)| column.items.iter().any(|item| item.id() == id))
            .map(|(key, _)| key.as_str())
    }
}

impl<T: BoardItem> KanbanBoard<T> {
    fn move_to(&mut self, id: i64, status: TaskStatus) -> MoveOutcome {
        let target = status.column_key();
        if !self.columns.contains_key(target) {
            warn!("Target column \"{target}\" not found for status \"{status}\"");
            return MoveOutcome::TargetMissing {
                target: target.to_owned(),
            };
        }

        let Some((from, mut item)) = self.remove(id) else {
            return MoveOutcome::NotFound;
        };
        item.set_status(status);

        if let Some(column) = self.columns.get_mut(target) {
            column.items.push(item);
            column.total_count += 1;
            self.total_count += 1;
        }

        MoveOutcome::Moved {
            from,
            to: target.to_owned(),
        }
    }
}

fn take_by_id<T: ViewItem>(items: &mut Vec<T>, id: i64) -> Option<T> {
    let index = items.iter().position(|item| item.id() == id)?;
    Some(items.remove(index))
}
