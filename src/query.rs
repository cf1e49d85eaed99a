//! In-memory search → sort → paginate pipeline for tabular listings, and
//! the control state that decides when the current page resets.

use crate::error::{DataError, DataResult};
use crate::models::{ClassFilter, Student};
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell<'a> {
    Int(i64),
    Text(&'a str),
}

impl Cell<'_> {
    fn contains_ci(&self, needle_lower: &str) -> bool {
        match self {
            Cell::Int(v) => v.to_string().contains(needle_lower),
            Cell::Text(s) => s.to_lowercase().contains(needle_lower),
        }
    }

    fn compare(&self, other: &Cell<'_>) -> Ordering {
        match (self, other) {
            (Cell::Int(a), Cell::Int(b)) => a.cmp(b),
            (Cell::Text(a), Cell::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
            (Cell::Int(_), Cell::Text(_)) => Ordering::Less,
            (Cell::Text(_), Cell::Int(_)) => Ordering::Greater,
        }
    }
}

/// A record that can be shown as a table row.
pub trait Tabular {
    const COLUMNS: &'static [&'static str];
    fn cell(&self, column: &str) -> Option<Cell<'_>>;
}

impl Tabular for Student {
    const COLUMNS: &'static [&'static str] = &["studentId", "name", "class", "rollNo"];

    fn cell(&self, column: &str) -> Option<Cell<'_>> {
        match column {
            "studentId" => Some(Cell::Int(self.student_id)),
            "name" => Some(Cell::Text(&self.name)),
            "class" => Some(Cell::Int(self.class)),
            "rollNo" => Some(Cell::Int(self.roll_no)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(s: &str) -> Option<SortDirection> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    pub column: String,
    pub text: String,
    pub sort_key: Option<String>,
    pub direction: SortDirection,
    pub page: usize,
    pub page_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_rows: usize,
    pub total_pages: usize,
}

fn check_column<T: Tabular>(column: &str) -> DataResult<()> {
    if T::COLUMNS.contains(&column) {
        Ok(())
    } else {
        Err(DataError::validation(format!(
            "unknown column {column}; expected one of {:?}",
            T::COLUMNS
        )))
    }
}

pub fn total_pages(total_rows: usize, page_size: usize) -> usize {
    total_rows.div_ceil(page_size.max(1))
}

/// Filters on a case-insensitive substring of `column`, stable-sorts, then
/// slices out page `page` (1-based). Always recomputed from `records`.
pub fn search_sort_paginate<T: Tabular + Clone>(
    records: &[T],
    q: &TableQuery,
) -> DataResult<Page<T>> {
    check_column::<T>(&q.column)?;
    if let Some(k) = &q.sort_key {
        check_column::<T>(k)?;
    }
    if q.page_size == 0 {
        return Err(DataError::validation("pageSize must be at least 1"));
    }

    let needle = q.text.trim().to_lowercase();
    let mut rows: Vec<&T> = records
        .iter()
        .filter(|r| {
            needle.is_empty()
                || r
                    .cell(&q.column)
                    .map(|c| c.contains_ci(&needle))
                    .unwrap_or(false)
        })
        .collect();

    if let Some(key) = &q.sort_key {
        rows.sort_by(|a, b| {
            let ord = match (a.cell(key), b.cell(key)) {
                (Some(x), Some(y)) => x.compare(&y),
                _ => Ordering::Equal,
            };
            match q.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
    }

    let page = q.page.max(1);
    let total_rows = rows.len();
    let start = (page - 1).saturating_mul(q.page_size);
    let rows: Vec<T> = rows
        .into_iter()
        .skip(start)
        .take(q.page_size)
        .cloned()
        .collect();

    Ok(Page {
        rows,
        page,
        page_size: q.page_size,
        total_rows,
        total_pages: total_pages(total_rows, q.page_size),
    })
}

pub const DEFAULT_PAGE_SIZE: usize = 8;

/// Control state behind a paged roster listing.
///
/// The page goes back to 1 when the set being paged changes (class filter,
/// search column, search text). Page size and sort changes keep the page
/// number and only clamp it into range on the next render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterView {
    pub class: ClassFilter,
    pub column: String,
    pub text: String,
    pub sort_key: Option<String>,
    pub direction: SortDirection,
    pub page: usize,
    pub page_size: usize,
}

impl Default for RosterView {
    fn default() -> Self {
        RosterView {
            class: ClassFilter::All,
            column: "name".to_string(),
            text: String::new(),
            sort_key: Some("rollNo".to_string()),
            direction: SortDirection::Asc,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl RosterView {
    pub fn set_class(&mut self, class: ClassFilter) {
        if self.class != class {
            self.class = class;
            self.page = 1;
        }
    }

    pub fn set_search(&mut self, column: &str, text: &str) -> DataResult<()> {
        check_column::<Student>(column)?;
        if self.column != column || self.text != text {
            self.column = column.to_string();
            self.text = text.to_string();
            self.page = 1;
        }
        Ok(())
    }

    pub fn set_sort(&mut self, key: Option<&str>, direction: SortDirection) -> DataResult<()> {
        if let Some(k) = key {
            check_column::<Student>(k)?;
        }
        self.sort_key = key.map(str::to_string);
        self.direction = direction;
        Ok(())
    }

    pub fn set_page_size(&mut self, page_size: usize) -> DataResult<()> {
        if page_size == 0 {
            return Err(DataError::validation("pageSize must be at least 1"));
        }
        self.page_size = page_size;
        Ok(())
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn query(&self) -> TableQuery {
        TableQuery {
            column: self.column.clone(),
            text: self.text.clone(),
            sort_key: self.sort_key.clone(),
            direction: self.direction,
            page: self.page,
            page_size: self.page_size,
        }
    }

    /// Runs the pipeline over `students`, first clamping the current page
    /// into `1..=totalPages` for the filtered set.
    pub fn render(&mut self, students: &[Student]) -> DataResult<Page<Student>> {
        let mut probe = self.query();
        probe.page = 1;
        let first = search_sort_paginate(students, &probe)?;
        let last = first.total_pages.max(1);
        if self.page > last {
            self.page = last;
        }
        if self.page == 1 {
            return Ok(first);
        }
        search_sort_paginate(students, &self.query())
    }
}
