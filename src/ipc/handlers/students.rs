use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{
    get_class_filter, get_optional_str, get_optional_usize, get_required_i64, get_required_str,
    with_conn, ADMIN_ONLY, ANY_ROLE,
};
use crate::ipc::types::{AppState, Request};
use crate::models::ClassFilter;
use crate::query::{RosterView, SortDirection};
use crate::roster;
use rusqlite::Connection;
use serde_json::json;

fn students_list(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let filter = get_class_filter(params, "class")?;
    let students = roster::list_by_class(conn, filter)?;
    Ok(json!({ "students": students }))
}

fn students_add(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(params, "name")?;
    let class = get_required_i64(params, "class")?;
    let roll_no = get_required_i64(params, "rollNo")?;
    let student = roster::add_student(conn, &name, class, roll_no)?;
    Ok(json!({ "student": student }))
}

fn students_delete(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_i64(params, "studentId")?;
    let removed = roster::remove_student(conn, student_id)?;
    Ok(json!({ "ok": true, "student": removed }))
}

/// Applies the controls present in `params` to a copy of `view` and renders
/// it. `view` is only replaced once everything succeeded, so a rejected call
/// leaves the listing where it was. An explicit `page` is applied first so
/// that a class or search change in the same call still lands on page 1.
fn students_page(
    conn: &Connection,
    view: &mut RosterView,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let mut next = view.clone();
    if let Some(page) = get_optional_usize(params, "page")? {
        next.set_page(page);
    }
    if params.get("class").is_some() {
        next.set_class(get_class_filter(params, "class")?);
    }
    if params.get("column").is_some() || params.get("text").is_some() {
        let column = get_optional_str(params, "column")
            .map(str::to_string)
            .unwrap_or_else(|| next.column.clone());
        let text = get_optional_str(params, "text")
            .map(str::to_string)
            .unwrap_or_else(|| next.text.clone());
        next.set_search(&column, &text)?;
    }
    if params.get("sortKey").is_some() || params.get("direction").is_some() {
        let key = match params.get("sortKey") {
            Some(serde_json::Value::Null) => None,
            Some(v) => Some(
                v.as_str()
                    .ok_or_else(|| HandlerErr::bad_params("sortKey must be a string or null"))?
                    .to_string(),
            ),
            None => next.sort_key.clone(),
        };
        let direction = match get_optional_str(params, "direction") {
            Some(d) => SortDirection::parse(d)
                .ok_or_else(|| HandlerErr::bad_params("direction must be asc or desc"))?,
            None => next.direction,
        };
        next.set_sort(key.as_deref(), direction)?;
    }
    if let Some(size) = get_optional_usize(params, "pageSize")? {
        next.set_page_size(size)?;
    }

    let students = roster::list_by_class(conn, next.class)?;
    let page = next.render(&students)?;
    *view = next;
    Ok(json!({
        "class": match view.class {
            ClassFilter::All => json!("all"),
            ClassFilter::Class(c) => json!(c),
        },
        "column": view.column,
        "text": view.text,
        "sortKey": view.sort_key,
        "direction": view.direction,
        "page": page,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(with_conn(state, req, ANY_ROLE, |conn, _| {
            students_list(conn, &req.params)
        })),
        "students.add" => Some(with_conn(state, req, ADMIN_ONLY, |conn, _| {
            students_add(conn, &req.params)
        })),
        "students.delete" => Some(with_conn(state, req, ADMIN_ONLY, |conn, _| {
            students_delete(conn, &req.params)
        })),
        "students.page" => Some(with_conn(state, req, ADMIN_ONLY, |conn, state| {
            students_page(conn, &mut state.roster_view, &req.params)
        })),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::seed;

    fn seeded() -> Connection {
        let conn = db::open_in_memory().expect("open");
        seed::seed_defaults(&conn).expect("seed");
        conn
    }

    #[test]
    fn rejected_page_request_keeps_the_view() {
        let conn = seeded();
        let mut view = RosterView::default();
        students_page(&conn, &mut view, &json!({ "page": 2 })).expect("page 2");
        assert_eq!(view.page, 2);
        let before = view.clone();

        for params in [
            json!({ "class": 9, "column": "bogus", "text": "x" }),
            json!({ "class": 42 }),
            json!({ "text": "kav", "pageSize": 0 }),
            json!({ "class": 6, "sortKey": "age" }),
            json!({ "page": 1, "direction": "sideways" }),
        ] {
            assert!(students_page(&conn, &mut view, &params).is_err(), "{params}");
            assert_eq!(view, before, "{params}");
        }
    }

    #[test]
    fn accepted_page_request_updates_the_view() {
        let conn = seeded();
        let mut view = RosterView::default();
        let out = students_page(&conn, &mut view, &json!({ "class": "7", "text": "ka" }))
            .expect("page");
        assert_eq!(view.class, ClassFilter::Class(7));
        assert_eq!(view.text, "ka");
        assert_eq!(out["class"], json!(7));
        assert_eq!(out["page"]["totalRows"], json!(2));
    }
}
