use crate::attendance;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{
    get_class_filter, get_required_i64, get_required_str, get_status_map, with_conn, ANY_ROLE,
};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;

fn attendance_sheet(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class = get_required_i64(params, "class")?;
    let statuses = get_status_map(params, "statuses")?;
    let sheet = attendance::open_sheet(conn, class, &statuses)?;
    Ok(serde_json::to_value(sheet)?)
}

fn attendance_mark(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class = get_required_i64(params, "class")?;
    let date = get_required_str(params, "date")?;
    let statuses = get_status_map(params, "statuses")?;
    let outcome = attendance::mark_attendance(conn, class, &date, &statuses)?;
    let complete = outcome.is_complete();
    let mut v = serde_json::to_value(outcome)?;
    v["complete"] = json!(complete);
    Ok(v)
}

fn attendance_by_date(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let date = get_required_str(params, "date")?;
    let records = attendance::query_by_date(conn, &date)?;
    Ok(json!({ "records": records }))
}

fn attendance_range(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let start = get_required_str(params, "startDate")?;
    let end = get_required_str(params, "endDate")?;
    let filter = get_class_filter(params, "class")?;
    let records = attendance::query_by_date_range(conn, &start, &end, filter)?;
    Ok(json!({ "records": records }))
}

fn attendance_monthly(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let month = get_required_str(params, "month")?;
    let class = get_required_i64(params, "class")?;
    let rows = attendance::monthly_summary(conn, &month, class)?;
    Ok(json!({ "month": month, "class": class, "rows": rows }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handler: fn(&Connection, &serde_json::Value) -> Result<serde_json::Value, HandlerErr> =
        match req.method.as_str() {
            "attendance.sheet" => attendance_sheet,
            "attendance.mark" => attendance_mark,
            "attendance.byDate" => attendance_by_date,
            "attendance.range" => attendance_range,
            "attendance.monthly" => attendance_monthly,
            _ => return None,
        };
    Some(with_conn(state, req, ANY_ROLE, |conn, _| handler(conn, &req.params)))
}
