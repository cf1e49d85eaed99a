use crate::attendance;
use crate::export;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{
    get_class_filter, get_optional_str, get_required_i64, get_required_str, with_conn, ANY_ROLE,
};
use crate::ipc::types::{AppState, Request};
use crate::roster;
use rusqlite::Connection;
use serde_json::json;
use std::path::PathBuf;

/// Renders one report to CSV. Attendance exports take either `date` or a
/// `startDate`/`endDate` range.
fn render_report(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<(String, usize), HandlerErr> {
    let report = get_required_str(params, "report")?;
    match report.as_str() {
        "roster" => {
            let students = roster::list_by_class(conn, get_class_filter(params, "class")?)?;
            Ok((export::roster_csv(&students), students.len()))
        }
        "attendance" => {
            let records = if let Some(date) = get_optional_str(params, "date") {
                attendance::query_by_date(conn, date)?
            } else {
                let start = get_required_str(params, "startDate")?;
                let end = get_required_str(params, "endDate")?;
                let filter = get_class_filter(params, "class")?;
                attendance::query_by_date_range(conn, &start, &end, filter)?
            };
            Ok((export::attendance_csv(&records), records.len()))
        }
        "monthly" => {
            let month = get_required_str(params, "month")?;
            let class = get_required_i64(params, "class")?;
            let rows = attendance::monthly_summary(conn, &month, class)?;
            Ok((export::monthly_csv(&rows), rows.len()))
        }
        other => Err(HandlerErr::bad_params(format!(
            "unknown report: {other} (expected roster, attendance or monthly)"
        ))),
    }
}

fn export_csv(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let (csv, rows) = render_report(conn, params)?;
    let Some(out_path) = get_optional_str(params, "outPath").map(PathBuf::from) else {
        return Ok(json!({ "rows": rows, "csv": csv }));
    };

    let write = || -> std::io::Result<()> {
        if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&out_path, csv.as_bytes())
    };
    if let Err(e) = write() {
        tracing::error!(path = %out_path.display(), error = %e, "csv export failed");
        return Err(HandlerErr::new("io_failed", e.to_string()));
    }
    tracing::info!(path = %out_path.display(), rows, "csv exported");
    Ok(json!({
        "rows": rows,
        "path": out_path.to_string_lossy(),
        "bytes": csv.len(),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "export.csv" => Some(with_conn(state, req, ANY_ROLE, |conn, _| {
            export_csv(conn, &req.params)
        })),
        _ => None,
    }
}
