use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::query::RosterView;
use crate::seed;
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "schemaVersion": db::schema_version(),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "signedIn": state.session.user().is_some(),
            "session": state.session.label(),
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    let conn = match db::open_db(&path) {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "storage unavailable");
            return err(&req.id, "storage_unavailable", format!("{e:#}"), None);
        }
    };
    let seeded = match seed::seed_defaults(&conn) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "seeding failed");
            return err(&req.id, "storage_unavailable", e.to_string(), None);
        }
    };

    state.session.restore(&conn);
    state.roster_view = RosterView::default();
    state.workspace = Some(path.clone());
    state.db = Some(conn);
    tracing::info!(
        path = %path.display(),
        users = seeded.users,
        students = seeded.students,
        "workspace selected"
    );

    ok(
        &req.id,
        json!({
            "workspacePath": path.to_string_lossy(),
            "seeded": { "users": seeded.users, "students": seeded.students },
            "user": state.session.user().map(|u| json!({ "name": u.name, "role": u.role })),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
