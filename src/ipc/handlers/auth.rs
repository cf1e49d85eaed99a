use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::helpers::get_required_str;
use crate::ipc::types::{AppState, Request};
use crate::models::User;
use serde_json::json;

fn user_json(user: &User) -> serde_json::Value {
    json!({
        "name": user.name,
        "role": user.role,
        "homeRoute": user.role.home_route(),
    })
}

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let name = match get_required_str(&req.params, "name") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let password = match get_required_str(&req.params, "password") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    match state.session.login(conn, &name, &password) {
        Ok(user) => ok(&req.id, json!({ "user": user_json(&user) })),
        Err(e) => HandlerErr::from(e).response(&req.id),
    }
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match state.session.logout(conn) {
        Ok(()) => ok(&req.id, json!({ "homeRoute": "/" })),
        Err(e) => HandlerErr::from(e).response(&req.id),
    }
}

fn handle_current(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({ "user": state.session.user().map(user_json) }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.login" => Some(handle_login(state, req)),
        "auth.logout" => Some(handle_logout(state, req)),
        "auth.current" => Some(handle_current(state, req)),
        _ => None,
    }
}
