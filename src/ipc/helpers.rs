use crate::ipc::error::{err, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::models::{ClassFilter, Role};
use crate::roster;
use rusqlite::Connection;
use std::collections::HashMap;

pub const ANY_ROLE: &[Role] = &[Role::Admin, Role::Staff];
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_optional_str<'a>(params: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

/// Integers may arrive as JSON numbers or numeric strings (form values).
pub fn get_required_i64(params: &serde_json::Value, key: &str) -> Result<i64, HandlerErr> {
    let v = params
        .get(key)
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))?;
    if let Some(n) = v.as_i64() {
        return Ok(n);
    }
    v.as_str()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .ok_or_else(|| HandlerErr::bad_params(format!("{} must be an integer", key)))
}

pub fn get_optional_usize(
    params: &serde_json::Value,
    key: &str,
) -> Result<Option<usize>, HandlerErr> {
    if params.get(key).map(|v| v.is_null()).unwrap_or(true) {
        return Ok(None);
    }
    let n = get_required_i64(params, key)?;
    usize::try_from(n)
        .map(Some)
        .map_err(|_| HandlerErr::bad_params(format!("{} must not be negative", key)))
}

/// `"all"` or one of the known classes; an unknown class number is a
/// validation error rather than an empty listing.
pub fn get_class_filter(
    params: &serde_json::Value,
    key: &str,
) -> Result<ClassFilter, HandlerErr> {
    let v = params
        .get(key)
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))?;
    let filter = ClassFilter::from_json(v).ok_or_else(|| {
        HandlerErr::bad_params(format!("{} must be a class number or \"all\"", key))
    })?;
    if let ClassFilter::Class(c) = filter {
        roster::validate_class(c)?;
    }
    Ok(filter)
}

/// `{ "<studentId>": true|false, ... }`
pub fn get_status_map(
    params: &serde_json::Value,
    key: &str,
) -> Result<HashMap<i64, bool>, HandlerErr> {
    let Some(v) = params.get(key) else {
        return Ok(HashMap::new());
    };
    let obj = v
        .as_object()
        .ok_or_else(|| HandlerErr::bad_params(format!("{} must be an object", key)))?;
    let mut out = HashMap::with_capacity(obj.len());
    for (k, present) in obj {
        let student_id = k
            .trim()
            .parse::<i64>()
            .map_err(|_| HandlerErr::bad_params(format!("{} keys must be student ids", key)))?;
        let present = present
            .as_bool()
            .ok_or_else(|| HandlerErr::bad_params(format!("{}.{} must be a boolean", key, k)))?;
        out.insert(student_id, present);
    }
    Ok(out)
}

/// Runs `f` against the open workspace after the role check, and wraps the
/// outcome in a response envelope.
pub fn with_conn<F>(
    state: &mut AppState,
    req: &Request,
    roles: &[Role],
    f: F,
) -> serde_json::Value
where
    F: FnOnce(&Connection, &mut AppState) -> Result<serde_json::Value, HandlerErr>,
{
    let Some(conn) = state.db.take() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let allowed = state.session.require(roles).map(|_| ()).map_err(HandlerErr::from);
    let result = allowed.and_then(|()| f(&conn, state));
    state.db = Some(conn);
    match result {
        Ok(v) => super::error::ok(&req.id, v),
        Err(e) => {
            tracing::debug!(
                method = %req.method,
                code = e.code,
                message = %e.message,
                "request failed"
            );
            e.response(&req.id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn class_filter_accepts_known_classes_and_all() {
        let params = json!({ "a": "all", "b": 7, "c": "10" });
        assert_eq!(get_class_filter(&params, "a").ok(), Some(ClassFilter::All));
        assert_eq!(get_class_filter(&params, "b").ok(), Some(ClassFilter::Class(7)));
        assert_eq!(get_class_filter(&params, "c").ok(), Some(ClassFilter::Class(10)));
    }

    #[test]
    fn class_filter_rejects_unknown_classes() {
        let params = json!({ "big": 42, "low": "5", "word": "seven" });
        let code = |key: &str| get_class_filter(&params, key).err().map(|e| e.code);
        assert_eq!(code("big"), Some("validation_error"));
        assert_eq!(code("low"), Some("validation_error"));
        assert_eq!(code("word"), Some("bad_params"));
        assert_eq!(code("missing"), Some("bad_params"));
    }

    #[test]
    fn status_map_keys_must_be_ids() {
        let map = get_status_map(&json!({ "s": { "5": false, " 6 ": true } }), "s")
            .ok()
            .unwrap_or_default();
        assert_eq!(map.get(&5), Some(&false));
        assert_eq!(map.get(&6), Some(&true));
        assert!(get_status_map(&json!({ "s": { "x": true } }), "s").is_err());
        assert!(get_status_map(&json!({}), "s").map(|m| m.is_empty()).unwrap_or(false));
    }
}
