use serde::{Deserialize, Serialize};
use std::fmt;

/// Classes the school runs. Anything outside this set is rejected before it
/// reaches storage.
pub const CLASSES: [i64; 5] = [6, 7, 8, 9, 10];

pub fn is_known_class(class: i64) -> bool {
    CLASSES.contains(&class)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Staff,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Staff => "Staff",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "Admin" => Some(Role::Admin),
            "Staff" => Some(Role::Staff),
            _ => None,
        }
    }

    /// Landing route the presentation layer redirects to after login.
    pub fn home_route(self) -> &'static str {
        match self {
            Role::Admin => "/admin-dashboard",
            Role::Staff => "/staff-dashboard",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Assigned by storage; `None` until inserted.
    pub id: Option<i64>,
    pub name: String,
    pub role: Role,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub student_id: i64,
    pub name: String,
    pub class: i64,
    pub roll_no: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
        }
    }

    pub fn parse(s: &str) -> Option<AttendanceStatus> {
        match s {
            "Present" => Some(AttendanceStatus::Present),
            "Absent" => Some(AttendanceStatus::Absent),
            _ => None,
        }
    }

    pub fn from_present(present: bool) -> AttendanceStatus {
        if present {
            AttendanceStatus::Present
        } else {
            AttendanceStatus::Absent
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One student's mark for one day. `name` and `class` are copies of the
/// roster entry at the time of marking and are never refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: Option<i64>,
    pub student_id: i64,
    pub name: String,
    pub class: i64,
    pub date: String,
    pub status: AttendanceStatus,
}

/// Either a single class or the whole roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassFilter {
    All,
    Class(i64),
}

impl ClassFilter {
    pub fn matches(self, class: i64) -> bool {
        match self {
            ClassFilter::All => true,
            ClassFilter::Class(c) => c == class,
        }
    }

    /// Accepts `"all"`, a class number, or a numeric string.
    pub fn from_json(v: &serde_json::Value) -> Option<ClassFilter> {
        if let Some(n) = v.as_i64() {
            return Some(ClassFilter::Class(n));
        }
        let s = v.as_str()?.trim();
        if s.eq_ignore_ascii_case("all") {
            return Some(ClassFilter::All);
        }
        s.parse::<i64>().ok().map(ClassFilter::Class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn class_filter_accepts_all_and_numbers() {
        assert_eq!(ClassFilter::from_json(&json!("all")), Some(ClassFilter::All));
        assert_eq!(ClassFilter::from_json(&json!("ALL")), Some(ClassFilter::All));
        assert_eq!(ClassFilter::from_json(&json!(7)), Some(ClassFilter::Class(7)));
        assert_eq!(ClassFilter::from_json(&json!("8")), Some(ClassFilter::Class(8)));
        assert_eq!(ClassFilter::from_json(&json!("eight")), None);
        assert_eq!(ClassFilter::from_json(&json!(null)), None);
    }

    #[test]
    fn records_serialize_camel_case() {
        let s = Student {
            student_id: 3,
            name: "Karthick".to_string(),
            class: 6,
            roll_no: 603,
        };
        let v = serde_json::to_value(&s).expect("serialize");
        assert_eq!(v["studentId"], 3);
        assert_eq!(v["rollNo"], 603);

        let u = User {
            id: Some(1),
            name: "Admin1".to_string(),
            role: Role::Admin,
            password: "admin123".to_string(),
        };
        let v = serde_json::to_value(&u).expect("serialize");
        assert_eq!(v["role"], "Admin");
    }
}
