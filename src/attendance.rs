use crate::error::{DataError, DataResult};
use crate::models::{AttendanceRecord, AttendanceStatus, ClassFilter, Student};
use crate::roster;
use crate::store::{self, IndexQuery};
use chrono::{Datelike, NaiveDate};
use rusqlite::Connection;
use serde::{Serialize, Serializer};
use std::collections::HashMap;

pub fn parse_date(date: &str) -> DataResult<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| DataError::validation(format!("date must be YYYY-MM-DD, got {date:?}")))
}

/// `[first day of month, first day of next month)` as ISO date strings.
pub fn month_bounds(year_month: &str) -> DataResult<(String, String)> {
    let bad = || DataError::validation(format!("month must be YYYY-MM, got {year_month:?}"));
    let (y, m) = year_month.trim().split_once('-').ok_or_else(bad)?;
    let year: i32 = y.parse().map_err(|_| bad())?;
    let month: u32 = m.parse().map_err(|_| bad())?;
    let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(bad)?;
    let next = if start.month() == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(bad)?;
    Ok((
        start.format("%Y-%m-%d").to_string(),
        next.format("%Y-%m-%d").to_string(),
    ))
}

// ── Marking ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetRow {
    #[serde(flatten)]
    pub student: Student,
    pub present: bool,
}

/// A class roster laid out for marking, with running totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSheet {
    pub class: i64,
    pub rows: Vec<SheetRow>,
    pub total: usize,
    pub present: usize,
    pub absent: usize,
}

/// Students missing from `statuses` count as present.
pub fn open_sheet(
    conn: &Connection,
    class: i64,
    statuses: &HashMap<i64, bool>,
) -> DataResult<AttendanceSheet> {
    roster::validate_class(class)?;
    let students = roster::list_by_class(conn, ClassFilter::Class(class))?;
    let rows: Vec<SheetRow> = students
        .into_iter()
        .map(|s| {
            let present = statuses.get(&s.student_id).copied().unwrap_or(true);
            SheetRow { student: s, present }
        })
        .collect();
    let present = rows.iter().filter(|r| r.present).count();
    Ok(AttendanceSheet {
        class,
        total: rows.len(),
        present,
        absent: rows.len() - present,
        rows,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkFailure {
    pub student_id: i64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkOutcome {
    pub class: i64,
    pub date: String,
    pub requested: usize,
    pub inserted: usize,
    pub record_ids: Vec<i64>,
    pub failures: Vec<MarkFailure>,
    /// Records that already existed for this class and date before the batch.
    pub previously_recorded: usize,
}

impl MarkOutcome {
    pub fn is_complete(&self) -> bool {
        self.inserted == self.requested
    }
}

/// Appends one record per student currently in `class`.
///
/// Each insert stands alone: a failure midway is recorded in the outcome
/// and the records already written stay. Resubmitting a date appends a
/// second set of rows; `previously_recorded` tells the caller it happened.
pub fn mark_attendance(
    conn: &Connection,
    class: i64,
    date: &str,
    statuses: &HashMap<i64, bool>,
) -> DataResult<MarkOutcome> {
    roster::validate_class(class)?;
    let date = parse_date(date)?.format("%Y-%m-%d").to_string();
    let students = roster::list_by_class(conn, ClassFilter::Class(class))?;

    let previously_recorded = query_by_date(conn, &date)?
        .iter()
        .filter(|r| r.class == class)
        .count();
    if previously_recorded > 0 {
        tracing::warn!(
            class,
            date = %date,
            previously_recorded,
            "attendance already recorded for this class and date; appending another submission"
        );
    }

    let unknown = statuses
        .keys()
        .filter(|id| !students.iter().any(|s| s.student_id == **id))
        .count();
    if unknown > 0 {
        tracing::debug!(class, unknown, "ignoring statuses for students not in class");
    }

    let mut outcome = MarkOutcome {
        class,
        date: date.clone(),
        requested: students.len(),
        inserted: 0,
        record_ids: Vec::new(),
        failures: Vec::new(),
        previously_recorded,
    };
    for s in &students {
        let present = statuses.get(&s.student_id).copied().unwrap_or(true);
        let record = AttendanceRecord {
            id: None,
            student_id: s.student_id,
            name: s.name.clone(),
            class: s.class,
            date: date.clone(),
            status: AttendanceStatus::from_present(present),
        };
        match store::add(conn, &record) {
            Ok(saved) => {
                outcome.inserted += 1;
                outcome.record_ids.extend(saved.id);
            }
            Err(e) => {
                tracing::warn!(student_id = s.student_id, error = %e, "attendance insert failed");
                outcome.failures.push(MarkFailure {
                    student_id: s.student_id,
                    message: e.to_string(),
                });
            }
        }
    }

    if outcome.is_complete() {
        tracing::info!(class, date = %date, inserted = outcome.inserted, "attendance saved");
    } else {
        tracing::warn!(
            class,
            date = %date,
            requested = outcome.requested,
            inserted = outcome.inserted,
            "attendance saved partially"
        );
    }
    Ok(outcome)
}

// ── Reports ─────────────────────────────────────────────────

/// Records dated within `[start, end]`, optionally narrowed to one class.
pub fn query_by_date_range(
    conn: &Connection,
    start: &str,
    end: &str,
    filter: ClassFilter,
) -> DataResult<Vec<AttendanceRecord>> {
    let start = parse_date(start)?;
    let end = parse_date(end)?;
    if start > end {
        return Ok(Vec::new());
    }
    let records: Vec<AttendanceRecord> = store::get_by_index(
        conn,
        "Date",
        &IndexQuery::inclusive(
            start.format("%Y-%m-%d").to_string(),
            end.format("%Y-%m-%d").to_string(),
        ),
    )?;
    Ok(records.into_iter().filter(|r| filter.matches(r.class)).collect())
}

/// Records for one day, ordered by class, then name.
pub fn query_by_date(conn: &Connection, date: &str) -> DataResult<Vec<AttendanceRecord>> {
    let date = parse_date(date)?.format("%Y-%m-%d").to_string();
    let mut records: Vec<AttendanceRecord> =
        store::get_by_index(conn, "Date", &IndexQuery::eq(date))?;
    records.sort_by(|a, b| a.class.cmp(&b.class).then_with(|| a.name.cmp(&b.name)));
    Ok(records)
}

/// Present share of a student's records, or not applicable without any.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Percentage {
    Value(f64),
    NotApplicable,
}

impl Percentage {
    pub fn of(present: usize, total: usize) -> Percentage {
        if total == 0 {
            return Percentage::NotApplicable;
        }
        let raw = present as f64 / total as f64 * 100.0;
        Percentage::Value((raw * 100.0).round() / 100.0)
    }
}

impl std::fmt::Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Percentage::Value(v) => write!(f, "{v:.2}"),
            Percentage::NotApplicable => f.write_str("N/A"),
        }
    }
}

impl Serialize for Percentage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Percentage::Value(v) => serializer.serialize_f64(*v),
            Percentage::NotApplicable => serializer.serialize_str("N/A"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRow {
    #[serde(flatten)]
    pub student: Student,
    pub total_days: usize,
    pub present: usize,
    pub absent: usize,
    pub percentage: Percentage,
}

/// Per-student totals for `year_month` (`YYYY-MM`) across the current
/// roster of `class`, ordered by student id. Every stored record counts, so
/// a day submitted twice counts twice.
pub fn monthly_summary(
    conn: &Connection,
    year_month: &str,
    class: i64,
) -> DataResult<Vec<MonthlyRow>> {
    roster::validate_class(class)?;
    let (start, next) = month_bounds(year_month)?;
    let mut students: Vec<Student> =
        store::get_by_index(conn, "Class", &IndexQuery::eq(class))?;
    students.sort_by_key(|s| s.student_id);

    let records: Vec<AttendanceRecord> =
        store::get_by_index(conn, "Date", &IndexQuery::half_open(start, next))?;
    let mut by_student: HashMap<i64, (usize, usize)> = HashMap::new();
    for r in &records {
        let e = by_student.entry(r.student_id).or_insert((0, 0));
        e.0 += 1;
        if r.status == AttendanceStatus::Present {
            e.1 += 1;
        }
    }

    Ok(students
        .into_iter()
        .map(|s| {
            let (total, present) = by_student.get(&s.student_id).copied().unwrap_or((0, 0));
            MonthlyRow {
                student: s,
                total_days: total,
                present,
                absent: total - present,
                percentage: Percentage::of(present, total),
            }
        })
        .collect())
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

    fn put(conn: &Connection, student_id: i64, class: i64, date: &str, status: AttendanceStatus) {
        store::add(
            conn,
            &AttendanceRecord {
                id: None,
                student_id,
                name: format!("Student {student_id}"),
                class,
                date: date.to_string(),
                status,
            },
        )
        .expect("add record");
    }

    #[test]
    fn month_bounds_roll_over_year() {
        assert_eq!(
            month_bounds("2025-10").expect("oct"),
            ("2025-10-01".to_string(), "2025-11-01".to_string())
        );
        assert_eq!(
            month_bounds("2025-12").expect("dec"),
            ("2025-12-01".to_string(), "2026-01-01".to_string())
        );
        assert!(month_bounds("2025-13").is_err());
        assert!(month_bounds("October").is_err());
    }

    #[test]
    fn percentage_rounding_and_sentinel() {
        assert_eq!(Percentage::of(2, 3), Percentage::Value(66.67));
        assert_eq!(Percentage::of(1, 3), Percentage::Value(33.33));
        assert_eq!(Percentage::of(3, 3), Percentage::Value(100.0));
        assert_eq!(Percentage::of(0, 0), Percentage::NotApplicable);
        assert_eq!(
            serde_json::to_value(Percentage::NotApplicable).expect("json"),
            serde_json::json!("N/A")
        );
        assert_eq!(Percentage::of(0, 0).to_string(), "N/A");
    }

    #[test]
    fn mark_class_with_one_absent() {
        let conn = seeded();
        let mut statuses = HashMap::new();
        statuses.insert(5, false);
        let outcome = mark_attendance(&conn, 7, "2025-10-05", &statuses).expect("mark");
        assert_eq!(outcome.requested, 4);
        assert_eq!(outcome.inserted, 4);
        assert!(outcome.is_complete());
        assert_eq!(outcome.previously_recorded, 0);

        let day = query_by_date(&conn, "2025-10-05").expect("by date");
        assert_eq!(day.len(), 4);
        assert!(day.iter().all(|r| r.class == 7));
        let absent: Vec<&AttendanceRecord> =
            day.iter().filter(|r| r.status == AttendanceStatus::Absent).collect();
        assert_eq!(absent.len(), 1);
        assert_eq!(absent[0].student_id, 5);
        assert_eq!(absent[0].name, "Kishore");
    }

    #[test]
    fn resubmission_appends_and_is_reported() {
        let conn = seeded();
        let statuses = HashMap::new();
        mark_attendance(&conn, 6, "2025-10-06", &statuses).expect("first");
        let again = mark_attendance(&conn, 6, "2025-10-06", &statuses).expect("second");
        assert_eq!(again.previously_recorded, 4);
        assert_eq!(query_by_date(&conn, "2025-10-06").expect("day").len(), 8);

        let summary = monthly_summary(&conn, "2025-10", 6).expect("summary");
        assert!(summary.iter().all(|r| r.total_days == 2 && r.present == 2));
    }

    #[test]
    fn partial_batch_keeps_written_records() {
        let conn = seeded();
        conn.execute_batch(
            "CREATE TRIGGER reject_kishore BEFORE INSERT ON attendance
             WHEN NEW.student_id = 5
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .expect("trigger");
        let outcome = mark_attendance(&conn, 7, "2025-10-07", &HashMap::new()).expect("mark");
        assert_eq!(outcome.requested, 4);
        assert_eq!(outcome.inserted, 3);
        assert!(!outcome.is_complete());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].student_id, 5);
        assert_eq!(query_by_date(&conn, "2025-10-07").expect("day").len(), 3);
    }

    #[test]
    fn by_date_sorts_by_class_then_name() {
        let conn = seeded();
        mark_attendance(&conn, 8, "2025-10-08", &HashMap::new()).expect("8");
        mark_attendance(&conn, 6, "2025-10-08", &HashMap::new()).expect("6");
        let day = query_by_date(&conn, "2025-10-08").expect("day");
        let keys: Vec<(i64, &str)> = day.iter().map(|r| (r.class, r.name.as_str())).collect();
        assert_eq!(
            keys,
            vec![
                (6, "Arun Kumar"),
                (6, "Karthick"),
                (6, "Priyadharshini"),
                (6, "Ravi Teja"),
                (8, "Jamuna"),
                (8, "Kavimitraa"),
                (8, "Kavya"),
                (8, "Thulasi"),
            ]
        );
    }

    #[test]
    fn range_is_inclusive_and_filters_class() {
        let conn = seeded();
        put(&conn, 1, 6, "2025-10-01", AttendanceStatus::Present);
        put(&conn, 4, 7, "2025-10-02", AttendanceStatus::Present);
        put(&conn, 1, 6, "2025-10-03", AttendanceStatus::Absent);
        put(&conn, 1, 6, "2025-10-04", AttendanceStatus::Present);

        let all = query_by_date_range(&conn, "2025-10-01", "2025-10-03", ClassFilter::All)
            .expect("all");
        assert_eq!(all.len(), 3);
        let six = query_by_date_range(&conn, "2025-10-01", "2025-10-03", ClassFilter::Class(6))
            .expect("six");
        assert_eq!(six.len(), 2);
        let backwards = query_by_date_range(&conn, "2025-10-03", "2025-10-01", ClassFilter::All)
            .expect("backwards");
        assert!(backwards.is_empty());
        assert!(query_by_date_range(&conn, "2025/10/01", "2025-10-03", ClassFilter::All).is_err());
    }

    #[test]
    fn monthly_summary_ignores_other_months() {
        let conn = seeded();
        put(&conn, 1, 6, "2025-10-01", AttendanceStatus::Present);
        put(&conn, 1, 6, "2025-10-15", AttendanceStatus::Absent);
        put(&conn, 1, 6, "2025-10-31", AttendanceStatus::Present);
        put(&conn, 1, 6, "2025-11-01", AttendanceStatus::Absent);

        let rows = monthly_summary(&conn, "2025-10", 6).expect("summary");
        assert_eq!(
            rows.iter().map(|r| r.student.student_id).collect::<Vec<_>>(),
            vec![1, 2, 3, 11]
        );
        let arun = &rows[0];
        assert_eq!(arun.total_days, 3);
        assert_eq!(arun.present, 2);
        assert_eq!(arun.absent, 1);
        assert_eq!(arun.percentage, Percentage::Value(66.67));

        let other = &rows[1];
        assert_eq!(other.total_days, 0);
        assert_eq!(other.percentage, Percentage::NotApplicable);
    }

    #[test]
    fn sheet_defaults_to_present() {
        let conn = seeded();
        let mut statuses = HashMap::new();
        statuses.insert(13, false);
        let sheet = open_sheet(&conn, 7, &statuses).expect("sheet");
        assert_eq!(
            sheet.rows.iter().map(|r| r.student.roll_no).collect::<Vec<_>>(),
            vec![701, 702, 703, 704]
        );
        assert_eq!((sheet.total, sheet.present, sheet.absent), (4, 3, 1));
        assert!(!sheet.rows[0].present);
    }
}
