use crate::error::{DataError, DataResult};
use crate::models::{is_known_class, ClassFilter, Student, CLASSES};
use crate::store::{self, Collection, StoreError};
use lazy_static::lazy_static;
use regex::Regex;
use rusqlite::Connection;

const MIN_NAME_LEN: usize = 6;

pub fn validate_name(name: &str) -> DataResult<()> {
    lazy_static! {
        static ref NAME_RE: Regex = Regex::new(r"^[A-Za-z\s]+$").expect("name pattern");
    }
    if name.trim().chars().count() < MIN_NAME_LEN {
        return Err(DataError::validation(format!(
            "Full Name must be at least {MIN_NAME_LEN} characters long."
        )));
    }
    if !NAME_RE.is_match(name) {
        return Err(DataError::validation(
            "Full Name must contain only alphabets and spaces.",
        ));
    }
    Ok(())
}

pub fn validate_class(class: i64) -> DataResult<()> {
    if !is_known_class(class) {
        return Err(DataError::validation(format!(
            "class must be one of {CLASSES:?}"
        )));
    }
    Ok(())
}

fn validate_roll_no(roll_no: i64) -> DataResult<()> {
    if roll_no <= 0 {
        return Err(DataError::validation("roll no must be a positive number"));
    }
    Ok(())
}

/// Adds a student under the next free id (`max + 1`).
///
/// Input is validated and the (class, roll no) pair is checked against the
/// unique index before anything is written; a failed check leaves the
/// roster untouched.
pub fn add_student(
    conn: &Connection,
    name: &str,
    class: i64,
    roll_no: i64,
) -> DataResult<Student> {
    validate_name(name)?;
    validate_class(class)?;
    validate_roll_no(roll_no)?;

    let existing: Option<Student> = store::get_unique(conn, "ClassAndRollNo", (class, roll_no))?;
    if existing.is_some() {
        return Err(DataError::DuplicateRollNo { class, roll_no });
    }

    let student_id = store::max_key::<Student>(conn)?.unwrap_or(0) + 1;
    let student = store::add(
        conn,
        &Student {
            student_id,
            name: name.to_string(),
            class,
            roll_no,
        },
    )?;
    tracing::info!(student_id, class, roll_no, "student added");
    Ok(student)
}

/// Students of one class (or everyone), ordered by roll number.
pub fn list_by_class(conn: &Connection, filter: ClassFilter) -> DataResult<Vec<Student>> {
    let mut students: Vec<Student> = match filter {
        ClassFilter::All => store::get_all(conn)?,
        ClassFilter::Class(c) => store::get_by_index(conn, "Class", &store::IndexQuery::eq(c))?,
    };
    students.sort_by_key(|s| s.roll_no);
    Ok(students)
}

/// Deletes a student and hands back the record that was removed.
pub fn remove_student(conn: &Connection, student_id: i64) -> DataResult<Student> {
    let student: Student = store::get_by_key(conn, student_id)?.ok_or(StoreError::NotFound {
        collection: Student::NAME,
        key: student_id,
    })?;
    store::delete_by_key::<Student>(conn, student_id)?;
    tracing::info!(student_id, class = student.class, "student removed");
    Ok(student)
}
