use crate::attendance::MonthlyRow;
use crate::models::{AttendanceRecord, Student};

/// Quoted CSV text field; embedded quotes are doubled.
fn csv_text(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

pub fn roster_csv(students: &[Student]) -> String {
    let mut csv = String::from("ID,Name,Class,Roll No\n");
    for s in students {
        csv.push_str(&format!(
            "{},{},{},{}\n",
            s.student_id,
            csv_text(&s.name),
            s.class,
            s.roll_no
        ));
    }
    csv
}

pub fn attendance_csv(records: &[AttendanceRecord]) -> String {
    let mut csv = String::from("ID,Student ID,Name,Class,Date,Status\n");
    for r in records {
        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            r.id.map(|v| v.to_string()).unwrap_or_default(),
            r.student_id,
            csv_text(&r.name),
            r.class,
            csv_text(&r.date),
            csv_text(r.status.as_str())
        ));
    }
    csv
}

pub fn monthly_csv(rows: &[MonthlyRow]) -> String {
    let mut csv = String::from("Student ID,Name,Roll No,Total Days,Present,Absent,Percentage\n");
    for r in rows {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            r.student.student_id,
            csv_text(&r.student.name),
            r.student.roll_no,
            r.total_days,
            r.present,
            r.absent,
            r.percentage
        ));
    }
    csv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::Percentage;
    use crate::models::AttendanceStatus;

    #[test]
    fn roster_rows_quote_names() {
        let csv = roster_csv(&[Student {
            student_id: 7,
            name: "Ravi \"RT\" Teja".to_string(),
            class: 6,
            roll_no: 604,
        }]);
        assert_eq!(csv, "ID,Name,Class,Roll No\n7,\"Ravi \"\"RT\"\" Teja\",6,604\n");
    }

    #[test]
    fn attendance_and_monthly_layout() {
        let csv = attendance_csv(&[AttendanceRecord {
            id: Some(3),
            student_id: 5,
            name: "Kishore".to_string(),
            class: 7,
            date: "2025-10-05".to_string(),
            status: AttendanceStatus::Absent,
        }]);
        assert_eq!(
            csv.lines().nth(1),
            Some("3,5,\"Kishore\",7,\"2025-10-05\",\"Absent\"")
        );

        let csv = monthly_csv(&[MonthlyRow {
            student: Student {
                student_id: 1,
                name: "Arun Kumar".to_string(),
                class: 6,
                roll_no: 601,
            },
            total_days: 0,
            present: 0,
            absent: 0,
            percentage: Percentage::NotApplicable,
        }]);
        assert_eq!(csv.lines().nth(1), Some("1,\"Arun Kumar\",601,0,0,0,N/A"));
    }
}
