//! CSV roster export. Builds the same tabular view the dashboard's
//! download buttons produce, with the status column derived through
//! [`calc::derive_status`] like every other caller.

use chrono::NaiveDate;

use crate::calc::{self, Status};
use crate::model::{format_wire_date, Course, Student};

pub const STUDENTS_CSV_HEADER: &str =
    "name,branch,course,enrollment_date,total_fee,paid_amount,balance,status\n";

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn fmt_date(d: Option<NaiveDate>) -> String {
    d.map(format_wire_date).unwrap_or_default()
}

/// Build the roster CSV. `status` restricts rows to one derived status;
/// `None` exports everybody. Returns the document and the row count.
pub fn students_csv(
    students: &[Student],
    courses: &[Course],
    status: Option<Status>,
    today: NaiveDate,
) -> (String, usize) {
    let mut csv = String::from(STUDENTS_CSV_HEADER);
    let mut rows = 0usize;
    for s in students {
        let derived = calc::derive_status_in(s, courses, today);
        if let Some(want) = status {
            if derived != want {
                continue;
            }
        }
        rows += 1;
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            csv_quote(&s.name),
            csv_quote(s.branch.as_deref().unwrap_or("")),
            csv_quote(&s.course),
            fmt_date(s.enrollment_date),
            s.total_fee,
            s.paid_amount,
            calc::balance(s),
            derived.as_str()
        ));
    }
    (csv, rows)
}
