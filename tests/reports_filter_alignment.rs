use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_feebookd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn feebookd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn roster_snapshot() -> serde_json::Value {
    json!({
        "students": [
            {
                "id": "s1", "name": "Asha Verma", "father": "Ramesh Verma",
                "phone": "9876543210", "course": "Tally", "branch": "City Center",
                "enrollment_date": "2023-01-01", "total_fee": 5000,
                "paid_amount": 500, "status": "Active"
            },
            {
                "id": "s2", "name": "Ravi Kumar", "father": "Suresh Kumar",
                "phone": "9000000000", "course": "Typing", "branch": "Main",
                "enrollment_date": "2023-05-01", "total_fee": 3000,
                "paid_amount": 3000, "status": "Active"
            },
            {
                "id": "s3", "name": "Meena Joshi", "course": "Tally",
                "branch": "Main", "enrollment_date": "2023-06-01",
                "total_fee": 4000, "paid_amount": 1500, "status": "Dropped"
            },
            {
                "id": "s4", "name": "Vikram Singh", "course": "Tally",
                "branch": "City Center", "enrollment_date": "2023-07-01",
                "total_fee": 6000, "paid_amount": 2000, "status": "Active"
            }
        ],
        "courses": [
            { "id": "c1", "name": "Tally", "duration": "6 months", "fee": 6000 },
            { "id": "c2", "name": "Typing", "duration": "3 months", "fee": 3000 }
        ],
        "payments": [
            {
                "id": "p1", "student_id": "s2", "amount": 3000,
                "payment_method": "cash", "receipt_number": "RCP-00000001",
                "payment_date": "2023-05-02"
            },
            {
                "id": "p2", "student_id": "s4", "amount": 2000,
                "payment_method": "card", "receipt_number": "RCP-00000002",
                "payment_date": "2023-07-03"
            }
        ]
    })
}

fn listed_ids(result: &serde_json::Value) -> Vec<String> {
    result["students"]
        .as_array()
        .expect("students array")
        .iter()
        .filter_map(|s| s["id"].as_str())
        .map(|s| s.to_string())
        .collect()
}

#[test]
fn search_branch_and_course_filters_combine() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(&mut stdin, &mut reader, "1", "snapshot.load", roster_snapshot());

    // substring search hits name, phone or father's name
    let by_name = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.list",
        json!({ "asOf": "2023-08-01", "search": "asha" }),
    );
    assert_eq!(listed_ids(&by_name), vec!["s1"]);

    let by_father = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.list",
        json!({ "asOf": "2023-08-01", "search": "suresh" }),
    );
    assert_eq!(listed_ids(&by_father), vec!["s2"]);

    let by_phone = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "students.list",
        json!({ "asOf": "2023-08-01", "search": "90000" }),
    );
    assert_eq!(listed_ids(&by_phone), vec!["s2"]);

    // exact branch + course, "all" sentinel means no filter
    let combined = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "students.list",
        json!({
            "asOf": "2023-08-01",
            "branch": "City Center",
            "course": "Tally",
            "status": "all",
            "search": ""
        }),
    );
    assert_eq!(listed_ids(&combined), vec!["s1", "s4"]);

    // pagination applies after filtering and reports the filtered total
    let paged = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "students.list",
        json!({ "asOf": "2023-08-01", "course": "Tally", "page": 2, "pageSize": 2 }),
    );
    assert_eq!(paged["total"], json!(3));
    assert_eq!(listed_ids(&paged), vec!["s4"]);

    let bad_status = request(
        &mut stdin,
        &mut reader,
        "7",
        "students.list",
        json!({ "status": "Enrolled" }),
    );
    assert_eq!(bad_status["error"]["code"].as_str(), Some("bad_params"));

    let _ = child.kill();
}

#[test]
fn summary_aggregates_align_with_the_roster() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(&mut stdin, &mut reader, "1", "snapshot.load", roster_snapshot());

    // as of 2023-08-01: s1 Inactive (ended 2023-07-01), s2 Completed,
    // s3 Dropped, s4 Active
    let summary = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "reports.summary",
        json!({ "asOf": "2023-08-01" }),
    );

    assert_eq!(summary["expectedRevenue"], json!(14000.0));
    assert_eq!(summary["collectedRevenue"], json!(5500.0));
    assert_eq!(summary["outstanding"], json!(8500.0));
    assert_eq!(summary["collectionRate"], json!(39.3));
    assert_eq!(summary["droppedFees"], json!(4000.0));
    assert_eq!(summary["totalStudents"], json!(4));
    assert_eq!(summary["activeStudents"], json!(1));
    assert_eq!(summary["totalPayments"], json!(2));

    let dashboard = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "reports.dashboard",
        json!({ "asOf": "2023-08-01" }),
    );
    assert_eq!(dashboard["totalStudents"], json!(4));
    assert_eq!(dashboard["totalCourses"], json!(2));
    assert_eq!(dashboard["totalRevenue"], json!(5500.0));
    assert_eq!(dashboard["totalPending"], json!(8500.0));

    let _ = child.kill();
}

#[test]
fn empty_roster_has_zero_collection_rate() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "snapshot.load",
        json!({ "students": [], "courses": [], "payments": [] }),
    );

    let summary = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "reports.summary",
        json!({ "asOf": "2023-08-01" }),
    );
    assert_eq!(summary["expectedRevenue"], json!(0.0));
    assert_eq!(summary["collectionRate"], json!(0.0));

    let _ = child.kill();
}

#[test]
fn overpayment_shows_as_negative_outstanding() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "snapshot.load",
        json!({
            "students": [
                { "id": "s1", "name": "Over Payer", "course": "Tally",
                  "total_fee": 5000, "paid_amount": 6000, "status": "Active" }
            ],
            "courses": [],
            "payments": []
        }),
    );

    let summary = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "reports.summary",
        json!({ "asOf": "2023-08-01" }),
    );
    assert_eq!(summary["outstanding"], json!(-1000.0));
    assert_eq!(summary["collectionRate"], json!(120.0));

    let _ = child.kill();
}
