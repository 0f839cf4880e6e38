use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::calc;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{as_of, page_params, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::{format_wire_date, parse_wire_date, Payment, StoredStatus};

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "payments.record" => Some(handle_record(state, req)),
        "payments.list" => Some(handle_list(state, req)),
        _ => None,
    }
}

fn payment_row(p: &Payment) -> serde_json::Value {
    json!({
        "id": p.id,
        "studentId": p.student_id,
        "studentName": p.student_name,
        "amount": p.amount,
        "paymentMethod": p.payment_method,
        "feeType": p.fee_type,
        "receiptNumber": p.receipt_number,
        "paymentDate": p.payment_date.map(format_wire_date),
        "notes": p.notes,
    })
}

/// Records a payment against a student: the payment record is immutable
/// once appended and the student's cumulative `paid_amount` only ever
/// grows (no refunds). The result carries the receipt fields the UI's
/// receipt generator renders.
fn handle_record(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(snapshot) = state.snapshot.as_mut() else {
        return err(&req.id, "no_snapshot", "load a snapshot first", None);
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let method = match required_str(req, "method") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let fee_type = match required_str(req, "feeType") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let amount = match req.params.get("amount").and_then(|v| v.as_f64()) {
        Some(v) if v > 0.0 => v,
        _ => {
            return err(
                &req.id,
                "bad_params",
                "amount must be a positive number",
                None,
            )
        }
    };
    let notes = req
        .params
        .get("notes")
        .and_then(|v| v.as_str())
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string());
    let payment_date = match as_of(req) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    let Some(student) = snapshot.students.iter_mut().find(|s| s.id == student_id) else {
        return err(
            &req.id,
            "not_found",
            format!("unknown student: {}", student_id),
            None,
        );
    };
    if student.status == StoredStatus::Dropped {
        return err(
            &req.id,
            "student_dropped",
            "cannot record a payment for a dropped student",
            None,
        );
    }
    let balance = calc::balance(student);
    if amount > balance {
        return err(
            &req.id,
            "amount_exceeds_balance",
            "payment amount cannot exceed the outstanding balance",
            Some(json!({ "balance": balance })),
        );
    }

    let payment_id = Uuid::new_v4().to_string();
    let receipt_number = format!(
        "RCP-{}",
        payment_id[..8].to_ascii_uppercase()
    );
    let payment = Payment {
        id: payment_id,
        student_id: student.id.clone(),
        student_name: Some(student.name.clone()),
        amount,
        payment_method: method,
        fee_type: Some(fee_type),
        receipt_number,
        payment_date: Some(payment_date),
        notes,
    };

    student.paid_amount += amount;
    let new_balance = calc::balance(student);
    let updated = student.clone();
    info!(
        student = %payment.student_id,
        amount,
        receipt = %payment.receipt_number,
        "payment recorded"
    );

    // status after this payment, so the UI can refresh the row in place
    let derived = calc::derive_status_in(&updated, &snapshot.courses, payment_date);
    let result = json!({
        "payment": payment_row(&payment),
        "paidAmount": updated.paid_amount,
        "balance": new_balance,
        "status": derived.as_str(),
    });

    snapshot.payments.push(payment);
    ok(&req.id, result)
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(snapshot) = state.snapshot.as_ref() else {
        return err(&req.id, "no_snapshot", "load a snapshot first", None);
    };

    let date = match req.params.get("date").and_then(|v| v.as_str()) {
        None => None,
        Some(raw) => match parse_wire_date(raw) {
            Some(d) => Some(d),
            None => {
                return err(&req.id, "bad_params", "date must be a YYYY-MM-DD date", None)
            }
        },
    };

    let filtered: Vec<&Payment> = snapshot
        .payments
        .iter()
        .filter(|p| date.is_none() || p.payment_date == date)
        .collect();
    let total = filtered.len();

    let (page, page_size) = page_params(req, 25);
    let rows: Vec<serde_json::Value> = filtered
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .map(payment_row)
        .collect();

    ok(
        &req.id,
        json!({
            "payments": rows,
            "total": total,
            "page": page,
            "pageSize": page_size,
        }),
    )
}
