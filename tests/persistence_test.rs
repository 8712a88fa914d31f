#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;

/// The invoice payload from the first run must survive the process restart
/// and still be capturable in a second run against the same database.
#[test]
fn test_rocksdb_payment_survives_restart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("shop_db");

    // 1. First run: submit a cart, get an invoice.
    let mut events1 = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        events1,
        r#"{{"type": "create_order", "user_id": 42, "cart": {{"line1": {{"item": {{"product_id": 1, "name": "Tee", "unit_price": 50000}}, "qty": 2}}}}}}"#
    )
    .unwrap();

    let mut cmd1 = Command::new(cargo_bin!("gorosso"));
    cmd1.arg(events1.path()).arg("--db-path").arg(&db_path);

    let output1 = cmd1.output().expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    let reply: serde_json::Value = serde_json::from_str(stdout1.lines().next().unwrap()).unwrap();
    assert_eq!(reply["type"], "invoice");
    let payload = reply["invoice"]["payload"].as_str().unwrap().to_string();

    // 2. Second run: verify and capture against the recovered reservation.
    let mut events2 = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        events2,
        r#"{{"type": "pre_checkout", "payload": "{payload}", "amount": 100000}}"#
    )
    .unwrap();
    writeln!(
        events2,
        r#"{{"type": "payment_confirmed", "payload": "{payload}", "receipt": "provider-receipt"}}"#
    )
    .unwrap();

    let mut cmd2 = Command::new(cargo_bin!("gorosso"));
    cmd2.arg(events2.path()).arg("--db-path").arg(&db_path);

    let output2 = cmd2.output().expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);
    assert!(stdout2.contains(r#""ok":true"#));
    assert!(stdout2.contains(r#""type":"order_confirmed""#));
    assert!(stdout2.contains("GRS-"));

    // 3. Third run: a repeat confirmation after another restart stays a no-op.
    let mut events3 = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        events3,
        r#"{{"type": "payment_confirmed", "payload": "{payload}", "receipt": "provider-receipt"}}"#
    )
    .unwrap();
    let export = tempfile::NamedTempFile::new().unwrap();

    let mut cmd3 = Command::new(cargo_bin!("gorosso"));
    cmd3.arg(events3.path())
        .arg("--db-path")
        .arg(&db_path)
        .arg("--export-orders")
        .arg(export.path());

    let output3 = cmd3.output().expect("Failed to execute command");
    assert!(output3.status.success());
    let stdout3 = String::from_utf8_lossy(&output3.stdout);
    assert!(stdout3.contains(r#""type":"ignored""#));

    // Exactly one order made it to the report.
    let csv = std::fs::read_to_string(export.path()).unwrap();
    assert_eq!(csv.lines().count(), 2);
    assert!(csv.contains("GRS-"));
    assert!(csv.contains("42"));
}
