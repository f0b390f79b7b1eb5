mod support;

use std::fs;

use serde_json::Value;
use tempfile::tempdir;

use support::{run_volley, spawn_http_server};

fn describe(output: &std::process::Output) -> String {
    format!(
        "stdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

fn json_u64(value: &Value, pointer: &str) -> Result<u64, String> {
    value
        .pointer(pointer)
        .and_then(Value::as_u64)
        .ok_or_else(|| format!("missing {} in summary", pointer))
}

#[test]
fn e2e_run_writes_exports() -> Result<(), String> {
    let (url, _server) = spawn_http_server("200 OK")?;
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let csv_path = dir.path().join("results.csv");
    let json_path = dir.path().join("summary.json");
    let csv_arg = csv_path.to_string_lossy().into_owned();
    let json_arg = json_path.to_string_lossy().into_owned();

    let output = run_volley([
        url.as_str(),
        "-n",
        "20",
        "-c",
        "4",
        "--batch-size",
        "10",
        "--cooldown",
        "50ms",
        "--no-progress",
        "--csv",
        csv_arg.as_str(),
        "--json",
        json_arg.as_str(),
    ])?;
    if !output.status.success() {
        return Err(describe(&output));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.contains("SUMMARY") || !stdout.contains("Detailed results saved to:") {
        return Err(format!("unexpected report\n{}", describe(&output)));
    }

    let csv = fs::read_to_string(&csv_path).map_err(|err| format!("read csv failed: {}", err))?;
    let mut lines = csv.lines();
    if lines.next() != Some("sequence,timestamp,latency_ms,status_code,error,bytes") {
        return Err("csv header mismatch".to_owned());
    }
    let rows: Vec<&str> = lines.collect();
    if rows.len() != 20 || !rows.iter().all(|row| row.ends_with(",200,none,2")) {
        return Err(format!("unexpected csv rows: {:?}", rows));
    }

    let json = fs::read_to_string(&json_path).map_err(|err| format!("read json failed: {}", err))?;
    let summary: Value =
        serde_json::from_str(&json).map_err(|err| format!("parse json failed: {}", err))?;
    if json_u64(&summary, "/stats/total_requests")? != 20
        || json_u64(&summary, "/stats/successful_requests")? != 20
        || json_u64(&summary, "/stats/failed_requests")? != 0
        || json_u64(&summary, "/stats/total_bytes")? != 40
        || json_u64(&summary, "/stats/batches")? != 2
        || json_u64(&summary, "/stats/status_codes/200")? != 20
    {
        return Err(format!("unexpected summary: {}", json));
    }
    Ok(())
}

#[test]
fn e2e_server_errors_count_as_failures() -> Result<(), String> {
    let (url, _server) = spawn_http_server("500 Internal Server Error")?;
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let json_path = dir.path().join("summary.json");
    let json_arg = json_path.to_string_lossy().into_owned();

    let output = run_volley([
        url.as_str(),
        "-n",
        "5",
        "-c",
        "5",
        "--no-progress",
        "--json",
        json_arg.as_str(),
    ])?;
    if !output.status.success() {
        return Err(describe(&output));
    }

    let json = fs::read_to_string(&json_path).map_err(|err| format!("read json failed: {}", err))?;
    let summary: Value =
        serde_json::from_str(&json).map_err(|err| format!("parse json failed: {}", err))?;
    if json_u64(&summary, "/stats/failed_requests")? != 5
        || json_u64(&summary, "/stats/status_codes/500")? != 5
    {
        return Err(format!("unexpected summary: {}", json));
    }
    Ok(())
}

#[test]
fn e2e_rejects_unsupported_scheme() -> Result<(), String> {
    let output = run_volley(["ftp://localhost/file", "-n", "1", "--no-progress"])?;
    if output.status.success() {
        return Err(format!("expected failure\n{}", describe(&output)));
    }
    Ok(())
}

#[test]
fn e2e_rejects_zero_requests() -> Result<(), String> {
    let output = run_volley(["http://127.0.0.1:9/", "-n", "0"])?;
    if output.status.success() {
        return Err(format!("expected failure\n{}", describe(&output)));
    }
    Ok(())
}
