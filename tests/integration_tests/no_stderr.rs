// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests to ensure there is no stderr output for successful commands.

use tempfile::TempDir;

use crate::{get_cmd_output, omp, test_file};

#[test]
fn test_query_sql_no_stderr() {
    let cmd = omp()
        .args(["query-sql", &test_file("queries/ukirt_object.xml")])
        .ok();
    assert!(cmd.is_ok(), "query-sql failed: {}", cmd.err().unwrap());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");
}

#[test]
fn test_msb_consolidate_no_stderr() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let cmd = omp()
        .args([
            "msb-consolidate",
            &test_file("programmes/duplicates.xml"),
            "-o",
            &format!("{}", tmp_dir.path().display()),
        ])
        .ok();
    assert!(cmd.is_ok(), "msb-consolidate failed: {}", cmd.err().unwrap());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");
}

#[test]
fn test_ledger_summary_no_stderr() {
    let cmd = omp()
        .args(["ledger-summary", &test_file("ledger/events.json")])
        .ok();
    assert!(cmd.is_ok(), "ledger-summary failed: {}", cmd.err().unwrap());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");
}
