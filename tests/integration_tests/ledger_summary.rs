// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::{get_cmd_output, omp, test_file};

/// Log lines go to stdout too; the summaries are the only json array.
fn json_part(stdout: &str) -> serde_json::Value {
    let start = stdout.find("[\n").expect("no json in stdout");
    let end = start + stdout[start..].find("\n]").expect("no json in stdout") + 2;
    serde_json::from_str(&stdout[start..end]).unwrap()
}

#[test]
fn test_ledger_summary_json() {
    let cmd = omp()
        .args(["ledger-summary", &test_file("ledger/events.json")])
        .ok();
    assert!(cmd.is_ok(), "ledger-summary failed: {}", cmd.err().unwrap());
    let (stdout, _) = get_cmd_output(cmd);

    let summaries = json_part(&stdout);
    let summaries = summaries.as_array().unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0]["msb_key"], "abc");
    assert_eq!(summaries[0]["title"], "M31 J band");
    assert_eq!(summaries[0]["repeat_count"], 2);
    // The fetch is dropped because other things happened.
    assert_eq!(summaries[0]["events"].as_array().unwrap().len(), 3);
    assert_eq!(summaries[1]["msb_key"], "def");
    assert_eq!(summaries[1]["repeat_count"], 0);
}

#[test]
fn test_ledger_summary_yaml() {
    let cmd = omp()
        .args(["ledger-summary", &test_file("ledger/events.yaml")])
        .ok();
    assert!(cmd.is_ok(), "ledger-summary failed: {}", cmd.err().unwrap());
    let (stdout, _) = get_cmd_output(cmd);
    let summaries = json_part(&stdout);
    assert_eq!(summaries[0]["target"], "NGC 253");
    assert_eq!(summaries[0]["events"][0]["kind"], "suspend");
}

#[test]
fn test_ledger_summary_unknown_extension() {
    let cmd = omp()
        .args(["ledger-summary", &test_file("ledger/events.csv")])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("Valid extensions are: json, yaml"), "{stderr}");
}
