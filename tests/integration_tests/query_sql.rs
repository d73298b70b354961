// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::{get_cmd_output, omp, test_file};

#[test]
fn test_query_sql() {
    let cmd = omp()
        .args([
            "query-sql",
            &test_file("queries/ukirt_object.xml"),
            &test_file("queries/jcmt_harp.xml"),
        ])
        .ok();
    assert!(cmd.is_ok(), "query-sql failed: {}", cmd.err().unwrap());
    let (stdout, _) = get_cmd_output(cmd);

    let ukirt = "SELECT * FROM ukirt.COMMON U WHERE (((U.OBJECT LIKE '%M31%'))) ORDER BY U.UT_DATE";
    assert!(stdout.contains(ukirt), "{stdout}");
    assert!(
        stdout.contains("SELECT * FROM jcmt.COMMON C, jcmt.ACSIS A WHERE A.obsid = C.obsid AND "),
        "{stdout}"
    );
    assert!(stdout.contains("(C.project = 'M24AP001')"), "{stdout}");
    assert!(stdout.contains("(C.instrume = 'harp')"), "{stdout}");

    // Statements come out in the order the files were given.
    let jcmt_pos = stdout.find("FROM jcmt.COMMON").unwrap();
    assert!(stdout.find(ukirt).unwrap() < jcmt_pos);
}

#[test]
fn test_query_sql_with_config_file() {
    let cmd = omp()
        .args([
            "query-sql",
            &test_file("queries/ufti_project.xml"),
            "--config",
            &test_file("config/ukirt_only.toml"),
        ])
        .ok();
    assert!(cmd.is_ok(), "query-sql failed: {}", cmd.err().unwrap());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(
        stdout.contains("SELECT * FROM ukirt.COMMON U WHERE (((U.PROJECT = 'U/24A/1')))"),
        "{stdout}"
    );
    // This configuration has no ordering.
    assert!(!stdout.contains("ORDER BY"), "{stdout}");
}

#[test]
fn test_malformed_query_fails() {
    let cmd = omp()
        .args(["query-sql", &test_file("queries/two_telescopes.xml")])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(
        stderr.contains("Only one telescope may be queried at a time"),
        "{stderr}"
    );
}

#[test]
fn test_bad_config_extension_fails() {
    let cmd = omp()
        .args([
            "query-sql",
            &test_file("queries/ufti_project.xml"),
            "--config",
            &test_file("ledger/events.csv"),
        ])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(
        stderr.contains("doesn't have a recognised file extension"),
        "{stderr}"
    );
}
