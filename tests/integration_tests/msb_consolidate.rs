// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{fs::read_to_string, io::Write};

use indoc::indoc;
use omp::msb::ScienceProgram;
use tempfile::TempDir;

use crate::{get_cmd_output, omp, test_file};

#[test]
fn test_consolidate_and_write() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let cmd = omp()
        .args([
            "msb-consolidate",
            &test_file("programmes/duplicates.xml"),
            &test_file("programmes/unique.xml"),
            "--output-dir",
            &format!("{}", tmp_dir.path().display()),
        ])
        .ok();
    assert!(cmd.is_ok(), "msb-consolidate failed: {}", cmd.err().unwrap());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("project U/24A/1"), "{stdout}");
    assert!(stdout.contains("project M24AP001"), "{stdout}");
    assert!(stdout.contains("MSB 'M31 J band'"), "{stdout}");
    assert!(stdout.contains("MSB 'Orion HARP map'"), "{stdout}");

    // The duplicate has gone and its count was merged.
    let written = read_to_string(tmp_dir.path().join("duplicates.xml")).unwrap();
    assert_eq!(written.matches("<SpMSB").count(), 2);
    let mut prog = ScienceProgram::parse(&written).unwrap();
    let msbs = prog.consolidate().unwrap();
    assert_eq!(msbs.len(), 2);
    assert_eq!(msbs[0].title, "M31 J band");
    assert_eq!(msbs[0].remaining, 4);
    assert_eq!(msbs[1].title, "M33 K band");
    assert_eq!(msbs[1].remaining, 2);
    assert!(!prog.changed());

    // Nothing changed here, but it's still written.
    let written = read_to_string(tmp_dir.path().join("unique.xml")).unwrap();
    assert_eq!(written.matches("<SpMSB").count(), 1);
    assert!(written.contains("Orion HARP map"));
}

#[test]
fn test_consolidate_without_output_warns() {
    let cmd = omp()
        .args(["msb-consolidate", &test_file("programmes/duplicates.xml")])
        .ok();
    assert!(cmd.is_ok(), "msb-consolidate failed: {}", cmd.err().unwrap());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("2 MSBs"), "{stdout}");
    assert!(stdout.contains("no --output-dir was given"), "{stdout}");
}

#[test]
fn test_bad_remaining_fails() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let file = tmp_dir.path().join("bad.xml");
    let mut f = std::fs::File::create(&file).unwrap();
    f.write_all(
        indoc! {r#"
            <SpProg>
              <SpMSB remaining="lots">
                <title>Bad</title>
              </SpMSB>
            </SpProg>
        "#}
        .as_bytes(),
    )
    .unwrap();
    drop(f);

    let cmd = omp()
        .args(["msb-consolidate", &format!("{}", file.display())])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("invalid remaining count 'lots'"), "{stderr}");
}
