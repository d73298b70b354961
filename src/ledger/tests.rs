// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::io::Write;

use chrono::NaiveDate;
use indoc::indoc;

use super::*;

fn t(hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn event(key: &str, project: &str, target: &str, kind: EventKind, hour: u32) -> LedgerEvent {
    LedgerEvent {
        msb_key: key.to_string(),
        project_id: Some(project.to_string()),
        target: Some(target.to_string()),
        title: None,
        kind,
        timestamp: t(hour),
        text: None,
        actor: None,
    }
}

#[test]
fn test_events_stay_in_order_and_accepts_are_counted() {
    let summaries = summarize(vec![
        event("M1", "P", "T", EventKind::Accept, 1),
        event("M1", "P", "T", EventKind::Comment, 2),
        event("M1", "P", "T", EventKind::Accept, 3),
    ]);
    assert_eq!(summaries.len(), 1);
    let m1 = &summaries[0];
    assert_eq!(m1.msb_key, "M1");
    assert_eq!(m1.repeat_count, 2);
    assert_eq!(
        m1.events.iter().map(|e| e.timestamp).collect::<Vec<_>>(),
        [t(1), t(2), t(3)]
    );
    assert_eq!(m1.last_timestamp(), Some(t(3)));
}

#[test]
fn test_arrival_order_is_not_resorted() {
    let summaries = summarize(vec![
        event("M1", "P", "T", EventKind::Comment, 5),
        event("M1", "P", "T", EventKind::Reject, 2),
    ]);
    assert_eq!(
        summaries[0].events.iter().map(|e| e.kind).collect::<Vec<_>>(),
        [EventKind::Comment, EventKind::Reject]
    );
    assert_eq!(summaries[0].repeat_count, 0);
}

#[test]
fn test_fetch_events() {
    let mut fetch = event("M1", "P", "T", EventKind::Fetch, 1);
    fetch.title = Some("Orion map".to_string());
    let summaries = summarize(vec![
        fetch,
        event("M1", "P", "T", EventKind::Accept, 2),
        event("M2", "P", "U", EventKind::Fetch, 3),
    ]);
    assert_eq!(summaries.len(), 2);

    // M1 has a real event, so the fetch goes, but its title stays.
    let m1 = &summaries[0];
    assert_eq!(m1.events.len(), 1);
    assert_eq!(m1.events[0].kind, EventKind::Accept);
    assert_eq!(m1.title.as_deref(), Some("Orion map"));

    // M2 has nothing but the fetch.
    let m2 = &summaries[1];
    assert_eq!(m2.events.len(), 1);
    assert_eq!(m2.events[0].kind, EventKind::Fetch);
    assert_eq!(m2.repeat_count, 0);
}

#[test]
fn test_summaries_are_sorted() {
    let summaries = summarize(vec![
        event("M1", "P2", "A", EventKind::Accept, 1),
        event("M2", "P1", "B", EventKind::Accept, 2),
        event("M3", "P1", "A", EventKind::Accept, 9),
        event("M4", "P1", "A", EventKind::Accept, 3),
        event("M5", "P1", "A", EventKind::Comment, 3),
    ]);
    let keys: Vec<&str> = summaries.iter().map(|s| s.msb_key.as_str()).collect();
    // M4 and M5 tie; they keep their arrival order.
    assert_eq!(keys, ["M4", "M5", "M3", "M2", "M1"]);
}

#[test]
fn test_other_kinds_dont_count() {
    let summaries = summarize(vec![
        event("M1", "P", "T", EventKind::Undo, 1),
        event("M1", "P", "T", EventKind::Suspend, 2),
        event("M1", "P", "T", EventKind::Abort, 3),
        event("M1", "P", "T", EventKind::AllDone, 4),
    ]);
    assert_eq!(summaries[0].repeat_count, 0);
    assert_eq!(summaries[0].events.len(), 4);
}

#[test]
fn test_empty() {
    assert!(summarize(vec![]).is_empty());
}

#[test]
fn test_read_yaml() {
    let events = events_from_yaml(
        indoc! {r#"
            - msb_key: abc
              project_id: U/24A/1
              kind: accept
              timestamp: 2024-05-01T01:00:00
              actor: observer
            - msb_key: abc
              kind: all_done
              timestamp: 2024-05-01T02:00:00
              text: Finished
        "#}
        .as_bytes(),
    )
    .unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, EventKind::Accept);
    assert_eq!(events[0].project_id.as_deref(), Some("U/24A/1"));
    assert_eq!(events[0].timestamp, t(1));
    assert_eq!(events[1].kind, EventKind::AllDone);
    assert_eq!(events[1].project_id, None);
    assert_eq!(events[1].text.as_deref(), Some("Finished"));
}

#[test]
fn test_read_json_file() {
    let mut file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .expect("Couldn't make a temp file");
    file.write_all(
        br#"[{"msb_key": "k", "kind": "reject", "timestamp": "2024-05-01T03:00:00"}]"#,
    )
    .unwrap();

    let events = read_events_file(file.path()).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Reject);

    assert!(matches!(
        events_from_json(r#"[{"msb_key": "k", "kind": "explode", "timestamp": "2024-05-01T03:00:00"}]"#.as_bytes()),
        Err(LedgerError::Json(_))
    ));

    let file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .expect("Couldn't make a temp file");
    assert!(matches!(
        read_events_file(file.path()),
        Err(LedgerError::UnrecognisedExtension(_))
    ));
}

#[test]
fn test_event_kind_names() {
    assert_eq!(EventKind::AllDone.to_string(), "all_done");
    assert_eq!(EventKind::from_str("fetch").unwrap(), EventKind::Fetch);
}
