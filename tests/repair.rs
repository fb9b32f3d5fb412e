mod common;

use common::TestWorkspace;
use csv_realign::align::{AlignOptions, AlignmentFailure};
use csv_realign::io_utils;
use csv_realign::repair::align_file;
use csv_realign::schema::{Column, Schema};
use encoding_rs::UTF_8;

fn people_schema() -> Schema {
    Schema::build(vec![
        Column::string("name", false, true, true),
        Column::integer("age", false),
    ])
    .unwrap()
}

fn lines(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

#[test]
fn header_row_is_skipped_but_keeps_its_line_index() {
    let schema = people_schema();
    let options = AlignOptions::default();
    let input = lines(&["name,age", "alice,30", "bob,smith,41"]);

    let parsed = align_file(&input, &schema, &options).unwrap();
    assert_eq!(parsed.len(), 2);

    let valid: Vec<usize> = parsed.valid_records().map(|(idx, _)| idx).collect();
    assert_eq!(valid, vec![1, 2]);
    assert_eq!(
        parsed.valid_records().nth(1).unwrap().1.fields(),
        &["bob,smith".to_string(), "41".to_string()]
    );
}

#[test]
fn outcomes_follow_input_order_regardless_of_work_distribution() {
    let schema = people_schema();
    let options = AlignOptions {
        has_header: false,
        ..AlignOptions::default()
    };
    let input: Vec<String> = (0..500)
        .map(|i| {
            if i % 7 == 0 {
                format!("person {i},not-a-number")
            } else {
                format!("person {i},{i}")
            }
        })
        .collect();

    let parsed = align_file(&input, &schema, &options).unwrap();
    assert_eq!(parsed.len(), 500);
    let indices: Vec<usize> = parsed.outcomes().iter().map(|o| o.line_index()).collect();
    assert_eq!(indices, (0..500).collect::<Vec<_>>());
    assert_eq!(parsed.invalid_count(), 72);
    for entry in parsed.invalid_entries() {
        assert_eq!(entry.line_index % 7, 0);
        assert_eq!(entry.reason, AlignmentFailure::Infeasible);
    }
}

#[test]
fn nothing_is_silently_dropped() {
    let schema = people_schema();
    let options = AlignOptions {
        has_header: false,
        ..AlignOptions::default()
    };
    let input = lines(&["alice,30", ",,", "bob,cat,41", "x y,9"]);
    let parsed = align_file(&input, &schema, &options).unwrap();
    assert_eq!(parsed.valid_count() + parsed.invalid_count(), input.len());
}

#[test]
fn export_reproduces_repaired_file() {
    let workspace = TestWorkspace::new();
    let schema = people_schema();
    let options = AlignOptions::default();
    let input_path = workspace.write(
        "people.csv",
        "name,age\nalice,30\nsmith, bob,41\nbroken,row,not-a-number\n",
    );

    let input = io_utils::read_lines(&input_path, UTF_8).unwrap();
    let parsed = align_file(&input, &schema, &options).unwrap();
    assert_eq!(parsed.valid_count(), 2);
    assert_eq!(parsed.invalid_count(), 1);

    let mut buffer = Vec::new();
    parsed.export(&mut buffer, &schema, b',').unwrap();
    let exported = String::from_utf8(buffer).unwrap();
    assert_eq!(exported, "name,age\nalice,30\n\"smith,bob\",41\n");
}

#[test]
fn empty_input_yields_empty_collection() {
    let schema = people_schema();
    let parsed = align_file(&[], &schema, &AlignOptions::default()).unwrap();
    assert!(parsed.is_empty());
}
