use csv_realign::align::{AlignOptions, AlignmentFailure, RowOutcome, align_row};
use csv_realign::schema::{Column, Schema};

fn options() -> AlignOptions {
    AlignOptions {
        has_header: false,
        ..AlignOptions::default()
    }
}

fn aligned(row: &str, schema: &Schema) -> Vec<String> {
    match align_row(row, 0, schema, &options()).expect("alignment runs") {
        RowOutcome::Valid { record, .. } => record.fields().to_vec(),
        RowOutcome::Invalid { reason, .. } => panic!("expected '{row}' to align, got {reason}"),
    }
}

fn rejected(row: &str, schema: &Schema) -> AlignmentFailure {
    match align_row(row, 0, schema, &options()).expect("alignment runs") {
        RowOutcome::Invalid { reason, .. } => reason,
        RowOutcome::Valid { record, .. } => {
            panic!("expected '{row}' to fail, aligned as {:?}", record.fields())
        }
    }
}

#[test]
fn plain_string_columns_accept_only_exact_arity() {
    let schema = Schema::build(vec![
        Column::string("name", false, false, false),
        Column::string("username", false, false, false),
        Column::string("cat_name", false, false, false),
        Column::string("cat_colour", false, false, false),
    ])
    .unwrap();

    assert_eq!(
        aligned("john,john,chanom,orange", &schema),
        vec!["john", "john", "chanom", "orange"]
    );
    assert_eq!(
        rejected(",john,chanom,orange", &schema),
        AlignmentFailure::Infeasible
    );
    assert_eq!(rejected(",,,", &schema), AlignmentFailure::Infeasible);
    // One token too many with nowhere to merge.
    assert_eq!(
        rejected("john,john,chanom,chayen,orange", &schema),
        AlignmentFailure::Infeasible
    );
}

#[test]
fn single_comma_column_absorbs_all_extra_tokens() {
    let schema = Schema::build(vec![
        Column::string("name", false, false, false),
        Column::string("username", false, false, false),
        Column::string("cat_names", false, true, false),
        Column::string("cat_group_name", false, false, false),
    ])
    .unwrap();

    assert_eq!(
        aligned("john,john,chanom,chayen,olieang,orange", &schema),
        vec!["john", "john", "chanom,chayen,olieang", "orange"]
    );
    assert_eq!(
        rejected(",john,chanom,orange", &schema),
        AlignmentFailure::Infeasible
    );
    assert_eq!(
        rejected("john,john,chanom,chayen,", &schema),
        AlignmentFailure::Infeasible
    );
}

#[test]
fn space_allowance_is_per_column() {
    let schema = Schema::build(vec![
        Column::string("name", false, false, true),
        Column::string("username", false, false, false),
        Column::string("cat_name", false, false, false),
        Column::string("cat_group_name", false, false, false),
    ])
    .unwrap();

    assert_eq!(
        aligned("john appleseed,john,chanom,orange", &schema),
        vec!["john appleseed", "john", "chanom", "orange"]
    );
    assert_eq!(
        aligned("john,john,chanom,orange", &schema),
        vec!["john", "john", "chanom", "orange"]
    );
    // Whitespace-only is still null.
    assert_eq!(
        rejected(" ,john,chanom,orange", &schema),
        AlignmentFailure::Infeasible
    );
    assert_eq!(
        rejected("john,john,chanom,", &schema),
        AlignmentFailure::Infeasible
    );
}

#[test]
fn consecutive_empty_tokens_cannot_fill_a_non_nullable_merge_column() {
    let schema = Schema::build(vec![
        Column::string("name", false, false, true),
        Column::string("username", false, false, false),
        Column::string("cat_names", false, true, false),
        Column::string("cat_group_name", false, false, false),
    ])
    .unwrap();

    assert_eq!(
        aligned("john appleseed,john,chanom,chayen,olieang,orange", &schema),
        vec!["john appleseed", "john", "chanom,chayen,olieang", "orange"]
    );
    // The empty fragments merge into cat_names and join to nothing.
    assert_eq!(
        rejected("john,john,,,orange", &schema),
        AlignmentFailure::Infeasible
    );
}

#[test]
fn format_constrained_middle_column_disambiguates_merges() {
    let schema = Schema::build(vec![
        Column::string("cat_names", false, true, false),
        Column::string_with_format("cat_group_name", false, false, false, r"[a-z]{3}").unwrap(),
        Column::string("cat_colours", false, true, false),
    ])
    .unwrap();

    assert_eq!(
        aligned("chanom,cat,orange", &schema),
        vec!["chanom", "cat", "orange"]
    );
    assert_eq!(
        aligned("chanom,chayen,cat,orange", &schema),
        vec!["chanom,chayen", "cat", "orange"]
    );
    assert_eq!(
        aligned("chanom,chayen,cat,orange,orange", &schema),
        vec!["chanom,chayen", "cat", "orange,orange"]
    );
    assert_eq!(
        aligned("chanom,,cat,orange,orange", &schema),
        vec!["chanom", "cat", "orange,orange"]
    );
    assert_eq!(
        aligned(",chanom,cat,orange,orange", &schema),
        vec!["chanom", "cat", "orange,orange"]
    );
    assert_eq!(
        aligned("chanom,,chayen,cat,orange,orange", &schema),
        vec!["chanom,chayen", "cat", "orange,orange"]
    );

    assert_eq!(rejected(",cat,", &schema), AlignmentFailure::Infeasible);
    assert_eq!(rejected(",,", &schema), AlignmentFailure::Infeasible);
    assert_eq!(rejected(",,cat,", &schema), AlignmentFailure::Infeasible);
    assert_eq!(
        rejected(",,cat,meow,meow,meow", &schema),
        AlignmentFailure::Infeasible
    );
}

#[test]
fn adjacent_comma_columns_cannot_split_extra_tokens() {
    let schema = Schema::build(vec![
        Column::string("cat_names", false, true, false),
        Column::string("cat_colours", false, true, false),
    ])
    .unwrap();

    assert_eq!(aligned("chanom,orange", &schema), vec!["chanom", "orange"]);
    assert_eq!(
        rejected("chanom,chayen,orange", &schema),
        AlignmentFailure::Ambiguous
    );
    assert_eq!(
        rejected("chanom,chayen,cat,orange,orange", &schema),
        AlignmentFailure::Ambiguous
    );
    assert_eq!(rejected(",,orange", &schema), AlignmentFailure::Ambiguous);
    assert_eq!(
        rejected(",,,meow,meow,meow", &schema),
        AlignmentFailure::Ambiguous
    );
}

#[test]
fn format_patterns_cannot_rescue_adjacent_comma_columns() {
    // Only the final fragment of a merged run is charged against the column
    // validator, so the digit/letter split still admits two tied groupings.
    let schema = Schema::build(vec![
        Column::string_with_format("cat_names", false, true, false, r"[a-z]+,?").unwrap(),
        Column::string_with_format("cat_ages", false, true, false, r"[0-9]+,?").unwrap(),
    ])
    .unwrap();

    assert_eq!(aligned("chanom,1", &schema), vec!["chanom", "1"]);
    assert_eq!(
        rejected("chanom,chayen,1", &schema),
        AlignmentFailure::Ambiguous
    );
    assert_eq!(
        rejected("chanom,chayen,1,2", &schema),
        AlignmentFailure::Ambiguous
    );
    assert_eq!(rejected(",,1,2,3,", &schema), AlignmentFailure::Ambiguous);
    // Every grouping charges exactly one digit token against the letters-only
    // column, so the minimum is positive and still tied.
    assert_eq!(rejected("1,2,3,4,5", &schema), AlignmentFailure::Ambiguous);
    // Tied at a positive minimum is still ambiguity, not a best-effort pick.
    assert_eq!(
        rejected("chanom,chayen,milky", &schema),
        AlignmentFailure::Ambiguous
    );
}

#[test]
fn typed_columns_constrain_alignment() {
    let schema = Schema::build(vec![
        Column::string("name", false, true, true),
        Column::integer("age", false),
        Column::float("score", false),
        Column::datetime("joined", false),
    ])
    .unwrap();

    // Fragments are trimmed before rejoining, so ", " collapses to ",".
    assert_eq!(
        aligned("smith, john,32,1.5,2024-05-06 14:30:00", &schema),
        vec!["smith,john", "32", "1.5", "2024-05-06 14:30:00"]
    );
    assert_eq!(
        rejected("smith,32,notafloat,2024-05-06", &schema),
        AlignmentFailure::Infeasible
    );
}

#[test]
fn custom_predicate_columns_participate_in_alignment() {
    let schema = Schema::build(vec![
        Column::string("name", false, true, false),
        Column::custom("code", false, false, false, "-", |token| {
            token.starts_with('#') && token.len() == 4
        }),
    ])
    .unwrap();

    assert_eq!(
        aligned("alice,smith,#a12", &schema),
        vec!["alice,smith", "#a12"]
    );
    assert_eq!(
        rejected("alice,smith,a12", &schema),
        AlignmentFailure::Infeasible
    );
}

#[test]
fn align_row_is_idempotent() {
    let schema = Schema::build(vec![
        Column::string("cat_names", false, true, false),
        Column::string_with_format("cat_group_name", false, false, false, r"[a-z]{3}").unwrap(),
        Column::string("cat_colours", false, true, false),
    ])
    .unwrap();

    let first = aligned("chanom,chayen,cat,orange", &schema);
    for _ in 0..5 {
        assert_eq!(aligned("chanom,chayen,cat,orange", &schema), first);
    }
}
