//! End-to-end scenarios through run_all → decide.

use deltamerge_core::{
    ConflictStyle, GateReason, MergeOptions, Outcome, PublishMode, ReconcileOptions, RunStatus,
    SnapshotSet, Unit, UnitName, WhitespaceRule, decide, run_all,
};

fn name(s: &str) -> UnitName {
    UnitName::new(s)
}

/// Three units: a no-op delta, a clean addition, and a line-5 conflict.
fn three_unit_batch() -> Vec<Unit> {
    let base = "l1\nl2\nl3\nl4\nl5\nl6\n";
    vec![
        Unit::new(
            "A.cls",
            SnapshotSet::present("x\ny\n", "x\ny\n", "x  \ny\n"),
        ),
        Unit::new(
            "B.cls",
            SnapshotSet::present(base, format!("{base}l7\n"), base),
        ),
        Unit::new(
            "C.cls",
            SnapshotSet::present(
                base,
                "l1\nl2\nl3\nl4\nDELTA\nl6\n",
                "l1\nl2\nl3\nl4\nHOTFIX\nl6\n",
            ),
        ),
    ]
}

#[test]
fn mixed_batch_is_classified_and_publication_refused() {
    let run = run_all(&three_unit_batch(), &ReconcileOptions::default()).unwrap();
    let result = &run.result;

    assert_eq!(result.no_real_change, vec![name("A.cls")]);
    assert_eq!(result.clean, vec![name("B.cls")]);
    assert_eq!(result.conflicted, vec![name("C.cls")]);
    assert!(result.has_conflicts());

    let b = &run.final_texts[&name("B.cls")];
    assert_eq!(b.primary.text, "l1\nl2\nl3\nl4\nl5\nl6\nl7\n");

    let a = &run.final_texts[&name("A.cls")];
    assert_eq!(a.primary.text, "x  \ny\n");

    let c = &run.final_texts[&name("C.cls")];
    assert!(c.conflict_count() >= 1);
    assert!(c.primary.text.contains("<<<<<<< target\nHOTFIX\n=======\nDELTA\n>>>>>>> delta\n"));

    let decision = decide(result, PublishMode::Publish);
    assert!(!decision.proceed);
    assert_eq!(decision.reason, GateReason::ConflictsOutstanding);
    assert_eq!(RunStatus::from_result(result).exit_code(), 1);
}

#[test]
fn preview_still_lists_clean_units_when_conflicts_exist() {
    let run = run_all(&three_unit_batch(), &ReconcileOptions::default()).unwrap();
    let decision = decide(&run.result, PublishMode::Preview);
    assert!(!decision.proceed);
    assert_eq!(decision.units_to_publish, vec![name("B.cls")]);
}

#[test]
fn conflict_free_batch_publishes_clean_subset_only() {
    let mut units = three_unit_batch();
    units.pop();
    let run = run_all(&units, &ReconcileOptions::default()).unwrap();
    let decision = decide(&run.result, PublishMode::Publish);
    assert!(decision.proceed);
    assert_eq!(decision.units_to_publish, vec![name("B.cls")]);
    assert_eq!(RunStatus::from_result(&run.result), RunStatus::Success);
}

#[test]
fn target_hotfix_is_preserved_alongside_delta() {
    let before = "class Foo {\n  void a() {}\n  void b() {}\n  void c() {}\n}\n";
    let after = "class Foo {\n  void a() {}\n  void b() {}\n  void c() { log(); }\n}\n";
    let target = "class Foo {\n  void a() { hotfix(); }\n  void b() {}\n  void c() {}\n}\n";
    let units = vec![Unit::new("Foo.cls", SnapshotSet::present(before, after, target))];
    let run = run_all(&units, &ReconcileOptions::default()).unwrap();
    assert_eq!(run.result.clean, vec![name("Foo.cls")]);
    assert_eq!(
        run.final_texts[&name("Foo.cls")].primary.text,
        "class Foo {\n  void a() { hotfix(); }\n  void b() {}\n  void c() { log(); }\n}\n"
    );
}

#[test]
fn reformatting_only_merge_is_no_real_change() {
    // Delta only re-indents a line the target already carries unchanged.
    let before = "a\n  b\nc\n";
    let after = "a\n    b\nc\n";
    let target = "a\n  b\nc\nz\n";
    let units = vec![Unit::new("W.cls", SnapshotSet::present(before, after, target))];
    let run = run_all(&units, &ReconcileOptions::default()).unwrap();
    assert_eq!(run.result.no_real_change, vec![name("W.cls")]);
    assert_eq!(run.final_texts[&name("W.cls")].primary.text, target);
}

#[test]
fn collapse_runs_rule_treats_removed_space_as_change() {
    let before = "a b\nend\n";
    let after = "ab\nend\n";
    let target = "a b\nend\nz\n";
    let units = vec![Unit::new("W.cls", SnapshotSet::present(before, after, target))];

    let ignore_all = run_all(&units, &ReconcileOptions::default()).unwrap();
    assert_eq!(ignore_all.result.no_real_change, vec![name("W.cls")]);

    let options = ReconcileOptions {
        whitespace: WhitespaceRule::CollapseRuns,
        ..ReconcileOptions::default()
    };
    let collapse = run_all(&units, &options).unwrap();
    assert_eq!(collapse.result.clean, vec![name("W.cls")]);
}

#[test]
fn diff3_style_flows_through_batch() {
    let units = vec![Unit::new(
        "C.cls",
        SnapshotSet::present("a\nb\nc\n", "a\nD\nc\n", "a\nT\nc\n"),
    )];
    let options = ReconcileOptions {
        merge: MergeOptions {
            style: ConflictStyle::Diff3,
            ..MergeOptions::default()
        },
        ..ReconcileOptions::default()
    };
    let run = run_all(&units, &options).unwrap();
    let text = &run.final_texts[&name("C.cls")].primary.text;
    assert!(text.contains("||||||| before\nb\n"));
}

#[test]
fn companion_outcome_folds_into_unit() {
    let unit = Unit::new("Foo.cls", SnapshotSet::present("a\n", "a\n", "a\n")).with_companion(
        "Foo.cls-meta.xml",
        SnapshotSet::present("<v>1</v>\n", "<v>2</v>\n", "<v>1</v>\n"),
    );
    let run = run_all(&[unit], &ReconcileOptions::default()).unwrap();
    assert_eq!(run.result.clean, vec![name("Foo.cls")]);
    let texts = &run.final_texts[&name("Foo.cls")];
    assert_eq!(texts.primary.outcome, Outcome::NoRealChange);
    assert_eq!(texts.companion.as_ref().unwrap().text, "<v>2</v>\n");
}

#[test]
fn rerunning_identical_inputs_is_idempotent() {
    let first = run_all(&three_unit_batch(), &ReconcileOptions::default()).unwrap();
    let second = run_all(&three_unit_batch(), &ReconcileOptions::default()).unwrap();
    assert_eq!(first, second);
}
