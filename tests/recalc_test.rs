//! Tests for the recalculation engine: allocation, aggregation, variance and
//! the edit controller, exercised through the public API.

use rstest::{fixture, rstest};

use ledgertree::application::services::{apply_edit, EditController, RecalcPolicy};
use ledgertree::domain::{
    aggregate, allocate, variance_between, Baseline, BaselineLookup, EditMode, EditRequest,
    InputValues, Ledger, Node, Variance, ZeroBaselinePolicy,
};
use ledgertree::util::testing;

const EPS: f64 = 1e-9;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < EPS * b.abs().max(1.0)
}

#[fixture]
fn sample() -> Ledger {
    testing::init_test_setup();
    Ledger::sample()
}

fn deep() -> Ledger {
    Ledger::new(vec![Node::parent(
        "company",
        "Company",
        vec![
            Node::parent(
                "ops",
                "Operations",
                vec![
                    Node::leaf("rent", "Rent", 1200.0),
                    Node::leaf("power", "Power", 300.0),
                ],
            ),
            Node::parent(
                "staff",
                "Staff",
                vec![
                    Node::parent(
                        "eng",
                        "Engineering",
                        vec![Node::leaf("salaries", "Salaries", 5000.0)],
                    ),
                    Node::leaf("training", "Training", 250.0),
                ],
            ),
            Node::leaf("misc", "Misc", 50.0),
        ],
    )])
}

fn zero_sum() -> Ledger {
    Ledger::new(vec![
        Node::parent(
            "reserve",
            "Reserve",
            vec![Node::leaf("a", "A", 0.0), Node::leaf("b", "B", 0.0)],
        ),
        Node::parent("empty", "Empty", vec![]),
        Node::leaf("cash", "Cash", 10.0),
    ])
}

fn stale() -> Ledger {
    // Authored parent values that disagree with their children
    Ledger::new(vec![Node::parent(
        "root",
        "Root",
        vec![
            Node::parent("x", "X", vec![Node::leaf("x1", "X1", 1.5), Node::leaf("x2", "X2", 2.5)])
                .with_value(100.0),
            Node::leaf("y", "Y", 3.0),
        ],
    )
    .with_value(-1.0)])
}

fn assert_sums_consistent(nodes: &[Node]) {
    for node in nodes {
        if let Some(children) = &node.children {
            let sum: f64 = children.iter().map(|c| c.value).sum();
            assert!(
                approx(node.value, sum),
                "{}: value {} != children sum {}",
                node.id,
                node.value,
                sum
            );
            assert_sums_consistent(children);
        }
    }
}

// ============================================================
// Aggregation
// ============================================================

#[rstest]
#[case::sample(Ledger::sample())]
#[case::deep(deep())]
#[case::zero_sum(zero_sum())]
#[case::stale(stale())]
fn given_any_tree_when_aggregating_twice_then_idempotent(#[case] ledger: Ledger) {
    let once = aggregate(ledger.nodes());
    let twice = aggregate(&once);
    assert_eq!(once, twice);
    assert_sums_consistent(&once);
}

#[rstest]
fn given_stale_parents_when_aggregating_then_sums_bottom_up() {
    let out = stale().aggregated();
    assert_eq!(out.find("x").unwrap().value, 4.0);
    assert_eq!(out.find("root").unwrap().value, 7.0);
}

// ============================================================
// Allocation
// ============================================================

#[rstest]
#[case("electronics", 1650.0)]
#[case("electronics", 0.0)]
#[case("furniture", 12345.67)]
#[case("furniture", -200.0)]
fn given_parent_with_nonzero_children_when_allocating_then_shares_preserved(
    sample: Ledger,
    #[case] id: &str,
    #[case] new_value: f64,
) {
    let parent = sample.find(id).unwrap();
    let total = parent.children_total();
    let out = allocate(parent, new_value);

    assert_eq!(out.value, new_value);
    assert!(approx(out.children_total(), new_value));
    for (before, after) in parent.children().iter().zip(out.children()) {
        assert_eq!(before.id, after.id);
        assert!(approx(after.value, new_value * (before.value / total)));
    }
}

#[rstest]
fn given_zero_sum_children_when_allocating_then_children_untouched() {
    let ledger = zero_sum();
    let reserve = ledger.find("reserve").unwrap();
    let out = allocate(reserve, 75.0);
    assert_eq!(out.children(), reserve.children());

    let empty = ledger.find("empty").unwrap();
    assert_eq!(allocate(empty, 5.0).children, Some(vec![]));
}

// ============================================================
// Variance
// ============================================================

#[rstest]
#[case(1000.0, 800.0)]
#[case(770.0, 700.0)]
#[case(1.0, 3.0)]
#[case(-50.0, 200.0)]
#[case(123.456, 0.001)]
fn given_nonzero_baseline_when_computing_variance_then_matches_rounded_formula(
    #[case] value: f64,
    #[case] baseline: f64,
) {
    let expected = format!("{:.2}%", (value - baseline) / baseline * 100.0);
    let actual = variance_between(value, baseline, ZeroBaselinePolicy::Sentinel).to_string();
    assert_eq!(actual, expected);
}

#[rstest]
fn given_zero_baseline_leaf_when_edited_then_policy_decides_variance() {
    let ledger = zero_sum();
    let baseline = Baseline::capture(&ledger);
    let request = EditRequest::direct("a", 40.0);
    let inputs = InputValues::new();

    let sentinel = apply_edit(&ledger, &baseline, &inputs, &request, RecalcPolicy::default());
    assert_eq!(
        sentinel.find("a").unwrap().variance,
        Some(Variance::Infinite { negative: false })
    );
    assert_eq!(sentinel.find("b").unwrap().variance, Some(Variance::ZERO));

    let propagate = RecalcPolicy {
        zero_baseline: ZeroBaselinePolicy::Propagate,
        ..RecalcPolicy::default()
    };
    let out = apply_edit(&ledger, &baseline, &inputs, &request, propagate);
    assert_eq!(out.find("b").unwrap().variance, Some(Variance::Undefined));

    let clamp = RecalcPolicy {
        zero_baseline: ZeroBaselinePolicy::Clamp,
        ..RecalcPolicy::default()
    };
    let out = apply_edit(&ledger, &baseline, &inputs, &request, clamp);
    assert_eq!(out.find("a").unwrap().variance.unwrap().to_string(), "0.00%");
}

// ============================================================
// Edit controller
// ============================================================

#[rstest]
fn given_direct_edit_on_leaf_when_applied_then_parent_recomputed(sample: Ledger) {
    let baseline = Baseline::capture(&sample);
    let out = apply_edit(
        &sample,
        &baseline,
        &InputValues::new(),
        &EditRequest::direct("phones", 1000.0),
        RecalcPolicy::default(),
    );

    let phones = out.find("phones").unwrap();
    assert_eq!(phones.value, 1000.0);
    assert_eq!(phones.variance.unwrap().to_string(), "25.00%");
    assert_eq!(out.find("electronics").unwrap().value, 1700.0);
    assert_eq!(
        out.find("laptops").unwrap().variance.unwrap().to_string(),
        "0.00%"
    );
    assert_eq!(
        out.find("electronics").unwrap().variance.unwrap().to_string(),
        "13.33%"
    );
}

#[rstest]
fn given_percentage_edit_on_parent_when_applied_then_children_scaled(sample: Ledger) {
    let baseline = Baseline::capture(&sample);
    let out = apply_edit(
        &sample,
        &baseline,
        &InputValues::new(),
        &EditRequest::percentage("electronics", 10.0),
        RecalcPolicy::default(),
    );

    let electronics = out.find("electronics").unwrap();
    assert!(approx(electronics.value, 1650.0));
    assert_eq!(electronics.variance.unwrap().to_string(), "10.00%");
    assert_eq!(format!("{:.2}", out.find("phones").unwrap().value), "880.00");
    assert_eq!(format!("{:.2}", out.find("laptops").unwrap().value), "770.00");
    // Untouched branch keeps its values
    assert_eq!(out.find("furniture").unwrap().value, 1000.0);
    assert_eq!(
        out.find("chairs").unwrap().variance.unwrap().to_string(),
        "0.00%"
    );
}

#[rstest]
fn given_unknown_id_when_applied_then_tree_unchanged(sample: Ledger) {
    let baseline = Baseline::capture(&sample);
    let out = apply_edit(
        &sample,
        &baseline,
        &InputValues::new(),
        &EditRequest::direct("nonexistent", 5.0),
        RecalcPolicy::default(),
    );
    assert_eq!(out, sample);
}

#[rstest]
#[case::leaf_direct(EditRequest::direct("power", 900.0))]
#[case::leaf_percentage(EditRequest::percentage("salaries", -20.0))]
#[case::mid_direct(EditRequest::direct("staff", 10_000.0))]
#[case::root_percentage(EditRequest::percentage("company", 50.0))]
#[case::pending_amount(EditRequest::pending("ops", EditMode::Percentage))]
fn given_any_edit_when_applied_then_every_parent_equals_children_sum(#[case] request: EditRequest) {
    let ledger = deep();
    let baseline = Baseline::capture(&ledger);
    let mut inputs = InputValues::new();
    inputs.set("ops", 15.0);

    let out = apply_edit(&ledger, &baseline, &inputs, &request, RecalcPolicy::default());

    assert_sums_consistent(out.nodes());
    assert!(out.walk().iter().all(|(_, n)| n.variance.is_some()));
    assert_eq!(out.len(), ledger.len());
}

#[rstest]
fn given_edit_when_applied_then_input_tree_is_not_mutated(sample: Ledger) {
    let before = sample.clone();
    let baseline = Baseline::capture(&sample);
    let _ = apply_edit(
        &sample,
        &baseline,
        &InputValues::new(),
        &EditRequest::percentage("furniture", 30.0),
        RecalcPolicy::default(),
    );
    assert_eq!(sample, before);
}

#[rstest]
fn given_mid_level_edit_when_applied_then_grandchildren_reconcile_on_aggregation() {
    // Allocation is one level deep: "eng" is rescaled but its own leaf is not,
    // so aggregation rolls "eng" back to the sum of its untouched leaf.
    let ledger = deep();
    let baseline = Baseline::capture(&ledger);
    let out = apply_edit(
        &ledger,
        &baseline,
        &InputValues::new(),
        &EditRequest::direct("staff", 10_500.0),
        RecalcPolicy::default(),
    );

    assert_eq!(out.find("salaries").unwrap().value, 5000.0);
    assert_eq!(out.find("eng").unwrap().value, 5000.0);
    assert!(approx(out.find("training").unwrap().value, 500.0));
    assert!(approx(out.find("staff").unwrap().value, 5500.0));
}

#[rstest]
fn given_successive_percentage_edits_when_applied_then_resolved_against_baseline(sample: Ledger) {
    let controller = EditController::new(Baseline::capture(&sample), RecalcPolicy::default());
    let inputs = InputValues::new();

    let first = controller.apply(&sample, &inputs, &EditRequest::percentage("furniture", 10.0));
    let second = controller.apply(&first, &inputs, &EditRequest::percentage("furniture", 10.0));

    assert!(approx(second.find("furniture").unwrap().value, 1100.0));
    assert!(approx(second.find("tables").unwrap().value, 330.0));
}

#[rstest]
fn given_nested_target_when_lookup_is_top_level_then_original_is_current_value(sample: Ledger) {
    let baseline = Baseline::capture(&sample);
    let inputs = InputValues::new();
    let top_level = RecalcPolicy {
        baseline_lookup: BaselineLookup::TopLevel,
        ..RecalcPolicy::default()
    };

    let edited = apply_edit(&sample, &baseline, &inputs, &EditRequest::direct("phones", 1000.0), top_level);
    let again = apply_edit(&edited, &baseline, &inputs, &EditRequest::percentage("phones", 10.0), top_level);
    assert!(approx(again.find("phones").unwrap().value, 1100.0));

    let recursive = apply_edit(
        &edited,
        &baseline,
        &inputs,
        &EditRequest::percentage("phones", 10.0),
        RecalcPolicy::default(),
    );
    assert!(approx(recursive.find("phones").unwrap().value, 880.0));
}

#[rstest]
fn given_direct_edit_without_amount_when_applied_then_restores_original(sample: Ledger) {
    let baseline = Baseline::capture(&sample);
    let inputs = InputValues::new();
    let edited = apply_edit(
        &sample,
        &baseline,
        &inputs,
        &EditRequest::direct("electronics", 3000.0),
        RecalcPolicy::default(),
    );
    let restored = apply_edit(
        &edited,
        &baseline,
        &inputs,
        &EditRequest::pending("electronics", EditMode::Direct),
        RecalcPolicy::default(),
    );

    assert!(approx(restored.find("electronics").unwrap().value, 1500.0));
    assert!(approx(restored.find("phones").unwrap().value, 800.0));
    assert_eq!(
        restored.find("electronics").unwrap().variance.unwrap().to_string(),
        "0.00%"
    );
}
