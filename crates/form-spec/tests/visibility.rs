use serde_json::{Value, json};

use form_spec::{
    ConditionalRule, Field, FieldType, FormSpec, RuleAction, RuleOperator, is_visible,
    resolve_visibility, visible_fields,
};

fn fixture() -> FormSpec {
    serde_json::from_str(include_str!("fixtures/newsletter_form.json")).expect("deserialize")
}

fn source() -> Field {
    Field::new("f1", "subscribe", "Subscribe?", FieldType::Text)
}

fn target(rule: ConditionalRule) -> Field {
    Field::new("f2", "email", "Email", FieldType::Email).with_rule(rule)
}

fn visible_with(rule: ConditionalRule, answers: &Value) -> bool {
    let fields = vec![source(), target(rule)];
    is_visible(&fields[1], answers, &fields)
}

fn sample_answers() -> Vec<Value> {
    vec![
        json!({}),
        json!({ "subscribe": null }),
        json!({ "subscribe": "" }),
        json!({ "subscribe": "yes" }),
        json!({ "subscribe": "YES" }),
        json!({ "subscribe": "no" }),
        json!({ "subscribe": true }),
        json!({ "subscribe": false }),
        json!({ "subscribe": 0 }),
        json!({ "subscribe": 12.5 }),
        json!({ "subscribe": ["Yes", "Maybe"] }),
    ]
}

#[test]
fn fields_without_enabled_rules_are_always_visible() {
    let plain = Field::new("f2", "email", "Email", FieldType::Email);
    let disabled = target(ConditionalRule::new(RuleAction::Show, "f1", RuleOperator::Equals, "yes").disabled());
    let fields = vec![source(), plain.clone(), disabled.clone()];
    for answers in sample_answers() {
        assert!(is_visible(&plain, &answers, &fields));
        assert!(is_visible(&disabled, &answers, &fields));
    }
}

#[test]
fn unresolvable_source_fails_open() {
    let rule = ConditionalRule::new(RuleAction::Show, "deleted", RuleOperator::NotEmpty, "");
    let field = target(rule);
    let fields = vec![source(), field.clone()];
    for answers in sample_answers() {
        assert!(is_visible(&field, &answers, &fields));
    }
    assert!(is_visible(&field, &json!({}), &[]));
}

#[test]
fn equals_and_not_equals_are_complements() {
    for literal in ["yes", "", "true", "0", "12.5", "yes,maybe"] {
        for answers in sample_answers() {
            let equals = visible_with(
                ConditionalRule::new(RuleAction::Show, "f1", RuleOperator::Equals, literal),
                &answers,
            );
            let not_equals = visible_with(
                ConditionalRule::new(RuleAction::Show, "f1", RuleOperator::NotEquals, literal),
                &answers,
            );
            assert_ne!(equals, not_equals, "literal {literal:?} answers {answers}");
        }
    }
}

#[test]
fn not_empty_tracks_filled_values() {
    let rule = ConditionalRule::new(RuleAction::Show, "f1", RuleOperator::NotEmpty, "ignored");
    let expectations = [
        (json!({}), false),
        (json!({ "subscribe": null }), false),
        (json!({ "subscribe": "" }), false),
        (json!({ "subscribe": false }), false),
        (json!({ "subscribe": true }), true),
        (json!({ "subscribe": "x" }), true),
        (json!({ "subscribe": 0 }), true),
        (json!({ "subscribe": [] }), false),
        (json!({ "subscribe": ["a"] }), true),
    ];
    for (answers, expected) in expectations {
        assert_eq!(visible_with(rule.clone(), &answers), expected, "answers {answers}");
    }
}

#[test]
fn contains_is_case_insensitive() {
    let rule = ConditionalRule::new(RuleAction::Show, "f1", RuleOperator::Contains, "whale");
    assert!(visible_with(rule.clone(), &json!({ "subscribe": "Blue Whale" })));
    assert!(!visible_with(rule.clone(), &json!({ "subscribe": "Blue Shark" })));
    assert!(!visible_with(rule, &json!({})));

    let multi = ConditionalRule::new(RuleAction::Show, "f1", RuleOperator::Contains, "maybe");
    assert!(visible_with(multi, &json!({ "subscribe": ["Yes", "Maybe"] })));
}

#[test]
fn hide_inverts_show() {
    let operators = [
        (RuleOperator::Equals, "yes"),
        (RuleOperator::NotEquals, "yes"),
        (RuleOperator::Contains, "e"),
        (RuleOperator::NotEmpty, ""),
        (RuleOperator::GreaterThan, "5"),
        (RuleOperator::LessThan, "5"),
    ];
    for (operator, literal) in operators {
        for answers in sample_answers() {
            let show = visible_with(
                ConditionalRule::new(RuleAction::Show, "f1", operator, literal),
                &answers,
            );
            let hide = visible_with(
                ConditionalRule::new(RuleAction::Hide, "f1", operator, literal),
                &answers,
            );
            assert_ne!(show, hide, "{} {answers}", operator.as_str());
        }
    }
}

#[test]
fn equals_scenario_matches_case_insensitively() {
    let rule = ConditionalRule::new(RuleAction::Show, "f1", RuleOperator::Equals, "yes");
    assert!(visible_with(rule.clone(), &json!({ "subscribe": "Yes" })));
    assert!(!visible_with(rule, &json!({ "subscribe": "no" })));
}

#[test]
fn untouched_source_with_not_empty() {
    let show = ConditionalRule::new(RuleAction::Show, "f1", RuleOperator::NotEmpty, "");
    let hide = ConditionalRule::new(RuleAction::Hide, "f1", RuleOperator::NotEmpty, "");
    assert!(!visible_with(show, &json!({})));
    assert!(visible_with(hide, &json!({})));
}

#[test]
fn numeric_comparisons_need_numbers() {
    let older = ConditionalRule::new(RuleAction::Show, "f1", RuleOperator::GreaterThan, "17");
    assert!(visible_with(older.clone(), &json!({ "subscribe": 18 })));
    assert!(visible_with(older.clone(), &json!({ "subscribe": "21" })));
    assert!(!visible_with(older.clone(), &json!({ "subscribe": 17 })));
    assert!(!visible_with(older, &json!({ "subscribe": "teen" })));

    let younger = ConditionalRule::new(RuleAction::Show, "f1", RuleOperator::LessThan, "abc");
    assert!(!visible_with(younger, &json!({ "subscribe": 3 })));
}

#[test]
fn self_reference_evaluates_against_own_answer() {
    let field = Field::new("f1", "nickname", "Nickname", FieldType::Text).with_rule(
        ConditionalRule::new(RuleAction::Show, "f1", RuleOperator::NotEmpty, ""),
    );
    let fields = vec![field.clone()];
    assert!(!is_visible(&field, &json!({}), &fields));
    assert!(is_visible(&field, &json!({ "nickname": "Ace" }), &fields));
}

#[test]
fn non_object_answers_behave_as_empty() {
    let rule = ConditionalRule::new(RuleAction::Show, "f1", RuleOperator::Equals, "");
    assert!(visible_with(rule.clone(), &Value::Null));
    assert!(visible_with(rule, &json!(["subscribe"])));
}

#[test]
fn evaluation_is_repeatable() {
    let spec = fixture();
    let answers = json!({ "subscribe": "Yes" });
    let first = resolve_visibility(&spec, &answers);
    for _ in 0..5 {
        assert_eq!(resolve_visibility(&spec, &answers), first);
    }
}

#[test]
fn fixture_visibility_follows_subscription_choice() {
    let spec = fixture();

    let visibility = resolve_visibility(&spec, &json!({ "subscribe": "Yes" }));
    assert_eq!(visibility["f3"], true);
    assert_eq!(visibility["f4"], false);

    let visibility = resolve_visibility(&spec, &json!({ "subscribe": "No" }));
    assert_eq!(visibility["f3"], false);
    assert_eq!(visibility["f4"], true);

    let names = visible_fields(&spec, &json!({}))
        .into_iter()
        .map(|field| field.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["full_name", "subscribe"]);
}
