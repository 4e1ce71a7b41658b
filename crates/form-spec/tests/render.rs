use serde_json::json;

use form_spec::{
    FormSpec,
    render::{RenderStatus, build_render_payload, render_json_ui, render_text},
};

fn fixture(name: &str) -> &'static str {
    match name {
        "newsletter_form" => include_str!("../tests/fixtures/newsletter_form.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

#[test]
fn render_text_includes_next_field() {
    let spec: FormSpec = serde_json::from_str(fixture("newsletter_form")).expect("deserialize");
    let payload = build_render_payload(&spec, &json!({}));

    assert_eq!(payload.status, RenderStatus::NeedInput);
    assert_eq!(payload.next_field_id.as_deref(), Some("f1"));

    let text = render_text(&payload);
    assert!(text.contains("Next field: f1"));
    assert!(text.contains("Visible fields"));
    assert!(!text.contains("email"));
}

#[test]
fn render_json_ui_exposes_structure() {
    let spec: FormSpec = serde_json::from_str(fixture("newsletter_form")).expect("deserialize");
    let payload = build_render_payload(&spec, &json!({ "full_name": "Ada", "subscribe": "yes" }));

    let ui = render_json_ui(&payload);
    assert_eq!(ui["form_id"], "newsletter-signup");
    assert_eq!(ui["status"], "need_input");
    assert_eq!(ui["next_field_id"], "f3");
    assert_eq!(ui["progress"]["answered"], 2);
    assert_eq!(ui["progress"]["total"], 3);
    let fields = ui["fields"].as_array().expect("fields array");
    let email = fields
        .iter()
        .find(|field| field["name"] == "email")
        .expect("email field");
    assert_eq!(email["visible"], true);
    assert_eq!(email["placeholder"], "you@example.com");
    let reason = fields
        .iter()
        .find(|field| field["name"] == "reason")
        .expect("reason field");
    assert_eq!(reason["visible"], false);
}

#[test]
fn completed_form_reports_complete() {
    let spec: FormSpec = serde_json::from_str(fixture("newsletter_form")).expect("deserialize");
    let payload = build_render_payload(&spec, &json!({ "full_name": "Ada", "subscribe": "No" }));

    assert_eq!(payload.status, RenderStatus::Complete);
    assert!(payload.next_field_id.is_none());
    let text = render_text(&payload);
    assert!(text.contains("All visible required fields are answered."));
    assert!(text.contains("reason"));
}

#[test]
fn render_keeps_position_order() {
    let spec: FormSpec = serde_json::from_value(json!({
        "id": "ordered",
        "name": "Ordered",
        "fields": [
            { "id": "b", "name": "second", "label": "Second", "type": "text", "position": 5 },
            { "id": "a", "name": "first", "label": "First", "type": "boolean", "position": 1 }
        ]
    }))
    .expect("deserialize");
    let payload = build_render_payload(&spec, &json!({}));
    let ids = payload
        .fields
        .iter()
        .map(|field| field.id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(payload.status, RenderStatus::Complete);
}
