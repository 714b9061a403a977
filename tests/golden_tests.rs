// tests/golden_tests.rs
//! Golden tests: real-world chat templates rendered against recorded
//! conversations, compared byte for byte with the reference renderer.


use prompt_jinja::RenderErrorKind;
use rstest::rstest;
use serde_json::json;
use test_harness::TemplateHarness;

#[rstest]
#[case("chatml")]
#[case("llama3")]
#[case("mistral")]
#[case("tool_calls")]
fn matches_golden_output(#[case] name: &str) {
    TemplateHarness::new().load(name).assert_golden();
}

#[test]
fn chatml_without_generation_prompt() {
    let fixture = TemplateHarness::new().load("chatml");
    let out = fixture
        .render_edited(|b| b["add_generation_prompt"] = json!(false))
        .unwrap();
    assert!(out.ends_with("What is 2 + 2?<|im_end|>\n"), "{out:?}");
}

#[test]
fn llama3_without_system_message() {
    let fixture = TemplateHarness::new().load("llama3");
    let out = fixture
        .render_edited(|b| {
            b["messages"] = json!([{"role": "user", "content": "Hi"}]);
            b["add_generation_prompt"] = json!(false);
        })
        .unwrap();
    assert_eq!(
        out,
        "<|begin_of_text|>\n<|start_header_id|>user<|end_header_id|>\n\nHi<|eot_id|>\n"
    );
}

#[test]
fn mistral_rejects_out_of_order_roles() {
    let fixture = TemplateHarness::new().load("mistral");
    let err = fixture
        .render_edited(|b| {
            b["messages"] = json!([
                {"role": "user", "content": "a"},
                {"role": "user", "content": "b"},
            ]);
        })
        .unwrap_err();
    assert_eq!(err.kind, RenderErrorKind::UserRaised);
    assert!(err.message.starts_with("After the optional system message"));
    assert!(err.span.is_some());
}

#[test]
fn mistral_without_system_message() {
    let fixture = TemplateHarness::new().load("mistral");
    let out = fixture
        .render_edited(|b| {
            b["messages"] = json!([
                {"role": "user", "content": "Hi"},
                {"role": "assistant", "content": "Hello"},
            ]);
        })
        .unwrap();
    assert_eq!(out, "<s> [INST] Hi [/INST] Hello</s>");
}

#[test]
fn tool_calls_without_tools_keep_the_system_turn() {
    let fixture = TemplateHarness::new().load("tool_calls");
    let out = fixture
        .render_edited(|b| {
            b["tools"] = json!([]);
            b["messages"] = json!([
                {"role": "system", "content": "Be brief."},
                {"role": "user", "content": "Hi"},
            ]);
        })
        .unwrap();
    assert_eq!(
        out,
        "<|im_start|>system\nBe brief.<|im_end|>\n<|im_start|>user\nHi<|im_end|>\n\
         <|im_start|>assistant\n<think>\n\n</think>\n\n"
    );
}

#[test]
fn templates_render_the_same_twice() {
    let fixture = TemplateHarness::new().load("tool_calls");
    assert_eq!(fixture.render().unwrap(), fixture.render().unwrap());
}
