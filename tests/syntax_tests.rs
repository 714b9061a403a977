// tests/syntax_tests.rs
//! End-to-end syntax tests through the public `Template` API
//!
//! Covers whitespace control under every combination of `trim_blocks` and
//! `lstrip_blocks`, the error messages templates see, and the expression
//! forms chat templates lean on.

use prompt_jinja::{Options, RenderErrorKind, RenderOptions, SyntaxErrorKind, Template};
use rstest::rstest;
use serde_json::{Value as Json, json};

fn render(source: &str, bindings: Json, options: Options) -> String {
    Template::compile(source, options)
        .unwrap_or_else(|e| panic!("{}", e.display_with_source(source)))
        .render(&bindings)
        .unwrap_or_else(|e| panic!("{source}: {e}"))
}

fn plain() -> Options {
    Options::default()
}

fn lstrip() -> Options {
    Options::default().with_lstrip_blocks(true)
}

fn trim() -> Options {
    Options::default().with_trim_blocks(true)
}

fn lstrip_trim() -> Options {
    Options::default().with_trim_blocks(true).with_lstrip_blocks(true)
}

// ============================================================================
// Whitespace control
// ============================================================================

#[rstest]
#[case(lstrip(), "    {% if True %}\n    {% endif %}", "\n")]
#[case(lstrip_trim(), "    {% if True %}\n    {% endif %}", "")]
#[case(trim(), "    {% if True %}\n    {% endif %}", "        ")]
#[case(plain(), "  {% set _ = 1 %}    ", "      ")]
#[case(lstrip(), "  {% set _ = 1 %}    ", "    ")]
#[case(trim(), "  {% set _ = 1 %}    ", "      ")]
#[case(lstrip_trim(), "  {% set _ = 1 %}    ", "    ")]
#[case(plain(), "  \n    {% set _ = 1 %}        \n                ", "  \n            \n                ")]
#[case(lstrip(), "  \n    {% set _ = 1 %}        \n                ", "  \n        \n                ")]
#[case(trim(), "  \n    {% set _ = 1 %}        \n                ", "  \n            \n                ")]
#[case(lstrip_trim(), "  \n    {% set _ = 1 %}        \n                ", "  \n        \n                ")]
#[case(plain(), "{% set _ = 1 %}\n  ", "\n  ")]
#[case(lstrip(), "{% set _ = 1 %}\n  ", "\n  ")]
#[case(trim(), "{% set _ = 1 %}\n  ", "  ")]
#[case(lstrip_trim(), "{% set _ = 1 %}\n  ", "  ")]
#[case(lstrip_trim(), "  {% set _ = 1 %}    {% set _ = 2 %}b", "    b")]
#[case(lstrip_trim(), "{%- if True %}        {% set _ = x %}{%- endif %}{{ 1 }}", "        1")]
#[case(trim(), "  {{- ' a\n'}}", " a\n")]
#[case(plain(), "a\nb\n", "a\nb")]
#[case(plain().with_keep_trailing_newline(true), "a\nb\n", "a\nb\n")]
fn whitespace_options(#[case] options: Options, #[case] source: &str, #[case] expected: &str) {
    assert_eq!(render(source, json!({}), options), expected);
}

#[rstest]
#[case(plain(), "\n  Hello  \n...\n")]
#[case(trim(), "\n  Hello  \n...\n")]
#[case(lstrip(), "\nHello  \n...\n")]
#[case(lstrip_trim(), "\nHello  \n...\n")]
fn block_inside_a_line(#[case] options: Options, #[case] expected: &str) {
    let source = "\n  {% if true %}Hello{% endif %}  \n...\n\n";
    assert_eq!(render(source, json!({}), options), expected);
}

#[test]
fn comments_and_markers() {
    let source = "{# Hey\nHo #}{#- Multiline...\nComments! -#}{{ 'ok' }}{# yo #}";
    assert_eq!(render(source, json!({}), plain()), "ok");
    assert_eq!(render("a  {{- 'b' -}}  \n c", json!({}), plain()), "abc");
    assert_eq!(render("  {%+ if true %}x{% endif +%}\ny", json!({}), lstrip_trim()), "  x\ny");
}

// ============================================================================
// Expressions and statements
// ============================================================================

#[rstest]
#[case("{{ 'a' + [] | length | string + 'b' }}", "a0b")]
#[case("{{ 'Tools: ' + [1, 2, 3] | reject('equalto', 2) | join(', ') + '...' }}", "Tools: 1, 3...")]
#[case("{% set foo %}Hello {{ 'there' }}{% endset %}{{ 1 ~ foo ~ 2 }}", "1Hello there2")]
#[case("{{ range(5) | length % 2 == 1 }},{{ [] | length > 0 }}", "True,False")]
#[case("{%- for x, y in [('a', 'b'), ('c', 'd')] -%}{{- x }},{{ y -}};{%- endfor -%}", "a,b;c,d;")]
#[case("{{ 'ab' * 3 }}|{{ [1, 2, 3][-1] }}|{{ 'abcdef'[1:4] }}|{{ [1, 2, 3, 4][::-2] }}", "ababab|3|bcd|[4, 2]")]
#[case("{%- for i in range(0) -%}NAH{% else %}OK{% endfor %}", "OK")]
#[case("{%- for i in range(5) -%}({{ i }}, {{ loop.cycle('odd', 'even') }}),{%- endfor -%}", "(0, odd),(1, even),(2, odd),(3, even),(4, odd),")]
#[case("{{ {1: 2}.get(1) }}; {{ {}.get(1) or '' }}; {{ {}.get(1, 10) }}", "2; ; 10")]
#[case("{% for i in range(10) %}{% if i == 3 %}{% break %}{% endif %}{% if i is odd %}{% continue %}{% endif %}{{ i }}{% endfor %}", "02")]
#[case("{{ 'a' if none else 'b' }}{{ 'c' if 1 }}", "bc")]
#[case("{{ [1, 'a', none, true, 1.5] }} {{ {'k': [none]} }}", "[1, 'a', None, True, 1.5] {'k': [None]}")]
#[case("{{ 7 // 2 }} {{ -7 // 2 }} {{ 7 % -3 }} {{ 2 ** 10 }} {{ 7 / 2 }} {{ 1 / 4 * 2 }}", "3 -4 -2 1024 3.5 0.5")]
#[case("{{ 'x' in 'xyz' }} {{ 3 not in [1, 2] }} {{ 'k' in {'k': 1} }}", "True True True")]
#[case("{% generation %}Foo{% endgeneration %}", "Foo")]
fn expressions(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(render(source, json!({}), plain()), expected);
}

#[test]
fn loop_metadata() {
    let source = "{%- for x in range(3) -%}\
        {%- if loop.first -%}but first, mojitos!{%- endif -%}\
        {{ loop.index }}{{ ',' if not loop.last -}}\
        {%- endfor -%}";
    assert_eq!(render(source, json!({}), plain()), "but first, mojitos!1,2,3");

    let source = "{% for m in messages if m.role != 'system' %}{{ loop.index }}:{{ m.content }} {% endfor %}";
    let bindings = json!({"messages": [
        {"role": "system", "content": "s"},
        {"role": "user", "content": "u"},
        {"role": "assistant", "content": "a"},
    ]});
    assert_eq!(render(source, bindings, plain()), "1:u 2:a ");
}

#[test]
fn macros_see_their_definition_scope() {
    let source = "{%- set x = 1 -%}{%- set y = 2 -%}\
        {%- macro foo(x, z, w=10) -%}x={{ x }}, y={{ y }}, z={{ z }}, w={{ w -}}{%- endmacro -%}\
        {{- foo(100, 3) -}}";
    assert_eq!(render(source, json!({}), plain()), "x=100, y=2, z=3, w=10");

    let source = "{%- macro foo(values=[]) -%}{%- set _ = values.append(1) -%}{{- values -}}{%- endmacro -%}\
        {{- foo() }} {{ foo() -}}";
    assert_eq!(render(source, json!({}), plain()), "[1] [1]");
}

#[test]
fn bindings_are_mutable_views() {
    let bindings = json!({"a": {"b": [1, 2]}, "c": {"d": {"e": 3}}});
    assert_eq!(
        render("{% set _ = a.b.append(c.d.e) %}{{ a.b }}", bindings, plain()),
        "[1, 2, 3]"
    );

    let bindings = json!({"user": {"name": "Ann", "age": 41}});
    assert_eq!(
        render(
            "{{ user.name ~ '!' }} {{ user['age'] + 1 }} {{ user.missing is defined }}",
            bindings,
            plain()
        ),
        "Ann! 42 False"
    );
}

#[test]
fn filter_blocks_and_chains() {
    assert_eq!(
        render("{% filter upper %}hello {{ name }}{% endfilter %}", json!({"name": "ann"}), plain()),
        "HELLO ANN"
    );
    let bindings = json!({"messages": [
        {"role": "user", "content": "x"},
        {"role": "tool", "content": "y"},
        {"role": "user", "content": "z"},
    ]});
    assert_eq!(
        render(
            "{{ messages | selectattr('role', 'equalto', 'user') | map(attribute='content') | join(', ') }}",
            bindings,
            plain()
        ),
        "x, z"
    );
}

// ============================================================================
// Errors
// ============================================================================

#[rstest]
#[case("{% else %}", "Unexpected else")]
#[case("{% endif %}", "Unexpected endif")]
#[case("{% elif 1 %}", "Unexpected elif")]
#[case("{% endfor %}", "Unexpected endfor")]
#[case("{% endfilter %}", "Unexpected endfilter")]
#[case("{% if 1 %}", "Unterminated if")]
#[case("{% for x in 1 %}", "Unterminated for")]
#[case("{% generation %}", "Unterminated generation")]
#[case("{% if 1 %}{% else %}", "Unterminated if")]
#[case("{% if 1 %}{% else %}{% elif 1 %}{% endif %}", "Unterminated if")]
#[case("{% filter trim %}", "Unterminated filter")]
#[case("{# ", "Missing end of comment tag")]
fn syntax_errors(#[case] source: &str, #[case] message: &str) {
    let err = Template::compile(source, Options::default()).unwrap_err();
    assert!(err.message.contains(message), "{source}: {}", err.message);
}

#[test]
fn unterminated_blocks_have_their_own_kind() {
    let err = Template::compile("{% for x in y %}", Options::default()).unwrap_err();
    assert_eq!(err.kind, SyntaxErrorKind::Unterminated);
}

#[test]
fn long_expression_chains_are_rejected() {
    for chain in [" + 1", " | string", ".a", "[0]", " < 1"] {
        let source = format!("{{{{ x{} }}}}", chain.repeat(10_000));
        let err = Template::compile(&source, Options::default()).unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::TooDeep, "{chain}");
    }
}

#[rstest]
#[case("{{ '' | items }}", "Can only get item pairs from a mapping")]
#[case("{{ [] | items }}", "Can only get item pairs from a mapping")]
#[case("{{ None | items }}", "Can only get item pairs from a mapping")]
#[case("{% break %}", "break outside of a loop")]
#[case("{% continue %}", "continue outside of a loop")]
#[case("{%- set _ = [].pop() -%}", "pop from empty list")]
#[case("{%- set _ = {}.pop('foooo') -%}", "foooo")]
#[case("{{ raise_exception('hey') }}", "hey")]
fn render_errors(#[case] source: &str, #[case] message: &str) {
    let template = Template::compile(source, Options::default()).unwrap();
    let err = template.render(&json!({})).unwrap_err();
    assert!(err.message.contains(message), "{source}: {}", err.message);
}

#[test]
fn strict_mode_reports_undefined_names() {
    let template = Template::compile("{{ a.b }}", Options::default()).unwrap();
    assert_eq!(template.render(&json!({})).unwrap(), "");
    let err = template
        .render_with(prompt_jinja::Context::new(), RenderOptions::strict())
        .unwrap_err();
    assert_eq!(err.kind, RenderErrorKind::Name);
    assert!(err.message.contains("'a' is undefined"), "{}", err.message);
}

#[test]
fn json_integers_keep_their_value() {
    let template = Template::compile("{{ x | tojson }}", Options::default()).unwrap();
    for x in [json!(i64::MAX), json!(i64::MIN), json!(-1)] {
        let out = template.render(&json!({ "x": x.clone() })).unwrap();
        assert_eq!(serde_json::from_str::<Json>(&out).unwrap(), x);
    }
    let err = template.render(&json!({ "x": u64::MAX })).unwrap_err();
    assert_eq!(err.kind, RenderErrorKind::Value);
    assert!(err.message.contains("18446744073709551615"), "{}", err.message);
}

#[test]
fn runaway_recursion_is_an_error() {
    let template = Template::compile("{% macro f(n) %}{{ f(n + 1) }}{% endmacro %}{{ f(0) }}", Options::default()).unwrap();
    let err = template
        .render_with(prompt_jinja::Context::new(), RenderOptions::default().with_max_depth(16))
        .unwrap_err();
    assert_eq!(err.kind, RenderErrorKind::Recursion);
}
