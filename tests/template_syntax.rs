//! Template markup syntax checks.

use stepcheck::template::{check_syntax, error_cause, TemplateSyntaxError};

#[test]
fn accepts_plain_and_well_formed_markup() {
    for source in [
        "",
        "plain text",
        "os == 'linux'",
        "{{os}}",
        "{{item.key}}: {{item.value}}",
        "{{ ansible_facts.distribution | lower }}",
        "cp {{ src }} {{ dest }}.bak",
        "{% if os == 'darwin' %}brew{% else %}apt{% endif %} install git",
        "{% for f in files %}{{ f }} {% endfor %}",
        "{# comment #}{{ x }}",
        "echo ${PATH}",
        "{% with x = 1 %}{{ x }}{% endwith %}",
        "{% comment %}ignored{% endcomment %}",
        "{% filter upper %}shout{% endfilter %}",
        "{% for x in items reversed %}{{ x }}{% endfor %}",
        "{% include 'motd.j2' %}",
        "{% verbatim %}{{ raw }}{% endverbatim %}",
        "{{ home|expanduser }}",
    ] {
        assert_eq!(check_syntax(source), Ok(()), "{source:?}");
    }
}

#[test]
fn rejects_unbalanced_markup() {
    for source in [
        "{{unclosed",
        "echo \"{{test}",
        "{{broken syntax",
        "{{variable}",
        "{{ a + }}",
        "{% if x %}never closed",
        "{% endfor %}",
        "{% with x = 1 %}never closed",
        "{% for x in items backwards %}{% endfor %}",
        "{{ x|nosuchfilter }}",
        "{# open comment",
    ] {
        assert!(check_syntax(source).is_err(), "{source:?}");
    }
}

#[test]
fn error_reports_position_in_template() {
    let err: TemplateSyntaxError = check_syntax("ok\n  {{ a b }}").unwrap_err();
    assert_eq!(err.line, 2);
    assert_eq!(err.column, 8);
    assert_eq!(err.message, "unexpected 'b', expected '}}'");
}

#[test]
fn cause_drops_error_prefix() {
    let err = check_syntax("{% frob %}").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Error in template (line 1, col 1): Tag 'frob' does not exist"
    );
    assert_eq!(error_cause(&err), "Tag 'frob' does not exist");
}
