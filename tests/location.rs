//! Location mapping over real YAML sources.

use stepcheck::document::{
    escape_segment, load, push_index, push_key, unescape_segment, LocationMap, Position,
};

fn map(source: &str) -> LocationMap {
    LocationMap::build(&load(source).expect("valid yaml"))
}

#[test]
fn step_name_lines_strictly_increase() {
    let mut source = String::new();
    for i in 0..25 {
        source.push_str(&format!("- name: step {i}\n  shell: echo {i}\n\n"));
    }
    let locations = map(&source);
    let mut previous = 0;
    for i in 0..25 {
        let position = locations.get(&format!("/{i}/name"));
        assert!(position.line > previous, "step {i}: {position:?}");
        previous = position.line;
    }
}

#[test]
fn step_position_is_its_first_key() {
    let locations = map("- name: t\n  shell: ls\n-   when: x\n    print: hi\n");
    assert_eq!(locations.get("/0"), Position::new(1, 3));
    assert_eq!(locations.get("/1"), Position::new(3, 5));
}

#[test]
fn anchors_and_aliases() {
    let locations = map("- &base\n  name: a\n  shell: ls\n- *base\n- name: c\n  env: *base\n");
    assert_eq!(locations.get("/0"), Position::new(2, 3));
    assert_eq!(locations.get("/0/name"), Position::new(2, 3));
    assert_eq!(locations.get("/1"), Position::new(4, 3));
    assert!(!locations.contains("/1/name"));
    assert_eq!(locations.get("/2/name"), Position::new(5, 3));
    assert_eq!(locations.get("/2/env"), Position::new(6, 3));
}

#[test]
fn top_level_sequence_of_scalars() {
    let locations = map("- one\n- two\n");
    assert_eq!(locations.get(""), Position::new(1, 1));
    assert_eq!(locations.get("/1"), Position::new(2, 3));
}

#[test]
fn keys_are_positioned_not_values() {
    let locations = map("- file:\n    path: /tmp/x\n    mode:\n      \"0644\"\n");
    assert_eq!(locations.get("/0/file/path"), Position::new(2, 5));
    assert_eq!(locations.get("/0/file/mode"), Position::new(3, 5));
}

#[test]
fn structured_paths() {
    let locations = map("version: \"1\"\nsteps:\n  - name: a\n    env:\n      HOME: /root\n");
    assert_eq!(locations.get("/version"), Position::new(1, 1));
    assert_eq!(locations.get("/steps"), Position::new(2, 1));
    assert_eq!(locations.get("/steps/0/name"), Position::new(3, 5));
    assert_eq!(locations.get("/steps/0/env/HOME"), Position::new(5, 7));
}

#[test]
fn keys_with_separators_are_escaped() {
    let locations = map("- env:\n    a/b: one\n    c~d: two\n");
    assert_eq!(locations.get("/0/env/a~1b").line, 2);
    assert_eq!(locations.get("/0/env/c~0d").line, 3);
    assert!(!locations.contains("/0/env/a/b"));
}

#[test]
fn unknown_paths_fall_back() {
    let locations = map("- name: a\n");
    assert_eq!(locations.get("/9/name"), Position::UNKNOWN);
    assert!(!locations.get("/9/name").is_known());
    assert_eq!(
        locations.get_or("/9/name", Position::new(1, 1)),
        Position::new(1, 1)
    );
}

#[test]
fn path_builders() {
    assert_eq!(push_index("", 3), "/3");
    assert_eq!(push_key("/steps", "0"), "/steps/0");
    assert_eq!(push_key(&push_index("/steps", 1), "a/b"), "/steps/1/a~1b");
}

#[test]
fn escape_round_trips() {
    for segment in ["", "plain", "~", "/", "~1", "~0", "a/~b", "//~~", "~01", "x~/y"] {
        let escaped = escape_segment(segment);
        assert!(!escaped.contains('/'), "{escaped}");
        assert_eq!(unescape_segment(&escaped), segment);
    }
}
