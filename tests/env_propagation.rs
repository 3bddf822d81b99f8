// tests/env_propagation.rs

use cmdpipe::dispatch::propagated_env;

fn entries(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn assignments_pass_through_verbatim() {
    let env = propagated_env(&entries(&["FOO=bar", "EMPTY=", "EQ=a=b"]), |_| None);
    assert_eq!(env, vec!["FOO=bar", "EMPTY=", "EQ=a=b"]);
}

#[test]
fn bare_names_are_resolved_or_skipped() {
    let lookup = |key: &str| match key {
        "LANG" => Some("C.UTF-8".to_string()),
        _ => None,
    };

    let env = propagated_env(&entries(&["LANG", "UNSET", "X=1"]), lookup);
    assert_eq!(env, vec!["LANG=C.UTF-8", "X=1"]);
}

#[test]
fn nothing_configured_means_nothing_propagated() {
    assert!(propagated_env(&[], |_| Some("x".to_string())).is_empty());
}
