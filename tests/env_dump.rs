use std::collections::BTreeMap;

use jobhop::session::env::{after_marker, changed_since, parse_env_dump, strip_shell_noise, EnvMap};
use jobhop::session::quote::{join, quote};
use proptest::prelude::*;

fn env_strategy() -> impl Strategy<Value = EnvMap> {
    proptest::collection::btree_map("[A-Za-z_][A-Za-z0-9_]{0,12}", "[^\\x00]{0,24}", 0..12)
}

proptest! {
    #[test]
    fn parse_env_dump_recovers_every_entry(env in env_strategy()) {
        let dump: String = env.iter().map(|(k, v)| format!("{k}={v}\0")).collect();
        prop_assert_eq!(parse_env_dump(&dump), env);
    }

    #[test]
    fn changed_since_is_a_subset_with_new_values(
        baseline in env_strategy(),
        updates in env_strategy(),
    ) {
        let mut after = baseline.clone();
        after.extend(updates.clone());
        let delta = changed_since(after.clone(), &baseline);
        for (k, v) in &delta {
            prop_assert_eq!(after.get(k), Some(v));
            prop_assert_ne!(baseline.get(k), Some(v));
        }
        for (k, v) in &updates {
            if baseline.get(k) != Some(v) {
                prop_assert_eq!(delta.get(k), Some(v));
            }
        }
    }
}

#[test]
fn values_may_contain_equals_and_newlines() {
    let env = parse_env_dump("A=b=c\0MULTI=line1\nline2\0EMPTY=\0");
    assert_eq!(env["A"], "b=c");
    assert_eq!(env["MULTI"], "line1\nline2");
    assert_eq!(env["EMPTY"], "");
}

#[test]
fn malformed_entries_are_skipped() {
    let env = parse_env_dump("GOOD=1\0garbage\0=novalue\0");
    assert_eq!(env, BTreeMap::from([("GOOD".to_string(), "1".to_string())]));
}

#[test]
fn marker_takes_the_last_occurrence() {
    let out = "script says MARK\nMARK\nA=1\0";
    assert_eq!(after_marker(out, "MARK"), Some("A=1\0"));
    assert_eq!(after_marker("no marker", "MARK"), None);
}

#[test]
fn shell_noise_depends_on_the_shell() {
    let mut env: EnvMap = [("_", "/usr/bin/env"), ("SHLVL", "2"), ("OLDPWD", "/"), ("KEEP", "1")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let mut bash = env.clone();
    strip_shell_noise(&mut bash, "/bin/bash");
    assert_eq!(bash.keys().collect::<Vec<_>>(), vec!["KEEP", "OLDPWD"]);

    strip_shell_noise(&mut env, "/usr/bin/zsh");
    assert_eq!(env.keys().collect::<Vec<_>>(), vec!["KEEP", "SHLVL"]);
}

#[test]
fn quoting() {
    assert_eq!(quote(""), "''");
    assert_eq!(quote("plain/path-1.txt"), "plain/path-1.txt");
    assert_eq!(quote("two words"), "'two words'");
    assert_eq!(quote("it's"), r#"'it'"'"'s'"#);
    assert_eq!(join(["echo", "a b", "$HOME"]), "echo 'a b' '$HOME'");
}
