//! Regex function family and the triage predicate scenarios

use stellar_dsl::{Error, ErrorKind, MapResolver, Value};

mod test_support;
use test_support::{eval, predicate, regex_event};

#[test]
fn test_regexp_match() {
    let r = regex_event();
    assert!(predicate("REGEXP_MATCH(numbers, numberPattern)", &r));
    assert!(!predicate("REGEXP_MATCH(letters, numberPattern)", &r));
    // The pattern must match the whole value
    assert!(!predicate("REGEXP_MATCH(numbers, '\\d\\d')", &r));
    assert!(!predicate("REGEXP_MATCH(missing, numberPattern)", &r));
}

#[test]
fn test_regexp_group_val() {
    let r = regex_event();
    assert!(predicate("REGEXP_GROUP_VAL(numbers, numberPattern, 2) == '3'", &r));
    assert!(predicate("REGEXP_GROUP_VAL(letters, numberPattern, 2) == null", &r));
    assert!(predicate("REGEXP_GROUP_VAL(empty, numberPattern, 2) == null", &r));
    assert!(predicate(
        "REGEXP_GROUP_VAL(numbers, numberPatternNoCaptures, 2) == null",
        &r
    ));
    assert_eq!(
        eval("REGEXP_GROUP_VAL(numbers, numberPattern, 0)", &r),
        Value::string("12345")
    );
}

#[test]
fn test_regexp_group_val_arity() {
    let err = test_support::engine()
        .evaluate("REGEXP_GROUP_VAL(2)", &regex_event())
        .unwrap_err();
    match &err {
        Error::Arity {
            function, actual, ..
        } => {
            assert_eq!(function, "REGEXP_GROUP_VAL");
            assert_eq!(*actual, 1);
        }
        other => panic!("expected arity error, got {other:?}"),
    }
    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[test]
fn test_regexp_replace() {
    let r = MapResolver::new().with("msg", "user=alice user=bob");
    assert_eq!(
        eval("REGEXP_REPLACE(msg, 'user=(\\w+)', '$1')", &r),
        Value::string("alice bob")
    );
}

#[test]
fn test_invalid_pattern_is_an_evaluation_error() {
    let err = test_support::engine()
        .evaluate("REGEXP_MATCH('a', '(')", &MapResolver::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Evaluation);
}

#[test]
fn test_triage_predicate() {
    let rule = "ip_src_addr == '10.122.196.204' or ip_dst_addr == '10.122.196.204'";

    let src = MapResolver::new()
        .with("ip_src_addr", "10.122.196.204")
        .with("ip_dst_addr", "10.0.0.1");
    assert!(predicate(rule, &src));

    let dst = MapResolver::new()
        .with("ip_src_addr", "10.0.0.1")
        .with("ip_dst_addr", "10.122.196.204");
    assert!(predicate(rule, &dst));

    let neither = MapResolver::new()
        .with("ip_src_addr", "10.0.0.1")
        .with("ip_dst_addr", "10.0.0.2");
    assert!(!predicate(rule, &neither));

    assert!(!predicate(rule, &MapResolver::new()));
}
