//! Built-in catalog through the engine

use stellar_dsl::{EmptyResolver, Error, MapResolver, Value};

mod test_support;
use test_support::{eval, predicate};

#[test]
fn test_string_functions() {
    let r = MapResolver::new().with("host", "  Mail.Example.COM ");
    assert_eq!(eval("TO_LOWER(TRIM(host))", &r), Value::string("mail.example.com"));
    assert_eq!(eval("TO_UPPER('abc')", &r), Value::string("ABC"));
    assert_eq!(eval("LENGTH(TRIM(host))", &r), Value::Int(16));
    assert_eq!(eval("LENGTH([1, 2])", &r), Value::Int(2));
    assert!(predicate("IS_EMPTY(missing) && !IS_EMPTY(host)", &r));
    assert!(predicate("STARTS_WITH(TRIM(host), 'Mail')", &r));
    assert!(predicate("ENDS_WITH(TO_LOWER(TRIM(host)), '.com')", &r));
    assert_eq!(
        eval("SPLIT('a,b,c', ',')", &r),
        Value::List(vec![Value::string("a"), Value::string("b"), Value::string("c")])
    );
    assert_eq!(eval("JOIN(['a', null, 1], '-')", &r), Value::string("a-1"));
}

#[test]
fn test_conversion_functions() {
    let r = EmptyResolver;
    assert_eq!(eval("TO_INTEGER('12') + 1", &r), Value::Int(13));
    assert_eq!(eval("TO_LONG(4.7)", &r), Value::Int(4));
    assert_eq!(eval("TO_DOUBLE('2.5')", &r), Value::Float(2.5));
    assert_eq!(eval("TO_FLOAT(2)", &r), Value::Float(2.0));
    assert_eq!(eval("TO_STRING(12)", &r), Value::string("12"));
    assert_eq!(eval("TO_BOOLEAN('false')", &r), Value::Bool(false));
    assert_eq!(eval("TO_INTEGER('twelve')", &r), Value::Null);
}

#[test]
fn test_collection_functions() {
    let r = EmptyResolver;
    assert_eq!(eval("GET_FIRST(['x', 'y'])", &r), Value::string("x"));
    assert_eq!(eval("GET_LAST(['x', 'y'])", &r), Value::string("y"));
    assert_eq!(eval("GET(['x', 'y'], 1)", &r), Value::string("y"));
    assert_eq!(eval("GET_FIRST([])", &r), Value::Null);
    assert_eq!(eval("LENGTH(LIST_ADD([1], 2))", &r), Value::Int(2));
    assert_eq!(eval("MAP_GET('a', {'a': 1})", &r), Value::Int(1));
    assert_eq!(eval("MAP_GET('b', {'a': 1}, 'dflt')", &r), Value::string("dflt"));
    assert!(predicate("MAP_EXISTS('a', {'a': null})", &r));
    assert!(!predicate("MAP_EXISTS('b', {'a': 1})", &r));
}

#[test]
fn test_math_functions() {
    let r = EmptyResolver;
    assert_eq!(eval("ABS(-4)", &r), Value::Int(4));
    assert_eq!(eval("ABS(-1.5)", &r), Value::Float(1.5));
    assert_eq!(eval("MAX([1, 5, 3])", &r), Value::Int(5));
    assert_eq!(eval("MIN(4, 2.5, 9)", &r), Value::Float(2.5));
    assert_eq!(eval("MAX([])", &r), Value::Null);
}

#[test]
fn test_network_functions() {
    let r = MapResolver::new()
        .with("ip", "192.168.1.7")
        .with("url", "https://example.org:8080/a?b=c");
    assert!(predicate("IS_IP(ip)", &r));
    assert!(!predicate("IS_IP('999.1.1.1')", &r));
    assert!(predicate("IN_SUBNET(ip, '10.0.0.0/8', '192.168.1.0/24')", &r));
    assert!(!predicate("IN_SUBNET(ip, '192.168.2.0/24')", &r));
    assert_eq!(eval("URL_TO_HOST(url)", &r), Value::string("example.org"));
    assert_eq!(eval("URL_TO_PROTOCOL(url)", &r), Value::string("https"));
}

#[test]
fn test_date_functions() {
    let r = MapResolver::new().with("ts", "2020-02-29 23:59:59");
    assert_eq!(
        eval("TO_EPOCH_TIMESTAMP(ts, '%Y-%m-%d %H:%M:%S')", &r),
        Value::Int(1_583_020_799_000)
    );
    assert_eq!(
        eval("DATE_FORMAT('%Y-%m-%dT%H:%M', 0)", &r),
        Value::string("1970-01-01T00:00")
    );
}

#[test]
fn test_arity_errors_name_the_function() {
    let err = test_support::engine()
        .evaluate("TO_UPPER('a', 'b')", &EmptyResolver)
        .unwrap_err();
    assert_eq!(
        err,
        Error::Arity {
            function: "TO_UPPER".into(),
            expected: "1".into(),
            actual: 2,
        }
    );
}

#[test]
fn test_type_errors_from_functions() {
    let err = test_support::engine()
        .evaluate("GET_FIRST('not a list')", &EmptyResolver)
        .unwrap_err();
    assert!(matches!(err, Error::TypeError(_)));
}

#[test]
fn test_catalog_metadata() {
    let registry = test_support::engine().registry();
    let info = registry.info("REGEXP_GROUP_VAL").unwrap();
    assert_eq!(info.params.len(), 3);
    assert!(!info.description.is_empty());

    let names: Vec<String> = registry.functions().into_iter().map(|f| f.name).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
    assert!(names.iter().any(|n| n == "ENRICHMENT_GET"));
}
