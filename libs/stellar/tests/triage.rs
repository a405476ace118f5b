//! Threat triage scoring

use stellar_dsl::{Aggregator, ErrorKind, MapResolver, TriageConfig};

mod test_support;

fn config(aggregator: &str) -> TriageConfig {
    TriageConfig::from_json(&format!(
        r#"{{
            "riskLevelRules": {{
                "ip_src_addr == '10.122.196.204' or ip_dst_addr == '10.122.196.204'": 10,
                "IN_SUBNET(ip_dst_addr, '192.168.0.0/16')": 20,
                "TO_UPPER(protocol) == 'TELNET'": 50
            }},
            "aggregator": "{aggregator}"
        }}"#
    ))
    .unwrap()
}

fn event(src: &str, dst: &str, protocol: &str) -> MapResolver {
    MapResolver::new()
        .with("ip_src_addr", src)
        .with("ip_dst_addr", dst)
        .with("protocol", protocol)
}

#[test]
fn test_configuration_validates() {
    let engine = test_support::engine();
    config("MAX").validate(engine).unwrap();

    let bad = TriageConfig::from_json(r#"{"riskLevelRules": {"ip_src_addr ==": 10}}"#).unwrap();
    assert_eq!(bad.validate(engine).unwrap_err().kind(), ErrorKind::Parse);

    let unknown = TriageConfig::from_json(r#"{"riskLevelRules": {"NOPE(x)": 10}}"#).unwrap();
    assert!(unknown.validate(engine).is_err());
}

#[test]
fn test_default_aggregator_is_max() {
    let config = TriageConfig::from_json(r#"{"riskLevelRules": {}}"#).unwrap();
    assert_eq!(config.aggregator, Aggregator::Max);
}

#[test]
fn test_scores_with_each_aggregator() {
    let engine = test_support::engine();
    let hit_two = event("10.122.196.204", "192.168.1.1", "http");

    assert_eq!(config("MAX").score(engine, &hit_two).score, 20.0);
    assert_eq!(config("MIN").score(engine, &hit_two).score, 10.0);
    assert_eq!(config("SUM").score(engine, &hit_two).score, 30.0);
    assert_eq!(config("MEAN").score(engine, &hit_two).score, 15.0);

    let result = config("SUM").score(engine, &event("1.1.1.1", "192.168.1.1", "telnet"));
    assert_eq!(result.score, 70.0);
    assert_eq!(result.matched.len(), 2);
}

#[test]
fn test_no_match_scores_zero() {
    let engine = test_support::engine();
    let result = config("MAX").score(engine, &event("1.1.1.1", "8.8.8.8", "dns"));
    assert_eq!(result.score, 0.0);
    assert!(result.matched.is_empty());
}

#[test]
fn test_failing_rule_counts_as_non_match() {
    let engine = test_support::engine();
    let config = TriageConfig::from_json(
        r#"{"riskLevelRules": {"count > 'x'": 90, "count > 1": 5}, "aggregator": "MAX"}"#,
    )
    .unwrap();
    let result = config.score(engine, &MapResolver::new().with("count", 3));
    assert_eq!(result.score, 5.0);
    assert_eq!(result.matched[0].rule, "count > 1");
}
