use super::{first_match, matches, normalize_path, PatternSpec, RouteEntry};
use crate::error::ConfigurationError;
use regex::Regex;

#[test]
fn test_normalize_strips_one_leading_slash() {
    assert_eq!(normalize_path("/hello"), "hello");
    assert_eq!(normalize_path("//hello"), "/hello");
    assert_eq!(normalize_path("hello"), "hello");
    assert_eq!(normalize_path("/"), "");
    assert_eq!(normalize_path(""), "");
    assert_eq!(normalize_path("/trailing/"), "trailing/");
}

#[test]
fn test_string_pattern_compiles_once() {
    let spec = PatternSpec::from(r"^a(\d)$");
    let first = spec.compile().unwrap() as *const Regex;
    let second = spec.compile().unwrap() as *const Regex;
    assert_eq!(first, second);
}

#[test]
fn test_invalid_pattern_type_is_configuration_error() {
    let spec = PatternSpec::Invalid("number".into());
    assert!(matches!(
        spec.compile(),
        Err(ConfigurationError::InvalidPatternType { .. })
    ));
}

#[test]
fn test_unparseable_pattern_is_configuration_error() {
    let spec = PatternSpec::from("(unclosed");
    let err = spec.compile().unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidPattern { ref pattern, .. } if pattern == "(unclosed"));
}

#[test]
fn test_search_semantics_match_anywhere() {
    let table = vec![RouteEntry::new("edit", "m.f")];
    let found = first_match(&table, "articles/7/edit/now").unwrap().unwrap();
    assert_eq!(found.matched, "edit");
    assert!(found.groups.is_empty());
}

#[test]
fn test_first_declared_entry_wins() {
    let table = vec![
        RouteEntry::new(r"^items", "items.any"),
        RouteEntry::new(r"^items/(\w+)$", "items.one"),
    ];
    let found = first_match(&table, "items/abc").unwrap().unwrap();
    assert_eq!(found.index, 0);
    let all: Vec<usize> = matches(&table, "items/abc")
        .map(|m| m.unwrap().index)
        .collect();
    assert_eq!(all, vec![0, 1]);
}

#[test]
fn test_groups_in_declaration_order_with_unmatched() {
    let table = vec![RouteEntry::new(
        Regex::new(r"^(\w+)/(?:(\d+)|new)/(\w+)?$").unwrap(),
        "m.f",
    )];
    let found = first_match(&table, "posts/new/").unwrap().unwrap();
    assert_eq!(found.groups.len(), 3);
    assert_eq!(found.groups[0].as_deref(), Some("posts"));
    assert_eq!(found.groups[1], None);
    assert_eq!(found.groups[2], None);
}

#[test]
fn test_error_stops_iteration_only_when_reached() {
    let table = vec![
        RouteEntry::new("^ok$", "m.ok"),
        RouteEntry::new(PatternSpec::Invalid("boolean".into()), "m.bad"),
    ];
    assert_eq!(first_match(&table, "ok").unwrap().unwrap().index, 0);
    assert!(first_match(&table, "other").is_err());
}

#[test]
fn test_display_shows_pattern_source() {
    assert_eq!(PatternSpec::from("^a$").to_string(), "^a$");
    assert_eq!(PatternSpec::Invalid("null".into()).to_string(), "<null>");
}
