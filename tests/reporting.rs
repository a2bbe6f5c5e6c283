use error_reporting::infrastructure::mocks::{
    MockClock, RecordingSink, StubLogin, StubPrincipal, StubRequest,
};
use error_reporting::{
    ErrorReportingUtility, ExceptionInfo, Frame, LogStore, OwnerId, Properties, RateLimiter,
    Render, Traceback, Value,
};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

struct BrokenStr;

impl Render for BrokenStr {
    fn type_name(&self) -> &str {
        "BrokenStr"
    }

    fn render(&self) -> Result<String, fmt::Error> {
        Err(fmt::Error)
    }
}

fn utility_with_sink() -> (ErrorReportingUtility, RecordingSink) {
    let sink = RecordingSink::new();
    let utility = ErrorReportingUtility::builder()
        .with_clock(Arc::new(MockClock::new(
            UNIX_EPOCH + Duration::from_secs(1_600_000_000),
        )))
        .with_sink(Arc::new(sink.clone()))
        .build()
        .unwrap();
    (utility, sink)
}

fn frames() -> Traceback {
    Traceback::Frames(vec![
        Frame::new("src/server.rs", 88, "dispatch"),
        Frame::new("src/views.rs", 14, "show_user").with_source("let user = load(id)?;"),
    ])
}

#[test]
fn test_unauthorized_leaves_no_trace() {
    let (utility, sink) = utility_with_sink();
    utility.raising(
        &ExceptionInfo::new("Unauthorized", "login required", frames()),
        Some(&StubRequest::new().with_url("http://localhost/admin")),
    );

    assert!(utility.get_log_entries().is_empty());
    assert_eq!(sink.count(), 0);
}

#[test]
fn test_full_record_from_request() {
    let (utility, _sink) = utility_with_sink();
    let request = StubRequest::new()
        .with_url("http://localhost/users/7")
        .with_principal(
            StubPrincipal::unauthenticated("site.anybody", "Unauthenticated User", "")
                .with_login(StubLogin::Name(Value::from("bob"))),
        )
        .with_item("id", "7")
        .with_item("HTTP_HOST", "localhost");

    utility.raising(
        &ExceptionInfo::new("LookupError", "<no user 7>", frames()),
        Some(&request),
    );

    let entry = &utility.get_log_entries()[0];
    assert_eq!(entry.type_name, "LookupError");
    assert_eq!(entry.value, "<no user 7>");
    assert_eq!(entry.url.as_deref(), Some("http://localhost/users/7"));
    assert_eq!(
        entry.username.as_deref(),
        Some("bob, site.anybody, Unauthenticated User, ")
    );
    assert_eq!(
        entry.request_html.as_deref(),
        Some("HTTP_HOST: localhost<br />\nid: 7<br />\n")
    );

    let text = entry.trace_text.as_deref().unwrap();
    assert!(text.starts_with("Traceback (most recent call last):\n"));
    assert!(text.contains("    let user = load(id)?;\n"));
    assert!(text.ends_with("LookupError: <no user 7>\n"));

    let html = entry.trace_html.as_deref().unwrap();
    assert!(html.contains("  File \"src/views.rs\", line 14, in show_user<br />\n"));
    assert!(html.ends_with("LookupError: &lt;no user 7&gt;<br />\n"));
}

#[test]
fn test_unprintable_values_become_placeholders() {
    let (utility, _sink) = utility_with_sink();
    let request = StubRequest::new()
        .with_url(Value::object(BrokenStr))
        .with_item("broken", Value::object(BrokenStr))
        .with_principal(StubPrincipal::unauthenticated(
            Value::object(BrokenStr),
            "title",
            "description",
        ));

    utility.raising(
        &ExceptionInfo::new("Error", Value::object(BrokenStr), Traceback::empty()),
        Some(&request),
    );

    let entry = &utility.get_log_entries()[0];
    assert_eq!(entry.value, "<unprintable BrokenStr object>");
    assert_eq!(entry.url.as_deref(), Some("<unprintable BrokenStr object>"));
    assert_eq!(
        entry.username.as_deref(),
        Some("unauthenticated, <unprintable BrokenStr object>, title, description")
    );
    assert_eq!(
        entry.request_html.as_deref(),
        Some("broken: <unprintable BrokenStr object><br />\n")
    );
}

#[test]
fn test_non_utf8_bytes_escaped_in_username() {
    let (utility, _sink) = utility_with_sink();
    let request = StubRequest::new().with_principal(StubPrincipal::unauthenticated(
        b"\xe1".as_slice(),
        b"\xe1".as_slice(),
        b"\xe1".as_slice(),
    ));
    utility.raising(
        &ExceptionInfo::new("Error", "x", Traceback::empty()),
        Some(&request),
    );

    assert_eq!(
        utility.get_log_entries()[0].username.as_deref(),
        Some(r"unauthenticated, \xe1, \xe1, \xe1")
    );
}

#[test]
fn test_unicode_username_kept() {
    let (utility, _sink) = utility_with_sink();
    let request = StubRequest::new().with_principal(StubPrincipal::unauthenticated(
        "\u{0441}",
        "\u{0441}",
        "\u{0441}",
    ));
    utility.raising(
        &ExceptionInfo::new("Error", "x", Traceback::empty()),
        Some(&request),
    );

    assert_eq!(
        utility.get_log_entries()[0].username.as_deref(),
        Some("unauthenticated, \u{0441}, \u{0441}, \u{0441}")
    );
}

#[test]
fn test_trace_supplied_as_text() {
    let (utility, _sink) = utility_with_sink();
    utility.raising(
        &ExceptionInfo::new(
            "Error",
            "x",
            Traceback::Preformatted(Value::from("Traceback: <already> rendered\n")),
        ),
        None,
    );

    let entry = &utility.get_log_entries()[0];
    assert_eq!(
        entry.trace_text.as_deref(),
        Some("Traceback: <already> rendered\n")
    );
    assert!(entry.trace_html.is_none());
}

#[test]
fn test_entries_newest_first_and_bounded() {
    let (utility, _sink) = utility_with_sink();
    utility.set_properties(3, false, ["Unauthorized"]).unwrap();

    for i in 0..7 {
        utility.raising(
            &ExceptionInfo::new("Error", i.to_string(), Traceback::empty()),
            None,
        );
    }

    let values: Vec<String> = utility
        .get_log_entries()
        .into_iter()
        .map(|entry| entry.value)
        .collect();
    assert_eq!(values, vec!["6", "5", "4"]);
}

#[test]
fn test_entry_copies_are_independent() {
    let (utility, _sink) = utility_with_sink();
    utility.raising(
        &ExceptionInfo::new("Error", "original", Traceback::empty()),
        None,
    );
    let id = utility.get_log_entries()[0].id.clone();

    let mut copy = utility.get_log_entry_by_id(&id).unwrap();
    copy.value = "changed".to_string();
    copy.trace_text = None;

    let fresh = utility.get_log_entry_by_id(&id).unwrap();
    assert_eq!(fresh.value, "original");
    assert!(fresh.trace_text.is_some());
}

#[test]
fn test_entry_lookup_unknown_id() {
    let (utility, _sink) = utility_with_sink();
    assert!(utility.get_log_entry_by_id("1600000000.000000abc").is_none());
}

#[test]
fn test_root_and_instance_histories() {
    let store = Arc::new(LogStore::new());
    let limiter = Arc::new(RateLimiter::default());

    let root_a = ErrorReportingUtility::root(Arc::clone(&store), Arc::clone(&limiter));
    let root_b = ErrorReportingUtility::root(Arc::clone(&store), Arc::clone(&limiter));
    let local = ErrorReportingUtility::instance(Arc::clone(&store), Arc::clone(&limiter));
    for utility in [&root_a, &root_b, &local] {
        utility.set_properties(20, false, Vec::<&str>::new()).unwrap();
    }

    root_a.raising(&ExceptionInfo::new("A", "1", Traceback::empty()), None);
    root_b.raising(&ExceptionInfo::new("B", "2", Traceback::empty()), None);
    local.raising(&ExceptionInfo::new("C", "3", Traceback::empty()), None);

    assert_eq!(root_a.owner(), OwnerId::Root);
    assert_eq!(root_a.get_log_entries().len(), 2);
    assert_eq!(root_b.get_log_entries()[0].type_name, "B");
    assert_eq!(local.get_log_entries().len(), 1);
    assert_eq!(store.len(OwnerId::Root), 2);
}

#[test]
fn test_properties_from_serde() {
    let (utility, _sink) = utility_with_sink();
    let properties: Properties =
        serde_json::from_str(r#"{"keep_entries": 2, "ignored_exceptions": ["NotFound"]}"#).unwrap();
    utility.apply_properties(properties.clone()).unwrap();

    assert_eq!(utility.get_properties(), properties);
    assert!(utility.get_properties().copy_to_log);

    utility.raising(&ExceptionInfo::new("NotFound", "x", Traceback::empty()), None);
    utility.raising(&ExceptionInfo::new("Unauthorized", "x", Traceback::empty()), None);
    assert_eq!(utility.get_log_entries().len(), 1);
}

#[test]
fn test_records_serialize() {
    let (utility, _sink) = utility_with_sink();
    utility.raising(&ExceptionInfo::new("Error", "x", Traceback::empty()), None);
    let entry = utility.get_log_entries().remove(0);

    let json = serde_json::to_string(&entry).unwrap();
    let back: error_reporting::ErrorRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back, entry);
}

#[test]
fn test_metrics_follow_outcomes() {
    let (utility, sink) = utility_with_sink();
    utility.set_properties(2, true, ["Ignored"]).unwrap();

    utility.raising(&ExceptionInfo::new("Ignored", "x", Traceback::empty()), None);
    for _ in 0..7 {
        utility.raising(&ExceptionInfo::new("Error", "x", Traceback::empty()), None);
    }

    let snapshot = utility.metrics().snapshot();
    assert_eq!(snapshot.errors_ignored, 1);
    assert_eq!(snapshot.records_appended, 7);
    assert_eq!(snapshot.entries_trimmed, 5);
    assert_eq!(snapshot.log_copies_emitted, 5);
    assert_eq!(snapshot.log_copies_suppressed, 2);
    assert_eq!(sink.count(), 5);
}
