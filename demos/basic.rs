//! Basic example of recording errors raised while serving requests.
//!
//! Errors are kept in a bounded history and copied to the system log, which
//! here is the `tracing` fmt subscriber. Repeated errors of one type are
//! rate limited in the log but still recorded.

use error_reporting::{
    ErrorReportingUtility, ExceptionInfo, LogStore, Principal, Properties, RateLimiter, Request,
    Value,
};
use std::fmt;
use std::sync::Arc;
use tracing_subscriber::prelude::*;

#[derive(Debug)]
struct NotFound {
    path: String,
}

impl fmt::Display for NotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no resource at {}", self.path)
    }
}

impl std::error::Error for NotFound {}

struct Anonymous;

impl Principal for Anonymous {
    fn id(&self) -> Option<Value> {
        Some(Value::from("anonymous"))
    }

    fn title(&self) -> Option<Value> {
        Some(Value::from("Anonymous User"))
    }

    fn description(&self) -> Option<Value> {
        Some(Value::from(""))
    }
}

struct DemoRequest {
    path: String,
}

impl Request for DemoRequest {
    fn principal(&self) -> Option<&dyn Principal> {
        Some(&Anonymous)
    }

    fn url(&self) -> Option<Value> {
        Some(Value::from(format!("http://localhost{}", self.path)))
    }

    fn items(&self) -> Vec<(Value, Value)> {
        vec![
            (Value::from("PATH_INFO"), Value::from(self.path.as_str())),
            (Value::from("HTTP_USER_AGENT"), Value::from("demo/<1.0>")),
        ]
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = Arc::new(LogStore::new());
    let limiter = Arc::new(RateLimiter::default());
    let utility = ErrorReportingUtility::root(Arc::clone(&store), Arc::clone(&limiter));
    utility
        .apply_properties(Properties::new(5, true, ["Unauthorized"]).expect("valid properties"))
        .expect("valid properties");

    println!("=== Error Reporting Example ===\n");
    println!("Raising 8 NotFound errors (only 5 reach the log):\n");

    for i in 1..=8 {
        let request = DemoRequest {
            path: format!("/items/{}", i),
        };
        let error = NotFound {
            path: request.path.clone(),
        };
        utility.raising(&ExceptionInfo::from_error(&error), Some(&request));
    }

    println!("\nHistory (newest first, at most 5 kept):");
    for entry in utility.get_log_entries() {
        println!(
            "  [{}] {}: {} (url: {})",
            entry.time_display,
            entry.type_name,
            entry.value,
            entry.url.as_deref().unwrap_or("-")
        );
    }

    if let Some(latest) = utility.get_log_entries().first() {
        println!("\nLatest entry, user:    {}", latest.username.as_deref().unwrap_or("-"));
        println!("Latest entry, request: {:?}", latest.request_html);
    }

    println!("\nMetrics: {:?}", utility.metrics().snapshot());
    println!("\n=== Example Complete ===");
}
