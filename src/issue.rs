use regex::Regex;
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct EnumRef {
    pub(crate) id: i64,
    pub(crate) name: String,
}

#[derive(Debug, Clone)]
pub(crate) struct Issue {
    pub(crate) id: i64,
    pub(crate) summary: String,
    pub(crate) description: String,
    pub(crate) category: String,
    pub(crate) handler: Option<String>,
    pub(crate) status: EnumRef,
    pub(crate) resolution: EnumRef,
}

impl Issue {
    pub(crate) fn combined_text(&self) -> String {
        if self.description.is_empty() {
            self.summary.clone()
        } else {
            format!("{} {}", self.summary, self.description)
        }
    }
}

// Resolved status and fixed resolution, discovered once per cycle and
// read-only afterwards.
#[derive(Debug, Clone)]
pub(crate) struct Targets {
    pub(crate) resolved: EnumRef,
    pub(crate) fixed: EnumRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Category {
    Run,
    RunNoWait,
    Other(String),
}

impl Category {
    pub(crate) fn parse(token: &str) -> Self {
        if token.eq_ignore_ascii_case("run") {
            Self::Run
        } else if token.eq_ignore_ascii_case("run-no-wait") {
            Self::RunNoWait
        } else {
            Self::Other(token.to_string())
        }
    }

    pub(crate) fn as_str(&self) -> &str {
        match self {
            Self::Run => "run",
            Self::RunNoWait => "run-no-wait",
            Self::Other(value) => value,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Resolution names are matched on the substring "open" ("open",
// "open-pending", "reopened" all qualify), never on a fixed name set.
pub(crate) fn is_assigned_open(issue: &Issue, user: &str, open_pattern: &Regex) -> bool {
    let Some(handler) = &issue.handler else {
        return false;
    };
    handler.eq_ignore_ascii_case(user) && open_pattern.is_match(&issue.resolution.name)
}

#[cfg(test)]
mod tests {
    use super::{is_assigned_open, Category, EnumRef, Issue};
    use regex::Regex;

    fn issue(handler: Option<&str>, resolution: &str) -> Issue {
        Issue {
            id: 1,
            summary: "echo hi".to_string(),
            description: String::new(),
            category: "run".to_string(),
            handler: handler.map(|name| name.to_string()),
            status: EnumRef {
                id: 10,
                name: "assigned".to_string(),
            },
            resolution: EnumRef {
                id: 30,
                name: resolution.to_string(),
            },
        }
    }

    fn open_pattern() -> Regex {
        Regex::new("(?i)open").expect("valid pattern")
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!(Category::parse("run"), Category::Run);
        assert_eq!(Category::parse("RUN"), Category::Run);
        assert_eq!(Category::parse("Run-No-Wait"), Category::RunNoWait);
        assert_eq!(
            Category::parse("deploy"),
            Category::Other("deploy".to_string())
        );
    }

    #[test]
    fn filter_requires_matching_handler_and_open_resolution() {
        let pattern = open_pattern();
        assert!(is_assigned_open(&issue(Some("alice"), "open"), "alice", &pattern));
        assert!(is_assigned_open(&issue(Some("ALICE"), "open"), "alice", &pattern));
        assert!(!is_assigned_open(&issue(Some("alice"), "closed"), "alice", &pattern));
        assert!(!is_assigned_open(&issue(None, "open"), "alice", &pattern));
    }

    #[test]
    fn open_match_is_a_substring_match() {
        let pattern = open_pattern();
        assert!(is_assigned_open(&issue(Some("bob"), "open-pending"), "bob", &pattern));
        assert!(is_assigned_open(&issue(Some("bob"), "Reopened"), "bob", &pattern));
        // Identity mismatch excludes the issue even though the resolution matches.
        assert!(!is_assigned_open(&issue(Some("bob"), "open-pending"), "alice", &pattern));
    }

    #[test]
    fn combined_text_joins_summary_and_description() {
        let mut subject = issue(Some("alice"), "open");
        subject.summary = "echo a".to_string();
        subject.description = "b".to_string();
        assert_eq!(subject.combined_text(), "echo a b");

        subject.description = String::new();
        assert_eq!(subject.combined_text(), "echo a");
    }
}
