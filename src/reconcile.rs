use crate::context::RunContext;
use crate::issue::{Issue, Targets};
use crate::logger::{sanitize_value, Logger};
use crate::task::Task;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IssueNote {
    pub(crate) text: String,
}

// Applied after every execution, success or failure alike: the issue is
// marked fixed/resolved either way and the note carries whatever output was
// captured. Output that does not decode cleanly is degraded to replacement
// glyphs after the failure is logged.
pub(crate) fn reconcile(
    task: &Task,
    targets: &Targets,
    ctx: &RunContext,
    logger: &Logger,
) -> (Issue, IssueNote) {
    let mut issue = task.issue.clone();
    issue.resolution = targets.fixed.clone();
    issue.status = targets.resolved.clone();

    let text = match ctx.codec.decode(&task.output) {
        Ok(text) => text,
        Err(err) => {
            logger.transition(&format!(
                "note decode degraded issue={} err={}",
                issue.id,
                sanitize_value(&err.to_string())
            ));
            ctx.codec.decode_lossy(&task.output)
        }
    };

    (issue, IssueNote { text })
}

#[cfg(test)]
mod tests {
    use super::reconcile;
    use crate::context::RunContext;
    use crate::issue::{EnumRef, Issue, Targets};
    use crate::logger::Logger;
    use crate::task::Task;

    fn targets() -> Targets {
        Targets {
            resolved: EnumRef {
                id: 80,
                name: "resolved".to_string(),
            },
            fixed: EnumRef {
                id: 20,
                name: "fixed".to_string(),
            },
        }
    }

    fn task_with(output: &[u8], exit_code: Option<i32>) -> Task {
        let issue = Issue {
            id: 9,
            summary: "echo hi".to_string(),
            description: String::new(),
            category: "run".to_string(),
            handler: Some("build7".to_string()),
            status: EnumRef {
                id: 50,
                name: "assigned".to_string(),
            },
            resolution: EnumRef {
                id: 30,
                name: "open".to_string(),
            },
        };
        let mut task = Task::from_issue(issue);
        task.output = output.to_vec();
        task.exit_code = exit_code;
        task.failed = exit_code.is_some_and(|code| code != 0);
        task
    }

    #[test]
    fn success_task_gets_fixed_and_resolved() {
        let ctx = RunContext::for_test();
        let logger = Logger::new(None);
        let task = task_with(b"done\n", Some(0));

        let (issue, note) = reconcile(&task, &targets(), &ctx, &logger);

        assert_eq!(issue.resolution.id, 20);
        assert_eq!(issue.resolution.name, "fixed");
        assert_eq!(issue.status.id, 80);
        assert_eq!(issue.status.name, "resolved");
        assert_eq!(note.text, "done\n");
    }

    #[test]
    fn failed_task_still_gets_fixed_and_resolved() {
        let ctx = RunContext::for_test();
        let logger = Logger::new(None);
        let task = task_with(b"partial\n", Some(3));

        let (issue, note) = reconcile(&task, &targets(), &ctx, &logger);

        assert_eq!(issue.resolution.name, "fixed");
        assert_eq!(issue.status.name, "resolved");
        assert_eq!(note.text, "partial\n");
    }

    #[test]
    fn note_decodes_codepage_output() {
        let ctx = RunContext::for_test();
        let logger = Logger::new(None);
        // "Привет" in cp1251.
        let task = task_with(b"\xCF\xF0\xE8\xE2\xE5\xF2", Some(0));

        let (_, note) = reconcile(&task, &targets(), &ctx, &logger);

        assert_eq!(note.text, "Привет");
    }

    #[test]
    fn undecodable_output_degrades_to_replacement_glyphs() {
        let ctx = RunContext::for_test();
        let logger = Logger::new(None);
        // 0x98 is unassigned in cp1251.
        let task = task_with(b"ok\x98", Some(0));

        let (_, note) = reconcile(&task, &targets(), &ctx, &logger);

        assert!(note.text.starts_with("ok"), "got: {:?}", note.text);
        assert!(note.text.contains('\u{FFFD}'), "got: {:?}", note.text);
    }

    #[test]
    fn input_issue_is_left_untouched() {
        let ctx = RunContext::for_test();
        let logger = Logger::new(None);
        let task = task_with(b"", None);

        let (_, _) = reconcile(&task, &targets(), &ctx, &logger);

        assert_eq!(task.issue.resolution.name, "open");
        assert_eq!(task.issue.status.name, "assigned");
    }
}
