use std::ffi::{OsStr, OsString};
use std::io;
use std::os::unix::ffi::OsStringExt;
use std::process::{Command, Stdio};

use crate::commands::parse_commands;
use crate::context::RunContext;
use crate::issue::{Category, Issue};
use crate::logger::{sanitize_value, Logger};

#[derive(Debug)]
pub(crate) struct Captured {
    pub(crate) stdout: Vec<u8>,
    pub(crate) exit_code: i32,
}

// The only place the system touches the host beyond the tracker. Kept as a
// trait so tests can feed canned exit codes and output without spawning.
pub(crate) trait CommandRunner {
    fn run_captured(&self, command: &OsStr) -> io::Result<Captured>;
    fn spawn_detached(&self, command: &OsStr) -> io::Result<()>;
}

pub(crate) struct HostRunner;

impl CommandRunner for HostRunner {
    fn run_captured(&self, command: &OsStr) -> io::Result<Captured> {
        if command.is_empty() {
            return Ok(Captured {
                stdout: Vec::new(),
                exit_code: 0,
            });
        }
        let output = Command::new("bash").arg("-lc").arg(command).output()?;
        Ok(Captured {
            stdout: output.stdout,
            exit_code: output.status.code().unwrap_or(1),
        })
    }

    fn spawn_detached(&self, command: &OsStr) -> io::Result<()> {
        if command.is_empty() {
            return Ok(());
        }
        // Fire and forget: no handle retained, no join.
        Command::new("bash")
            .arg("-lc")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct Task {
    pub(crate) issue: Issue,
    pub(crate) category: Category,
    pub(crate) commands: Vec<String>,
    pub(crate) output: Vec<u8>,
    pub(crate) exit_code: Option<i32>,
    pub(crate) failed: bool,
}

impl Task {
    pub(crate) fn from_issue(issue: Issue) -> Self {
        let category = Category::parse(&issue.category);
        let commands = parse_commands(&issue.combined_text());
        Self {
            issue,
            category,
            commands,
            output: Vec::new(),
            exit_code: None,
            failed: false,
        }
    }
}

pub(crate) fn execute(task: &mut Task, runner: &dyn CommandRunner, ctx: &RunContext, logger: &Logger) {
    match task.category.clone() {
        Category::Run => run_captured_sequence(task, runner, ctx, logger),
        Category::RunNoWait => dispatch_detached(task, runner, ctx, logger),
        Category::Other(_) => {
            logger.transition(&format!(
                "task skip issue={} category={}",
                task.issue.id, task.category
            ));
        }
    }
}

// Commands run strictly in order; the first non-zero exit stops the
// sequence with the partial output left on the task.
fn run_captured_sequence(
    task: &mut Task,
    runner: &dyn CommandRunner,
    ctx: &RunContext,
    logger: &Logger,
) {
    let commands = task.commands.clone();
    for command in &commands {
        if ctx.debug {
            println!("run issue={} command={}", task.issue.id, command);
        }
        logger.transition(&format!(
            "cmd start issue={} command={}",
            task.issue.id,
            sanitize_value(command)
        ));

        let shell_arg = match encode_command(command, ctx) {
            Ok(arg) => arg,
            Err(err) => {
                record_failure(task, logger, &format!("cannot encode command: {}", err));
                break;
            }
        };
        match runner.run_captured(&shell_arg) {
            Ok(captured) => {
                task.output.extend_from_slice(&captured.stdout);
                task.exit_code = Some(captured.exit_code);
                logger.transition(&format!(
                    "cmd exit issue={} exit={}",
                    task.issue.id, captured.exit_code
                ));
                if captured.exit_code != 0 {
                    task.failed = true;
                    break;
                }
            }
            Err(err) => {
                record_failure(task, logger, &format!("failed to run command: {}", err));
                break;
            }
        }
    }
}

// No capture, no exit codes, no completion tracking. Dispatch errors are
// logged but leave the output empty.
fn dispatch_detached(task: &mut Task, runner: &dyn CommandRunner, ctx: &RunContext, logger: &Logger) {
    let commands = task.commands.clone();
    for command in &commands {
        if ctx.debug {
            println!("dispatch issue={} command={}", task.issue.id, command);
        }
        let shell_arg = match encode_command(command, ctx) {
            Ok(arg) => arg,
            Err(err) => {
                task.failed = true;
                logger.transition(&format!(
                    "dispatch failed issue={} err={}",
                    task.issue.id,
                    sanitize_value(&err.to_string())
                ));
                continue;
            }
        };
        match runner.spawn_detached(&shell_arg) {
            Ok(()) => {
                logger.transition(&format!(
                    "dispatched issue={} command={}",
                    task.issue.id,
                    sanitize_value(command)
                ));
            }
            Err(err) => {
                task.failed = true;
                logger.transition(&format!(
                    "dispatch failed issue={} err={}",
                    task.issue.id,
                    sanitize_value(&err.to_string())
                ));
            }
        }
    }
}

fn encode_command(command: &str, ctx: &RunContext) -> Result<OsString, crate::codec::EncodingError> {
    ctx.codec.encode(command).map(OsString::from_vec)
}

fn record_failure(task: &mut Task, logger: &Logger, message: &str) {
    task.failed = true;
    if !task.output.is_empty() && !task.output.ends_with(b"\n") {
        task.output.push(b'\n');
    }
    task.output.extend_from_slice(message.as_bytes());
    task.output.push(b'\n');
    logger.transition(&format!(
        "cmd error issue={} err={}",
        task.issue.id,
        sanitize_value(message)
    ));
}

#[cfg(test)]
mod tests {
    use super::{execute, Captured, CommandRunner, HostRunner, Task};
    use crate::context::RunContext;
    use crate::issue::{Category, EnumRef, Issue};
    use crate::logger::Logger;
    use crate::unit_tests::ScriptedRunner;
    use std::ffi::OsStr;

    fn issue(category: &str, summary: &str, description: &str) -> Issue {
        Issue {
            id: 42,
            summary: summary.to_string(),
            description: description.to_string(),
            category: category.to_string(),
            handler: Some("build7".to_string()),
            status: EnumRef {
                id: 50,
                name: "assigned".to_string(),
            },
            resolution: EnumRef {
                id: 30,
                name: "open".to_string(),
            },
        }
    }

    #[test]
    fn host_runner_captures_stdout_and_exit_code() {
        let runner = HostRunner;
        let captured = runner
            .run_captured(OsStr::new("echo hello"))
            .expect("run echo");
        assert_eq!(captured.exit_code, 0);
        assert_eq!(String::from_utf8_lossy(&captured.stdout).trim(), "hello");

        let captured = runner
            .run_captured(OsStr::new("exit 42"))
            .expect("run exit");
        assert_eq!(captured.exit_code, 42);
    }

    #[test]
    fn host_runner_treats_empty_command_as_noop_success() {
        let runner = HostRunner;
        let captured = runner.run_captured(OsStr::new("")).expect("run empty");
        assert_eq!(captured.exit_code, 0);
        assert!(captured.stdout.is_empty());
    }

    #[test]
    fn task_derives_commands_and_category() {
        let task = Task::from_issue(issue("RUN", "@echo a", "echo b"));
        assert_eq!(task.category, Category::Run);
        assert_eq!(task.commands, vec!["echo a echo b".to_string()]);
        assert!(task.exit_code.is_none());
    }

    #[test]
    fn run_stops_at_first_failure() {
        let runner = ScriptedRunner::with_script(vec![
            Captured {
                stdout: b"one\n".to_vec(),
                exit_code: 0,
            },
            Captured {
                stdout: b"two\n".to_vec(),
                exit_code: 3,
            },
        ]);
        let ctx = RunContext::for_test();
        let logger = Logger::new(None);
        let mut task = Task::from_issue(issue("run", "@true\nfalse\necho unreached", ""));

        execute(&mut task, &runner, &ctx, &logger);

        assert_eq!(runner.captured_commands(), vec!["true", "false"]);
        assert_eq!(task.output, b"one\ntwo\n".to_vec());
        assert_eq!(task.exit_code, Some(3));
        assert!(task.failed);
    }

    #[test]
    fn run_with_all_successes_keeps_final_exit_code() {
        let runner = ScriptedRunner::with_script(vec![
            Captured {
                stdout: b"a".to_vec(),
                exit_code: 0,
            },
            Captured {
                stdout: b"b".to_vec(),
                exit_code: 0,
            },
        ]);
        let ctx = RunContext::for_test();
        let logger = Logger::new(None);
        let mut task = Task::from_issue(issue("run", "@echo a\necho b", ""));

        execute(&mut task, &runner, &ctx, &logger);

        assert_eq!(task.output, b"ab".to_vec());
        assert_eq!(task.exit_code, Some(0));
        assert!(!task.failed);
    }

    #[test]
    fn empty_command_list_never_invokes_the_runner() {
        let runner = ScriptedRunner::with_script(Vec::new());
        let ctx = RunContext::for_test();
        let logger = Logger::new(None);
        let mut task = Task::from_issue(issue("run", "@", ""));

        execute(&mut task, &runner, &ctx, &logger);

        assert!(runner.captured_commands().is_empty());
        assert!(task.output.is_empty());
        assert!(task.exit_code.is_none());
        assert!(!task.failed);
    }

    #[test]
    fn run_no_wait_dispatches_without_capture() {
        let runner = ScriptedRunner::with_script(Vec::new());
        let ctx = RunContext::for_test();
        let logger = Logger::new(None);
        let mut task = Task::from_issue(issue("run-no-wait", "@sleep 60\nsleep 120", ""));

        execute(&mut task, &runner, &ctx, &logger);

        assert_eq!(runner.spawned_commands(), vec!["sleep 60", "sleep 120"]);
        assert!(runner.captured_commands().is_empty());
        assert!(task.output.is_empty());
        assert!(task.exit_code.is_none());
    }

    #[test]
    fn other_category_runs_nothing() {
        let runner = ScriptedRunner::with_script(Vec::new());
        let ctx = RunContext::for_test();
        let logger = Logger::new(None);
        let mut task = Task::from_issue(issue("report", "echo hi", ""));

        execute(&mut task, &runner, &ctx, &logger);

        assert!(runner.captured_commands().is_empty());
        assert!(runner.spawned_commands().is_empty());
        assert!(task.exit_code.is_none());
    }

    #[test]
    fn unencodable_command_fails_the_task_without_running_it() {
        let runner = ScriptedRunner::with_script(Vec::new());
        let ctx = RunContext::for_test();
        let logger = Logger::new(None);
        let mut task = Task::from_issue(issue("run", "echo 漢字", ""));

        execute(&mut task, &runner, &ctx, &logger);

        assert!(runner.captured_commands().is_empty());
        assert!(task.failed);
        assert!(task.exit_code.is_none());
        let output = String::from_utf8_lossy(&task.output);
        assert!(
            output.contains("cannot encode command"),
            "unexpected output: {output:?}"
        );
    }
}
