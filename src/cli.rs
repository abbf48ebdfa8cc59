use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "errand",
    about = "Errand runs the chores filed for this machine in your issue tracker.",
    long_about = "Errand polls an issue tracker project for open issues assigned to this run's identity, executes the shell commands embedded in each issue, and posts the captured output back as a note while marking the issue resolved/fixed.",
    disable_help_subcommand = true
)]
pub(crate) struct Cli {
    /// Issue tracker API base URL.
    #[arg(short = 's', long = "server", value_name = "URL")]
    pub(crate) server: Option<String>,

    /// Username to authenticate and to match against issue handlers.
    #[arg(short = 'u', long = "user", value_name = "USER")]
    pub(crate) user: Option<String>,

    /// Password to authenticate with.
    #[arg(short = 'p', long = "password", value_name = "PASSWORD")]
    pub(crate) password: Option<String>,

    /// Use this machine's hostname as the username.
    #[arg(short = 'e', long = "use-hostname")]
    pub(crate) use_hostname: bool,

    /// Append "-pc" to the username and mirror it into the password.
    #[arg(short = 'E', long = "use-hostname-pc")]
    pub(crate) use_hostname_pc: bool,

    /// Lowercase the username and password.
    #[arg(short = 'c', long = "down-case")]
    pub(crate) down_case: bool,

    /// Print verbose diagnostics to stdout.
    #[arg(short = 'd', long = "debug")]
    pub(crate) debug: bool,

    /// Issue tracker type (only "mantis" is supported).
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub(crate) tracker_type: Option<String>,

    /// Shell locale encoding label for command and output text.
    #[arg(long = "codepage", value_name = "LABEL")]
    pub(crate) codepage: Option<String>,

    /// Load configuration from PATH instead of ~/.config/errand.yml.
    #[arg(long = "config", value_name = "PATH")]
    pub(crate) config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn parses_short_flags() {
        let cli = Cli::parse_from([
            "errand", "-s", "https://tracker.example", "-u", "build7", "-p", "hunter2", "-d",
        ]);
        assert_eq!(cli.server.as_deref(), Some("https://tracker.example"));
        assert_eq!(cli.user.as_deref(), Some("build7"));
        assert_eq!(cli.password.as_deref(), Some("hunter2"));
        assert!(cli.debug);
        assert!(!cli.down_case);
    }

    #[test]
    fn parses_identity_toggles() {
        let cli = Cli::parse_from(["errand", "-e", "-E", "-c"]);
        assert!(cli.use_hostname);
        assert!(cli.use_hostname_pc);
        assert!(cli.down_case);
    }

    #[test]
    fn parses_long_flags() {
        let cli = Cli::parse_from([
            "errand",
            "--server",
            "https://tracker.example",
            "--type",
            "mantis",
            "--codepage",
            "cp1251",
            "--config",
            "/tmp/errand.yml",
        ]);
        assert_eq!(cli.tracker_type.as_deref(), Some("mantis"));
        assert_eq!(cli.codepage.as_deref(), Some("cp1251"));
        assert_eq!(
            cli.config.as_deref(),
            Some(std::path::Path::new("/tmp/errand.yml"))
        );
    }

    #[test]
    fn all_flags_are_optional() {
        let cli = Cli::parse_from(["errand"]);
        assert!(cli.server.is_none());
        assert!(cli.tracker_type.is_none());
        assert!(cli.config.is_none());
    }
}
