pub(crate) const MULTI_COMMAND_MARKER: char = '@';

// An issue body starting with the marker carries one command per line.
// Anything else is a single command, taken verbatim.
pub(crate) fn parse_commands(combined: &str) -> Vec<String> {
    let Some(rest) = combined.strip_prefix(MULTI_COMMAND_MARKER) else {
        return vec![combined.to_string()];
    };

    let mut commands: Vec<String> = rest
        .split('\n')
        .map(|segment| segment.strip_suffix('\r').unwrap_or(segment).to_string())
        .collect();
    // Trailing empty segments are line-ending artifacts, not commands.
    // Interior blank lines stay and execute as no-op successes.
    while commands.last().is_some_and(|command| command.is_empty()) {
        commands.pop();
    }
    commands
}
