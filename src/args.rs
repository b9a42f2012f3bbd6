/// Separator between filter terms and the remote command.
pub const COMMAND_SEPARATOR: &str = "--";

/// Split raw arguments into filter terms and the trailing command.
///
/// Everything before the first `--` is a filter, everything after it is the
/// command. The separator itself ends up in neither list, and later `--`
/// tokens belong to the command.
pub fn split_args<S: AsRef<str>>(args: &[S]) -> (Vec<String>, Vec<String>) {
    let mut filters = Vec::new();
    let mut command = Vec::new();
    let mut in_command = false;

    for arg in args.iter().map(AsRef::as_ref) {
        if in_command {
            command.push(arg.to_string());
        } else if arg == COMMAND_SEPARATOR {
            in_command = true;
        } else {
            filters.push(arg.to_string());
        }
    }

    (filters, command)
}
