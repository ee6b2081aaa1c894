//! Command-line forwarding.
//!
//! The launcher owns no flags of its own: everything on its command line is
//! handed to the daemon verbatim. The single exception is a leading literal
//! `ui`, which desktop entries use to select launcher mode and which the
//! daemon would reject as an unknown subcommand.

/// Extract the arguments to forward to the daemon from the launcher's argv.
///
/// Drops the program name, then strips at most one leading literal `ui`.
/// A `ui` anywhere else is a daemon argument and passes through untouched.
pub fn forwarded_args(argv: impl Iterator<Item = String>) -> Vec<String> {
    let mut args: Vec<String> = argv.skip(1).collect();
    if args.first().map(String::as_str) == Some("ui") {
        args.remove(0);
    }
    args
}
