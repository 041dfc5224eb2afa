use crate::runner::CommandOutcome;

/// Instructions appended to every failure report unless `PROMPT` overrides them.
pub const DEFAULT_PROMPT: &str = "\
Your job is to change the code in the current working directory so that the \
command above exits successfully.

You have four tools:
- list-files(path): list the entries of one directory
- render-tree(path): show the directory structure below a path
- read-file(path): read a file
- write-file(path, content): replace a file with new content

All paths are relative to the working directory and cannot leave it.

Start by looking around: render the tree or list directories, then read the \
files involved in the failure before deciding what to change. When you know \
what is wrong, write the corrected files in full. Change only what the \
failure requires and keep the existing style. Once your edits are written, \
reply with a short summary of what you changed and do not call any more \
tools; the command will then be run again.";

/// First user turn of a repair attempt.
pub fn compose_prompt(command: &str, outcome: &CommandOutcome, instructions: &str) -> String {
    format!(
        "The following command failed:\n{}\n\nstdout:\n{}\n\nstderr:\n{}\n\n{}",
        command, outcome.stdout, outcome.stderr, instructions
    )
}
