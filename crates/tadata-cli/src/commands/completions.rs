use super::EXIT_SUCCESS;
use clap::CommandFactory;
use clap_complete::Shell;
use std::io::Write;

/// Completion script for `C`, named after its binary.
fn render<C: CommandFactory>(shell: Shell, out: &mut dyn Write) {
    let mut command = C::command();
    let bin = command.get_name().to_owned();
    clap_complete::generate(shell, &mut command, bin, out);
}

#[allow(clippy::unnecessary_wraps)]
pub fn run<C: CommandFactory>(shell: Shell) -> Result<u8, String> {
    render::<C>(shell, &mut std::io::stdout().lock());
    Ok(EXIT_SUCCESS)
}
