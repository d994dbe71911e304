//! CLI command for `sunstorm --restore`

use anyhow::Result;

use super::RunContext;
use crate::cli::output::print_info;
use crate::core::prompt::StdinConfirm;
use crate::core::request::PrepareRequest;
use crate::core::restore::{RestoreFlow, RestoreState};

/// Execute the restore flow
pub fn execute(request: PrepareRequest) -> Result<()> {
    let context = RunContext::prepare(request)?;
    let env = context.env();

    let mut prepared = RestoreFlow::new(&env, &context.request).prepare()?;
    print_info(&format!(
        "Done! Files are in {}",
        prepared.output_dir.display()
    ));
    print_info("Restore command:");
    println!("{}", prepared.command);

    match prepared.conclude(&context.gateway, &StdinConfirm)? {
        RestoreState::Restored => print_info("Restore finished"),
        _ => print_info(&format!(
            "The restore command is saved in {}",
            prepared.command_file().display()
        )),
    }
    Ok(())
}
