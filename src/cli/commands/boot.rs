//! CLI command for `sunstorm --boot`

use anyhow::Result;

use super::RunContext;
use crate::cli::output::print_info;
use crate::core::boot::BootFlow;
use crate::core::request::PrepareRequest;
use crate::infra::key_service::HttpKeyProvider;

/// Execute the boot flow
pub async fn execute(request: PrepareRequest) -> Result<()> {
    let context = RunContext::prepare(request)?;
    let env = context.env();
    let keys = HttpKeyProvider::with_url(
        context.settings.keys_url(),
        context.settings.keys_timeout_secs(),
    );

    let outcome = BootFlow::new(&env, &context.request)
        .run_with(&keys)
        .await?;

    print_info(&format!(
        "Done! Files are in {}",
        outcome.output_dir.display()
    ));
    print_info(&format!(
        "To boot, cd into {} and run {}",
        outcome.output_dir.display(),
        outcome.boot_script.display()
    ));
    Ok(())
}
