//! Convert command - produce or reuse a CSV rendering of a file

use crate::cli::args::ConvertArgs;
use crate::error::DataMcpResult;
use crate::tool::CommandRunner;
use crate::workspace::Workspace;

/// Execute the convert command
pub async fn execute(
    args: ConvertArgs,
    workspace: &Workspace,
    runner: &dyn CommandRunner,
) -> DataMcpResult<()> {
    let csv = workspace.ensure_csv(runner, &args.file).await?;
    println!("{}", csv.display());
    Ok(())
}
