//! Profile command - print a cached or freshly computed profile

use crate::cli::args::ProfileArgs;
use crate::error::DataMcpResult;
use crate::tool::CommandRunner;
use crate::workspace::Workspace;
use tracing::debug;

/// Execute the profile command
pub async fn execute(
    args: ProfileArgs,
    workspace: &Workspace,
    runner: &dyn CommandRunner,
) -> DataMcpResult<()> {
    let options = args.options();
    let text = workspace.profile(runner, &args.file, &options).await?;
    println!("{}", text);

    let metrics = workspace.profile_cache().metrics();
    debug!(
        "Profile cache: {} hit(s), {} miss(es), hit rate {:.0}%",
        metrics.hits,
        metrics.misses,
        metrics.hit_rate() * 100.0
    );
    Ok(())
}
