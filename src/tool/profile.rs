//! Profiling through the data tool, backed by the profile cache

use crate::cache::{ProfileCache, ProfileOptions};
use crate::error::{DataMcpError, DataMcpResult};
use crate::tool::runner::CommandRunner;
use std::path::Path;
use tracing::debug;

/// Tool invocations that make up one profile, as (heading, command, args)
pub fn profile_commands(
    source: &Path,
    options: &ProfileOptions,
) -> Vec<(&'static str, &'static str, Vec<String>)> {
    let source = source.to_string_lossy().into_owned();
    let select = |args: &mut Vec<String>| {
        if let Some(columns) = &options.columns {
            args.push("--select".to_string());
            args.push(columns.clone());
        }
    };

    let mut commands = Vec::new();

    if !options.no_stats.unwrap_or(false) {
        let mut args = vec![source.clone(), "--everything".to_string()];
        select(&mut args);
        commands.push(("stats", "stats", args));
    }

    let mut args = vec![source];
    if let Some(limit) = options.limit {
        args.push("--limit".to_string());
        args.push(limit.to_string());
    }
    select(&mut args);
    commands.push(("frequency", "frequency", args));

    commands
}

/// Run the profiling commands and join their output under headings
pub async fn compute_profile(
    runner: &dyn CommandRunner,
    source: &Path,
    options: &ProfileOptions,
) -> DataMcpResult<String> {
    let mut sections = Vec::new();

    for (heading, command, args) in profile_commands(source, options) {
        let output = runner.run(command, &args).await?;
        if !output.success() {
            return Err(DataMcpError::command_exec(
                format!("{} {}", command, source.display()),
                output.stderr.trim(),
            ));
        }
        sections.push(format!("# {}\n{}", heading, output.stdout.trim_end()));
    }

    Ok(sections.join("\n\n"))
}

/// Return the profile for `source`, computing and caching it on a miss
pub async fn profile(
    runner: &dyn CommandRunner,
    cache: Option<&ProfileCache>,
    source: &Path,
    options: &ProfileOptions,
) -> DataMcpResult<String> {
    if !tokio::fs::try_exists(source).await.unwrap_or(false) {
        return Err(DataMcpError::PathNotFound(source.to_path_buf()));
    }

    if let Some(cache) = cache {
        if let Some(text) = cache.get_cached_profile(source, options).await {
            return Ok(text);
        }
    }

    debug!("Computing profile for {}", source.display());
    let text = compute_profile(runner, source, options).await?;

    if let Some(cache) = cache {
        cache.cache_profile(source, options, &text).await;
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::runner::CommandOutput;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeProfiler {
        calls: Mutex<Vec<(String, Vec<String>)>>,
        fail: bool,
    }

    #[async_trait]
    impl CommandRunner for FakeProfiler {
        async fn run(&self, command: &str, args: &[String]) -> DataMcpResult<CommandOutput> {
            self.calls
                .lock()
                .unwrap()
                .push((command.to_string(), args.to_vec()));
            Ok(CommandOutput {
                exit_code: if self.fail { 2 } else { 0 },
                stdout: format!("{} output\n", command),
                stderr: "boom".to_string(),
            })
        }
    }

    #[test]
    fn commands_follow_options() {
        let source = Path::new("/data/a.csv");
        let options = ProfileOptions {
            limit: Some(7),
            columns: Some("id,name".to_string()),
            no_stats: None,
        };

        let commands = profile_commands(source, &options);
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].1, "stats");
        assert_eq!(
            commands[0].2,
            vec!["/data/a.csv", "--everything", "--select", "id,name"]
        );
        assert_eq!(
            commands[1].2,
            vec!["/data/a.csv", "--limit", "7", "--select", "id,name"]
        );
    }

    #[test]
    fn no_stats_skips_stats_command() {
        let options = ProfileOptions {
            no_stats: Some(true),
            ..ProfileOptions::default()
        };
        let commands = profile_commands(Path::new("a.csv"), &options);
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].1, "frequency");
    }

    #[tokio::test]
    async fn computed_profile_has_sections() {
        let runner = FakeProfiler::default();
        let text = compute_profile(&runner, Path::new("a.csv"), &ProfileOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "# stats\nstats output\n\n# frequency\nfrequency output");
    }

    #[tokio::test]
    async fn failing_command_is_an_error() {
        let runner = FakeProfiler {
            fail: true,
            ..FakeProfiler::default()
        };
        let err = compute_profile(&runner, Path::new("a.csv"), &ProfileOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DataMcpError::CommandExecution { .. }));
    }

    #[tokio::test]
    async fn cached_profile_skips_the_tool() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.csv");
        std::fs::write(&source, "id\n1\n").unwrap();
        let cache = ProfileCache::new(dir.path(), 1024 * 1024, Duration::from_secs(60));
        let runner = FakeProfiler::default();
        let options = ProfileOptions::default();

        let first = profile(&runner, Some(&cache), &source, &options).await.unwrap();
        let calls_after_first = runner.calls.lock().unwrap().len();
        let second = profile(&runner, Some(&cache), &source, &options).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(runner.calls.lock().unwrap().len(), calls_after_first);
        assert_eq!(cache.metrics().hits, 1);
    }

    #[tokio::test]
    async fn failed_profile_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.csv");
        std::fs::write(&source, "id\n1\n").unwrap();
        let cache = ProfileCache::new(dir.path(), 1024 * 1024, Duration::from_secs(60));
        let runner = FakeProfiler {
            fail: true,
            ..FakeProfiler::default()
        };

        assert!(profile(&runner, Some(&cache), &source, &ProfileOptions::default())
            .await
            .is_err());
        assert!(cache.entries().await.is_empty());
    }
}
