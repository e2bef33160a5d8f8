use futures::StreamExt;

use crate::{
    cli::{
        CliError, Command, CommandResult,
        formatting::format_change,
        types::{ArgType, CommandArg, CommandMetadata},
    },
    coordinator::Coordinator,
};

/// Runs the reload scheduler and prints every change under a prefix until
/// Ctrl-C.
pub struct WatchCommand {
    coordinator: Coordinator,
}

impl WatchCommand {
    /// Creates a new WatchCommand driving `coordinator`.
    pub fn new(coordinator: Coordinator) -> Self {
        Self { coordinator }
    }
}

impl Command for WatchCommand {
    fn execute(&self, args: &[String]) -> CommandResult {
        let prefix = args.first().ok_or_else(|| {
            CliError::InvalidArguments("Expected <prefix> argument for 'watch' command".to_string())
        })?;

        println!("Watching changes under '{prefix}'...");
        println!("Press Ctrl+C to stop");

        let coordinator = self.coordinator.clone();
        let mut stream = coordinator.subscribe(prefix).into_stream();

        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| CliError::ServiceError(format!("Failed to create runtime: {e}")))?;

        runtime.block_on(async move {
            let scheduler = coordinator.clone();
            let mut run = tokio::spawn(async move { scheduler.start().await });

            loop {
                tokio::select! {
                    Some(change) = stream.next() => println!("{}", format_change(&change)),
                    _ = tokio::signal::ctrl_c() => break,
                    finished = &mut run => {
                        return match finished {
                            Ok(Ok(())) => Ok(()),
                            Ok(Err(e)) => Err(CliError::ServiceError(e.to_string())),
                            Err(e) => Err(CliError::ServiceError(e.to_string())),
                        };
                    }
                }
            }

            coordinator.stop();
            let _ = run.await;
            Ok(())
        })?;

        Ok("Watch ended".to_string())
    }

    fn metadata(&self) -> CommandMetadata {
        CommandMetadata {
            name: "watch".to_string(),
            description: "Watch configuration changes under a prefix".to_string(),
            category: "config".to_string(),
            args: vec![CommandArg {
                name: "prefix".to_string(),
                description: "Key prefix to watch; '*' matches one segment".to_string(),
                required: true,
                value_type: ArgType::Prefix,
            }],
            examples: vec![
                "fleetconf config watch fleet.ui".to_string(),
                "fleetconf config watch 'fleet.*.port'".to_string(),
            ],
        }
    }
}
