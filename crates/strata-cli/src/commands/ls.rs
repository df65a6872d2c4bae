//! Ls command implementation

use anyhow::Result;
use serde_json::json;
use strata_pipeline::{task, TaskDag};

use crate::cli::{GlobalArgs, LsArgs, LsOutput};

pub async fn execute(args: &LsArgs, _global: &GlobalArgs) -> Result<()> {
    let dag = TaskDag::for_registry()?;
    let order = dag.topological_order()?;
    let tasks: Vec<_> = order.iter().filter_map(|name| task::find(name)).collect();

    match args.output {
        LsOutput::Table => {
            println!("{:<20} {:<18} depends on", "task", "policy");
            for task in &tasks {
                println!(
                    "{:<20} {:<18} {}",
                    task.name,
                    task.policy().to_string(),
                    task.depends_on.join(", ")
                );
            }
        }
        LsOutput::Json => {
            let entries: Vec<_> = tasks
                .iter()
                .map(|task| {
                    json!({
                        "name": task.name,
                        "policy": task.policy().to_string(),
                        "depends_on": task.depends_on,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }

    Ok(())
}
