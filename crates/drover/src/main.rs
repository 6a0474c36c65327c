mod settings;

use anyhow::Context;
use clap::{Parser, Subcommand};
use drover_config::ProjectType;
use drover_controlplane::{http, Controller, Manager};
use settings::Settings;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "drover")]
#[command(about = "Declarative deployment automation on top of the Pulumi engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one full deployment iteration for a stack
    Deploy {
        /// Target as [projectType/]stackName; the project type defaults to esxi
        target: String,
    },
    /// Push the stack config into the engine without deploying
    Configure {
        /// Target as [projectType/]stackName
        target: String,
    },
    /// Tear down every resource of a stack (the config file stays)
    Destroy {
        /// Target as [projectType/]stackName
        target: String,
    },
    /// Print the deployed resource tree of a stack
    State {
        /// Target as [projectType/]stackName
        target: String,
    },
    /// Run all controllers and the HTTP API
    Server {
        /// Listen port
        #[arg(short, long, env = "DROVER_PORT", default_value_t = 8080)]
        port: u16,
    },
}

/// Splits `[projectType/]stackName`; a bare stack name targets the esxi
/// project. The last path segment is always the stack name, so the
/// `vcf/management` project spelling works too.
fn parse_target(target: &str) -> anyhow::Result<(ProjectType, &str)> {
    let Some((project, stack)) = target.rsplit_once('/') else {
        return Ok((ProjectType::Esxi, target));
    };
    let project = project
        .parse::<ProjectType>()
        .map_err(|e| anyhow::anyhow!("target must be of format [projectType/]stackName: {e}"))?;
    Ok((project, stack))
}

fn load_controller(s: &Settings, target: &str) -> anyhow::Result<(Controller, ProjectType)> {
    let (project, stack) = parse_target(target)?;
    let path = s.config_dir().join(format!("{project}-{stack}.yaml"));
    let controller = Controller::from_config_file(s.project_root(), &path)
        .with_context(|| format!("loading {}", path.display()))?;
    Ok((controller, project))
}

async fn deploy(s: &Settings, target: &str) -> anyhow::Result<()> {
    let (controller, _) = load_controller(s, target)?;
    controller.init_stack().await?;
    controller.configure_stack().await?;
    controller.refresh_stack().await?;
    controller.update_stack().await?;
    print_state(controller.stack_name());
    Ok(())
}

async fn configure(s: &Settings, target: &str) -> anyhow::Result<()> {
    let (controller, project) = load_controller(s, target)?;
    controller.init_stack().await?;
    controller.configure_stack().await?;
    println!(
        "successfully configured the stack {} in project {}",
        controller.stack_name(),
        project
    );
    Ok(())
}

async fn destroy(s: &Settings, target: &str) -> anyhow::Result<()> {
    let (controller, _) = load_controller(s, target)?;
    controller.init_stack().await?;
    controller.configure_stack().await?;
    controller.destroy_stack().await?;
    println!("destroyed stack {}", controller.stack_name());
    Ok(())
}

fn state(target: &str) -> anyhow::Result<()> {
    let (_, stack) = parse_target(target)?;
    print_state(stack);
    Ok(())
}

fn print_state(stack: &str) {
    match drover_engine::read_checkpoint(stack) {
        Ok(file) => {
            let Some(latest) = file.checkpoint.latest else {
                println!("stack {stack} has no deployment yet");
                return;
            };
            for line in drover_engine::render_tree(&latest.resources) {
                println!("{line}");
            }
        }
        Err(err) => tracing::debug!(stack, error = %err, "no checkpoint to display"),
    }
}

async fn server(s: &Settings, port: u16) -> anyhow::Result<()> {
    std::fs::create_dir_all(s.config_dir())?;
    let manager = Arc::new(Manager::new(s.project_root(), s.config_dir()));
    manager.start_all().await?;
    http::serve(manager.clone(), port).await?;
    manager.shutdown().await;
    Ok(())
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    match cli.command {
        Commands::Deploy { target } => deploy(&settings, &target).await,
        Commands::Configure { target } => configure(&settings, &target).await,
        Commands::Destroy { target } => destroy(&settings, &target).await,
        Commands::State { target } => state(&target),
        Commands::Server { port } => server(&settings, port).await,
    }
}
