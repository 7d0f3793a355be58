//! Renderman CLI - render Kubernetes manifests into a reviewable tree

use clap::{Args, Parser, Subcommand};
use renderman_core::{CONFIG_FILE_NAME, UnitKind};
use renderman_engine::{RenderOptions, ToolPaths};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

mod commands;
mod display;
mod error;
mod exit_codes;
mod logging;

use commands::Selection;
use error::CliError;

#[derive(Parser)]
#[command(name = "renderman")]
#[command(version)]
#[command(about = "Render Kubernetes manifests from helm charts, kustomizations and bundles", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file
    #[arg(
        short = 'f',
        long,
        global = true,
        env = "RENDERMAN_CONFIG",
        default_value = CONFIG_FILE_NAME,
        value_name = "PATH"
    )]
    config_file: PathBuf,

    /// Suppress progress messages
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Enable debug output (also passed to helm and helmfile)
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the enabled apps
    Apps,

    /// List the manifest files the config produces
    Outputs {
        #[command(flatten)]
        select: SelectArgs,
    },

    /// Render manifests and print them without writing
    Preview {
        #[command(flatten)]
        render: RenderArgs,
    },

    /// Compare rendered manifests with the output directory
    #[command(alias = "diff")]
    Check {
        #[command(flatten)]
        render: RenderArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Lines of context around changes
        #[arg(long, default_value_t = 3, value_name = "LINES")]
        context: usize,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render manifests and write them to the output directory
    Update {
        #[command(flatten)]
        render: RenderArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args)]
struct SelectArgs {
    /// Only this app
    #[arg(short, long, value_name = "NAME")]
    app: Option<String>,

    /// Only units of this kind (release, kustomization, bundle)
    #[arg(short = 't', long = "kind", alias = "type", value_name = "KIND")]
    kinds: Vec<UnitKind>,
}

#[derive(Args)]
struct OutputArgs {
    /// Output directory
    #[arg(
        short,
        long,
        env = "RENDERMAN_OUTPUT_DIR",
        default_value = ".",
        value_name = "PATH"
    )]
    output_dir: PathBuf,
}

#[derive(Args)]
struct RenderArgs {
    #[command(flatten)]
    select: SelectArgs,

    /// Units rendered at once
    #[arg(short, long, default_value = "4", value_name = "N")]
    jobs: NonZeroUsize,

    /// Timeout for each helm/helmfile/kustomize run, in seconds
    #[arg(long, default_value_t = 300, value_name = "SECS")]
    tool_timeout: u64,

    /// Overall timeout, in seconds; unfinished units fail
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Skip helm repository updates and dependency builds (helmfile --skip-deps)
    #[arg(long)]
    no_helm_repo_update: bool,

    /// helm executable
    #[arg(long, env = "RENDERMAN_HELM", default_value = "helm", value_name = "PATH")]
    helm_bin: String,

    /// helmfile executable
    #[arg(long, env = "RENDERMAN_HELMFILE", default_value = "helmfile", value_name = "PATH")]
    helmfile_bin: String,

    /// kustomize executable
    #[arg(long, env = "RENDERMAN_KUSTOMIZE", default_value = "kustomize", value_name = "PATH")]
    kustomize_bin: String,
}

impl SelectArgs {
    fn selection(&self) -> Selection {
        Selection {
            app: self.app.clone(),
            kinds: self.kinds.clone(),
        }
    }
}

impl RenderArgs {
    fn options(&self, debug: bool) -> RenderOptions {
        RenderOptions {
            jobs: self.jobs.get(),
            tool_timeout: Duration::from_secs(self.tool_timeout),
            deadline: self.timeout.map(Duration::from_secs),
            debug,
            skip_deps: self.no_helm_repo_update,
            tools: ToolPaths {
                helm: self.helm_bin.clone(),
                helmfile: self.helmfile_bin.clone(),
                kustomize: self.kustomize_bin.clone(),
            },
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                exit(exit_codes::USAGE_ERROR)
            } else {
                exit(exit_codes::SUCCESS)
            };
        }
    };

    logging::init(cli.debug, cli.quiet);

    match run(cli).await {
        Ok(code) => exit(code),
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            exit(code)
        }
    }
}

async fn run(cli: Cli) -> Result<i32, CliError> {
    let Cli {
        command,
        config_file,
        quiet,
        debug,
    } = cli;

    match command {
        Commands::Apps => commands::apps::run(&config_file),

        Commands::Outputs { select } => commands::outputs::run(&config_file, &select.selection()),

        Commands::Preview { render } => {
            commands::preview::run(
                &config_file,
                &render.select.selection(),
                render.options(debug),
                quiet,
            )
            .await
        }

        Commands::Check {
            render,
            output,
            context,
            json,
        } => {
            commands::check::run(
                &config_file,
                &output.output_dir,
                &render.select.selection(),
                render.options(debug),
                context,
                json,
                quiet,
            )
            .await
        }

        Commands::Update { render, output } => {
            commands::update::run(
                &config_file,
                &output.output_dir,
                &render.select.selection(),
                render.options(debug),
                quiet,
            )
            .await
        }
    }
}

fn exit(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
