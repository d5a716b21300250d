use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

const PLATFORMS: [&str; 4] = ["ios", "android", "mac", "linux"];

/// Kiln application packaging and export toolchain.
///
/// Builds a project and its `node_modules` packages into versioned output
/// trees and bundles, and exports native projects for ios, android, mac and
/// linux.
///
/// EXAMPLES:
///     kiln init                    Create a project in an empty directory
///     kiln build -c                Clean, then build into out/
///     kiln export ios              Generate and open the Xcode project
///     kiln start .                 Run the built project
///     kiln start --debug --brk     Run under the inspector, paused
///     kiln watch                   Rebuild on every change
///     kiln open android            Open the exported Android Studio project
///
/// ENVIRONMENT VARIABLES:
///     KILN_CONFIG      Alternate configuration file
///     KILN_COMPILER    Compiler command line
///     KILN_INSTALLER   Dependency installer command line
///     KILN_GENERATOR   Native project generator command line
///     KILN_MINIFY      Minify every package (true/false)
///     KILN_PORT        Debug server port
///     RUST_LOG         Log filter, overrides --verbose
#[derive(Parser)]
#[command(name = "kiln")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Debug server port [default: 1026]
    #[arg(long, short = 'p', global = true)]
    port: Option<u16>,

    /// Clean the build directories first
    #[arg(long, short = 'c', global = true)]
    clean: bool,

    /// Inspector address
    #[arg(
        long,
        short = 'd',
        global = true,
        num_args = 0..=1,
        default_missing_value = "127.0.0.1:9229",
        value_name = "ADDR"
    )]
    debug: Option<String>,

    /// Pause at startup until a debugger attaches
    #[arg(long, short = 'b', global = true)]
    brk: bool,

    /// Start against the debug server instead of the local build
    #[arg(long, global = true)]
    watch: bool,

    /// Minify scripts in every package
    #[arg(long, global = true)]
    minify: bool,

    /// Verbose logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a project in the current (empty) directory
    ///
    /// EXAMPLES:
    ///     kiln init             Minimal application
    ///     kiln init examples    Copy the SDK examples
    Init {
        /// `examples` copies the SDK example project
        template: Option<String>,
    },

    /// Install dependencies and build into out/
    #[command(visible_alias = "b")]
    Build,

    /// Export a native project for OS (defaults to the host)
    Export {
        #[arg(value_parser = PLATFORMS)]
        os: Option<String>,
    },

    /// Open the exported project for OS, exporting only when missing
    Open {
        #[arg(value_parser = PLATFORMS)]
        os: Option<String>,
    },

    /// Run the dependency installer with extra arguments
    Install {
        /// Passed through to the installer
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Run the project with the framework runtime
    ///
    /// EXAMPLES:
    ///     kiln start                Run out/build
    ///     kiln start web            Load from the debug server
    ///     kiln start . -- --foo     Pass --foo to the runtime
    Start {
        /// `web`, a path, or a URL [default: the local build]
        target: Option<String>,
        /// Passed through to the runtime
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Build, then rebuild whenever a source file changes
    Watch,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let options = config::CliOptions {
        port: cli.port,
        clean: cli.clean,
        debug: cli.debug,
        brk: cli.brk,
        watch: cli.watch,
        minify: cli.minify,
    };
    let ctx = config::Context::load(options)?;

    match cli.command {
        Commands::Init { template } => commands::init::run(&ctx, template.as_deref()),
        Commands::Build => commands::build::run(&ctx),
        Commands::Export { os } => commands::export::run(&ctx, os.as_deref(), false),
        Commands::Open { os } => commands::export::run(&ctx, os.as_deref(), true),
        Commands::Install { args } => commands::install::run(&ctx, &args),
        Commands::Start { target, args } => commands::start::run(&ctx, target.as_deref(), &args),
        Commands::Watch => commands::watch::run(&ctx),
    }
}
