//! Sherpack CLI - The Kubernetes package manager with Jinja2 templates

use clap::{Parser, Subcommand};
use miette::Result;
use std::path::PathBuf;

mod commands;
mod display;
mod error;
mod exit_codes;
mod util;

#[derive(Parser)]
#[command(name = "sherpack")]
#[command(author = "Sherpack Contributors")]
#[command(version)]
#[command(about = "The Kubernetes package manager with Jinja2 templates", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render pack templates locally
    Template {
        /// Release name (for template context)
        name: String,

        /// Pack path
        pack: PathBuf,

        /// Values file(s) to merge
        #[arg(short = 'f', long = "values")]
        values: Vec<PathBuf>,

        /// Set values on command line (key=value)
        #[arg(long = "set")]
        set: Vec<String>,

        /// Target namespace
        #[arg(short, long, default_value = "default")]
        namespace: String,

        /// Output directory (if not set, outputs to stdout)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Show only specific template
        #[arg(short = 's', long)]
        show_only: Option<String>,

        /// Show rendered values
        #[arg(long)]
        show_values: bool,

        /// Skip JSON schema validation of values
        #[arg(long)]
        skip_schema: bool,
    },

    /// Create a new pack
    Create {
        /// Pack name
        name: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Lint a pack
    Lint {
        /// Pack path
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Strict mode
        #[arg(long)]
        strict: bool,
    },

    /// Show pack information
    Show {
        /// Pack path
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Show all information
        #[arg(long)]
        all: bool,
    },

    /// Validate values against the pack's JSON schema
    Validate {
        /// Pack path
        #[arg(default_value = ".")]
        path: PathBuf,

        /// External schema file (overrides the pack's own values.schema.json)
        #[arg(long)]
        schema: Option<PathBuf>,

        /// Primary values file
        #[arg(short = 'f', long = "values")]
        values: Option<PathBuf>,

        /// Additional values file(s) to merge
        #[arg(long = "values-file")]
        values_files: Vec<PathBuf>,

        /// Set values on command line (key=value)
        #[arg(long = "set")]
        set: Vec<String>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Emit JSON output
        #[arg(long)]
        json: bool,

        /// Strict mode - warnings become errors
        #[arg(long)]
        strict: bool,
    },

    /// Create a distributable archive from a pack
    Package {
        /// Pack path
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output archive path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Inspect an archive's contents without extracting it
    Inspect {
        /// Archive path
        archive: PathBuf,

        /// Print the raw archive manifest instead of a summary
        #[arg(long)]
        manifest: bool,

        /// Show file checksums
        #[arg(long)]
        checksums: bool,
    },

    /// Install a pack as a new release
    Install {
        /// Release name
        name: String,

        /// Pack path
        pack: PathBuf,

        /// Values file(s) to merge
        #[arg(short = 'f', long = "values")]
        values: Vec<PathBuf>,

        /// Set values on command line (key=value)
        #[arg(long = "set")]
        set: Vec<String>,

        /// Target namespace
        #[arg(short, long, default_value = "default")]
        namespace: String,

        /// Wait for resources to become ready
        #[arg(long)]
        wait: bool,

        /// Timeout in seconds for --wait
        #[arg(long)]
        timeout: Option<u64>,

        /// Roll back automatically on failure
        #[arg(long)]
        atomic: bool,

        /// Create the namespace if it does not exist
        #[arg(long)]
        create_namespace: bool,

        /// Render and validate only, without applying to the cluster
        #[arg(long)]
        dry_run: bool,

        /// Show a diff of resources that would be created
        #[arg(long)]
        show_diff: bool,

        /// Skip applying CRDs in crds/
        #[arg(long)]
        skip_crds: bool,

        /// Allow reinstalling under a name whose last release is
        /// uninstalled or failed
        #[arg(long)]
        reuse_name: bool,
    },

    /// Upgrade an existing release, or install it if `--install` is given
    Upgrade {
        /// Release name
        name: String,

        /// Pack path
        pack: PathBuf,

        /// Values file(s) to merge
        #[arg(short = 'f', long = "values")]
        values: Vec<PathBuf>,

        /// Set values on command line (key=value)
        #[arg(long = "set")]
        set: Vec<String>,

        /// Target namespace
        #[arg(short, long, default_value = "default")]
        namespace: String,

        /// Wait for resources to become ready
        #[arg(long)]
        wait: bool,

        /// Timeout in seconds for --wait
        #[arg(long)]
        timeout: Option<u64>,

        /// Roll back automatically on failure
        #[arg(long)]
        atomic: bool,

        /// Install the release if it does not already exist
        #[arg(long)]
        install: bool,

        /// Force resource replacement
        #[arg(long)]
        force: bool,

        /// Reset values to the pack's defaults instead of reusing the current release's
        #[arg(long)]
        reset_values: bool,

        /// Reuse the previous release's values, ignoring any new ones supplied
        #[arg(long)]
        reuse_values: bool,

        /// Skip hook execution
        #[arg(long)]
        no_hooks: bool,

        /// Render and validate only, without applying to the cluster
        #[arg(long)]
        dry_run: bool,

        /// Show a diff of resources that would change
        #[arg(long)]
        show_diff: bool,

        /// Strategy for handling immutable field conflicts (fail|replace|skip)
        #[arg(long)]
        immutable_strategy: Option<String>,

        /// Maximum number of revisions to retain
        #[arg(long)]
        max_history: Option<u32>,
    },

    /// Roll back a release to a previous revision
    Rollback {
        /// Release name
        name: String,

        /// Target revision (0 selects the previous deployed revision)
        #[arg(default_value_t = 0)]
        revision: u32,

        /// Target namespace
        #[arg(short, long, default_value = "default")]
        namespace: String,

        /// Wait for resources to become ready
        #[arg(long)]
        wait: bool,

        /// Timeout in seconds for --wait
        #[arg(long)]
        timeout: Option<u64>,

        /// Force resource replacement
        #[arg(long)]
        force: bool,

        /// Skip hook execution
        #[arg(long)]
        no_hooks: bool,

        /// Render and validate only, without applying to the cluster
        #[arg(long)]
        dry_run: bool,

        /// Show a diff of resources that would change
        #[arg(long)]
        show_diff: bool,

        /// Strategy for handling immutable field conflicts (fail|replace|skip)
        #[arg(long)]
        immutable_strategy: Option<String>,

        /// Maximum number of revisions to retain
        #[arg(long)]
        max_history: Option<u32>,
    },

    /// Uninstall a release
    Uninstall {
        /// Release name
        name: String,

        /// Target namespace
        #[arg(short, long, default_value = "default")]
        namespace: String,

        /// Wait for resources to be removed
        #[arg(long)]
        wait: bool,

        /// Timeout in seconds for --wait
        #[arg(long)]
        timeout: Option<u64>,

        /// Keep release history instead of purging it
        #[arg(long)]
        keep_history: bool,

        /// Skip hook execution
        #[arg(long)]
        no_hooks: bool,

        /// Render only, without deleting cluster resources
        #[arg(long)]
        dry_run: bool,

        /// Also delete CRDs owned by this release
        #[arg(long)]
        delete_crds: bool,

        /// Required alongside --delete-crds to confirm deletion of custom resources
        #[arg(long)]
        confirm_crd_deletion: bool,
    },

    /// Show release history
    History {
        /// Release name
        name: String,

        /// Target namespace
        #[arg(short, long, default_value = "default")]
        namespace: String,

        /// Limit the number of revisions shown
        #[arg(long)]
        max: Option<usize>,

        /// Emit JSON output
        #[arg(long)]
        json: bool,
    },

    /// List installed releases
    List {
        /// Target namespace
        #[arg(short, long)]
        namespace: Option<String>,

        /// List releases across all namespaces
        #[arg(short = 'A', long)]
        all_namespaces: bool,

        /// Emit JSON output
        #[arg(long)]
        json: bool,
    },

    /// Show the status of a release
    Status {
        /// Release name
        name: String,

        /// Target namespace
        #[arg(short, long, default_value = "default")]
        namespace: String,

        /// Show live resource status from the cluster
        #[arg(long)]
        show_resources: bool,

        /// Show the release's resolved values
        #[arg(long)]
        show_values: bool,

        /// Show the release's rendered manifest
        #[arg(long)]
        show_manifest: bool,

        /// Emit JSON output
        #[arg(long)]
        json: bool,
    },

    /// Recover a release stuck in a pending-* or uninstalling state
    Recover {
        /// Release name
        name: String,

        /// Target namespace
        #[arg(short, long, default_value = "default")]
        namespace: String,
    },
}

fn main() -> Result<()> {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();

    // Set debug level
    if cli.debug {
        // SAFETY: We're the only thread at this point (start of main)
        unsafe { std::env::set_var("RUST_BACKTRACE", "1") };
    }

    run(cli)
}

#[tokio::main(flavor = "current_thread")]
async fn run(cli: Cli) -> Result<()> {
    use error::CliError;

    let debug = cli.debug;
    let result: error::Result<()> = match cli.command {
        Commands::Template {
            name,
            pack,
            values,
            set,
            namespace,
            output_dir,
            show_only,
            show_values,
            skip_schema,
        } => commands::template::run(
            &name,
            &pack,
            &values,
            &set,
            &namespace,
            output_dir.as_deref(),
            show_only.as_deref(),
            show_values,
            skip_schema,
            debug,
        )
        .map_err(CliError::from),

        Commands::Create { name, output } => {
            commands::create::run(&name, &output).map_err(CliError::from)
        }

        Commands::Lint { path, strict } => commands::lint::run(&path, strict).map_err(CliError::from),

        Commands::Show { path, all } => commands::show::run(&path, all).map_err(CliError::from),

        Commands::Validate {
            path,
            schema,
            values,
            values_files,
            set,
            verbose,
            json,
            strict,
        } => commands::validate::run(
            &path,
            schema.as_deref(),
            values.as_deref(),
            &values_files,
            &set,
            verbose,
            json,
            strict,
        )
        .map_err(CliError::from),

        Commands::Package { path, output } => {
            commands::package::run(&path, output.as_deref()).map_err(CliError::from)
        }

        Commands::Inspect {
            archive,
            manifest,
            checksums,
        } => commands::inspect::run(&archive, manifest, checksums).map_err(CliError::from),

        Commands::Install {
            name,
            pack,
            values,
            set,
            namespace,
            wait,
            timeout,
            atomic,
            create_namespace,
            dry_run,
            show_diff,
            skip_crds,
            reuse_name,
        } => {
            commands::install::run(
                &name,
                &pack,
                &values,
                &set,
                &namespace,
                wait,
                timeout,
                atomic,
                create_namespace,
                dry_run,
                show_diff,
                skip_crds,
                reuse_name,
            )
            .await
        }

        Commands::Upgrade {
            name,
            pack,
            values,
            set,
            namespace,
            wait,
            timeout,
            atomic,
            install,
            force,
            reset_values,
            reuse_values,
            no_hooks,
            dry_run,
            show_diff,
            immutable_strategy,
            max_history,
        } => {
            commands::upgrade::run(
                &name,
                &pack,
                &values,
                &set,
                &namespace,
                wait,
                timeout,
                atomic,
                install,
                force,
                reset_values,
                reuse_values,
                no_hooks,
                dry_run,
                show_diff,
                immutable_strategy.as_deref(),
                max_history,
            )
            .await
        }

        Commands::Rollback {
            name,
            revision,
            namespace,
            wait,
            timeout,
            force,
            no_hooks,
            dry_run,
            show_diff,
            immutable_strategy,
            max_history,
        } => {
            commands::rollback::run(
                &name,
                revision,
                &namespace,
                wait,
                timeout,
                force,
                no_hooks,
                dry_run,
                show_diff,
                immutable_strategy.as_deref(),
                max_history,
            )
            .await
        }

        Commands::Uninstall {
            name,
            namespace,
            wait,
            timeout,
            keep_history,
            no_hooks,
            dry_run,
            delete_crds,
            confirm_crd_deletion,
        } => {
            commands::uninstall::run(
                &name,
                &namespace,
                wait,
                timeout,
                keep_history,
                no_hooks,
                dry_run,
                delete_crds,
                confirm_crd_deletion,
            )
            .await
        }

        Commands::History {
            name,
            namespace,
            max,
            json,
        } => commands::history::run(&name, &namespace, max, json).await,

        Commands::List {
            namespace,
            all_namespaces,
            json,
        } => commands::list::run(namespace.as_deref(), all_namespaces, json).await,

        Commands::Status {
            name,
            namespace,
            show_resources,
            show_values,
            show_manifest,
            json,
        } => {
            commands::status::run(&name, &namespace, show_resources, show_values, show_manifest, json)
                .await
        }

        Commands::Recover { name, namespace } => commands::recover::run(&name, &namespace).await,
    };

    result.map_err(|e| {
        let code = e.exit_code();
        eprintln!("{} {e}", console::style("error:").red().bold());
        std::process::exit(code);
    })
}
