use clap::{ArgAction, Parser, Subcommand, ValueHint};

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}",
    arg_required_else_help = true
)]
pub struct Args {
    /// Set output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress outputs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output as json
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Set proxy
    #[arg(required = false, long, short = 'P', global = true)]
    pub proxy: Option<String>,

    /// Set request headers (`Name: value`, repeatable)
    #[arg(required = false, long, short = 'H', global = true)]
    pub header: Option<Vec<String>>,

    /// Set user agent
    #[arg(required = false, long, short = 'A', global = true)]
    pub user_agent: Option<String>,

    /// Abort requests that take longer than this many seconds
    #[arg(required = false, long, global = true)]
    pub timeout: Option<u64>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the registries configured for a workspace, in priority order
    Registries {
        /// Directory inside the workspace (defaults to the current directory)
        #[arg(required = false, short, long, value_hint = ValueHint::DirPath)]
        dir: Option<String>,
    },

    /// Find the latest version of a module in the configured registries
    #[command(arg_required_else_help = true)]
    Resolve {
        /// Module name
        #[arg(required = true)]
        module: String,

        /// Directory inside the workspace (defaults to the current directory)
        #[arg(required = false, short, long, value_hint = ValueHint::DirPath)]
        dir: Option<String>,

        /// Query this registry instead of the configured ones (repeatable)
        #[arg(required = false, short, long)]
        registry: Vec<String>,
    },

    /// Show the integrity and MODULE.bazel of a source archive
    #[command(arg_required_else_help = true)]
    Inspect {
        /// Path or URL of a .tar.gz archive
        #[arg(required = true, value_hint = ValueHint::AnyPath)]
        archive: String,

        /// Directory inside the archive holding MODULE.bazel
        #[arg(required = false, short, long)]
        strip_prefix: Option<String>,
    },

    /// Print the SRI integrity of files
    #[command(arg_required_else_help = true)]
    Integrity {
        #[arg(required = true, value_hint = ValueHint::FilePath)]
        files: Vec<String>,
    },

    /// Recompute patch and overlay integrities of a module in a registry
    #[command(arg_required_else_help = true)]
    #[clap(name = "refresh-integrity")]
    RefreshIntegrity {
        /// Registry root directory
        #[arg(required = true, value_hint = ValueHint::DirPath)]
        registry: String,

        /// Module name
        #[arg(required = true)]
        module: String,
    },

    /// Add a module version to a registry from its source archive URL
    #[command(arg_required_else_help = true)]
    #[clap(name = "add-module", visible_alias = "add")]
    AddModule {
        /// Registry root directory
        #[arg(required = true, value_hint = ValueHint::DirPath)]
        registry: String,

        /// URL of the .tar.gz source archive
        #[arg(required = true, value_hint = ValueHint::Url)]
        url: String,

        /// Directory inside the archive holding MODULE.bazel
        #[arg(required = false, short, long)]
        strip_prefix: Option<String>,
    },
}
