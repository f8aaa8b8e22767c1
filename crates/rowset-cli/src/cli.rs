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

    /// Provide custom config file
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<String>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the configuration file to stdout
    Config {
        /// Print the documented default configuration instead
        #[arg(required = false, short, long)]
        default: bool,
    },

    /// Generate the default config file
    #[clap(name = "init")]
    Init,

    /// List rows of a table
    #[command(arg_required_else_help = true)]
    #[clap(name = "query", visible_alias = "q")]
    Query {
        /// Table to read
        #[arg(required = true)]
        table: String,

        /// Rule every row must satisfy, as FIELD<OP>VALUE
        /// (operators: = != > >= < <= ~)
        #[arg(required = false, short, long = "filter")]
        filters: Vec<String>,

        /// Rule starting an alternative group of rules
        #[arg(required = false, long = "or")]
        or_filters: Vec<String>,

        /// Sort by column; prefix with '-' to sort descending
        #[arg(required = false, short, long = "order", allow_hyphen_values = true)]
        order: Vec<String>,

        /// Maximum number of rows to print
        #[arg(required = false, short, long)]
        limit: Option<u64>,

        /// Number of rows to skip
        #[arg(required = false, long, requires = "limit")]
        offset: Option<u64>,

        /// Drop duplicate rows
        #[arg(required = false, short, long)]
        distinct: bool,
    },

    /// Count rows of a table
    #[command(arg_required_else_help = true)]
    Count {
        /// Table to count
        #[arg(required = true)]
        table: String,

        /// Rule every counted row must satisfy, as FIELD<OP>VALUE
        #[arg(required = false, short, long = "filter")]
        filters: Vec<String>,

        /// Rule starting an alternative group of rules
        #[arg(required = false, long = "or")]
        or_filters: Vec<String>,
    },

    /// Print the row with the given identifier
    #[command(arg_required_else_help = true)]
    Get {
        /// Table to read
        #[arg(required = true)]
        table: String,

        /// Value of the identifier column
        #[arg(required = true)]
        id: String,
    },
}
