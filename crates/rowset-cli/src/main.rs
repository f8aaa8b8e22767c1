use clap::Parser;
use cli::{Args, Commands};
use error::CliResult;
use logging::setup_logging;
use query::{count_table, get_row, query_table, QueryContext, QueryOptions};
use rowset_config::{
    config::{self, generate_default_config, get_config, set_config_path, Config},
    utils::resolve_path,
};
use tracing::{debug, info};

mod cli;
mod error;
mod logging;
mod query;
mod utils;

fn print_config(default: bool) -> CliResult<()> {
    let config = if default {
        Config::default_config()
    } else {
        get_config()
    };
    print!("{}", config.to_annotated_document()?);
    Ok(())
}

fn handle_cli() -> CliResult<()> {
    let args = Args::parse();

    setup_logging(&args);

    if args.no_color {
        utils::disable_color();
    }

    if let Some(ref c) = args.config {
        let path = resolve_path(c)?;
        debug!("using config file {}", path.display());
        set_config_path(path);
    }

    match args.command {
        Commands::Init => {
            let path = generate_default_config()?;
            info!("Wrote default configuration to {}", path.display());
        }
        command => {
            config::init()?;

            match command {
                Commands::Config { default } => print_config(default)?,
                Commands::Query {
                    table,
                    filters,
                    or_filters,
                    order,
                    limit,
                    offset,
                    distinct,
                } => {
                    let ctx = QueryContext::new(get_config())?;
                    let options = QueryOptions {
                        filters,
                        or_filters,
                        order,
                        limit,
                        offset,
                        distinct,
                    };
                    query_table(&ctx, &table, &options, args.json)?;
                }
                Commands::Count {
                    table,
                    filters,
                    or_filters,
                } => {
                    let ctx = QueryContext::new(get_config())?;
                    count_table(&ctx, &table, &filters, &or_filters, args.json)?;
                }
                Commands::Get { table, id } => {
                    let ctx = QueryContext::new(get_config())?;
                    get_row(&ctx, &table, &id, args.json)?;
                }
                Commands::Init => unreachable!(),
            }
        }
    }

    Ok(())
}

fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    if let Err(err) = handle_cli() {
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(1);
    }
}
