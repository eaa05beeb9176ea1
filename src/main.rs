use clap::Parser;
use lockbox::cli::{commands, output, Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding a tracing filter directive.
const LOG_ENV: &str = "LOCKBOX_LOG";

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Init { force } => commands::init::execute(&cli, force),
        Commands::Add(ref args) => commands::add::execute(&cli, args),
        Commands::List { ref tag } => commands::list::execute(&cli, tag.as_deref()),
        Commands::Get {
            ref id,
            show,
            copy,
        } => commands::get::execute(&cli, id, show, copy),
        Commands::Update {
            ref id,
            ref fields,
            clear_tags,
            password,
        } => commands::update::execute(&cli, id, fields, clear_tags, password),
        Commands::Delete { ref id, force } => commands::delete::execute(&cli, id, force),
        Commands::Import { ref file, force } => commands::import_cmd::execute(&cli, file, force),
        Commands::Export { ref output } => commands::export::execute(&cli, output.as_deref()),
        Commands::Stats => commands::stats::execute(&cli),
        Commands::Reset { force } => commands::reset::execute(&cli, force),
        Commands::Generate { length, no_symbols } => commands::generate::execute(length, no_symbols),
        Commands::Completions { ref shell } => commands::completions::execute(shell),
    };

    if let Err(e) = result {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

/// Log to stderr. `LOCKBOX_LOG` wins; otherwise `--verbose` selects debug
/// output for this crate and the default is warnings only.
fn init_logging(verbose: bool) {
    let fallback = if verbose { "lockbox=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));

    // A second init (e.g. under a test harness) is not an error worth failing on.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
