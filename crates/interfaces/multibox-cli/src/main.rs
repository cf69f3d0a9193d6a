use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use multibox_cli::{commands, parse_login, ServeOverrides};
use multibox_core::CharacterIdentity;
use multibox_infra::ClientLogin;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the companion server for the control panel
    Serve {
        #[arg(long)]
        bind: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
        #[arg(long, env = "MULTIBOX_PREFS_ROOT", help = "Default preferences folder")]
        prefs_root: Option<Utf8PathBuf>,
        #[arg(long, help = "JSON file replacing the built-in preference catalog")]
        catalog: Option<Utf8PathBuf>,
        #[arg(long, help = "Folder holding the control panel's index.html")]
        static_dir: Option<Utf8PathBuf>,
        #[arg(long)]
        game_folder: Option<Utf8PathBuf>,
        #[arg(long)]
        dll_folder: Option<Utf8PathBuf>,
        #[arg(long, help = "Persist these options as the new defaults")]
        save: bool,
    },
    /// List the copyable preference items
    Items {
        #[arg(long)]
        catalog: Option<Utf8PathBuf>,
    },
    /// Copy preference files from one character to others
    #[command(name = "copy-prefs")]
    CopyPrefs {
        #[arg(long, env = "MULTIBOX_PREFS_ROOT")]
        root: Utf8PathBuf,
        #[arg(long, help = "Source character as ACCOUNT/ID")]
        from: CharacterIdentity,
        #[arg(long, value_delimiter = ',', required = true, help = "Targets as ACCOUNT/ID")]
        to: Vec<CharacterIdentity>,
        #[arg(long, value_delimiter = ',', required = true)]
        items: Vec<String>,
        #[arg(long, help = "Overwrite without keeping a backup")]
        no_backup: bool,
        #[arg(long)]
        catalog: Option<Utf8PathBuf>,
        #[arg(long, help = "Print the full report as JSON")]
        json: bool,
    },
    /// Launch game clients through the quick launcher
    Launch {
        #[arg(long, env = "AOPath")]
        game_folder: Utf8PathBuf,
        #[arg(long)]
        dll_folder: Utf8PathBuf,
        #[arg(
            long = "character",
            required = true,
            value_parser = parse_login,
            help = "ACCOUNT:PASSWORD:ID, repeatable"
        )]
        characters: Vec<ClientLogin>,
    },
    /// Show running clients that clash with the selected accounts
    Check {
        #[arg(long, help = "JSON file with the account roster")]
        accounts: Utf8PathBuf,
        #[arg(long, value_delimiter = ',', required = true)]
        selected: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).expect("default subscriber");

    match cli.command {
        Commands::Serve {
            bind,
            port,
            prefs_root,
            catalog,
            static_dir,
            game_folder,
            dll_folder,
            save,
        } => {
            commands::cmd_serve(ServeOverrides {
                bind,
                port,
                preferences_root: prefs_root,
                catalog,
                static_dir,
                game_folder,
                dll_folder,
                save,
            })
            .await?
        }
        Commands::Items { catalog } => commands::cmd_items(catalog)?,
        Commands::CopyPrefs {
            root,
            from,
            to,
            items,
            no_backup,
            catalog,
            json,
        } => {
            let report = commands::cmd_copy_prefs(root, from, to, items, !no_backup, catalog).await?;
            commands::print_copy_report(&report, json)?;
            commands::ensure_copied(&report)?;
        }
        Commands::Launch {
            game_folder,
            dll_folder,
            characters,
        } => {
            let summary = commands::cmd_launch(game_folder, dll_folder, characters).await?;
            if !summary.errors.is_empty() {
                anyhow::bail!("{} launch(es) failed", summary.errors.len());
            }
        }
        Commands::Check { accounts, selected } => {
            let roster = commands::read_accounts(&accounts)?;
            let report = commands::cmd_check(&roster, &selected)?;
            if report.has_conflicts() {
                std::process::exit(2);
            }
        }
    }

    Ok(())
}
