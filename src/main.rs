use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod currency;
mod error;
mod extract;
mod generator;
mod ids;
mod ingest;
mod ootd;
mod profile;
mod prompts;
mod resolve;
mod store;
mod types;
mod wardrobe;

use prompts::OotdContext;
use types::ItemDraft;

#[derive(Parser)]
#[command(name = "wardrobe")]
#[command(version)]
#[command(about = "Wardrobe catalogue fed by AI clothing analysis")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a .wardrobe directory
    Init {
        /// Directory to initialize .wardrobe in
        #[arg(short, long, default_value = ".")]
        path: String,
    },

    /// Print a prompt to paste into an AI chat
    #[command(subcommand)]
    Prompt(PromptCommands),

    /// Add one item from an AI analysis
    Add {
        /// File holding the AI response (- for stdin)
        response: String,

        /// Photo of the item
        #[arg(short, long)]
        image: Option<String>,

        #[command(flatten)]
        item: ItemArgs,
    },

    /// Import a batch analysis, matching file names against a folder
    Import {
        /// File holding the AI response (- for stdin)
        response: String,

        /// Folder with the photos that were analysed
        #[arg(short, long)]
        dir: String,
    },

    /// Analyse every photo in a folder through the generator command
    Scan {
        /// Folder with photos
        dir: String,

        /// Generator command (overrides generator_command)
        #[arg(short, long)]
        command: Option<String>,
    },

    /// List items
    List {
        /// Filter by category (e.g. Tops, Outerwear) or item type
        #[arg(short, long)]
        category: Option<String>,

        /// Filter by status
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Show one item
    Show {
        /// Item ID
        id: String,
    },

    /// Update an item
    Update {
        /// Item ID
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        size: Option<String>,

        #[arg(long)]
        price: Option<f64>,

        #[arg(long)]
        currency: Option<String>,

        #[arg(long)]
        notes: Option<String>,

        /// AI color
        #[arg(long)]
        color: Option<String>,

        /// AI item type
        #[arg(long = "type")]
        item_type: Option<String>,

        /// Comma-separated seasons (replaces existing)
        #[arg(long)]
        seasons: Option<String>,

        /// Comma-separated occasions (replaces existing)
        #[arg(long)]
        occasions: Option<String>,
    },

    /// Set an item's status
    Status {
        /// Item ID
        id: String,

        /// available, laundry, lent or repair
        status: String,
    },

    /// Record that items were worn
    Wear {
        /// Item IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Delete an item
    Delete {
        /// Item ID
        id: String,

        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },

    /// Show statistics
    Stats {
        /// Currency for totals (default: base currency)
        #[arg(short, long)]
        currency: Option<String>,
    },

    /// Convert an amount between currencies
    Convert {
        amount: f64,

        /// Source currency code
        from: String,

        /// Target currency code (default: base currency)
        to: Option<String>,
    },

    /// Show or refresh currency rates
    Rates {
        /// Refresh from a {"base_code", "rates"} JSON file
        #[arg(long)]
        refresh_from: Option<String>,
    },

    /// Log the outfit from an AI suggestion
    Ootd {
        /// File holding the AI response (- for stdin)
        response: String,
    },

    /// Show outfit history
    Log {
        /// Maximum entries
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// View or set configuration
    Config {
        /// Config key
        key: Option<String>,

        /// Config value
        value: Option<String>,

        /// Use the global config in ~/.config/wardrobe
        #[arg(short, long)]
        global: bool,
    },

    /// View or set the wearer profile
    Profile {
        /// Profile field (measurements.<name> for measurements)
        key: Option<String>,

        /// New value (comma-separated for lists)
        value: Option<String>,
    },

    /// Rebuild items for images that have none
    Recover,

    /// Export items to stdout
    Export {
        /// Output format
        #[arg(short, long, default_value = "json", value_parser = ["json", "md"])]
        format: String,
    },
}

#[derive(Subcommand)]
enum PromptCommands {
    /// Prompt for analysing one item photo
    Add {
        #[command(flatten)]
        item: ItemArgs,
    },

    /// Prompt for analysing every photo in a folder at once
    Batch {
        /// Folder with photos
        dir: String,
    },

    /// Prompt for today's outfit
    Ootd {
        #[arg(short, long, default_value = "")]
        weather: String,

        #[arg(short, long, default_value = "")]
        occasion: String,

        #[arg(short, long, default_value = "")]
        mood: String,
    },
}

#[derive(clap::Args)]
struct ItemArgs {
    /// Item name
    #[arg(short, long, default_value = "")]
    name: String,

    #[arg(short, long)]
    size: Option<String>,

    #[arg(long, default_value = "0")]
    price: f64,

    /// Currency code (default: base currency)
    #[arg(long)]
    currency: Option<String>,

    /// Times already worn
    #[arg(long, default_value = "0")]
    wears: u32,

    #[arg(long)]
    notes: Option<String>,
}

impl From<ItemArgs> for ItemDraft {
    fn from(args: ItemArgs) -> Self {
        ItemDraft {
            name: args.name,
            size: args.size,
            price: args.price,
            currency: args.currency.map(|c| c.to_uppercase()),
            wear_count: args.wears,
            notes: args.notes,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_env("WARDROBE_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { path } => cli::items::run_init(&path),
        Commands::Prompt(cmd) => match cmd {
            PromptCommands::Add { item } => cli::ingest::run_prompt_add(&item.into()),
            PromptCommands::Batch { dir } => cli::ingest::run_prompt_batch(&dir),
            PromptCommands::Ootd {
                weather,
                occasion,
                mood,
            } => cli::ingest::run_prompt_ootd(&OotdContext {
                weather,
                occasion,
                mood,
            }),
        },
        Commands::Add {
            response,
            image,
            item,
        } => cli::ingest::run_add(&response, image.as_deref(), item.into()),
        Commands::Import { response, dir } => cli::ingest::run_import(&response, &dir),
        Commands::Scan { dir, command } => cli::ingest::run_scan(&dir, command.as_deref()),
        Commands::List { category, status } => {
            cli::items::run_list(category.as_deref(), status.as_deref())
        }
        Commands::Show { id } => cli::items::run_show(&id),
        Commands::Update {
            id,
            name,
            size,
            price,
            currency,
            notes,
            color,
            item_type,
            seasons,
            occasions,
        } => cli::items::run_update(
            &id,
            cli::items::UpdateArgs {
                name,
                size,
                price,
                currency,
                notes,
                color,
                item_type,
                seasons,
                occasions,
            },
        ),
        Commands::Status { id, status } => cli::items::run_status(&id, &status),
        Commands::Wear { ids } => cli::items::run_wear(&ids),
        Commands::Delete { id, force } => cli::items::run_delete(&id, force),
        Commands::Stats { currency } => cli::items::run_stats(currency.as_deref()),
        Commands::Convert { amount, from, to } => {
            cli::rates::run_convert(amount, &from, to.as_deref())
        }
        Commands::Rates { refresh_from } => cli::rates::run_rates(refresh_from.as_deref()),
        Commands::Ootd { response } => cli::ootd::run_ootd(&response),
        Commands::Log { limit } => cli::ootd::run_log(limit),
        Commands::Config { key, value, global } => {
            cli::config::run_config(key.as_deref(), value.as_deref(), global)
        }
        Commands::Profile { key, value } => {
            cli::config::run_profile(key.as_deref(), value.as_deref())
        }
        Commands::Recover => cli::items::run_recover(),
        Commands::Export { format } => cli::items::run_export(&format),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
