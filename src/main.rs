use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, ValueEnum};

use car_picker::app::CarPickerApp;
use car_picker::config::{DataPaths, Overrides, Preferences};
use car_picker::ui::panels::{self, DisplayOptions};

/// Find the used car with the best projected resale profit.
#[derive(Debug, Parser)]
#[command(name = "car-picker", version, about)]
struct Cli {
    #[command(flatten)]
    paths: DataPaths,

    /// JSON preferences file; command-line flags override its fields
    #[arg(long)]
    preferences: Option<PathBuf>,

    /// Ignore the preferences file and flags, use the reset preferences
    #[arg(long)]
    reset: bool,

    #[command(flatten)]
    overrides: Overrides,

    /// Show at most N rows of the ranked table
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Manufacturer named in the purchase advice
    #[arg(long, default_value = "BMW")]
    make: String,

    /// Print the budget bounds and selectable values, then exit
    #[arg(long)]
    list_options: bool,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut app = CarPickerApp::open(&cli.paths)?;

    if cli.list_options {
        print!("{}", panels::options_panel(app.state.catalog()));
        return Ok(());
    }

    let preferences = if cli.reset {
        Preferences::reset(app.state.catalog().price_bounds())
    } else {
        let base = match &cli.preferences {
            Some(path) => Preferences::load(path)?,
            None => Preferences::default(),
        };
        cli.overrides.apply(base)
    };

    let eval = app.evaluate(preferences, cli.limit)?;
    match cli.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&eval)?),
        Format::Text => {
            let color = std::io::stdout().is_terminal();
            colored::control::set_override(color);
            let display = DisplayOptions {
                make: cli.make,
                color,
            };
            print!("{}", panels::report(&eval.recommendation, &display)?);
        }
    }
    Ok(())
}
