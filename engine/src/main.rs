//! Sheetforge CLI - Convert sheets to typed records and generated sources
//!
//! # Main Commands
//!
//! ```bash
//! sheetforge convert -c sheetforge.json     # Convert every sheet, store records
//! sheetforge codegen -c sheetforge.json     # Write record, table and enum sources
//! sheetforge assets list                    # Inspect stored record assets
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! sheetforge show items.csv                # Parse a sheet and print its schema
//! sheetforge settings example              # Show an example configuration
//! sheetforge settings check -c cfg.json    # Validate a configuration
//! ```

use clap::{Parser, Subcommand};
use sheetforge::{
    derive_schema, example_config, parse_file_auto, ConverterConfig, Grid, JsonRecordStore,
    OutputKind, Pipeline, RecordStore,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "sheetforge.json";

#[derive(Parser)]
#[command(name = "sheetforge")]
#[command(about = "Convert spreadsheets to typed records and generated source files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert configured sheets to records and store them
    Convert {
        /// Configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// Only convert this class (its enum sheets and join target still run)
        #[arg(long)]
        class: Option<String>,

        /// Record store directory (default: .sheetforge/assets)
        #[arg(short, long)]
        store: Option<PathBuf>,

        /// Convert without writing assets
        #[arg(long)]
        dry_run: bool,

        /// Write each setting's diagnostics report to its temp path
        #[arg(long)]
        report: bool,
    },

    /// Generate record, table and enum sources from the sheets' headers
    Codegen {
        /// Configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// Output directory (default: output_dir from the configuration)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Parse a sheet and print its grid and field schema
    Show {
        /// Input delimited file
        input: PathBuf,

        /// Configuration providing enums and reference types
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file for the normalized grid (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Inspect or create configurations
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Manage stored record assets
    Assets {
        /// Record store directory (default: .sheetforge/assets)
        #[arg(short, long)]
        store: Option<PathBuf>,

        #[command(subcommand)]
        action: AssetAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Show an example configuration
    Example {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load a configuration and report its settings
    Check {
        /// Configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },
}

#[derive(Subcommand)]
enum AssetAction {
    /// List all stored assets
    List,

    /// Show the records of an asset
    Show {
        /// Asset name
        name: String,
    },

    /// Delete an asset
    Delete {
        /// Asset name
        name: String,
    },
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            config,
            class,
            store,
            dry_run,
            report,
        } => cmd_convert(&config, class.as_deref(), store.as_deref(), dry_run, report),

        Commands::Codegen { config, out } => cmd_codegen(&config, out.as_deref()),

        Commands::Show {
            input,
            config,
            output,
        } => cmd_show(&input, config.as_deref(), output.as_deref()),

        Commands::Settings { action } => cmd_settings(action),

        Commands::Assets { store, action } => cmd_assets(store.as_deref(), action),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn open_store(dir: Option<&Path>) -> JsonRecordStore {
    match dir {
        Some(d) => JsonRecordStore::with_dir(d),
        None => JsonRecordStore::new(),
    }
}

fn cmd_convert(
    config_path: &Path,
    class: Option<&str>,
    store_dir: Option<&Path>,
    dry_run: bool,
    report: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Loading configuration: {}", config_path.display());
    let config = ConverterConfig::from_file(config_path)?;
    let mut pipeline = Pipeline::new(config.clone());

    let outputs = match class {
        None => pipeline.convert_all()?,
        Some(name) => {
            let setting = config.setting(name)?.clone();
            pipeline.load_enum_sheets()?;
            if let Some(join) = &setting.join {
                let target = config.setting(&join.target_table)?.clone();
                pipeline.convert_setting(&target)?;
            }
            vec![pipeline.convert_setting(&setting)?]
        }
    };

    let mut problems = 0;
    for output in &outputs {
        eprintln!();
        for entry in output.log.entries() {
            eprintln!("{}", entry.render());
        }
        problems += output.log.problem_count();
        println!("{}", output.summary());

        if report {
            let setting = config.setting(&output.class_name)?;
            let dir = setting.effective_temp_path(&config);
            fs::create_dir_all(dir)?;
            let path = dir.join(format!("{}.report.json", output.class_name));
            fs::write(&path, serde_json::to_string_pretty(&output.report)?)?;
            eprintln!("💾 Report written to: {}", path.display());
        }
    }

    eprintln!();
    if dry_run {
        eprintln!("✅ Converted {} settings (dry run, nothing stored)", outputs.len());
    } else {
        let mut store = open_store(store_dir);
        let saved = pipeline.persist(&outputs, &mut store)?;
        eprintln!(
            "✅ Converted {} settings, stored {} assets in {}",
            outputs.len(),
            saved,
            store.dir().display()
        );
    }
    if problems > 0 {
        eprintln!("⚠️  {} warnings or errors logged", problems);
    }

    Ok(())
}

fn cmd_codegen(config_path: &Path, out: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Loading configuration: {}", config_path.display());
    let config = ConverterConfig::from_file(config_path)?;
    let out_dir = out.map(Path::to_path_buf).unwrap_or_else(|| config.output_dir.clone());

    let mut pipeline = Pipeline::new(config);
    let sources = pipeline.generate_all()?;

    fs::create_dir_all(&out_dir)?;
    for source in &sources {
        let path = out_dir.join(&source.file_name);
        if source.text.is_empty() {
            eprintln!("⚠️  {} is empty (template missing?)", source.file_name);
        }
        fs::write(&path, &source.text)?;
        eprintln!("   {}", path.display());
    }

    eprintln!("✅ Generated {} source files in {}", sources.len(), out_dir.display());
    Ok(())
}

fn cmd_show(
    input: &Path,
    config_path: Option<&Path>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing sheet: {}", input.display());

    let sheet = parse_file_auto(input)?;
    eprintln!("   Encoding: {}", sheet.encoding);
    eprintln!(
        "   Delimiter: '{}'",
        match sheet.delimiter {
            '\t' => "\\t".to_string(),
            c => c.to_string(),
        }
    );
    eprintln!(
        "   Size: {} rows x {} columns",
        sheet.grid.row_count(),
        sheet.grid.column_count()
    );

    let registry = match config_path {
        Some(p) => ConverterConfig::from_file(p)?.type_registry(),
        None => ConverterConfig::default().type_registry(),
    };

    eprintln!("\n📋 Fields:");
    for field in derive_schema(&sheet.grid, &registry) {
        let marker = if field.is_valid { "✓" } else { "✗" };
        let array = if field.is_array_element { " (array element)" } else { "" };
        eprintln!("   {} {:<24} {}{}", marker, field.name, field.declared_type, array);
    }
    eprintln!();

    write_output(&sheet.grid.to_delimited_string(), output)?;
    Ok(())
}

fn cmd_settings(action: SettingsAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SettingsAction::Example { output } => {
            let json = example_config().to_json()?;
            write_output(&json, output.as_deref())?;
        }

        SettingsAction::Check { config } => {
            let loaded = ConverterConfig::from_file(&config)?;
            eprintln!("📋 {} settings in {}:\n", loaded.settings.len(), config.display());
            for setting in &loaded.settings {
                let kind = match setting.output {
                    OutputKind::Enum => "enum".to_string(),
                    OutputKind::Class => "class".to_string(),
                    OutputKind::Table => format!("table ({})", setting.table_class_name()),
                };
                let source = setting
                    .source
                    .as_ref()
                    .map(|s| s.path().display().to_string())
                    .unwrap_or_else(|| "no source".to_string());
                eprintln!("   {:<20} {:<28} {}", setting.class_name, kind, source);
                if let Some(join) = &setting.join {
                    eprintln!(
                        "      join {}.{} -> {}.{} via {}",
                        setting.class_name,
                        join.local_key_field,
                        join.target_table,
                        join.target_list_field,
                        join.target_find_method
                    );
                }
            }
            eprintln!("\n✅ Configuration is valid");
        }
    }
    Ok(())
}

fn cmd_assets(store_dir: Option<&Path>, action: AssetAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = open_store(store_dir);

    match action {
        AssetAction::List => {
            let assets = store.list();
            if assets.is_empty() {
                eprintln!("📋 No assets stored yet.");
                eprintln!("   Use 'sheetforge convert' to create some.");
                return Ok(());
            }

            eprintln!("📋 Stored assets ({}):\n", assets.len());
            for asset in assets {
                eprintln!(
                    "   {:<32} {:?} {} ({} records, {})",
                    asset.name,
                    asset.kind,
                    asset.class_name,
                    asset.records.len(),
                    asset.saved_at
                );
            }
        }

        AssetAction::Show { name } => {
            let asset = store.load(&name)?;
            println!("{}", serde_json::to_string_pretty(asset)?);
        }

        AssetAction::Delete { name } => {
            store.delete(&name)?;
            eprintln!("🗑️  Deleted asset: {}", name);
        }
    }
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
