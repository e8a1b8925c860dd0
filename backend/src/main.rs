//! happydash CLI - build and query the World Happiness Report dataset
//!
//! # Main Commands
//!
//! ```bash
//! happydash build                      # Raw yearly CSVs -> data/processed/summary_df.csv
//! happydash serve                      # Start HTTP view server (port 8050)
//! happydash query averages --years 2015,2019
//! happydash schema list                # Manage stored year schemas
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! happydash headers data/raw/2017.csv  # Raw vs normalized headers
//! happydash reconcile data/raw/2018.csv --year 2018 --aux data/raw/2018_dystopia.csv
//! happydash validate summary_df.csv    # Check an existing canonical table
//! happydash features                   # Feature keys and labels
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use happydash::{
    build_dataset, normalize_headers, read_csv_file, reconcile_year, validate_records, AuxJoinPolicy,
    AuxiliaryLookup, BuildConfig, CanonicalTable, CountryAliases, Selection, SchemaCatalog, SchemaRegistry,
    ServerConfig, ViewResponse, YearSchema,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "happydash")]
#[command(about = "Reconcile World Happiness Report releases and serve dashboard views", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the canonical table from raw yearly files
    Build(BuildArgs),

    /// Show raw and normalized headers of a raw file
    Headers {
        /// Raw CSV file
        input: PathBuf,
    },

    /// Reconcile a single year and print it as JSON
    Reconcile {
        /// Raw CSV file
        input: PathBuf,

        /// Release year of the file
        #[arg(short, long)]
        year: i32,

        /// Auxiliary dystopia lookup (late-shape years)
        #[arg(long)]
        aux: Option<PathBuf>,

        /// fail-fast | left-join-null | inner-join-drop
        #[arg(long, default_value = "fail-fast")]
        aux_policy: AuxJoinPolicy,

        /// Stored schema directory
        #[arg(long)]
        schema_dir: Option<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate an existing canonical CSV
    Validate {
        /// Canonical CSV file
        input: PathBuf,
    },

    /// Compute a view over the canonical table
    Query {
        view: ViewKind,

        /// Canonical CSV file
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Countries, comma-separated (default: all)
        #[arg(short, long)]
        countries: Option<String>,

        /// Feature keys or labels, comma-separated (default: the seven factors)
        #[arg(short, long)]
        features: Option<String>,

        /// Years, comma-separated, collapsed to min/max (default: all)
        #[arg(short, long)]
        years: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List feature keys and display names
    Features,

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Canonical CSV to serve
        #[arg(short, long)]
        data: Option<PathBuf>,
    },

    /// Manage stored year schemas
    Schema {
        #[command(subcommand)]
        action: SchemaAction,
    },
}

/// Flags override `HAPPYDASH_*` environment values.
#[derive(Args)]
struct BuildArgs {
    /// Directory holding the raw yearly files
    #[arg(long)]
    raw_dir: Option<PathBuf>,

    /// Canonical CSV to write
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Years to include, comma-separated
    #[arg(long)]
    years: Option<String>,

    /// Source file name pattern ({year} is substituted)
    #[arg(long)]
    source_pattern: Option<String>,

    /// Auxiliary dystopia file name pattern ({year} is substituted)
    #[arg(long)]
    aux_pattern: Option<String>,

    /// Two-column (country, code) lookup
    #[arg(long)]
    country_codes: Option<PathBuf>,

    /// Two-column (variant, canonical) alias lookup
    #[arg(long)]
    aliases: Option<PathBuf>,

    /// fail-fast | left-join-null | inner-join-drop
    #[arg(long)]
    aux_policy: Option<AuxJoinPolicy>,

    /// Stored schema directory
    #[arg(long)]
    schema_dir: Option<PathBuf>,

    /// Also write the build report as JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ViewKind {
    Filter,
    Averages,
    Timeseries,
    Facets,
    Map,
}

#[derive(Subcommand)]
enum SchemaAction {
    /// List all stored schemas
    List,

    /// Show details of a stored schema
    Show {
        /// Schema ID
        id: String,
    },

    /// Print the built-in schema of a year
    Builtin {
        year: i32,
    },

    /// Import a year schema JSON file
    Import {
        /// Schema JSON file to import
        file: PathBuf,
        /// Name for the schema
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Delete a stored schema
    Delete {
        /// Schema ID
        id: String,
    },
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build(args) => cmd_build(args),

        Commands::Headers { input } => cmd_headers(&input),

        Commands::Reconcile {
            input,
            year,
            aux,
            aux_policy,
            schema_dir,
            output,
        } => cmd_reconcile(&input, year, aux.as_deref(), aux_policy, schema_dir, output.as_deref()),

        Commands::Validate { input } => cmd_validate(&input),

        Commands::Query {
            view,
            data,
            countries,
            features,
            years,
            output,
        } => cmd_query(
            view,
            data,
            countries.as_deref(),
            features.as_deref(),
            years.as_deref(),
            output.as_deref(),
        ),

        Commands::Features => cmd_features(),

        Commands::Serve { port, data } => cmd_serve(port, data).await,

        Commands::Schema { action } => cmd_schema(action),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_build(args: BuildArgs) -> CliResult {
    let mut config = BuildConfig::from_env()?;
    if let Some(v) = args.raw_dir {
        config.raw_dir = v;
    }
    if let Some(v) = args.output {
        config.output = v;
    }
    if let Some(v) = args.years {
        config.set_years("--years", &v)?;
    }
    if let Some(v) = args.source_pattern {
        config.set_source_pattern("--source-pattern", v)?;
    }
    if let Some(v) = args.aux_pattern {
        config.set_auxiliary_pattern("--aux-pattern", v)?;
    }
    if args.country_codes.is_some() {
        config.country_codes = args.country_codes;
    }
    if args.aliases.is_some() {
        config.aliases = args.aliases;
    }
    if let Some(v) = args.aux_policy {
        config.aux_policy = v;
    }
    if let Some(v) = args.schema_dir {
        config.schema_dir = v;
    }

    let catalog = SchemaCatalog::with_registry(SchemaRegistry::with_dir(&config.schema_dir));
    let report = build_dataset(&config, &catalog)?;

    eprintln!("\n📊 Summary");
    for year in &report.years {
        eprintln!(
            "   {}: {} → {} rows ({} columns dropped)",
            year.year,
            year.source_rows,
            year.output_rows,
            year.dropped.len()
        );
    }
    eprintln!("   Total:            {}", report.total_rows);
    eprintln!("   Aliases applied:  {}", report.aliases_applied);
    eprintln!("   Regions filled:   {}", report.regions.filled);
    if !report.regions.unresolved.is_empty() {
        eprintln!("   No region:        {}", report.regions.unresolved.join(", "));
    }
    if !report.missing_country_codes.is_empty() {
        eprintln!("   No country code:  {}", report.missing_country_codes.join(", "));
    }

    if let Some(path) = args.report.as_deref() {
        write_output(&serde_json::to_string_pretty(&report)?, Some(path))?;
    }

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_headers(input: &Path) -> CliResult {
    let table = read_csv_file(input)?;
    eprintln!("📄 {} (encoding {}, separator '{}')", input.display(), table.encoding, format_delimiter(table.delimiter));

    let normalized = normalize_headers(&table.headers);
    for (i, (raw, slug)) in table.headers.iter().zip(&normalized).enumerate() {
        println!("[{:2}] {:<40} {}", i + 1, raw, slug);
    }
    Ok(())
}

fn cmd_reconcile(
    input: &Path,
    year: i32,
    aux: Option<&Path>,
    policy: AuxJoinPolicy,
    schema_dir: Option<PathBuf>,
    output: Option<&Path>,
) -> CliResult {
    let catalog = match schema_dir {
        Some(dir) => SchemaCatalog::with_registry(SchemaRegistry::with_dir(dir)),
        None => SchemaCatalog::with_registry(SchemaRegistry::new()),
    };
    let schema: YearSchema = catalog.resolve(year)?;
    let aliases = CountryAliases::default();

    let raw = read_csv_file(input)?;
    let lookup = match aux {
        Some(path) => Some(AuxiliaryLookup::from_raw(year, &read_csv_file(path)?, &aliases)?),
        None => None,
    };

    let table = reconcile_year(&raw, &schema, lookup.as_ref(), &aliases, policy)?;
    for dropped in &table.dropped {
        eprintln!("   dropped {:<32} ({:?})", dropped.column, dropped.reason);
    }

    let rows: Vec<Value> = table
        .rows
        .iter()
        .map(|row| {
            let object: Map<String, Value> = table
                .headers
                .iter()
                .cloned()
                .zip(row.iter().cloned().map(Value::String))
                .collect();
            Value::Object(object)
        })
        .collect();
    write_output(&serde_json::to_string_pretty(&rows)?, output)
}

fn cmd_validate(input: &Path) -> CliResult {
    eprintln!("✔️  Validating: {}", input.display());

    let table = CanonicalTable::load(input)?;
    validate_records(table.records())?;

    eprintln!("✅ All {} records valid ({} countries, years {:?})", table.len(), table.countries().len(), table.years());
    Ok(())
}

fn cmd_query(
    view: ViewKind,
    data: Option<PathBuf>,
    countries: Option<&str>,
    features: Option<&str>,
    years: Option<&str>,
    output: Option<&Path>,
) -> CliResult {
    let data = match data {
        Some(path) => path,
        None => ServerConfig::from_env()?.data,
    };
    let table = CanonicalTable::load(&data)?;
    let selection = Selection::parse(&table, countries, features, years)?;
    let subset = selection.apply(&table);

    let json = match view {
        ViewKind::Filter => to_json(&ViewResponse::new("filter", &selection, subset.rows))?,
        ViewKind::Averages => to_json(&ViewResponse::new(
            "averages",
            &selection,
            happydash::aggregate_by_country(&subset),
        ))?,
        ViewKind::Timeseries => to_json(&ViewResponse::new(
            "timeseries",
            &selection,
            happydash::time_series(&subset)?,
        ))?,
        ViewKind::Facets => to_json(&ViewResponse::new(
            "facets",
            &selection,
            happydash::reshape_for_facets(&subset, &selection.features)?,
        ))?,
        ViewKind::Map => to_json(&ViewResponse::new("map", &selection, happydash::map_frames(&subset)))?,
    };
    write_output(&json, output)
}

fn cmd_features() -> CliResult {
    for info in happydash::feature_catalog() {
        println!(
            "{:<28} {:<28} {}",
            info.key,
            info.label,
            if info.factor { "factor" } else { "" }
        );
    }
    Ok(())
}

async fn cmd_serve(port: Option<u16>, data: Option<PathBuf>) -> CliResult {
    let mut config = ServerConfig::from_env()?;
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(data) = data {
        config.data = data;
    }
    happydash::server::start_server(config).await?;
    Ok(())
}

fn cmd_schema(action: SchemaAction) -> CliResult {
    let schema_dir = BuildConfig::from_env()?.schema_dir;
    let mut registry = SchemaRegistry::with_dir(&schema_dir);

    match action {
        SchemaAction::List => {
            let schemas = registry.list();
            if schemas.is_empty() {
                eprintln!("📋 No schemas stored in {}.", registry.dir().display());
                eprintln!("   Use 'happydash schema import <file>' to add one.");
                return Ok(());
            }
            eprintln!("📋 Stored schemas:\n");
            for stored in schemas {
                println!(
                    "  {:<32} {}  {:?}  {}",
                    stored.id, stored.year, stored.schema.shape, stored.created_at
                );
            }
        }

        SchemaAction::Show { id } => {
            let stored = registry
                .get(&id)
                .ok_or_else(|| format!("Schema not found: {}", id))?;
            println!("{}", serde_json::to_string_pretty(stored)?);
        }

        SchemaAction::Builtin { year } => {
            let schema = YearSchema::builtin(year).ok_or_else(|| format!("No built-in schema for {}", year))?;
            println!("{}", schema.to_json()?);
        }

        SchemaAction::Import { file, name } => {
            let id = registry.import(&file, name.as_deref())?;
            eprintln!("✅ Imported as: {}", id);
        }

        SchemaAction::Delete { id } => {
            registry.delete(&id)?;
            eprintln!("🗑️  Deleted: {}", id);
        }
    }

    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> CliResult {
    match path {
        Some(p) => {
            if let Some(parent) = p.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
