use clap::{Parser, Subcommand, ValueEnum};
use metrology_core::*;
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "qty")]
#[command(about = "Physical quantities with units and uncertainties", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a quantity into another unit
    Convert {
        #[arg(allow_negative_numbers = true)]
        value: f64,

        /// Source unit, e.g. "km hr^-1"
        from: String,

        /// Target unit, e.g. "m s^-1"
        to: String,

        /// Uncertainty of the value
        #[arg(long, short, default_value_t = 0.0)]
        error: f64,

        /// Read the uncertainty as a fraction of the value
        #[arg(long)]
        relative: bool,

        /// Print without PDG rounding
        #[arg(long)]
        raw: bool,
    },

    /// Show a unit in base units with its conversion factor
    Expand {
        /// Unit to expand, e.g. "kW hr"
        unit: String,
    },

    /// List registered units (or prefixes)
    Units {
        /// List prefixes instead of units
        #[arg(long)]
        prefixes: bool,
    },

    /// Round a value and its uncertainty by the PDG rule
    Round {
        #[arg(allow_negative_numbers = true)]
        value: f64,

        error: f64,

        /// Unit of the value
        #[arg(long, short, default_value = "1")]
        unit: String,

        /// Significant digits to keep in the uncertainty
        #[arg(long)]
        digits: Option<u32>,

        /// Decimal place to round at (e.g. -2 for hundredths)
        #[arg(long, allow_negative_numbers = true)]
        place: Option<i32>,
    },

    /// Compare two quantities at a confidence level
    Compare {
        op: Comparison,

        #[arg(allow_negative_numbers = true)]
        x: f64,

        #[arg(allow_negative_numbers = true)]
        y: f64,

        #[arg(long, default_value_t = 0.0)]
        x_error: f64,

        #[arg(long, default_value_t = 0.0)]
        y_error: f64,

        /// Unit of x
        #[arg(long, default_value = "1")]
        x_unit: String,

        /// Unit of y (defaults to the unit of x)
        #[arg(long)]
        y_unit: Option<String>,

        /// Confidence level in (0, 1); overrides the config file
        #[arg(long)]
        confidence: Option<f64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

fn main() -> Result<()> {
    // Initialize logging
    metrology_core::logging::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Load catalog with the user's custom units
    let mut catalog = build_default_catalog()?;
    config.apply_to(&mut catalog)?;
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Unit catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::Config("Invalid unit catalog".into()));
    }

    match cli.command {
        Commands::Convert {
            value,
            from,
            to,
            error,
            relative,
            raw,
        } => cmd_convert(
            &catalog,
            &config,
            cli.json,
            value,
            error,
            relative,
            &from,
            &to,
            raw,
        ),
        Commands::Expand { unit } => cmd_expand(&catalog, cli.json, &unit),
        Commands::Units { prefixes } => cmd_units(&catalog, cli.json, prefixes),
        Commands::Round {
            value,
            error,
            unit,
            digits,
            place,
        } => cmd_round(cli.json, value, error, &unit, digits, place),
        Commands::Compare {
            op,
            x,
            y,
            x_error,
            y_error,
            x_unit,
            y_unit,
            confidence,
        } => {
            let x = Quantity::new(x, x_error, x_unit.parse()?)?;
            let y_unit = y_unit.as_deref().unwrap_or(&x_unit);
            let y = Quantity::new(y, y_error, y_unit.parse()?)?;
            let confidence = confidence.unwrap_or(config.comparison.confidence);
            cmd_compare(&catalog, cli.json, op, &x, &y, confidence)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_convert(
    catalog: &UnitCatalog,
    config: &Config,
    as_json: bool,
    value: f64,
    error: f64,
    relative: bool,
    from: &str,
    to: &str,
    raw: bool,
) -> Result<()> {
    let from: Unit = from.parse()?;
    let to: Unit = to.parse()?;
    let quantity = if relative {
        Quantity::with_relative_error(value, error, from)?
    } else {
        Quantity::new(value, error, from)?
    };

    let converted = catalog.convert(&quantity, &to)?;
    tracing::debug!("{} -> {}", quantity, converted);

    if as_json {
        println!(
            "{}",
            json!({
                "value": converted.value(),
                "error": converted.absolute_error(),
                "unit": converted.unit().to_string(),
                "factors": converted.unit(),
            })
        );
    } else if config.rounding.pdg && !raw && converted.has_error() {
        println!("{}", round_to_pdg(&converted, None, None)?);
    } else {
        println!("{}", converted);
    }
    Ok(())
}

fn cmd_expand(catalog: &UnitCatalog, as_json: bool, unit: &str) -> Result<()> {
    let unit: Unit = unit.parse()?;
    let expansion = catalog.expand(&unit)?;
    let factor = expansion.factor_f64()?;

    if as_json {
        println!(
            "{}",
            json!({
                "unit": unit.to_string(),
                "base": expansion.base.to_string(),
                "factor": factor,
                "exact_factor": expansion.factor.to_string(),
            })
        );
    } else {
        println!("1 {} = {} {}", unit, factor, expansion.base);
        println!("  exact factor: {}", expansion.factor);
    }
    Ok(())
}

fn cmd_units(catalog: &UnitCatalog, as_json: bool, prefixes: bool) -> Result<()> {
    if prefixes {
        let mut entries: Vec<&PrefixEntry> = catalog.prefixes().iter().collect();
        entries.sort_by_key(|p| (p.base, std::cmp::Reverse(p.power)));

        if as_json {
            let listing: Vec<_> = entries
                .iter()
                .map(|p| {
                    json!({
                        "name": p.name,
                        "base": p.base,
                        "power": p.power,
                        "abbreviation": p.abbreviation,
                    })
                })
                .collect();
            println!("{}", json!(listing));
        } else {
            for p in entries {
                let abbreviation = p.abbreviation.as_deref().unwrap_or("-");
                println!("{:<8} {:<4} {}^{}", p.name, abbreviation, p.base, p.power);
            }
        }
        return Ok(());
    }

    let names = catalog.canonical_names();
    if as_json {
        let listing: Vec<_> = names
            .iter()
            .map(|name| {
                json!({
                    "name": name,
                    "aliases": catalog.aliases_of(name),
                    "abbreviations": catalog.abbreviations_of(name),
                    "base": matches!(catalog.definition(name), Ok(UnitDefinition::Base)),
                })
            })
            .collect();
        println!("{}", json!(listing));
    } else {
        for name in names {
            let mut other_names = catalog.abbreviations_of(name);
            other_names.extend(catalog.aliases_of(name));
            if other_names.is_empty() {
                println!("{}", name);
            } else {
                println!("{} ({})", name, other_names.join(", "));
            }
        }
    }
    Ok(())
}

fn cmd_round(
    as_json: bool,
    value: f64,
    error: f64,
    unit: &str,
    digits: Option<u32>,
    place: Option<i32>,
) -> Result<()> {
    let quantity = Quantity::new(value, error, unit.parse()?)?;
    let rounded = round_to_pdg(&quantity, digits, place)?;

    if as_json {
        println!(
            "{}",
            json!({
                "value": rounded.quantity.value(),
                "error": rounded.quantity.absolute_error(),
                "unit": rounded.quantity.unit().to_string(),
                "digits": rounded.digits,
                "place": rounded.place,
                "display": rounded.to_string(),
            })
        );
    } else {
        println!("{}", rounded);
    }
    Ok(())
}

fn cmd_compare(
    catalog: &UnitCatalog,
    as_json: bool,
    op: Comparison,
    x: &Quantity,
    y: &Quantity,
    confidence: f64,
) -> Result<()> {
    let eval = Evaluator::new(catalog).with_confidence(confidence)?;
    let holds = match op {
        Comparison::Eq => eval.eq(x, y)?,
        Comparison::Ne => eval.ne(x, y)?,
        Comparison::Lt => eval.lt(x, y)?,
        Comparison::Le => eval.le(x, y)?,
        Comparison::Gt => eval.gt(x, y)?,
        Comparison::Ge => eval.ge(x, y)?,
    };

    if as_json {
        println!(
            "{}",
            json!({
                "result": holds,
                "confidence": confidence,
            })
        );
    } else {
        println!("{}", holds);
    }
    Ok(())
}
