use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use flatware::{analyze_schema, ir_to_json, parse_schema, tokenize_schema, SchemaError, SchemaTree};

#[derive(Parser)]
#[command(name = "flatware")]
#[command(about = "Check FlatBuffers schemas and dump their validated IR", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and analyze a `.fbs` schema, reporting the first error
    Check {
        /// Input `.fbs` file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Emit the validated IR as JSON (to stdout, or to a file)
    Json {
        /// Input `.fbs` file
        #[arg(short, long)]
        input: PathBuf,

        /// Output `.json` file (if omitted, prints to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Loads a schema file and, recursively, everything it includes. Include
/// paths are resolved relative to the including file; a file pulled in
/// twice is only loaded once.
fn load_schema_tree(path: &Path, visited: &mut HashSet<PathBuf>) -> Result<SchemaTree, SchemaError> {
    let canonical = path.canonicalize().map_err(SchemaError::Io)?;
    visited.insert(canonical.clone());

    let text = fs::read_to_string(path).map_err(SchemaError::Io)?;
    let tokens = tokenize_schema(&text)?;
    let schema = parse_schema(&tokens)?;

    let directory = canonical.parent().map(Path::to_path_buf).unwrap_or_default();
    let mut includes = Vec::new();
    for include in &schema.includes {
        let target = directory.join(&include.path);
        let target_canonical = target.canonicalize().map_err(SchemaError::Io)?;
        if visited.contains(&target_canonical) {
            continue;
        }
        includes.push(load_schema_tree(&target, visited)?);
    }

    Ok(SchemaTree::with_includes(schema, includes))
}

fn main() -> Result<(), SchemaError> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Check { input } => {
            let tree = load_schema_tree(input, &mut HashSet::new())?;
            let validated = analyze_schema(&tree)?;
            println!(
                "{}: {} enums, {} structs, {} tables, {} unions",
                input.display(),
                validated.enums.len(),
                validated.structs.len(),
                validated.tables.len(),
                validated.unions.len(),
            );
            Ok(())
        }

        Commands::Json { input, output } => {
            let tree = load_schema_tree(input, &mut HashSet::new())?;
            let validated = analyze_schema(&tree)?;
            let json = ir_to_json(&validated);
            if let Some(output) = output {
                fs::write(output, &json).map_err(SchemaError::Io)?;
                println!("Wrote {}", output.display());
            } else {
                println!("{}", json);
            }
            Ok(())
        }
    }
}
