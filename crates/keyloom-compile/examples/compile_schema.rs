use std::env;
use std::path::PathBuf;

use keyloom_compile::{compile_json, ValidationReport};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = env::args().skip(1);
    let mut definition_path: Option<PathBuf> = None;
    let mut out_path: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--out" => out_path = args.next().map(PathBuf::from),
            _ => {
                if definition_path.is_none() {
                    definition_path = Some(PathBuf::from(arg));
                } else {
                    return Err("unexpected argument".into());
                }
            }
        }
    }

    let definition_path = definition_path.ok_or("missing definition path")?;
    let contents = std::fs::read_to_string(&definition_path)?;
    let definition_json: serde_json::Value = serde_json::from_str(&contents)?;

    let compiled = match compile_json(&definition_json) {
        Ok(compiled) => compiled,
        Err(report) => {
            eprintln!("schema compilation failed");
            print_report(&report);
            std::process::exit(1);
        }
    };

    let artifact = serde_json::to_string_pretty(&compiled)?;
    match out_path {
        Some(out_path) => {
            std::fs::write(&out_path, artifact)?;
            println!("descriptor written to {}", out_path.display());
        }
        None => println!("{artifact}"),
    }

    Ok(())
}

fn print_report(report: &ValidationReport) {
    for issue in &report.errors {
        eprintln!("error {} {}: {}", issue.code, issue.path, issue.message);
        if let Some(hint) = &issue.hint {
            eprintln!("  hint: {hint}");
        }
    }
    for issue in &report.warnings {
        eprintln!("warning {} {}: {}", issue.code, issue.path, issue.message);
        if let Some(hint) = &issue.hint {
            eprintln!("  hint: {hint}");
        }
    }
}
