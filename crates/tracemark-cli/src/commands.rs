use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::Colorize;
use tracing::debug;
use tracemark_attribution::{
    ArtifactReference, AttributionConfig, AttributionResult, CarrierType, Issued,
    IssuanceRecord, LeakAttributionService, Requester, TrackingCode,
};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref(), cli.ledger)?;
    let service = LeakAttributionService::open(&config)
        .with_context(|| format!("opening ledger {}", config.ledger_path.display()))?;
    let json = matches!(cli.format, OutputFormat::Json);

    match cli.command {
        Command::Issue(args) => cmd_issue(&service, args, json),
        Command::Verify(args) => cmd_verify(&service, args, json),
        Command::List(args) => cmd_list(&service, args, json),
        Command::Show(args) => cmd_show(&service, args, json),
    }
}

fn load_config(path: Option<&Path>, ledger: Option<PathBuf>) -> anyhow::Result<AttributionConfig> {
    let mut config = match path {
        Some(path) => AttributionConfig::load(path)?,
        None => AttributionConfig::default(),
    };
    if let Some(ledger) = ledger {
        config.ledger_path = ledger;
    }
    debug!(ledger = %config.ledger_path.display(), scheme = ?config.json_scheme, "configuration loaded");
    Ok(config)
}

fn declared_type(carrier: Option<CarrierArg>, input: &Path) -> CarrierType {
    match carrier {
        Some(arg) => arg.into(),
        None => CarrierType::from_filename(&file_name_of(input)),
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `<dir>/<stem>-<CODE>.<ext>` next to the input.
fn default_output(input: &Path, issued: &Issued) -> PathBuf {
    let delivered = issued.file_name(&file_name_of(input));
    let delivered = Path::new(&delivered);
    let stem = delivered
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match delivered.extension() {
        Some(ext) => format!("{stem}-{}.{}", issued.record.tracking_code, ext.to_string_lossy()),
        None => format!("{stem}-{}", issued.record.tracking_code),
    };
    input.with_file_name(name)
}

fn cmd_issue(service: &LeakAttributionService, args: IssueArgs, json: bool) -> anyhow::Result<()> {
    let content = fs::read(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let carrier = declared_type(args.carrier, &args.input);

    let mut requester = Requester::new(args.user);
    if let Some(name) = args.name {
        requester = requester.with_display_name(name);
    }
    let file = args.file.unwrap_or_else(|| file_name_of(&args.input));
    let artifact = ArtifactReference::new(args.post, file, args.artifact_version);

    let issued = service.issue(&content, carrier, &requester, &artifact)?;
    let output = args
        .output
        .unwrap_or_else(|| default_output(&args.input, &issued));
    fs::write(&output, &issued.content)
        .with_context(|| format!("writing {}", output.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&issued.record)?);
        return Ok(());
    }
    println!(
        "{} Issued {} to {}",
        "✓".green().bold(),
        issued.record.tracking_code.to_string().yellow().bold(),
        requester.to_string().bold()
    );
    println!("  Artifact: {}", artifact);
    println!("  Codec: {}", issued.record.codec.to_string().cyan());
    println!("  Output: {}", output.display());
    if !issued.record.codec.embeds_code() {
        println!("  {} no watermark embedded for this file type", "warning:".yellow());
    }
    Ok(())
}

fn cmd_verify(service: &LeakAttributionService, args: VerifyArgs, json: bool) -> anyhow::Result<()> {
    let content = fs::read(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let result = service.verify(&content, declared_type(args.carrier, &args.input))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    match result {
        AttributionResult::Attributed { record, recovered_by } => {
            println!("{} Leak attributed via {}", "✓".green().bold(), recovered_by.to_string().cyan());
            print_record(&record);
        }
        AttributionResult::OrphanCode { code, recovered_by } => {
            println!(
                "{} Code {} recovered via {} but never issued here",
                "!".red().bold(),
                code.to_string().yellow(),
                recovered_by.to_string().cyan()
            );
        }
        AttributionResult::NoWatermarkFound => println!("No watermark found."),
        AttributionResult::UnsupportedFormat => {
            println!("{} has no watermark scheme.", file_name_of(&args.input).bold())
        }
    }
    Ok(())
}

fn cmd_list(service: &LeakAttributionService, args: ListArgs, json: bool) -> anyhow::Result<()> {
    let records = match (args.file, args.artifact_version) {
        (Some(file), Some(version)) => {
            let artifact = ArtifactReference::new(args.post, file, version);
            service.list_issuances(&artifact, args.limit)?
        }
        _ => service.list_post_issuances(&args.post, args.limit)?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("No issuances.");
        return Ok(());
    }
    for record in &records {
        println!(
            "{}  {}  {}  {}",
            record.tracking_code.to_string().yellow(),
            record.issued_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
            record.requester.to_string().bold(),
            record.artifact
        );
    }
    Ok(())
}

fn cmd_show(service: &LeakAttributionService, args: ShowArgs, json: bool) -> anyhow::Result<()> {
    let code = TrackingCode::parse(args.code.trim())
        .with_context(|| format!("invalid tracking code {:?}", args.code))?;
    let record = service.show(&code)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }
    match record {
        Some(record) => print_record(&record),
        None => println!("No issuance for {}.", code.to_string().yellow()),
    }
    Ok(())
}

fn print_record(record: &IssuanceRecord) {
    println!("  Code: {}", record.tracking_code.to_string().yellow().bold());
    println!("  Requester: {}", record.requester.to_string().bold());
    println!("  Post: {}", record.artifact.post);
    println!("  File: {}", record.artifact.file_name);
    println!("  Version: {}", record.artifact.version);
    println!("  Issued: {}", record.issued_at.to_rfc3339());
    println!("  Codec: {}", record.codec);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn run(ledger: &Path, args: &[&str]) -> anyhow::Result<()> {
        let mut argv = vec!["tracemark", "--ledger"];
        let ledger = ledger.to_str().unwrap();
        argv.push(ledger);
        argv.extend_from_slice(args);
        run_command(Cli::try_parse_from(argv)?)
    }

    #[test]
    fn config_file_and_ledger_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracemark.toml");
        fs::write(&path, "max_code_attempts = 4\nledger_path = \"a.log\"\n").unwrap();

        let config = load_config(Some(&path), Some(PathBuf::from("b.log"))).unwrap();
        assert_eq!(config.max_code_attempts, 4);
        assert_eq!(config.ledger_path, PathBuf::from("b.log"));
        assert_eq!(load_config(None, None).unwrap(), AttributionConfig::default());
    }

    #[test]
    fn declared_type_prefers_explicit_flag() {
        assert_eq!(declared_type(None, Path::new("a/card.PNG")), CarrierType::Image);
        assert_eq!(declared_type(None, Path::new("notes.txt")), CarrierType::Unsupported);
        assert_eq!(
            declared_type(Some(CarrierArg::Json), Path::new("notes.txt")),
            CarrierType::Json
        );
    }

    #[test]
    fn issue_verify_list_show_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = dir.path().join("issued.log");
        let input = dir.path().join("preset.json");
        fs::write(&input, "{\"data\":{\"name\":\"Preset\"}}").unwrap();

        run(&ledger, &["issue", input.to_str().unwrap(), "-u", "U1", "-p", "WinterEvent"]).unwrap();

        let service = LeakAttributionService::open(&load_config(None, Some(ledger.clone())).unwrap()).unwrap();
        let records = service.list_post_issuances("WinterEvent", 10).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.artifact.file_name, "preset.json");
        assert_eq!(record.artifact.version, "v1");
        drop(service);

        let output = dir
            .path()
            .join(format!("preset-{}.json", record.tracking_code));
        assert!(output.exists());

        run(&ledger, &["verify", output.to_str().unwrap()]).unwrap();
        run(&ledger, &["--format", "json", "list", "-p", "WinterEvent"]).unwrap();
        run(&ledger, &["show", record.tracking_code.as_str()]).unwrap();
        assert!(run(&ledger, &["show", "not-a-code"]).is_err());
    }
}
