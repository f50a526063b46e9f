use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use result_sheet::analyzer::{rank_fields, AVERAGE};
use result_sheet::models::{Config, LevelSelection, StatValue};
use result_sheet::pipeline::{self, BatchAnalysis};
use result_sheet::report::{write_tables, CsvSink};
use result_sheet::telemetry::init_tracing;
use result_sheet::{read_bulletin, ResultSheetError};
use std::path::Path;
use tracing::Level;

fn cli() -> Command {
    Command::new("result-sheet")
        .version(result_sheet::VERSION)
        .about("Turns a board result bulletin into ranked student and subject tables")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .help("Result bulletin text file"),
        )
        .arg(
            Arg::new("sample")
                .short('s')
                .long("sample")
                .value_name("TEXT")
                .help("A student line copied from the bulletin"),
        )
        .arg(
            Arg::new("level")
                .short('l')
                .long("level")
                .value_parser(["auto", "lower", "upper"])
                .help("Examination level (auto infers it from the sample)"),
        )
        .arg(
            Arg::new("subjects")
                .long("subjects")
                .value_name("COUNT")
                .value_parser(clap::value_parser!(usize))
                .help("Minimum subjects a record must carry"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .help("Output directory"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Log every rejected record"),
        )
}

fn main() -> Result<()> {
    let matches = cli().get_matches();

    init_tracing(if matches.get_flag("verbose") {
        Level::DEBUG
    } else {
        Level::WARN
    });

    let config_file = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("config.toml");
    let has_input = matches.contains_id("input");

    // Load or create configuration
    let mut config = if Path::new(config_file).exists() {
        println!("📋 Loading configuration from: {}", config_file);
        Config::load_from_file(config_file)
            .with_context(|| format!("Failed to read configuration: {}", config_file))?
    } else if has_input {
        Config::default()
    } else {
        println!("📝 Creating default configuration file: {}", config_file);
        Config::default().save_to_file(config_file)?;
        println!(
            "⚠️  Please edit {} and set the input file and a sample line, then run the program again.",
            config_file
        );
        return Ok(());
    };

    // Command line wins over the file
    if let Some(input) = matches.get_one::<String>("input") {
        config.input_file = Some(input.clone());
    }
    if let Some(sample) = matches.get_one::<String>("sample") {
        config.sample_line = sample.clone();
    }
    if let Some(level) = matches.get_one::<String>("level") {
        config.level = match level.as_str() {
            "lower" => LevelSelection::Lower,
            "upper" => LevelSelection::Upper,
            _ => LevelSelection::Auto,
        };
    }
    if let Some(count) = matches.get_one::<usize>("subjects") {
        config.subject_count = Some(*count);
    }
    if let Some(output) = matches.get_one::<String>("output") {
        config.output_directory = Some(output.clone());
    }

    let input = config
        .input_file
        .clone()
        .context("No input file configured; pass --input or set input_file")?;
    let output_dir = config.output_directory.as_deref().unwrap_or("output");
    let stem = config.output_name.as_deref().unwrap_or("results");

    println!("📄 Reading bulletin: {}", input);
    let text = read_bulletin(Path::new(&input))
        .with_context(|| format!("Failed to read bulletin: {}", input))?;

    let analysis = match pipeline::run(&config, &text) {
        Ok(analysis) => analysis,
        Err(ResultSheetError::ConfigurationMismatch(mismatch)) => {
            println!("❌ Please use the correct file and sample for {}.", mismatch.level);
            print!("{}", mismatch);
            anyhow::bail!("subject codes do not match {}", mismatch.level);
        }
        Err(err) => return Err(err.into()),
    };
    println!("✅ File and sample validated for {}", analysis.config.level);

    let mut sink = CsvSink::new(Path::new(output_dir), stem)
        .with_context(|| format!("Failed to prepare output directory: {}", output_dir))?;
    write_tables(&mut sink, analysis.config.level, &analysis.batch)?;

    print_summary(&analysis);
    for path in sink.written() {
        println!("📂 Wrote {}", path.display());
    }

    Ok(())
}

fn print_summary(analysis: &BatchAnalysis) {
    let report = &analysis.report;
    let batch = &analysis.batch;

    println!("\n📊 SUMMARY");
    println!("==========\n");
    println!("   Level: {}", analysis.config.level);
    println!("   Students parsed: {}", report.accepted);
    if report.rejected() > 0 {
        println!("   ⚠️  Record windows rejected: {}", report.rejected());
    }

    if batch.records.is_empty() {
        println!("   ❓ No student records found");
        return;
    }

    let field = rank_fields(analysis.config.level)[0];
    let mut toppers: Vec<_> = batch
        .records
        .iter()
        .filter(|r| r.rank_of(field) == Some(1))
        .collect();
    toppers.sort_by(|a, b| a.record.roll_no.cmp(&b.record.roll_no));
    println!("\n🏆 Top of the batch:");
    for topper in toppers {
        println!(
            "   {} {} - {:.2}%",
            topper.record.roll_no,
            topper.record.name,
            topper.value_of(field).unwrap_or(0.0)
        );
    }

    if let Some(averages) = batch.summary.iter().find(|row| row.statistic == AVERAGE) {
        println!("\n📈 Subject averages:");
        for (label, value) in &averages.values {
            if let StatValue::Value(avg) = value {
                println!("   {}: {:.2}", label, avg);
            }
        }
    }
}
