//! apkpack CLI
//!
//! Resolves which native libraries end up in an Android package when several
//! dependencies ship the same file, and inspects app build scripts.

use anyhow::Result;
use apkpack_android::abi::AbiCoverage;
use apkpack_android::candidates::{discover, DependencySource};
use apkpack_android::gradle::BuildScript;
use apkpack_android::stage::stage_with_progress;
use apkpack_android::{resolve, PackagingOptions, Resolution, Rule, Selection};
use apkpack_cli::output::{format_count, format_size, Printer};
use apkpack_cli::progress;
use apkpack_core::config::{Config, PackagingConfig};
use apkpack_core::error::{exit_codes, Error};
use apkpack_telemetry::{timed, LogFormat, TelemetryConfig};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "apkpack")]
#[command(about = "Resolve duplicate native libraries in Android packages")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover candidates and print the resolved package layout
    Resolve {
        #[command(flatten)]
        packaging: PackagingArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve, then copy the selected files into a staging directory
    Stage {
        #[command(flatten)]
        packaging: PackagingArgs,
        /// Staging directory (defaults to [output].stage_dir)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Summarise an app module build.gradle.kts
    Inspect {
        /// Build script path
        #[arg(default_value = "app/build.gradle.kts")]
        script: PathBuf,
        /// Fail when the script has warnings
        #[arg(long)]
        strict: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show which ABIs each resolved library ships for
    Abis {
        #[command(flatten)]
        packaging: PackagingArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show which packaging rule applies to package paths
    Match {
        /// Paths inside the package, e.g. lib/arm64-v8a/libfoo.so
        #[arg(required = true)]
        paths: Vec<String>,
        #[command(flatten)]
        packaging: PackagingArgs,
    },
}

/// Packaging rules and sources on top of apkpack.toml
#[derive(Args, Debug, Default)]
struct PackagingArgs {
    /// Dependency directory as NAME=DIR, in enumeration order
    #[arg(long = "source", value_name = "NAME=DIR")]
    sources: Vec<String>,

    /// Extra pick-first pattern
    #[arg(long = "pick-first", value_name = "GLOB")]
    pick_firsts: Vec<String>,

    /// Extra exclude pattern
    #[arg(long = "exclude", value_name = "GLOB")]
    excludes: Vec<String>,

    /// Extra merge pattern
    #[arg(long = "merge", value_name = "GLOB")]
    merges: Vec<String>,

    /// Also take packaging rules from a build.gradle.kts
    #[arg(long, value_name = "FILE")]
    gradle: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        owo_colors::set_override(false);
    }

    let format = if cli.log_json { LogFormat::Json } else { LogFormat::Compact };
    apkpack_telemetry::init_with_config(
        TelemetryConfig::from_verbosity(cli.verbose, cli.quiet).with_format(format),
    )?;

    let printer = Printer::new(cli.quiet);

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => std::process::exit(report_error(&printer, false, &e)),
    };

    let exit_code = match cli.command {
        Commands::Resolve { packaging, json } => run_resolve(&packaging, &config, &printer, json),
        Commands::Stage { packaging, out, json } => {
            run_stage(&packaging, out.as_deref(), &config, &printer, json)
        }
        Commands::Inspect { script, strict, json } => run_inspect(&script, strict, &printer, json),
        Commands::Abis { packaging, json } => run_abis(&packaging, &config, &printer, json),
        Commands::Match { paths, packaging } => run_match(&paths, &packaging, &config, &printer),
    };

    std::process::exit(exit_code);
}

/// Print an error and pick the exit code for it
fn report_error(printer: &Printer, json: bool, err: &Error) -> i32 {
    if json {
        match serde_json::to_string_pretty(&err.to_report()) {
            Ok(report) => println!("{}", report),
            Err(_) => printer.error(&err.to_string()),
        }
    } else {
        printer.error(&err.to_string());
    }
    err.code.exit_code()
}

fn print_json<T: serde::Serialize>(printer: &Printer, value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{}", text);
            exit_codes::SUCCESS
        }
        Err(e) => report_error(printer, false, &Error::from(e)),
    }
}

/// Config rules, then build script rules, then command line rules
fn packaging_options(args: &PackagingArgs, config: &Config) -> apkpack_core::Result<PackagingOptions> {
    let mut packaging: PackagingConfig = config.schema.packaging.clone();

    if let Some(script) = &args.gradle {
        let script = BuildScript::load(script)?;
        packaging.pick_firsts.extend(script.packaging.pick_firsts);
        packaging.excludes.extend(script.packaging.excludes);
        packaging.merges.extend(script.packaging.merges);
    }

    packaging.pick_firsts.extend(args.pick_firsts.iter().cloned());
    packaging.excludes.extend(args.excludes.iter().cloned());
    packaging.merges.extend(args.merges.iter().cloned());

    PackagingOptions::from_config(&packaging)
}

/// Config sources first, then `--source` arguments, preserving order
fn dependency_sources(args: &PackagingArgs, config: &Config) -> apkpack_core::Result<Vec<DependencySource>> {
    let base_dir = config.base_dir();
    let mut sources: Vec<DependencySource> = config
        .schema
        .sources
        .iter()
        .map(|source| DependencySource::from_config(source, &base_dir))
        .collect();

    for arg in &args.sources {
        sources.push(DependencySource::parse_arg(arg)?);
    }

    if sources.is_empty() {
        return Err(Error::config_validation("No dependency sources to scan")
            .with_suggestion("Add [[sources]] to apkpack.toml or pass --source NAME=DIR"));
    }

    Ok(sources)
}

fn resolve_packaging(args: &PackagingArgs, config: &Config, printer: &Printer) -> apkpack_core::Result<Resolution> {
    let options = packaging_options(args, config)?;
    let sources = dependency_sources(args, config)?;

    let spinner = progress::scan_spinner("Scanning dependencies...", printer.is_quiet());
    let candidates = timed("discover", || discover(&sources));
    progress::finish(&spinner);
    let candidates = candidates?;

    tracing::info!(
        candidates = candidates.len(),
        sources = sources.len(),
        "resolving packaged libraries"
    );

    timed("resolve", || resolve(&options, candidates)).map_err(Error::from)
}

fn print_resolution(printer: &Printer, resolution: &Resolution) {
    printer.header("Resolved native libraries");
    for (path, selection) in resolution.iter() {
        let note = match selection {
            Selection::Single { .. } => None,
            Selection::PickedFirst { discarded, .. } => Some(format!(
                "(picked first, dropped {})",
                discarded
                    .iter()
                    .map(|c| c.origin.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            Selection::Merged { sources, .. } => Some(format!(
                "(merged {})",
                sources
                    .iter()
                    .map(|c| c.origin.as_str())
                    .collect::<Vec<_>>()
                    .join(" + ")
            )),
        };
        printer.mapping(path, selection.origin(), note.as_deref());
    }

    for candidate in &resolution.excluded {
        printer.info(&format!("excluded {} from {}", candidate.path, candidate.origin));
    }
    for pattern in &resolution.unused_patterns {
        printer.warning(&format!("pattern '{}' matched nothing", pattern));
    }

    printer.success(&format!(
        "{}, {} discarded",
        format_count(resolution.len(), "library", "libraries"),
        format_count(resolution.discarded_count(), "duplicate", "duplicates"),
    ));
}

fn run_resolve(args: &PackagingArgs, config: &Config, printer: &Printer, json: bool) -> i32 {
    match resolve_packaging(args, config, printer) {
        Ok(resolution) if json => print_json(printer, &resolution),
        Ok(resolution) => {
            print_resolution(printer, &resolution);
            exit_codes::SUCCESS
        }
        Err(e) => report_error(printer, json, &e),
    }
}

fn run_stage(args: &PackagingArgs, out: Option<&Path>, config: &Config, printer: &Printer, json: bool) -> i32 {
    let resolution = match resolve_packaging(args, config, printer) {
        Ok(resolution) => resolution,
        Err(e) => return report_error(printer, json, &e),
    };

    let out_dir = match out {
        Some(out) => out.to_path_buf(),
        None => config.base_dir().join(&config.schema.output.stage_dir),
    };

    let bar = progress::staging_bar(resolution.len() as u64, printer.is_quiet() || json);
    let result = timed("stage", || {
        stage_with_progress(&resolution, &out_dir, |path| {
            bar.set_message(path.to_string());
            bar.inc(1);
        })
    });
    progress::finish(&bar);

    match result {
        Ok(report) if json => print_json(printer, &report),
        Ok(report) => {
            printer.success(&format!(
                "Staged {} ({}) into {}",
                format_count(report.files, "file", "files"),
                format_size(report.bytes),
                report.out_dir.display()
            ));
            exit_codes::SUCCESS
        }
        Err(e) => report_error(printer, json, &e),
    }
}

fn run_inspect(script: &Path, strict: bool, printer: &Printer, json: bool) -> i32 {
    let build_script = match BuildScript::load(script) {
        Ok(build_script) => build_script,
        Err(e) => return report_error(printer, json, &e),
    };
    let warnings = build_script.warnings();

    if json {
        let code = print_json(
            printer,
            &serde_json::json!({
                "script": build_script,
                "warnings": warnings,
            }),
        );
        if code != exit_codes::SUCCESS {
            return code;
        }
    } else {
        let unset = || "-".to_string();
        printer.header(&script.display().to_string());
        printer.field("namespace", build_script.namespace.as_deref().unwrap_or("-"));
        printer.field("applicationId", build_script.application_id.as_deref().unwrap_or("-"));
        printer.field("compileSdk", &build_script.compile_sdk.as_ref().map_or_else(unset, ToString::to_string));
        printer.field("minSdk", &build_script.min_sdk.as_ref().map_or_else(unset, ToString::to_string));
        printer.field("targetSdk", &build_script.target_sdk.as_ref().map_or_else(unset, ToString::to_string));
        printer.field("ndkVersion", build_script.ndk_version.as_deref().unwrap_or("-"));
        printer.field("java", build_script.java_target.as_deref().unwrap_or("-"));
        printer.field("jvmTarget", build_script.jvm_target.as_deref().unwrap_or("-"));
        printer.field("plugins", &build_script.plugins.join(", "));
        printer.field(
            "release signing",
            build_script.release_signing_config.as_deref().unwrap_or("-"),
        );
        for (label, patterns) in [
            ("pickFirsts", &build_script.packaging.pick_firsts),
            ("excludes", &build_script.packaging.excludes),
            ("merges", &build_script.packaging.merges),
        ] {
            for pattern in patterns {
                printer.field(label, pattern);
            }
        }
        for warning in &warnings {
            printer.warning(&warning.to_string());
        }
    }

    if strict && !warnings.is_empty() {
        exit_codes::FAILURE
    } else {
        exit_codes::SUCCESS
    }
}

fn run_abis(args: &PackagingArgs, config: &Config, printer: &Printer, json: bool) -> i32 {
    let resolution = match resolve_packaging(args, config, printer) {
        Ok(resolution) => resolution,
        Err(e) => return report_error(printer, json, &e),
    };
    let coverage = AbiCoverage::from_resolution(&resolution);

    if json {
        return print_json(printer, &coverage);
    }

    printer.header("ABI coverage");
    for (library, abis) in &coverage.libraries {
        let names: Vec<&str> = abis.iter().map(|abi| abi.name()).collect();
        printer.field(library, &names.join(", "));
    }
    for (library, missing) in coverage.gaps() {
        let names: Vec<&str> = missing.iter().map(|abi| abi.name()).collect();
        printer.warning(&format!("{} missing for {}", library, names.join(", ")));
    }
    if coverage.lacks_64_bit() {
        printer.warning("no 64-bit ABI is packaged");
    }

    exit_codes::SUCCESS
}

fn run_match(paths: &[String], args: &PackagingArgs, config: &Config, printer: &Printer) -> i32 {
    let options = match packaging_options(args, config) {
        Ok(options) => options,
        Err(e) => return report_error(printer, false, &e),
    };

    for path in paths {
        let description = match options.rule_for(path) {
            Some((Rule::Exclude, pattern)) => format!("excluded by '{}'", pattern),
            Some((Rule::PickFirst, pattern)) => format!("pick-first by '{}'", pattern),
            Some((Rule::Merge, pattern)) => format!("merged by '{}'", pattern),
            None => "no rule, duplicates fail the build".to_string(),
        };
        printer.field(path, &description);
    }

    exit_codes::SUCCESS
}
