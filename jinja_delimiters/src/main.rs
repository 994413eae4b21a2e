use jinja_delimiters::analysis::FactsCache;
use jinja_delimiters::config::{DelimiterConfig, RuntimeConfig};
use jinja_delimiters::pipeline::{PipelineError, PipelineOptions, PipelineOutput, PipelineResult};
use jinja_delimiters::{batch, logging, pipeline};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Default)]
struct CliOptions {
    batch: batch::BatchConfig,
    config_path: Option<PathBuf>,
    show_tokens: bool,
    show_tree: bool,
    show_facts: bool,
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let runtime = RuntimeConfig::default();
    logging::config::init_runtime_preferences(runtime.logging.clone())?;
    logging::init_global_logging()?;
    pipeline::validate_pipeline()?;

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <template|directory> [options]", args[0]);
        eprintln!("       {} --help", args[0]);
        std::process::exit(1);
    }

    if args[1] == "--help" {
        print_help(&args[0]);
        return Ok(());
    }

    let input_path = Path::new(&args[1]);
    let options = parse_options(&args[2..]);

    let delimiters = match &options.config_path {
        Some(path) => match DelimiterConfig::load(path) {
            Ok(config) => config,
            Err(error) => {
                eprintln!("Error: {}", error);
                std::process::exit(1);
            }
        },
        None => DelimiterConfig::default(),
    };

    let mut pipeline_options = PipelineOptions::from_runtime(runtime);
    if pipeline_options.runtime.analysis.enable_facts_cache {
        pipeline_options = pipeline_options.with_cache(Arc::new(FactsCache::new()));
    }

    if input_path.is_file() {
        process_single_file(input_path, &delimiters, &pipeline_options, &options)?;
    } else if input_path.is_dir() {
        process_directory_batch(input_path, &delimiters, &pipeline_options, &options)?;
    } else {
        eprintln!("Error: Input must be a template file or directory");
        eprintln!("  Path: {}", input_path.display());
        std::process::exit(1);
    }

    Ok(())
}

fn print_help(program_name: &str) {
    println!("Jinja Delimiters v{}", env!("CARGO_PKG_VERSION"));
    println!("Tokenize and parse Jinja-style templates with configurable delimiters");
    println!();
    println!("USAGE:");
    println!("    {} <template> [options]           # Process single file", program_name);
    println!("    {} <directory> [options]          # Process directory", program_name);
    println!();
    println!("OPTIONS:");
    println!("    --help              Show this help message");
    println!("    --config FILE       Load delimiters from a TOML file");
    println!("    --tokens            Print the token stream");
    println!("    --tree              Print the syntax tree");
    println!("    --facts             Print collected template facts");
    println!("    --json              Emit JSON instead of text");
    println!("    --sequential        Force sequential processing (no parallelism)");
    println!("    --threads N         Set maximum number of threads (default: auto)");
    println!("    --no-recursive      Don't search subdirectories");
    println!("    --max-files N       Limit maximum files to process");
    println!("    --fail-fast         Stop on first failed file");
    println!("    --quiet             Suppress progress reporting");
    println!();
    println!("DELIMITER FILE:");
    println!("    block_start = \"<%\"");
    println!("    block_end = \"%>\"");
    println!("    variable_start = \"[[\"");
    println!("    variable_end = \"]]\"");
    println!("    line_statement_prefix = \"%%\"");
    println!();
    println!("EXAMPLES:");
    println!("    {} page.html --tree                # Show syntax tree", program_name);
    println!("    {} templates/ --threads 4          # 4 threads max", program_name);
    println!("    {} mail.j2 --config latex.toml     # Custom delimiters", program_name);
    println!();

    let pipeline_info = pipeline::get_pipeline_info();
    println!("PIPELINE CAPABILITIES:");
    for line in pipeline_info.report().lines() {
        println!("    {}", line);
    }
}

fn parse_options(args: &[String]) -> CliOptions {
    let mut options = CliOptions::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                if i + 1 < args.len() {
                    options.config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Warning: --config requires a file path");
                }
            }
            "--tokens" => options.show_tokens = true,
            "--tree" => options.show_tree = true,
            "--facts" => options.show_facts = true,
            "--json" => options.json = true,
            "--sequential" => options.batch.max_threads = 1,
            "--threads" => {
                if i + 1 < args.len() {
                    match args[i + 1].parse::<usize>() {
                        Ok(threads) => options.batch.max_threads = threads,
                        Err(_) => eprintln!(
                            "Warning: Invalid thread count '{}', using default",
                            args[i + 1]
                        ),
                    }
                    i += 1;
                } else {
                    eprintln!("Warning: --threads requires a number");
                }
            }
            "--no-recursive" => options.batch.recursive = false,
            "--max-files" => {
                if i + 1 < args.len() {
                    match args[i + 1].parse::<usize>() {
                        Ok(max_files) => options.batch.max_files = Some(max_files),
                        Err(_) => {
                            eprintln!("Warning: Invalid max files '{}', ignoring", args[i + 1])
                        }
                    }
                    i += 1;
                } else {
                    eprintln!("Warning: --max-files requires a number");
                }
            }
            "--fail-fast" => options.batch.fail_fast = true,
            "--quiet" => options.batch.progress_reporting = false,
            _ => {
                eprintln!("Warning: Unknown option '{}'", args[i]);
            }
        }
        i += 1;
    }

    // JSON goes to stdout; keep it parseable
    if options.json {
        options.batch.progress_reporting = false;
    }

    options
}

fn process_single_file(
    path: &Path,
    delimiters: &DelimiterConfig,
    pipeline_options: &PipelineOptions,
    options: &CliOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    match pipeline::process_file(path, delimiters, pipeline_options) {
        Ok(result) => {
            if options.json {
                let output = PipelineOutput::from_result(&result, options.show_tokens, options.show_tree);
                println!("{}", output.to_json()?);
            } else {
                println!("Processing file: {}", path.display());
                print_file_result(&result, options);
                logging::print_cargo_style_summary();
            }

            if result.has_diagnostics() {
                std::process::exit(1);
            }
        }
        Err(error) => {
            eprintln!("\nFAILED: {}", error);
            print_detailed_error(&error);
            logging::print_cargo_style_summary();
            std::process::exit(1);
        }
    }

    Ok(())
}

fn print_file_result(result: &PipelineResult, options: &CliOptions) {
    if options.show_tokens {
        println!("\nTokens:");
        for token in result.stream.tokens() {
            println!(
                "  {:>6}..{:<6} {:<22} {:?}",
                token.start,
                token.end,
                token.kind.to_string(),
                token.text(result.stream.source())
            );
        }
    }

    if options.show_tree {
        println!("\nSyntax tree:");
        print!("{}", result.parsed.tree.dump(&result.stream));
    }

    if options.show_facts {
        if let Some(facts) = &result.facts {
            println!("\nFacts:");
            println!("  variables:    {}", join(&facts.variables));
            println!("  macros:       {}", join(&facts.macros));
            println!("  blocks:       {}", join(&facts.blocks));
            println!("  filters:      {}", join(&facts.filters));
            println!("  dependencies: {}", join(&facts.dependencies));
            println!("  complexity:   {}", facts.complexity);
        }
    }

    if result.has_diagnostics() {
        eprintln!("\n{}", result.format_diagnostics());
        println!(
            "\nDONE: {} tokens, {} nodes, {} diagnostics",
            result.token_count(),
            result.parsed.statistics.node_count,
            result.diagnostics().len()
        );
    } else {
        println!(
            "\nSUCCESS: {} tokens, {} nodes, no diagnostics",
            result.token_count(),
            result.parsed.statistics.node_count
        );
    }
}

fn join<'a>(names: impl IntoIterator<Item = &'a String>) -> String {
    let names: Vec<&str> = names.into_iter().map(String::as_str).collect();
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(", ")
    }
}

fn process_directory_batch(
    dir_path: &Path,
    delimiters: &DelimiterConfig,
    pipeline_options: &PipelineOptions,
    options: &CliOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = &options.batch;
    if !options.json {
        println!("Starting batch processing: {}", dir_path.display());
        println!(
            "Configuration: {} threads, recursive={}, fail_fast={}",
            config.effective_threads(),
            config.recursive,
            config.fail_fast
        );
    }

    match batch::process_directory_with_config(dir_path, delimiters, pipeline_options, config) {
        Ok(results) => {
            if options.json {
                let outputs: Vec<PipelineOutput> = results
                    .successful_files
                    .iter()
                    .map(|(_, result)| {
                        PipelineOutput::from_result(result, options.show_tokens, options.show_tree)
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&outputs)?);
            } else {
                for (_, result) in &results.successful_files {
                    if result.has_diagnostics() {
                        eprintln!("{}\n", result.format_diagnostics());
                    }
                }
                println!("\nBatch processing completed!");
                print_batch_results(&results);
                logging::print_cargo_style_summary();

                let logged = logging::get_processing_summary();
                if logged.has_errors() || logged.has_warnings() {
                    println!(
                        "\nLogged {} errors and {} warnings across {} files",
                        logged.total_errors, logged.total_warnings, logged.total_files
                    );
                }
            }

            if results.failure_count() > 0 || results.files_with_diagnostics() > 0 {
                std::process::exit(1);
            }
        }
        Err(error) => {
            eprintln!("Batch processing failed: [{}] {}", error.error_code(), error);
            logging::print_cargo_style_summary();
            std::process::exit(1);
        }
    }

    Ok(())
}

fn print_batch_results(results: &batch::BatchResults) {
    let stats = results.stats();

    println!("Batch Processing Summary:");
    println!("  Files discovered: {}", results.files_discovered);
    println!("  Files processed: {}", results.files_processed);
    println!(
        "  Successful: {} ({:.1}%)",
        results.success_count(),
        results.success_rate() * 100.0
    );
    println!(
        "  Clean: {} ({:.1}%)",
        stats.files - stats.files_with_diagnostics,
        stats.clean_rate() * 100.0
    );
    println!("  Failed: {}", results.failure_count());
    println!("  Diagnostics: {}", stats.total_diagnostics);
    println!("  Facts cache hits: {}", stats.facts_cache_hits);
    println!("  Total time: {:.2}s", results.processing_duration.as_secs_f64());

    let seconds = results.processing_duration.as_secs_f64();
    if seconds > 0.0 && stats.files > 0 {
        println!(
            "  Processing rate: {:.0} bytes/sec, {:.0} tokens/sec",
            stats.total_bytes as f64 / seconds,
            stats.total_tokens as f64 / seconds
        );
    }

    if results.failure_count() > 0 {
        println!("\nFailed Files:");
        for (file_path, error) in &results.failed_files {
            println!("  {}: {}", file_path.display(), get_error_summary(error));
        }
    }

    if results.success_count() > 0 && results.success_count() <= 10 {
        println!("\nProcessed Files:");
        for (file_path, result) in &results.successful_files {
            println!(
                "  {}: {} tokens, {} diagnostics",
                file_path.display(),
                result.token_count(),
                result.diagnostics().len()
            );
        }
    }
}

fn get_error_summary(error: &PipelineError) -> String {
    match error {
        PipelineError::Configuration(_) => "Delimiter configuration error".to_string(),
        PipelineError::FileProcessing(_) => "File processing error".to_string(),
        PipelineError::LexicalAnalysis(_) => "Lexical analysis error".to_string(),
        PipelineError::Analysis(_) => "Analysis error".to_string(),
        PipelineError::Serialization(_) => "Serialization error".to_string(),
        PipelineError::Pipeline { .. } => "Pipeline error".to_string(),
    }
}

fn print_detailed_error(error: &PipelineError) {
    eprintln!("{} stage failed [{}]:", error.stage(), error.error_code());
    eprintln!("  {}", error);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_parse_options() {
        let options = parse_options(&args(&[
            "--threads",
            "4",
            "--fail-fast",
            "--no-recursive",
            "--config",
            "delims.toml",
            "--tree",
        ]));

        assert_eq!(options.batch.max_threads, 4);
        assert!(options.batch.fail_fast);
        assert!(!options.batch.recursive);
        assert!(options.show_tree);
        assert!(!options.show_tokens);
        assert_eq!(options.config_path, Some(PathBuf::from("delims.toml")));
    }

    #[test]
    fn test_parse_options_invalid() {
        let options = parse_options(&args(&["--threads", "invalid", "--unknown-option"]));
        assert_ne!(options.batch.max_threads, 0);
        assert!(options.config_path.is_none());
    }

    #[test]
    fn test_json_silences_progress() {
        let options = parse_options(&args(&["--json"]));
        assert!(options.json);
        assert!(!options.batch.progress_reporting);
    }

    #[test]
    fn test_get_error_summary() {
        let error = PipelineError::pipeline_error("test");
        assert_eq!(get_error_summary(&error), "Pipeline error");
    }
}
