//! Command implementations for the CLI tool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use console::style;
use dialoguer::{Confirm, theme::ColorfulTheme};

use waczfold::{
    CreateOptions, Error, ExtractOptions, create_archive, default_output_dir, extract_archive,
    has_files, select_format,
};

use crate::OutputFormat;
use crate::exit_codes::{ExitCode, error_to_exit_code};
use crate::output::create_formatter;
use crate::progress::CliProgress;

const FILES_MODE_HINT: &str = "Input directory does not appear to be an unpacked WARC or WACZ file.\n\
To create an archive from ordinary files, run again with --as-files.";

/// Configuration for the extract command.
pub struct ExtractConfig<'a> {
    pub input: &'a Path,
    pub output_dir: Option<PathBuf>,
    pub delete_existing: bool,
    pub format: OutputFormat,
    pub quiet: bool,
}

/// Configuration for the create command.
pub struct CreateConfig<'a> {
    pub input_dir: &'a Path,
    pub output: &'a Path,
    pub as_files: bool,
    pub level: u32,
    pub pages: Option<PathBuf>,
    pub logs: Option<PathBuf>,
    pub format: OutputFormat,
    pub quiet: bool,
}

/// Extract command implementation
pub fn extract(config: &ExtractConfig<'_>) -> ExitCode {
    let formatter = create_formatter(config.format);
    let output_dir = config
        .output_dir
        .clone()
        .unwrap_or_else(|| default_output_dir(config.input));

    let mut delete_existing = config.delete_existing;
    if !delete_existing && output_dir.is_dir() {
        match has_files(&output_dir) {
            Ok(true) => match confirm_delete(&output_dir, config.quiet) {
                Some(true) => delete_existing = true,
                Some(false) => {
                    eprintln!("{}", style("Aborted").red());
                    return ExitCode::FatalError;
                }
                // Not interactive: the library reports the non-empty directory
                None => {}
            },
            Ok(false) => {}
            Err(e) => return report(&e),
        }
    }

    let progress = Arc::new(CliProgress::new(config.quiet));
    let options = ExtractOptions::new()
        .delete_existing(delete_existing)
        .progress(Arc::clone(&progress));

    let result = match extract_archive(config.input, &output_dir, &options) {
        Ok(r) => r,
        Err(e) => {
            progress.finish_with_message("Failed");
            if matches!(e, Error::OutputNotEmpty { .. }) {
                eprintln!(
                    "{}",
                    style(format!(
                        "Output directory \"{}\" is not empty. Use --delete-existing to delete it and its contents before extraction.",
                        output_dir.display()
                    ))
                    .red()
                );
                return error_to_exit_code(&e);
            }
            return report(&e);
        }
    };
    progress.finish();

    print!(
        "{}",
        formatter.format_extract_result(config.input, &output_dir, &result)
    );
    ExitCode::Success
}

/// Asks whether to delete `dir`. `None` when nobody can answer.
fn confirm_delete(dir: &Path, quiet: bool) -> Option<bool> {
    if quiet || !console::user_attended() {
        return None;
    }
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!(
            "Output directory \"{}\" is not empty. Delete it and its contents?",
            dir.display()
        ))
        .default(false)
        .interact()
        .ok()
}

/// Create command implementation
pub fn create(config: &CreateConfig<'_>) -> ExitCode {
    let formatter = create_formatter(config.format);

    let mut options = match CreateOptions::new()
        .files_mode(config.as_files)
        .compression_level(config.level)
    {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::BadArgs;
        }
    };
    if let Some(dir) = &config.pages {
        options = options.pages_dir(dir);
    }
    if let Some(dir) = &config.logs {
        options = options.logs_dir(dir);
    }

    let progress = Arc::new(CliProgress::new(config.quiet));
    let options = options.progress(Arc::clone(&progress));

    let result = match create_archive(config.input_dir, config.output, &options) {
        Ok(r) => r,
        Err(e) => {
            progress.finish_with_message("Failed");
            if e.suggests_files_mode() {
                eprintln!("{}", style(format!("Error: {}", e)).red());
                eprintln!("{}", style(FILES_MODE_HINT).red());
                return error_to_exit_code(&e);
            }
            return report(&e);
        }
    };
    progress.finish();

    print!(
        "{}",
        formatter.format_create_result(config.input_dir, config.output, &result)
    );
    ExitCode::Success
}

/// Inspect command implementation
pub fn inspect(path: &Path, format: OutputFormat) -> ExitCode {
    let formatter = create_formatter(format);
    match select_format(path, None) {
        Ok(target) => {
            print!("{}", formatter.format_target(path, &target, path.is_dir()));
            ExitCode::Success
        }
        Err(e) => report(&e),
    }
}

fn report(error: &Error) -> ExitCode {
    eprintln!("{}", style(format!("Error: {}", error)).red());
    error_to_exit_code(error)
}
