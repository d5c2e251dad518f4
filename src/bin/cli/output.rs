//! Output formatting for CLI operations.

use std::path::Path;

use serde_json::json;
use waczfold::progress::format_bytes;
use waczfold::{ArchiveTarget, CreateResult, ExtractResult};

/// Trait for output formatting
pub trait OutputFormatter {
    /// Formats extraction results
    fn format_extract_result(&self, input: &Path, output: &Path, result: &ExtractResult) -> String;

    /// Formats creation results
    fn format_create_result(&self, input: &Path, output: &Path, result: &CreateResult) -> String;

    /// Formats a resolved archive target
    fn format_target(&self, path: &Path, target: &ArchiveTarget, is_dir: bool) -> String;
}

/// Human-readable output formatter
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn format_extract_result(&self, input: &Path, output: &Path, result: &ExtractResult) -> String {
        let mut out = format!(
            "Extracted {} files ({}) from {} records\n",
            result.files_written,
            format_bytes(result.bytes_written),
            result.records
        );
        for copy in &result.full_copies {
            out.push_str(&format!("  full copy: {}\n", copy.display()));
        }
        out.push_str(&format!(
            "Successfully extracted {} to {}\n",
            input.display(),
            output.display()
        ));
        out
    }

    fn format_create_result(&self, input: &Path, output: &Path, result: &CreateResult) -> String {
        let mut out = format!(
            "Wrote {} records in {} container{} ({} from files, {} new)\n",
            result.records_written,
            result.containers,
            if result.containers == 1 { "" } else { "s" },
            result.records_substituted,
            result.records_synthesized
        );
        if result.placeholders_kept > 0 {
            out.push_str(&format!(
                "{} records kept their placeholder body (file missing)\n",
                result.placeholders_kept
            ));
        }
        out.push_str(&format!(
            "Successfully created {} from {}\n",
            output.display(),
            input.display()
        ));
        out
    }

    fn format_target(&self, path: &Path, target: &ArchiveTarget, is_dir: bool) -> String {
        let mut out = format!("{}\n", path.display());
        if is_dir {
            out.push_str(&format!("  Unpacked from:  {} (best guess)\n", target.kind));
        } else {
            out.push_str(&format!("  Kind:           {}\n", target.kind));
        }
        out.push_str(&format!(
            "  Compressed:     {}\n",
            if target.compressed { "Yes" } else { "No" }
        ));
        out
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format_extract_result(&self, input: &Path, output: &Path, result: &ExtractResult) -> String {
        let obj = json!({
            "input": input,
            "output": output,
            "records": result.records,
            "files_written": result.files_written,
            "bytes_written": result.bytes_written,
            "full_copies": result.full_copies,
        });
        format!("{}\n", obj)
    }

    fn format_create_result(&self, input: &Path, output: &Path, result: &CreateResult) -> String {
        let obj = json!({
            "input": input,
            "output": output,
            "containers": result.containers,
            "records_written": result.records_written,
            "records_substituted": result.records_substituted,
            "records_synthesized": result.records_synthesized,
            "placeholders_kept": result.placeholders_kept,
        });
        format!("{}\n", obj)
    }

    fn format_target(&self, path: &Path, target: &ArchiveTarget, is_dir: bool) -> String {
        let obj = json!({
            "path": path,
            "directory": is_dir,
            "target": target,
        });
        format!("{}\n", obj)
    }
}

/// Creates a formatter for the given output format
pub fn create_formatter(format: super::OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        super::OutputFormat::Human => Box::new(HumanFormatter),
        super::OutputFormat::Json => Box::new(JsonFormatter),
    }
}
