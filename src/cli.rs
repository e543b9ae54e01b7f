//! Command-line interface for diffdeck.

use clap::Parser;

use crate::error::RequestResult;
use crate::logging::{LogFormat, LoggingConfig};
use crate::request::{expand_path, ComparisonRequest};

/// diffdeck - compare and merge files and folders
#[derive(Parser, Debug)]
#[command(name = "diffdeck")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Start comparing as soon as a folder or version-control view opens
    #[arg(long)]
    pub auto_compare: bool,

    /// Automatically merge three files
    #[arg(long)]
    pub auto_merge: bool,

    /// Where the merge result is written
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<String>,

    /// Focus the new tab even when the focus policy would not
    #[arg(long)]
    pub focus: bool,

    /// Console log format for this run: pretty, compact or json
    #[arg(long, value_name = "FORMAT")]
    pub log_format: Option<String>,

    /// One to three files or directories
    #[arg(value_name = "PATH", default_value = ".")]
    pub paths: Vec<String>,
}

impl Cli {
    /// Logging settings for this run, with command-line overrides applied
    pub fn logging(&self, base: &LoggingConfig) -> LoggingConfig {
        let mut config = base.clone();
        if let Some(format) = &self.log_format {
            config.format = LogFormat::parse(format);
        }
        config
    }

    /// Turn the parsed arguments into a request, expanding `~` and `$VAR`
    pub fn into_request(self) -> RequestResult<ComparisonRequest> {
        let mut request = ComparisonRequest::from_args(&self.paths)?
            .with_auto_compare(self.auto_compare)
            .with_auto_merge(self.auto_merge)
            .with_focus(self.focus);
        if let Some(output) = &self.output {
            request = request.with_merge_output(expand_path(output)?);
        }
        Ok(request)
    }
}
