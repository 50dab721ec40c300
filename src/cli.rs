use clap::Parser;
use std::path::PathBuf;

use crate::tree::{BuildOptions, TextFilter};

#[derive(Parser, Debug)]
#[command(name = "snipzip")]
#[command(version)]
#[command(about = "Browse, edit and repack ZIP snippets", long_about = None)]
#[command(after_help = "Examples:\n  \
  snipzip project.zip                       print the file tree\n  \
  snipzip -p src/main.rs project.zip        print one file\n  \
  snipzip --replace a.py=new.py -r out.zip project.zip\n  \
  snipzip --snippet 42 -l                   browse a shared snippet\n  \
  snipzip --list-snippets --type 코드        list shared code snippets")]
pub struct Cli {
    /// ZIP file path or HTTP URL
    #[arg(
        value_name = "SOURCE",
        required_unless_present_any = ["snippet", "list_snippets"]
    )]
    pub source: Option<String>,

    /// Load a shared snippet by id instead of SOURCE
    #[arg(long, value_name = "ID", conflicts_with = "source")]
    pub snippet: Option<u64>,

    /// List the snippets on the service with their remaining lifetime
    #[arg(long, conflicts_with_all = ["source", "snippet"])]
    pub list_snippets: bool,

    /// Only list snippets of this type (e.g. "ZIP 파일", "코드")
    #[arg(long = "type", value_name = "TYPE", requires = "list_snippets")]
    pub snippet_type: Option<String>,

    /// Snippet service base URL
    #[arg(
        long = "api",
        value_name = "URL",
        env = "SNIPZIP_API_URL",
        default_value = "http://localhost:3000"
    )]
    pub api_url: String,

    /// List the file tree (default when nothing else is asked for)
    #[arg(short = 'l')]
    pub list: bool,

    /// Print the tree as JSON
    #[arg(long)]
    pub json: bool,

    /// Expand every directory when listing
    #[arg(long)]
    pub expand_all: bool,

    /// Print one member to stdout
    #[arg(short = 'p', value_name = "PATH")]
    pub print: Option<String>,

    /// Decode members only when they are opened
    #[arg(long, conflicts_with = "eager")]
    pub lazy: bool,

    /// Decode every text member up front
    #[arg(long)]
    pub eager: bool,

    /// Decode every member not known to be binary, not just common source types
    #[arg(long)]
    pub all_text: bool,

    /// Replace a member's content with a local file
    #[arg(long, value_name = "PATH=FILE", value_parser = parse_replacement)]
    pub replace: Vec<(String, PathBuf)>,

    /// Repack the (edited) archive into OUT
    #[arg(short = 'r', value_name = "OUT")]
    pub repack: Option<PathBuf>,

    /// Save the archive as loaded into DIR
    #[arg(long, value_name = "DIR")]
    pub download_original: Option<PathBuf>,

    /// Save one member into the output directory
    #[arg(long = "download", value_name = "PATH")]
    pub download_member: Option<String>,

    /// Output directory for downloads
    #[arg(short = 'd', value_name = "DIR", default_value = ".")]
    pub out_dir: PathBuf,

    /// Post the (edited) source to the snippet service under TITLE
    #[arg(long, value_name = "TITLE")]
    pub submit: Option<String>,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count, conflicts_with = "verbose")]
    pub quiet: u8,

    /// More logging (-vv => trace)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

fn parse_replacement(arg: &str) -> Result<(String, PathBuf), String> {
    match arg.split_once('=') {
        Some((path, file)) if !path.is_empty() && !file.is_empty() => {
            Ok((path.to_string(), PathBuf::from(file)))
        }
        _ => Err(format!("expected PATH=FILE, got `{arg}`")),
    }
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.source
            .as_deref()
            .is_some_and(|s| s.starts_with("http://") || s.starts_with("https://"))
    }

    pub fn is_remote(&self) -> bool {
        self.snippet.is_some() || self.is_http_url()
    }

    /// Remote sources load lazily unless `--eager` is given.
    pub fn build_options(&self) -> BuildOptions {
        let lazy = self.lazy || (self.is_remote() && !self.eager);
        let options = if lazy {
            BuildOptions::lazy()
        } else {
            BuildOptions::eager()
        };
        if self.all_text {
            options.with_text_filter(TextFilter::NonBinary)
        } else {
            options
        }
    }

    pub fn verbosity(&self) -> i8 {
        self.verbose as i8 - self.quiet as i8
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.print.is_some()
    }

    /// Whether any action besides listing was requested.
    pub fn has_action(&self) -> bool {
        self.print.is_some()
            || self.repack.is_some()
            || self.download_original.is_some()
            || self.download_member.is_some()
            || self.submit.is_some()
    }
}
