//! Command-line front end: load a ZIP (local, remote or a shared snippet),
//! browse its tree, edit members and repack or resubmit it.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::Parser;
use std::path::Path;
use tokio::io::AsyncWriteExt;

use snipzip::api::{ApiClient, Snippet, Submission};
use snipzip::language::{classify_by_extension, display_name, extension_for_language};
use snipzip::session::{
    ArchiveSession, DEFAULT_ARCHIVE_NAME, DEFAULT_SNIPPET_NAME, EditOverlay, file_stem_from_title,
    save_download,
};
use snipzip::tree::{count, render_tree};
use snipzip::{Cli, init_logging};

/// What SOURCE (or `--snippet`) turned out to be.
enum Source {
    Archive { name: String, bytes: Vec<u8> },
    /// A shared snippet that is a single plain file.
    Plain { snippet: Snippet, text: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbosity());

    let api = ApiClient::new(cli.api_url.clone())?;

    if cli.list_snippets {
        return list_snippets(&api, cli.snippet_type.as_deref()).await;
    }

    match load_source(&cli, &api).await? {
        Source::Archive { name, bytes } => process_archive(&cli, &api, &name, bytes).await,
        Source::Plain { snippet, text } => process_plain(&cli, &api, &snippet, text).await,
    }
}

async fn list_snippets(api: &ApiClient, kind: Option<&str>) -> Result<()> {
    let snippets = match kind {
        Some(kind) => api.list_snippets_of_type(kind).await,
        None => api.list_snippets().await,
    }
    .context("could not list snippets")?;

    let now = Utc::now();
    for snippet in &snippets {
        println!("{}", snippet_line(snippet, now));
    }
    println!("{}", "-".repeat(40));
    println!("{} snippet(s)", snippets.len());
    Ok(())
}

fn snippet_line(snippet: &Snippet, now: DateTime<Utc>) -> String {
    format!(
        "{:>6}  {:<12}  {:<16}  {:<16}  {}",
        snippet.id,
        snippet.kind.as_deref().unwrap_or("-"),
        snippet.created_ago(now),
        snippet.remaining_time(now),
        snippet.title
    )
}

async fn load_source(cli: &Cli, api: &ApiClient) -> Result<Source> {
    if let Some(id) = cli.snippet {
        let snippet = api
            .find_snippet(id)
            .await
            .context("could not list snippets")?
            .with_context(|| format!("no snippet with id {id}"))?;
        let bytes = api
            .fetch_file(&snippet.file_path)
            .await
            .with_context(|| format!("could not download {}", snippet.file_path))?;

        if snippet.is_archive() {
            let name = format!("{}.zip", file_stem_from_title(&snippet.title));
            return Ok(Source::Archive { name, bytes });
        }
        let text = String::from_utf8(bytes).context("snippet is not valid UTF-8")?;
        return Ok(Source::Plain { snippet, text });
    }

    let Some(source) = cli.source.as_deref() else {
        bail!("no source given");
    };
    let name = source_file_name(source);

    let bytes = if cli.is_http_url() {
        api.fetch_file(source)
            .await
            .with_context(|| format!("could not download {source}"))?
    } else {
        tokio::fs::read(source)
            .await
            .with_context(|| format!("could not read {source}"))?
    };
    Ok(Source::Archive { name, bytes })
}

/// Last path segment of a local path or URL, without any query string.
fn source_file_name(source: &str) -> String {
    let trimmed = source.split(['?', '#']).next().unwrap_or(source);
    Path::new(trimmed)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_ARCHIVE_NAME)
        .to_string()
}

async fn process_archive(cli: &Cli, api: &ApiClient, name: &str, bytes: Vec<u8>) -> Result<()> {
    let size = bytes.len() as u64;
    let mut session = ArchiveSession::new();
    session
        .load(bytes, cli.build_options())
        .await
        .context("could not process archive")?;

    if !cli.replace.is_empty() {
        let mut overlay = EditOverlay::new();
        for (path, file) in &cli.replace {
            let text = tokio::fs::read_to_string(file)
                .await
                .with_context(|| format!("could not read {}", file.display()))?;
            overlay.set_text(path, text);
        }
        let applied = overlay.commit(&mut session).context("could not apply edits")?;
        if !cli.is_quiet() {
            eprintln!("Applied {applied} edit(s)");
        }
    }

    if cli.json {
        let tree = session.tree().context("archive is not loaded")?;
        println!("{}", serde_json::to_string_pretty(tree)?);
    } else if cli.list || !cli.has_action() {
        list_tree(&session, name, size, cli.expand_all)?;
    }

    if let Some(path) = &cli.print {
        let Some(text) = session
            .select_and_load(path)
            .await
            .with_context(|| format!("could not load file content: {path}"))?
        else {
            bail!("{path} is a directory");
        };
        let mut stdout = tokio::io::stdout();
        stdout.write_all(text.as_bytes()).await?;
        stdout.flush().await?;
    }

    if let Some(dir) = &cli.download_original {
        let saved = session.download_original(dir, name)?;
        if !cli.is_quiet() {
            println!("  saved: {}", saved.display());
        }
    }

    if let Some(path) = &cli.download_member {
        session
            .get_content(path)
            .await
            .with_context(|| format!("could not load file content: {path}"))?;
        let saved = session.download_member(path, &cli.out_dir, path)?;
        if !cli.is_quiet() {
            println!("  saved: {}", saved.display());
        }
    }

    if cli.repack.is_some() || cli.submit.is_some() {
        let packed = session.serialize().await.context("could not repack archive")?;

        if let Some(out) = &cli.repack {
            tokio::fs::write(out, &packed)
                .await
                .with_context(|| format!("could not write {}", out.display()))?;
            if !cli.is_quiet() {
                println!("  repacked: {} ({})", out.display(), format_size(packed.len() as u64));
            }
        }

        if let Some(title) = &cli.submit {
            let reply = api
                .submit(Submission::archive(title.clone(), name, packed))
                .await
                .context("could not submit snippet")?;
            println!("{reply}");
        }
    }

    Ok(())
}

fn list_tree(session: &ArchiveSession, name: &str, size: u64, expand_all: bool) -> Result<()> {
    let tree = session.tree().context("archive is not loaded")?;
    print!("{}", render_tree(tree, expand_all));

    let (dirs, files) = count(tree);
    println!("{}", "-".repeat(40));
    println!(
        "{name}: {files} files, {} directories ({})",
        dirs.saturating_sub(1),
        format_size(size)
    );
    if let Some(selected) = session.selected() {
        println!("selected: {selected}");
    }
    Ok(())
}

/// A shared snippet that is not an archive: print, save or resubmit it.
async fn process_plain(cli: &Cli, api: &ApiClient, snippet: &Snippet, text: String) -> Result<()> {
    if !cli.replace.is_empty() || cli.repack.is_some() {
        bail!("snippet {} is not an archive", snippet.id);
    }

    let language = snippet
        .language
        .as_deref()
        .unwrap_or_else(|| classify_by_extension(&snippet.file_path));
    let file_name = format!(
        "{}.{}",
        file_stem_from_title(&snippet.title),
        extension_for_language(language)
    );

    if cli.print.is_some() || cli.list || !cli.has_action() {
        if !cli.is_quiet() {
            eprintln!("# {} ({})", snippet.title, display_name(language));
        }
        let mut stdout = tokio::io::stdout();
        stdout.write_all(text.as_bytes()).await?;
        stdout.flush().await?;
    }

    if cli.download_member.is_some() || cli.download_original.is_some() {
        let dir = cli.download_original.as_deref().unwrap_or(cli.out_dir.as_path());
        let saved = save_download(dir, &file_name, DEFAULT_SNIPPET_NAME, text.as_bytes())?;
        if !cli.is_quiet() {
            println!("  saved: {}", saved.display());
        }
    }

    if let Some(title) = &cli.submit {
        let reply = api
            .submit(Submission::code(title.clone(), text, Some(&file_name)))
            .await
            .context("could not submit snippet")?;
        println!("{reply}");
    }

    Ok(())
}

/// Format a byte size into a human-readable string.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
