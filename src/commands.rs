//! CLI commands. Each one opens a [`Store`], runs a single operation, and prints the result.
//!
//! With `--json`, payloads are printed to stdout in the shapes the web layer
//! consumes (`[{slug, title}]`, `{content}`, `{slug, fileName}`), and failures as
//! `{kind, message}`.

use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::time::Duration;

use crate::document::parse;
use crate::error::StoreError;
use crate::slug::to_heading;
use crate::store::Store;

#[derive(Serialize)]
struct Content<'a> {
    content: &'a str,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print the `{kind, message}` report when asked for JSON, then hand the error to `main`.
fn fail(json: bool, err: StoreError) -> Result<()> {
    if json {
        print_json(&err.report())?;
    }
    Err(err.into())
}

/// Spinner shown while a write is in flight; hidden in JSON mode so stdout stays parseable.
fn saving_spinner(json: bool, title: &str) -> ProgressBar {
    let pb = if json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    if let Ok(style) = ProgressStyle::with_template("{spinner:.yellow} {wide_msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
    }
    pb.enable_steady_tick(Duration::from_millis(80));
    pb.set_message(format!("saving \"{}\"", title));
    pb
}

/// Replace the spinner with a final `✔ saved <file>` or `✘ <reason>` line.
fn finish_saving(pb: &ProgressBar, outcome: Result<&str, &StoreError>) {
    let line = match outcome {
        Ok(file_name) => format!("{} saved {}", "✔".green(), file_name),
        Err(e) => format!("{} {}", "✘".red(), e),
    };
    if let Ok(style) = ProgressStyle::with_template("{msg}") {
        pb.set_style(style);
    }
    pb.finish_with_message(line);
}

/// `gitpost list`: one line per post, in the order GitHub returns them.
///
/// Example output:
/// ```text
/// - my first post (my-first-post)
/// - hello world (hello-world)
/// ```
pub fn cmd_list(json: bool) -> Result<()> {
    let posts = match Store::open().and_then(|s| s.list()) {
        Ok(p) => p,
        Err(e) => return fail(json, e),
    };

    if json {
        return print_json(&posts);
    }
    if posts.is_empty() {
        eprintln!("no posts yet");
    }
    for p in &posts {
        println!("- {} ({})", p.title, p.slug.dimmed());
    }
    Ok(())
}

/// `gitpost read <slug>`: the stored text, or with `render` a heading plus the body.
pub fn cmd_read(slug: &str, render: bool, json: bool) -> Result<()> {
    let raw = match Store::open().and_then(|s| s.read(slug)) {
        Ok(r) => r,
        Err(e) => return fail(json, e),
    };

    if json {
        return print_json(&Content { content: &raw });
    }
    if render {
        println!("{}", rendered(slug, &raw));
    } else {
        print!("{}", raw);
    }
    Ok(())
}

/// Heading from the stored title (or the slug when there is none), then the body.
fn rendered(slug: &str, raw: &str) -> String {
    let (title, body) = match parse(raw) {
        Some(p) => (p.title.filter(|t| !t.trim().is_empty()), p.body),
        None => (None, raw),
    };
    let heading = title.unwrap_or_else(|| to_heading(slug));
    format!("# {}\n\n{}", heading, body)
}

/// Body text from `--body`, `--file`, or stdin, in that order.
fn body_text(body: Option<String>, file: Option<&Path>) -> Result<String> {
    if let Some(b) = body {
        return Ok(b);
    }
    if let Some(p) = file {
        return fs::read_to_string(p).with_context(|| format!("read {}", p.display()));
    }
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("read post body from stdin")?;
    Ok(buf)
}

/// `gitpost write --title <T>`: create or replace the post for `title`.
pub fn cmd_write(title: &str, body: Option<String>, file: Option<&Path>, json: bool) -> Result<()> {
    let text = body_text(body, file)?;

    let pb = saving_spinner(json, title);
    match Store::open().and_then(|s| s.write(title, &text)) {
        Ok(receipt) => {
            finish_saving(&pb, Ok(receipt.file_name.as_str()));
            if json {
                print_json(&receipt)?;
            }
            Ok(())
        }
        Err(e) => {
            finish_saving(&pb, Err(&e));
            fail(json, e)
        }
    }
}
