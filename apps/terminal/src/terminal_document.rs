use std::io::{self, BufRead, Write};

use client_core::{Document, Toast, ToastKind};
use maud::Markup;

/// Prints what the pages render. Markup is flattened to its text.
pub struct TerminalDocument {
    verbose: bool,
}

impl TerminalDocument {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Document for TerminalDocument {
    fn render(&self, element: &str, html: Markup) {
        let text = flatten(&html.into_string());
        if !text.is_empty() {
            println!("[{element}]\n{text}");
        }
    }

    fn set_text(&self, element: &str, text: &str) {
        if !text.is_empty() {
            println!("{element}: {text}");
        }
    }

    fn set_class(&self, element: &str, class: &str, enabled: bool) {
        if self.verbose {
            let sign = if enabled { '+' } else { '-' };
            println!("{element} {sign}{class}");
        }
    }

    fn set_width(&self, element: &str, percent: f64) {
        if self.verbose {
            println!("{element}: {percent:.0}%");
        }
    }

    fn toast(&self, toast: Toast) {
        let marker = match toast.kind {
            ToastKind::Info => "i",
            ToastKind::Success => "✓",
            ToastKind::Warning => "!",
            ToastKind::Error => "✗",
        };
        println!("[{marker}] {}", toast.message);
    }

    fn confirm(&self, prompt: &str) -> bool {
        print!("{prompt} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(_) => matches!(line.trim(), "y" | "Y" | "д" | "Д"),
            Err(_) => false,
        }
    }

    fn navigate(&self, location: &str) {
        println!("-> {location}");
    }
}

/// Drops tags and collapses whitespace, one line per block of text.
fn flatten(html: &str) -> String {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => {
                in_tag = true;
                let line = current.split_whitespace().collect::<Vec<_>>().join(" ");
                if !line.is_empty() {
                    lines.push(line);
                }
                current.clear();
            }
            '>' if in_tag => in_tag = false,
            _ if !in_tag => current.push(ch),
            _ => {}
        }
    }
    let tail = current.split_whitespace().collect::<Vec<_>>().join(" ");
    if !tail.is_empty() {
        lines.push(tail);
    }
    lines
        .join("\n")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
}
