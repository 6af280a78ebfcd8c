//! Source emission
//!
//! Rendered text goes to a [`CodeSink`]; the generator never decides where
//! the source ends up. [`RustFile`] is the small line builder the renderer
//! writes through.

pub mod render;

use std::io;

use crate::error::Result;

pub use render::{
    render_dispatcher, render_expr, render_family, render_mask_tables, render_routine,
    render_source,
};

/// Destination of generated source text
pub trait CodeSink {
    fn append(&mut self, chunk: &str) -> Result<()>;
}

impl CodeSink for String {
    fn append(&mut self, chunk: &str) -> Result<()> {
        self.push_str(chunk);
        Ok(())
    }
}

/// Sink over any `io::Write`, e.g. a file or stdout
#[derive(Debug)]
pub struct WriterSink<W: io::Write> {
    writer: W,
}

impl<W: io::Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: io::Write> CodeSink for WriterSink<W> {
    fn append(&mut self, chunk: &str) -> Result<()> {
        self.writer.write_all(chunk.as_bytes())?;
        Ok(())
    }
}

const INDENT: &str = "    ";

/// Line-oriented Rust source builder
#[derive(Debug, Default)]
pub struct RustFile {
    pub buf: String,
    depth: usize,
}

impl RustFile {
    /// Starts a file with `doc` as its inner doc comment
    pub fn new(doc: &str) -> Self {
        let mut f = Self::default();
        for line in doc.lines() {
            if line.is_empty() {
                f.line("//!");
            } else {
                f.line(&format!("//! {line}"));
            }
        }
        f
    }

    /// Starts a fragment at the given indentation depth
    pub fn fragment(depth: usize) -> Self {
        Self {
            buf: String::new(),
            depth,
        }
    }

    pub fn line(&mut self, text: &str) {
        if text.is_empty() {
            self.buf.push('\n');
            return;
        }
        for _ in 0..self.depth {
            self.buf.push_str(INDENT);
        }
        self.buf.push_str(text);
        self.buf.push('\n');
    }

    pub fn blank(&mut self) {
        self.buf.push('\n');
    }

    pub fn doc_comment(&mut self, doc: &str) {
        for line in doc.lines() {
            if line.is_empty() {
                self.line("///");
            } else {
                self.line(&format!("/// {line}"));
            }
        }
    }

    /// Writes `text` (ending in `{`) and indents what follows
    pub fn open(&mut self, text: &str) {
        self.line(text);
        self.depth += 1;
    }

    /// Dedents and writes `text` (usually `}`)
    pub fn close(&mut self, text: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.line(text);
    }

    pub fn finish(self) -> String {
        self.buf
    }
}
