//! Default [`ReportWriter`]: one PDF per run under the reports directory.
//!
//! Layout happens here (positions, wrapping, page breaks); `printpdf`
//! serialises the pages using the built-in Helvetica and Courier fonts, so
//! no font data is embedded. Text is reduced to Latin-1 and anything else
//! becomes `?`.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument};

use crate::platform::Platform;
use crate::results::RunResult;

use super::ReportWriter;

const TITLE: &str = "System Audit Report";
const LAYER: &str = "Layer 1";

/// A4 in millimetres.
const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 15.0;

const PT_TO_MM: f32 = 0.352_778;
/// Line height as a multiple of the font size.
const LEADING: f32 = 1.4;
/// Average Helvetica glyph width in em, used to approximate centering.
const HELVETICA_AVG_WIDTH: f32 = 0.5;
/// Courier advances 0.6 em per glyph.
const COURIER_WIDTH: f32 = 0.6;

#[derive(Debug, thiserror::Error)]
enum ReportError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("PDF serialisation failed: {0:?}")]
    Pdf(printpdf::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Face {
    Regular,
    Bold,
    Mono,
}

#[derive(Debug, Clone, PartialEq)]
struct PlacedText {
    text: String,
    face: Face,
    size: f32,
    x: f32,
    y: f32,
}

/// Flows text top to bottom, opening a new page when the bottom margin is
/// reached. Coordinates are millimetres from the bottom-left corner.
#[derive(Debug)]
struct Layout {
    pages: Vec<Vec<PlacedText>>,
    cursor_y: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            cursor_y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn centered(&mut self, text: &str, face: Face, size: f32) {
        let text = to_latin1(text);
        let width = text.chars().count() as f32 * size * PT_TO_MM * HELVETICA_AVG_WIDTH;
        let x = ((PAGE_WIDTH - width) / 2.0).max(MARGIN);
        self.place(text, face, size, x);
    }

    fn line(&mut self, text: &str, face: Face, size: f32) {
        self.place(to_latin1(text), face, size, MARGIN);
    }

    /// Monospaced text wrapped at the right margin. Each input line starts
    /// a new output line; blank input lines are kept.
    fn wrapped(&mut self, text: &str, size: f32) {
        let per_line = (((PAGE_WIDTH - 2.0 * MARGIN) / (size * PT_TO_MM * COURIER_WIDTH)) as usize).max(1);
        for source_line in text.split('\n') {
            let chars: Vec<char> = to_latin1(source_line.trim()).chars().collect();
            if chars.is_empty() {
                self.place(String::new(), Face::Mono, size, MARGIN);
                continue;
            }
            for chunk in chars.chunks(per_line) {
                self.place(chunk.iter().collect(), Face::Mono, size, MARGIN);
            }
        }
    }

    fn space(&mut self, mm: f32) {
        self.cursor_y -= mm;
    }

    fn place(&mut self, text: String, face: Face, size: f32, x: f32) {
        let leading = size * LEADING * PT_TO_MM;
        if self.cursor_y - leading < MARGIN {
            self.pages.push(Vec::new());
            self.cursor_y = PAGE_HEIGHT - MARGIN;
        }
        self.cursor_y -= leading;
        if text.is_empty() {
            return;
        }
        if let Some(page) = self.pages.last_mut() {
            page.push(PlacedText {
                text,
                face,
                size,
                x,
                y: self.cursor_y,
            });
        }
    }
}

/// Map to the Latin-1 range the built-in fonts can show. Tabs become four
/// spaces; control characters and everything above U+00FF become `?`.
fn to_latin1(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\t' => out.push_str("    "),
            c if c.is_control() || u32::from(c) > 0xFF => out.push('?'),
            c => out.push(c),
        }
    }
    out
}

/// Writes `audit_report_<uuid>.pdf` files into `reports_dir`.
#[derive(Debug, Clone)]
pub struct PdfReportWriter {
    reports_dir: PathBuf,
}

impl PdfReportWriter {
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
        }
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    fn write(&self, platform: Platform, results: &RunResult) -> Result<PathBuf, ReportError> {
        std::fs::create_dir_all(&self.reports_dir)?;
        let file_name = format!("audit_report_{}.pdf", uuid::Uuid::new_v4());
        let path = std::path::absolute(self.reports_dir.join(file_name))?;
        save(&layout(platform, results), &path)?;
        Ok(path)
    }
}

/// Script sections follow execution order; every output line is trimmed
/// and wrapped.
fn layout(platform: Platform, results: &RunResult) -> Layout {
    let generated_on = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");

    let mut layout = Layout::new();
    layout.centered(TITLE, Face::Bold, 14.0);
    layout.line(&format!("OS: {platform}"), Face::Regular, 12.0);
    layout.line(&format!("Generated on: {generated_on}"), Face::Regular, 12.0);
    layout.space(3.5);

    for (script_id, output) in results.iter() {
        layout.line(script_id, Face::Bold, 12.0);
        layout.wrapped(&output, 9.0);
        layout.space(1.8);
    }

    layout
}

fn save(layout: &Layout, path: &Path) -> Result<(), ReportError> {
    let (doc, first_page, first_layer) =
        PdfDocument::new(TITLE, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);

    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(ReportError::Pdf)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(ReportError::Pdf)?;
    let mono = doc
        .add_builtin_font(BuiltinFont::Courier)
        .map_err(ReportError::Pdf)?;

    for (index, page) in layout.pages.iter().enumerate() {
        let (page_index, layer_index) = if index == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER)
        };
        let layer = doc.get_page(page_index).get_layer(layer_index);
        for placed in page {
            let font: &IndirectFontRef = match placed.face {
                Face::Regular => &regular,
                Face::Bold => &bold,
                Face::Mono => &mono,
            };
            layer.use_text(
                placed.text.as_str(),
                placed.size,
                Mm(placed.x),
                Mm(placed.y),
                font,
            );
        }
    }

    let mut out = BufWriter::new(File::create(path)?);
    doc.save(&mut out).map_err(ReportError::Pdf)?;
    out.flush()?;
    Ok(())
}

impl ReportWriter for PdfReportWriter {
    fn generate(&self, platform: Platform, results: &RunResult) -> Option<PathBuf> {
        match self.write(platform, results) {
            Ok(path) => {
                tracing::info!(
                    path = %path.display(),
                    scripts = results.len(),
                    "Audit report written"
                );
                Some(path)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    reports_dir = %self.reports_dir.display(),
                    "Failed to write audit report"
                );
                None
            }
        }
    }
}
