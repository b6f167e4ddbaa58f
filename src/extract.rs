//! Local extraction adapter: turns file bytes into ordered [`RawUnit`]s.
//!
//! | Input                                  | Units                        |
//! |----------------------------------------|------------------------------|
//! | `txt` `md` `csv` `json`                | one, lossy UTF-8             |
//! | `pdf`                                  | one per page                 |
//! | `docx`                                 | one                          |
//! | `pptx`                                 | one per slide                |
//! | `xlsx`                                 | one per worksheet            |
//! | `png` `jpg` `jpeg` `webp` `bmp` `tif*` | one, OCR via external binary |
//! | `zip`                                  | entries in name order        |
//!
//! PDFs go through `pdf-extract` first. When it rejects the document the
//! adapter retries page by page with `lopdf`, where a page that cannot be
//! read becomes a degraded unit instead of failing the file. Every ZIP read
//! (OOXML parts and archive entries) is bounded by `extract.max_entry_bytes`.

use std::io::{Read, Seek, Write};
use std::time::Duration;

use async_trait::async_trait;
use quick_xml::events::Event;
use thiserror::Error;

use crate::config::ExtractConfig;
use crate::models::{FileInput, InputCategory, RawUnit};
use crate::traits::UnitExtractor;

pub const ARCHIVE_ENTRY_FAILED: &str = "archive_entry_failed";
pub const ARCHIVE_ENTRY_SKIPPED: &str = "archive_entry_skipped";
pub const LOW_RESOLUTION: &str = "low_resolution";

/// Images narrower or shorter than this OCR poorly.
const MIN_IMAGE_SIDE_PX: u32 = 800;

/// Maximum worksheets read from one workbook.
const XLSX_MAX_SHEETS: usize = 100;
/// Maximum cells read per worksheet.
const XLSX_MAX_CELLS_PER_SHEET: usize = 100_000;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("OOXML extraction failed: {0}")]
    Ooxml(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("OCR timed out after {0}s")]
    OcrTimeout(u64),

    #[error("archive extraction failed: {0}")]
    Archive(String),
}

pub struct LocalExtractor {
    ocr_command: String,
    ocr_timeout: Duration,
    max_entry_bytes: u64,
    max_archive_entries: usize,
}

impl LocalExtractor {
    pub fn new(config: &ExtractConfig) -> Self {
        Self {
            ocr_command: config.ocr_command.clone(),
            ocr_timeout: Duration::from_secs(config.ocr_timeout_secs),
            max_entry_bytes: config.max_entry_bytes,
            max_archive_entries: config.max_archive_entries,
        }
    }

    /// Extracts one non-archive document.
    async fn extract_document(
        &self,
        extension: &str,
        bytes: &[u8],
    ) -> Result<Vec<RawUnit>, ExtractError> {
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        match InputCategory::from_extension(extension) {
            Some(InputCategory::Text) => Ok(vec![RawUnit::text(
                0,
                String::from_utf8_lossy(bytes).into_owned(),
            )]),
            Some(InputCategory::Pdf) => extract_pdf(bytes).await,
            Some(InputCategory::Office) => self.extract_office(extension, bytes),
            Some(InputCategory::Image) => {
                let text = self.ocr(extension, bytes).await?;
                let mut unit = RawUnit::text(0, text);
                if is_low_resolution(bytes) {
                    unit = unit.with_warning(LOW_RESOLUTION);
                }
                Ok(vec![unit])
            }
            _ => Err(ExtractError::UnsupportedContentType(extension.to_string())),
        }
    }

    fn extract_office(&self, extension: &str, bytes: &[u8]) -> Result<Vec<RawUnit>, ExtractError> {
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
            .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
        let texts = match extension {
            "docx" => vec![extract_docx(&mut archive, self.max_entry_bytes)?],
            "pptx" => extract_pptx(&mut archive, self.max_entry_bytes)?,
            "xlsx" => extract_xlsx(&mut archive, self.max_entry_bytes)?,
            other => return Err(ExtractError::UnsupportedContentType(other.to_string())),
        };
        Ok(texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| RawUnit::text(i, text))
            .collect())
    }

    /// Runs `<ocr_command> <image> stdout` and returns what it prints.
    async fn ocr(&self, extension: &str, bytes: &[u8]) -> Result<String, ExtractError> {
        let mut image = tempfile::Builder::new()
            .prefix("ingest-ocr-")
            .suffix(&format!(".{}", extension))
            .tempfile()
            .map_err(|e| ExtractError::Ocr(format!("failed to create temp file: {}", e)))?;
        image
            .write_all(bytes)
            .and_then(|_| image.flush())
            .map_err(|e| ExtractError::Ocr(format!("failed to write temp file: {}", e)))?;

        let run = tokio::process::Command::new(&self.ocr_command)
            .arg(image.path())
            .arg("stdout")
            .kill_on_drop(true)
            .output();
        let output = tokio::time::timeout(self.ocr_timeout, run)
            .await
            .map_err(|_| ExtractError::OcrTimeout(self.ocr_timeout.as_secs()))?
            .map_err(|e| ExtractError::Ocr(format!("failed to run {}: {}", self.ocr_command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::Ocr(format!(
                "{} exited with {}: {}",
                self.ocr_command,
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Extracts every supported entry of a ZIP archive in name order.
    ///
    /// A failing entry becomes a degraded unit. Nested archives and entries
    /// past the entry limit are skipped; skip warnings ride on the first unit.
    /// An archive whose entries were all skipped is an error.
    async fn extract_archive(&self, bytes: &[u8]) -> Result<Vec<RawUnit>, ExtractError> {
        let (entries, skipped) = self.read_archive_entries(bytes)?;

        let mut units: Vec<RawUnit> = Vec::new();
        for (name, extension, content) in entries {
            let content = match content {
                Ok(content) => content,
                Err(reason) => {
                    tracing::warn!(entry = %name, %reason, "archive entry unreadable");
                    units.push(
                        RawUnit::degraded(units.len(), reason).with_warning(ARCHIVE_ENTRY_FAILED),
                    );
                    continue;
                }
            };
            match self.extract_document(&extension, &content).await {
                Ok(entry_units) => {
                    for mut unit in entry_units {
                        unit.unit_index = units.len();
                        units.push(unit);
                    }
                }
                Err(e) => {
                    tracing::warn!(entry = %name, error = %e, "archive entry failed");
                    units.push(
                        RawUnit::degraded(units.len(), format!("{}: {}", name, e))
                            .with_warning(ARCHIVE_ENTRY_FAILED),
                    );
                }
            }
        }

        if units.is_empty() && skipped > 0 {
            return Err(ExtractError::Archive(format!(
                "no supported entries, {} skipped",
                skipped
            )));
        }
        if skipped > 0 {
            tracing::debug!(skipped, "archive entries skipped");
            if let Some(first) = units.first_mut() {
                first.warnings.push(ARCHIVE_ENTRY_SKIPPED.to_string());
            }
        }
        Ok(units)
    }

    /// Reads the supported entries of an archive, sorted by name.
    ///
    /// Returns `(name, extension, bytes or failure reason)` per entry and the
    /// number of skipped entries.
    #[allow(clippy::type_complexity)]
    fn read_archive_entries(
        &self,
        bytes: &[u8],
    ) -> Result<(Vec<(String, String, Result<Vec<u8>, String>)>, usize), ExtractError> {
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
            .map_err(|e| ExtractError::Archive(e.to_string()))?;

        let mut names: Vec<String> = archive
            .file_names()
            .filter(|n| !n.ends_with('/'))
            .map(|s| s.to_string())
            .collect();
        names.sort();

        let mut skipped = 0usize;
        let mut entries = Vec::new();
        for name in names {
            let extension = std::path::Path::new(&name)
                .extension()
                .map(|e| e.to_string_lossy().to_ascii_lowercase())
                .unwrap_or_default();
            match InputCategory::from_extension(&extension) {
                None => continue,
                Some(InputCategory::Archive) => {
                    skipped += 1;
                    continue;
                }
                Some(_) => {}
            }
            if entries.len() >= self.max_archive_entries {
                skipped += 1;
                continue;
            }
            let content = read_zip_entry_bounded(&mut archive, &name, self.max_entry_bytes)
                .map_err(|e| e.to_string());
            entries.push((name, extension, content));
        }
        Ok((entries, skipped))
    }
}

#[async_trait]
impl UnitExtractor for LocalExtractor {
    fn name(&self) -> &str {
        "local"
    }

    async fn extract(&self, input: &FileInput) -> Result<Vec<RawUnit>, ExtractError> {
        let extension = input.effective_extension();
        match InputCategory::from_extension(&extension) {
            Some(InputCategory::Archive) if !input.bytes.is_empty() => {
                self.extract_archive(&input.bytes).await
            }
            Some(InputCategory::Archive) => Ok(Vec::new()),
            Some(_) => self.extract_document(&extension, &input.bytes).await,
            None => Err(ExtractError::UnsupportedContentType(extension)),
        }
    }
}

/// True when the image header decodes to a side under [`MIN_IMAGE_SIDE_PX`].
/// Undecodable headers are left to the OCR engine.
fn is_low_resolution(bytes: &[u8]) -> bool {
    let dimensions = image::ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)
        .and_then(|reader| reader.into_dimensions());
    match dimensions {
        Ok((width, height)) => width < MIN_IMAGE_SIDE_PX || height < MIN_IMAGE_SIDE_PX,
        Err(e) => {
            tracing::debug!(error = %e, "image dimensions unavailable");
            false
        }
    }
}

async fn extract_pdf(bytes: &[u8]) -> Result<Vec<RawUnit>, ExtractError> {
    // pdf-extract can panic on malformed input; the blocking task contains it.
    let owned = bytes.to_vec();
    let primary =
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem_by_pages(&owned))
            .await;
    match primary {
        Ok(Ok(pages)) => {
            return Ok(pages
                .into_iter()
                .enumerate()
                .map(|(i, text)| RawUnit::text(i, text))
                .collect())
        }
        Ok(Err(e)) => tracing::debug!(error = %e, "pdf-extract failed, retrying per page"),
        Err(e) => tracing::warn!(error = %e, "pdf-extract panicked, retrying per page"),
    }

    let owned = bytes.to_vec();
    tokio::task::spawn_blocking(move || extract_pdf_pages(&owned))
        .await
        .map_err(|e| ExtractError::Pdf(e.to_string()))?
}

fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<RawUnit>, ExtractError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;
    let pages = doc.get_pages();
    Ok(pages
        .keys()
        .enumerate()
        .map(|(i, &number)| match doc.extract_text(&[number]) {
            Ok(text) => RawUnit::text(i, text),
            Err(e) => RawUnit::degraded(i, format!("page {}: {}", number, e)),
        })
        .collect())
}

fn read_zip_entry_bounded<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, ExtractError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| ExtractError::Ooxml(format!("{}: {}", name, e)))?;
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .map_err(|e| ExtractError::Ooxml(format!("{}: {}", name, e)))?;
    if out.len() as u64 >= max_bytes {
        return Err(ExtractError::Ooxml(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, max_bytes
        )));
    }
    Ok(out)
}

/// ZIP parts matching `prefix<N>.xml`, in numeric order.
fn numbered_parts<R: Read + Seek>(archive: &zip::ZipArchive<R>, prefix: &str) -> Vec<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with(prefix) && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    names.sort_by_key(|name| {
        name.trim_start_matches(prefix)
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    names
}

fn extract_docx<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
    max_bytes: u64,
) -> Result<String, ExtractError> {
    let xml = read_zip_entry_bounded(archive, "word/document.xml", max_bytes)?;
    ooxml_paragraphs(&xml)
}

fn extract_pptx<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
    max_bytes: u64,
) -> Result<Vec<String>, ExtractError> {
    let slides = numbered_parts(archive, "ppt/slides/slide");
    let mut out = Vec::with_capacity(slides.len());
    for name in slides {
        let xml = read_zip_entry_bounded(archive, &name, max_bytes)?;
        out.push(ooxml_paragraphs(&xml)?);
    }
    Ok(out)
}

fn extract_xlsx<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
    max_bytes: u64,
) -> Result<Vec<String>, ExtractError> {
    // Workbooks without any string cells carry no sharedStrings part.
    let shared_strings = if archive.index_for_name("xl/sharedStrings.xml").is_some() {
        let xml = read_zip_entry_bounded(archive, "xl/sharedStrings.xml", max_bytes)?;
        read_shared_strings(&xml)?
    } else {
        Vec::new()
    };

    let sheets = numbered_parts(archive, "xl/worksheets/sheet");
    let mut out = Vec::new();
    for name in sheets.into_iter().take(XLSX_MAX_SHEETS) {
        let xml = read_zip_entry_bounded(archive, &name, max_bytes)?;
        out.push(extract_sheet_rows(&xml, &shared_strings)?);
    }
    Ok(out)
}

/// Collects `<*:t>` runs and ends a paragraph at every `</*:p>`.
fn ooxml_paragraphs(xml: &[u8]) -> Result<String, ExtractError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_t = true,
            Ok(Event::Text(te)) if in_t => {
                let text = te
                    .unescape()
                    .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
                out.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"p" => out.push_str("\n\n"),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

/// One string per `<si>`, rich-text runs concatenated.
fn read_shared_strings(xml: &[u8]) -> Result<Vec<String>, ExtractError> {
    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_t = true,
                _ => {}
            },
            Ok(Event::Text(te)) if in_t => {
                if let Some(s) = current.as_mut() {
                    let text = te
                        .unescape()
                        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
                    s.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"si" => strings.extend(current.take()),
                b"t" => in_t = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// Cell values of one sheet: cells joined by spaces, rows by newlines.
fn extract_sheet_rows(xml: &[u8], shared_strings: &[String]) -> Result<String, ExtractError> {
    let mut rows: Vec<String> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_v = false;
    let mut shared = false;
    let mut cell_count = 0usize;
    loop {
        if cell_count >= XLSX_MAX_CELLS_PER_SHEET {
            break;
        }
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"c" => {
                    shared = e.attributes().flatten().any(|a| {
                        a.key.local_name().as_ref() == b"t" && a.value.as_ref() == b"s"
                    });
                }
                b"v" | b"t" => in_v = true,
                _ => {}
            },
            Ok(Event::Text(te)) if in_v => {
                let raw = te
                    .unescape()
                    .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
                let value = raw.trim();
                let cell = if value.is_empty() {
                    None
                } else if shared {
                    value
                        .parse::<usize>()
                        .ok()
                        .and_then(|i| shared_strings.get(i).cloned())
                } else {
                    Some(value.to_string())
                };
                if let Some(cell) = cell {
                    row.push(cell);
                    cell_count += 1;
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" | b"t" => in_v = false,
                b"c" => shared = false,
                b"row" => {
                    if !row.is_empty() {
                        rows.push(row.join(" "));
                        row.clear();
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    if !row.is_empty() {
        rows.push(row.join(" "));
    }
    Ok(rows.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UnitStatus;

    fn extractor() -> LocalExtractor {
        LocalExtractor::new(&ExtractConfig::default())
    }

    fn zip_of(parts: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            for (name, content) in parts {
                zip.start_file(*name, zip::write::SimpleFileOptions::default())
                    .unwrap();
                zip.write_all(content).unwrap();
            }
            zip.finish().unwrap();
        }
        buf
    }

    fn docx(paragraphs: &[&str]) -> Vec<u8> {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
            .collect();
        let xml = format!(
            "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
            body
        );
        zip_of(&[("word/document.xml", xml.as_bytes())])
    }

    fn slide(text: &str) -> String {
        format!(
            "<p:sld xmlns:p=\"p\" xmlns:a=\"a\"><p:cSld><p:spTree><p:sp><p:txBody><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>",
            text
        )
    }

    /// Single-page PDF with a correct xref table.
    fn minimal_pdf(phrase: &str) -> Vec<u8> {
        let stream = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", phrase);
        let mut out = Vec::new();
        out.extend_from_slice(b"%PDF-1.4\n");
        let o1 = out.len();
        out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
        let o2 = out.len();
        out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
        let o3 = out.len();
        out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
        let o4 = out.len();
        out.extend_from_slice(
            format!(
                "4 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
                stream.len(),
                stream
            )
            .as_bytes(),
        );
        let o5 = out.len();
        out.extend_from_slice(
            b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
        );
        let xref_start = out.len();
        out.extend_from_slice(b"xref\n0 6\n");
        out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
        for offset in [o1, o2, o3, o4, o5] {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
        out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
        out.extend_from_slice(b"%%EOF\n");
        out
    }

    async fn extract(name: &str, bytes: Vec<u8>) -> Result<Vec<RawUnit>, ExtractError> {
        extractor().extract(&FileInput::new(name, bytes)).await
    }

    #[tokio::test]
    async fn unsupported_extension_returns_error() {
        let err = extract("setup.exe", b"MZ".to_vec()).await.unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedContentType(_)));
    }

    #[tokio::test]
    async fn text_is_one_lossy_unit() {
        let units = extract("notes.txt", b"caf\xff ok".to_vec()).await.unwrap();
        assert_eq!(units.len(), 1);
        assert!(units[0].raw_text.starts_with("caf"));
        assert!(units[0].raw_text.ends_with(" ok"));
    }

    #[tokio::test]
    async fn zero_bytes_yield_zero_units() {
        for name in ["empty.txt", "empty.pdf", "empty.zip"] {
            assert!(extract(name, Vec::new()).await.unwrap().is_empty(), "{name}");
        }
    }

    #[tokio::test]
    async fn invalid_pdf_returns_error() {
        let err = extract("broken.pdf", b"not a pdf".to_vec()).await.unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[tokio::test]
    async fn pdf_yields_one_unit_per_page() {
        let units = extract("one.pdf", minimal_pdf("quarterly numbers"))
            .await
            .unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].unit_index, 0);
        assert!(units[0].raw_text.contains("quarterly numbers"));
    }

    #[tokio::test]
    async fn invalid_zip_returns_error_for_docx() {
        let err = extract("a.docx", b"not a zip".to_vec()).await.unwrap_err();
        assert!(matches!(err, ExtractError::Ooxml(_)));
    }

    #[tokio::test]
    async fn docx_keeps_paragraph_breaks() {
        let units = extract("memo.docx", docx(&["First paragraph", "Second &amp; last"]))
            .await
            .unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].raw_text, "First paragraph\n\nSecond & last\n\n");
    }

    #[tokio::test]
    async fn pptx_yields_one_unit_per_slide_in_numeric_order() {
        let s1 = slide("Intro");
        let s2 = slide("Roadmap");
        let s10 = slide("Questions");
        let bytes = zip_of(&[
            ("ppt/slides/slide10.xml", s10.as_bytes()),
            ("ppt/slides/slide2.xml", s2.as_bytes()),
            ("ppt/slides/slide1.xml", s1.as_bytes()),
        ]);
        let units = extract("deck.pptx", bytes).await.unwrap();
        let texts: Vec<_> = units.iter().map(|u| u.raw_text.trim()).collect();
        assert_eq!(texts, vec!["Intro", "Roadmap", "Questions"]);
        assert_eq!(units[2].unit_index, 2);
    }

    #[tokio::test]
    async fn xlsx_yields_one_unit_per_sheet() {
        let shared = r#"<sst><si><t>Region</t></si><si><r><t>No</t></r><r><t>rth</t></r></si></sst>"#;
        let sheet1 = r#"<worksheet><sheetData><row><c t="s"><v>0</v></c><c><v>42</v></c></row><row><c t="s"><v>1</v></c></row></sheetData></worksheet>"#;
        let sheet2 = r#"<worksheet><sheetData><row><c><v>7</v></c></row></sheetData></worksheet>"#;
        let bytes = zip_of(&[
            ("xl/sharedStrings.xml", shared.as_bytes()),
            ("xl/worksheets/sheet1.xml", sheet1.as_bytes()),
            ("xl/worksheets/sheet2.xml", sheet2.as_bytes()),
        ]);
        let units = extract("book.xlsx", bytes).await.unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].raw_text, "Region 42\nNorth");
        assert_eq!(units[1].raw_text, "7");
    }

    #[tokio::test]
    async fn archive_entries_in_name_order_with_failures_degraded() {
        let inner_docx = docx(&["from docx"]);
        let bytes = zip_of(&[
            ("b.txt", b"second entry".as_slice()),
            ("a.txt", b"first entry".as_slice()),
            ("c.pdf", b"garbage".as_slice()),
            ("d.docx", inner_docx.as_slice()),
            ("nested.zip", b"PK".as_slice()),
            ("readme", b"no extension".as_slice()),
        ]);
        let units = extract("bundle.zip", bytes).await.unwrap();
        assert_eq!(units.len(), 4);
        assert_eq!(units[0].raw_text, "first entry");
        assert_eq!(units[1].raw_text, "second entry");
        assert!(matches!(units[2].status, UnitStatus::Degraded { .. }));
        assert!(units[2].warnings.contains(&ARCHIVE_ENTRY_FAILED.to_string()));
        assert!(units[3].raw_text.contains("from docx"));
        for (i, unit) in units.iter().enumerate() {
            assert_eq!(unit.unit_index, i);
        }
        assert!(units[0].warnings.contains(&ARCHIVE_ENTRY_SKIPPED.to_string()));
    }

    #[tokio::test]
    async fn archive_with_only_skipped_entries_is_an_error() {
        let bytes = zip_of(&[
            ("setup.exe", b"MZ".as_slice()),
            ("inner.zip", b"PK".as_slice()),
        ]);
        let err = extract("bundle.zip", bytes).await.unwrap_err();
        assert!(matches!(err, ExtractError::Archive(_)), "{err}");
        assert!(err.to_string().contains("1 skipped"), "{err}");
    }

    #[tokio::test]
    async fn archive_with_only_unsupported_entries_yields_no_units() {
        let bytes = zip_of(&[("setup.exe", b"MZ".as_slice())]);
        assert!(extract("tools.zip", bytes).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn archive_entry_limit_skips_the_rest() {
        let config = ExtractConfig {
            max_archive_entries: 1,
            ..ExtractConfig::default()
        };
        let bytes = zip_of(&[("a.txt", b"one".as_slice()), ("b.txt", b"two".as_slice())]);
        let units = LocalExtractor::new(&config)
            .extract(&FileInput::new("two.zip", bytes))
            .await
            .unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].warnings, vec![ARCHIVE_ENTRY_SKIPPED]);
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height))
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn small_images_are_low_resolution() {
        assert!(is_low_resolution(&png(64, 64)));
        assert!(is_low_resolution(&png(1200, 600)));
        assert!(!is_low_resolution(&png(800, 800)));
    }

    #[test]
    fn undecodable_image_header_is_not_flagged() {
        assert!(!is_low_resolution(&[1, 2, 3]));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn low_resolution_scan_carries_a_warning() {
        let config = ExtractConfig {
            ocr_command: "echo".to_string(),
            ..ExtractConfig::default()
        };
        let units = LocalExtractor::new(&config)
            .extract(&FileInput::new("scan.png", png(32, 32)))
            .await
            .unwrap();
        assert_eq!(units[0].warnings, vec![LOW_RESOLUTION]);
    }

    #[tokio::test]
    async fn missing_ocr_binary_is_an_error() {
        let config = ExtractConfig {
            ocr_command: "definitely-not-an-ocr-binary".to_string(),
            ..ExtractConfig::default()
        };
        let err = LocalExtractor::new(&config)
            .extract(&FileInput::new("scan.png", vec![0x89, b'P', b'N', b'G']))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Ocr(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn ocr_output_becomes_the_unit_text() {
        // `echo <file> stdout` stands in for `tesseract <file> stdout`.
        let config = ExtractConfig {
            ocr_command: "echo".to_string(),
            ..ExtractConfig::default()
        };
        let units = LocalExtractor::new(&config)
            .extract(&FileInput::new("scan.png", vec![1, 2, 3]))
            .await
            .unwrap();
        assert_eq!(units.len(), 1);
        assert!(units[0].raw_text.trim_end().ends_with("stdout"));
    }
}
