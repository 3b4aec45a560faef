//! services/api/src/adapters/extract.rs
//!
//! Text extraction adapter: the concrete implementation of the
//! `TextExtractionService` port. PDFs go through `pdf-extract`; PowerPoint
//! decks are opened as zip archives and their slide XML is walked for text
//! runs. Parsing is CPU-bound, so it runs on the blocking pool.

use std::io::{Cursor, Read};

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

use quizforge_core::domain::FileFormat;
use quizforge_core::ports::{PortError, PortResult, TextExtractionService};

/// Extracts plain text from uploaded documents, dispatching on format.
#[derive(Clone, Default)]
pub struct DocumentExtractor;

impl DocumentExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextExtractionService for DocumentExtractor {
    async fn extract(&self, format: FileFormat, content: &[u8]) -> PortResult<String> {
        let content = content.to_vec();
        let result = tokio::task::spawn_blocking(move || match format {
            FileFormat::Pdf => extract_pdf(&content),
            // Legacy binary .ppt decks are not zip archives; they fail here
            // and surface as a failed document, same as any unreadable file.
            FileFormat::Ppt | FileFormat::Pptx => extract_slides(&content),
        })
        .await
        .map_err(|e| PortError::Unexpected(format!("extraction task panicked: {e}")))?;
        result
    }
}

fn extract_pdf(content: &[u8]) -> PortResult<String> {
    let pages = pdf_extract::extract_text_from_mem(content)
        .map_err(|e| PortError::Unexpected(format!("could not read PDF: {e}")))?;
    Ok(pages)
}

/// Walks the slide XML of a PowerPoint archive and concatenates the text of
/// every `<a:t>` run, slides in document order, one line per run. Slides or
/// shapes without text contribute nothing.
fn extract_slides(content: &[u8]) -> PortResult<String> {
    let mut archive = ZipArchive::new(Cursor::new(content))
        .map_err(|e| PortError::Unexpected(format!("could not open presentation: {e}")))?;

    let mut slides: Vec<(u32, String)> = Vec::new();
    for i in 0..archive.len() {
        let name = archive
            .by_index(i)
            .map_err(|e| PortError::Unexpected(format!("could not read archive entry: {e}")))?
            .name()
            .to_string();
        if let Some(index) = slide_index(&name) {
            slides.push((index, name));
        }
    }
    slides.sort();

    let mut text = String::new();
    for (_, name) in slides {
        let mut entry = archive
            .by_name(&name)
            .map_err(|e| PortError::Unexpected(format!("could not read slide {name}: {e}")))?;
        let mut xml = String::new();
        entry
            .read_to_string(&mut xml)
            .map_err(|e| PortError::Unexpected(format!("could not read slide {name}: {e}")))?;
        for run in slide_text_runs(&xml)? {
            text.push_str(&run);
            text.push('\n');
        }
    }
    Ok(text)
}

/// Matches `ppt/slides/slideN.xml` and yields N for ordering.
fn slide_index(entry_name: &str) -> Option<u32> {
    let rest = entry_name.strip_prefix("ppt/slides/slide")?;
    let digits = rest.strip_suffix(".xml")?;
    digits.parse().ok()
}

/// Collects the contents of every `<a:t>` element in a slide document.
fn slide_text_runs(xml: &str) -> PortResult<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut runs = Vec::new();
    let mut in_text_run = false;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"a:t" => in_text_run = true,
            Ok(Event::End(e)) if e.name().as_ref() == b"a:t" => in_text_run = false,
            Ok(Event::Text(t)) if in_text_run => {
                let run = t
                    .unescape()
                    .map_err(|e| PortError::Unexpected(format!("malformed slide text: {e}")))?;
                if !run.is_empty() {
                    runs.push(run.into_owned());
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(PortError::Unexpected(format!("malformed slide XML: {e}")));
            }
        }
        buf.clear();
    }
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    const SLIDE_XML: &str = r#"<?xml version="1.0"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"
       xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
  <p:cSld><p:spTree>
    <p:sp><p:txBody><a:p><a:r><a:t>Hello World</a:t></a:r></a:p></p:txBody></p:sp>
    <p:sp><p:txBody><a:p><a:r><a:t></a:t></a:r></a:p></p:txBody></p:sp>
  </p:spTree></p:cSld>
</p:sld>"#;

    fn deck(slides: &[(&str, &str)]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            for (name, xml) in slides {
                writer
                    .start_file(*name, FileOptions::default())
                    .unwrap();
                writer.write_all(xml.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn slide_text_runs_skips_empty_shapes() {
        let runs = slide_text_runs(SLIDE_XML).unwrap();
        assert_eq!(runs, vec!["Hello World".to_string()]);
    }

    #[test]
    fn slides_are_ordered_numerically_not_lexically() {
        assert_eq!(slide_index("ppt/slides/slide2.xml"), Some(2));
        assert_eq!(slide_index("ppt/slides/slide10.xml"), Some(10));
        assert_eq!(slide_index("ppt/slides/_rels/slide1.xml.rels"), None);
        assert_eq!(slide_index("ppt/notesSlides/notesSlide1.xml"), None);
    }

    #[tokio::test]
    async fn extracts_text_across_slides_in_order() {
        let second = SLIDE_XML.replace("Hello World", "Second Slide");
        let bytes = deck(&[
            ("ppt/slides/slide2.xml", second.as_str()),
            ("ppt/slides/slide1.xml", SLIDE_XML),
        ]);

        let extractor = DocumentExtractor::new();
        let text = extractor.extract(FileFormat::Pptx, &bytes).await.unwrap();
        assert_eq!(text, "Hello World\nSecond Slide\n");
    }

    #[tokio::test]
    async fn garbage_bytes_are_an_error_not_a_panic() {
        let extractor = DocumentExtractor::new();
        let result = extractor.extract(FileFormat::Pptx, b"not a zip").await;
        assert!(matches!(result, Err(PortError::Unexpected(_))));
    }
}
