use docqa_core::{
    extract_document, ChunkingConfig, Pipeline, PipelineComponents, PipelineOptions, SetupStage,
};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::Path;
use tempfile::tempdir;

/// Writes a PDF whose pages hold one text line per `BT ... ET` block.
fn write_pdf(path: &Path, pages: &[Vec<&str>]) -> Result<(), Box<dyn std::error::Error>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        for (row, line) in lines.iter().enumerate() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            operations.push(Operation::new(
                "Td",
                vec![72.into(), (760 - 16 * row as i64).into()],
            ));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("El ingenioso hidalgo"),
        "Author" => Object::string_literal("Miguel de Cervantes"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.save(path)?;
    Ok(())
}

fn sample_pages() -> Vec<Vec<&'static str>> {
    vec![
        vec![
            "DON QUIXOTE",
            "In a village of La Mancha whose name",
            "I do not care to remember there lived",
            "1",
        ],
        vec![
            "DON QUIXOTE",
            "not long ago one of those gentlemen who",
            "keep a lance in the lance-rack",
            "2",
        ],
        vec![
            "DON QUIXOTE",
            "an ancient buckler a skinny nag and",
            "a greyhound for coursing",
            "3",
        ],
    ]
}

#[test]
fn extraction_reads_pages_and_info_dictionary() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let pdf = dir.path().join("quixote.pdf");
    write_pdf(&pdf, &sample_pages())?;

    let document = extract_document(&pdf)?;
    assert_eq!(document.pages.len(), 3);
    assert!(document.pages[0].text.contains("In a village of La Mancha"));
    assert_eq!(
        document.metadata.get("title").map(String::as_str),
        Some("El ingenioso hidalgo")
    );
    assert_eq!(
        document.metadata.get("author").map(String::as_str),
        Some("Miguel de Cervantes")
    );
    Ok(())
}

#[test]
fn pdf_to_answers_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let pdf = dir.path().join("quixote.pdf");
    write_pdf(&pdf, &sample_pages())?;

    let mut options = PipelineOptions::new(&pdf, dir.path().join("cache"));
    options.chunking = ChunkingConfig {
        chunk_size: 10,
        overlap: 3,
    };

    let context = Pipeline::new(options.clone(), PipelineComponents::offline(96)).prepare()?;
    assert_eq!(context.recomputed_stages().len(), 3);

    let cleaned = std::fs::read_to_string(dir.path().join("cache").join("cleaned.txt"))?;
    assert!(!cleaned.contains("DON QUIXOTE"));
    assert!(!cleaned.lines().any(|line| line.trim() == "2"));
    assert!(cleaned.contains("lance-rack"));

    assert!(context.chunks().iter().any(|chunk| chunk.contains("greyhound")));

    let answer = context.answer("a skinny nag and a greyhound", 3)?;
    assert_eq!(answer.hits.len(), 3);
    assert!(answer
        .hits
        .windows(2)
        .all(|pair| pair[0].distance <= pair[1].distance));
    for hit in &answer.hits {
        assert_eq!(hit.text, context.chunks()[hit.chunk_index]);
    }
    assert!(answer.index_build_time > std::time::Duration::ZERO);

    let last = context.chunks().len() - 1;
    let exact = context.answer(&context.chunks()[last], 1)?;
    assert_eq!(exact.hits[0].chunk_index, last);
    assert!(exact.hits[0].distance < 1e-6);

    let reloaded = Pipeline::new(options, PipelineComponents::offline(96)).prepare()?;
    assert!(reloaded.recomputed_stages().is_empty());
    assert_eq!(reloaded.index_build_time(), std::time::Duration::ZERO);
    assert_eq!(
        reloaded.metadata().get("author").map(String::as_str),
        Some("Miguel de Cervantes")
    );
    let again = reloaded.answer("a skinny nag and a greyhound", 3)?;
    assert_eq!(answer.hits, again.hits);
    assert!(!reloaded
        .recomputed_stages()
        .contains(&SetupStage::NeedEmbeddingsAndIndex));
    Ok(())
}
