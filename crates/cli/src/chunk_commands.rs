use std::{io::Write, path::Path, sync::Arc};

use {
    anyhow::Context,
    folio_config::ChunkingConfig,
    folio_gateway::extract::{PdfTextExtractor, extract_blocking, is_pdf_filename},
    folio_retrieval::{Chunk, Chunker},
    tracing::info,
};

pub async fn handle_chunk(path: &Path, chunking: &ChunkingConfig) -> anyhow::Result<()> {
    let chunker = Chunker::new(chunking.chunk_size, chunking.chunk_overlap)?;
    let text = read_document(path).await?;
    let chunks = chunker.split(&text);
    info!(
        path = %path.display(),
        chars = text.chars().count(),
        chunks = chunks.len(),
        "chunked document"
    );

    let mut out = std::io::stdout().lock();
    write_json_lines(&mut out, &chunks)?;
    Ok(())
}

/// PDFs go through the extractor; anything else is read as UTF-8.
async fn read_document(path: &Path) -> anyhow::Result<String> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if is_pdf_filename(name) {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let text = extract_blocking(Arc::new(PdfTextExtractor), bytes.into()).await?;
        return Ok(text);
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

fn write_json_lines(out: &mut impl Write, chunks: &[Chunk]) -> anyhow::Result<()> {
    for chunk in chunks {
        serde_json::to_writer(&mut *out, chunk)?;
        writeln!(out)?;
    }
    Ok(())
}
