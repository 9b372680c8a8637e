//! Prompt assembly and source listing for retrieved chunks

use std::path::Path;

use crate::index::RetrievedChunk;

/// Instructions sent as the preamble of every answer request
pub const ANSWER_INSTRUCTIONS: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

/// Separator between chunk texts in the context block
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// "Stuff" every retrieved chunk into one prompt, followed by the question
pub fn build_prompt(chunks: &[RetrievedChunk], question: &str) -> String {
    let context = chunks
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR);

    format!("{}\n\nQuestion: {}\nHelpful Answer:", context, question)
}

/// Base filenames of the chunks' sources, deduplicated in retrieval order.
/// Chunks without a source are skipped.
pub fn distinct_sources(chunks: &[RetrievedChunk]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for chunk in chunks {
        let Some(name) = Path::new(&chunk.metadata.source)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
        else {
            continue;
        };
        if !name.is_empty() && !sources.contains(&name) {
            sources.push(name);
        }
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::DocumentMetadata;

    fn retrieved(text: &str, source: &str) -> RetrievedChunk {
        RetrievedChunk {
            text: text.to_string(),
            metadata: DocumentMetadata {
                source: source.to_string(),
                ..Default::default()
            },
            position: 0,
            distance: 0.1,
        }
    }

    #[test]
    fn test_build_prompt_stuffs_all_chunks() {
        let chunks = vec![
            retrieved("Kütüphane 09:00'da açılır.", "dataset/texts/a.txt"),
            retrieved("Kayıtlar Eylül'de başlar.", "dataset/texts/b.txt"),
        ];

        let prompt = build_prompt(&chunks, "Kütüphane kaçta açılır?");

        assert_eq!(
            prompt,
            "Kütüphane 09:00'da açılır.\n\nKayıtlar Eylül'de başlar.\n\n\
             Question: Kütüphane kaçta açılır?\nHelpful Answer:"
        );
    }

    #[test]
    fn test_distinct_sources() {
        let chunks = vec![
            retrieved("a", "dataset/texts/duyuru.txt"),
            retrieved("b", "dataset/documents/pdf/takvim.pdf"),
            retrieved("c", "dataset/texts/duyuru.txt"),
            retrieved("d", ""),
        ];

        assert_eq!(
            distinct_sources(&chunks),
            vec!["duyuru.txt".to_string(), "takvim.pdf".to_string()]
        );
    }
}
