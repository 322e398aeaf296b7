//! Contiguous context partitioning shared by Refine and Map-Reduce

/// Split `items` into at most `chunk_count` contiguous chunks
///
/// Chunk size is `max(1, len / chunk_count)`. When slicing yields more
/// chunks than requested, the trailing ones are merged into the last kept
/// chunk, so concatenating the result always reproduces `items`.
/// Empty input or `chunk_count == 0` yields no chunks.
pub fn split_into_chunks<T>(items: &[T], chunk_count: usize) -> Vec<&[T]> {
    if items.is_empty() || chunk_count == 0 {
        return Vec::new();
    }

    let size = (items.len() / chunk_count).max(1);
    let mut chunks: Vec<&[T]> = items.chunks(size).collect();

    if chunks.len() > chunk_count {
        let merged_start = (chunk_count - 1) * size;
        chunks.truncate(chunk_count - 1);
        chunks.push(&items[merged_start..]);
    }

    chunks
}

/// Join a chunk of context items into one prompt block
pub(crate) fn join_chunk(chunk: &[String]) -> String {
    chunk.join("\n")
}
