//! Newline-delimited JSON block source.
//!
//! Stands in for the upstream event stream: each line is one [`SourceBlock`]
//! (header plus invocations). Blocks below the configured starting block are
//! skipped without being parsed further.

use std::path::Path;

use eyre::{eyre, Context, Result};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

use crate::types::SourceBlock;

/// Streams [`SourceBlock`]s from a JSON-lines file.
pub struct JsonLinesSource {
    lines: Lines<BufReader<File>>,
    starting_block: u64,
    line_no: usize,
}

impl JsonLinesSource {
    /// Opens `path` for reading.
    ///
    /// # Errors
    /// Returns error if the file cannot be opened.
    #[tracing::instrument(skip_all, fields(path = %path.display(), starting_block))]
    pub async fn open(path: &Path, starting_block: u64) -> Result<Self> {
        let file = File::open(path)
            .await
            .wrap_err_with(|| format!("failed to open block source: {}", path.display()))?;

        tracing::info!(path = %path.display(), starting_block, "block source opened");

        Ok(Self {
            lines: BufReader::new(file).lines(),
            starting_block,
            line_no: 0,
        })
    }

    /// Returns the next block at or above the starting block, or `None` at EOF.
    ///
    /// Blank lines are ignored.
    ///
    /// # Errors
    /// Returns error on I/O failure or if a line is not a valid block record;
    /// the message carries the line number.
    pub async fn next_block(&mut self) -> Result<Option<SourceBlock>> {
        while let Some(line) = self.lines.next_line().await? {
            self.line_no += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let block: SourceBlock = serde_json::from_str(line)
                .map_err(|e| eyre!("invalid block record on line {}: {}", self.line_no, e))?;

            match block.header.number {
                Some(n) if n < self.starting_block => {
                    tracing::trace!(block_number = n, "skipping block below starting block");
                    continue;
                }
                _ => return Ok(Some(block)),
            }
        }
        Ok(None)
    }
}
