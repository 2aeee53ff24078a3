use std::io::{self, Write};

use aurora_core::ContentBlock;

/// One display line per block, markdown text passed through untouched.
pub fn block_lines(block: &ContentBlock) -> Vec<String> {
    match block {
        ContentBlock::Text { markdown } => markdown.lines().map(String::from).collect(),
        ContentBlock::Image { url, alt } => vec![format!("[gif: {}] {}", alt, url)],
        ContentBlock::Embed { .. } => {
            vec![format!("[music] {}", block.embed_url().unwrap_or_default())]
        }
    }
}

pub fn print_blocks(blocks: &[ContentBlock], json: bool) -> io::Result<()> {
    let mut stdout = io::stdout().lock();

    if json {
        serde_json::to_writer_pretty(&mut stdout, blocks)?;
        writeln!(stdout)?;
        return Ok(());
    }

    for block in blocks {
        for line in block_lines(block) {
            writeln!(stdout, "{}", line)?;
        }
    }
    Ok(())
}
