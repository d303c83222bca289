//! Version command.

use std::io::Write;

use anyhow::Result;

pub fn run<W: Write>(writer: &mut W) -> Result<()> {
    writeln!(writer, "playlog-core: {}", playlog_core::VERSION)?;
    Ok(())
}
