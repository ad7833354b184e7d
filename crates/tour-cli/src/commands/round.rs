//! Round command: floors a raw minute offset to the slot grid.

use std::io::Write;

use anyhow::{Context, Result};
use tour_core::{SlotGranularity, round_offset};

pub fn run<W: Write>(writer: &mut W, offset: i64, slot_minutes: u32) -> Result<()> {
    let slot = SlotGranularity::new(slot_minutes).context("invalid --slot")?;
    let rounded = round_offset(offset, slot);
    tracing::debug!(offset, %slot, rounded, "rounded offset");
    writeln!(writer, "{rounded}")?;
    Ok(())
}
