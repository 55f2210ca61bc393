use rand::Rng;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::constants::{ROA_FORMAT_LINE, ROA_TYPE_LINE};
use super::detector_ids::DetectorIdTable;
use super::encoding::EnergyEncoder;
use super::error::RoaWriterError;
use super::event::{ReconstructedEvent, SubRecord};

/// Counters describing what a writer emitted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmitSummary {
    pub n_events: u64,
    pub n_strip_hits: u64,
    pub n_skipped_records: u64,
}

/// RoaWriter serializes reconstructed events into the ROA text format.
///
/// The two header lines are written on creation. Each event becomes an `SE` line, a `TI` line
/// and one `UH` line per strip hit:
///
/// ```text
/// UH <detector> <x|y> <strip> <energy code> <depth code> <has depth> <has trigger>
/// ```
///
/// Sub-records which are not strip hits are skipped.
#[derive(Debug)]
pub struct RoaWriter<W: Write> {
    writer: W,
    summary: EmitSummary,
}

impl RoaWriter<BufWriter<File>> {
    /// Create (or truncate) the file at path and write the header
    pub fn create(path: &Path) -> Result<Self, RoaWriterError> {
        let file =
            File::create(path).map_err(|e| RoaWriterError::CreateError(path.to_path_buf(), e))?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> RoaWriter<W> {
    pub fn new(mut writer: W) -> Result<Self, RoaWriterError> {
        writeln!(writer, "{ROA_TYPE_LINE}")?;
        writeln!(writer, "{ROA_FORMAT_LINE}")?;
        Ok(Self {
            writer,
            summary: EmitSummary::default(),
        })
    }

    /// Write one event block. Detector IDs are remapped as they are encountered here, so the
    /// dense IDs follow the order in which events are written.
    pub fn write_event<R: Rng>(
        &mut self,
        event: &ReconstructedEvent,
        detector_ids: &mut DetectorIdTable,
        encoder: &mut EnergyEncoder<R>,
    ) -> Result<(), RoaWriterError> {
        writeln!(self.writer, "SE")?;
        writeln!(self.writer, "TI {}", event.time)?;
        for record in event.records.iter() {
            let hit = match record {
                SubRecord::Strip(hit) => hit,
                SubRecord::Other(_) => {
                    self.summary.n_skipped_records += 1;
                    continue;
                }
            };
            let dense_id = detector_ids.remap(hit.detector_id);
            let encoded = encoder.encode(hit);
            writeln!(
                self.writer,
                "UH {} {} {} {} {} {} {}",
                dense_id,
                hit.axis,
                hit.strip,
                encoded.energy_code,
                encoded.depth_code,
                encoded.depth_flag,
                encoded.trigger_flag
            )?;
            self.summary.n_strip_hits += 1;
        }
        self.summary.n_events += 1;
        Ok(())
    }

    pub fn summary(&self) -> &EmitSummary {
        &self.summary
    }

    /// Flush and hand back the underlying writer
    pub fn close(mut self) -> Result<(W, EmitSummary), RoaWriterError> {
        self.writer.flush()?;
        Ok((self.writer, self.summary))
    }
}

/// Write a full ROA document for events that are already in time order
pub fn emit<W: Write, R: Rng>(
    events: &[ReconstructedEvent],
    detector_ids: &mut DetectorIdTable,
    encoder: &mut EnergyEncoder<R>,
    writer: W,
) -> Result<(W, EmitSummary), RoaWriterError> {
    let mut roa = RoaWriter::new(writer)?;
    for event in events {
        roa.write_event(event, detector_ids, encoder)?;
    }
    roa.close()
}
