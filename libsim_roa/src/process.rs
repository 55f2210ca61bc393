use super::cancel::CancelToken;
use super::config::Config;
use super::detector_ids::DetectorIdTable;
use super::encoding::EnergyEncoder;
use super::error::ProcessorError;
use super::event::EventTime;
use super::geometry::DetectorGeometry;
use super::ingest::{ingest, SourceSummary};
use super::order::order_events;
use super::roa_writer::RoaWriter;
use super::sim_file::SimFile;
use super::worker_status::{ConversionStatus, Stage};

/// Fraction of the events between two progress reports while writing
const PROGRESS_STEP: f32 = 0.01;

/// What a conversion did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionSummary {
    pub sources: Vec<SourceSummary>,
    pub n_events: u64,
    pub n_strip_hits: u64,
    pub n_skipped_records: u64,
    pub n_substituted: u64,
    pub n_detectors: usize,
    pub horizon: EventTime,
    pub interrupted: bool,
}

impl ConversionSummary {
    fn per_horizon_second(&self, count: u64) -> f64 {
        let seconds = self.horizon.as_secs_f64();
        if seconds > 0.0 {
            count as f64 / seconds
        } else {
            0.0
        }
    }

    /// Events per second of simulated time
    pub fn event_rate(&self) -> f64 {
        self.per_horizon_second(self.n_events)
    }

    /// Strip hits per second of simulated time
    pub fn hit_rate(&self) -> f64 {
        self.per_horizon_second(self.n_strip_hits)
    }
}

/// The main loop of sim_roa.
///
/// Loads the geometry, reads every simulation file up to the time horizon (or until the cancel
/// token is set), sorts the events by time and writes them to the ROA output file. Progress is
/// reported through the callback. Nothing is written unless all inputs could be read.
pub fn convert<F: FnMut(ConversionStatus)>(
    config: &Config,
    cancel: &CancelToken,
    mut progress: F,
) -> Result<ConversionSummary, ProcessorError> {
    config.validate()?;
    let horizon = config.horizon()?;

    let geometry_path = config.geometry_path()?;
    log::info!("Loading geometry from {}...", geometry_path.display());
    let geometry = DetectorGeometry::load(geometry_path)?;
    log::info!(
        "Geometry {} loaded with {} detectors.",
        geometry.name,
        geometry.detectors().len()
    );

    log::info!(
        "Total simulation input size: {}",
        human_bytes::human_bytes(config.total_input_size() as f64)
    );
    let n_sources = config.simulation_files.len();
    let sources = config
        .simulation_files
        .iter()
        .enumerate()
        .map(|(idx, path)| {
            progress(ConversionStatus::new(
                Stage::Ingest,
                idx as f32 / n_sources as f32,
            ));
            log::info!("Reading simulation file {}...", path.display());
            SimFile::open(path, &geometry)
        });
    let ingested = ingest(sources, horizon, cancel)?;
    progress(ConversionStatus::new(Stage::Ingest, 1.0));
    if ingested.interrupted {
        log::warn!(
            "Reading was interrupted; writing the {} events read so far.",
            ingested.events.len()
        );
    }

    progress(ConversionStatus::new(Stage::Order, 0.0));
    let mut events = ingested.events;
    order_events(&mut events);
    progress(ConversionStatus::new(Stage::Order, 1.0));

    log::info!(
        "Writing {} events to {}...",
        events.len(),
        config.output_path.display()
    );
    let mut detector_ids = DetectorIdTable::new();
    let mut encoder = EnergyEncoder::from_seed(config.seed);
    let mut writer = RoaWriter::create(&config.output_path)?;
    progress(ConversionStatus::new(Stage::Emit, 0.0));
    let flush_val = ((events.len() as f32 * PROGRESS_STEP) as usize).max(1);
    for (idx, event) in events.iter().enumerate() {
        writer.write_event(event, &mut detector_ids, &mut encoder)?;
        if (idx + 1) % flush_val == 0 {
            progress(ConversionStatus::new(
                Stage::Emit,
                (idx + 1) as f32 / events.len() as f32,
            ));
        }
    }
    let (_, emitted) = writer.close()?;
    progress(ConversionStatus::new(Stage::Emit, 1.0));

    for (raw, dense) in detector_ids.entries() {
        log::debug!("Detector {raw} written as {dense}");
    }

    Ok(ConversionSummary {
        sources: ingested.sources,
        n_events: emitted.n_events,
        n_strip_hits: emitted.n_strip_hits,
        n_skipped_records: emitted.n_skipped_records,
        n_substituted: encoder.n_substituted(),
        n_detectors: detector_ids.len(),
        horizon,
        interrupted: ingested.interrupted,
    })
}
