use super::cancel::CancelToken;
use super::event::{EventTime, ReconstructedEvent};

/// A source of reconstructed events, pulled one at a time.
///
/// Returning `Ok(None)` signals the source is exhausted.
pub trait EventSource {
    type Error;

    /// Human readable name, used in logs
    fn name(&self) -> String;

    fn next_event(&mut self) -> Result<Option<ReconstructedEvent>, Self::Error>;
}

/// Why ingestion from a source stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOutcome {
    Exhausted,
    HorizonReached,
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSummary {
    pub name: String,
    pub n_events: usize,
    pub outcome: SourceOutcome,
}

/// The result of ingesting all sources: unordered events plus a per-source record
#[derive(Debug, Default)]
pub struct Ingested {
    pub events: Vec<ReconstructedEvent>,
    pub sources: Vec<SourceSummary>,
    pub interrupted: bool,
}

/// Ingestor collects events from a sequence of sources.
///
/// Each source is read until it is exhausted or yields an event past the time horizon. That
/// event is discarded and nothing else is read from that source, even if later events would
/// fall back under the horizon. The cancel token is checked before every pull; once it is set
/// nothing more is read from any source, but everything already collected is kept.
#[derive(Debug)]
pub struct Ingestor<'a> {
    horizon: EventTime,
    cancel: &'a CancelToken,
    events: Vec<ReconstructedEvent>,
    sources: Vec<SourceSummary>,
}

impl<'a> Ingestor<'a> {
    pub fn new(horizon: EventTime, cancel: &'a CancelToken) -> Self {
        Self {
            horizon,
            cancel,
            events: Vec::new(),
            sources: Vec::new(),
        }
    }

    /// Pull events from a single source
    pub fn ingest_source<S: EventSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<SourceSummary, S::Error> {
        let mut n_events = 0;
        let outcome = loop {
            if self.cancel.is_cancelled() {
                break SourceOutcome::Interrupted;
            }
            match source.next_event()? {
                None => break SourceOutcome::Exhausted,
                Some(event) if event.time > self.horizon => {
                    log::debug!(
                        "Event at {} exceeds time horizon {} in {}",
                        event.time,
                        self.horizon,
                        source.name()
                    );
                    break SourceOutcome::HorizonReached;
                }
                Some(event) => {
                    self.events.push(event);
                    n_events += 1;
                }
            }
        };

        match outcome {
            SourceOutcome::Exhausted => {
                log::info!("Read {} events from {}", n_events, source.name())
            }
            SourceOutcome::HorizonReached => log::info!(
                "Read {} events from {} before reaching the time horizon",
                n_events,
                source.name()
            ),
            SourceOutcome::Interrupted => log::warn!(
                "Interrupted after reading {} events from {}",
                n_events,
                source.name()
            ),
        }

        let summary = SourceSummary {
            name: source.name(),
            n_events,
            outcome,
        };
        self.sources.push(summary.clone());
        Ok(summary)
    }

    pub fn is_interrupted(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn n_events(&self) -> usize {
        self.events.len()
    }

    pub fn finish(self) -> Ingested {
        Ingested {
            interrupted: self.cancel.is_cancelled(),
            events: self.events,
            sources: self.sources,
        }
    }
}

/// Ingest every source in order.
///
/// Sources are given as the results of opening them, and are only consumed as ingestion
/// reaches them, so a source opened lazily is never opened after an interrupt. The first
/// error from opening or reading aborts ingestion.
pub fn ingest<S, I>(
    sources: I,
    horizon: EventTime,
    cancel: &CancelToken,
) -> Result<Ingested, S::Error>
where
    S: EventSource,
    I: IntoIterator<Item = Result<S, S::Error>>,
{
    let mut ingestor = Ingestor::new(horizon, cancel);
    let mut sources = sources.into_iter();
    // Checked before advancing, as advancing may open the next source
    while !ingestor.is_interrupted() {
        let Some(source) = sources.next() else {
            break;
        };
        let mut source = source?;
        ingestor.ingest_source(&mut source)?;
    }
    Ok(ingestor.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct VecSource {
        name: &'static str,
        events: VecDeque<ReconstructedEvent>,
        cancel_after: Option<(usize, CancelToken)>,
        n_pulled: usize,
    }

    impl VecSource {
        fn from_seconds(name: &'static str, seconds: &[u64]) -> Self {
            Self {
                name,
                events: seconds
                    .iter()
                    .map(|s| ReconstructedEvent::new(EventTime::new(*s, 0)))
                    .collect(),
                cancel_after: None,
                n_pulled: 0,
            }
        }
    }

    impl EventSource for VecSource {
        type Error = String;

        fn name(&self) -> String {
            self.name.to_string()
        }

        fn next_event(&mut self) -> Result<Option<ReconstructedEvent>, String> {
            self.n_pulled += 1;
            let event = self.events.pop_front();
            if let Some((n, token)) = &self.cancel_after {
                if self.n_pulled >= *n {
                    token.cancel();
                }
            }
            Ok(event)
        }
    }

    fn seconds(events: &[ReconstructedEvent]) -> Vec<u64> {
        events.iter().map(|e| e.time.seconds()).collect()
    }

    #[test]
    fn test_horizon_per_source() {
        let cancel = CancelToken::new();
        let sources = vec![
            Ok(VecSource::from_seconds("a", &[5, 20])),
            Ok(VecSource::from_seconds("b", &[3])),
        ];
        let ingested = ingest(sources, EventTime::new(10, 0), &cancel).unwrap();
        assert_eq!(seconds(&ingested.events), vec![5, 3]);
        assert_eq!(ingested.sources[0].outcome, SourceOutcome::HorizonReached);
        assert_eq!(ingested.sources[1].outcome, SourceOutcome::Exhausted);
        assert!(!ingested.interrupted);
    }

    #[test]
    fn test_stops_at_first_exceedance() {
        let cancel = CancelToken::new();
        let sources = vec![Ok(VecSource::from_seconds("a", &[1, 11, 2, 3]))];
        let ingested = ingest(sources, EventTime::new(10, 0), &cancel).unwrap();
        assert_eq!(seconds(&ingested.events), vec![1]);
    }

    #[test]
    fn test_event_at_horizon_is_kept() {
        let cancel = CancelToken::new();
        let mut ingestor = Ingestor::new(EventTime::new(10, 0), &cancel);
        let mut source = VecSource::from_seconds("a", &[10]);
        let summary = ingestor.ingest_source(&mut source).unwrap();
        assert_eq!(summary.n_events, 1);
        assert_eq!(summary.outcome, SourceOutcome::Exhausted);
    }

    #[test]
    fn test_empty_source() {
        let cancel = CancelToken::new();
        let sources = vec![
            Ok(VecSource::from_seconds("empty", &[])),
            Ok(VecSource::from_seconds("b", &[4])),
        ];
        let ingested = ingest(sources, EventTime::new(10, 0), &cancel).unwrap();
        assert_eq!(ingested.sources[0].n_events, 0);
        assert_eq!(seconds(&ingested.events), vec![4]);
    }

    #[test]
    fn test_interrupt_keeps_collected_events() {
        let cancel = CancelToken::new();
        let mut first = VecSource::from_seconds("a", &[1, 2, 3, 4]);
        first.cancel_after = Some((2, cancel.clone()));
        let sources = vec![Ok(first), Ok(VecSource::from_seconds("b", &[5]))];
        let ingested = ingest(sources, EventTime::new(10, 0), &cancel).unwrap();
        assert_eq!(seconds(&ingested.events), vec![1, 2]);
        assert_eq!(ingested.sources.len(), 1);
        assert_eq!(ingested.sources[0].outcome, SourceOutcome::Interrupted);
        assert!(ingested.interrupted);
    }

    #[test]
    fn test_no_source_opened_after_interrupt() {
        let cancel = CancelToken::new();
        let mut n_opened = 0;
        let sources = (0..3).map(|_| {
            n_opened += 1;
            let mut source = VecSource::from_seconds("lazy", &[1, 2]);
            source.cancel_after = Some((1, cancel.clone()));
            Ok::<VecSource, String>(source)
        });
        let ingested = ingest(sources, EventTime::new(10, 0), &cancel).unwrap();
        assert_eq!(n_opened, 1);
        assert_eq!(seconds(&ingested.events), vec![1]);
        assert_eq!(ingested.sources.len(), 1);
        assert!(ingested.interrupted);
    }

    #[test]
    fn test_open_error_aborts() {
        let cancel = CancelToken::new();
        let sources = vec![
            Ok(VecSource::from_seconds("a", &[1])),
            Err(String::from("cannot open b")),
        ];
        let result = ingest(sources, EventTime::new(10, 0), &cancel);
        assert_eq!(result.unwrap_err(), "cannot open b");
    }
}
