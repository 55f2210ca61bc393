use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::constants::NO_DEPTH_FLAG;
use super::error::SimFileError;
use super::event::{EventTime, OtherHit, ReconstructedEvent, StripAxis, StripHit, SubRecord};
use super::geometry::{Detector, DetectorGeometry, DetectorKind};
use super::ingest::EventSource;

const START_EVENT_TOKEN: &str = "SE";
const END_FILE_TOKEN: &str = "EN";
const TIME_TOKEN: &str = "TI";
const HIT_TOKEN: &str = "HTsim";
const HIT_FIELD_SEPARATOR: char = ';';
const HIT_FIELD_COUNT: usize = 5;

/// An energy deposit as recorded by the simulation, in detector-local coordinates (cm) and keV
#[derive(Debug, Clone)]
struct Deposit<'g> {
    detector: &'g Detector,
    x: f64,
    y: f64,
    z: f64,
    energy: f64,
    line: usize,
}

#[derive(Debug, Default)]
struct PartialEvent<'g> {
    time: Option<EventTime>,
    deposits: Vec<Deposit<'g>>,
}

/// SimFile reads a simulation output file event by event and reconstructs strip hits using the
/// detector geometry.
///
/// Lines before the first `SE` are header and are skipped. Within an event, `TI` gives the event
/// time and each `HTsim` line an energy deposit as `detector;x;y;z;energy`. Any other record is
/// ignored. `EN` (or the end of the file) terminates the file.
#[derive(Debug)]
pub struct SimFile<'g, R: BufRead = BufReader<File>> {
    name: String,
    reader: R,
    geometry: &'g DetectorGeometry,
    line_number: usize,
    current: Option<PartialEvent<'g>>,
    is_ended: bool,
    size_bytes: u64,
    n_dropped_deposits: u64,
}

impl<'g> SimFile<'g> {
    /// Open a simulation file on disk
    pub fn open(path: &Path, geometry: &'g DetectorGeometry) -> Result<Self, SimFileError> {
        if !path.exists() {
            return Err(SimFileError::BadFilePath(path.to_path_buf()));
        }
        let file = File::open(path)?;
        let size_bytes = file.metadata()?.len();
        let mut sim = Self::from_reader(BufReader::new(file), &path.to_string_lossy(), geometry);
        sim.size_bytes = size_bytes;
        Ok(sim)
    }
}

impl<'g, R: BufRead> SimFile<'g, R> {
    pub fn from_reader(reader: R, name: &str, geometry: &'g DetectorGeometry) -> Self {
        Self {
            name: name.to_string(),
            reader,
            geometry,
            line_number: 0,
            current: None,
            is_ended: false,
            size_bytes: 0,
            n_dropped_deposits: 0,
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Number of deposits which fell outside of the strips of their detector
    pub fn n_dropped_deposits(&self) -> u64 {
        self.n_dropped_deposits
    }

    /// Get the next reconstructed event
    ///
    /// Returns a `Result<Option<ReconstructedEvent>>`. The Option is None if the file has no more
    /// events.
    pub fn get_next_event(&mut self) -> Result<Option<ReconstructedEvent>, SimFileError> {
        let mut line = String::new();
        while !self.is_ended {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                self.is_ended = true;
                break;
            }
            self.line_number += 1;

            let trimmed = line.trim();
            let (token, rest) = match trimmed.split_once(char::is_whitespace) {
                Some((token, rest)) => (token, rest.trim()),
                None => (trimmed, ""),
            };
            match token {
                START_EVENT_TOKEN => {
                    let finished = self.current.replace(PartialEvent::default());
                    if let Some(event) = finished {
                        return Ok(Some(self.reconstruct(event)?));
                    }
                }
                END_FILE_TOKEN => self.is_ended = true,
                TIME_TOKEN => {
                    if let Some(event) = self.current.as_mut() {
                        let time = EventTime::parse_decimal(rest)
                            .map_err(|e| SimFileError::BadTime(self.line_number, e))?;
                        event.time = Some(time);
                    }
                }
                HIT_TOKEN => {
                    if self.current.is_some() {
                        let deposit = self.parse_deposit(rest)?;
                        if let Some(event) = self.current.as_mut() {
                            event.deposits.push(deposit);
                        }
                    }
                }
                _ => (),
            }
        }

        match self.current.take() {
            Some(event) => Ok(Some(self.reconstruct(event)?)),
            None => Ok(None),
        }
    }

    fn parse_deposit(&self, fields: &str) -> Result<Deposit<'g>, SimFileError> {
        let bad_hit = || SimFileError::BadHit(self.line_number, fields.to_string());
        let fields: Vec<&str> = fields.split(HIT_FIELD_SEPARATOR).map(str::trim).collect();
        if fields.len() < HIT_FIELD_COUNT {
            return Err(bad_hit());
        }
        let geometry: &'g DetectorGeometry = self.geometry;
        let detector = geometry.detector(fields[0]).ok_or_else(|| {
            SimFileError::UnknownDetector(self.line_number, fields[0].to_string())
        })?;
        let mut values = [0.0; HIT_FIELD_COUNT - 1];
        for (value, field) in values.iter_mut().zip(fields[1..HIT_FIELD_COUNT].iter()) {
            *value = field.parse().map_err(|_| bad_hit())?;
        }
        Ok(Deposit {
            detector,
            x: values[0],
            y: values[1],
            z: values[2],
            energy: values[3],
            line: self.line_number,
        })
    }

    /// Turn the deposits of an event into sub-records.
    ///
    /// Each deposit in a strip detector fires one strip on each side. Deposits sharing a strip
    /// are merged: energies add, the depth is the energy weighted mean.
    fn reconstruct(
        &mut self,
        event: PartialEvent<'g>,
    ) -> Result<ReconstructedEvent, SimFileError> {
        let time = event.time.ok_or(SimFileError::MissingTime(self.line_number))?;
        let mut reconstructed = ReconstructedEvent::new(time);

        for deposit in event.deposits {
            let detector = deposit.detector;
            let layout = match detector.strips {
                Some(layout) => layout,
                None => {
                    reconstructed.records.push(SubRecord::Other(OtherHit {
                        detector_id: detector.detector_id,
                        energy: deposit.energy,
                    }));
                    continue;
                }
            };

            let (x_strip, y_strip) = match (layout.x_strip(deposit.x), layout.y_strip(deposit.y)) {
                (Some(x), Some(y)) => (x, y),
                _ => {
                    log::warn!(
                        "Deposit at line {} of {} is outside the strips of detector {}; dropping it",
                        deposit.line,
                        self.name,
                        detector.name
                    );
                    self.n_dropped_deposits += 1;
                    continue;
                }
            };

            let has_depth = detector.kind == DetectorKind::Strip3D;
            let depth = if has_depth { deposit.z } else { 0.0 };
            for (axis, strip) in [(StripAxis::X, x_strip), (StripAxis::Y, y_strip)] {
                merge_strip_hit(
                    &mut reconstructed.records,
                    StripHit::new(detector.detector_id, axis, strip, deposit.energy, depth),
                    has_depth,
                );
            }
        }

        Ok(reconstructed)
    }
}

fn merge_strip_hit(records: &mut Vec<SubRecord>, mut hit: StripHit, has_depth: bool) {
    let existing = records.iter_mut().find_map(|record| match record {
        SubRecord::Strip(h)
            if h.detector_id == hit.detector_id && h.axis == hit.axis && h.strip == hit.strip =>
        {
            Some(h)
        }
        _ => None,
    });

    match existing {
        Some(h) => {
            let total = h.energy + hit.energy;
            if total > 0.0 {
                h.depth = (h.depth * h.energy + hit.depth * hit.energy) / total;
            }
            h.energy = total;
        }
        None => {
            if !has_depth {
                hit.add_flag(NO_DEPTH_FLAG);
            }
            records.push(SubRecord::Strip(hit));
        }
    }
}

impl<R: BufRead> EventSource for SimFile<'_, R> {
    type Error = SimFileError;

    fn name(&self) -> String {
        self.name.clone()
    }

    fn next_event(&mut self) -> Result<Option<ReconstructedEvent>, SimFileError> {
        self.get_next_event()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SETUP: &str = "
Strip3D GeD
GeD.DetectorID 11
GeD.StripNumber 8 8
GeD.StripPitch 0.25 0.25

Strip2D SiD
SiD.DetectorID 5
SiD.StripNumber 4 4
SiD.StripPitch 0.5 0.5

Scintillator ACS
ACS.DetectorID 90
";

    fn geometry() -> DetectorGeometry {
        DetectorGeometry::parse(SETUP).unwrap()
    }

    fn read_all(
        text: &str,
        geometry: &DetectorGeometry,
    ) -> Result<Vec<ReconstructedEvent>, SimFileError> {
        let mut sim = SimFile::from_reader(text.as_bytes(), "test", geometry);
        let mut events = Vec::new();
        while let Some(event) = sim.get_next_event()? {
            events.push(event);
        }
        Ok(events)
    }

    #[test]
    fn test_reads_events() {
        let geometry = geometry();
        let text = "\
Type SIM
Version 100
SE
ID 1 1
TI 0.5
HTsim GeD;0.1;-0.9;0.2;300.0
SE
ID 2 2
TI 2.25
HTsim ACS;0;0;0;40
EN
SE
TI 3.0
";
        let events = read_all(text, &geometry).unwrap();
        assert_eq!(events.len(), 2);

        let first = &events[0];
        assert_eq!(first.time, EventTime::new(0, 500_000_000));
        let hits: Vec<&StripHit> = first.strip_hits().collect();
        assert_eq!(hits.len(), 2);
        assert_eq!((hits[0].detector_id, hits[0].axis, hits[0].strip), (11, StripAxis::X, 4));
        assert_eq!((hits[1].axis, hits[1].strip), (StripAxis::Y, 0));
        assert_eq!(hits[0].energy, 300.0);
        assert_eq!(hits[1].depth, 0.2);
        assert!(hits[0].has_depth());

        let second = &events[1];
        assert_eq!(second.strip_hits().count(), 0);
        assert_eq!(
            second.records,
            vec![SubRecord::Other(OtherHit {
                detector_id: 90,
                energy: 40.0
            })]
        );
    }

    #[test]
    fn test_merges_shared_strips() {
        let geometry = geometry();
        let text = "\
SE
TI 1
HTsim GeD;0.1;0.1;0.5;100
HTsim GeD;0.1;-0.6;-0.5;300
";
        let events = read_all(text, &geometry).unwrap();
        let hits: Vec<&StripHit> = events[0].strip_hits().collect();
        // Shared x strip, two different y strips
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].axis, StripAxis::X);
        assert_eq!(hits[0].energy, 400.0);
        assert_eq!(hits[0].depth, -0.25);
        assert_eq!(hits[1].energy, 100.0);
        assert_eq!(hits[2].energy, 300.0);
    }

    #[test]
    fn test_strip_2d_has_no_depth() {
        let geometry = geometry();
        let events = read_all("SE\nTI 1\nHTsim SiD;0.1;0.1;0.3;20\n", &geometry).unwrap();
        for hit in events[0].strip_hits() {
            assert!(!hit.has_depth());
            assert_eq!(hit.depth, 0.0);
        }
    }

    #[test]
    fn test_drops_deposits_outside_strips() {
        let geometry = geometry();
        let mut sim = SimFile::from_reader(
            "SE\nTI 1\nHTsim GeD;5.0;0;0;20\n".as_bytes(),
            "test",
            &geometry,
        );
        let event = sim.get_next_event().unwrap().unwrap();
        assert!(event.records.is_empty());
        assert_eq!(sim.n_dropped_deposits(), 1);
        assert!(sim.get_next_event().unwrap().is_none());
    }

    #[test]
    fn test_errors() {
        let geometry = geometry();
        assert!(matches!(
            read_all("SE\nHTsim GeD;0;0;0;1\nSE\n", &geometry),
            Err(SimFileError::MissingTime(_))
        ));
        assert!(matches!(
            read_all("SE\nTI -4\n", &geometry),
            Err(SimFileError::BadTime(2, _))
        ));
        assert!(matches!(
            read_all("SE\nTI 1\nHTsim Nope;0;0;0;1\n", &geometry),
            Err(SimFileError::UnknownDetector(3, _))
        ));
        assert!(matches!(
            read_all("SE\nTI 1\nHTsim GeD;0;0;1\n", &geometry),
            Err(SimFileError::BadHit(3, _))
        ));
        assert!(matches!(
            read_all("SE\nTI 1\nHTsim GeD;0;zero;0;1\n", &geometry),
            Err(SimFileError::BadHit(3, _))
        ));
    }

    #[test]
    fn test_open_file() {
        let geometry = geometry();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"SE\nTI 4.5\nHTsim GeD;0;0;0;100\n").unwrap();
        let mut sim = SimFile::open(file.path(), &geometry).unwrap();
        assert!(sim.size_bytes() > 0);
        let event = sim.next_event().unwrap().unwrap();
        assert_eq!(event.time.to_string(), "4.500000000");

        assert!(matches!(
            SimFile::open(&file.path().with_extension("nope"), &geometry),
            Err(SimFileError::BadFilePath(_))
        ));
    }
}
