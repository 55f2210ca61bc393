//! The acceptance check applied downstream by the front-end FPGA emulation.
//!
//! A hit is valid if its ADC value clears the FPGA threshold. An event is accepted if it has
//! hits in more than two detectors, or if any single detector side has more than one valid hit.
use fxhash::FxHashMap;

use super::constants::FPGA_MIN_VALID_ADC;
use super::event::StripAxis;
use super::roa_reader::{RoaDocument, RoaEvent, RoaHit};

const MIN_DETECTORS_AUTO_ACCEPT: usize = 3;
const MIN_VALID_HITS_PER_SIDE: usize = 2;

pub fn is_valid_hit(hit: &RoaHit) -> bool {
    hit.adc >= FPGA_MIN_VALID_ADC
}

pub fn check_event(event: &RoaEvent) -> bool {
    // detector -> (valid x hits, valid y hits)
    let mut detectors: FxHashMap<u32, (usize, usize)> = FxHashMap::default();
    for hit in event.hits.iter() {
        let counts = detectors.entry(hit.detector).or_default();
        if is_valid_hit(hit) {
            match hit.axis {
                StripAxis::X => counts.0 += 1,
                StripAxis::Y => counts.1 += 1,
            }
        }
    }

    if detectors.len() >= MIN_DETECTORS_AUTO_ACCEPT {
        return true;
    }
    detectors
        .values()
        .any(|(x, y)| *x >= MIN_VALID_HITS_PER_SIDE || *y >= MIN_VALID_HITS_PER_SIDE)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FpgaReport {
    pub n_events: usize,
    pub n_accepted: usize,
}

pub fn check_document(document: &RoaDocument) -> FpgaReport {
    FpgaReport {
        n_events: document.events.len(),
        n_accepted: document.events.iter().filter(|e| check_event(e)).count(),
    }
}
