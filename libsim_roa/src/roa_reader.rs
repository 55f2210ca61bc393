use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::constants::{ROA_FORMAT_LINE, ROA_TYPE_LINE};
use super::error::RoaReaderError;
use super::event::{EventTime, StripAxis};

const UH_FIELD_COUNT: usize = 7;

/// One `UH` line of an ROA file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoaHit {
    pub detector: u32,
    pub axis: StripAxis,
    pub strip: u32,
    pub adc: i64,
    pub timing: i64,
    pub has_timing: bool,
    pub has_trigger: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoaEvent {
    pub time: Option<EventTime>,
    pub hits: Vec<RoaHit>,
}

/// A parsed ROA document in the doublesidedstrip adc/timing/trigger flavor
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoaDocument {
    pub events: Vec<RoaEvent>,
}

fn parse_flag(field: &str) -> Option<bool> {
    match field {
        "0" => Some(false),
        "1" => Some(true),
        _ => None,
    }
}

fn parse_hit(fields: &[&str]) -> Option<RoaHit> {
    if fields.len() < UH_FIELD_COUNT {
        return None;
    }
    let axis = match fields[1] {
        "x" => StripAxis::X,
        "y" => StripAxis::Y,
        _ => return None,
    };
    Some(RoaHit {
        detector: fields[0].parse().ok()?,
        axis,
        strip: fields[2].parse().ok()?,
        adc: fields[3].parse().ok()?,
        timing: fields[4].parse().ok()?,
        has_timing: parse_flag(fields[5])?,
        has_trigger: parse_flag(fields[6])?,
    })
}

impl RoaDocument {
    pub fn read_file(path: &Path) -> Result<Self, RoaReaderError> {
        if !path.exists() {
            return Err(RoaReaderError::BadFilePath(path.to_path_buf()));
        }
        Self::parse(BufReader::new(File::open(path)?))
    }

    pub fn parse<R: BufRead>(reader: R) -> Result<Self, RoaReaderError> {
        let mut document = Self::default();
        let mut header_lines = 0;
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_number = idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if header_lines == 0 {
                if trimmed != ROA_TYPE_LINE {
                    return Err(RoaReaderError::BadHeader(ROA_TYPE_LINE));
                }
                header_lines += 1;
                continue;
            } else if header_lines == 1 {
                if trimmed != ROA_FORMAT_LINE {
                    return Err(RoaReaderError::BadHeader(ROA_FORMAT_LINE));
                }
                header_lines += 1;
                continue;
            }

            let fields: Vec<&str> = trimmed.split_whitespace().collect();
            let bad_line = || RoaReaderError::BadLine(line_number, trimmed.to_string());
            match fields[0] {
                "SE" => document.events.push(RoaEvent::default()),
                "TI" => {
                    let event = document
                        .events
                        .last_mut()
                        .ok_or(RoaReaderError::RecordOutsideEvent(line_number))?;
                    let time = fields
                        .get(1)
                        .and_then(|t| EventTime::parse_decimal(t).ok())
                        .ok_or_else(bad_line)?;
                    event.time = Some(time);
                }
                "UH" => {
                    let event = document
                        .events
                        .last_mut()
                        .ok_or(RoaReaderError::RecordOutsideEvent(line_number))?;
                    event.hits.push(parse_hit(&fields[1..]).ok_or_else(bad_line)?);
                }
                _ => return Err(bad_line()),
            }
        }

        if header_lines < 2 {
            return Err(RoaReaderError::BadHeader(if header_lines == 0 {
                ROA_TYPE_LINE
            } else {
                ROA_FORMAT_LINE
            }));
        }
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document() {
        let text = "TYPE ROA
UF doublesidedstrip adc_timing_hastiming_hastrigger
SE
TI 3.000000250
UH 1 x 12 8192 64 1 1 
UH 2 y 3 16384 128 0 1
SE
TI 4.000000000
";
        let document = RoaDocument::parse(text.as_bytes()).unwrap();
        assert_eq!(document.events.len(), 2);
        let first = &document.events[0];
        assert_eq!(first.time, Some(EventTime::new(3, 250)));
        assert_eq!(
            first.hits[1],
            RoaHit {
                detector: 2,
                axis: StripAxis::Y,
                strip: 3,
                adc: 16384,
                timing: 128,
                has_timing: false,
                has_trigger: true,
            }
        );
        assert!(document.events[1].hits.is_empty());
    }

    #[test]
    fn test_bad_documents() {
        assert!(matches!(
            RoaDocument::parse("SE\n".as_bytes()),
            Err(RoaReaderError::BadHeader("TYPE ROA"))
        ));
        assert!(matches!(
            RoaDocument::parse("TYPE ROA\nUF something else\n".as_bytes()),
            Err(RoaReaderError::BadHeader(_))
        ));
        assert!(matches!(
            RoaDocument::parse("TYPE ROA\n".as_bytes()),
            Err(RoaReaderError::BadHeader(_))
        ));
        let header = "TYPE ROA\nUF doublesidedstrip adc_timing_hastiming_hastrigger\n";
        assert!(matches!(
            RoaDocument::parse(format!("{header}UH 1 x 1 1 1 1 1\n").as_bytes()),
            Err(RoaReaderError::RecordOutsideEvent(3))
        ));
        assert!(matches!(
            RoaDocument::parse(format!("{header}SE\nUH 1 z 1 1 1 1 1\n").as_bytes()),
            Err(RoaReaderError::BadLine(4, _))
        ));
        assert!(matches!(
            RoaDocument::parse(format!("{header}SE\nUH 1 x 1 1 1 2 1\n").as_bytes()),
            Err(RoaReaderError::BadLine(4, _))
        ));
        assert!(matches!(
            RoaDocument::parse(format!("{header}XX\n").as_bytes()),
            Err(RoaReaderError::BadLine(3, _))
        ));
    }
}
