// The geometry here is a stripped down take on a detector setup file. Only the information needed
// to turn energy deposits into strip hits is kept; everything else in a setup file (volumes,
// materials, ...) is skipped over. Declarations are read in a first pass so that properties can
// appear anywhere in the file.
use fxhash::FxHashMap;
use std::path::{Path, PathBuf};

use super::error::GeometryError;

const COMMENT_TOKEN: &str = "//";

/// The kinds of detector the reconstruction understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorKind {
    /// Double-sided strip detector with depth resolution
    Strip3D,
    /// Double-sided strip detector without depth resolution
    Strip2D,
    Scintillator,
}

impl DetectorKind {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "Strip3D" => Some(Self::Strip3D),
            "Strip2D" => Some(Self::Strip2D),
            "Scintillator" => Some(Self::Scintillator),
            _ => None,
        }
    }

    pub fn is_strip(&self) -> bool {
        matches!(self, Self::Strip3D | Self::Strip2D)
    }
}

/// Strip segmentation of one side pair of a double-sided strip detector. Lengths in cm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StripLayout {
    pub n_strips_x: u32,
    pub n_strips_y: u32,
    pub pitch_x: f64,
    pub pitch_y: f64,
}

impl StripLayout {
    /// Strip index along one axis for a detector-local coordinate (origin at the detector
    /// centre). None if the coordinate falls outside the strips.
    fn strip_index(position: f64, n_strips: u32, pitch: f64) -> Option<u32> {
        let half_width = n_strips as f64 * pitch / 2.0;
        let index = ((position + half_width) / pitch).floor();
        if index >= 0.0 && index < n_strips as f64 {
            Some(index as u32)
        } else {
            None
        }
    }

    pub fn x_strip(&self, x: f64) -> Option<u32> {
        Self::strip_index(x, self.n_strips_x, self.pitch_x)
    }

    pub fn y_strip(&self, y: f64) -> Option<u32> {
        Self::strip_index(y, self.n_strips_y, self.pitch_y)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detector {
    pub name: String,
    pub kind: DetectorKind,
    pub detector_id: u32,
    pub strips: Option<StripLayout>,
    pub thickness: Option<f64>,
}

/// A loaded and validated detector geometry
#[derive(Debug, Clone, Default)]
pub struct DetectorGeometry {
    pub name: String,
    pub path: PathBuf,
    detectors: Vec<Detector>,
    by_name: FxHashMap<String, usize>,
}

// Properties collected for a detector before validation
#[derive(Debug, Default)]
struct PendingDetector {
    detector_id: Option<u32>,
    strip_numbers: Option<(u32, u32)>,
    strip_pitches: Option<(f64, f64)>,
    thickness: Option<f64>,
}

fn parse_values<T: std::str::FromStr>(
    values: &[&str],
    count: usize,
    line_number: usize,
    line: &str,
) -> Result<Vec<T>, GeometryError> {
    if values.len() != count {
        return Err(GeometryError::BadLine(line_number, line.to_string()));
    }
    values
        .iter()
        .map(|v| {
            v.parse::<T>()
                .map_err(|_| GeometryError::BadLine(line_number, line.to_string()))
        })
        .collect()
}

impl DetectorGeometry {
    /// Load a geometry setup file
    pub fn load(path: &Path) -> Result<Self, GeometryError> {
        if !path.exists() {
            return Err(GeometryError::BadFilePath(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        let mut geometry = Self::parse(&contents)?;
        geometry.path = path.to_path_buf();
        Ok(geometry)
    }

    /// Parse the contents of a setup file
    pub fn parse(contents: &str) -> Result<Self, GeometryError> {
        let lines: Vec<(usize, &str)> = contents
            .lines()
            .enumerate()
            .map(|(idx, line)| {
                let line = match line.find(COMMENT_TOKEN) {
                    Some(pos) => &line[..pos],
                    None => line,
                };
                (idx + 1, line.trim())
            })
            .filter(|(_, line)| !line.is_empty())
            .collect();

        let mut name = String::new();
        let mut declared: Vec<(String, DetectorKind)> = Vec::new();
        let mut pending: FxHashMap<String, PendingDetector> = FxHashMap::default();

        // Declarations
        for (line_number, line) in lines.iter() {
            let mut tokens = line.split_whitespace();
            let keyword = tokens.next().unwrap_or_default();
            if keyword == "Name" {
                name = tokens.collect::<Vec<&str>>().join(" ");
            } else if let Some(kind) = DetectorKind::from_keyword(keyword) {
                let det_name = match (tokens.next(), tokens.next()) {
                    (Some(n), None) => n.to_string(),
                    _ => return Err(GeometryError::BadLine(*line_number, line.to_string())),
                };
                if pending.contains_key(&det_name) {
                    return Err(GeometryError::DuplicateDetector(det_name));
                }
                pending.insert(det_name.clone(), PendingDetector::default());
                declared.push((det_name, kind));
            }
        }

        if declared.is_empty() {
            return Err(GeometryError::NoDetectors);
        }

        // Properties
        for (line_number, line) in lines.iter() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let (det_name, property) = match tokens[0].split_once('.') {
                Some(split) => split,
                None => continue,
            };
            let det = match pending.get_mut(det_name) {
                Some(d) => d,
                None => continue,
            };
            let values = &tokens[1..];
            match property {
                "DetectorID" => {
                    det.detector_id =
                        Some(parse_values::<u32>(values, 1, *line_number, line)?[0]);
                }
                "StripNumber" => {
                    let v: Vec<u32> = parse_values(values, 2, *line_number, line)?;
                    det.strip_numbers = Some((v[0], v[1]));
                }
                "StripPitch" => {
                    let v: Vec<f64> = parse_values(values, 2, *line_number, line)?;
                    det.strip_pitches = Some((v[0], v[1]));
                }
                "Thickness" => {
                    det.thickness =
                        Some(parse_values::<f64>(values, 1, *line_number, line)?[0]);
                }
                _ => (),
            }
        }

        let mut geometry = Self {
            name,
            ..Default::default()
        };
        for (det_name, kind) in declared {
            let det = pending.remove(&det_name).unwrap_or_default();
            let detector_id = det
                .detector_id
                .ok_or_else(|| GeometryError::MissingProperty(det_name.clone(), "DetectorID"))?;
            let strips = if kind.is_strip() {
                let (n_strips_x, n_strips_y) = det.strip_numbers.ok_or_else(|| {
                    GeometryError::MissingProperty(det_name.clone(), "StripNumber")
                })?;
                let (pitch_x, pitch_y) = det.strip_pitches.ok_or_else(|| {
                    GeometryError::MissingProperty(det_name.clone(), "StripPitch")
                })?;
                if n_strips_x == 0 || n_strips_y == 0 {
                    return Err(GeometryError::InvalidProperty(det_name, "StripNumber"));
                }
                if !(pitch_x > 0.0 && pitch_y > 0.0) {
                    return Err(GeometryError::InvalidProperty(det_name, "StripPitch"));
                }
                Some(StripLayout {
                    n_strips_x,
                    n_strips_y,
                    pitch_x,
                    pitch_y,
                })
            } else {
                None
            };
            geometry
                .by_name
                .insert(det_name.clone(), geometry.detectors.len());
            geometry.detectors.push(Detector {
                name: det_name,
                kind,
                detector_id,
                strips,
                thickness: det.thickness,
            });
        }

        Ok(geometry)
    }

    pub fn detector(&self, name: &str) -> Option<&Detector> {
        self.by_name.get(name).map(|idx| &self.detectors[*idx])
    }

    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SETUP: &str = "
// Test cryostat
Name TestCryostat
Volume World
World.Material Vacuum

Strip3D GeD1
GeD1.DetectorID 11
GeD1.StripNumber 37 37
GeD1.StripPitch 0.2 0.2 // cm
GeD1.Thickness 1.5

Strip2D SiD
SiD.DetectorID 4
SiD.StripNumber 10 20
SiD.StripPitch 0.1 0.05

Scintillator Shield
Shield.DetectorID 90
";

    #[test]
    fn test_parse_setup() {
        let geometry = DetectorGeometry::parse(SETUP).unwrap();
        assert_eq!(geometry.name, "TestCryostat");
        assert_eq!(geometry.detectors().len(), 3);

        let ge = geometry.detector("GeD1").unwrap();
        assert_eq!(ge.kind, DetectorKind::Strip3D);
        assert_eq!(ge.detector_id, 11);
        assert_eq!(ge.thickness, Some(1.5));
        let strips = ge.strips.unwrap();
        assert_eq!(strips.n_strips_x, 37);
        assert_eq!(strips.pitch_y, 0.2);

        let shield = geometry.detector("Shield").unwrap();
        assert_eq!(shield.kind, DetectorKind::Scintillator);
        assert!(shield.strips.is_none());
        assert!(geometry.detector("World").is_none());
    }

    #[test]
    fn test_strip_index() {
        let layout = StripLayout {
            n_strips_x: 8,
            n_strips_y: 4,
            pitch_x: 0.25,
            pitch_y: 0.5,
        };
        assert_eq!(layout.x_strip(-1.0), Some(0));
        assert_eq!(layout.x_strip(0.0), Some(4));
        assert_eq!(layout.x_strip(0.99), Some(7));
        assert_eq!(layout.x_strip(1.01), None);
        assert_eq!(layout.y_strip(-0.99), Some(0));
        assert_eq!(layout.y_strip(-1.01), None);
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(
            DetectorGeometry::parse("Name Empty\n"),
            Err(GeometryError::NoDetectors)
        ));
        assert!(matches!(
            DetectorGeometry::parse("Strip3D A\nStrip2D A\n"),
            Err(GeometryError::DuplicateDetector(_))
        ));
        assert!(matches!(
            DetectorGeometry::parse("Strip3D A\nA.DetectorID 1\nA.StripNumber 2 2\n"),
            Err(GeometryError::MissingProperty(_, "StripPitch"))
        ));
        assert!(matches!(
            DetectorGeometry::parse("Scintillator B\n"),
            Err(GeometryError::MissingProperty(_, "DetectorID"))
        ));
        assert!(matches!(
            DetectorGeometry::parse("Scintillator B\nB.DetectorID one\n"),
            Err(GeometryError::BadLine(2, _))
        ));
        assert!(matches!(
            DetectorGeometry::parse(
                "Strip3D A\nA.DetectorID 1\nA.StripNumber 2 2\nA.StripPitch 0 0.1\n"
            ),
            Err(GeometryError::InvalidProperty(_, "StripPitch"))
        ));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SETUP.as_bytes()).unwrap();
        let geometry = DetectorGeometry::load(file.path()).unwrap();
        assert_eq!(geometry.path, file.path());

        let missing = file.path().with_extension("missing");
        assert!(matches!(
            DetectorGeometry::load(&missing),
            Err(GeometryError::BadFilePath(_))
        ));
    }
}
