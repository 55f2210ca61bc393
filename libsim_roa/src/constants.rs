// ROA output format
pub const ROA_TYPE_LINE: &str = "TYPE ROA";
pub const ROA_FORMAT_LINE: &str = "UF doublesidedstrip adc_timing_hastiming_hastrigger";
pub const DEFAULT_OUTPUT_FILE: &str = "FPGA_Input.txt";

// Energy quantization (keV)
pub const ENERGY_FULL_SCALE: f64 = 2000.0;
pub const ENERGY_CODE_MAX: i64 = 16384;
pub const SUBSTITUTION_THRESHOLD: f64 = 1.0;
pub const SYNTHETIC_ENERGY_MIN: f64 = 0.5;
pub const SYNTHETIC_ENERGY_SIGMA: f64 = 2.0;
pub const TRIGGER_THRESHOLD: f64 = 12.0;

// Depth quantization (cm)
pub const DEPTH_OFFSET: f64 = 0.75;
pub const DEPTH_RANGE: f64 = 1.5;
pub const DEPTH_CODE_SCALE: f64 = 128.0;

pub const NO_DEPTH_FLAG: &str = "NODEPTH";

// Downstream FPGA acceptance
pub const FPGA_MIN_VALID_ADC: i64 = 82;

pub const DEFAULT_TIME_HORIZON: f64 = 10.0;
pub const NANOS_PER_SECOND: u32 = 1_000_000_000;
