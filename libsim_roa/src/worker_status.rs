/// The stage of a conversion a status refers to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Stage {
    #[default]
    Ingest,
    Order,
    Emit,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ingest => "Reading",
            Self::Order => "Sorting",
            Self::Emit => "Writing",
        }
    }
}

/// Progress report for a conversion; progress is a fraction of the current stage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionStatus {
    pub stage: Stage,
    pub progress: f32,
}

impl ConversionStatus {
    pub fn new(stage: Stage, progress: f32) -> Self {
        Self { stage, progress }
    }
}
