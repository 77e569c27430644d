#[derive(Debug, Clone, Default)]
pub enum BarColor {
    #[default]
    CYAN,
    MAGENTA,
    RED,
    GREEN,
}

/// The stage of a conversion run a status message refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionStage {
    Positions,
    Cropping,
    Product,
}

impl std::fmt::Display for ConversionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversionStage::Positions => write!(f, "positions"),
            ConversionStage::Cropping => write!(f, "cropping"),
            ConversionStage::Product => write!(f, "product"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerStatus {
    pub progress: f32,
    pub stage: ConversionStage,
    pub color: BarColor,
}

impl WorkerStatus {
    pub fn new(progress: f32, stage: ConversionStage, color: BarColor) -> Self {
        Self {
            progress,
            stage,
            color,
        }
    }
}
