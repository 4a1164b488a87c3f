pub const CASCADE_FILE_NAME: &str = "haarcascade_frontalface_default.xml";

pub const AGE_MODEL_NAME: &str = "age_model.onnx";
pub const GENDER_MODEL_NAME: &str = "gender_model.onnx";

/// Multi-scale step between pyramid levels (10%).
pub const DEFAULT_SCALE_FACTOR: f64 = 1.1;

/// Overlapping positive windows required to confirm a face.
pub const DEFAULT_MIN_NEIGHBORS: usize = 5;

/// Smallest face box kept, in pixels per side.
pub const DEFAULT_MIN_FACE_SIZE: u32 = 30;

/// Confidence reported for every cascade detection; the cascade has no score.
pub const CASCADE_NOMINAL_CONFIDENCE: f32 = 0.8;

/// Number of per-frame face counts kept for the detection-rate average.
pub const ROLLING_WINDOW_LEN: usize = 60;

pub const DEFAULT_JPEG_QUALITY: u8 = 80;
