pub mod config;
pub mod image;
pub mod normalize;
pub mod record;
pub mod wire;

pub use config::{
    default_config_path, ClientSettings, Config, ConfigError, ExtractionSettings, ServerSettings,
    SheetsSettings,
};
pub use image::{
    ImageKind, ImageStatus, ImageUpload, IntakeError, MAX_IMAGES_PER_BATCH, MAX_IMAGE_BYTES,
};
pub use normalize::{clean_name, looks_like_national_id, normalize_national_id, NATIONAL_ID_LEN};
pub use record::{ExtractedRecord, RecordId, RecordSet};
