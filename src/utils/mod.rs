pub mod files;
pub mod segmenter;
