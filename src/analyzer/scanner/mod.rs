pub mod file_scanner;

pub use file_scanner::{FileScanner, ScanError, ScannedFile, SourceWalk, is_generated_file};
