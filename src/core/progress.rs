//! Progress reporting for export and import pipelines

use std::fmt;

/// Named pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Reading records and settings out of the stores
    Collect,
    /// Envelope to JSON text
    Serialize,
    /// JSON text to UTF-8 bytes
    Encode,
    Compress,
    /// Building or parsing the binary frame
    Frame,
    /// Writing the container image
    Embed,
    /// Reading the container image
    Extract,
    Decompress,
    /// Checksum comparison after decompression
    Verify,
    Validate,
    Import,
    Done,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Collect => "collect",
            Stage::Serialize => "serialize",
            Stage::Encode => "encode",
            Stage::Compress => "compress",
            Stage::Frame => "frame",
            Stage::Embed => "embed",
            Stage::Extract => "extract",
            Stage::Decompress => "decompress",
            Stage::Verify => "verify",
            Stage::Validate => "validate",
            Stage::Import => "import",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Receiver of progress notifications
///
/// Calls are synchronous and must return quickly. `fraction` is the
/// overall completion of the running export or import in `0.0..=1.0` and
/// never decreases within one call; on import, decoding reports below
/// [`IMPORT_START`](crate::restore::IMPORT_START) and row inserts above it.
pub trait ProgressSink {
    fn report(&self, stage: Stage, fraction: f64, message: Option<&str>);
}

impl<F> ProgressSink for F
where
    F: Fn(Stage, f64, Option<&str>),
{
    fn report(&self, stage: Stage, fraction: f64, message: Option<&str>) {
        self(stage, fraction, message)
    }
}

/// Discards every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _stage: Stage, _fraction: f64, _message: Option<&str>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_closure_sink() {
        let seen = RefCell::new(Vec::new());
        let sink = |stage: Stage, fraction: f64, message: Option<&str>| {
            seen.borrow_mut()
                .push((stage, fraction, message.map(str::to_owned)));
        };

        sink.report(Stage::Validate, 0.0, None);
        sink.report(Stage::Done, 1.0, Some("ok"));

        let seen = seen.into_inner();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1], (Stage::Done, 1.0, Some("ok".to_string())));
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Collect.to_string(), "collect");
        assert_eq!(Stage::Import.as_str(), "import");
        NoProgress.report(Stage::Done, 1.0, None);
    }
}
