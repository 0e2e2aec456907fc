//! Recording and replay of scan sessions
//!
//! Scan sessions are stored as JSON lines so they can be appended while a
//! scan runs and streamed back without loading the whole file.
//!
//! - Scanline recordings: one [`ScanlineRecord`](crate::types::ScanlineRecord)
//!   per line, `frame_id` as a string (`"-1"` closes a segment), `stamp` in
//!   RFC 3339 and the samples under `center` with `-1` for no detection.
//! - Cloud dumps: one [`CloudSummary`] per emitted cloud.

pub mod player;
pub mod recorder;
pub mod types;

pub use player::{read_recording, SessionPlayer};
pub use recorder::SessionRecorder;
pub use types::CloudSummary;
