//! Output generation for the aggregate report and the digest pages.
//!
//! # Submodules
//!
//! - [`json`]: Writes the [`AggregateReport`](crate::models::AggregateReport) as JSON
//! - [`html`]: Renders and writes one HTML digest per agency
//!
//! # Output Structure
//!
//! One directory per run date (canonical timezone); a later run on the same
//! day replaces that day's files.
//!
//! ```text
//! output_dir/
//! └── 2025-10-10/
//!     ├── report.json
//!     ├── ema.html
//!     ├── pmda.html
//!     ├── fda.html
//!     └── who.html
//! ```

use crate::models::Timestamp;
use std::path::{Path, PathBuf};

pub mod html;
pub mod json;

/// `{output_dir}/{YYYY-MM-DD}` for a run that started at `generated_at`.
pub fn edition_dir(output_dir: &str, generated_at: &Timestamp) -> PathBuf {
    Path::new(output_dir).join(generated_at.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CANONICAL_TZ;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_edition_dir_uses_canonical_date() {
        // 2025-10-09 20:00 UTC is already the 10th in Tokyo.
        let generated_at = Utc
            .with_ymd_and_hms(2025, 10, 9, 20, 0, 0)
            .unwrap()
            .with_timezone(&*CANONICAL_TZ);
        assert_eq!(
            edition_dir("./digests", &generated_at),
            PathBuf::from("./digests/2025-10-10")
        );
    }
}
