//! Data models for the pull-count tracker.
//!
//! This module contains the core data structures used throughout the
//! application: the tracked-image list, observed counts, and history
//! samples.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Date format used in series files and chart axes (`2025/01/31`).
pub const DATE_FORMAT: &str = "%Y/%m/%d";

/// A named sum of images, tracked as a derived entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SumSpec {
    /// Display name of the sum (without the `SUM/` prefix).
    pub name: String,
    /// Names of the member images whose latest counts are summed.
    pub images: Vec<String>,
}

/// The list of images to track, loaded from a YAML file.
///
/// Example:
/// ```yaml
/// images:
///   - falcosecurity/falco
///   - falcosecurity/falcosidekick
/// sums:
///   - name: falco
///     images:
///       - falcosecurity/falco
///       - falcosecurity/falco-no-driver
/// releases:
///   falcosecurity/falco:
///     "2025/01/28": "0.40.0"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackedList {
    /// Images to fetch pull counts for.
    #[serde(default)]
    pub images: Vec<String>,

    /// Named sums of image counts.
    #[serde(default)]
    pub sums: Vec<SumSpec>,

    /// Optional release markers per image: date (`YYYY/MM/DD`) to version.
    /// Rendered as vertical mark lines on the image's chart.
    #[serde(default)]
    pub releases: BTreeMap<String, BTreeMap<String, String>>,
}

impl TrackedList {
    /// Load a tracked-image list from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read list file: {}", path.display()))?;

        let list: TrackedList = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse list file: {}", path.display()))?;

        list.validate()?;
        Ok(list)
    }

    /// Validate the list: image names must be non-empty and sums may only
    /// reference plain images (no nested aggregation).
    pub fn validate(&self) -> Result<()> {
        if self.images.is_empty() && self.sums.is_empty() {
            anyhow::bail!("List contains no images and no sums");
        }

        for image in &self.images {
            if image.trim().is_empty() {
                anyhow::bail!("List contains an empty image name");
            }
        }

        for sum in &self.sums {
            if sum.name.trim().is_empty() {
                anyhow::bail!("List contains a sum with an empty name");
            }
            for member in &sum.images {
                if member.starts_with(crate::aggregate::SUM_PREFIX) {
                    anyhow::bail!(
                        "Sum '{}' references derived entity '{}'; sums of sums are not supported",
                        sum.name,
                        member
                    );
                }
            }
        }

        Ok(())
    }

    /// Release markers for one image, if any are configured.
    pub fn releases_for(&self, image: &str) -> Option<&BTreeMap<String, String>> {
        self.releases.get(image)
    }
}

/// One observed entity (image or derived sum) with its current count.
#[derive(Debug, Clone, Serialize)]
pub struct ImageCount {
    /// Image reference (e.g. `falcosecurity/falco`) or `SUM/<name>`.
    pub name: String,
    /// Cumulative pull count as reported by the registry (or summed).
    pub count: u64,
}

impl ImageCount {
    /// Count formatted with thousands separators, for display.
    pub fn human_count(&self) -> String {
        format_count(self.count)
    }

    /// Whether this entity is a derived sum rather than a raw image.
    pub fn is_sum(&self) -> bool {
        self.name.starts_with(crate::aggregate::SUM_PREFIX)
    }
}

/// One record of a history series: the count observed on a day and the
/// difference to the previously observed count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Calendar day of the observation.
    pub date: NaiveDate,
    /// Cumulative count at that day.
    pub count: u64,
    /// `count - previous count`; 0 for the first sample of a series.
    /// Negative when the registry reports a corrected, lower count.
    pub delta: i64,
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{}",
            self.date.format(DATE_FORMAT),
            self.count,
            self.delta
        )
    }
}

/// Replace path separator characters in an entity name so it can be used
/// as a file name (`falcosecurity/falco` becomes `falcosecurity_falco`).
pub fn sanitize_name(name: &str) -> String {
    name.replace(['/', '\\', ':'], "_")
}

/// Format an integer with `,` thousands separators (`1234567` becomes
/// `1,234,567`).
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("falcosecurity/falco"), "falcosecurity_falco");
        assert_eq!(sanitize_name("SUM/falco"), "SUM_falco");
        assert_eq!(sanitize_name("plain"), "plain");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1234567), "1,234,567");
        assert_eq!(format_count(1000000000), "1,000,000,000");
    }

    #[test]
    fn test_sample_display() {
        let sample = Sample {
            date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            count: 130,
            delta: 30,
        };
        assert_eq!(sample.to_string(), "2025/01/02,130,30");
    }

    #[test]
    fn test_parse_list_yaml() {
        let yaml = r#"
images:
  - falcosecurity/falco
  - falcosecurity/falcosidekick
sums:
  - name: falco
    images:
      - falcosecurity/falco
releases:
  falcosecurity/falco:
    "2025/01/28": "0.40.0"
"#;

        let list: TrackedList = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(list.images.len(), 2);
        assert_eq!(list.sums.len(), 1);
        assert_eq!(list.sums[0].name, "falco");
        assert_eq!(
            list.releases_for("falcosecurity/falco")
                .and_then(|r| r.get("2025/01/28"))
                .map(String::as_str),
            Some("0.40.0")
        );
        assert!(list.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_list() {
        let list = TrackedList::default();
        assert!(list.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_nested_sums() {
        let list = TrackedList {
            images: vec!["a/b".to_string()],
            sums: vec![SumSpec {
                name: "outer".to_string(),
                images: vec!["SUM/inner".to_string()],
            }],
            releases: BTreeMap::new(),
        };
        assert!(list.validate().is_err());
    }

    #[test]
    fn test_image_count_is_sum() {
        let image = ImageCount {
            name: "falcosecurity/falco".to_string(),
            count: 10,
        };
        let sum = ImageCount {
            name: "SUM/falco".to_string(),
            count: 10,
        };
        assert!(!image.is_sum());
        assert!(sum.is_sum());
    }
}
