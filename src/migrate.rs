// SPDX-License-Identifier: MIT
//! Backward-compatible metadata migration
//!
//! Older saved bundles carried a different metadata shape (a flat
//! applicant/respondent pair instead of the party list, and a `caseName`
//! field instead of `title`). [`migrate`] is a pure, idempotent normalization
//! from the tagged raw shape to the current [`BundleMetadata`]; every decode
//! path runs through it, so no other call site probes optional fields.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::model::{BundleMetadata, DatePrecision, Party, PartyRole};

/// Decoded metadata of unknown (possibly old) schema version.
///
/// Every field is optional; [`migrate`] fills defaults and moves deprecated
/// fields into their current representation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawMetadata {
    pub title: Option<String>,
    /// Legacy name for `title`.
    pub case_name: Option<String>,
    pub case_number: Option<String>,
    pub court: Option<String>,
    pub date: Option<String>,
    pub applicant_name: Option<String>,
    pub respondent_name: Option<String>,
    pub parties: Option<Vec<Party>>,
}

impl From<&BundleMetadata> for RawMetadata {
    fn from(metadata: &BundleMetadata) -> Self {
        Self {
            title: Some(metadata.title.clone()),
            case_name: None,
            case_number: Some(metadata.case_number.clone()),
            court: Some(metadata.court.clone()),
            date: Some(metadata.date.clone()),
            applicant_name: Some(metadata.applicant_name.clone()),
            respondent_name: Some(metadata.respondent_name.clone()),
            parties: Some(metadata.parties.clone()),
        }
    }
}

/// Normalize a raw metadata record to the current schema.
///
/// Deterministic and idempotent: applying it to an already-current record is
/// a no-op. Rules are applied in order:
///
/// 1. `title` falls back to the legacy case-name field, then empty.
/// 2. An absent or empty party list is synthesized from non-empty legacy
///    flat names (applicant order 0, respondent order 1).
/// 3. Legacy flat fields default to empty string so the record is total.
/// 4. Remaining scalars default to empty string; the date defaults to the
///    current date.
pub fn migrate(raw: RawMetadata) -> BundleMetadata {
    let title = match raw.title {
        Some(title) => title,
        None => raw.case_name.unwrap_or_default(),
    };

    let applicant_name = raw.applicant_name.unwrap_or_default();
    let respondent_name = raw.respondent_name.unwrap_or_default();

    let parties = match raw.parties {
        Some(parties) if !parties.is_empty() => parties,
        _ => synthesize_parties(&applicant_name, &respondent_name),
    };

    BundleMetadata {
        title,
        case_number: raw.case_number.unwrap_or_default(),
        court: raw.court.unwrap_or_default(),
        date: raw
            .date
            .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string()),
        parties,
        applicant_name,
        respondent_name,
    }
}

fn synthesize_parties(applicant_name: &str, respondent_name: &str) -> Vec<Party> {
    let mut parties = Vec::new();
    if !applicant_name.is_empty() {
        parties.push(Party {
            name: applicant_name.to_string(),
            role: PartyRole::Applicant,
            custom_role: None,
            order: 0,
        });
    }
    if !respondent_name.is_empty() {
        parties.push(Party {
            name: respondent_name.to_string(),
            role: PartyRole::Respondent,
            custom_role: None,
            order: 1,
        });
    }
    parties
}

/// Infer a precision tag for a persisted date that has none.
///
/// Heuristic: three separator-delimited segments mean day precision, two mean
/// month, one four-digit segment means year, anything else means none. A
/// three-segment date is always treated as day precision even when the
/// segment order cannot be proven valid.
pub fn infer_date_precision(date: &str) -> DatePrecision {
    let date = date.trim();
    if date.is_empty() {
        return DatePrecision::None;
    }

    let segments: Vec<&str> = date
        .split(|c| c == '-' || c == '/' || c == '.')
        .collect();

    match segments.len() {
        3 => DatePrecision::Day,
        2 => DatePrecision::Month,
        1 if segments[0].len() == 4 && segments[0].chars().all(|c| c.is_ascii_digit()) => {
            DatePrecision::Year
        }
        _ => DatePrecision::None,
    }
}

/// Resolve the precision for a decoded document: an explicit persisted tag
/// wins, otherwise it is inferred from the date string.
pub fn resolve_precision(
    date: Option<&str>,
    persisted: Option<DatePrecision>,
) -> DatePrecision {
    match (persisted, date) {
        (Some(precision), _) => precision,
        (None, Some(date)) => infer_date_precision(date),
        (None, None) => DatePrecision::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_legacy_flat_names_synthesize_parties() {
        let raw = RawMetadata {
            applicant_name: Some("John Smith".to_string()),
            respondent_name: Some("Jane Jones".to_string()),
            ..RawMetadata::default()
        };

        let migrated = migrate(raw);

        assert_eq!(migrated.parties.len(), 2);
        assert_eq!(migrated.parties[0].name, "John Smith");
        assert_eq!(migrated.parties[0].role, PartyRole::Applicant);
        assert_eq!(migrated.parties[0].order, 0);
        assert_eq!(migrated.parties[1].name, "Jane Jones");
        assert_eq!(migrated.parties[1].role, PartyRole::Respondent);
        assert_eq!(migrated.parties[1].order, 1);
    }

    #[test]
    fn test_existing_parties_are_kept() {
        let party = Party {
            name: "ACME Ltd".to_string(),
            role: PartyRole::Claimant,
            custom_role: None,
            order: 0,
        };
        let raw = RawMetadata {
            applicant_name: Some("John Smith".to_string()),
            parties: Some(vec![party.clone()]),
            ..RawMetadata::default()
        };

        let migrated = migrate(raw);
        assert_eq!(migrated.parties, vec![party]);
    }

    #[test]
    fn test_title_falls_back_to_legacy_case_name() {
        let raw = RawMetadata {
            case_name: Some("Smith v Jones".to_string()),
            ..RawMetadata::default()
        };
        assert_eq!(migrate(raw).title, "Smith v Jones");

        let raw = RawMetadata {
            title: Some("Current title".to_string()),
            case_name: Some("Old name".to_string()),
            ..RawMetadata::default()
        };
        assert_eq!(migrate(raw).title, "Current title");
    }

    #[test]
    fn test_flat_fields_are_total_after_migration() {
        let migrated = migrate(RawMetadata::default());
        assert_eq!(migrated.applicant_name, "");
        assert_eq!(migrated.respondent_name, "");
        assert_eq!(migrated.case_number, "");
        assert_eq!(migrated.court, "");
        assert!(!migrated.date.is_empty());
    }

    #[test]
    fn test_date_precision_inference() {
        assert_eq!(infer_date_precision("2024-03-15"), DatePrecision::Day);
        assert_eq!(infer_date_precision("2024-03"), DatePrecision::Month);
        assert_eq!(infer_date_precision("2024"), DatePrecision::Year);
        assert_eq!(infer_date_precision(""), DatePrecision::None);
        assert_eq!(infer_date_precision("15/03/2024"), DatePrecision::Day);
        assert_eq!(infer_date_precision("March"), DatePrecision::None);
    }

    #[test]
    fn test_resolve_precision_prefers_persisted_tag() {
        assert_eq!(
            resolve_precision(Some("2024-03-15"), Some(DatePrecision::Month)),
            DatePrecision::Month
        );
        assert_eq!(
            resolve_precision(Some("2024-03-15"), None),
            DatePrecision::Day
        );
        assert_eq!(resolve_precision(None, None), DatePrecision::None);
    }

    fn optional_name() -> impl Strategy<Value = Option<String>> {
        proptest::option::of("[A-Za-z ]{0,12}")
    }

    proptest! {
        #[test]
        fn migrate_is_idempotent(
            title in optional_name(),
            case_name in optional_name(),
            case_number in optional_name(),
            court in optional_name(),
            date in proptest::option::of("[0-9/.-]{0,10}"),
            applicant_name in optional_name(),
            respondent_name in optional_name(),
        ) {
            let raw = RawMetadata {
                title,
                case_name,
                case_number,
                court,
                date,
                applicant_name,
                respondent_name,
                parties: None,
            };

            let once = migrate(raw);
            let twice = migrate(RawMetadata::from(&once));
            prop_assert_eq!(once, twice);
        }
    }
}
