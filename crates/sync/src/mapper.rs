use chrono::{NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::resolver::Resolution;
use crate::settings::SyncSettings;
use crate::source::SourceLead;
use leadbridge_db::lead::models::Lead;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("unknown treatment code {0}")]
    UnknownTreatment(i16),
}

/// Owner name as the source typed it, required before resolution can run.
pub fn owner_name(raw: &SourceLead) -> Result<&str, MapError> {
    match raw.owner_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(MapError::MissingField("assigned_to")),
    }
}

/// Pure transformation of a raw source row into the canonical lead shape.
/// Performs no I/O; the resolver has already run.
pub fn map_lead(
    raw: &SourceLead,
    resolution: &Resolution,
    system_actor: Uuid,
    settings: &SyncSettings,
) -> Result<Lead, MapError> {
    let treatment_code = raw
        .treatment_code
        .ok_or(MapError::MissingField("treatment_code"))?;
    let treatment = treatment_label(treatment_code)?;

    // Territory preference: explicit source field, then the resolved
    // owner's territory, then the system default.
    let territory = non_empty(raw.territory.as_deref())
        .map(str::to_string)
        .or_else(|| resolution.territory.clone())
        .unwrap_or_else(|| settings.default_territory.clone());

    let subject_name = non_empty(raw.customer_name.as_deref())
        .unwrap_or("Unknown")
        .to_string();

    let now = Utc::now();
    Ok(Lead {
        id: Uuid::new_v4(),
        external_ref: raw.external_ref(),
        owner_account_id: resolution.account_id,
        territory,
        lifecycle_status: lifecycle_label(raw.status_code).to_string(),
        subject_name,
        contact_phone: clean(raw.mobile.as_deref()),
        alt_phone: clean(raw.alt_mobile.as_deref()),
        email: clean(raw.email.as_deref()),
        address: clean(raw.address.as_deref()),
        city: clean(raw.city.as_deref()),
        state: clean(raw.state.as_deref()),
        postal_code: clean(raw.pincode.as_deref()),
        treatment: treatment.to_string(),
        sub_treatment: clean(raw.sub_treatment.as_deref()),
        source_channel: clean(raw.source_channel.as_deref()),
        campaign: clean(raw.campaign.as_deref()),
        budget: clean(raw.budget.as_deref()),
        is_hot: parse_flag(raw.hot_flag.as_deref()),
        detail: clean(raw.detail.as_deref()),
        follow_up_on: raw.follow_up_on.as_deref().and_then(parse_loose_date),
        enquired_at: raw.enquiry_date,
        entered_at: raw.entry_date,
        source_updated_at: raw.updated_on,
        created_by: system_actor,
        created_at: now,
        updated_at: now,
    })
}

fn treatment_label(code: i16) -> Result<&'static str, MapError> {
    match code {
        1 => Ok("hair"),
        2 => Ok("skin"),
        3 => Ok("dental"),
        4 => Ok("cosmetic"),
        5 => Ok("wellness"),
        other => Err(MapError::UnknownTreatment(other)),
    }
}

fn lifecycle_label(code: Option<i16>) -> &'static str {
    match code {
        Some(1) => "contacted",
        Some(2) => "qualified",
        Some(3) => "converted",
        Some(4) => "dropped",
        // Absent and unknown codes both land in the initial stage
        _ => "new",
    }
}

/// Nullable flag columns arrive as "1"/"0", "Y"/"N", "true", or blank.
fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1") | Some("y") | Some("yes") | Some("true")
    )
}

/// Operator-typed dates show up in several formats; try each in turn.
fn parse_loose_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    for format in ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }
    // Timestamps pasted into a date column: take the date prefix
    value
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn clean(value: Option<&str>) -> Option<String> {
    non_empty(value).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::MatchRule;
    use chrono::TimeZone;

    fn raw_lead(id: i64) -> SourceLead {
        SourceLead {
            id,
            effective_at: Utc.timestamp_opt(1_709_251_200, 0).unwrap(),
            owner_name: Some("Ravi".to_string()),
            customer_name: Some("Anita Desai".to_string()),
            mobile: Some("9876543210".to_string()),
            alt_mobile: None,
            email: Some("anita@example.com".to_string()),
            address: None,
            city: Some("Indore".to_string()),
            state: Some("MP".to_string()),
            pincode: Some("452001".to_string()),
            treatment_code: Some(3),
            sub_treatment: Some("implant".to_string()),
            status_code: Some(1),
            source_channel: Some("walk-in".to_string()),
            campaign: None,
            budget: Some("50000".to_string()),
            territory: None,
            hot_flag: Some("Y".to_string()),
            detail: Some("asked for evening slot".to_string()),
            follow_up_on: Some("05-03-2024".to_string()),
            enquiry_date: Some(Utc.timestamp_opt(1_709_251_200, 0).unwrap()),
            entry_date: None,
            created_on: Some(Utc.timestamp_opt(1_709_200_000, 0).unwrap()),
            updated_on: Some(Utc.timestamp_opt(1_709_260_000, 0).unwrap()),
        }
    }

    fn resolution(territory: Option<&str>) -> Resolution {
        Resolution {
            account_id: Uuid::new_v4(),
            territory: territory.map(|t| t.to_string()),
            rule: MatchRule::Exact,
        }
    }

    #[test]
    fn maps_full_row() {
        let raw = raw_lead(1001);
        let res = resolution(Some("South"));
        let lead = map_lead(&raw, &res, Uuid::new_v4(), &SyncSettings::default()).unwrap();

        assert_eq!(lead.external_ref, "1001");
        assert_eq!(lead.owner_account_id, res.account_id);
        assert_eq!(lead.subject_name, "Anita Desai");
        assert_eq!(lead.treatment, "dental");
        assert_eq!(lead.lifecycle_status, "contacted");
        assert_eq!(lead.territory, "South");
        assert!(lead.is_hot);
        assert_eq!(
            lead.follow_up_on,
            NaiveDate::from_ymd_opt(2024, 3, 5)
        );
        assert_eq!(lead.source_updated_at, raw.updated_on);
    }

    #[test]
    fn missing_owner_name_is_required_error() {
        let mut raw = raw_lead(1);
        raw.owner_name = Some("   ".to_string());
        assert!(matches!(
            owner_name(&raw),
            Err(MapError::MissingField("assigned_to"))
        ));

        raw.owner_name = None;
        assert!(matches!(
            owner_name(&raw),
            Err(MapError::MissingField("assigned_to"))
        ));
    }

    #[test]
    fn missing_treatment_is_required_error() {
        let mut raw = raw_lead(1);
        raw.treatment_code = None;
        let err = map_lead(
            &raw,
            &resolution(None),
            Uuid::new_v4(),
            &SyncSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, MapError::MissingField("treatment_code")));
    }

    #[test]
    fn unknown_treatment_code_is_error() {
        let mut raw = raw_lead(1);
        raw.treatment_code = Some(99);
        let err = map_lead(
            &raw,
            &resolution(None),
            Uuid::new_v4(),
            &SyncSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, MapError::UnknownTreatment(99)));
    }

    #[test]
    fn territory_prefers_source_then_owner_then_default() {
        let mut raw = raw_lead(1);
        let settings = SyncSettings::default();

        raw.territory = Some("  East ".to_string());
        let lead = map_lead(&raw, &resolution(Some("South")), Uuid::new_v4(), &settings).unwrap();
        assert_eq!(lead.territory, "East");

        raw.territory = None;
        let lead = map_lead(&raw, &resolution(Some("South")), Uuid::new_v4(), &settings).unwrap();
        assert_eq!(lead.territory, "South");

        let lead = map_lead(&raw, &resolution(None), Uuid::new_v4(), &settings).unwrap();
        assert_eq!(lead.territory, settings.default_territory);
    }

    #[test]
    fn blank_subject_falls_back_to_unknown() {
        let mut raw = raw_lead(1);
        raw.customer_name = Some("  ".to_string());
        let lead = map_lead(
            &raw,
            &resolution(None),
            Uuid::new_v4(),
            &SyncSettings::default(),
        )
        .unwrap();
        assert_eq!(lead.subject_name, "Unknown");
    }

    #[test]
    fn flag_encodings() {
        assert!(parse_flag(Some("1")));
        assert!(parse_flag(Some("Y")));
        assert!(parse_flag(Some(" yes ")));
        assert!(parse_flag(Some("TRUE")));
        assert!(!parse_flag(Some("0")));
        assert!(!parse_flag(Some("N")));
        assert!(!parse_flag(Some("")));
        assert!(!parse_flag(None));
    }

    #[test]
    fn loose_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5);
        assert_eq!(parse_loose_date("2024-03-05"), expected);
        assert_eq!(parse_loose_date("05-03-2024"), expected);
        assert_eq!(parse_loose_date("05/03/2024"), expected);
        assert_eq!(parse_loose_date("2024/03/05"), expected);
        assert_eq!(parse_loose_date("2024-03-05 14:30:00"), expected);
        assert_eq!(parse_loose_date("soon"), None);
        assert_eq!(parse_loose_date(""), None);
    }

    #[test]
    fn unknown_status_code_maps_to_new() {
        let mut raw = raw_lead(1);
        raw.status_code = Some(42);
        let lead = map_lead(
            &raw,
            &resolution(None),
            Uuid::new_v4(),
            &SyncSettings::default(),
        )
        .unwrap();
        assert_eq!(lead.lifecycle_status, "new");

        raw.status_code = None;
        let lead = map_lead(
            &raw,
            &resolution(None),
            Uuid::new_v4(),
            &SyncSettings::default(),
        )
        .unwrap();
        assert_eq!(lead.lifecycle_status, "new");
    }
}
