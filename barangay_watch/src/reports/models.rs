//! Crime report data models.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::{ReportError, ReportResult};

/// Report ID type
pub type ReportId = i64;

/// Oldest age accepted for a victim or suspect
pub const MAX_AGE: i32 = 150;

macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            /// Wire and storage representation
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!(
                        concat!("unknown ", stringify!($name), " '{}'"),
                        other
                    )),
                }
            }
        }
    };
}

text_enum!(
    /// Case disposition
    CaseStatus {
        Solved => "Solved",
        Cleared => "Cleared",
        Unsolved => "Unsolved",
    }
);

text_enum!(
    Gender {
        Male => "Male",
        Female => "Female",
        Unknown => "Unknown",
    }
);

text_enum!(
    /// What happened to the victim
    HarmStatus {
        Harmed => "Harmed",
        NotHarmed => "Not Harmed",
        Deceased => "Deceased",
        Unknown => "Unknown",
    }
);

text_enum!(
    /// Custody status of the suspect
    SuspectStatus {
        Arrested => "Arrested",
        AtLarge => "At Large",
        Detained => "Detained",
        Unknown => "Unknown",
    }
);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Victim {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    pub harmed: Option<HarmStatus>,
    pub nationality: Option<String>,
    pub occupation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suspect {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    pub status: Option<SuspectStatus>,
    pub nationality: Option<String>,
    pub occupation: Option<String>,
}

/// Map pin for an incident or tip
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    /// Reject coordinates outside the WGS84 range
    pub fn validate(&self) -> ReportResult<()> {
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(ReportError::validation(
                "location.lat",
                "latitude must be between -90 and 90",
            ));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(ReportError::validation(
                "location.lng",
                "longitude must be between -180 and 180",
            ));
        }
        Ok(())
    }
}

/// Everything an official can write on a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDetails {
    pub blotter_no: String,
    pub barangay: String,
    pub offense: String,
    pub date_reported: NaiveDate,
    pub time_reported: Option<NaiveTime>,
    pub date_committed: Option<NaiveDate>,
    pub time_committed: Option<NaiveTime>,
    #[serde(default)]
    pub victim: Victim,
    #[serde(default)]
    pub suspect: Suspect,
    pub narrative: Option<String>,
    pub status: CaseStatus,
    pub location: Option<Location>,
}

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

fn trim_optional(value: &mut Option<String>) {
    if let Some(text) = value {
        trim_in_place(text);
        if text.is_empty() {
            *value = None;
        }
    }
}

impl Victim {
    fn normalize(&mut self) {
        trim_optional(&mut self.name);
        trim_optional(&mut self.nationality);
        trim_optional(&mut self.occupation);
    }
}

impl Suspect {
    fn normalize(&mut self) {
        trim_optional(&mut self.name);
        trim_optional(&mut self.nationality);
        trim_optional(&mut self.occupation);
    }
}

impl ReportDetails {
    /// Trim every text field and turn blank optional text into `None`.
    ///
    /// Runs before validation and storage, so what is stored, compared for
    /// blotter uniqueness and diffed for the audit log is the same string.
    pub fn normalize(&mut self) {
        trim_in_place(&mut self.blotter_no);
        trim_in_place(&mut self.barangay);
        trim_in_place(&mut self.offense);
        trim_optional(&mut self.narrative);
        self.victim.normalize();
        self.suspect.normalize();
    }

    /// Check the free-form fields the type system cannot
    pub fn validate(&self) -> ReportResult<()> {
        for (field, value) in [
            ("blotterNo", &self.blotter_no),
            ("barangay", &self.barangay),
            ("offense", &self.offense),
        ] {
            if value.trim().is_empty() {
                return Err(ReportError::validation(field, "must not be empty"));
            }
        }

        for (field, age) in [("victim.age", self.victim.age), ("suspect.age", self.suspect.age)] {
            if let Some(age) = age
                && !(0..=MAX_AGE).contains(&age)
            {
                return Err(ReportError::validation(
                    field,
                    format!("must be between 0 and {MAX_AGE}"),
                ));
            }
        }

        if let Some(committed) = self.date_committed
            && committed > self.date_reported
        {
            return Err(ReportError::validation(
                "dateCommitted",
                "cannot be after dateReported",
            ));
        }

        if let Some(location) = &self.location {
            location.validate()?;
        }

        Ok(())
    }
}

/// Stored crime report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: ReportId,
    #[serde(flatten)]
    pub details: ReportDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}


#[cfg(test)]
mod tests {
    use super::fixtures::details;
    use super::*;

    #[test]
    fn test_multi_word_enums_use_display_text() {
        assert_eq!(
            serde_json::to_value(HarmStatus::NotHarmed).unwrap(),
            "Not Harmed"
        );
        assert_eq!(
            "At Large".parse::<SuspectStatus>().unwrap(),
            SuspectStatus::AtLarge
        );
        assert!("Pending".parse::<CaseStatus>().is_err());
    }

    #[test]
    fn test_valid_details_pass() {
        assert!(details("BLT-1").validate().is_ok());
    }

    #[test]
    fn test_blank_blotter_rejected() {
        let err = details("  ").validate().unwrap_err();
        assert!(matches!(err, ReportError::Validation { ref field, .. } if field == "blotterNo"));
    }

    #[test]
    fn test_age_and_location_bounds() {
        let mut d = details("BLT-1");
        d.suspect.age = Some(151);
        let err = d.validate().unwrap_err();
        assert!(matches!(err, ReportError::Validation { ref field, .. } if field == "suspect.age"));

        let mut d = details("BLT-1");
        d.location = Some(Location { lat: 91.0, lng: 0.0 });
        let err = d.validate().unwrap_err();
        assert!(
            matches!(err, ReportError::Validation { ref field, .. } if field == "location.lat")
        );
    }

    #[test]
    fn test_normalize_trims_text_and_drops_blank_optionals() {
        let mut d = details(" BLT-1\t");
        d.offense = "Theft   ".into();
        d.narrative = Some("  ".into());
        d.victim.name = Some(" Juan Dela Cruz ".into());
        d.suspect.occupation = Some(String::new());

        d.normalize();
        assert_eq!(d.blotter_no, "BLT-1");
        assert_eq!(d.offense, "Theft");
        assert_eq!(d.narrative, None);
        assert_eq!(d.victim.name.as_deref(), Some("Juan Dela Cruz"));
        assert_eq!(d.suspect.occupation, None);

        let mut again = d.clone();
        again.normalize();
        assert_eq!(again, d);
    }

    #[test]
    fn test_committed_after_reported_rejected() {
        let mut d = details("BLT-1");
        d.date_committed = NaiveDate::from_ymd_opt(2024, 3, 5);
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_report_json_is_flat_camel_case() {
        let report = Report {
            id: 7,
            details: details("BLT-7"),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["blotterNo"], "BLT-7");
        assert_eq!(json["victim"]["harmed"], "Not Harmed");
        assert_eq!(json["status"], "Unsolved");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_unknown_status_fails_to_deserialize() {
        let mut json = serde_json::to_value(details("BLT-1")).unwrap();
        json["status"] = "Pending".into();
        assert!(serde_json::from_value::<ReportDetails>(json).is_err());
    }
}
