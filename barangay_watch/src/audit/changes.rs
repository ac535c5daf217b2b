//! Field-level diffing of reports.
//!
//! Fields are described by a static table instead of reflection: each
//! [`Field::Leaf`] owns an accessor that stringifies one value, each
//! [`Field::Group`] nests a sub-table under a dotted prefix. The table order
//! is the order changes are reported in.

use super::models::FieldChange;
use crate::reports::{Report, ReportDetails};

/// Placeholder for empty or absent values
pub const EMPTY_VALUE: &str = "N/A";

/// Typed descriptor of one diffable field of `T`
pub enum Field<T: 'static> {
    Leaf {
        name: &'static str,
        get: fn(&T) -> Option<String>,
    },
    Group {
        name: &'static str,
        fields: &'static [Field<T>],
    },
}

// Stored text is already normalized; compare it verbatim
fn text(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn opt_text(value: &Option<String>) -> Option<String> {
    value.as_deref().and_then(text)
}

fn shown<V: ToString>(value: Option<V>) -> Option<String> {
    value.map(|v| v.to_string())
}

const VICTIM_FIELDS: &[Field<ReportDetails>] = &[
    Field::Leaf { name: "name", get: |r| opt_text(&r.victim.name) },
    Field::Leaf { name: "age", get: |r| shown(r.victim.age) },
    Field::Leaf { name: "gender", get: |r| shown(r.victim.gender) },
    Field::Leaf { name: "harmed", get: |r| shown(r.victim.harmed) },
    Field::Leaf { name: "nationality", get: |r| opt_text(&r.victim.nationality) },
    Field::Leaf { name: "occupation", get: |r| opt_text(&r.victim.occupation) },
];

const SUSPECT_FIELDS: &[Field<ReportDetails>] = &[
    Field::Leaf { name: "name", get: |r| opt_text(&r.suspect.name) },
    Field::Leaf { name: "age", get: |r| shown(r.suspect.age) },
    Field::Leaf { name: "gender", get: |r| shown(r.suspect.gender) },
    Field::Leaf { name: "status", get: |r| shown(r.suspect.status) },
    Field::Leaf { name: "nationality", get: |r| opt_text(&r.suspect.nationality) },
    Field::Leaf { name: "occupation", get: |r| opt_text(&r.suspect.occupation) },
];

const LOCATION_FIELDS: &[Field<ReportDetails>] = &[
    Field::Leaf { name: "lat", get: |r| shown(r.location.map(|l| l.lat)) },
    Field::Leaf { name: "lng", get: |r| shown(r.location.map(|l| l.lng)) },
];

/// Every diffable report field, in reporting order
pub static REPORT_FIELDS: &[Field<ReportDetails>] = &[
    Field::Leaf { name: "blotterNo", get: |r| text(&r.blotter_no) },
    Field::Leaf { name: "barangay", get: |r| text(&r.barangay) },
    Field::Leaf { name: "offense", get: |r| text(&r.offense) },
    Field::Leaf { name: "dateReported", get: |r| shown(Some(r.date_reported)) },
    Field::Leaf { name: "timeReported", get: |r| shown(r.time_reported) },
    Field::Leaf { name: "dateCommitted", get: |r| shown(r.date_committed) },
    Field::Leaf { name: "timeCommitted", get: |r| shown(r.time_committed) },
    Field::Group { name: "victim", fields: VICTIM_FIELDS },
    Field::Group { name: "suspect", fields: SUSPECT_FIELDS },
    Field::Leaf { name: "narrative", get: |r| opt_text(&r.narrative) },
    Field::Leaf { name: "status", get: |r| shown(Some(r.status)) },
    Field::Group { name: "location", fields: LOCATION_FIELDS },
];

/// Compare `before` and `after` field by field using `fields`.
pub fn diff<T: 'static>(fields: &[Field<T>], before: &T, after: &T) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    walk(fields, None, before, after, &mut changes);
    changes
}

fn walk<T: 'static>(
    fields: &[Field<T>],
    prefix: Option<&str>,
    before: &T,
    after: &T,
    out: &mut Vec<FieldChange>,
) {
    for field in fields {
        match field {
            Field::Leaf { name, get } => {
                let (old, new) = (get(before), get(after));
                if old != new {
                    out.push(FieldChange {
                        field: match prefix {
                            Some(p) => format!("{p}.{name}"),
                            None => (*name).to_string(),
                        },
                        old_value: old.unwrap_or_else(|| EMPTY_VALUE.to_string()),
                        new_value: new.unwrap_or_else(|| EMPTY_VALUE.to_string()),
                    });
                }
            }
            Field::Group { name, fields } => {
                let nested = match prefix {
                    Some(p) => format!("{p}.{name}"),
                    None => (*name).to_string(),
                };
                walk(fields, Some(&nested), before, after, out);
            }
        }
    }
}

/// Changes between two stored reports, ignoring ids and timestamps
pub fn diff_reports(before: &Report, after: &Report) -> Vec<FieldChange> {
    diff(REPORT_FIELDS, &before.details, &after.details)
}
