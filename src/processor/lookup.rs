//! GID to SAP number lookup built from the Staff dataset.

use crate::models::{CertResultRecord, StaffRecord};
use crate::normalize::normalize_id;
use std::collections::HashMap;
use tracing::{info, warn};

/// staffGID -> normalized staffSAPNR
#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    entries: HashMap<String, String>,
}

/// Join counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupStats {
    pub matched: usize,
    pub missing: usize,
}

impl LookupTable {
    /// Index staff rows, skipping those without a GID or SAP number
    pub fn from_staff(records: &[StaffRecord]) -> Self {
        let entries: HashMap<String, String> = records
            .iter()
            .filter_map(|record| {
                let gid = record.staff_gid.trim();
                let sap = normalize_id(&record.staff_sap);
                (!gid.is_empty() && !sap.is_empty()).then(|| (gid.to_string(), sap))
            })
            .collect();
        info!("{} GID->SAP mappings loaded", entries.len());
        Self { entries }
    }

    pub fn get(&self, gid: &str) -> Option<&str> {
        self.entries.get(gid.trim()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fill `staff_sap` from the GID. Unknown GIDs stay empty and count as
    /// missing; records without a GID are not counted.
    pub fn join(&self, records: &mut [CertResultRecord]) -> LookupStats {
        let mut stats = LookupStats::default();
        for record in records.iter_mut() {
            if record.staff_gid.is_empty() {
                continue;
            }
            match self.get(&record.staff_gid) {
                Some(sap) => {
                    record.staff_sap = sap.to_string();
                    stats.matched += 1;
                }
                None => {
                    record.staff_sap.clear();
                    stats.missing += 1;
                }
            }
        }
        if stats.missing > 0 {
            warn!(
                "{} rows with a staffGID not found in the Staff dataset",
                stats.missing
            );
        }
        stats
    }
}
