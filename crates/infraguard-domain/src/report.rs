use infraguard_types::{CheckRecord, CheckResult};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultCounts {
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
}

impl ResultCounts {
    pub fn from_records(records: &[CheckRecord]) -> Self {
        let mut counts = ResultCounts::default();
        for r in records {
            match r.result {
                CheckResult::Passed => counts.passed += 1,
                CheckResult::Failed => counts.failed += 1,
                CheckResult::Skipped => counts.skipped += 1,
            }
        }
        counts
    }
}

/// Engine output: records in policy load order, then resource id.
#[derive(Clone, Debug, Default)]
pub struct DomainReport {
    pub records: Vec<CheckRecord>,
    pub counts: ResultCounts,
}
