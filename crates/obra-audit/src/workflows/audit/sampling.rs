use serde::{Deserialize, Serialize};

/// Share of the declared workforce that must be interviewed, as a divisor (10%).
const QUOTA_DIVISOR: u64 = 10;

/// Interview coverage derived from the declared headcount. Never cached: call
/// [`compute_quota`] again whenever the headcount or the interview set changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingState {
    pub declared_headcount: u32,
    pub target_count: u32,
    pub interview_count: u32,
    pub coverage_percent: u32,
    pub quota_met: bool,
    pub remaining: u32,
}

impl SamplingState {
    /// Coverage as shown to the analysis service, e.g. `"40%"`.
    pub fn coverage_label(&self) -> String {
        format!("{}%", self.coverage_percent)
    }
}

/// Target is 10% of the headcount rounded up; a zero headcount never meets the quota.
pub fn compute_quota(declared_headcount: u32, interview_count: u32) -> SamplingState {
    if declared_headcount == 0 {
        return SamplingState {
            declared_headcount,
            target_count: 0,
            interview_count,
            coverage_percent: 0,
            quota_met: false,
            remaining: 0,
        };
    }

    let headcount = u64::from(declared_headcount);
    let interviewed = u64::from(interview_count);

    // Integer ceil keeps exact multiples of ten from drifting up a unit.
    let target = headcount.div_ceil(QUOTA_DIVISOR);
    // Round half up: floor((200 * n + h) / (2 * h)).
    let coverage = (200 * interviewed + headcount) / (2 * headcount);

    let target_count = target as u32;
    SamplingState {
        declared_headcount,
        target_count,
        interview_count,
        coverage_percent: u32::try_from(coverage).unwrap_or(u32::MAX),
        quota_met: interview_count >= target_count,
        remaining: target_count.saturating_sub(interview_count),
    }
}
