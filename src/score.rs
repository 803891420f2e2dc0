// src/score.rs - TABS score adjustment algorithms

/// Number of consecutive falls after which the stepped variant deepens its
/// downward offset by another unit.
const FALL_STEP: i64 = 9;

/// Constant-numerator adjustment. The child score moves one denominator
/// step toward the locally observed reference: parent * (D +/- 1) / D.
/// Integer division truncates toward zero.
pub fn next_score(parent_tabs: i64, reference: i64, denominator: i64) -> i64 {
    let direction = if reference > parent_tabs {
        1
    } else if reference < parent_tabs {
        -1
    } else {
        0
    };
    parent_tabs * (denominator + direction) / denominator
}

/// Consecutive-falls-stepping adjustment. Rises and equalities behave as in
/// [`next_score`], but the downward offset accelerates with the run length
/// of falling blocks: -1 - fall_count / 9.
pub fn next_score_stepped(
    parent_tabs: i64,
    fall_count: i64,
    reference: i64,
    denominator: i64,
) -> i64 {
    let direction = if reference > parent_tabs {
        1
    } else if reference < parent_tabs {
        -1 - fall_count / FALL_STEP
    } else {
        0
    };
    parent_tabs * (denominator + direction) / denominator
}

/// Sign of the score reference relative to the parent score.
pub fn score_cmp(parent_tabs: i64, reference: i64) -> i64 {
    if reference > parent_tabs {
        1
    } else if reference < parent_tabs {
        -1
    } else {
        0
    }
}

/// Fall-run bookkeeping: extend the parent's run on a fall, reset otherwise.
pub fn next_fall_count(parent_fall_count: i64, cmp: i64) -> i64 {
    if cmp < 0 {
        parent_fall_count + 1
    } else {
        0
    }
}
