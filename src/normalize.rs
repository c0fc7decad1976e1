use crate::models::SubmissionRecord;

/// Upper end of the shared 0-10 scale used by judges and engagement metrics.
pub const SCALE_MAX: f64 = 10.0;

/// Contest-wide engagement maxima. Each value is at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngagementMaxima {
    pub likes: i64,
    pub views: i64,
}

impl EngagementMaxima {
    /// Scan the current submission set. Never cached: entries can arrive
    /// between computations.
    pub fn from_submissions(submissions: &[SubmissionRecord]) -> Self {
        let likes = submissions.iter().map(|s| s.likes_count).max().unwrap_or(0);
        let views = submissions.iter().map(|s| s.views).max().unwrap_or(0);

        Self {
            likes: likes.max(1),
            views: views.max(1),
        }
    }
}

/// Map a raw counter onto the 0-10 scale relative to `max`.
pub fn normalize(raw: i64, max: i64) -> f64 {
    if max <= 0 {
        return 0.0;
    }

    let ratio = raw.clamp(0, max) as f64 / max as f64;
    (ratio * SCALE_MAX).clamp(0.0, SCALE_MAX)
}
