use serde::Serialize;

/// Job boards whose posting pages are targeted by optimized queries.
pub const JOB_BOARDS: [&str; 8] = [
    "linkedin.com/jobs",
    "indeed.com/job",
    "glassdoor.com/Job",
    "monster.com/job",
    "careerbuilder.com/job",
    "dice.com/job",
    "ziprecruiter.com/job",
    "simplyhired.com/job",
];

/// Search operators that favour pages about a single job.
const JOB_INDICATORS: [&str; 7] = [
    "inurl:jobs",
    "inurl:job",
    "inurl:careers",
    "inurl:positions",
    "intitle:\"job\"",
    "intitle:\"career\"",
    "intitle:\"position\"",
];

/// Postings older than this are not worth returning.
pub const DEFAULT_TIME_RANGE: &str = "past_month";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizedQuery {
    pub original_query: String,
    pub optimized_query: String,
    pub site_restrictions: Vec<String>,
    pub file_type: Option<String>,
    pub time_range: Option<String>,
}

/// Rewrites free-text queries so search engines return job posting pages.
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryOptimizer;

impl QueryOptimizer {
    /// Restricts `query` to the known job boards and job-like pages.
    pub fn optimize(&self, query: &str) -> OptimizedQuery {
        let site_restrictions = JOB_BOARDS
            .iter()
            .map(|board| format!("site:{}", board))
            .collect::<Vec<_>>()
            .join(" OR ");

        let optimized_query = format!(
            "{} ({}) ({})",
            query.trim(),
            site_restrictions,
            JOB_INDICATORS.join(" OR ")
        );

        OptimizedQuery {
            original_query: query.to_string(),
            optimized_query,
            site_restrictions: JOB_BOARDS.iter().map(|board| board.to_string()).collect(),
            file_type: None,
            time_range: Some(DEFAULT_TIME_RANGE.to_string()),
        }
    }
}
