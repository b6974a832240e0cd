//! Run statistics for bulk sampling

use std::time::Duration;

use crate::client::SubmitOutcome;

/// Outcome tally for one sampling run
#[derive(Debug, Default, Clone)]
pub struct RunStats {
    pub attempted: u64,
    pub created: u64,
    pub duplicates: u64,
    pub no_imagery: u64,
    pub rejected: u64,
    pub timeouts: u64,
    pub failed: u64,
}

impl RunStats {
    pub fn record(&mut self, outcome: &SubmitOutcome) {
        self.attempted += 1;
        match outcome {
            SubmitOutcome::Created(_) => self.created += 1,
            SubmitOutcome::Duplicate(_) => self.duplicates += 1,
            SubmitOutcome::NoImagery => self.no_imagery += 1,
            SubmitOutcome::Rejected(_) => self.rejected += 1,
            SubmitOutcome::Timeout => self.timeouts += 1,
            SubmitOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Created or duplicate both mean the cell has a rated point
    pub fn covered(&self) -> u64 {
        self.created + self.duplicates
    }

    /// Human-readable run summary
    pub fn report(&self, elapsed: Duration) -> String {
        let seconds = elapsed.as_secs_f64().max(0.001);
        let mut lines = vec![
            "Sampling run summary".to_string(),
            format!("  created:     {}", self.created),
            format!("  duplicates:  {}", self.duplicates),
            format!("  no imagery:  {}", self.no_imagery),
            format!("  rejected:    {}", self.rejected),
            format!("  timeouts:    {}", self.timeouts),
            format!("  failed:      {}", self.failed),
            format!("  attempted:   {}", self.attempted),
            format!("  elapsed:     {:.1}s", seconds),
            format!("  rate:        {:.1} req/s", self.attempted as f64 / seconds),
        ];
        if self.attempted > 0 {
            lines.push(format!(
                "  success:     {:.1}%",
                self.covered() as f64 / self.attempted as f64 * 100.0
            ));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_classifies_outcomes() {
        let mut stats = RunStats::default();
        stats.record(&SubmitOutcome::NoImagery);
        stats.record(&SubmitOutcome::Timeout);
        stats.record(&SubmitOutcome::Rejected("bad".to_string()));
        stats.record(&SubmitOutcome::Failed("boom".to_string()));

        assert_eq!(stats.attempted, 4);
        assert_eq!(stats.no_imagery, 1);
        assert_eq!(stats.timeouts, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.covered(), 0);
    }

    #[test]
    fn test_report_contains_tallies() {
        let stats = RunStats {
            attempted: 10,
            created: 7,
            duplicates: 1,
            no_imagery: 2,
            ..Default::default()
        };

        let report = stats.report(Duration::from_secs(5));
        assert!(report.contains("created:     7"));
        assert!(report.contains("duplicates:  1"));
        assert!(report.contains("no imagery:  2"));
        assert!(report.contains("80.0%"));
    }
}
