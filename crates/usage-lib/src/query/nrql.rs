//! NRQL query construction

use crate::models::TimeWindow;
use std::fmt;

/// Averaged CPU, memory and disk usage for one entity, faceted by hostname.
///
/// The select list order is significant: the normalizer reads the
/// aggregates back by position as `[cpu, memory, disk]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NrqlQuery {
    pub entity_id: u64,
    pub window: TimeWindow,
}

impl NrqlQuery {
    pub fn system_usage(entity_id: u64, window: TimeWindow) -> Self {
        Self { entity_id, window }
    }
}

impl fmt::Display for NrqlQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SELECT average(cpuPercent), average(memoryUsedPercent), average(diskUsedPercent) \
             FROM SystemSample WHERE entityId = {} FACET hostname \
             SINCE {} UNTIL {} TIMESERIES 1 hour",
            self.entity_id, self.window.start, self.window.end
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_text() {
        let query = NrqlQuery::system_usage(8634054696753406258, TimeWindow::new(100, 3700));

        assert_eq!(
            query.to_string(),
            "SELECT average(cpuPercent), average(memoryUsedPercent), average(diskUsedPercent) \
             FROM SystemSample WHERE entityId = 8634054696753406258 FACET hostname \
             SINCE 100 UNTIL 3700 TIMESERIES 1 hour"
        );
    }
}
