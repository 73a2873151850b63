use crate::query::StatementClass;
use crate::types::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Profiler switch and filters, passed to `DatabaseAdapter::set_profiler`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilerSettings {
    pub enabled: bool,
    /// Statements that finish faster than this are not kept
    pub filter_elapsed: Option<Duration>,
}

impl ProfilerSettings {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            filter_elapsed: None,
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_filter_elapsed(mut self, min: Duration) -> Self {
        self.filter_elapsed = Some(min);
        self
    }
}

impl From<bool> for ProfilerSettings {
    fn from(enabled: bool) -> Self {
        Self {
            enabled,
            filter_elapsed: None,
        }
    }
}

/// One executed statement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryProfile {
    pub query: String,
    pub params: Vec<Value>,
    pub class: StatementClass,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

/// Per-adapter statement history
#[derive(Debug, Clone, Default)]
pub struct Profiler {
    settings: ProfilerSettings,
    profiles: Vec<QueryProfile>,
}

impl Profiler {
    pub fn new(settings: ProfilerSettings) -> Self {
        Self {
            settings,
            profiles: Vec::new(),
        }
    }

    pub fn settings(&self) -> &ProfilerSettings {
        &self.settings
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Record a finished statement. No-op while disabled or when the
    /// statement is below the elapsed filter.
    pub fn record(
        &mut self,
        query: &str,
        params: &[Value],
        started_at: DateTime<Utc>,
        elapsed: Duration,
    ) {
        if !self.settings.enabled {
            return;
        }
        if let Some(min) = self.settings.filter_elapsed {
            if elapsed < min {
                return;
            }
        }
        self.profiles.push(QueryProfile {
            query: query.to_string(),
            params: params.to_vec(),
            class: crate::query::QueryTypeDetector::classify(query),
            started_at,
            elapsed,
        });
    }

    pub fn query_profiles(&self) -> &[QueryProfile] {
        &self.profiles
    }

    pub fn last_query_profile(&self) -> Option<&QueryProfile> {
        self.profiles.last()
    }

    pub fn total_num_queries(&self) -> usize {
        self.profiles.len()
    }

    pub fn total_num_queries_of(&self, class: StatementClass) -> usize {
        self.profiles.iter().filter(|p| p.class == class).count()
    }

    pub fn total_elapsed(&self) -> Duration {
        self.profiles.iter().map(|p| p.elapsed).sum()
    }

    pub fn clear(&mut self) {
        self.profiles.clear();
    }

    /// Human readable summary, one line per class
    pub fn report(&self) -> String {
        format!(
            "{} queries ({} read, {} write) in {:.3}ms",
            self.total_num_queries(),
            self.total_num_queries_of(StatementClass::Read),
            self.total_num_queries_of(StatementClass::Write),
            self.total_elapsed().as_secs_f64() * 1000.0
        )
    }
}
