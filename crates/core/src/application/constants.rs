// Scheduling constants (no magic values)
use std::time::Duration;

/// Coarse upper bound on how long the scheduler worker sleeps between wakes (60s)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Delay between `start()` and the one-shot startup transition check (10s)
pub const DEFAULT_STARTUP_DELAY: Duration = Duration::from_secs(10);

/// Days before a quarter boundary during which the next partition is prepared
pub const DEFAULT_LOOKAHEAD_DAYS: i64 = 7;

/// Daily transition check time of day (UTC)
pub const DEFAULT_DAILY_HOUR: u32 = 0;
pub const DEFAULT_DAILY_MINUTE: u32 = 5;

/// Weekly maintenance time of day (UTC), on DEFAULT_WEEKLY_DAY
pub const DEFAULT_WEEKLY_HOUR: u32 = 9;
pub const DEFAULT_WEEKLY_MINUTE: u32 = 0;
pub const DEFAULT_WEEKLY_DAY: chrono::Weekday = chrono::Weekday::Mon;

/// Registered job names
pub const JOB_DAILY_TRANSITION: &str = "daily_transition_check";
pub const JOB_WEEKLY_MAINTENANCE: &str = "weekly_maintenance";
pub const JOB_STARTUP_TRANSITION: &str = "startup_transition_check";

/// Maintenance check names, in report order
pub const CHECK_CURRENT_SHEET: &str = "current_quarter_sheet_exists";
pub const CHECK_NEXT_PREPARATION: &str = "next_quarter_preparation";
pub const CHECK_NEXT_CREATION: &str = "next_quarter_sheet_creation";
pub const CHECK_TEMPLATE: &str = "master_template_sheet";
pub const CHECK_MAPPER: &str = "record_mapper_sheet";
pub const CHECK_CONNECTIVITY: &str = "registry_connectivity";

pub const CHECK_ORDER: [&str; 6] = [
    CHECK_CURRENT_SHEET,
    CHECK_NEXT_PREPARATION,
    CHECK_NEXT_CREATION,
    CHECK_TEMPLATE,
    CHECK_MAPPER,
    CHECK_CONNECTIVITY,
];
