//! Seeded log record generator.

use chrono::{NaiveDate, NaiveDateTime};
use logsim_core::LogRecord;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

const NUM_LOGINS: usize = 1000;
const NUM_EVENTS: usize = 100;
const NUM_SUBSYSTEMS: usize = 20;

const LOGIN_DOMAINS: [&str; 5] = [
    "gmail.com",
    "yahoo.com",
    "outlook.com",
    "company.org",
    "domain.net",
];

const EVENT_TYPES: [&str; 20] = [
    "login",
    "logout",
    "create",
    "update",
    "delete",
    "read",
    "search",
    "export",
    "import",
    "backup",
    "restore",
    "error",
    "warning",
    "info",
    "audit",
    "auth",
    "config_change",
    "password_reset",
    "session_start",
    "session_end",
];

const EVENT_SUFFIXES: [&str; 5] = ["_success", "_failed", "_attempt", "_complete", "_partial"];

const BASE_SUBSYSTEMS: [&str; 10] = [
    "auth",
    "db",
    "api",
    "ui",
    "storage",
    "network",
    "reporting",
    "monitoring",
    "billing",
    "messaging",
];

const SUBSYSTEM_SUFFIXES: [&str; 5] = ["_backend", "_frontend", "_v2", "_legacy", "_new"];

const COMMENT_TEMPLATES: [&str; 10] = [
    "User {login} performed {event} in {subsystem}",
    "Action {event} completed successfully in {subsystem}",
    "Failed to perform {event} in {subsystem} by {login}",
    "{event} operation was initiated by {login}",
    "System recorded {event} for subsystem {subsystem}",
    "Unexpected behavior during {event}",
    "Routine operation: {event}",
    "Security-related action: {event}",
    "Performance issue detected during {event}",
    "Debug information for {event}",
];

/// Generator that produces deterministic synthetic log records.
///
/// The vocabulary (logins, event kinds, subsystems) is derived from the
/// seed up front; records are then drawn from it one at a time. The same
/// seed always produces the same sequence.
pub struct LogGenerator {
    rng: StdRng,
    logins: Vec<String>,
    events: Vec<String>,
    subsystems: Vec<String>,
    index: u64,
}

impl LogGenerator {
    /// Create a new generator with the given seed.
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let logins = generate_logins(&mut rng);
        let events = generate_events(&mut rng);
        let subsystems = generate_subsystems(&mut rng);

        Self {
            rng,
            logins,
            events,
            subsystems,
            index: 0,
        }
    }

    /// How many records have been generated so far.
    pub fn current_index(&self) -> u64 {
        self.index
    }

    /// Generate the next log record.
    pub fn next_record(&mut self) -> LogRecord {
        let login = self
            .logins
            .choose(&mut self.rng)
            .expect("login vocabulary is non-empty")
            .clone();
        let event = self
            .events
            .choose(&mut self.rng)
            .expect("event vocabulary is non-empty")
            .clone();
        let subsystem = self
            .subsystems
            .choose(&mut self.rng)
            .expect("subsystem vocabulary is non-empty")
            .clone();

        let template = COMMENT_TEMPLATES
            .choose(&mut self.rng)
            .expect("comment templates are non-empty");
        let comment = template
            .replace("{login}", &login)
            .replace("{event}", &event)
            .replace("{subsystem}", &subsystem);

        let description = describe_event(&event);
        let timestamp = self.random_timestamp();

        self.index += 1;

        LogRecord {
            timestamp,
            login,
            event,
            subsystem,
            comment,
            description,
        }
    }

    /// Iterator over the next `count` records.
    pub fn records(&mut self, count: u64) -> LogRecordIter<'_> {
        LogRecordIter {
            generator: self,
            remaining: count,
        }
    }

    fn random_timestamp(&mut self) -> NaiveDateTime {
        let start = NaiveDate::from_ymd_opt(2000, 1, 1)
            .expect("valid start date")
            .and_hms_opt(0, 0, 0)
            .expect("valid start time");
        let end = NaiveDate::from_ymd_opt(2024, 12, 31)
            .expect("valid end date")
            .and_hms_opt(0, 0, 0)
            .expect("valid end time");

        let span_seconds = (end - start).num_seconds();
        start + chrono::Duration::seconds(self.rng.random_range(0..=span_seconds))
    }
}

/// Iterator that lazily draws records from a generator.
pub struct LogRecordIter<'a> {
    generator: &'a mut LogGenerator,
    remaining: u64,
}

impl Iterator for LogRecordIter<'_> {
    type Item = LogRecord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.generator.next_record())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for LogRecordIter<'_> {}

fn generate_logins(rng: &mut StdRng) -> Vec<String> {
    (1..=NUM_LOGINS)
        .map(|i| {
            let domain = LOGIN_DOMAINS
                .choose(rng)
                .expect("login domains are non-empty");
            format!("user{i}@{domain}")
        })
        .collect()
}

fn generate_events(rng: &mut StdRng) -> Vec<String> {
    (0..NUM_EVENTS)
        .map(|i| {
            if i < EVENT_TYPES.len() {
                EVENT_TYPES[i].to_string()
            } else {
                let base = EVENT_TYPES.choose(rng).expect("event types are non-empty");
                let suffix = EVENT_SUFFIXES
                    .choose(rng)
                    .expect("event suffixes are non-empty");
                format!("{base}{suffix}")
            }
        })
        .collect()
}

fn generate_subsystems(rng: &mut StdRng) -> Vec<String> {
    (0..NUM_SUBSYSTEMS)
        .map(|i| {
            if i < BASE_SUBSYSTEMS.len() {
                BASE_SUBSYSTEMS[i].to_string()
            } else {
                let base = BASE_SUBSYSTEMS
                    .choose(rng)
                    .expect("base subsystems are non-empty");
                let suffix = SUBSYSTEM_SUFFIXES
                    .choose(rng)
                    .expect("subsystem suffixes are non-empty");
                format!("{base}{suffix}")
            }
        })
        .collect()
}

fn describe_event(event: &str) -> String {
    match event {
        "login" => "User authentication in the system".to_string(),
        "logout" => "User session termination".to_string(),
        "create" => "Creation of a new resource".to_string(),
        "update" => "Modification of an existing resource".to_string(),
        "delete" => "Removal of a resource".to_string(),
        "error" => "System or application error occurred".to_string(),
        "warning" => "Potential issue that needs attention".to_string(),
        "info" => "Informational message about system operation".to_string(),
        _ if event.contains("_failed") => {
            format!("Failed attempt to perform {}", event.replace("_failed", ""))
        }
        _ if event.contains("_success") => {
            format!("Successful completion of {}", event.replace("_success", ""))
        }
        _ => format!("System event: {event}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_generation() {
        let mut gen1 = LogGenerator::new(42);
        let mut gen2 = LogGenerator::new(42);

        for _ in 0..100 {
            assert_eq!(gen1.next_record(), gen2.next_record());
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut gen1 = LogGenerator::new(42);
        let mut gen2 = LogGenerator::new(43);

        let first: Vec<_> = gen1.records(20).collect();
        let second: Vec<_> = gen2.records(20).collect();
        assert_ne!(first, second);
    }

    #[test]
    fn test_record_shape() {
        let mut generator = LogGenerator::new(7);
        let record = generator.next_record();

        assert!(record.login.contains('@'));
        assert!(!record.event.is_empty());
        assert!(!record.subsystem.is_empty());
        assert!(!record.comment.is_empty());
        assert!(!record.description.is_empty());

        let year = record.timestamp.format("%Y").to_string().parse::<i32>().unwrap();
        assert!((2000..=2024).contains(&year));
    }

    #[test]
    fn test_comment_placeholders_are_substituted() {
        let mut generator = LogGenerator::new(7);
        for record in generator.records(200) {
            assert!(!record.comment.contains("{login}"));
            assert!(!record.comment.contains("{event}"));
            assert!(!record.comment.contains("{subsystem}"));
        }
    }

    #[test]
    fn test_records_iterator_length() {
        let mut generator = LogGenerator::new(1);
        let records: Vec<_> = generator.records(50).collect();
        assert_eq!(records.len(), 50);
        assert_eq!(generator.current_index(), 50);
    }

    #[test]
    fn test_failed_event_description() {
        assert_eq!(
            describe_event("export_failed"),
            "Failed attempt to perform export"
        );
        assert_eq!(
            describe_event("backup_success"),
            "Successful completion of backup"
        );
        assert_eq!(describe_event("audit"), "System event: audit");
    }
}
