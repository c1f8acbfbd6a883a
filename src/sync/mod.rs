//! The sync engine: mailbox processing, command dispatch and the
//! per-cycle loop over all configured mailboxes.
pub mod appointments;
pub mod mailbox;
pub mod maintenance;
pub mod orchestrator;
pub mod report;

pub use appointments::{AppointmentSynchronizer, MatchPolicy};
pub use mailbox::SyncOptions;
pub use report::{
    CycleReport, Disposition, ItemOutcome, ItemReport, MailboxReport, Summary, SyncOutcome,
};

use chrono::{DateTime, Utc};

use crate::core::AppConfig;
use crate::parse::CommandParser;

pub struct SyncEngine {
    parser: CommandParser,
    synchronizer: AppointmentSynchronizer,
    options: SyncOptions,
    clock: fn() -> DateTime<Utc>,
}

impl SyncEngine {
    pub fn new(
        parser: CommandParser,
        synchronizer: AppointmentSynchronizer,
        options: SyncOptions,
    ) -> Self {
        Self {
            parser,
            synchronizer,
            options,
            clock: Utc::now,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            CommandParser::new(config.time_zone),
            AppointmentSynchronizer::new(config.time_zone, config.find_limit),
            SyncOptions::from(config),
        )
    }

    /// Override the processing time stamped into appointment notes
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn options(&self) -> SyncOptions {
        self.options
    }
}
