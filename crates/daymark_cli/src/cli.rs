use clap::{Parser, Subcommand, ValueEnum};
use daymark_core::{EntryStatus, Frequency, Priority, ScoreCategory};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "daymark")]
#[command(about = "Daily log with a four-slot focus list, streaks and points")]
#[command(version)]
pub struct Cli {
    /// Config file (TOML). Defaults to the platform config directory.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory holding the journal database and logs.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Add a task for today
    AddTask {
        content: String,
        #[arg(long, value_enum, default_value_t = PriorityArg::Normal)]
        priority: PriorityArg,
        /// Target amount for progress logging
        #[arg(long)]
        quantity: Option<u32>,
        #[arg(long, requires = "quantity")]
        unit: Option<String>,
        /// Repeat every day
        #[arg(long, conflicts_with_all = ["weekly", "monthly"])]
        daily: bool,
        /// Repeat on ISO weekdays (1 = Monday), e.g. `--weekly 1,3,5`
        #[arg(long, value_delimiter = ',', conflicts_with = "monthly")]
        weekly: Option<Vec<u8>>,
        /// Repeat on days of the month, e.g. `--monthly 1,15`
        #[arg(long, value_delimiter = ',')]
        monthly: Option<Vec<u8>>,
    },
    /// Log a mood note scored -2..=2
    AddMood {
        content: String,
        #[arg(long, allow_hyphen_values = true)]
        score: i8,
    },
    /// Move a task into the focus list
    Focus { id: Uuid },
    /// Release a task's focus slot
    Unfocus { id: Uuid },
    /// Complete a task and collect points
    Done { id: Uuid },
    /// Revert a completion
    Undo { id: Uuid },
    /// Add progress towards a task's quantity
    Progress { id: Uuid, amount: u32 },
    /// Soft-delete an entry
    Delete { id: Uuid },
    /// Grant points for an action outside task completion
    Award {
        #[arg(value_enum)]
        category: CategoryArg,
    },
    /// List today's entries and the focus list
    Today,
    /// List entries in one status, e.g. the recurring tasks still completed
    List {
        #[arg(value_enum, default_value_t = StatusArg::Active)]
        status: StatusArg,
    },
    /// Show total points and level
    Score,
    /// Run the daily reset if it has not run today
    Reset,
    /// Keep running the daily reset until interrupted
    Watch,
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PriorityArg {
    Normal,
    Important,
    Urgent,
    Critical,
}

impl From<PriorityArg> for Priority {
    fn from(value: PriorityArg) -> Self {
        match value {
            PriorityArg::Normal => Priority::Normal,
            PriorityArg::Important => Priority::Important,
            PriorityArg::Urgent => Priority::Urgent,
            PriorityArg::Critical => Priority::Critical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Active,
    Completed,
    Archived,
}

impl From<StatusArg> for EntryStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Active => EntryStatus::Active,
            StatusArg::Completed => EntryStatus::Completed,
            StatusArg::Archived => EntryStatus::Archived,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CategoryArg {
    IdentityFill,
    HabitLog,
    NoteNew,
}

impl From<CategoryArg> for ScoreCategory {
    fn from(value: CategoryArg) -> Self {
        match value {
            CategoryArg::IdentityFill => ScoreCategory::IdentityFill,
            CategoryArg::HabitLog => ScoreCategory::HabitLog,
            CategoryArg::NoteNew => ScoreCategory::NoteNew,
        }
    }
}

/// Maps the mutually exclusive repeat flags to a frequency.
pub fn frequency_from_flags(
    daily: bool,
    weekly: Option<Vec<u8>>,
    monthly: Option<Vec<u8>>,
) -> Frequency {
    match (daily, weekly, monthly) {
        (true, _, _) => Frequency::Daily,
        (_, Some(days), _) => Frequency::Weekly(days),
        (_, _, Some(dates)) => Frequency::Monthly(dates),
        _ => Frequency::Once,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekly_flag_parses_comma_list() {
        let cli = Cli::parse_from(["daymark", "add-task", "Stretch", "--weekly", "1,3,5"]);
        let Command::AddTask {
            daily,
            weekly,
            monthly,
            ..
        } = cli.command
        else {
            panic!("expected add-task");
        };
        assert_eq!(
            frequency_from_flags(daily, weekly, monthly),
            Frequency::Weekly(vec![1, 3, 5])
        );
    }

    #[test]
    fn negative_mood_score_is_accepted() {
        let cli = Cli::parse_from(["daymark", "add-mood", "rough day", "--score", "-2"]);
        assert!(matches!(cli.command, Command::AddMood { score: -2, .. }));
    }

    #[test]
    fn list_defaults_to_active_and_hides_deleted() {
        let cli = Cli::parse_from(["daymark", "list"]);
        assert!(matches!(
            cli.command,
            Command::List {
                status: StatusArg::Active
            }
        ));
        assert!(Cli::try_parse_from(["daymark", "list", "deleted"]).is_err());
    }

    #[test]
    fn repeat_flags_conflict() {
        let parsed =
            Cli::try_parse_from(["daymark", "add-task", "x", "--daily", "--monthly", "1"]);
        assert!(parsed.is_err());
    }
}
