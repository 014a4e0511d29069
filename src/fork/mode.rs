use std::fmt;
use std::str::FromStr;

use crate::errors::FleetError;

/// Operator's raw mode selection, before any confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeChoice {
    /// Sync valid forks, create missing ones.
    SyncAndKeep,
    /// Delete whatever sits at each fork path, then create fresh forks.
    ForceClean,
}

impl ModeChoice {
    pub const ALL: [ModeChoice; 2] = [ModeChoice::SyncAndKeep, ModeChoice::ForceClean];

    pub fn label(self) -> &'static str {
        match self {
            ModeChoice::SyncAndKeep => "Sync & Keep: sync existing forks, create missing ones",
            ModeChoice::ForceClean => "Force Clean & Create: DELETE existing forks, then recreate (destructive)",
        }
    }

    pub fn is_destructive(self) -> bool {
        matches!(self, ModeChoice::ForceClean)
    }
}

impl fmt::Display for ModeChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModeChoice::SyncAndKeep => f.write_str("sync"),
            ModeChoice::ForceClean => f.write_str("force-clean"),
        }
    }
}

impl FromStr for ModeChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sync" | "sync-and-keep" | "1" => Ok(ModeChoice::SyncAndKeep),
            "force-clean" | "clean" | "2" => Ok(ModeChoice::ForceClean),
            other => Err(format!(
                "unknown mode '{}', expected 'sync' or 'force-clean'",
                other
            )),
        }
    }
}

/// Proof that the operator agreed to deletions. Only [`ForkMode::resolve`]
/// creates one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletionConsent(());

/// Resolved run mode handed to the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkMode {
    SyncAndKeep,
    ForceClean(DeletionConsent),
}

impl ForkMode {
    /// Turn a selection plus the operator's answer into a mode.
    ///
    /// `confirmed` is ignored for the non-destructive mode. For
    /// `ForceClean`, anything but `Some(true)` aborts the batch.
    pub fn resolve(choice: ModeChoice, confirmed: Option<bool>) -> Result<Self, FleetError> {
        match choice {
            ModeChoice::SyncAndKeep => Ok(ForkMode::SyncAndKeep),
            ModeChoice::ForceClean => match confirmed {
                Some(true) => Ok(ForkMode::ForceClean(DeletionConsent(()))),
                _ => Err(FleetError::ConfirmationDeclined),
            },
        }
    }

    pub fn choice(&self) -> ModeChoice {
        match self {
            ForkMode::SyncAndKeep => ModeChoice::SyncAndKeep,
            ForkMode::ForceClean(_) => ModeChoice::ForceClean,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_needs_no_confirmation() {
        assert_eq!(
            ForkMode::resolve(ModeChoice::SyncAndKeep, None).unwrap(),
            ForkMode::SyncAndKeep
        );
        assert_eq!(
            ForkMode::resolve(ModeChoice::SyncAndKeep, Some(false)).unwrap(),
            ForkMode::SyncAndKeep
        );
    }

    #[test]
    fn test_force_clean_requires_yes() {
        let mode = ForkMode::resolve(ModeChoice::ForceClean, Some(true)).unwrap();
        assert_eq!(mode.choice(), ModeChoice::ForceClean);

        for answer in [None, Some(false)] {
            assert!(matches!(
                ForkMode::resolve(ModeChoice::ForceClean, answer),
                Err(FleetError::ConfirmationDeclined)
            ));
        }
    }

    #[test]
    fn test_parse_choice() {
        assert_eq!("sync".parse::<ModeChoice>().unwrap(), ModeChoice::SyncAndKeep);
        assert_eq!(" Force-Clean ".parse::<ModeChoice>().unwrap(), ModeChoice::ForceClean);
        assert_eq!("2".parse::<ModeChoice>().unwrap(), ModeChoice::ForceClean);
        assert!("delete-everything".parse::<ModeChoice>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for choice in ModeChoice::ALL {
            assert_eq!(choice.to_string().parse::<ModeChoice>().unwrap(), choice);
        }
    }
}
