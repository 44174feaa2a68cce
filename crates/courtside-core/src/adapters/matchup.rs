//! Home/away side assignment shared by adapters that report both sides of
//! a game.

use time::Date;
use tracing::debug;

use crate::{
    CanonicalTeam, GameResult, GameStatus, MatchupSide, ProviderId, TeamDirectory, UtcDateTime,
    Venue,
};

/// One side as the provider labelled it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReportedSide<'a> {
    pub abbreviation: &'a str,
    pub display_name: &'a str,
    pub score: i32,
}

/// A provider game before it is tied to a subject team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReportedGame<'a> {
    pub home: ReportedSide<'a>,
    pub away: ReportedSide<'a>,
    pub status: GameStatus,
    pub game_date: Option<Date>,
    pub start_time: Option<UtcDateTime>,
}

impl ReportedGame<'_> {
    /// The game from the away side's perspective.
    pub(crate) fn neutral(&self, directory: &TeamDirectory, provider: ProviderId) -> GameResult {
        self.build(directory, Venue::Away, provider)
    }

    /// The game from `subject`'s perspective, or `None` when `subject`
    /// cannot be placed on either side.
    pub(crate) fn for_subject(
        &self,
        directory: &TeamDirectory,
        subject: &CanonicalTeam,
        provider: ProviderId,
    ) -> Option<GameResult> {
        let venue = subject_venue(directory, subject, self.home, self.away)?;
        Some(self.build(directory, venue, provider))
    }

    fn build(&self, directory: &TeamDirectory, venue: Venue, provider: ProviderId) -> GameResult {
        let game = GameResult::from_sides(
            canonical_side(directory, self.home),
            canonical_side(directory, self.away),
            venue,
            self.status,
            self.game_date,
            provider,
        );
        match self.start_time {
            Some(start_time) => game.with_start_time(start_time),
            None => game,
        }
    }
}

/// Decides which side `subject` played on.
///
/// The abbreviation picks a tentative side. That side's display name must
/// not contradict the subject; if it does, the other side is checked once.
/// A game where neither side fits yields `None`.
pub(crate) fn subject_venue(
    directory: &TeamDirectory,
    subject: &CanonicalTeam,
    home: ReportedSide<'_>,
    away: ReportedSide<'_>,
) -> Option<Venue> {
    let abbreviation_of = |side: ReportedSide<'_>| {
        directory
            .lookup(side.abbreviation)
            .map(|team| team.id == subject.id)
    };

    let tentative = if abbreviation_of(home) == Some(true) {
        Venue::Home
    } else if abbreviation_of(away) == Some(true) || name_verdict(directory, subject, away) == Some(true) {
        Venue::Away
    } else {
        Venue::Home
    };

    for venue in [tentative, tentative.opposite()] {
        let side = match venue {
            Venue::Home => home,
            Venue::Away => away,
        };
        if side_is_subject(directory, subject, side) {
            if venue != tentative {
                debug!(subject = %subject.id, ?venue, "side check failed; using opposite side");
            }
            return Some(venue);
        }
    }
    None
}

fn name_verdict(
    directory: &TeamDirectory,
    subject: &CanonicalTeam,
    side: ReportedSide<'_>,
) -> Option<bool> {
    if side.display_name.trim().is_empty() {
        return None;
    }
    if subject.answers_to(side.display_name) {
        return Some(true);
    }
    let resolved = directory.resolve(side.display_name);
    (!resolved.synthetic).then(|| resolved.id == subject.id)
}

fn side_is_subject(directory: &TeamDirectory, subject: &CanonicalTeam, side: ReportedSide<'_>) -> bool {
    let by_abbreviation = directory
        .lookup(side.abbreviation)
        .map(|team| team.id == subject.id);
    let by_name = name_verdict(directory, subject, side);

    match (by_abbreviation, by_name) {
        (Some(false), _) | (_, Some(false)) => false,
        (Some(true), _) | (None, Some(true)) => true,
        (None, None) => side.abbreviation.eq_ignore_ascii_case(&subject.abbreviation),
    }
}

/// Canonical id and display name for a reported side.
pub(crate) fn canonical_side(directory: &TeamDirectory, side: ReportedSide<'_>) -> MatchupSide {
    let team = directory
        .lookup(side.abbreviation)
        .or_else(|| directory.lookup(side.display_name))
        .cloned()
        .unwrap_or_else(|| {
            let text = if side.display_name.trim().is_empty() {
                side.abbreviation
            } else {
                side.display_name
            };
            directory.resolve(text)
        });

    let name = if side.display_name.trim().is_empty() {
        team.canonical_name.clone()
    } else {
        side.display_name.trim().to_owned()
    };
    MatchupSide::new(team.id, name, side.score)
}
