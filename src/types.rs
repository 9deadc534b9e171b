//! Common types used throughout the match lifecycle service

use crate::ladder::{Division, LadderRank, Tier};
use crate::utils::normalize_name;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique identifier for players
pub type PlayerId = String;

/// Unique identifier for pending and history match documents
pub type MatchId = String;

/// Opaque handle to a previously sent chat message, kept for later deletion
pub type MessageHandle = String;

/// The unresolved-winner sentinel stored on freshly promoted history records
pub const UNRESOLVED_WINNER: &str = "N/A";

/// A player's answer to a ready check. Absence from the map means undecided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Acceptance {
    Accepted,
    Declined,
}

/// Lifecycle status of a pending match document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadyCheckStatus {
    /// Ready check is running; players may still answer
    #[serde(alias = "readyCheck", alias = "pending", alias = "Aberta")]
    Open,
    /// Every participant accepted and the match was promoted to history
    Confirmed,
    /// A participant declined; the proposal was unwound
    Cancelled,
    /// The expiry timer fired before everyone answered
    #[serde(alias = "timeout")]
    Expired,
}

impl ReadyCheckStatus {
    /// Terminal documents are kept for audit but never reprocessed.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReadyCheckStatus::Open)
    }
}

impl std::fmt::Display for ReadyCheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadyCheckStatus::Open => write!(f, "open"),
            ReadyCheckStatus::Confirmed => write!(f, "confirmed"),
            ReadyCheckStatus::Cancelled => write!(f, "cancelled"),
            ReadyCheckStatus::Expired => write!(f, "expired"),
        }
    }
}

/// One seat on a team roster.
///
/// `player_id` is expected at roster-construction time; legacy documents may
/// carry only a display name, in which case resolution falls back to a
/// case-insensitive name lookup (lower trust, logged).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSlot {
    pub player_id: Option<PlayerId>,
    pub name: String,
    pub role: Option<String>,
}

/// A named, ordered team roster carried on pending and history documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRoster {
    pub name: String,
    pub players: Vec<RosterSlot>,
}

impl TeamRoster {
    /// Case/whitespace-insensitive comparison against a winner string.
    pub fn matches_winner(&self, winner: &str) -> bool {
        normalize_name(&self.name) == normalize_name(winner)
    }

    /// `• name (role)` lines as the announcement renderer expects them.
    pub fn player_lines(&self) -> Vec<String> {
        self.players
            .iter()
            .map(|slot| {
                let role = slot.role.as_deref().unwrap_or("Fill");
                format!("• {} ({})", slot.name, role)
            })
            .collect()
    }
}

/// A proposed match waiting on its ready check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingMatch {
    pub id: MatchId,
    pub status: ReadyCheckStatus,
    pub teams: [TeamRoster; 2],
    pub participants: Vec<PlayerId>,
    #[serde(default)]
    pub acceptance: HashMap<PlayerId, Acceptance>,
    /// Per-player notification message handles, kept so the announcements
    /// can be deleted when the check resolves.
    #[serde(default)]
    pub notice_handles: HashMap<PlayerId, MessageHandle>,
    /// Handle of the shared-channel announcement, if one was posted.
    #[serde(default)]
    pub channel_handle: Option<MessageHandle>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Back-reference to the promoted history record, set on confirmation.
    #[serde(default)]
    pub history_ref: Option<MatchId>,
}

impl PendingMatch {
    pub fn is_participant(&self, player_id: &str) -> bool {
        self.participants.iter().any(|p| p == player_id)
    }

    pub fn acceptance_of(&self, player_id: &str) -> Option<Acceptance> {
        self.acceptance.get(player_id).copied()
    }

    /// True when every participant has an explicit accept on record.
    pub fn all_accepted(&self) -> bool {
        !self.participants.is_empty()
            && self
                .participants
                .iter()
                .all(|p| self.acceptance.get(p) == Some(&Acceptance::Accepted))
    }

    /// Participants who accepted before the check resolved.
    pub fn accepted_players(&self) -> Vec<PlayerId> {
        self.participants
            .iter()
            .filter(|p| self.acceptance.get(*p) == Some(&Acceptance::Accepted))
            .cloned()
            .collect()
    }

    /// Participants with no answer on record.
    pub fn undecided_players(&self) -> Vec<PlayerId> {
        self.participants
            .iter()
            .filter(|p| !self.acceptance.contains_key(*p))
            .cloned()
            .collect()
    }

    /// Seconds until expiry, clamped at zero.
    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

/// Permanent record of a confirmed match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryMatch {
    pub id: MatchId,
    pub teams: [TeamRoster; 2],
    /// `UNRESOLVED_WINNER` until an external reporter writes a team name.
    pub winner: String,
    /// Per-team MVP display names, attached alongside the winner.
    #[serde(default)]
    pub team_mvps: [Option<String>; 2],
    /// Optional screenshot/audit reference attached by the reporter.
    #[serde(default)]
    pub proof_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl HistoryMatch {
    /// Whether the winner field holds a real team name rather than a
    /// sentinel. Legacy documents use "Pendente" for the same purpose.
    pub fn winner_is_resolved(&self) -> bool {
        let winner = self.winner.trim();
        !winner.is_empty() && winner != UNRESOLVED_WINNER && winner != "Pendente"
    }

    pub fn participant_ids(&self) -> Vec<PlayerId> {
        self.teams
            .iter()
            .flat_map(|team| team.players.iter())
            .filter_map(|slot| slot.player_id.clone())
            .collect()
    }
}

/// One waiting player in the authoritative queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub player_id: PlayerId,
    pub name: String,
    pub tag: String,
    pub tier: Tier,
    pub division: Division,
    pub primary_role: Option<String>,
    pub chat_user_id: Option<String>,
    pub joined_at: DateTime<Utc>,
}

impl QueueEntry {
    /// Rebuild a queue entry from the player's current profile.
    ///
    /// Proposal-time data is never reused; rank and role may have changed
    /// since the player last queued.
    pub fn from_profile(profile: &PlayerProfile, joined_at: DateTime<Utc>) -> Self {
        Self {
            player_id: profile.player_id.clone(),
            name: profile.name.clone(),
            tag: profile.tag.clone(),
            tier: profile.tier,
            division: profile.division,
            primary_role: profile.primary_role.clone(),
            chat_user_id: profile.chat_user_id.clone(),
            joined_at,
        }
    }
}

/// Per-player persistent record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub player_id: PlayerId,
    pub name: String,
    pub tag: String,
    pub tier: Tier,
    pub division: Division,
    /// 0–99 within the current division
    pub xp: u8,
    pub wins: u64,
    pub losses: u64,
    pub mvp_awards: u64,
    pub primary_role: Option<String>,
    /// Linked chat-platform user id, when the player completed linking.
    pub chat_user_id: Option<String>,
    pub notify_ready_check: bool,
    pub notify_result: bool,
    /// Re-join cooldown applied after declining a ready check.
    #[serde(default)]
    pub cooldown_until: Option<DateTime<Utc>>,
}

impl PlayerProfile {
    pub fn rank(&self) -> LadderRank {
        LadderRank::new(self.tier, self.division, self.xp)
    }

    pub fn set_rank(&mut self, rank: LadderRank) {
        self.tier = rank.tier;
        self.division = rank.division;
        self.xp = rank.xp;
    }

    pub fn on_cooldown(&self, now: DateTime<Utc>) -> bool {
        self.cooldown_until.map(|until| until > now).unwrap_or(false)
    }
}

/// Kind of change delivered by a collection subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// One change-feed delivery.
///
/// Payloads are raw document values; shape normalization happens once at
/// the feed boundary. Deliveries are at-least-once and carry no cross-
/// document ordering guarantees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub doc_id: String,
    pub kind: ChangeKind,
    pub data: Option<serde_json::Value>,
}

/// Buttons offered on a ready-check announcement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadyAction {
    Accept,
    Decline,
}

/// Render request for a ready-check announcement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyCheckView {
    pub title: String,
    pub player_lines: Vec<String>,
    pub seconds_remaining: i64,
    pub actions: Vec<ReadyAction>,
}

/// Render request for a winner announcement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WinnerView {
    pub winner: String,
    pub team_one: Vec<String>,
    pub team_two: Vec<String>,
}

/// Outcome of a finished match from one player's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOutcome {
    Victory,
    Defeat,
}

/// Per-player direct result summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSummary {
    pub outcome: MatchOutcome,
    pub xp_before: u8,
    pub xp_after: u8,
    pub tier: Tier,
    pub division: Division,
    pub is_mvp: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::current_timestamp;
    use chrono::Duration;

    fn slot(id: &str, name: &str) -> RosterSlot {
        RosterSlot {
            player_id: Some(id.to_string()),
            name: name.to_string(),
            role: Some("Mid".to_string()),
        }
    }

    fn two_player_match() -> PendingMatch {
        let now = current_timestamp();
        PendingMatch {
            id: "match-1".to_string(),
            status: ReadyCheckStatus::Open,
            teams: [
                TeamRoster {
                    name: "Time 1".to_string(),
                    players: vec![slot("a", "Alice")],
                },
                TeamRoster {
                    name: "Time 2".to_string(),
                    players: vec![slot("b", "Bruno")],
                },
            ],
            participants: vec!["a".to_string(), "b".to_string()],
            acceptance: HashMap::new(),
            notice_handles: HashMap::new(),
            channel_handle: None,
            created_at: now,
            expires_at: now + Duration::seconds(60),
            history_ref: None,
        }
    }

    #[test]
    fn test_all_accepted_requires_every_participant() {
        let mut pending = two_player_match();
        assert!(!pending.all_accepted());

        pending
            .acceptance
            .insert("a".to_string(), Acceptance::Accepted);
        assert!(!pending.all_accepted());

        pending
            .acceptance
            .insert("b".to_string(), Acceptance::Accepted);
        assert!(pending.all_accepted());
    }

    #[test]
    fn test_undecided_and_accepted_partition() {
        let mut pending = two_player_match();
        pending
            .acceptance
            .insert("a".to_string(), Acceptance::Accepted);

        assert_eq!(pending.accepted_players(), vec!["a".to_string()]);
        assert_eq!(pending.undecided_players(), vec!["b".to_string()]);
    }

    #[test]
    fn test_status_aliases_deserialize() {
        for legacy in ["\"readyCheck\"", "\"pending\"", "\"Aberta\"", "\"open\""] {
            let status: ReadyCheckStatus = serde_json::from_str(legacy).unwrap();
            assert_eq!(status, ReadyCheckStatus::Open);
        }
        let status: ReadyCheckStatus = serde_json::from_str("\"timeout\"").unwrap();
        assert_eq!(status, ReadyCheckStatus::Expired);
    }

    #[test]
    fn test_winner_sentinels_unresolved() {
        let now = current_timestamp();
        let mut record = HistoryMatch {
            id: "match-1".to_string(),
            teams: two_player_match().teams,
            winner: UNRESOLVED_WINNER.to_string(),
            team_mvps: [None, None],
            proof_url: None,
            created_at: now,
        };
        assert!(!record.winner_is_resolved());

        record.winner = "Pendente".to_string();
        assert!(!record.winner_is_resolved());

        record.winner = "Time 1".to_string();
        assert!(record.winner_is_resolved());
    }

    #[test]
    fn test_roster_winner_matching_is_normalized() {
        let roster = TeamRoster {
            name: "  Time Azul ".to_string(),
            players: vec![],
        };
        assert!(roster.matches_winner("time azul"));
        assert!(!roster.matches_winner("time vermelho"));
    }
}
