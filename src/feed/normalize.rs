//! Document shape normalization
//!
//! The backing collections accumulated several generations of field
//! spellings (English snake_case and the original Portuguese fields:
//! `time1`/`time2`, `jogadores`, `nome`, `rolePrincipal`, `uids`,
//! `vencedor`). Documents are normalized into the canonical structs once
//! when first read; no downstream consumer ever looks at raw shapes.

use crate::error::{LifecycleError, Result};
use crate::types::{
    Acceptance, HistoryMatch, PendingMatch, ReadyCheckStatus, RosterSlot, TeamRoster,
    UNRESOLVED_WINNER,
};
use crate::utils::current_timestamp;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use std::collections::HashMap;

fn str_field<'a>(doc: &'a Value, names: &[&str]) -> Option<&'a str> {
    names.iter().find_map(|name| doc.get(*name)?.as_str())
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    if let Some(text) = value.as_str() {
        return DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|dt| dt.with_timezone(&Utc));
    }
    let number = value.as_i64()?;
    // Heuristic: epoch milliseconds past ~2001, plain seconds otherwise.
    if number > 1_000_000_000_000 {
        Utc.timestamp_millis_opt(number).single()
    } else {
        Utc.timestamp_opt(number, 0).single()
    }
}

fn timestamp_field(doc: &Value, names: &[&str]) -> Option<DateTime<Utc>> {
    names
        .iter()
        .find_map(|name| parse_timestamp(doc.get(*name)?))
}

fn parse_status(raw: Option<&str>) -> ReadyCheckStatus {
    match raw {
        Some("confirmed") => ReadyCheckStatus::Confirmed,
        Some("cancelled") | Some("canceled") => ReadyCheckStatus::Cancelled,
        Some("expired") | Some("timeout") => ReadyCheckStatus::Expired,
        // New documents arrive as `readyCheck`/`pending`/`Aberta`; absence
        // means the matchmaker has not stamped a status yet.
        _ => ReadyCheckStatus::Open,
    }
}

fn roster_slot(value: &Value) -> RosterSlot {
    let player_id = str_field(value, &["player_id", "uid", "id"]).map(str::to_string);
    let name = str_field(value, &["name", "nome"])
        .map(str::to_string)
        .or_else(|| player_id.clone())
        .unwrap_or_else(|| "Jogador".to_string());
    let role = str_field(value, &["role", "rolePrincipal", "role_principal"]).map(str::to_string);
    RosterSlot {
        player_id,
        name,
        role,
    }
}

fn roster_players(team: &Value) -> Vec<RosterSlot> {
    team.get("players")
        .or_else(|| team.get("jogadores"))
        .and_then(Value::as_array)
        .map(|players| players.iter().map(roster_slot).collect())
        .unwrap_or_default()
}

fn team(doc: &Value, canonical_index: usize, legacy_key: &str, fallback_name: &str) -> TeamRoster {
    // Canonical shape first: a `teams` array of named rosters.
    if let Some(teams) = doc.get("teams").and_then(Value::as_array) {
        if let Some(value) = teams.get(canonical_index) {
            return TeamRoster {
                name: str_field(value, &["name", "nome"])
                    .unwrap_or(fallback_name)
                    .to_string(),
                players: roster_players(value),
            };
        }
    }
    // Legacy shape: `time1`/`time2` objects.
    if let Some(value) = doc.get(legacy_key) {
        return TeamRoster {
            name: str_field(value, &["name", "nome"])
                .unwrap_or(fallback_name)
                .to_string(),
            players: roster_players(value),
        };
    }
    TeamRoster {
        name: fallback_name.to_string(),
        players: vec![],
    }
}

fn teams(doc: &Value) -> [TeamRoster; 2] {
    [
        team(doc, 0, "time1", "Time 1"),
        team(doc, 1, "time2", "Time 2"),
    ]
}

fn participants(doc: &Value, rosters: &[TeamRoster; 2]) -> Vec<String> {
    let explicit: Vec<String> = doc
        .get("participants")
        .or_else(|| doc.get("uids"))
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    if !explicit.is_empty() {
        return explicit;
    }
    // Fall back to the roster ids when the matchmaker wrote none.
    rosters
        .iter()
        .flat_map(|roster| roster.players.iter())
        .filter_map(|slot| slot.player_id.clone())
        .collect()
}

fn acceptance_map(doc: &Value) -> HashMap<String, Acceptance> {
    let mut map = HashMap::new();
    if let Some(entries) = doc.get("acceptance").and_then(Value::as_object) {
        for (player, answer) in entries {
            match answer.as_str() {
                Some("accepted") => {
                    map.insert(player.clone(), Acceptance::Accepted);
                }
                Some("declined") => {
                    map.insert(player.clone(), Acceptance::Declined);
                }
                _ => {}
            }
        }
    }
    map
}

fn handles_map(doc: &Value) -> HashMap<String, String> {
    doc.get("notice_handles")
        .and_then(Value::as_object)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|(player, handle)| {
                    handle.as_str().map(|h| (player.clone(), h.to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Normalize a pending-match document.
///
/// `default_expiry` fills in `expires_at` for documents the matchmaker
/// wrote without one, measured from the creation timestamp.
pub fn pending_match_from_doc(
    doc_id: &str,
    doc: &Value,
    default_expiry: Duration,
) -> Result<PendingMatch> {
    if !doc.is_object() {
        return Err(LifecycleError::InternalError {
            message: format!("pending document {} is not an object", doc_id),
        }
        .into());
    }

    let rosters = teams(doc);
    let participants = participants(doc, &rosters);
    let created_at =
        timestamp_field(doc, &["created_at", "criadoEm"]).unwrap_or_else(current_timestamp);
    let expires_at = timestamp_field(doc, &["expires_at", "expiraEm"])
        .unwrap_or(created_at + default_expiry);

    Ok(PendingMatch {
        id: doc_id.to_string(),
        status: parse_status(str_field(doc, &["status"])),
        teams: rosters,
        participants,
        acceptance: acceptance_map(doc),
        notice_handles: handles_map(doc),
        channel_handle: str_field(doc, &["channel_handle"]).map(str::to_string),
        created_at,
        expires_at,
        history_ref: str_field(doc, &["history_ref", "historicoId"]).map(str::to_string),
    })
}

/// Normalize a history document.
pub fn history_match_from_doc(doc_id: &str, doc: &Value) -> Result<HistoryMatch> {
    if !doc.is_object() {
        return Err(LifecycleError::InternalError {
            message: format!("history document {} is not an object", doc_id),
        }
        .into());
    }

    let winner = str_field(doc, &["winner", "vencedor"])
        .unwrap_or(UNRESOLVED_WINNER)
        .to_string();
    // Canonical shape is a two-slot array; legacy documents carry
    // per-team fields.
    let mvp_slot = |index: usize| -> Option<String> {
        doc.get("team_mvps")
            .and_then(Value::as_array)
            .and_then(|mvps| mvps.get(index))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    let team_mvps = [
        mvp_slot(0).or_else(|| str_field(doc, &["mvpTime1", "mvp_team_one"]).map(str::to_string)),
        mvp_slot(1).or_else(|| str_field(doc, &["mvpTime2", "mvp_team_two"]).map(str::to_string)),
    ];

    Ok(HistoryMatch {
        id: doc_id.to_string(),
        teams: teams(doc),
        winner,
        team_mvps,
        proof_url: str_field(doc, &["proof_url", "comprovante"]).map(str::to_string),
        created_at: timestamp_field(doc, &["created_at", "criadoEm"])
            .unwrap_or_else(current_timestamp),
    })
}
