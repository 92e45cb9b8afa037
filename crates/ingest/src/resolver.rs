use storage::ScoreStore;
use storage::models::{ParticipantRef, UNRESOLVED_PREFIX};
use tracing::{debug, info};

use crate::Result;
use crate::directory::{Directory, DirectoryMember};

/// Map a bare name taken from a report to a directory member.
///
/// Matching is case-insensitive and runs in two tiers: first any member with
/// an alias equal to the token, then any member with an alias containing the
/// token. Within a tier the first member in directory order wins. When
/// nothing matches, the token is kept as an unresolved guess.
pub fn resolve(directory: &Directory, token: &str) -> ParticipantRef {
    match find_member(directory, token) {
        Some(member) => {
            debug!("Resolved '{}' to member {}", token, member.id);
            ParticipantRef::identified(member.id.clone())
        }
        None => {
            debug!("No directory member matches '{}'", token);
            ParticipantRef::unresolved(token)
        }
    }
}

fn find_member<'a>(directory: &'a Directory, token: &str) -> Option<&'a DirectoryMember> {
    if token.is_empty() {
        return None;
    }
    let needle = token.to_lowercase();

    directory
        .members()
        .iter()
        .find(|m| m.aliases().any(|alias| alias.to_lowercase() == needle))
        .or_else(|| {
            directory
                .members()
                .iter()
                .find(|m| m.aliases().any(|alias| alias.to_lowercase().contains(&needle)))
        })
}

/// Name to show for a participant. Never fails: unresolved guesses are shown
/// as-is and ids missing from the directory get a `User#<id>` placeholder.
pub fn display_name(directory: &Directory, participant: &ParticipantRef) -> String {
    match participant {
        ParticipantRef::Unresolved(guess) => guess.clone(),
        ParticipantRef::Identified(id) => directory
            .find_by_id(id)
            .map(|member| member.display_name.clone())
            .unwrap_or_else(|| format!("User#{}", id)),
    }
}

/// Retry every unresolved participant in the store against `directory` and
/// rekey the ones that now match. Returns how many participants were
/// upgraded; calling it again with the same directory upgrades none.
pub async fn reresolve_all<S>(directory: &Directory, store: &S) -> Result<usize>
where
    S: ScoreStore + ?Sized,
{
    let pending = store.participants_with_prefix(UNRESOLVED_PREFIX).await?;
    debug!(
        "{} unresolved participant(s) in {} store",
        pending.len(),
        store.name()
    );

    let mut upgraded = 0;
    for key in pending {
        let participant = ParticipantRef::from_storage_key(&key);
        let Some(guess) = participant.guess() else {
            continue;
        };

        let resolved = resolve(directory, guess);
        if resolved.is_unresolved() {
            continue;
        }

        let rewritten = store.rekey_participant(&participant, &resolved).await?;
        info!(
            "Resolved '{}' to {} ({} score record(s) updated)",
            guess, resolved, rewritten
        );
        upgraded += 1;
    }

    Ok(upgraded)
}
