use onair_core::{LinkDirection, Participant, ParticipantId};
use std::collections::BTreeMap;

/// Links the local participant should hold given the active participants.
///
/// A speaker holds one outbound link per active listener, and only while its
/// audio track is live. A listener holds one inbound link per active speaker.
/// An unknown or inactive local participant holds none.
pub fn required_links(
    local_id: ParticipantId,
    participants: &[Participant],
    track_live: bool,
) -> BTreeMap<ParticipantId, LinkDirection> {
    let Some(local) = participants.iter().find(|p| p.id == local_id && p.active) else {
        return BTreeMap::new();
    };

    let remotes = participants.iter().filter(|p| p.id != local_id);

    if local.role.is_speaker() {
        if !track_live {
            return BTreeMap::new();
        }
        remotes
            .filter(|p| p.is_active_listener())
            .map(|p| (p.id, LinkDirection::Outbound))
            .collect()
    } else {
        remotes
            .filter(|p| p.is_active_speaker())
            .map(|p| (p.id, LinkDirection::Inbound))
            .collect()
    }
}
