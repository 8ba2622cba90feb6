//! The one unlock-condition evaluator every subsystem gates on.

use crate::schema::arc::Arc;
use crate::schema::character::CharacterSnapshot;
use crate::schema::integration::UnlockCondition;

pub fn is_unlocked(condition: &UnlockCondition, arc: &Arc, character: &CharacterSnapshot) -> bool {
    match condition {
        UnlockCondition::ArcProgress(percent) => arc.progression.progress_percent >= *percent,
        UnlockCondition::CharacterLevel(level) => character.level >= *level,
        UnlockCondition::ChoiceMade(choice) => arc.has_made_choice(choice),
    }
}

/// True when every condition holds. An empty list is always unlocked.
pub fn all_unlocked(
    conditions: &[UnlockCondition],
    arc: &Arc,
    character: &CharacterSnapshot,
) -> bool {
    conditions.iter().all(|c| is_unlocked(c, arc, character))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::arc::{
        ArcArchetype, ArcId, CharacterId, ChoiceCategory, ChoiceImpact, ChoiceRecord,
    };

    fn setup() -> (Arc, CharacterSnapshot) {
        let mut arc = Arc::new(ArcId(1), CharacterId(1), 1, ArcArchetype::Mystery);
        arc.progression.progress_percent = 50.0;
        arc.progression.choice_history.push(ChoiceRecord {
            turn: 2,
            choice_id: "spare_thief".to_string(),
            text: "Let the thief go".to_string(),
            category: ChoiceCategory::Moral,
            impact: ChoiceImpact::Major,
            quality: 0.9,
        });
        (arc, CharacterSnapshot::new(CharacterId(1), "Ada", 6))
    }

    #[test]
    fn progress_threshold_is_inclusive() {
        let (arc, character) = setup();
        assert!(is_unlocked(&UnlockCondition::ArcProgress(50.0), &arc, &character));
        assert!(!is_unlocked(&UnlockCondition::ArcProgress(50.5), &arc, &character));
    }

    #[test]
    fn level_gate() {
        let (arc, character) = setup();
        assert!(is_unlocked(&UnlockCondition::CharacterLevel(6), &arc, &character));
        assert!(!is_unlocked(&UnlockCondition::CharacterLevel(7), &arc, &character));
    }

    #[test]
    fn choice_gate_matches_id_or_text() {
        let (arc, character) = setup();
        assert!(is_unlocked(
            &UnlockCondition::ChoiceMade("spare_thief".to_string()),
            &arc,
            &character
        ));
        assert!(is_unlocked(
            &UnlockCondition::ChoiceMade("let the thief go".to_string()),
            &arc,
            &character
        ));
        assert!(!is_unlocked(
            &UnlockCondition::ChoiceMade("hang_thief".to_string()),
            &arc,
            &character
        ));
    }

    #[test]
    fn all_unlocked_needs_every_condition() {
        let (arc, character) = setup();
        let conditions = vec![
            UnlockCondition::ArcProgress(25.0),
            UnlockCondition::CharacterLevel(9),
        ];
        assert!(!all_unlocked(&conditions, &arc, &character));
        assert!(all_unlocked(&[], &arc, &character));
    }
}
