/// A quest definition. `id` is stable across days; daily instances refer
/// back to it through their `base_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestBase {
    pub id: &'static str,
    pub title: &'static str,
    pub concept: &'static str,
    pub description: &'static str,
    pub xp: u64,
}

pub const QUEST_CATALOG: &[QuestBase] = &[
    QuestBase {
        id: "variables-1",
        title: "Name Your Companion",
        concept: "variables",
        description: "Store your companion's name in a variable and greet them by it.",
        xp: 20,
    },
    QuestBase {
        id: "conditionals-1",
        title: "The Guarded Bridge",
        concept: "conditionals",
        description: "Write an if/else that only lets travellers with a torch cross.",
        xp: 30,
    },
    QuestBase {
        id: "loops-1",
        title: "Count the Sheep",
        concept: "loops",
        description: "Use a loop to count every sheep in the meadow.",
        xp: 30,
    },
    QuestBase {
        id: "loops-2",
        title: "Patrol Route",
        concept: "loops",
        description: "Walk the guard around the village square three times with a while loop.",
        xp: 40,
    },
    QuestBase {
        id: "functions-1",
        title: "The Potion Recipe",
        concept: "functions",
        description: "Wrap the brewing steps in a function and brew two potions.",
        xp: 40,
    },
    QuestBase {
        id: "arrays-1",
        title: "Pack the Satchel",
        concept: "arrays",
        description: "Keep your inventory in a list and add three items to it.",
        xp: 30,
    },
    QuestBase {
        id: "strings-1",
        title: "Decode the Runes",
        concept: "strings",
        description: "Reverse the rune string on the old gate to reveal the password.",
        xp: 35,
    },
    QuestBase {
        id: "debugging-1",
        title: "The Broken Windmill",
        concept: "debugging",
        description: "Find and fix the off-by-one error that stops the windmill.",
        xp: 50,
    },
    QuestBase {
        id: "objects-1",
        title: "Forge a Sword",
        concept: "objects",
        description: "Describe a sword as an object with a name, damage and weight.",
        xp: 40,
    },
    QuestBase {
        id: "recursion-1",
        title: "The Endless Stair",
        concept: "recursion",
        description: "Climb the tower with a function that calls itself one step at a time.",
        xp: 60,
    },
];

pub fn find_quest_base(id: &str) -> Option<&'static QuestBase> {
    QUEST_CATALOG.iter().find(|base| base.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_ids_are_unique() {
        let ids: HashSet<_> = QUEST_CATALOG.iter().map(|base| base.id).collect();
        assert_eq!(ids.len(), QUEST_CATALOG.len());
    }

    #[test]
    fn every_quest_rewards_xp() {
        assert!(QUEST_CATALOG.iter().all(|base| base.xp > 0));
    }

    #[test]
    fn find_by_id() {
        assert_eq!(find_quest_base("loops-1").map(|b| b.concept), Some("loops"));
        assert!(find_quest_base("nope").is_none());
    }
}
