//! Today's quests, derived from the calendar date alone.
//!
//! The date string is hashed with SHA-256 and the first eight bytes seed a
//! ChaCha8 generator that picks the day's quests from the catalog. Any two
//! sessions that agree on the date agree on the quests, with no server and
//! no stored state.

use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::catalog::{QuestBase, QUEST_CATALOG};

pub const DAILY_QUEST_COUNT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyQuest {
    /// Instance id, unique per date and base quest.
    pub id: String,
    pub base_id: &'static str,
    pub title: &'static str,
    pub concept: &'static str,
    pub description: &'static str,
    pub xp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyQuestSet {
    pub date: String,
    pub quests: Vec<DailyQuest>,
}

impl DailyQuestSet {
    pub fn total_xp(&self) -> u64 {
        self.quests.iter().map(|quest| quest.xp).sum()
    }

    pub fn contains(&self, base_id: &str) -> bool {
        self.quests.iter().any(|quest| quest.base_id == base_id)
    }

    pub fn base_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.quests.iter().map(|quest| quest.base_id)
    }
}

fn seed_for_date(date: &str) -> u64 {
    let digest = Sha256::digest(date.as_bytes());
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed)
}

fn instance_id(date: &str, base: &QuestBase) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{date}:{}", base.id).as_bytes()).to_string()
}

pub fn daily_quest_set(date: &str) -> DailyQuestSet {
    let mut rng = ChaCha8Rng::seed_from_u64(seed_for_date(date));
    let count = DAILY_QUEST_COUNT.min(QUEST_CATALOG.len());
    let quests = index::sample(&mut rng, QUEST_CATALOG.len(), count)
        .into_iter()
        .map(|i| {
            let base = &QUEST_CATALOG[i];
            DailyQuest {
                id: instance_id(date, base),
                base_id: base.id,
                title: base.title,
                concept: base.concept,
                description: base.description,
                xp: base.xp,
            }
        })
        .collect();
    DailyQuestSet {
        date: date.to_string(),
        quests,
    }
}
