//! Character progression and the daily quest board.
//!
//! Everything here is a pure transformation from an old snapshot to a new
//! one. Persisted blobs are untrusted: the `normalize_*` and `parse_*`
//! functions are the only way in, and they never fail.

mod coerce;

pub mod catalog;
pub mod progression;
pub mod questmaster;
pub mod quests;
pub mod store;

pub use progression::{
    apply_xp_reward, normalize_character_stats, parse_character_stats, xp_required_for_level,
    CharacterStats,
};
pub use questmaster::{
    can_claim_daily_reward, claim_daily_reward, normalize_questmaster_save,
    parse_questmaster_save, reconcile_to_date, today_local, toggle_quest, ClaimOutcome,
    QuestmasterSave,
};
pub use quests::{daily_quest_set, DailyQuest, DailyQuestSet};
pub use store::{
    load_character_stats, load_questmaster_save, save_character_stats, save_questmaster_save,
    JsonFileStore, MemoryStore, SaveStore,
};
