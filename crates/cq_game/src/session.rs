//! Progress for one player: character stats plus the daily quest board,
//! written back to the save store after every change.

use cq_progress::store::{
    load_character_stats, load_questmaster_save, save_character_stats, save_questmaster_save,
};
use cq_progress::{
    apply_xp_reward, can_claim_daily_reward, claim_daily_reward, daily_quest_set,
    reconcile_to_date, toggle_quest, CharacterStats, ClaimOutcome, DailyQuestSet,
    QuestmasterSave, SaveStore,
};

pub struct Session {
    store: Box<dyn SaveStore>,
    stats: CharacterStats,
    quests: QuestmasterSave,
    board: DailyQuestSet,
}

impl Session {
    pub fn open(store: Box<dyn SaveStore>, today: &str) -> Self {
        let stats = load_character_stats(store.as_ref());
        let quests = load_questmaster_save(store.as_ref(), today);
        let board = daily_quest_set(today);
        log::info!(
            "Session loaded: level {} ({} xp), streak {}, {} quests for {}",
            stats.level,
            stats.xp,
            quests.streak,
            board.quests.len(),
            today
        );
        Self {
            store,
            stats,
            quests,
            board,
        }
    }

    pub fn stats(&self) -> CharacterStats {
        self.stats
    }

    pub fn quests(&self) -> &QuestmasterSave {
        &self.quests
    }

    pub fn board(&self) -> &DailyQuestSet {
        &self.board
    }

    /// Switch to a new calendar day if `today` differs from the board's.
    /// Returns whether the board changed.
    pub fn roll_over(&mut self, today: &str) -> bool {
        if self.board.date == today {
            return false;
        }
        self.board = daily_quest_set(today);
        self.quests = reconcile_to_date(&self.quests, today);
        self.persist_quests();
        true
    }

    /// Toggle the `index`th quest on today's board. Out-of-range indices do
    /// nothing.
    pub fn toggle_quest_at(&mut self, index: usize) -> bool {
        let Some(base_id) = self.board.quests.get(index).map(|quest| quest.base_id) else {
            return false;
        };
        self.toggle_quest(base_id)
    }

    pub fn toggle_quest(&mut self, base_id: &str) -> bool {
        let next = toggle_quest(&self.quests, &self.board, base_id);
        if next == self.quests {
            return false;
        }
        self.quests = next;
        self.persist_quests();
        true
    }

    pub fn is_completed(&self, base_id: &str) -> bool {
        self.quests.date == self.board.date && self.quests.completed_base_ids.contains(base_id)
    }

    pub fn completed_count(&self) -> usize {
        self.board
            .base_ids()
            .filter(|base_id| self.is_completed(base_id))
            .count()
    }

    pub fn can_claim(&self) -> bool {
        can_claim_daily_reward(&self.quests, &self.board)
    }

    /// Claim today's reward and credit its XP to the character. The stats
    /// are written before the claim; if that write fails nothing changes.
    pub fn claim_daily_reward(&mut self) -> Result<Option<ClaimOutcome>, String> {
        let Some(outcome) = claim_daily_reward(&self.quests, &self.board) else {
            return Ok(None);
        };
        let stats = apply_xp_reward(self.stats, outcome.xp_awarded as f64);
        save_character_stats(self.store.as_mut(), &stats)
            .map_err(|e| format!("Reward not claimed, failed to save character stats: {e}"))?;
        self.set_stats(stats);

        self.quests = outcome.save.clone();
        save_questmaster_save(self.store.as_mut(), &self.quests)
            .map_err(|e| format!("Reward XP saved but the claim was not recorded: {e}"))?;
        Ok(Some(outcome))
    }

    pub fn award_xp(&mut self, reward: f64) {
        let next = apply_xp_reward(self.stats, reward);
        if next == self.stats {
            return;
        }
        self.set_stats(next);
        if let Err(err) = save_character_stats(self.store.as_mut(), &self.stats) {
            log::error!("Failed to save character stats: {err}");
        }
    }

    fn set_stats(&mut self, stats: CharacterStats) {
        if stats.level > self.stats.level {
            log::info!("Level up: {} -> {}", self.stats.level, stats.level);
        }
        self.stats = stats;
    }

    /// One-line status for the window title.
    pub fn status_line(&self) -> String {
        let claim = if self.quests.has_claimed(&self.board.date) {
            " - reward claimed"
        } else if self.can_claim() {
            " - reward ready"
        } else {
            ""
        };
        format!(
            "Lv {} ({}/{} xp) - streak {} - quests {}/{}{}",
            self.stats.level,
            self.stats.xp,
            cq_progress::xp_required_for_level(self.stats.level),
            self.quests.streak,
            self.completed_count(),
            self.board.quests.len(),
            claim
        )
    }

    fn persist_quests(&mut self) {
        if let Err(err) = save_questmaster_save(self.store.as_mut(), &self.quests) {
            log::error!("Failed to save quest progress: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cq_progress::store::{CHARACTER_STATS_KEY, QUESTMASTER_KEY};
    use cq_progress::MemoryStore;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    /// Store whose contents outlive the session, so reloads can be checked.
    #[derive(Clone, Default)]
    struct SharedStore(Rc<RefCell<HashMap<String, String>>>);

    impl SaveStore for SharedStore {
        fn get(&self, key: &str) -> Option<String> {
            self.0.borrow().get(key).cloned()
        }

        fn set(&mut self, key: &str, value: String) -> Result<(), String> {
            self.0.borrow_mut().insert(key.to_string(), value);
            Ok(())
        }
    }

    /// Shared store that refuses writes to one key.
    struct FailingStore {
        inner: SharedStore,
        failing_key: &'static str,
    }

    impl SaveStore for FailingStore {
        fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: String) -> Result<(), String> {
            if key == self.failing_key {
                return Err("disk full".to_string());
            }
            self.inner.set(key, value)
        }
    }

    fn complete_board(session: &mut Session) {
        for index in 0..session.board().quests.len() {
            assert!(session.toggle_quest_at(index));
        }
    }

    #[test]
    fn fresh_session_starts_at_level_one() {
        let session = Session::open(Box::new(MemoryStore::new()), "2024-09-01");
        assert_eq!(session.stats(), CharacterStats::default());
        assert_eq!(session.quests().streak, 0);
        assert_eq!(session.completed_count(), 0);
        assert!(!session.can_claim());
    }

    #[test]
    fn claim_credits_character_and_persists() {
        let store = SharedStore::default();
        let mut session = Session::open(Box::new(store.clone()), "2024-09-01");
        complete_board(&mut session);
        assert!(session.can_claim());

        let xp = session.board().total_xp();
        let outcome = session.claim_daily_reward().expect("saved").expect("claim");
        assert_eq!(outcome.xp_awarded, xp);
        assert_eq!(
            session.stats(),
            apply_xp_reward(CharacterStats::default(), xp as f64)
        );
        assert!(session.claim_daily_reward().expect("saved").is_none());
        assert!(store.get(CHARACTER_STATS_KEY).is_some());
        assert!(store.get(QUESTMASTER_KEY).is_some());

        let reloaded = Session::open(Box::new(store), "2024-09-01");
        assert_eq!(reloaded.stats(), session.stats());
        assert_eq!(reloaded.quests(), session.quests());
        assert!(reloaded.status_line().ends_with("reward claimed"));
    }

    #[test]
    fn claim_is_not_recorded_when_stats_cannot_be_saved() {
        let shared = SharedStore::default();
        let store = FailingStore {
            inner: shared.clone(),
            failing_key: CHARACTER_STATS_KEY,
        };
        let mut session = Session::open(Box::new(store), "2024-09-06");
        complete_board(&mut session);

        let err = session.claim_daily_reward().expect_err("stats write fails");
        assert!(err.contains("Reward not claimed"));
        assert_eq!(session.stats(), CharacterStats::default());
        assert!(session.can_claim());
        assert!(!session.quests().has_claimed("2024-09-06"));

        let reloaded = Session::open(Box::new(shared), "2024-09-06");
        assert!(reloaded.can_claim());
    }

    #[test]
    fn failed_claim_record_is_reported_after_xp_is_saved() {
        let shared = SharedStore::default();
        let store = FailingStore {
            inner: shared.clone(),
            failing_key: QUESTMASTER_KEY,
        };
        let mut session = Session::open(Box::new(store), "2024-09-07");
        for index in 0..session.board().quests.len() {
            // Toggles log their write failure and still update the session.
            session.toggle_quest_at(index);
        }

        let err = session.claim_daily_reward().expect_err("quest write fails");
        assert!(err.contains("claim was not recorded"));
        assert!(session.stats() != CharacterStats::default());
        assert!(shared.get(CHARACTER_STATS_KEY).is_some());
    }

    #[test]
    fn toggles_persist_and_out_of_range_is_ignored() {
        let store = SharedStore::default();
        let mut session = Session::open(Box::new(store.clone()), "2024-09-02");
        assert!(session.toggle_quest_at(1));
        assert!(!session.toggle_quest_at(99));
        assert!(!session.toggle_quest("not-on-board"));

        let reloaded = Session::open(Box::new(store), "2024-09-02");
        assert_eq!(reloaded.completed_count(), 1);
    }

    #[test]
    fn roll_over_clears_completions_and_keeps_streak() {
        let mut session = Session::open(Box::new(MemoryStore::new()), "2024-09-03");
        complete_board(&mut session);
        session.claim_daily_reward().expect("saved").expect("claim");
        assert!(!session.roll_over("2024-09-03"));

        assert!(session.roll_over("2024-09-04"));
        assert_eq!(session.board().date, "2024-09-04");
        assert_eq!(session.completed_count(), 0);
        assert_eq!(session.quests().streak, 1);

        complete_board(&mut session);
        let outcome = session
            .claim_daily_reward()
            .expect("saved")
            .expect("second claim");
        assert!(outcome.streak_continued);
        assert_eq!(outcome.save.streak, 2);
    }

    #[test]
    fn status_line_reports_progress() {
        let mut session = Session::open(Box::new(MemoryStore::new()), "2024-09-05");
        assert_eq!(session.status_line(), "Lv 1 (0/100 xp) - streak 0 - quests 0/3");
        complete_board(&mut session);
        assert!(session.status_line().ends_with("reward ready"));
    }
}
