//! Lesson sequencing and auto-advance

use std::time::{Duration, Instant};

use super::model::{Lesson, Module};
use crate::playback::Timer;
use crate::progress::ProgressStore;

/// Location of a lesson in the course
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonPosition {
    pub module: usize,
    pub lesson: usize,
}

/// Completed vs total lessons, derived from stored progress on every call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rollup {
    pub id: String,
    pub completed: usize,
    pub total: usize,
}

impl Rollup {
    /// Completed share as a percent, 0 for empty modules
    pub fn percent(&self) -> f64 {
        if self.total == 0 { 0.0 } else { self.completed as f64 / self.total as f64 * 100.0 }
    }
}

/// Moves between lessons of a module and drives the auto-advance countdown
#[derive(Debug)]
pub struct LessonNavigator {
    modules: Vec<Module>,
    current: Option<LessonPosition>,
    advance: Timer<LessonPosition>,
    advance_delay: Duration,
}

impl LessonNavigator {
    /// Create a navigator; lessons are re-sorted by numeric ordinal
    pub fn new(mut modules: Vec<Module>, advance_delay: Duration) -> Self {
        for module in &mut modules {
            module.sort_lessons();
        }
        Self { modules, current: None, advance: Timer::new(), advance_delay }
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Find where a lesson lives
    pub fn locate(&self, lesson_id: &str) -> Option<LessonPosition> {
        self.modules.iter().enumerate().find_map(|(module, m)| {
            m.position_of(lesson_id).map(|lesson| LessonPosition { module, lesson })
        })
    }

    fn lesson_at(&self, position: LessonPosition) -> Option<&Lesson> {
        self.modules.get(position.module).and_then(|m| m.lessons.get(position.lesson))
    }

    /// The lesson being watched
    pub fn current(&self) -> Option<&Lesson> {
        self.lesson_at(self.current?)
    }

    /// The module of the lesson being watched
    pub fn current_module(&self) -> Option<&Module> {
        self.modules.get(self.current?.module)
    }

    pub fn current_position(&self) -> Option<LessonPosition> {
        self.current
    }

    /// Open a lesson by id; cancels any pending auto-advance
    pub fn select(&mut self, lesson_id: &str) -> Option<&Lesson> {
        let position = self.locate(lesson_id)?;
        self.cancel_auto_advance();
        self.current = Some(position);
        self.lesson_at(position)
    }

    fn neighbor(&self, forward: bool) -> Option<LessonPosition> {
        let current = self.current?;
        let module = self.modules.get(current.module)?;
        let lesson = if forward {
            current.lesson + 1
        } else {
            current.lesson.checked_sub(1)?
        };
        (lesson < module.lessons.len()).then_some(LessonPosition { module: current.module, lesson })
    }

    pub fn has_next(&self) -> bool {
        self.neighbor(true).is_some()
    }

    pub fn has_previous(&self) -> bool {
        self.neighbor(false).is_some()
    }

    /// Go to the next lesson of the module. Always cancels a pending countdown.
    pub fn next(&mut self) -> Option<&Lesson> {
        self.cancel_auto_advance();
        let position = self.neighbor(true)?;
        self.current = Some(position);
        self.lesson_at(position)
    }

    /// Go to the previous lesson of the module. Always cancels a pending countdown.
    pub fn previous(&mut self) -> Option<&Lesson> {
        self.cancel_auto_advance();
        let position = self.neighbor(false)?;
        self.current = Some(position);
        self.lesson_at(position)
    }

    /// The current lesson finished; start the countdown when there is a next lesson
    pub fn on_lesson_complete(&mut self, now: Instant) -> bool {
        let Some(next) = self.neighbor(true) else {
            return false;
        };
        self.advance.arm(now, self.advance_delay, next);
        tracing::debug!("Auto-advance in {:?}", self.advance_delay);
        true
    }

    /// Stop a pending countdown
    pub fn cancel_auto_advance(&mut self) -> bool {
        self.advance.cancel().is_some()
    }

    /// Fire the countdown if due; returns the lesson moved to
    pub fn poll(&mut self, now: Instant) -> Option<&Lesson> {
        let position = self.advance.poll(now)?;
        self.current = Some(position);
        self.lesson_at(position)
    }

    /// The lesson the countdown will move to
    pub fn upcoming(&self) -> Option<&Lesson> {
        self.lesson_at(*self.advance.pending()?)
    }

    pub fn is_counting_down(&self) -> bool {
        self.advance.is_armed()
    }

    /// Time left before auto-advance
    pub fn countdown_remaining(&self, now: Instant) -> Option<Duration> {
        self.advance.remaining(now)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.advance.deadline()
    }

    /// Completion rollup of one module for a user
    pub fn module_rollup(module: &Module, store: &ProgressStore, user_key: &str) -> Rollup {
        let completed =
            module.lessons.iter().filter(|l| store.is_completed(user_key, &l.id)).count();
        Rollup { id: module.id.clone(), completed, total: module.lessons.len() }
    }

    /// Rollups for every module
    pub fn rollups(&self, store: &ProgressStore, user_key: &str) -> Vec<Rollup> {
        self.modules.iter().map(|m| Self::module_rollup(m, store, user_key)).collect()
    }

    /// Rollup across the whole course
    pub fn course_rollup(&self, store: &ProgressStore, user_key: &str) -> Rollup {
        let rollups = self.rollups(store, user_key);
        Rollup {
            id: "course".to_string(),
            completed: rollups.iter().map(|r| r.completed).sum(),
            total: rollups.iter().map(|r| r.total).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::Thresholds;
    use crate::storage::MemoryKvStore;
    use pretty_assertions::assert_eq;

    const DELAY: Duration = Duration::from_secs(3);

    fn lesson(id: &str, ordinal: &str) -> Lesson {
        Lesson {
            id: id.to_string(),
            ordinal: ordinal.to_string(),
            title: id.to_string(),
            video_url: None,
            duration_seconds: None,
            description: None,
        }
    }

    fn navigator() -> LessonNavigator {
        let modules = vec![
            Module {
                id: "m1".to_string(),
                title: "Módulo 1".to_string(),
                lessons: vec![lesson("l10", "10"), lesson("l1", "1"), lesson("l2", "2")],
            },
            Module {
                id: "m2".to_string(),
                title: "Módulo 2".to_string(),
                lessons: vec![lesson("l20", "1")],
            },
        ];
        LessonNavigator::new(modules, DELAY)
    }

    #[test]
    fn order_is_numeric() {
        let nav = navigator();
        let ids: Vec<_> = nav.modules()[0].lessons.iter().map(|l| l.ordinal.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "10"]);
    }

    #[test]
    fn next_and_previous_stay_within_module() {
        let mut nav = navigator();
        nav.select("l1").unwrap();
        assert!(nav.has_next());
        assert!(!nav.has_previous());

        assert_eq!(nav.next().unwrap().id, "l2");
        assert_eq!(nav.next().unwrap().id, "l10");
        assert!(!nav.has_next());
        assert!(nav.next().is_none());
        assert_eq!(nav.current().unwrap().id, "l10");

        assert_eq!(nav.previous().unwrap().id, "l2");
    }

    #[test]
    fn select_unknown_lesson_keeps_current() {
        let mut nav = navigator();
        nav.select("l2").unwrap();
        assert!(nav.select("missing").is_none());
        assert_eq!(nav.current().unwrap().id, "l2");
    }

    #[test]
    fn auto_advance_fires_after_delay() {
        let start = Instant::now();
        let mut nav = navigator();
        nav.select("l1").unwrap();

        assert!(nav.on_lesson_complete(start));
        assert!(nav.poll(start + Duration::from_millis(2_999)).is_none());
        assert_eq!(nav.poll(start + DELAY).unwrap().id, "l2");
        assert!(!nav.is_counting_down());
    }

    #[test]
    fn manual_navigation_cancels_auto_advance() {
        let start = Instant::now();
        let mut nav = navigator();
        nav.select("l2").unwrap();

        nav.on_lesson_complete(start);
        assert_eq!(nav.previous().unwrap().id, "l1");
        assert!(nav.poll(start + DELAY).is_none());
        assert_eq!(nav.current().unwrap().id, "l1");

        nav.on_lesson_complete(start);
        assert_eq!(nav.next().unwrap().id, "l2");
        assert!(nav.poll(start + DELAY * 2).is_none());
        assert_eq!(nav.current().unwrap().id, "l2");
    }

    #[test]
    fn last_lesson_does_not_count_down() {
        let mut nav = navigator();
        nav.select("l20").unwrap();
        assert!(!nav.on_lesson_complete(Instant::now()));
        assert!(!nav.is_counting_down());
    }

    #[test]
    fn rollups_are_derived_from_progress() {
        let store = ProgressStore::new(Thresholds::default(), Arc::new(MemoryKvStore::new()));
        let nav = navigator();

        store.write("user", "l1", 100.0, 600.0, 600.0);
        store.write("user", "l2", 40.0, 240.0, 240.0);
        assert_eq!(nav.rollups(&store, "user")[0], Rollup { id: "m1".into(), completed: 1, total: 3 });

        store.write("user", "l2", 92.0, 552.0, 552.0);
        store.write("user", "l20", 95.0, 570.0, 570.0);
        let course = nav.course_rollup(&store, "user");
        assert_eq!((course.completed, course.total), (3, 4));
        assert_eq!(course.percent(), 75.0);
        assert_eq!(nav.course_rollup(&store, "someone-else").completed, 0);
    }
}
