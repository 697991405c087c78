use profiles::DeviceProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JackPhase {
    Idle,
    Armed,
    Active,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// A normalized input gesture. Wheel deltas and swipe distances are signed,
/// positive meaning forward (down-page). Keyboard input arrives pre-mapped
/// as a whole step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Wheel(f64),
    Swipe(f64),
    Step(Direction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JackEvent {
    /// Interception begins; the caller must acquire the scroll lock.
    Activated,
    Moved {
        from: usize,
        to: usize,
    },
    /// The last section was passed moving forward; the caller must release
    /// the scroll lock and let native scrolling resume.
    Finished,
    /// Backward re-entry from below; the caller must re-acquire the lock.
    Rearmed {
        index: usize,
    },
}

/// Discrete-section scroll hijack. All gesture sources funnel through one
/// accumulate/threshold/cooldown path; the index moves at most one section
/// per accepted gesture and never leaves [0, section_count).
#[derive(Debug, Clone)]
pub struct ScrollJack {
    section_count: usize,
    phase: JackPhase,
    index: usize,
    wheel_accumulator: f64,
    wheel_sensitivity: f64,
    swipe_threshold: f64,
    cooldown_ms: f64,
    cooldown_until: f64,
}

impl ScrollJack {
    pub fn new(section_count: usize, profile: &DeviceProfile) -> Self {
        Self {
            section_count,
            phase: JackPhase::Idle,
            index: 0,
            wheel_accumulator: 0.0,
            wheel_sensitivity: profile.wheel_sensitivity,
            swipe_threshold: profile.swipe_threshold,
            cooldown_ms: profile.gesture_cooldown.as_secs_f64() * 1000.0,
            cooldown_until: 0.0,
        }
    }

    pub fn phase(&self) -> JackPhase {
        self.phase
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn intercepting(&self) -> bool {
        self.phase == JackPhase::Active
    }

    /// True while the cooldown window after an accepted gesture is open.
    pub fn transitioning(&self, now_ms: f64) -> bool {
        self.phase == JackPhase::Active && now_ms < self.cooldown_until
    }

    /// Feed the container's scroll offset: pixels the page has scrolled past
    /// the container origin (negative while the origin is still below the
    /// viewport top). Drives arming, activation and backward re-entry.
    pub fn observe_offset(&mut self, offset: f64, now_ms: f64) -> Vec<JackEvent> {
        let mut events = Vec::new();
        if self.section_count == 0 {
            return events;
        }
        match self.phase {
            JackPhase::Idle => {
                if offset >= 0.0 {
                    self.phase = JackPhase::Armed;
                }
            }
            JackPhase::Armed => {
                if offset >= 0.0 {
                    self.phase = JackPhase::Active;
                    self.wheel_accumulator = 0.0;
                    self.cooldown_until = now_ms;
                    events.push(JackEvent::Activated);
                } else {
                    // Scrolled back out before interception began.
                    self.phase = JackPhase::Idle;
                }
            }
            JackPhase::Completed => {
                if offset <= 0.0 {
                    self.index = self.section_count - 1;
                    self.wheel_accumulator = 0.0;
                    self.cooldown_until = now_ms;
                    self.phase = JackPhase::Active;
                    events.push(JackEvent::Rearmed { index: self.index });
                }
            }
            JackPhase::Active => {}
        }
        events
    }

    pub fn on_gesture(&mut self, gesture: Gesture, now_ms: f64) -> Vec<JackEvent> {
        let mut events = Vec::new();
        if self.phase != JackPhase::Active {
            return events;
        }
        // Momentum tail: everything inside the cooldown window is dropped,
        // not accumulated.
        if now_ms < self.cooldown_until {
            return events;
        }

        let direction = match gesture {
            Gesture::Wheel(delta) => {
                self.wheel_accumulator += delta;
                if self.wheel_accumulator.abs() < self.wheel_sensitivity {
                    return events;
                }
                if self.wheel_accumulator > 0.0 {
                    Direction::Forward
                } else {
                    Direction::Backward
                }
            }
            Gesture::Swipe(distance) => {
                if distance.abs() < self.swipe_threshold {
                    return events;
                }
                if distance > 0.0 {
                    Direction::Forward
                } else {
                    Direction::Backward
                }
            }
            Gesture::Step(direction) => direction,
        };

        self.wheel_accumulator = 0.0;
        self.cooldown_until = now_ms + self.cooldown_ms;
        self.advance(direction, &mut events);
        events
    }

    fn advance(&mut self, direction: Direction, events: &mut Vec<JackEvent>) {
        match direction {
            Direction::Forward => {
                if self.index + 1 >= self.section_count {
                    self.phase = JackPhase::Completed;
                    events.push(JackEvent::Finished);
                } else {
                    let from = self.index;
                    self.index += 1;
                    events.push(JackEvent::Moved {
                        from,
                        to: self.index,
                    });
                }
            }
            Direction::Backward => {
                // Clamped at the first section.
                if self.index > 0 {
                    let from = self.index;
                    self.index -= 1;
                    events.push(JackEvent::Moved {
                        from,
                        to: self.index,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use profiles::{DeviceClass, ProfileSet};

    fn jack(sections: usize) -> ScrollJack {
        let profile = ProfileSet::builtin().unwrap().resolve(DeviceClass::Desktop);
        ScrollJack::new(sections, &profile)
    }

    fn activate(jack: &mut ScrollJack, now_ms: f64) {
        assert!(jack.observe_offset(0.0, now_ms).is_empty());
        let events = jack.observe_offset(0.0, now_ms);
        assert_eq!(events, vec![JackEvent::Activated]);
    }

    #[test]
    fn arms_then_activates_when_container_tops() {
        let mut jack = jack(3);
        assert_eq!(jack.phase(), JackPhase::Idle);

        assert!(jack.observe_offset(-400.0, 0.0).is_empty());
        assert_eq!(jack.phase(), JackPhase::Idle);

        assert!(jack.observe_offset(10.0, 16.0).is_empty());
        assert_eq!(jack.phase(), JackPhase::Armed);

        let events = jack.observe_offset(12.0, 32.0);
        assert_eq!(events, vec![JackEvent::Activated]);
        assert_eq!(jack.phase(), JackPhase::Active);
        assert_eq!(jack.index(), 0);
    }

    #[test]
    fn armed_regresses_to_idle_when_scrolled_back_out() {
        let mut jack = jack(3);
        jack.observe_offset(5.0, 0.0);
        assert_eq!(jack.phase(), JackPhase::Armed);
        jack.observe_offset(-50.0, 16.0);
        assert_eq!(jack.phase(), JackPhase::Idle);
    }

    #[test]
    fn zero_sections_never_arm() {
        let mut jack = jack(0);
        assert!(jack.observe_offset(100.0, 0.0).is_empty());
        assert!(jack.observe_offset(100.0, 16.0).is_empty());
        assert_eq!(jack.phase(), JackPhase::Idle);
        assert!(jack.on_gesture(Gesture::Wheel(500.0), 32.0).is_empty());
    }

    #[test]
    fn wheel_deltas_accumulate_to_the_threshold() {
        let mut jack = jack(3);
        activate(&mut jack, 0.0);

        // Sensitivity is 30: two small deltas cross it together.
        assert!(jack.on_gesture(Gesture::Wheel(20.0), 10.0).is_empty());
        let events = jack.on_gesture(Gesture::Wheel(20.0), 20.0);
        assert_eq!(events, vec![JackEvent::Moved { from: 0, to: 1 }]);
    }

    #[test]
    fn gestures_inside_cooldown_are_ignored() {
        let mut jack = jack(5);
        activate(&mut jack, 0.0);

        let events = jack.on_gesture(Gesture::Wheel(100.0), 100.0);
        assert_eq!(events, vec![JackEvent::Moved { from: 0, to: 1 }]);
        assert!(jack.transitioning(200.0));

        // Momentum tail inside the 700ms window moves nothing.
        assert!(jack.on_gesture(Gesture::Wheel(300.0), 300.0).is_empty());
        assert!(jack.on_gesture(Gesture::Wheel(300.0), 700.0).is_empty());
        assert_eq!(jack.index(), 1);

        // After the window a fresh gesture is accepted.
        let events = jack.on_gesture(Gesture::Wheel(100.0), 900.0);
        assert_eq!(events, vec![JackEvent::Moved { from: 1, to: 2 }]);
    }

    #[test]
    fn backward_gesture_clamps_at_first_section() {
        let mut jack = jack(3);
        activate(&mut jack, 0.0);

        assert!(jack.on_gesture(Gesture::Wheel(-200.0), 100.0).is_empty());
        assert_eq!(jack.index(), 0);
        assert_eq!(jack.phase(), JackPhase::Active);
    }

    #[test]
    fn swipe_and_keyboard_feed_the_same_path() {
        let mut jack = jack(4);
        activate(&mut jack, 0.0);

        // Below the 50px swipe threshold: nothing.
        assert!(jack.on_gesture(Gesture::Swipe(30.0), 100.0).is_empty());
        let events = jack.on_gesture(Gesture::Swipe(120.0), 200.0);
        assert_eq!(events, vec![JackEvent::Moved { from: 0, to: 1 }]);

        // Keyboard step obeys the cooldown like any other source.
        assert!(jack
            .on_gesture(Gesture::Step(Direction::Forward), 300.0)
            .is_empty());
        let events = jack.on_gesture(Gesture::Step(Direction::Forward), 1000.0);
        assert_eq!(events, vec![JackEvent::Moved { from: 1, to: 2 }]);
    }

    #[test]
    fn five_section_walkthrough_completes_once() {
        let mut jack = jack(5);
        activate(&mut jack, 0.0);

        let mut now = 1000.0;
        for expected in 1..5 {
            let events = jack.on_gesture(Gesture::Wheel(120.0), now);
            assert_eq!(
                events,
                vec![JackEvent::Moved {
                    from: expected - 1,
                    to: expected
                }]
            );
            now += 1000.0;
        }
        assert_eq!(jack.index(), 4);

        // Forward past the last section: exactly one Finished.
        let events = jack.on_gesture(Gesture::Wheel(120.0), now);
        assert_eq!(events, vec![JackEvent::Finished]);
        assert_eq!(jack.phase(), JackPhase::Completed);

        // Further gestures do nothing once completed.
        now += 1000.0;
        assert!(jack.on_gesture(Gesture::Wheel(120.0), now).is_empty());
    }

    #[test]
    fn index_stays_in_bounds_under_gesture_storms() {
        let mut jack = jack(3);
        activate(&mut jack, 0.0);

        let mut now = 1000.0;
        for step in 0..200 {
            let delta = if step % 3 == 0 { -400.0 } else { 400.0 };
            for event in jack.on_gesture(Gesture::Wheel(delta), now) {
                if let JackEvent::Moved { from, to } = event {
                    assert!(to < 3);
                    assert_eq!(from.abs_diff(to), 1);
                }
            }
            now += 37.0;
        }
    }

    #[test]
    fn backward_reentry_rearms_at_last_section() {
        let mut jack = jack(2);
        activate(&mut jack, 0.0);

        let mut now = 1000.0;
        assert_eq!(
            jack.on_gesture(Gesture::Wheel(120.0), now),
            vec![JackEvent::Moved { from: 0, to: 1 }]
        );
        now += 1000.0;
        assert_eq!(
            jack.on_gesture(Gesture::Wheel(120.0), now),
            vec![JackEvent::Finished]
        );

        // Page scrolls on below the container; nothing happens.
        assert!(jack.observe_offset(800.0, now + 100.0).is_empty());

        // Scrolling back above the container origin re-arms at the end.
        let events = jack.observe_offset(-10.0, now + 200.0);
        assert_eq!(events, vec![JackEvent::Rearmed { index: 1 }]);
        assert_eq!(jack.phase(), JackPhase::Active);

        // Cooldown was reset: a gesture right away is accepted.
        let events = jack.on_gesture(Gesture::Wheel(-120.0), now + 210.0);
        assert_eq!(events, vec![JackEvent::Moved { from: 1, to: 0 }]);
    }
}
