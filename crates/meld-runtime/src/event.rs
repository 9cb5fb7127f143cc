//! Parameter-change events raised by the host UI

use meld_core::DisplayMode;

/// A user-facing parameter change
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    ResolutionChanged([u32; 3]),
    ThresholdChanged(f32),
    SourceCountChanged(u32),
    LightCountChanged(u32),
    DisplayModeChanged(DisplayMode),
    AnimationToggled(bool),
    AnimationReset,
}

impl SceneEvent {
    /// Events that change the extracted geometry
    pub fn affects_geometry(&self) -> bool {
        matches!(
            self,
            SceneEvent::ResolutionChanged(_)
                | SceneEvent::ThresholdChanged(_)
                | SceneEvent::SourceCountChanged(_)
                | SceneEvent::AnimationReset
        )
    }
}

/// A simple event queue that the UI pushes to and the scene drains
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Vec<SceneEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: SceneEvent) {
        self.events.push(event);
    }

    /// Drain all events, oldest first
    pub fn drain(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_drain() {
        let mut queue = EventQueue::new();
        assert!(queue.is_empty());

        queue.push(SceneEvent::ThresholdChanged(0.3));
        queue.push(SceneEvent::DisplayModeChanged(DisplayMode::DeferredLights));
        assert_eq!(queue.len(), 2);

        let events = queue.drain();
        assert_eq!(events[0], SceneEvent::ThresholdChanged(0.3));
        assert!(queue.is_empty());
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_geometry_events() {
        assert!(SceneEvent::ResolutionChanged([4, 4, 4]).affects_geometry());
        assert!(SceneEvent::SourceCountChanged(2).affects_geometry());
        assert!(!SceneEvent::LightCountChanged(2).affects_geometry());
        assert!(!SceneEvent::DisplayModeChanged(DisplayMode::Scene).affects_geometry());
    }
}
