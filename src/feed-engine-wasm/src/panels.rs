use smallvec::SmallVec;

use crate::types::{FeedOperation, Panel};

/// Visibility change of one panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelTransition {
    Show(Panel),
    Hide(Panel),
}

impl From<PanelTransition> for FeedOperation {
    fn from(transition: PanelTransition) -> Self {
        match transition {
            PanelTransition::Show(panel) => FeedOperation::ShowPanel { panel },
            PanelTransition::Hide(panel) => FeedOperation::HidePanel { panel },
        }
    }
}

pub type Transitions = SmallVec<[PanelTransition; 2]>;

/// Side panels; at most one is on screen
#[derive(Debug, Default, Clone)]
pub struct PanelSet {
    open: Option<Panel>,
}

impl PanelSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn open_panel(&self) -> Option<Panel> {
        self.open
    }

    #[inline]
    pub fn is_open(&self, panel: Panel) -> bool {
        self.open == Some(panel)
    }

    /// Open `panel`, sliding any other panel off-screen first
    pub fn open(&mut self, panel: Panel) -> Transitions {
        let mut transitions = Transitions::new();
        match self.open {
            Some(current) if current == panel => {}
            Some(current) => {
                transitions.push(PanelTransition::Hide(current));
                transitions.push(PanelTransition::Show(panel));
            }
            None => transitions.push(PanelTransition::Show(panel)),
        }
        self.open = Some(panel);
        transitions
    }

    pub fn close(&mut self, panel: Panel) -> Transitions {
        let mut transitions = Transitions::new();
        if self.open == Some(panel) {
            self.open = None;
            transitions.push(PanelTransition::Hide(panel));
        }
        transitions
    }

    pub fn toggle(&mut self, panel: Panel) -> Transitions {
        if self.is_open(panel) {
            self.close(panel)
        } else {
            self.open(panel)
        }
    }

    pub fn close_all(&mut self) -> Transitions {
        match self.open.take() {
            Some(panel) => SmallVec::from_slice(&[PanelTransition::Hide(panel)]),
            None => Transitions::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_panel_visible() {
        let mut panels = PanelSet::new();

        assert_eq!(panels.open(Panel::Search).as_slice(), &[PanelTransition::Show(Panel::Search)]);
        assert_eq!(
            panels.open(Panel::Queue).as_slice(),
            &[PanelTransition::Hide(Panel::Search), PanelTransition::Show(Panel::Queue)]
        );
        assert!(panels.is_open(Panel::Queue));
        assert!(!panels.is_open(Panel::Search));
        assert!(panels.open(Panel::Queue).is_empty());
    }

    #[test]
    fn test_toggle_and_close() {
        let mut panels = PanelSet::new();
        panels.toggle(Panel::Filter);
        assert_eq!(panels.open_panel(), Some(Panel::Filter));

        assert_eq!(panels.toggle(Panel::Filter).as_slice(), &[PanelTransition::Hide(Panel::Filter)]);
        assert_eq!(panels.open_panel(), None);
        assert!(panels.close(Panel::Search).is_empty());
        assert!(panels.close_all().is_empty());

        panels.open(Panel::Search);
        assert_eq!(panels.close_all().as_slice(), &[PanelTransition::Hide(Panel::Search)]);
    }
}
