use std::cell::RefCell;
use std::rc::Rc;

use morph::{LabelState, LayerStyle, TextLayer};

/// The two morph layers as the window host sees them.
///
/// The text canvas composites both layers from here; the window title mirrors whichever
/// layer is more opaque.
#[derive(Debug, Default)]
pub struct LayerBoard {
    layers: [LabelState; 2],
    revision: u64,
    shown: Option<String>,
}

impl LayerBoard {
    pub fn shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::default()))
    }

    /// Current and next layer, in that order.
    pub fn layers(&self) -> &[LabelState; 2] {
        &self.layers
    }

    /// Bumped whenever a layer's text or style changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Text of the dominant layer; ties go to the incoming layer.
    pub fn visible_text(&self) -> &str {
        let [current, next] = &self.layers;
        if current.style.opacity > next.style.opacity {
            &current.text
        } else {
            &next.text
        }
    }

    /// Returns the dominant text when it differs from what was last taken.
    pub fn take_title_change(&mut self) -> Option<String> {
        let visible = self.visible_text();
        if self.shown.as_deref() == Some(visible) {
            return None;
        }
        let visible = visible.to_string();
        self.shown = Some(visible.clone());
        Some(visible)
    }
}

/// One layer slot on a shared [`LayerBoard`].
#[derive(Debug, Clone)]
pub struct BoardLayer {
    board: Rc<RefCell<LayerBoard>>,
    slot: usize,
}

impl BoardLayer {
    /// Handles for the "current" and "next" layers.
    pub fn pair(board: &Rc<RefCell<LayerBoard>>) -> (Self, Self) {
        (
            Self {
                board: Rc::clone(board),
                slot: 0,
            },
            Self {
                board: Rc::clone(board),
                slot: 1,
            },
        )
    }
}

impl TextLayer for BoardLayer {
    fn set_text(&mut self, text: &str) {
        let mut board = self.board.borrow_mut();
        if board.layers[self.slot].text != text {
            board.layers[self.slot].set_text(text);
            board.revision += 1;
        }
    }

    fn set_style(&mut self, style: LayerStyle) {
        let mut board = self.board.borrow_mut();
        if board.layers[self.slot].style != style {
            board.layers[self.slot].set_style(style);
            board.revision += 1;
        }
    }
}
