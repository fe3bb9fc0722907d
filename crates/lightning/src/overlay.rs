use std::cell::RefCell;
use std::rc::Rc;

/// Single-channel coverage drawn over the bolt in one flat colour.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayImage {
    width: u32,
    height: u32,
    coverage: Vec<u8>,
    color: [f32; 3],
}

impl OverlayImage {
    /// `None` when the size is empty or `coverage` is not `width × height` bytes.
    pub fn new(width: u32, height: u32, coverage: Vec<u8>, color: [f32; 3]) -> Option<Self> {
        let expected = (width as usize).checked_mul(height as usize)?;
        (width > 0 && height > 0 && coverage.len() == expected).then_some(Self {
            width,
            height,
            coverage,
            color,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn coverage(&self) -> &[u8] {
        &self.coverage
    }

    pub fn color(&self) -> [f32; 3] {
        self.color
    }
}

#[derive(Debug, Default)]
struct SlotState {
    image: Option<OverlayImage>,
    revision: u64,
}

/// Hand-off point between whoever composes the overlay and the backend that draws it.
///
/// Every publish or clear bumps a revision; readers pass the last revision they saw and
/// only hear about newer content.
#[derive(Debug, Clone, Default)]
pub struct OverlaySlot {
    state: Rc<RefCell<SlotState>>,
}

impl OverlaySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, image: OverlayImage) {
        let mut state = self.state.borrow_mut();
        state.image = Some(image);
        state.revision += 1;
    }

    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        if state.image.take().is_some() {
            state.revision += 1;
        }
    }

    pub fn revision(&self) -> u64 {
        self.state.borrow().revision
    }

    /// Calls `apply` with the current image when it changed after `seen`, and returns the
    /// revision the caller has now seen.
    pub fn sync(&self, seen: u64, apply: impl FnOnce(Option<&OverlayImage>)) -> u64 {
        let state = self.state.borrow();
        if state.revision != seen {
            apply(state.image.as_ref());
        }
        state.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(value: u8) -> OverlayImage {
        OverlayImage::new(2, 2, vec![value; 4], [1.0, 1.0, 1.0]).unwrap()
    }

    #[test]
    fn coverage_must_match_the_size() {
        assert!(OverlayImage::new(2, 2, vec![0; 3], [1.0; 3]).is_none());
        assert!(OverlayImage::new(0, 2, Vec::new(), [1.0; 3]).is_none());
        assert_eq!(image(9).size(), (2, 2));
    }

    #[test]
    fn readers_only_see_newer_content() {
        let slot = OverlaySlot::new();
        let mut calls = 0;
        let seen = slot.sync(0, |_| calls += 1);
        assert_eq!((seen, calls), (0, 0));

        slot.publish(image(200));
        let mut uploaded = None;
        let seen = slot.sync(seen, |image| uploaded = image.map(|image| image.coverage().to_vec()));
        assert_eq!(uploaded, Some(vec![200; 4]));

        let seen = slot.sync(seen, |_| calls += 1);
        assert_eq!(calls, 0);

        slot.clear();
        let mut cleared = false;
        slot.sync(seen, |image| cleared = image.is_none());
        assert!(cleared);
    }

    #[test]
    fn clearing_an_empty_slot_changes_nothing() {
        let slot = OverlaySlot::new();
        slot.clear();
        assert_eq!(slot.revision(), 0);
    }
}
