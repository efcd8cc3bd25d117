//! Pointer and keyboard handling for the annotation view.
//!
//! The controller turns container-relative pointer positions into image-space
//! points through the session's [`ImageLayout`], keeps the transient gesture
//! (live rectangle, drag preview) to itself, and commits to the
//! [`AnnotationState`](crate::state::AnnotationState) only when a gesture
//! completes.

use web_time::Instant;

use crate::constants::{HANDLE_HIT_RADIUS, MIN_DRAG_DISTANCE};
use crate::input::KeyEvent;
use crate::keybindings::Shortcut;
use crate::model::{AnnotationId, BoxChanges, DrawMode, ImageDimensions, ScreenBox, ScreenPoint};
use crate::session::AnnotationSession;
use crate::sync::IoExecutor;
use crate::transform::{ImageLayout, clamp_to_image, to_normalized, to_screen};

/// Part of a selected box grabbed by the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    Move,
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl Handle {
    /// Which edges the handle moves: (left, top, right, bottom).
    fn edges(self) -> (bool, bool, bool, bool) {
        match self {
            Handle::Move => (true, true, true, true),
            Handle::TopLeft => (true, true, false, false),
            Handle::Top => (false, true, false, false),
            Handle::TopRight => (false, true, true, false),
            Handle::Right => (false, false, true, false),
            Handle::BottomRight => (false, false, true, true),
            Handle::Bottom => (false, false, false, true),
            Handle::BottomLeft => (true, false, false, true),
            Handle::Left => (true, false, false, false),
        }
    }
}

/// Current pointer gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Gesture {
    Idle,
    /// Drawing a new box from `start`.
    Drawing {
        start: ScreenPoint,
        current: ScreenPoint,
    },
    /// Pressed on a box; not yet moved far enough to drag.
    PotentialDrag {
        id: AnnotationId,
        handle: Handle,
        start: ScreenPoint,
        original: ScreenBox,
    },
    Dragging {
        id: AnnotationId,
        handle: Handle,
        start: ScreenPoint,
        original: ScreenBox,
        current: ScreenBox,
    },
}

/// Result of a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyResult {
    /// Not a shortcut, or typing into a text field.
    Ignored,
    Handled,
    /// `Esc` with no gesture to cancel; the host should leave the view.
    ExitView,
}

/// Translates pointer and keyboard events into state mutations.
#[derive(Debug, Clone)]
pub struct InteractionController {
    gesture: Gesture,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionController {
    pub fn new() -> Self {
        Self {
            gesture: Gesture::Idle,
        }
    }

    /// A draw or drag is in progress.
    pub fn is_active(&self) -> bool {
        self.gesture != Gesture::Idle
    }

    /// Drop the current gesture without touching state.
    pub fn cancel_gesture(&mut self) {
        if self.is_active() {
            log::debug!("Gesture cancelled");
        }
        self.gesture = Gesture::Idle;
    }

    /// Live rectangle for visual feedback, in image-origin pixels.
    pub fn preview(&self) -> Option<ScreenBox> {
        match self.gesture {
            Gesture::Drawing { start, current } => Some(ScreenBox::from_corners(start, current, 0)),
            Gesture::Dragging { current, .. } => Some(current),
            Gesture::Idle | Gesture::PotentialDrag { .. } => None,
        }
    }

    // ========================================================================
    // Pointer
    // ========================================================================

    /// Pointer pressed at a container-relative position.
    pub fn on_pointer_down<E: IoExecutor>(
        &mut self,
        session: &mut AnnotationSession<E>,
        position: ScreenPoint,
    ) {
        let Some(layout) = interactive_layout(session) else {
            return;
        };
        let point = layout.to_image_point(position);

        match session.state().draw_mode() {
            DrawMode::Draw => {
                let start = layout.clamp_point(point);
                self.gesture = Gesture::Drawing {
                    start,
                    current: start,
                };
            }
            DrawMode::Edit => {
                let dims = layout.dimensions;
                match hit_test(session, dims, point) {
                    Some((id, handle, original)) => {
                        session.state_mut().select_box(Some(id));
                        self.gesture = Gesture::PotentialDrag {
                            id,
                            handle,
                            start: point,
                            original,
                        };
                    }
                    None => {
                        session.state_mut().select_box(None);
                        self.gesture = Gesture::Idle;
                    }
                }
            }
            DrawMode::View => {}
        }
    }

    /// Pointer moved to a container-relative position.
    pub fn on_pointer_move<E: IoExecutor>(
        &mut self,
        session: &AnnotationSession<E>,
        position: ScreenPoint,
    ) {
        let Some(layout) = interactive_layout(session) else {
            return;
        };
        let point = layout.to_image_point(position);

        self.gesture = match self.gesture {
            Gesture::Drawing { start, .. } => Gesture::Drawing {
                start,
                current: layout.clamp_point(point),
            },
            Gesture::PotentialDrag {
                id,
                handle,
                start,
                original,
            } => {
                if start.distance_to(&point) < MIN_DRAG_DISTANCE {
                    return;
                }
                Gesture::Dragging {
                    id,
                    handle,
                    start,
                    original,
                    current: manipulate(&original, handle, start, point, layout.dimensions),
                }
            }
            Gesture::Dragging {
                id,
                handle,
                start,
                original,
                ..
            } => Gesture::Dragging {
                id,
                handle,
                start,
                original,
                current: manipulate(&original, handle, start, point, layout.dimensions),
            },
            Gesture::Idle => Gesture::Idle,
        };
    }

    /// Pointer released at a container-relative position. Returns true if
    /// the boxes changed.
    pub fn on_pointer_up<E: IoExecutor>(
        &mut self,
        session: &mut AnnotationSession<E>,
        position: ScreenPoint,
    ) -> bool {
        self.on_pointer_move(session, position);
        let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
        let Some(layout) = interactive_layout(session) else {
            return false;
        };
        let dims = layout.dimensions;

        match gesture {
            Gesture::Drawing { start, current } => {
                let class_id = session.state().current_class_id();
                let rect = ScreenBox::from_corners(start, current, class_id);
                if !rect.meets_min_size(session.state().min_box_size()) {
                    log::trace!("Discarded draw of {:.1}x{:.1}", rect.width, rect.height);
                    return false;
                }
                let bbox = to_normalized(&clamp_to_image(&rect, dims), dims);
                session.state_mut().add_box(bbox).is_some()
            }
            Gesture::Dragging { id, current, .. } => {
                let bbox = to_normalized(&clamp_to_image(&current, dims), dims);
                session
                    .state_mut()
                    .update_box(id, BoxChanges::geometry(&bbox))
            }
            Gesture::PotentialDrag { .. } | Gesture::Idle => false,
        }
    }

    // ========================================================================
    // Keyboard
    // ========================================================================

    /// Handle a key press. `text_focus` is true while a text input has focus,
    /// in which case shortcuts are inactive.
    pub fn on_key<E: IoExecutor>(
        &mut self,
        session: &mut AnnotationSession<E>,
        event: &KeyEvent,
        text_focus: bool,
        now: Instant,
    ) -> KeyResult {
        if text_focus {
            return KeyResult::Ignored;
        }
        let Some(shortcut) = session.keybindings().shortcut_for(event) else {
            return KeyResult::Ignored;
        };
        let read_only = session.state().draw_mode() == DrawMode::View;

        match shortcut {
            Shortcut::Escape => {
                if self.is_active() {
                    self.cancel_gesture();
                    return KeyResult::Handled;
                }
                return KeyResult::ExitView;
            }
            Shortcut::Undo if !read_only => {
                self.cancel_gesture();
                session.state_mut().undo();
            }
            Shortcut::Redo if !read_only => {
                self.cancel_gesture();
                session.state_mut().redo();
            }
            Shortcut::DeleteSelected if !read_only => {
                if let Some(id) = session.state().selected_box_id() {
                    self.cancel_gesture();
                    session.state_mut().delete_box(id);
                }
            }
            Shortcut::ClearAll if !read_only => {
                self.cancel_gesture();
                session.state_mut().clear_boxes();
            }
            Shortcut::Undo | Shortcut::Redo | Shortcut::DeleteSelected | Shortcut::ClearAll => {
                log::trace!("{:?} ignored in view mode", shortcut);
            }
            Shortcut::Save => {
                session.manual_save(now);
            }
            Shortcut::SetMode(mode) => {
                self.cancel_gesture();
                session.state_mut().set_draw_mode(mode);
            }
            Shortcut::SelectClassIndex(index) => {
                session.select_class_index(index);
            }
        }
        KeyResult::Handled
    }
}

fn interactive_layout<E: IoExecutor>(session: &AnnotationSession<E>) -> Option<ImageLayout> {
    if session.is_interactive() {
        session.layout().copied()
    } else {
        None
    }
}

/// Find what the pointer grabs: a handle of the selected box, or else the
/// topmost box under the point.
fn hit_test<E: IoExecutor>(
    session: &AnnotationSession<E>,
    dims: ImageDimensions,
    point: ScreenPoint,
) -> Option<(AnnotationId, Handle, ScreenBox)> {
    let state = session.state();

    if let Some(selected) = state.selected_box() {
        let rect = to_screen(&selected.bbox, dims);
        if let Some(handle) = handle_at(&rect, point) {
            return Some((selected.id, handle, rect));
        }
    }

    state
        .boxes()
        .iter()
        .rev()
        .map(|a| (a.id, to_screen(&a.bbox, dims)))
        .find(|(_, rect)| rect.contains(&point))
        .map(|(id, rect)| (id, Handle::Move, rect))
}

/// Resize handle under the point, if any. Corners win over edges.
fn handle_at(rect: &ScreenBox, point: ScreenPoint) -> Option<Handle> {
    let r = HANDLE_HIT_RADIUS;
    let near = |a: f64, b: f64| (a - b).abs() <= r;
    let within = |v: f64, lo: f64, hi: f64| v >= lo - r && v <= hi + r;

    let left = near(point.x, rect.x);
    let right = near(point.x, rect.right());
    let top = near(point.y, rect.y);
    let bottom = near(point.y, rect.bottom());
    let in_x = within(point.x, rect.x, rect.right());
    let in_y = within(point.y, rect.y, rect.bottom());

    match (left, top, right, bottom) {
        (true, true, _, _) => Some(Handle::TopLeft),
        (_, true, true, _) => Some(Handle::TopRight),
        (_, _, true, true) => Some(Handle::BottomRight),
        (true, _, _, true) => Some(Handle::BottomLeft),
        (true, _, _, _) if in_y => Some(Handle::Left),
        (_, _, true, _) if in_y => Some(Handle::Right),
        (_, true, _, _) if in_x => Some(Handle::Top),
        (_, _, _, true) if in_x => Some(Handle::Bottom),
        _ => None,
    }
}

/// Apply a pointer drag to the grabbed part of a box.
///
/// A move keeps the size and is shifted back inside the image; a resize
/// clamps the dragged edges to the image and may flip the box.
fn manipulate(
    original: &ScreenBox,
    handle: Handle,
    start: ScreenPoint,
    point: ScreenPoint,
    dims: ImageDimensions,
) -> ScreenBox {
    let dx = point.x - start.x;
    let dy = point.y - start.y;

    if handle == Handle::Move {
        return clamp_to_image(&original.translated(dx, dy), dims);
    }

    let (move_left, move_top, move_right, move_bottom) = handle.edges();
    let edge = |value: f64, moved: bool, delta: f64, max: f64| {
        if moved {
            (value + delta).clamp(0.0, max)
        } else {
            value
        }
    };

    let left = edge(original.x, move_left, dx, dims.width);
    let right = edge(original.right(), move_right, dx, dims.width);
    let top = edge(original.y, move_top, dy, dims.height);
    let bottom = edge(original.bottom(), move_bottom, dy, dims.height);

    ScreenBox::from_corners(
        ScreenPoint::new(left, top),
        ScreenPoint::new(right, bottom),
        original.class_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::input::{KeyCode, Modifiers};
    use crate::model::{Category, NormalizedBox};
    use crate::session::SessionConfig;
    use crate::sync::testing::ManualExecutor;
    use std::sync::Arc;

    const EPSILON: f64 = 1e-9;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    fn p(x: f64, y: f64) -> ScreenPoint {
        ScreenPoint::new(x, y)
    }

    fn session_with(boxes: Vec<NormalizedBox>) -> AnnotationSession<ManualExecutor> {
        let backend = Arc::new(
            MemoryBackend::new()
                .with_classes(
                    "ds",
                    vec![
                        Category::new(0, "a"),
                        Category::new(1, "b"),
                        Category::new(2, "c"),
                    ],
                )
                .with_annotations(crate::model::ImageKey::new("ds", "img.png"), boxes),
        );
        let mut session =
            AnnotationSession::new("ds", ManualExecutor::new(backend), SessionConfig::default());
        let now = Instant::now();
        session.open_image("img.png", now);
        session.executor_mut().run_all();
        session.tick(now);
        session.set_layout(Some(ImageLayout::unscaled(ImageDimensions::new(1000.0, 500.0))));
        session
    }

    fn drag(
        controller: &mut InteractionController,
        session: &mut AnnotationSession<ManualExecutor>,
        from: ScreenPoint,
        to: ScreenPoint,
    ) -> bool {
        controller.on_pointer_down(session, from);
        controller.on_pointer_move(session, to);
        controller.on_pointer_up(session, to)
    }

    fn key(
        controller: &mut InteractionController,
        session: &mut AnnotationSession<ManualExecutor>,
        combo: &str,
    ) -> KeyResult {
        let event = KeyEvent::parse(combo).expect("valid combo");
        controller.on_key(session, &event, false, Instant::now())
    }

    #[test]
    fn test_draw_scenario() {
        let mut session = session_with(vec![]);
        session.state_mut().set_current_class(2);
        let mut controller = InteractionController::new();

        controller.on_pointer_down(&mut session, p(100.0, 100.0));
        controller.on_pointer_move(&session, p(300.0, 200.0));
        let preview = controller.preview().expect("drawing");
        assert_eq!(preview, ScreenBox::new(100.0, 100.0, 200.0, 100.0, 0));
        assert!(controller.on_pointer_up(&mut session, p(300.0, 200.0)));

        let bbox = session.state().boxes()[0].bbox;
        assert_eq!(bbox.class_id, 2);
        assert!(approx_eq(bbox.x, 0.2));
        assert!(approx_eq(bbox.y, 0.3));
        assert!(approx_eq(bbox.w, 0.2));
        assert!(approx_eq(bbox.h, 0.2));
        assert!(session.state().is_dirty());
        assert!(controller.preview().is_none());
    }

    #[test]
    fn test_draw_any_direction() {
        let mut session = session_with(vec![]);
        let mut controller = InteractionController::new();
        assert!(drag(&mut controller, &mut session, p(300.0, 200.0), p(100.0, 100.0)));
        let bbox = session.state().boxes()[0].bbox;
        assert!(approx_eq(bbox.x, 0.2));
        assert!(approx_eq(bbox.w, 0.2));
    }

    #[test]
    fn test_click_without_drag_adds_nothing() {
        let mut session = session_with(vec![]);
        let mut controller = InteractionController::new();
        assert!(!drag(&mut controller, &mut session, p(100.0, 100.0), p(105.0, 150.0)));
        assert!(session.state().is_empty());
        assert!(!session.state().is_dirty());
        assert!(!controller.is_active());
    }

    #[test]
    fn test_draw_is_clamped_to_image() {
        let mut session = session_with(vec![]);
        let mut controller = InteractionController::new();
        assert!(drag(&mut controller, &mut session, p(900.0, 400.0), p(1200.0, 700.0)));
        let bbox = session.state().boxes()[0].bbox;
        assert!(approx_eq(bbox.x + bbox.w / 2.0, 1.0));
        assert!(approx_eq(bbox.y + bbox.h / 2.0, 1.0));
    }

    #[test]
    fn test_letterbox_offset_is_applied() {
        let mut session = session_with(vec![]);
        let layout = ImageLayout::fit(ImageDimensions::new(1000.0, 1000.0), ImageDimensions::new(2000.0, 1000.0))
            .expect("valid");
        // 1000x500 image centered vertically: offset (0, 250).
        session.set_layout(Some(layout));
        let mut controller = InteractionController::new();
        assert!(drag(&mut controller, &mut session, p(100.0, 350.0), p(300.0, 450.0)));
        let bbox = session.state().boxes()[0].bbox;
        assert!(approx_eq(bbox.y, 0.3));
    }

    #[test]
    fn test_edit_mode_selects_topmost_and_clears_on_empty() {
        let mut session = session_with(vec![
            NormalizedBox::new(0, 0.2, 0.4, 0.2, 0.4),
            NormalizedBox::new(1, 0.25, 0.4, 0.2, 0.4),
        ]);
        let mut controller = InteractionController::new();
        session.state_mut().set_draw_mode(DrawMode::Edit);
        let top_id = session.state().boxes()[1].id;

        controller.on_pointer_down(&mut session, p(220.0, 200.0));
        assert!(!controller.on_pointer_up(&mut session, p(220.0, 200.0)));
        assert_eq!(session.state().selected_box_id(), Some(top_id));
        assert!(!session.state().can_undo());

        controller.on_pointer_down(&mut session, p(800.0, 50.0));
        controller.on_pointer_up(&mut session, p(800.0, 50.0));
        assert_eq!(session.state().selected_box_id(), None);
    }

    #[test]
    fn test_move_selected_box() {
        let mut session = session_with(vec![NormalizedBox::new(0, 0.2, 0.4, 0.2, 0.4)]);
        let mut controller = InteractionController::new();
        session.state_mut().set_draw_mode(DrawMode::Edit);

        // Box spans x 100..300, y 100..300 on 1000x500.
        assert!(drag(&mut controller, &mut session, p(200.0, 200.0), p(300.0, 250.0)));
        let bbox = session.state().boxes()[0].bbox;
        assert!(approx_eq(bbox.x, 0.3));
        assert!(approx_eq(bbox.y, 0.5));
        assert!(approx_eq(bbox.w, 0.2));
        assert_eq!(session.state().undo_description(), Some("Move/resize box"));
    }

    #[test]
    fn test_move_past_edge_is_shifted_inside() {
        let mut session = session_with(vec![NormalizedBox::new(0, 0.2, 0.4, 0.2, 0.4)]);
        let mut controller = InteractionController::new();
        session.state_mut().set_draw_mode(DrawMode::Edit);

        assert!(drag(&mut controller, &mut session, p(200.0, 200.0), p(2000.0, 200.0)));
        let bbox = session.state().boxes()[0].bbox;
        assert!(approx_eq(bbox.x, 0.9));
        assert!(approx_eq(bbox.w, 0.2));
    }

    #[test]
    fn test_resize_with_corner_handle() {
        let mut session = session_with(vec![NormalizedBox::new(0, 0.2, 0.4, 0.2, 0.4)]);
        let mut controller = InteractionController::new();
        session.state_mut().set_draw_mode(DrawMode::Edit);
        let id = session.state().boxes()[0].id;
        session.state_mut().select_box(Some(id));

        // Drag the bottom-right corner (300, 300) to (400, 350).
        assert!(drag(&mut controller, &mut session, p(302.0, 298.0), p(402.0, 348.0)));
        let screen = to_screen(&session.state().boxes()[0].bbox, ImageDimensions::new(1000.0, 500.0));
        assert!(approx_eq(screen.x, 100.0));
        assert!(approx_eq(screen.y, 100.0));
        assert!(approx_eq(screen.width, 300.0));
        assert!(approx_eq(screen.height, 250.0));
    }

    #[test]
    fn test_resize_below_minimum_is_rejected() {
        let mut session = session_with(vec![NormalizedBox::new(0, 0.2, 0.4, 0.2, 0.4)]);
        let mut controller = InteractionController::new();
        session.state_mut().set_draw_mode(DrawMode::Edit);
        let id = session.state().boxes()[0].id;
        session.state_mut().select_box(Some(id));

        // Right edge from 300 to 105: 5 px wide.
        assert!(!drag(&mut controller, &mut session, p(300.0, 200.0), p(105.0, 200.0)));
        assert!(!session.state().is_dirty());
        assert!(approx_eq(session.state().boxes()[0].bbox.w, 0.2));
    }

    #[test]
    fn test_small_jitter_is_a_click() {
        let mut session = session_with(vec![NormalizedBox::new(0, 0.2, 0.4, 0.2, 0.4)]);
        let mut controller = InteractionController::new();
        session.state_mut().set_draw_mode(DrawMode::Edit);
        assert!(!drag(&mut controller, &mut session, p(200.0, 200.0), p(201.0, 201.0)));
        assert!(!session.state().is_dirty());
    }

    #[test]
    fn test_view_mode_ignores_pointer() {
        let mut session = session_with(vec![NormalizedBox::new(0, 0.2, 0.4, 0.2, 0.4)]);
        let mut controller = InteractionController::new();
        session.state_mut().set_draw_mode(DrawMode::View);
        assert!(!drag(&mut controller, &mut session, p(100.0, 100.0), p(400.0, 400.0)));
        assert_eq!(session.state().len(), 1);
        assert_eq!(session.state().selected_box_id(), None);
    }

    #[test]
    fn test_not_interactive_without_layout() {
        let mut session = session_with(vec![]);
        session.set_layout(None);
        let mut controller = InteractionController::new();
        assert!(!drag(&mut controller, &mut session, p(100.0, 100.0), p(300.0, 200.0)));
        assert!(session.state().is_empty());
    }

    #[test]
    fn test_keyboard_shortcuts() {
        let mut session = session_with(vec![]);
        let mut controller = InteractionController::new();

        assert_eq!(key(&mut controller, &mut session, "e"), KeyResult::Handled);
        assert_eq!(session.state().draw_mode(), DrawMode::Edit);
        assert_eq!(key(&mut controller, &mut session, "R"), KeyResult::Handled);
        assert_eq!(session.state().draw_mode(), DrawMode::Draw);

        // Class hotkeys only reach existing classes.
        assert_eq!(key(&mut controller, &mut session, "3"), KeyResult::Handled);
        assert_eq!(session.state().current_class_id(), 2);
        key(&mut controller, &mut session, "4");
        assert_eq!(session.state().current_class_id(), 2);

        drag(&mut controller, &mut session, p(100.0, 100.0), p(300.0, 200.0));
        assert_eq!(session.state().len(), 1);
        key(&mut controller, &mut session, "ctrl+z");
        assert!(session.state().is_empty());
        key(&mut controller, &mut session, "ctrl+shift+z");
        assert_eq!(session.state().len(), 1);
        key(&mut controller, &mut session, "ctrl+z");
        key(&mut controller, &mut session, "cmd+y");
        assert_eq!(session.state().len(), 1);

        assert_eq!(key(&mut controller, &mut session, "q"), KeyResult::Ignored);
    }

    #[test]
    fn test_delete_selected() {
        let mut session = session_with(vec![NormalizedBox::new(0, 0.2, 0.4, 0.2, 0.4)]);
        let mut controller = InteractionController::new();
        key(&mut controller, &mut session, "e");
        controller.on_pointer_down(&mut session, p(200.0, 200.0));
        controller.on_pointer_up(&mut session, p(200.0, 200.0));

        key(&mut controller, &mut session, "Backspace");
        assert!(session.state().is_empty());
        assert_eq!(session.state().selected_box_id(), None);
        // Nothing selected: no-op.
        key(&mut controller, &mut session, "Delete");
        assert_eq!(session.state().undo_description(), Some("Delete box"));
    }

    #[test]
    fn test_shortcuts_inactive_in_text_field() {
        let mut session = session_with(vec![]);
        let mut controller = InteractionController::new();
        let event = KeyEvent::plain(KeyCode::E);
        assert_eq!(
            controller.on_key(&mut session, &event, true, Instant::now()),
            KeyResult::Ignored
        );
        assert_eq!(session.state().draw_mode(), DrawMode::Draw);
    }

    #[test]
    fn test_escape_cancels_gesture_then_exits() {
        let mut session = session_with(vec![]);
        let mut controller = InteractionController::new();
        controller.on_pointer_down(&mut session, p(100.0, 100.0));
        controller.on_pointer_move(&session, p(300.0, 200.0));

        assert_eq!(key(&mut controller, &mut session, "Esc"), KeyResult::Handled);
        assert!(controller.preview().is_none());
        assert!(!controller.on_pointer_up(&mut session, p(300.0, 200.0)));
        assert!(session.state().is_empty());

        assert_eq!(key(&mut controller, &mut session, "Esc"), KeyResult::ExitView);
    }

    #[test]
    fn test_ctrl_s_saves_immediately() {
        let mut session = session_with(vec![]);
        let mut controller = InteractionController::new();
        drag(&mut controller, &mut session, p(100.0, 100.0), p(300.0, 200.0));
        let event = KeyEvent::new(
            KeyCode::S,
            Modifiers {
                ctrl: true,
                ..Modifiers::NONE
            },
        );
        controller.on_key(&mut session, &event, false, Instant::now());
        assert_eq!(session.executor().queued_saves(), 1);
    }

    #[test]
    fn test_handle_hit_regions() {
        let rect = ScreenBox::new(100.0, 100.0, 200.0, 100.0, 0);
        assert_eq!(handle_at(&rect, p(101.0, 99.0)), Some(Handle::TopLeft));
        assert_eq!(handle_at(&rect, p(300.0, 200.0)), Some(Handle::BottomRight));
        assert_eq!(handle_at(&rect, p(200.0, 104.0)), Some(Handle::Top));
        assert_eq!(handle_at(&rect, p(96.0, 150.0)), Some(Handle::Left));
        assert_eq!(handle_at(&rect, p(200.0, 150.0)), None);
        assert_eq!(handle_at(&rect, p(200.0, 300.0)), None);
    }

    #[test]
    fn test_clear_all_is_one_undo_step() {
        let mut session = session_with(vec![
            NormalizedBox::new(0, 0.2, 0.4, 0.2, 0.4),
            NormalizedBox::new(1, 0.6, 0.4, 0.2, 0.4),
        ]);
        let mut controller = InteractionController::new();

        assert_eq!(key(&mut controller, &mut session, "ctrl+Delete"), KeyResult::Handled);
        assert!(session.state().is_empty());
        assert!(session.state().is_dirty());
        assert_eq!(session.state().undo_description(), Some("Clear 2 boxes"));

        key(&mut controller, &mut session, "ctrl+z");
        assert_eq!(session.state().len(), 2);
    }

    #[test]
    fn test_view_mode_ignores_editing_keys() {
        let mut session = session_with(vec![]);
        let mut controller = InteractionController::new();
        drag(&mut controller, &mut session, p(100.0, 100.0), p(300.0, 200.0));
        key(&mut controller, &mut session, "e");
        controller.on_pointer_down(&mut session, p(200.0, 150.0));
        controller.on_pointer_up(&mut session, p(200.0, 150.0));
        assert!(session.state().selected_box_id().is_some());

        assert_eq!(key(&mut controller, &mut session, "v"), KeyResult::Handled);
        assert_eq!(session.state().draw_mode(), DrawMode::View);
        let revision = session.state().revision();

        for combo in ["ctrl+z", "ctrl+shift+z", "Delete", "ctrl+Backspace"] {
            assert_eq!(key(&mut controller, &mut session, combo), KeyResult::Handled);
        }
        assert_eq!(session.state().len(), 1);
        assert_eq!(session.state().revision(), revision);
        assert!(session.state().can_undo());

        // Mode and class keys still apply.
        key(&mut controller, &mut session, "2");
        assert_eq!(session.state().current_class_id(), 1);
        key(&mut controller, &mut session, "r");
        assert_eq!(session.state().draw_mode(), DrawMode::Draw);
    }
}
