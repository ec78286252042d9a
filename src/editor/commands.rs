// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Keyboard command layer.
//!
//! Raw key events are reduced to `KeyInput` values by the UI layer and
//! mapped to editor `Command`s here. Binding is scoped: the frame view
//! acquires a `KeyboardSubscription` when it is mounted and the binding is
//! released when the guard is dropped.

use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

/// Keys the editor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    D,
    F,
    S,
    Q,
    V,
    R,
    H,
    Z,
    Y,
    /// Number row 1–9
    Digit(u8),
    Escape,
    Tab,
    Delete,
    Backspace,
    Space,
}

/// A key transition with the modifiers held at that time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub pressed: bool,
    /// Ctrl on Linux/Windows, Cmd on macOS
    pub ctrl: bool,
    pub shift: bool,
}

impl KeyInput {
    pub fn press(key: Key) -> Self {
        Self {
            key,
            pressed: true,
            ctrl: false,
            shift: false,
        }
    }

    pub fn release(key: Key) -> Self {
        Self {
            pressed: false,
            ..Self::press(key)
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }
}

/// Editor commands reachable from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    PreviousFrame,
    NextFrame,
    Save,
    ToggleMode,
    SelectMode,
    DrawMode,
    Escape,
    /// 1-based label ordinal
    QuickLabel(usize),
    CycleForward,
    CycleBackward,
    DeleteSelected,
    ToggleLabels,
    BeginPan,
    EndPan,
    Undo,
    Redo,
}

/// Map a key transition to a command.
pub fn map_key(input: KeyInput) -> Option<Command> {
    use Command::*;

    if !input.pressed {
        return (input.key == Key::Space).then_some(EndPan);
    }

    if input.ctrl {
        return match input.key {
            Key::S => Some(Save),
            Key::Z if input.shift => Some(Redo),
            Key::Z => Some(Undo),
            Key::Y => Some(Redo),
            _ => None,
        };
    }

    match input.key {
        Key::D => Some(PreviousFrame),
        Key::F => Some(NextFrame),
        Key::Q => Some(ToggleMode),
        Key::V => Some(SelectMode),
        Key::R => Some(DrawMode),
        Key::H => Some(ToggleLabels),
        Key::Escape => Some(Escape),
        Key::Digit(n @ 1..=9) => Some(QuickLabel(n as usize)),
        Key::Tab if input.shift => Some(CycleBackward),
        Key::Tab => Some(CycleForward),
        Key::Delete | Key::Backspace => Some(DeleteSelected),
        Key::Space => Some(BeginPan),
        _ => None,
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum KeyboardError {
    #[error("Keyboard already bound by '{owner}'")]
    AlreadyBound { owner: String },
}

/// Owner registry for the editor's global key set.
///
/// Only one view may hold the keys at a time, so navigating between frames
/// can never leave two handlers bound.
#[derive(Debug, Clone, Default)]
pub struct KeyboardRouter {
    owner: Rc<RefCell<Option<String>>>,
}

impl KeyboardRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the key set to `owner` until the returned guard is dropped.
    pub fn acquire(&self, owner: &str) -> Result<KeyboardSubscription, KeyboardError> {
        let mut current = self.owner.borrow_mut();
        if let Some(existing) = current.as_ref() {
            return Err(KeyboardError::AlreadyBound {
                owner: existing.clone(),
            });
        }
        *current = Some(owner.to_string());
        log::debug!("Keyboard bound to {}", owner);
        Ok(KeyboardSubscription {
            owner: Rc::clone(&self.owner),
            name: owner.to_string(),
        })
    }

    pub fn owner(&self) -> Option<String> {
        self.owner.borrow().clone()
    }
}

/// Guard holding the keyboard binding.
#[derive(Debug)]
pub struct KeyboardSubscription {
    owner: Rc<RefCell<Option<String>>>,
    name: String,
}

impl KeyboardSubscription {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Map inputs to commands for this subscriber.
    pub fn commands(&self, inputs: &[KeyInput]) -> Vec<Command> {
        inputs.iter().copied().filter_map(map_key).collect()
    }
}

impl Drop for KeyboardSubscription {
    fn drop(&mut self) {
        self.owner.borrow_mut().take();
        log::debug!("Keyboard released by {}", self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_table() {
        let cases = [
            (KeyInput::press(Key::D), Some(Command::PreviousFrame)),
            (KeyInput::press(Key::F), Some(Command::NextFrame)),
            (KeyInput::press(Key::S).with_ctrl(), Some(Command::Save)),
            (KeyInput::press(Key::S), None),
            (KeyInput::press(Key::Q), Some(Command::ToggleMode)),
            (KeyInput::press(Key::V), Some(Command::SelectMode)),
            (KeyInput::press(Key::R), Some(Command::DrawMode)),
            (KeyInput::press(Key::Escape), Some(Command::Escape)),
            (KeyInput::press(Key::Digit(1)), Some(Command::QuickLabel(1))),
            (KeyInput::press(Key::Digit(9)), Some(Command::QuickLabel(9))),
            (KeyInput::press(Key::Digit(0)), None),
            (KeyInput::press(Key::Tab), Some(Command::CycleForward)),
            (KeyInput::press(Key::Tab).with_shift(), Some(Command::CycleBackward)),
            (KeyInput::press(Key::Delete), Some(Command::DeleteSelected)),
            (KeyInput::press(Key::Backspace), Some(Command::DeleteSelected)),
            (KeyInput::press(Key::H), Some(Command::ToggleLabels)),
            (KeyInput::press(Key::Space), Some(Command::BeginPan)),
            (KeyInput::release(Key::Space), Some(Command::EndPan)),
            (KeyInput::release(Key::D), None),
            (KeyInput::press(Key::Z).with_ctrl(), Some(Command::Undo)),
            (KeyInput::press(Key::Y).with_ctrl(), Some(Command::Redo)),
            (KeyInput::press(Key::Z).with_ctrl().with_shift(), Some(Command::Redo)),
            (KeyInput::press(Key::Z), None),
            (KeyInput::press(Key::D).with_ctrl(), None),
        ];
        for (input, expected) in cases {
            assert_eq!(map_key(input), expected, "{:?}", input);
        }
    }

    #[test]
    fn test_router_rejects_double_binding() {
        let router = KeyboardRouter::new();
        let first = router.acquire("frame-1").unwrap();
        assert_eq!(
            router.acquire("frame-2").unwrap_err(),
            KeyboardError::AlreadyBound {
                owner: "frame-1".into()
            }
        );
        drop(first);
        assert_eq!(router.owner(), None);
        let second = router.acquire("frame-2").unwrap();
        assert_eq!(second.name(), "frame-2");
        assert_eq!(router.owner().as_deref(), Some("frame-2"));
    }

    #[test]
    fn test_subscription_maps_batches() {
        let router = KeyboardRouter::new();
        let subscription = router.acquire("view").unwrap();
        let commands = subscription.commands(&[
            KeyInput::press(Key::Space),
            KeyInput::press(Key::S),
            KeyInput::release(Key::Space),
        ]);
        assert_eq!(commands, vec![Command::BeginPan, Command::EndPan]);
    }
}
