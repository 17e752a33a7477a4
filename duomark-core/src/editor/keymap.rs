//! Key bindings for the rich editor.
//!
//! Chords are written the usual way (`Mod-b`, `Shift-Tab`, `Alt-ArrowUp`); `Mod` is
//! Cmd on macOS and Ctrl elsewhere. A chord is bound to a chain of commands that is
//! tried in order until one applies.
//!
//! `Mod-k` removes the link under the selection. When there is none it reports
//! `false`, which is the host's cue to ask for a URL and call
//! [`super::commands::insert_link`].

use super::commands::{self, CommandResult};
use super::session::EditorSession;
use crate::schema::MarkType;
use std::collections::HashMap;
use std::fmt;

/// An argument-free editor command a key can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ToggleMark(MarkType),
    RemoveLink,
    SplitListItem,
    LiftEmptyBlock,
    SplitBlock,
    DeleteBackward,
    JoinBackward,
    JoinForward,
    JoinUp,
    JoinDown,
    SinkListItem,
    LiftListItem,
    Lift,
    ExitCode,
    InsertHardBreak,
    SelectParentNode,
    SetHeading(u8),
    SetParagraph,
    ToggleTask,
}

impl Command {
    pub fn run(self, session: &mut EditorSession) -> CommandResult {
        match self {
            Command::ToggleMark(mark_type) => commands::toggle_mark(session, mark_type),
            Command::RemoveLink => commands::remove_link(session),
            Command::SplitListItem => commands::split_list_item(session),
            Command::LiftEmptyBlock => commands::lift_empty_block(session),
            Command::SplitBlock => commands::split_block(session),
            Command::DeleteBackward => commands::delete_backward(session),
            Command::JoinBackward => commands::join_backward(session),
            Command::JoinForward => commands::join_forward(session),
            Command::JoinUp => commands::join_up(session),
            Command::JoinDown => commands::join_down(session),
            Command::SinkListItem => commands::sink_list_item(session),
            Command::LiftListItem => commands::lift_list_item(session),
            Command::Lift => commands::lift(session),
            Command::ExitCode => commands::exit_code(session),
            Command::InsertHardBreak => commands::insert_hard_break(session),
            Command::SelectParentNode => commands::select_parent_node(session),
            Command::SetHeading(level) => commands::set_heading(session, level),
            Command::SetParagraph => commands::set_paragraph(session),
            Command::ToggleTask => commands::toggle_task(session),
        }
    }
}

/// A normalized key chord
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub key: String,
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl KeyChord {
    /// Parse `Mod-Shift-x` style notation. Returns `None` for unknown modifiers.
    pub fn parse(notation: &str, mac: bool) -> Option<KeyChord> {
        let (modifiers, key) = match notation.strip_suffix("--") {
            Some(modifiers) => (modifiers, "-"),
            None => notation.rsplit_once('-').unwrap_or(("", notation)),
        };
        if key.is_empty() {
            return None;
        }
        let mut chord = KeyChord {
            key: if key.chars().count() == 1 {
                key.to_lowercase()
            } else {
                key.to_string()
            },
            ctrl: false,
            alt: false,
            shift: false,
            meta: false,
        };
        for modifier in modifiers.split('-').filter(|m| !m.is_empty()) {
            match modifier {
                "Mod" if mac => chord.meta = true,
                "Mod" => chord.ctrl = true,
                "Ctrl" | "Control" => chord.ctrl = true,
                "Alt" | "Option" => chord.alt = true,
                "Shift" => chord.shift = true,
                "Meta" | "Cmd" => chord.meta = true,
                _ => return None,
            }
        }
        Some(chord)
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (active, name) in [
            (self.ctrl, "Ctrl-"),
            (self.alt, "Alt-"),
            (self.shift, "Shift-"),
            (self.meta, "Meta-"),
        ] {
            if active {
                f.write_str(name)?;
            }
        }
        f.write_str(&self.key)
    }
}

#[derive(Debug, Clone)]
pub struct Keymap {
    mac: bool,
    bindings: HashMap<KeyChord, Vec<Command>>,
}

impl Default for Keymap {
    fn default() -> Self {
        Self::base(false)
    }
}

impl Keymap {
    pub fn new(mac: bool) -> Self {
        Self {
            mac,
            bindings: HashMap::new(),
        }
    }

    /// The standard bindings.
    pub fn base(mac: bool) -> Self {
        use Command::*;

        let mut keymap = Self::new(mac);
        let bindings: [(&str, Vec<Command>); 14] = [
            ("Mod-b", vec![ToggleMark(MarkType::Strong)]),
            ("Mod-i", vec![ToggleMark(MarkType::Em)]),
            ("Mod-e", vec![ToggleMark(MarkType::Code)]),
            ("Mod-k", vec![RemoveLink]),
            ("Enter", vec![SplitListItem, LiftEmptyBlock, SplitBlock]),
            ("Backspace", vec![DeleteBackward, JoinBackward]),
            ("Tab", vec![SinkListItem]),
            ("Shift-Tab", vec![LiftListItem]),
            ("Shift-Enter", vec![ExitCode, InsertHardBreak]),
            ("Mod-Enter", vec![ExitCode, InsertHardBreak]),
            ("Alt-ArrowUp", vec![JoinUp]),
            ("Alt-ArrowDown", vec![JoinDown]),
            ("Mod-[", vec![Lift]),
            ("Escape", vec![SelectParentNode]),
        ];
        for (chord, commands) in bindings {
            keymap.bind(chord, commands);
        }
        keymap.bind("Delete", vec![JoinForward]);
        keymap.bind("Mod-Shift-x", vec![ToggleMark(MarkType::Strike)]);
        keymap.bind("Mod-Shift-9", vec![ToggleTask]);
        keymap.bind("Shift-Ctrl-0", vec![SetParagraph]);
        for level in 1..=6u8 {
            keymap.bind(&format!("Shift-Ctrl-{level}"), vec![SetHeading(level)]);
        }
        keymap
    }

    /// Bind `chord` to a command chain, replacing any earlier binding.
    pub fn bind(&mut self, chord: &str, commands: Vec<Command>) -> bool {
        match KeyChord::parse(chord, self.mac) {
            Some(chord) => {
                self.bindings.insert(chord, commands);
                true
            }
            None => false,
        }
    }

    pub fn commands_for(&self, chord: &str) -> Option<&[Command]> {
        let chord = KeyChord::parse(chord, self.mac)?;
        self.bindings.get(&chord).map(Vec::as_slice)
    }

    /// Run the chain bound to `chord`; `Ok(false)` when nothing is bound or no
    /// command applied.
    pub fn handle(&self, session: &mut EditorSession, chord: &str) -> CommandResult {
        let Some(commands) = self.commands_for(chord) else {
            return Ok(false);
        };
        for command in commands {
            if command.run(session)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::position::{Selection, TextPos};
    use crate::formats::markdown::{serialize_to_markdown, MarkdownRules};

    fn md(session: &EditorSession) -> String {
        serialize_to_markdown(session.document(), &MarkdownRules::default())
    }

    #[test]
    fn test_chord_parsing() {
        let chord = KeyChord::parse("Mod-Shift-X", false).unwrap();
        assert!(chord.ctrl && chord.shift && !chord.meta);
        assert_eq!(chord.key, "x");
        assert!(KeyChord::parse("Mod-b", true).unwrap().meta);
        assert_eq!(KeyChord::parse("Mod--", false).unwrap().key, "-");
        assert_eq!(KeyChord::parse("Hyper-a", false), None);
        assert_eq!(KeyChord::parse("Alt-ArrowUp", false).unwrap().to_string(), "Alt-ArrowUp");
    }

    #[test]
    fn test_modifier_order_does_not_matter() {
        let keymap = Keymap::base(false);
        assert_eq!(
            keymap.commands_for("Ctrl-Shift-2"),
            Some(&[Command::SetHeading(2)][..])
        );
        assert!(keymap.commands_for("Mod-q").is_none());
    }

    #[test]
    fn test_enter_chain() {
        let keymap = Keymap::default();
        let mut session = EditorSession::from_markdown("- ab\n");
        session.set_selection(Selection::caret(vec![0, 0, 0], 1));
        assert!(keymap.handle(&mut session, "Enter").unwrap());
        assert_eq!(md(&session), "- a\n- b\n");

        let mut session = EditorSession::from_markdown("ab\n");
        session.set_selection(Selection::caret(vec![0], 1));
        assert!(keymap.handle(&mut session, "Enter").unwrap());
        assert_eq!(md(&session), "a\n\nb\n");
    }

    #[test]
    fn test_backspace_chain() {
        let keymap = Keymap::default();
        let mut session = EditorSession::from_markdown("a\n\nb\n");
        session.set_selection(Selection::caret(vec![1], 1));
        assert!(keymap.handle(&mut session, "Backspace").unwrap());
        assert!(keymap.handle(&mut session, "Backspace").unwrap());
        assert_eq!(md(&session), "a\n");
        assert_eq!(session.selection(), &Selection::caret(vec![0], 1));
    }

    #[test]
    fn test_mark_and_link_keys() {
        let keymap = Keymap::default();
        let mut session = EditorSession::from_markdown("[x](/a) y\n");
        session.set_selection(Selection::range(
            TextPos::new(vec![0], 2),
            TextPos::new(vec![0], 3),
        ));
        assert!(keymap.handle(&mut session, "Mod-b").unwrap());
        assert_eq!(md(&session), "[x](/a) **y**\n");

        session.set_selection(Selection::caret(vec![0], 1));
        assert!(keymap.handle(&mut session, "Mod-k").unwrap());
        assert!(!keymap.handle(&mut session, "Mod-k").unwrap());
        assert_eq!(md(&session), "x **y**\n");
    }

    #[test]
    fn test_tab_keys() {
        let keymap = Keymap::default();
        let mut session = EditorSession::from_markdown("- a\n- b\n");
        session.set_selection(Selection::caret(vec![0, 1, 0], 0));
        assert!(keymap.handle(&mut session, "Tab").unwrap());
        assert_eq!(md(&session), "- a\n  - b\n");
        assert!(keymap.handle(&mut session, "Shift-Tab").unwrap());
        assert_eq!(md(&session), "- a\n- b\n");
        assert!(!keymap.handle(&mut session, "Unbound").unwrap());
    }
}
